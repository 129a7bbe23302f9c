use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Yaml,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Print `payload` as JSON or YAML. Returns false for human output, which
/// the caller renders itself.
pub fn emit_structured<T: Serialize>(payload: &T, output: OutputFormat) -> Result<bool> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(payload)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(payload)?),
        OutputFormat::Human => return Ok(false),
    }
    Ok(true)
}
