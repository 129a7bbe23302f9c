use soulscout_cli::{OracleProvider, SoulScoutConfig};
use std::io::Write;

#[test]
fn shipped_config_parses() {
    let config = SoulScoutConfig::from_path("config/soulscout.yaml".as_ref()).unwrap();
    assert_eq!(config.explorer.skip_overlays, vec!["login-modal"]);
    assert_eq!(config.oracle.provider, OracleProvider::Scripted);
    assert!(config.knowledge.path.is_none());
}

#[test]
fn partial_file_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "oracle:\n  provider: openai\n  model: qwen-2.5\ntriage:\n  escalation_threshold: 0.9"
    )
    .unwrap();

    let config = SoulScoutConfig::from_path(file.path()).unwrap();
    assert_eq!(config.oracle.provider, OracleProvider::Openai);
    assert_eq!(config.oracle.model, "qwen-2.5");
    assert_eq!(config.oracle.api_key_env, "GROQ_API_KEY");
    assert_eq!(config.triage.escalation_threshold, 0.9);
    assert_eq!(config.explorer.max_depth, 5);
}

#[test]
fn malformed_file_is_an_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "explorer: [not, a, map]").unwrap();
    assert!(SoulScoutConfig::from_path(file.path()).is_err());
}
