use anyhow::{Context, Result};
use clap::Args;
use memory_center::{KnowledgeKind, KnowledgeRecord, KnowledgeStore, DEFAULT_QUERY_LIMIT};

use super::context::CliContext;
use super::output::{emit_structured, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct PatternsArgs {
    /// Record kind: exploration, test_pattern, selector or error_pattern
    #[arg(long)]
    pub kind: Option<String>,

    /// Rank records against this text instead of listing the newest
    #[arg(long)]
    pub query: Option<String>,

    #[arg(long, default_value_t = DEFAULT_QUERY_LIMIT)]
    pub limit: usize,
}

pub async fn cmd_patterns(
    args: PatternsArgs,
    ctx: &CliContext,
    output: OutputFormat,
) -> Result<()> {
    let kind = args
        .kind
        .as_deref()
        .map(str::parse::<KnowledgeKind>)
        .transpose()
        .context("Invalid --kind")?;

    let store = ctx.knowledge();
    let records = match &args.query {
        Some(query) => store
            .query(query, kind, args.limit)
            .await
            .context("Knowledge query failed")?,
        None => store.list(kind, Some(args.limit)),
    };

    if !emit_structured(&records, output)? {
        print_records(&records);
    }
    Ok(())
}

fn print_records(records: &[KnowledgeRecord]) {
    if records.is_empty() {
        println!("No knowledge records");
        return;
    }
    for record in records {
        let headline = record.content();
        let headline = headline.lines().next().unwrap_or_default();
        println!("[{}] {} {}", record.kind(), record.id, headline);
    }
}
