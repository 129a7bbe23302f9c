use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use action_primitives::{BrowserSurface, FixturePage};
use clap::Args;
use explorer::{ExplorationReport, Explorer};
use memory_center::KnowledgeSink;
use tracing::warn;

use super::context::CliContext;
use super::output::{emit_structured, OutputFormat};
use crate::config::OracleProvider;

#[derive(Args, Clone, Debug)]
pub struct ExploreArgs {
    /// Fixture page to explore
    #[arg(long, value_name = "FILE")]
    pub fixture: PathBuf,

    /// Overlay nesting limit
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Overlay id never to explore (repeatable)
    #[arg(long = "skip-overlay", value_name = "ID")]
    pub skip_overlays: Vec<String>,

    /// Reasoning oracle to consult
    #[arg(long, value_enum)]
    pub oracle: Option<OracleProvider>,
}

pub async fn cmd_explore(args: ExploreArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let page = FixturePage::from_path(&args.fixture)
        .with_context(|| format!("Failed to load fixture {}", args.fixture.display()))?;
    let url = page.current_url().await.context("Fixture has no URL")?;

    let mut options = ctx.config().explorer.clone();
    options.oracle_timeout_ms = ctx.config().oracle.timeout_ms;
    if let Some(depth) = args.max_depth {
        options.max_depth = depth;
    }
    options.skip_overlays.extend(args.skip_overlays);

    let sink = KnowledgeSink::new(ctx.knowledge());
    let explorer = Explorer::new(Arc::new(page), ctx.oracle(args.oracle)?, options)
        .with_knowledge(sink.clone());

    let cancel = explorer.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping exploration");
            cancel.cancel();
        }
    });
    let report = explorer.explore(&url).await;
    interrupt.abort();
    sink.flush().await;
    let report = report.context("Exploration failed")?;

    if !emit_structured(&report, output)? {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &ExplorationReport) {
    println!("Run {} on {}", report.run_id, report.url);
    println!(
        "  visited={} deepest={} discovered={} interactions={}",
        report.visited_count,
        report.deepest,
        report.discovered.len(),
        report.interactions.len()
    );
    if let Some(reason) = &report.aborted {
        println!("  aborted: {}", reason);
    }
    for entry in &report.interactions {
        let status = match &entry.outcome {
            None => "skipped".to_string(),
            Some(outcome) if outcome.success => "ok".to_string(),
            Some(outcome) => format!(
                "failed ({})",
                outcome.error.as_deref().unwrap_or("unknown error")
            ),
        };
        println!(
            "  [{}] {} {} -> {} ({})",
            entry.depth, entry.context, entry.element.locator, entry.decision.interaction, status
        );
    }
    for pattern in &report.patterns {
        println!(
            "  pattern {} confidence={:.2}",
            pattern.kind, pattern.confidence
        );
    }
}
