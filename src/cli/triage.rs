use std::path::PathBuf;
use std::sync::Arc;

use action_locator::SelectorHealer;
use action_primitives::{BrowserSurface, FixturePage};
use anyhow::{Context, Result};
use clap::Args;
use failure_triage::{FailureHealer, HealingReport, TestFailure};
use memory_center::KnowledgeLocatorMappings;

use super::context::CliContext;
use super::output::{emit_structured, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct TriageArgs {
    /// Name of the failing test
    #[arg(long)]
    pub test_name: String,

    /// Error text reported by the runner
    #[arg(long)]
    pub error: String,

    /// Locator the test failed on
    #[arg(long)]
    pub locator: Option<String>,

    /// Fixture page standing in for the live page
    #[arg(long, value_name = "FILE")]
    pub fixture: Option<PathBuf>,
}

pub async fn cmd_triage(args: TriageArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let page = match &args.fixture {
        Some(path) => Some(
            FixturePage::from_path(path)
                .with_context(|| format!("Failed to load fixture {}", path.display()))?,
        ),
        None => None,
    };

    let knowledge = ctx.knowledge();
    let healer = FailureHealer::new(SelectorHealer::new(Arc::new(
        KnowledgeLocatorMappings::new(knowledge.clone()),
    )))
    .with_knowledge(knowledge)
    .with_escalation_threshold(ctx.config().triage.escalation_threshold);

    let mut failure = TestFailure::new(args.test_name, args.error);
    if let Some(locator) = args.locator {
        failure = failure.with_locator(locator);
    }
    if let Some(page) = &page {
        if let Ok(url) = page.current_url().await {
            failure = failure.with_page_url(url);
        }
    }

    let surface = page.as_ref().map(|page| page as &dyn BrowserSurface);
    let report = healer.heal(failure, surface).await;

    if !emit_structured(&report, output)? {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &HealingReport) {
    let result = &report.result;
    println!("{}: {}", report.failure.test_name, result.category);
    println!(
        "  {} (confidence {:.2}): {}",
        if result.success { "healed" } else { "not healed" },
        result.confidence,
        result.explanation
    );
    if let Some(locator) = &result.new_locator {
        println!("  new locator: {}", locator);
    }
    if !report.attempted_strategies.is_empty() {
        println!("  strategies: {}", report.attempted_strategies.join(", "));
    }
    if report.should_escalate {
        println!("  escalate to human review");
    }
}
