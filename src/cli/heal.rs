use std::path::PathBuf;
use std::sync::Arc;

use action_locator::{HealOutcome, SelectorHealer};
use action_primitives::FixturePage;
use anyhow::{Context, Result};
use clap::Args;
use memory_center::KnowledgeLocatorMappings;

use super::context::CliContext;
use super::output::{emit_structured, OutputFormat};

#[derive(Args, Clone, Debug)]
pub struct HealArgs {
    /// Fixture page the locator should resolve on
    #[arg(long, value_name = "FILE")]
    pub fixture: PathBuf,

    /// The broken locator
    #[arg(long)]
    pub locator: String,
}

pub async fn cmd_heal(args: HealArgs, ctx: &CliContext, output: OutputFormat) -> Result<()> {
    let page = FixturePage::from_path(&args.fixture)
        .with_context(|| format!("Failed to load fixture {}", args.fixture.display()))?;
    let healer = SelectorHealer::new(Arc::new(KnowledgeLocatorMappings::new(ctx.knowledge())));
    let outcome = healer.heal_traced(&page, &args.locator).await;

    if !emit_structured(&outcome, output)? {
        print_outcome(&outcome);
    }
    Ok(())
}

fn print_outcome(outcome: &HealOutcome) {
    let result = &outcome.result;
    match (&result.new_locator, outcome.tier) {
        (Some(locator), Some(tier)) => println!(
            "Healed via {} tier: {} (confidence {:.2})",
            tier.name(),
            locator,
            result.confidence
        ),
        _ => println!("Not healed: {}", result.explanation),
    }
    println!("  tiers tried: {}", outcome.attempted.join(", "));
}
