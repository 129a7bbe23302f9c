use super::env::CliArgs;
use super::explore::cmd_explore;
use super::heal::cmd_heal;
use super::patterns::cmd_patterns;
use super::triage::cmd_triage;
use crate::cli::commands::Commands;
use crate::cli::context::CliContext;
use anyhow::Result;

pub async fn dispatch(cli: &CliArgs, ctx: &CliContext) -> Result<()> {
    match cli.command.clone() {
        Commands::Explore(args) => cmd_explore(args, ctx, cli.output).await,
        Commands::Heal(args) => cmd_heal(args, ctx, cli.output).await,
        Commands::Triage(args) => cmd_triage(args, ctx, cli.output).await,
        Commands::Patterns(args) => cmd_patterns(args, ctx, cli.output).await,
    }
}
