use clap::Subcommand;

use super::explore::ExploreArgs;
use super::heal::HealArgs;
use super::patterns::PatternsArgs;
use super::triage::TriageArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Explore a fixture page and print the exploration report
    Explore(ExploreArgs),

    /// Recover a broken locator against a fixture page
    Heal(HealArgs),

    /// Classify a test failure and attempt to heal it
    Triage(TriageArgs),

    /// List or search knowledge records
    Patterns(PatternsArgs),
}
