//! Failure triage for SoulScout
//!
//! Classifies failing tests by their error text and routes each one:
//! selector failures to the selector healer, timing and data failures to
//! text-rule suggesters, everything else to a human.

mod classifier;
pub mod errors;
mod healer;
mod report;
mod suggesters;
pub mod types;

pub use classifier::{classify, should_heal};
pub use errors::*;
pub use healer::*;
pub use suggesters::{DataHealer, TimingHealer};
pub use types::*;
