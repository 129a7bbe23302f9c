//! Interaction decisions for the explorer.
//!
//! Stages run in a fixed order: skip list, learned patterns, fast paths,
//! then the reasoning oracle. Oracle failures never escape; they become
//! the fail-safe skip.

pub mod engine;
pub mod errors;
pub mod json;
pub mod openai;
pub mod oracle;
pub mod patterns;
pub mod prompt;
pub mod skip;
pub mod verdict;

pub use engine::{
    is_date_picker_trigger, is_dropdown_trigger, DecisionContext, DecisionEngine, DecisionSource,
};
pub use errors::OracleError;
pub use json::extract_json_object;
pub use openai::{OpenAiCompatibleOracle, OpenAiConfig};
pub use oracle::{ReasoningOracle, ScriptedOracle, SharedOracle};
pub use patterns::{Pattern, PatternStore};
pub use prompt::OraclePrompt;
pub use skip::{SkipMatch, SkipMatcher};
pub use verdict::{parse_verdict, OracleVerdict};
