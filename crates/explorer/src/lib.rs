//! Adaptive UI exploration for SoulScout
//!
//! The [`Explorer`] walks a page through a [`action_primitives::BrowserSurface`]:
//! - discovers inputs, buttons and links inside the current scope
//! - asks the decision engine what to do with each element, once per run
//! - recurses into overlays that open, closing and popping them on every exit path
//! - reinforces learned patterns from what each interaction did

pub mod discovery;
pub mod errors;
pub mod executor;
pub mod explorer;
pub mod learner;
pub mod options;
pub mod scope;
pub mod state;

pub use discovery::{discover, generate_locator, Candidate};
pub use errors::ExploreError;
pub use executor::{is_continue_button, test_value, ElementExecutor, ExecutionContext};
pub use explorer::Explorer;
pub use learner::{pattern_record, seed_patterns, OutcomeLearner};
pub use options::ExplorerOptions;
pub use scope::{resolve_scope, visible_overlays, DetectedOverlay, Scope};
pub use state::{ExplorationReport, ExplorationState, ModalScope, ModalStack};
