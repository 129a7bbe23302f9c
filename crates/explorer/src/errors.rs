//! Traversal error types

use action_primitives::ActionError;
use thiserror::Error;

/// Errors that end a traversal branch.
///
/// Per-element failures never show up here; they are recorded as failed
/// outcomes in the interaction log.
#[derive(Debug, Error, Clone)]
pub enum ExploreError {
    /// The page could not be opened at all
    #[error("Failed to open {url}: {reason}")]
    Navigation { url: String, reason: String },

    /// The automation surface went away mid-run
    #[error("Automation surface lost: {0}")]
    SurfaceLost(String),

    /// The run was cancelled from outside
    #[error("Exploration cancelled")]
    Cancelled,

    /// Surface error outside of an element action
    #[error("Surface error: {0}")]
    Surface(ActionError),
}

impl From<ActionError> for ExploreError {
    fn from(err: ActionError) -> Self {
        if err.is_surface_lost() {
            ExploreError::SurfaceLost(err.to_string())
        } else {
            ExploreError::Surface(err)
        }
    }
}

impl ExploreError {
    /// Whether sibling elements may still be explored after this error
    pub fn is_branch_local(&self) -> bool {
        matches!(self, ExploreError::Surface(_))
    }

    /// Severity on the 0..=3 scale used by the automation surface
    pub fn severity(&self) -> u8 {
        match self {
            ExploreError::Surface(err) => err.severity(),
            ExploreError::Cancelled => 1,
            ExploreError::Navigation { .. } | ExploreError::SurfaceLost(_) => 3,
        }
    }
}
