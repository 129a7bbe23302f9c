//! Error types for failure triage

use memory_center::MemoryError;
use thiserror::Error;

/// Errors raised around a healing attempt.
///
/// A heal that found nothing is not an error. These cover the bookkeeping
/// around it: persisting error patterns and exporting reports.
#[derive(Debug, Error)]
pub enum TriageError {
    #[error("Knowledge store error: {0}")]
    Knowledge(#[from] MemoryError),

    #[error("Report serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TriageError {
    /// Whether retrying the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, TriageError::Knowledge(_))
    }
}
