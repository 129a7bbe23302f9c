use std::time::Duration;
use thiserror::Error;

/// Errors emitted while consulting the reasoning oracle.
///
/// None of these leave the decision engine; they all collapse into the
/// fail-safe skip.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    /// Raised when the oracle client is misconfigured.
    #[error("oracle misconfigured: {0}")]
    Config(String),

    /// Raised when the request could not be delivered.
    #[error("oracle request failed: {0}")]
    Transport(String),

    /// Raised when the oracle answered with a non-success status.
    #[error("oracle returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Raised when the call did not finish within its budget.
    #[error("oracle timed out after {0:?}")]
    Timeout(Duration),

    /// Raised when the response carries no usable text or JSON object.
    #[error("oracle response missing content: {0}")]
    MissingContent(String),

    /// Raised when the embedded object violates the verdict schema.
    #[error("oracle verdict rejected: {0}")]
    Schema(String),

    /// Raised by scripted oracles that ran out of responses.
    #[error("oracle has no more responses")]
    Exhausted,
}

impl OracleError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema(message.into())
    }

    pub fn missing(message: impl Into<String>) -> Self {
        Self::MissingContent(message.into())
    }
}
