//! Error types for the browser automation surface

use thiserror::Error;

/// Failure modes of a single browser operation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ActionError {
    /// Operation did not finish before its deadline
    #[error("Action timeout: {0}")]
    Timeout(String),

    /// Operation was cancelled or interrupted
    #[error("Operation interrupted: {0}")]
    Interrupted(String),

    /// Element exists but cannot receive input (hidden or obscured)
    #[error("Element not interactable: {0}")]
    NotInteractable(String),

    /// Element is disabled
    #[error("Element not enabled: {0}")]
    NotEnabled(String),

    /// Handle or locator no longer resolves to an element
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Locator text could not be parsed
    #[error("Invalid locator '{locator}': {reason}")]
    InvalidLocator { locator: String, reason: String },

    /// The page was closed underneath the caller
    #[error("Page closed: {0}")]
    PageClosed(String),

    /// Transport or driver error reported by the automation backend
    #[error("Surface I/O error: {0}")]
    SurfaceIo(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ActionError {
    pub fn invalid_locator(locator: impl Into<String>, reason: impl Into<String>) -> Self {
        ActionError::InvalidLocator {
            locator: locator.into(),
            reason: reason.into(),
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ActionError::Timeout(_) | ActionError::NotInteractable(_) | ActionError::SurfaceIo(_)
        )
    }

    /// True when the automation surface itself is gone, not just one element.
    pub fn is_surface_lost(&self) -> bool {
        matches!(self, ActionError::PageClosed(_))
    }

    /// Get error severity level (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            ActionError::Internal(_) | ActionError::PageClosed(_) => 3,
            ActionError::SurfaceIo(_) | ActionError::InvalidLocator { .. } => 2,
            ActionError::Timeout(_)
            | ActionError::ElementNotFound(_)
            | ActionError::NotEnabled(_) => 1,
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_loss_is_critical_and_not_retryable() {
        let err = ActionError::PageClosed("gone".into());
        assert!(err.is_surface_lost());
        assert!(!err.is_retryable());
        assert_eq!(err.severity(), 3);
    }

    #[test]
    fn timeouts_are_retryable() {
        assert!(ActionError::Timeout("click".into()).is_retryable());
        assert!(!ActionError::NotEnabled("x".into()).is_retryable());
    }
}
