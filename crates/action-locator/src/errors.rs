//! Error types for the healer internals

use action_primitives::ActionError;
use thiserror::Error;

/// Errors raised while probing candidates.
///
/// These never reach callers of [`crate::SelectorHealer::heal`]; they end a
/// tier or the whole attempt and become an unsuccessful result.
#[derive(Debug, Error, Clone)]
pub enum HealError {
    /// The candidate is not valid locator syntax
    #[error("Invalid candidate '{locator}': {reason}")]
    InvalidCandidate { locator: String, reason: String },

    /// The page is gone; no further candidate can be tested
    #[error("Surface lost: {0}")]
    SurfaceLost(String),

    /// Any other surface failure
    #[error("Surface error: {0}")]
    Surface(ActionError),
}

impl From<ActionError> for HealError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::InvalidLocator { locator, reason } => {
                HealError::InvalidCandidate { locator, reason }
            }
            other if other.is_surface_lost() => HealError::SurfaceLost(other.to_string()),
            other => HealError::Surface(other),
        }
    }
}

impl HealError {
    /// Whether the next candidate may still be tried
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, HealError::SurfaceLost(_))
    }

    /// Get error severity (0=low, 1=medium, 2=high, 3=critical)
    pub fn severity(&self) -> u8 {
        match self {
            HealError::SurfaceLost(_) => 3,
            HealError::Surface(err) => err.severity(),
            HealError::InvalidCandidate { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_errors_map_onto_heal_errors() {
        let invalid: HealError = ActionError::invalid_locator("[[", "unbalanced").into();
        assert!(matches!(invalid, HealError::InvalidCandidate { .. }));
        assert!(invalid.is_recoverable());

        let lost: HealError = ActionError::PageClosed("gone".into()).into();
        assert!(!lost.is_recoverable());
        assert_eq!(lost.severity(), 3);
    }
}
