//! Error types for the alert desk core.

use alertdesk_repository::StoreError;
use thiserror::Error;

/// Errors surfaced by the grouping, closure, topology and RCA services.
///
/// Store failures are classified on conversion so callers can tell a timed-out
/// traversal from an unreachable backend without inspecting `StoreError`.
#[derive(Error, Debug)]
pub enum DeskError {
    /// Malformed identifier or missing required field; rejected before any store access.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Alert or root entity does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Store timeout: {0}")]
    StoreTimeout(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Grouping state contradicts itself, e.g. a child whose parent cannot be found.
    #[error("Consistency violation: {0}")]
    ConsistencyViolation(String),

    #[error("Store error: {0}")]
    Store(StoreError),
}

impl DeskError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::ConsistencyViolation(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }
}

impl From<StoreError> for DeskError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Timeout { .. } => Self::StoreTimeout(err.to_string()),
            StoreError::Unavailable(msg) => Self::StoreUnavailable(msg),
            StoreError::NotFound(msg) => Self::NotFound(msg),
            StoreError::Validation(msg) => Self::Validation(msg),
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_classified() {
        assert!(matches!(
            DeskError::from(StoreError::timeout("neighborhood", 20_000)),
            DeskError::StoreTimeout(_)
        ));
        assert!(matches!(
            DeskError::from(StoreError::unavailable("down")),
            DeskError::StoreUnavailable(_)
        ));
        assert!(matches!(
            DeskError::from(StoreError::query("syntax")),
            DeskError::Store(StoreError::Query(_))
        ));
    }
}
