//! Store error types.
//!
//! One error type is shared by the alert, rule, change and graph stores so the
//! core can classify failures (timeout vs. unavailable vs. bad query) without
//! knowing which backend produced them.

use thiserror::Error;

/// Unified errors from store operations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Malformed input rejected before reaching the backend.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The addressed document or node does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A store call exceeded its time budget.
    #[error("Timed out after {elapsed_ms}ms: {operation}")]
    Timeout { operation: String, elapsed_ms: u64 },

    /// The backend could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected or failed the query.
    #[error("Query error: {0}")]
    Query(String),

    /// A document could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn timeout(operation: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_ms,
        }
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn query(msg: impl Into<String>) -> Self {
        Self::Query(msg.into())
    }

    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound("row not found".to_string()),
            sqlx::Error::PoolTimedOut => Self::Unavailable("connection pool timed out".to_string()),
            sqlx::Error::PoolClosed => Self::Unavailable("connection pool closed".to_string()),
            sqlx::Error::Io(e) => Self::Unavailable(e.to_string()),
            sqlx::Error::Tls(e) => Self::Unavailable(e.to_string()),
            sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
                Self::Serialization(err.to_string())
            }
            other => Self::Query(other.to_string()),
        }
    }
}

impl From<neo4rs::Error> for StoreError {
    fn from(err: neo4rs::Error) -> Self {
        match err {
            neo4rs::Error::IOError { .. } => Self::Unavailable(err.to_string()),
            other => Self::Query(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
