//! Error types for mydaily domain values.

use crate::ids::IdError;

/// Result type for domain operations.
pub type Result<T> = std::result::Result<T, DomainError>;

/// Errors that can occur while building or parsing domain values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// The habit key is not part of the catalogue.
    #[error("unknown habit: {0}")]
    UnknownHabit(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// The date is not an ISO calendar date (`YYYY-MM-DD`).
    #[error("invalid date: {0}")]
    InvalidDate(String),
}
