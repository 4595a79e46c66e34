//! Pure domain errors — no I/O, no transport, no persistence dependency.

use thiserror::Error;

/// Errors raised by invariant checks on the persistent data model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Attempted to look up a condition type that isn't present.
    #[error("condition {0:?} not found on enrollment request")]
    ConditionNotFound(ConditionType),

    /// A requested state transition violates the condition's reason taxonomy.
    #[error("invalid condition transition: {0}")]
    InvalidTransition(String),
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, DomainError>;

pub use crate::enrollment_request::ConditionType;
