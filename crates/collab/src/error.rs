//! Errors the external-collaborator stand-ins can raise.

use thiserror::Error;

/// Failures from the in-memory collaborator implementations. A real
/// persistence-backed implementation would additionally surface optimistic-
/// concurrency conflicts here, which callers are expected to retry (§5) —
/// the in-memory stand-ins never conflict, since each `replace_status` holds
/// the shard lock for its whole read-modify-write.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CollabError {
    /// No record exists under the given organization and name.
    #[error("no record named {name:?} in org {org_id:?}")]
    NotFound {
        /// Organization id searched.
        org_id: String,
        /// Record name searched.
        name: String,
    },
}

/// Result alias for this crate.
pub type CollabResult<T> = std::result::Result<T, CollabError>;
