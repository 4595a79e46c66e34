//! Errors for component F, the `StreamRendezvous` (§4.F).

use thiserror::Error;

/// Failures joining or maintaining a rendezvous session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RendezvousError {
    /// The `session-id` gRPC metadata header was absent.
    #[error("missing required metadata header: session-id")]
    MissingSessionId,

    /// The `client-name` gRPC metadata header was absent.
    #[error("missing required metadata header: client-name")]
    MissingClientName,

    /// The `session-id` header value did not parse as a UUID.
    #[error("session-id is not a valid UUID: {0}")]
    InvalidSessionId(String),

    /// A third stream tried to join a session that already has two parties
    /// (§8 Property 7: pair exclusivity).
    #[error("session already has two paired endpoints")]
    SessionFull,

    /// The session has already torn down (both sides closed, or the
    /// waiting side's context canceled).
    #[error("session is closed")]
    SessionClosed,
}

impl RendezvousError {
    /// gRPC status code for this failure.
    pub fn grpc_code(&self) -> tonic::Code {
        match self {
            RendezvousError::MissingSessionId
            | RendezvousError::MissingClientName
            | RendezvousError::InvalidSessionId(_) => tonic::Code::InvalidArgument,
            RendezvousError::SessionFull | RendezvousError::SessionClosed => {
                tonic::Code::FailedPrecondition
            }
        }
    }
}

/// Result alias for this crate.
pub type RendezvousResult<T> = std::result::Result<T, RendezvousError>;
