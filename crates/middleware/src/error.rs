//! Errors for the auth middleware (§4.C) and rate limiter (§4.D), plus their
//! HTTP/gRPC status mappings.

use thiserror::Error;

/// Failures the auth middleware can produce while resolving a request's
/// [`agenttrust_identity::Identity`].
#[derive(Debug, Error, Clone)]
pub enum MiddlewareError {
    /// No verified peer certificate was attached to the connection (§8 Property 1).
    #[error("no verified peer certificate presented")]
    NoPeerCertificate,

    /// The certificate resolved to an identity, but not the kind the endpoint demands.
    #[error("endpoint requires {expected} identity, got {got}")]
    WrongIdentityKind {
        /// The identity kind the endpoint demands.
        expected: &'static str,
        /// The identity kind actually resolved.
        got: &'static str,
    },

    /// Certificate classification itself failed (signer mismatch, expiry, malformed CN).
    #[error(transparent)]
    Identity(#[from] agenttrust_identity::IdentityError),

    /// An agent endpoint's `{name}` path parameter didn't match the cert-derived fingerprint.
    #[error("device name {path_name} does not match certificate fingerprint {cert_fingerprint}")]
    DeviceNameMismatch {
        /// Fingerprint taken from the URL path.
        path_name: String,
        /// Fingerprint derived from the peer certificate.
        cert_fingerprint: String,
    },
}

impl MiddlewareError {
    /// HTTP status code for the REST error envelope (§7).
    pub fn http_status(&self) -> u16 {
        match self {
            MiddlewareError::NoPeerCertificate => 400,
            MiddlewareError::Identity(_) => 401,
            MiddlewareError::DeviceNameMismatch { .. } => 401,
            MiddlewareError::WrongIdentityKind { .. } => 500,
        }
    }

    /// `reason` field of the REST error envelope.
    pub fn reason(&self) -> &'static str {
        match self {
            MiddlewareError::NoPeerCertificate => "BadRequest",
            MiddlewareError::Identity(_) => "Unauthorized",
            MiddlewareError::DeviceNameMismatch { .. } => "Unauthorized",
            MiddlewareError::WrongIdentityKind { .. } => "InternalError",
        }
    }

    /// gRPC status code for the stream-interceptor path.
    pub fn grpc_code(&self) -> tonic::Code {
        match self {
            MiddlewareError::NoPeerCertificate => tonic::Code::InvalidArgument,
            MiddlewareError::Identity(_) => tonic::Code::Unauthenticated,
            MiddlewareError::DeviceNameMismatch { .. } => tonic::Code::Unauthenticated,
            MiddlewareError::WrongIdentityKind { .. } => tonic::Code::Internal,
        }
    }
}

/// Result alias for this crate.
pub type MiddlewareResult<T> = std::result::Result<T, MiddlewareError>;
