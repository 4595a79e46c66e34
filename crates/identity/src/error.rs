//! Error types for peer-certificate identification and the identity cache.

use thiserror::Error;

/// Errors produced while turning a verified peer certificate into an [`crate::Identity`]
/// or while serving one out of the cache.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The presented certificate could not be parsed as DER-encoded X.509.
    #[error("certificate parse error: {0}")]
    CertificateParse(String),

    /// The certificate's `notAfter` has already passed.
    #[error("certificate expired")]
    Expired,

    /// The certificate's issuer common name does not match either configured signer.
    #[error("unexpected client certificate signer: expected {expected}, got {got}")]
    UnexpectedSigner {
        /// The signer name(s) that would have been accepted.
        expected: String,
        /// The signer name actually presented.
        got: String,
    },

    /// An agent-class certificate had a common name that does not decode to a fingerprint.
    #[error("invalid device common name: {0}")]
    InvalidCommonName(String),

    /// An agent-class certificate had an empty subject common name.
    #[error("empty common name is not permitted for agent identities")]
    EmptyCommonName,

    /// A custom extension was present but its contents could not be decoded.
    #[error("malformed certificate extension {oid}: {reason}")]
    MalformedExtension {
        /// The OID of the offending extension.
        oid: String,
        /// Human-readable decode failure.
        reason: String,
    },
}

/// Result type for identity operations.
pub type IdentityResult<T> = Result<T, IdentityError>;
