//! Errors produced while constructing or comparing TPM credential material.

use thiserror::Error;

/// Crypto-layer failures, always wrapped by the caller (`agenttrust-tpm`)
/// into its own taxonomy before reaching a transport boundary.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The endorsement-key material supplied was too short to derive a seed from.
    #[error("endorsement key material too short: got {got} bytes, need at least {need}")]
    ShortEkMaterial {
        /// Bytes actually supplied.
        got: usize,
        /// Minimum bytes required.
        need: usize,
    },

    /// The attestation public-area blob was empty.
    #[error("attestation public area is empty")]
    EmptyAttestPub,
}

/// Result alias for this crate.
pub type CryptoResult<T> = std::result::Result<T, CryptoError>;
