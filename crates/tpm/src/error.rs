//! Errors for the TPM credential-activation challenge state machine (§4.E),
//! with the gRPC status-code mapping the component-design table specifies.

use thiserror::Error;

/// Failures the challenge state machine can produce. Every variant maps to
/// exactly one `tonic::Code` via [`TpmError::grpc_code`].
#[derive(Debug, Error)]
pub enum TpmError {
    /// No `EnrollmentRequest` exists under the given name in this org.
    #[error("enrollment request {0:?} not found")]
    EnrollmentNotFound(String),

    /// The stored `TPMVerified` condition forbids issuing a new challenge
    /// (already `True`, already `VerificationFailed`, or absent).
    #[error("invalid enrollment request condition state: {0}")]
    InvalidConditionState(String),

    /// The CSR parsed but does not carry TPM credential material.
    #[error("enrollment request CSR is not a TPM CSR")]
    CsrNotTpm,

    /// The CSR bytes did not parse as a [`crate::csr::TcgCsr`].
    #[error("CSR parse error: {0}")]
    CsrParseError(String),

    /// The crypto layer rejected the EK/attestation-key material.
    #[error("credential generation failed: {0}")]
    CredentialGeneration(#[from] agenttrust_crypto::CryptoError),

    /// Persisting the condition update failed.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// I/O failure while sending a message on the stream.
    #[error("I/O error sending challenge message: {0}")]
    Io(String),

    /// The client closed the stream before completing the protocol.
    #[error("client closed stream unexpectedly")]
    ClientClosed,

    /// The stream's context (connection) was canceled.
    #[error("context canceled")]
    ContextCanceled,

    /// The per-stream soft timeout elapsed (§5).
    #[error("challenge stream deadline exceeded")]
    DeadlineExceeded,

    /// The client sent `ChallengeResponse` with the wrong secret.
    #[error("challenge verification failed")]
    VerificationFailed,
}

impl TpmError {
    /// The gRPC status code for this failure, per the §4.E table.
    pub fn grpc_code(&self) -> tonic::Code {
        match self {
            TpmError::EnrollmentNotFound(_) => tonic::Code::NotFound,
            TpmError::InvalidConditionState(_) => tonic::Code::FailedPrecondition,
            TpmError::CsrNotTpm | TpmError::CsrParseError(_) => tonic::Code::InvalidArgument,
            TpmError::CredentialGeneration(_) | TpmError::Persistence(_) | TpmError::Io(_) => {
                tonic::Code::Internal
            }
            TpmError::ClientClosed => tonic::Code::Cancelled,
            TpmError::ContextCanceled => tonic::Code::Cancelled,
            TpmError::DeadlineExceeded => tonic::Code::DeadlineExceeded,
            TpmError::VerificationFailed => tonic::Code::InvalidArgument,
        }
    }
}

/// Result alias for this crate.
pub type TpmResult<T> = std::result::Result<T, TpmError>;
