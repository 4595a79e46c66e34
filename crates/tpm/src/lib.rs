//! Component E — the TPM credential-activation challenge (§4.E), the
//! hardest subsystem in the core. [`csr`] parses the TCG-CSR bytes an
//! `EnrollmentRequest` carries; [`state_machine`] runs the transport-free
//! precondition checks, challenge issuance, and verification; [`grpc_server`]
//! drives that state machine over one `EnrollmentChallengeService::TPMChallenge`
//! bidirectional stream.

#![warn(missing_docs)]

pub mod csr;
pub mod error;
pub mod grpc_server;
pub mod state_machine;

pub use csr::TcgCsr;
pub use error::{TpmError, TpmResult};
pub use grpc_server::EnrollmentChallengeGrpcService;
pub use state_machine::{begin_challenge, verify_response, ChallengeOutcome, IssuedChallenge, PendingChallenge};
