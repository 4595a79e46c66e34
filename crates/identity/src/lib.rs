//! Peer-certificate identity classification for the agent trust core.
//!
//! Implements components A and B of the core: [`PeerCertIdentifier`] turns a
//! verified X.509 peer certificate into a typed [`Identity`] (§4.A), and
//! [`IdentityCache`] wraps that behind a TTL-bounded map keyed by certificate
//! fingerprint (§4.B). Everything downstream — auth middleware, rate
//! limiting by device fingerprint, the TPM challenge subsystem — consumes an
//! [`Identity`] produced here; nothing else in the workspace constructs one.

#![warn(missing_docs)]

pub mod cache;
pub mod cert;
pub mod error;
pub mod identity;

pub use cache::IdentityCache;
pub use cert::{Certificate, OID_DEVICE_FINGERPRINT, OID_ORG_ID};
pub use error::{IdentityError, IdentityResult};
pub use identity::{AgentIdentity, EnrollmentIdentity, Identity, PeerCertIdentifier};
