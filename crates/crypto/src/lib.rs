//! Cryptographic primitives backing the TPM credential-activation challenge.
//!
//! This crate holds only what §4.E of the trust core needs: a fresh random
//! secret, a constant-time comparison for the verification step, and the
//! construction of a TPM2_MakeCredential-shaped `(credentialBlob,
//! encryptedSecret)` pair. It does not implement a general-purpose signing or
//! session-key stack — the rest of the core has no use for one, the way the
//! reference workspace kept its crypto crate scoped to what its signing and
//! session layers actually needed.

#![warn(missing_docs)]

pub mod error;
pub mod makecredential;
pub mod secret;

pub use error::{CryptoError, CryptoResult};
pub use makecredential::{make_credential, Credential};
pub use secret::{constant_time_eq, random_secret};
