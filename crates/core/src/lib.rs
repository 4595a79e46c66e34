//! Ambient stack shared by every `agenttrust-*` crate: config loading,
//! the crate-local error convention, and structured logging setup.
//!
//! Nothing in this crate knows about certificates, TPMs, or sessions — it is
//! the same kind of foundation layer the rest of the workspace leans on, the
//! way `aethercore-core` underpinned the mesh/ledger crates it was split out
//! of.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    Config, IdentityCacheConfig, ListenConfig, LoggingConfig, RateLimitConfig, SignerConfig, TlsConfig,
    TpmConfig,
};
pub use error::{CoreError, Result};
