//! Crate-local error convention.
//!
//! Every `agenttrust-*` library crate defines its own `thiserror` enum and a
//! `Result<T>` alias rather than reaching for `anyhow`; `anyhow` is reserved
//! for the binary edge (`services/gateway`). [`CoreError`] covers the handful
//! of failures generic enough to live here (config I/O, parsing); every other
//! crate wraps it with `#[error(transparent)]` rather than duplicating an
//! `Io` variant.

use thiserror::Error;

/// Errors produced while loading or validating the process [`crate::Config`].
#[derive(Debug, Error)]
pub enum CoreError {
    /// The config file could not be read from disk.
    #[error("failed to read config file {path}: {source}")]
    ConfigIo {
        /// Path that was attempted.
        path: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The config file's contents did not parse as valid TOML for [`crate::Config`].
    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        /// Path that was attempted.
        path: String,
        /// Underlying TOML parse failure.
        #[source]
        source: toml::de::Error,
    },

    /// An environment-variable override held a value that didn't parse.
    #[error("environment variable {var} has invalid value {value:?}: {reason}")]
    InvalidEnvOverride {
        /// Name of the offending environment variable.
        var: String,
        /// Raw value that failed to parse.
        value: String,
        /// Human-readable reason.
        reason: String,
    },
}

/// Result alias for config operations.
pub type Result<T> = std::result::Result<T, CoreError>;
