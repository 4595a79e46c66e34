//! Process configuration: a single struct assembled from a TOML file with
//! environment-variable overrides layered on top, following the same
//! `from_file` / `load_with_defaults` shape the workspace has always used.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level process configuration, covering every `§6` environment key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener addresses for the agent-facing and console-facing endpoints.
    pub listen: ListenConfig,
    /// Names of the two client-certificate signers the core recognizes.
    pub signers: SignerConfig,
    /// TPM manufacturer CA bundle and challenge timing.
    pub tpm: TpmConfig,
    /// Token-bucket rate limiting.
    pub rate_limit: RateLimitConfig,
    /// TTL-bounded identity cache.
    pub identity_cache: IdentityCacheConfig,
    /// Server certificate/key and client-CA bundle for the mTLS listener.
    pub tls: TlsConfig,
    /// Log format/level overrides.
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ListenConfig::default(),
            signers: SignerConfig::default(),
            tpm: TpmConfig::default(),
            rate_limit: RateLimitConfig::default(),
            identity_cache: IdentityCacheConfig::default(),
            tls: TlsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Server TLS material for the agent-facing mTLS listener (§4.G).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    /// PEM path to the server's leaf certificate (plus chain, if any).
    pub cert_path: String,
    /// PEM path to the server's private key.
    pub key_path: String,
    /// PEM path to the CA bundle used to verify presented client certificates.
    pub client_ca_path: String,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: "/etc/agenttrust/tls/server.pem".to_string(),
            key_path: "/etc/agenttrust/tls/server-key.pem".to_string(),
            client_ca_path: "/etc/agenttrust/tls/client-ca.pem".to_string(),
        }
    }
}

/// `logging.format` / `logging.level` (ambient addition, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `"text"` or `"json"`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { format: "text".to_string() }
    }
}

/// `agentEndpointAddress` / `agentGrpcAddress` from §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// `host:port` for the agent-facing dual REST/gRPC TLS listener.
    pub agent_endpoint_address: String,
    /// `host:port` for the console-facing registration listener.
    pub console_endpoint_address: String,
    /// `host:port` for the legacy gRPC-only listener, if enabled.
    pub agent_grpc_address: Option<String>,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            agent_endpoint_address: "0.0.0.0:8443".to_string(),
            console_endpoint_address: "127.0.0.1:8444".to_string(),
            agent_grpc_address: None,
        }
    }
}

/// `deviceEnrollmentSignerName` / `deviceManagementSignerName` from §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Issuer common name required of enrollment-class client certificates.
    pub device_enrollment_signer_name: String,
    /// Issuer common name required of agent-class client certificates.
    pub device_management_signer_name: String,
    /// Organization id used when a certificate carries no org extension.
    pub default_org_id: String,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            device_enrollment_signer_name: "device-enrollment-ca".to_string(),
            device_management_signer_name: "device-management-ca".to_string(),
            default_org_id: "00000000-0000-0000-0000-000000000000".to_string(),
        }
    }
}

/// `tpmCAPaths` plus the soft timeout §5 recommends for the challenge stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TpmConfig {
    /// Glob patterns for PEM files forming the union of acceptable TPM
    /// manufacturer CA chains.
    pub ca_paths: Vec<String>,
    /// Soft per-stream timeout in seconds; breach maps to `DEADLINE_EXCEEDED`.
    pub challenge_soft_timeout_secs: u64,
}

impl Default for TpmConfig {
    fn default() -> Self {
        Self {
            ca_paths: vec!["/etc/agenttrust/tpm-ca/*.pem".to_string()],
            challenge_soft_timeout_secs: 60,
        }
    }
}

/// `rateLimit.{requests,window,trustedProxies,authRequests,authWindow}` from §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests allowed per window on unauthenticated endpoints.
    pub requests: u32,
    /// Window length, in seconds.
    pub window_secs: u64,
    /// Requests allowed per window once a caller is authenticated.
    pub auth_requests: u32,
    /// Window length for authenticated callers, in seconds.
    pub auth_window_secs: u64,
    /// CIDRs and literal IPs (v4 and v6) allowed to set forwarding headers.
    pub trusted_proxies: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests: 60,
            window_secs: 60,
            auth_requests: 600,
            auth_window_secs: 60,
            trusted_proxies: Vec::new(),
        }
    }
}

/// `identityCache.ttl` from §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityCacheConfig {
    /// Cache TTL, in seconds (default 10 minutes).
    pub ttl_secs: u64,
}

impl Default for IdentityCacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 600 }
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply environment-variable
    /// overrides for the handful of keys operators commonly need to flip
    /// without editing the file (signer names, listen addresses).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let content =
            std::fs::read_to_string(path_ref).map_err(|source| CoreError::ConfigIo {
                path: path_ref.display().to_string(),
                source,
            })?;
        let mut config: Config = toml::from_str(&content).map_err(|source| CoreError::ConfigParse {
            path: path_ref.display().to_string(),
            source,
        })?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults; env
    /// overrides are applied either way.
    pub fn load_with_defaults<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let mut config = match path {
            Some(p) if p.as_ref().exists() => Self::from_file(p)?,
            _ => Config::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("AGENT_ENDPOINT_ADDRESS") {
            self.listen.agent_endpoint_address = v;
        }
        if let Ok(v) = std::env::var("AGENT_GRPC_ADDRESS") {
            self.listen.agent_grpc_address = Some(v);
        }
        if let Ok(v) = std::env::var("DEVICE_ENROLLMENT_SIGNER_NAME") {
            self.signers.device_enrollment_signer_name = v;
        }
        if let Ok(v) = std::env::var("DEVICE_MANAGEMENT_SIGNER_NAME") {
            self.signers.device_management_signer_name = v;
        }
        if let Ok(v) = std::env::var("IDENTITY_CACHE_TTL_SECS") {
            self.identity_cache.ttl_secs = v.parse().map_err(|e| CoreError::InvalidEnvOverride {
                var: "IDENTITY_CACHE_TTL_SECS".to_string(),
                value: v.clone(),
                reason: format!("{e}"),
            })?;
        }
        Ok(())
    }
}
