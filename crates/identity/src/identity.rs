//! Component A — `PeerCertIdentifier`: turns a verified peer [`Certificate`]
//! into a typed [`Identity`], per §4.A.

use crate::cert::Certificate;
use crate::error::{IdentityError, IdentityResult};

/// A device already enrolled, authenticating with a device-management-signed
/// certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentIdentity {
    /// Stable per-device identifier, derived from the certificate's CN.
    pub device_fingerprint: String,
    /// Organization the device belongs to.
    pub org_id: String,
    /// Subject common name of the presented certificate.
    pub common_name: String,
    /// Certificate expiry, Unix timestamp.
    pub not_after: i64,
}

/// A device performing bootstrap, authenticating with an
/// enrollment-signed certificate. Carries no fingerprint: the device has none
/// yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentIdentity {
    /// Organization the device is enrolling into.
    pub org_id: String,
    /// Subject common name of the presented certificate (may be empty).
    pub common_name: String,
    /// Certificate expiry, Unix timestamp.
    pub not_after: i64,
}

/// The classified result of identifying a peer certificate.
///
/// Modeled as a tagged union rather than one struct with optional fields so
/// that handlers statically know which class they accept (§9).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    /// An already-enrolled device.
    Agent(AgentIdentity),
    /// A device performing bootstrap.
    Enrollment(EnrollmentIdentity),
}

impl Identity {
    /// The certificate expiry common to both variants.
    pub fn not_after(&self) -> i64 {
        match self {
            Identity::Agent(a) => a.not_after,
            Identity::Enrollment(e) => e.not_after,
        }
    }

    /// The organization id common to both variants.
    pub fn org_id(&self) -> &str {
        match self {
            Identity::Agent(a) => &a.org_id,
            Identity::Enrollment(e) => &e.org_id,
        }
    }

    /// `Some(fingerprint)` for an [`Identity::Agent`], `None` otherwise.
    pub fn device_fingerprint(&self) -> Option<&str> {
        match self {
            Identity::Agent(a) => Some(&a.device_fingerprint),
            Identity::Enrollment(_) => None,
        }
    }
}

/// Classifies a verified peer certificate into an [`Identity`], per the two
/// configured signer names.
#[derive(Debug, Clone)]
pub struct PeerCertIdentifier {
    device_management_signer_name: String,
    device_enrollment_signer_name: String,
    default_org_id: String,
}

impl PeerCertIdentifier {
    /// Construct an identifier bound to the configured signer names.
    pub fn new(
        device_management_signer_name: impl Into<String>,
        device_enrollment_signer_name: impl Into<String>,
        default_org_id: impl Into<String>,
    ) -> Self {
        Self {
            device_management_signer_name: device_management_signer_name.into(),
            device_enrollment_signer_name: device_enrollment_signer_name.into(),
            default_org_id: default_org_id.into(),
        }
    }

    /// Run the §4.A algorithm against `cert` as of `now` (Unix timestamp).
    pub fn identify(&self, cert: &Certificate, now: i64) -> IdentityResult<Identity> {
        if cert.is_expired_at(now) {
            return Err(IdentityError::Expired);
        }

        if cert.signer_name == self.device_management_signer_name {
            let device_fingerprint = device_fingerprint_from_cn(&cert.common_name)?;
            let org_id = cert
                .org_id_ext
                .clone()
                .unwrap_or_else(|| self.default_org_id.clone());
            return Ok(Identity::Agent(AgentIdentity {
                device_fingerprint,
                org_id,
                common_name: cert.common_name.clone(),
                not_after: cert.not_after,
            }));
        }

        if cert.signer_name == self.device_enrollment_signer_name {
            let org_id = cert
                .org_id_ext
                .clone()
                .unwrap_or_else(|| self.default_org_id.clone());
            return Ok(Identity::Enrollment(EnrollmentIdentity {
                org_id,
                common_name: cert.common_name.clone(),
                not_after: cert.not_after,
            }));
        }

        Err(IdentityError::UnexpectedSigner {
            expected: format!(
                "{} or {}",
                self.device_management_signer_name, self.device_enrollment_signer_name
            ),
            got: cert.signer_name.clone(),
        })
    }
}

/// Derives the device fingerprint from a device-management-signed
/// certificate's subject CN.
///
/// The provisioning pipeline mints these certificates with the device's
/// fingerprint (a 64-character lowercase hex digest) as the CN directly, so
/// this is a validating identity function rather than a real transform: it
/// rejects CNs that aren't in that format, and rejects the empty CN outright
/// (agent identities always have a real device behind them — empty CN is
/// only tolerated for enrollment identities, per §4.A edge cases).
fn device_fingerprint_from_cn(cn: &str) -> IdentityResult<String> {
    if cn.is_empty() {
        return Err(IdentityError::EmptyCommonName);
    }
    let is_hex64 = cn.len() == 64 && cn.bytes().all(|b| b.is_ascii_hexdigit());
    if !is_hex64 {
        return Err(IdentityError::InvalidCommonName(cn.to_string()));
    }
    Ok(cn.to_ascii_lowercase())
}
