//! The one classification function both the REST and gRPC auth paths call
//! through, so the two paths cannot drift (§4.C implementation note).

use std::time::{SystemTime, UNIX_EPOCH};

use agenttrust_identity::{Certificate, Identity, IdentityCache};

use crate::error::{MiddlewareError, MiddlewareResult};

/// A well-known extension type carrying the raw DER bytes of the
/// TLS-verified peer leaf certificate, attached to the connection by the
/// dispatcher's TLS context hook (§4.G) before any handler runs.
#[derive(Debug, Clone)]
pub struct PeerCertificateDer(pub Vec<u8>);

/// Which class of identity an endpoint demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    /// `AgentIdentity` — an already-enrolled device.
    Agent,
    /// `EnrollmentIdentity` — a device performing bootstrap.
    Enrollment,
}

impl IdentityKind {
    fn label(self) -> &'static str {
        match self {
            IdentityKind::Agent => "agent",
            IdentityKind::Enrollment => "enrollment",
        }
    }
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Resolve a peer certificate (if any) to an [`Identity`] of the demanded
/// `kind`, via `cache`. Shared by [`crate::auth_layer`] (REST) and
/// [`crate::grpc_interceptor`] (gRPC) so both paths run identical logic.
pub fn classify(
    cache: &IdentityCache,
    peer_cert_der: Option<&[u8]>,
    kind: IdentityKind,
) -> MiddlewareResult<Identity> {
    let der = peer_cert_der.ok_or(MiddlewareError::NoPeerCertificate)?;
    let cert = Certificate::from_der(der).map_err(MiddlewareError::Identity)?;
    let identity = cache.get(&cert, now_unix()).map_err(MiddlewareError::Identity)?;

    match (kind, &identity) {
        (IdentityKind::Agent, Identity::Agent(_)) => Ok(identity),
        (IdentityKind::Enrollment, Identity::Enrollment(_)) => Ok(identity),
        (IdentityKind::Agent, Identity::Enrollment(_)) => Err(MiddlewareError::WrongIdentityKind {
            expected: IdentityKind::Agent.label(),
            got: IdentityKind::Enrollment.label(),
        }),
        (IdentityKind::Enrollment, Identity::Agent(_)) => Err(MiddlewareError::WrongIdentityKind {
            expected: IdentityKind::Enrollment.label(),
            got: IdentityKind::Agent.label(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenttrust_identity::PeerCertIdentifier;
    use std::time::Duration;

    fn cache() -> IdentityCache {
        IdentityCache::new(
            PeerCertIdentifier::new("mgmt-ca", "enroll-ca", "default-org"),
            Duration::from_secs(600),
        )
    }

    #[test]
    fn missing_certificate_is_no_peer_certificate() {
        let err = classify(&cache(), None, IdentityKind::Agent).unwrap_err();
        assert!(matches!(err, MiddlewareError::NoPeerCertificate));
    }

    #[test]
    fn malformed_der_is_identity_error() {
        let err = classify(&cache(), Some(&[1, 2, 3]), IdentityKind::Agent).unwrap_err();
        assert!(matches!(err, MiddlewareError::Identity(_)));
    }
}
