//! Parsed X.509 peer-certificate data.
//!
//! The TLS layer is responsible for chain verification; by the time a
//! [`Certificate`] reaches this crate it has already been checked against the
//! configured CA bundle. This module only extracts the attributes the rest of
//! the crate needs: subject CN, expiry, issuer (signer) name, and the two
//! custom extensions carrying organization id and device fingerprint.

use crate::error::{IdentityError, IdentityResult};
use x509_parser::prelude::*;

/// Private-enterprise OID arc used for the two custom extensions this system defines.
/// Organization id (UTF8String UUID).
pub const OID_ORG_ID: &str = "1.3.6.1.4.1.55841.1.1";
/// Device fingerprint (UTF8String hex).
pub const OID_DEVICE_FINGERPRINT: &str = "1.3.6.1.4.1.55841.1.2";

/// A verified peer certificate, reduced to the fields the trust core cares about.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// Raw DER bytes of the leaf certificate, used as the identity-cache key.
    pub der: Vec<u8>,
    /// Subject common name.
    pub common_name: String,
    /// Issuer common name — the "signer name" in spec terms.
    pub signer_name: String,
    /// Certificate expiry, as a Unix timestamp.
    pub not_after: i64,
    /// Organization id from the custom extension, if present.
    pub org_id_ext: Option<String>,
    /// Device fingerprint from the custom extension, if present.
    pub fingerprint_ext: Option<String>,
}

impl Certificate {
    /// Parse a DER-encoded leaf certificate.
    pub fn from_der(der: &[u8]) -> IdentityResult<Self> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| IdentityError::CertificateParse(e.to_string()))?;

        let common_name = first_common_name(cert.subject());
        let signer_name = first_common_name(cert.issuer());
        let not_after = cert.validity().not_after.timestamp();

        let org_id_ext = read_utf8_extension(&cert, OID_ORG_ID)?;
        let fingerprint_ext = read_utf8_extension(&cert, OID_DEVICE_FINGERPRINT)?;

        Ok(Certificate {
            der: der.to_vec(),
            common_name,
            signer_name,
            not_after,
            org_id_ext,
            fingerprint_ext,
        })
    }

    /// `true` once `not_after` is in the past relative to `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.not_after <= now
    }

    /// Hex of the raw DER bytes; used as the identity-cache key.
    pub fn der_fingerprint_hex(&self) -> String {
        hex::encode(blake3::hash(&self.der).as_bytes())
    }
}

fn first_common_name(name: &X509Name<'_>) -> String {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or("")
        .to_string()
}

fn read_utf8_extension(cert: &X509Certificate<'_>, oid_str: &str) -> IdentityResult<Option<String>> {
    let oid = match Oid::from_str(oid_str) {
        Ok(oid) => oid,
        Err(_) => return Ok(None),
    };
    let Some(ext) = cert.get_extension_unique(&oid).map_err(|e| {
        IdentityError::MalformedExtension {
            oid: oid_str.to_string(),
            reason: e.to_string(),
        }
    })?
    else {
        return Ok(None);
    };

    decode_utf8_string(ext.value)
        .map(Some)
        .map_err(|reason| IdentityError::MalformedExtension {
            oid: oid_str.to_string(),
            reason,
        })
}

/// Minimal ASN.1 UTF8String (tag 0x0C) decoder for the two custom extensions.
/// Falls back to treating the whole extension value as raw UTF-8 if it isn't
/// TLV-wrapped, so hand-constructed test certificates work either way.
fn decode_utf8_string(raw: &[u8]) -> Result<String, String> {
    if raw.first() == Some(&0x0c) && raw.len() >= 2 {
        let len = raw[1] as usize;
        if raw.len() >= 2 + len && (raw[1] & 0x80) == 0 {
            return std::str::from_utf8(&raw[2..2 + len])
                .map(|s| s.to_string())
                .map_err(|e| e.to_string());
        }
    }
    std::str::from_utf8(raw)
        .map(|s| s.to_string())
        .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn der_fingerprint_hex_is_deterministic() {
        let cert = Certificate {
            der: vec![1, 2, 3, 4],
            common_name: "dev".into(),
            signer_name: "signer".into(),
            not_after: 0,
            org_id_ext: None,
            fingerprint_ext: None,
        };
        let a = cert.der_fingerprint_hex();
        let b = cert.der_fingerprint_hex();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn is_expired_at_boundary() {
        let cert = Certificate {
            der: vec![],
            common_name: "dev".into(),
            signer_name: "signer".into(),
            not_after: 1000,
            org_id_ext: None,
            fingerprint_ext: None,
        };
        assert!(!cert.is_expired_at(999));
        assert!(cert.is_expired_at(1000));
        assert!(cert.is_expired_at(1001));
    }
}
