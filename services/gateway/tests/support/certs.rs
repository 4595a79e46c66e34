//! Ephemeral CA/leaf certificate generation for the gateway's end-to-end
//! tests (§8). Three independent CAs stand in for the three trust roots a
//! real deployment keeps separate: the TLS CA for the gateway's own server
//! certificate, and the two client-certificate signers §4.A classifies
//! against (`device-management-ca`, `device-enrollment-ca` — the defaults
//! `SignerConfig::default` already names).

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CustomExtension, DistinguishedName, DnType, IsCa,
    KeyUsagePurpose,
};

/// Private-enterprise OIDs as rcgen's `&[u64]` arc form; must match
/// `agenttrust_identity::cert::{OID_ORG_ID, OID_DEVICE_FINGERPRINT}`.
const OID_ORG_ID: &[u64] = &[1, 3, 6, 1, 4, 1, 55841, 1, 1];
const OID_DEVICE_FINGERPRINT: &[u64] = &[1, 3, 6, 1, 4, 1, 55841, 1, 2];

/// A self-signed CA certificate plus the material needed to sign leaves.
pub struct TestCa {
    cert: Certificate,
}

/// A PEM-encoded leaf certificate and its private key.
pub struct Leaf {
    pub cert_pem: String,
    pub key_pem: String,
}

impl Leaf {
    /// Concatenated cert+key PEM, the shape `reqwest::Identity::from_pem`
    /// and `tonic::transport::Identity::from_pem` both expect.
    pub fn identity_pem(&self) -> Vec<u8> {
        let mut out = self.cert_pem.clone().into_bytes();
        out.extend_from_slice(self.key_pem.as_bytes());
        out
    }
}

impl TestCa {
    /// Build a new self-signed CA whose subject common name is `common_name`
    /// — this becomes the `signer_name`/issuer every leaf it signs carries.
    pub fn new(common_name: &str) -> Self {
        let mut params = CertificateParams::new(vec![]);
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
        let cert = Certificate::from_params(params).expect("CA certificate params are valid");
        Self { cert }
    }

    /// This CA's own self-signed certificate, PEM-encoded — the root a test
    /// client or the gateway's `client_ca_path` trusts.
    pub fn root_pem(&self) -> String {
        self.cert.serialize_pem().expect("self-signed CA serializes")
    }

    /// Issue a server leaf certificate for `127.0.0.1`, signed by this CA.
    pub fn issue_server_leaf(&self) -> Leaf {
        let mut params = CertificateParams::new(vec!["127.0.0.1".to_string()]);
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "agenttrust-gateway-test");
        params.distinguished_name = dn;
        let leaf = Certificate::from_params(params).expect("server leaf params are valid");
        let cert_pem = leaf.serialize_pem_with_signer(&self.cert).expect("server leaf signs");
        let key_pem = leaf.serialize_private_key_pem();
        Leaf { cert_pem, key_pem }
    }

    /// Issue an agent-class client certificate: subject CN is the 64-hex
    /// device fingerprint §4.A requires, with the org-id custom extension
    /// set when `org_id` is `Some`.
    pub fn issue_agent_leaf(&self, fingerprint: &str, org_id: Option<&str>) -> Leaf {
        self.issue_leaf(fingerprint, org_id)
    }

    /// Issue an enrollment-class client certificate. Common name may be
    /// empty — §4.A tolerates that for enrollment identities only.
    pub fn issue_enrollment_leaf(&self, common_name: &str, org_id: Option<&str>) -> Leaf {
        self.issue_leaf(common_name, org_id)
    }

    fn issue_leaf(&self, common_name: &str, org_id: Option<&str>) -> Leaf {
        let mut params = CertificateParams::new(vec![]);
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name);
        params.distinguished_name = dn;
        params.is_ca = IsCa::NoCa;
        if let Some(org_id) = org_id {
            params
                .custom_extensions
                .push(CustomExtension::from_oid_content(OID_ORG_ID, org_id.as_bytes().to_vec()));
        }
        let _ = OID_DEVICE_FINGERPRINT; // reserved: the fingerprint is carried in the CN, not this extension, for agent leaves
        let leaf = Certificate::from_params(params).expect("leaf cert params are valid");
        let cert_pem = leaf.serialize_pem_with_signer(&self.cert).expect("leaf signs against CA");
        let key_pem = leaf.serialize_private_key_pem();
        Leaf { cert_pem, key_pem }
    }
}

/// A deterministic-looking 64-character lowercase hex fingerprint for test
/// certificates, distinct per `seed` so concurrently issued devices don't collide.
pub fn fingerprint(seed: u8) -> String {
    hex::encode([seed; 32])
}
