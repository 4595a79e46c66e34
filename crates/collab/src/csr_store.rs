//! Stand-in store for the agent-facing `certificatesigningrequests` REST
//! pair (§6). Not one of the four named external collaborators in §6 —
//! CSR renewal sits outside the core's three named components — but the
//! REST surface still needs somewhere to keep submitted CSRs, the same way
//! [`crate::enrollment_store`] stands in for `EnrollmentRequestService`.

use dashmap::DashMap;

use crate::error::{CollabError, CollabResult};

/// A submitted certificate-signing request, keyed by `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsrRecord {
    /// Request name.
    pub name: String,
    /// Organization the request belongs to.
    pub org_id: String,
    /// Raw CSR bytes as submitted.
    pub csr: Vec<u8>,
}

/// In-memory CSR store, keyed by `(org_id, name)`.
#[derive(Debug, Default)]
pub struct InMemoryCsrStore {
    records: DashMap<(String, String), CsrRecord>,
}

impl InMemoryCsrStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly submitted CSR.
    pub fn create(&self, record: CsrRecord) {
        self.records.insert((record.org_id.clone(), record.name.clone()), record);
    }

    /// Fetch a CSR by organization and name.
    pub fn get(&self, org_id: &str, name: &str) -> CollabResult<CsrRecord> {
        self.records
            .get(&(org_id.to_string(), name.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CollabError::NotFound { org_id: org_id.to_string(), name: name.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_get_round_trips() {
        let store = InMemoryCsrStore::new();
        store.create(CsrRecord { name: "csr-1".into(), org_id: "org-1".into(), csr: vec![1, 2, 3] });
        let fetched = store.get("org-1", "csr-1").unwrap();
        assert_eq!(fetched.csr, vec![1, 2, 3]);
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = InMemoryCsrStore::new();
        assert!(store.get("org-1", "missing").is_err());
    }
}
