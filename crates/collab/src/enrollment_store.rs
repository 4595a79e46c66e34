//! `EnrollmentRequestService` (§6): the persistence collaborator the TPM
//! challenge subsystem reads from and writes condition updates to.
//!
//! The core never persists anything itself (§1 non-goals exclude the
//! storage engine); it only depends on this trait. [`InMemoryEnrollmentStore`]
//! is the in-process stand-in used by the gateway binary and by tests, since
//! no database is in scope here.

use agenttrust_domain::EnrollmentRequest;
use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{CollabError, CollabResult};

/// `EnrollmentRequestService { Get(ctx, orgId, name), ReplaceStatus(ctx, orgId, name, er) }`.
#[async_trait]
pub trait EnrollmentRequestService: Send + Sync {
    /// Fetch a request by organization and name.
    async fn get(&self, org_id: &str, name: &str) -> CollabResult<EnrollmentRequest>;

    /// Replace the stored request wholesale (used after a condition update).
    /// Persistence failure here is what maps to `Error`/`INTERNAL` in §4.E.
    async fn replace_status(&self, org_id: &str, name: &str, request: EnrollmentRequest) -> CollabResult<()>;

    /// Create a freshly submitted request (the REST `POST /enrollmentrequests`
    /// path, outside the core's scope proper but needed to exercise the
    /// challenge subsystem end-to-end in tests).
    async fn create(&self, request: EnrollmentRequest) -> CollabResult<()>;
}

/// In-memory `EnrollmentRequestService`, keyed by `(org_id, name)`.
#[derive(Debug, Default)]
pub struct InMemoryEnrollmentStore {
    records: DashMap<(String, String), EnrollmentRequest>,
}

impl InMemoryEnrollmentStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EnrollmentRequestService for InMemoryEnrollmentStore {
    async fn get(&self, org_id: &str, name: &str) -> CollabResult<EnrollmentRequest> {
        self.records
            .get(&(org_id.to_string(), name.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CollabError::NotFound {
                org_id: org_id.to_string(),
                name: name.to_string(),
            })
    }

    async fn replace_status(&self, org_id: &str, name: &str, request: EnrollmentRequest) -> CollabResult<()> {
        let key = (org_id.to_string(), name.to_string());
        if !self.records.contains_key(&key) {
            return Err(CollabError::NotFound {
                org_id: org_id.to_string(),
                name: name.to_string(),
            });
        }
        self.records.insert(key, request);
        Ok(())
    }

    async fn create(&self, request: EnrollmentRequest) -> CollabResult<()> {
        let key = (request.org_id.clone(), request.name.clone());
        self.records.insert(key, request);
        Ok(())
    }
}
