//! `DeviceService { Get, UpdateStatus, GetRendered, Patch }` (§6).
//!
//! Device CRUD and rendered-spec storage are peripheral functionality
//! explicitly out of scope for the core itself (§1); this trait is only the
//! seam the `AgentService` gRPC handlers call through, plus an in-memory
//! stand-in so the gateway binary and tests have something to call.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{CollabError, CollabResult};

/// A device's rendered spec and last-reported status, opaque to the core.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRecord {
    /// Opaque rendered-spec bytes served by `GetRenderedSpec`.
    pub rendered_spec: Vec<u8>,
    /// Opaque status payload last written by `UpdateStatus`/`Patch`.
    pub status: Vec<u8>,
}

/// Device persistence collaborator.
#[async_trait]
pub trait DeviceService: Send + Sync {
    /// Fetch a device record by fingerprint.
    async fn get(&self, org_id: &str, fingerprint: &str) -> CollabResult<DeviceRecord>;

    /// Fetch just the rendered spec bytes.
    async fn get_rendered(&self, org_id: &str, fingerprint: &str) -> CollabResult<Vec<u8>>;

    /// Overwrite the device's status (`PUT`).
    async fn update_status(&self, org_id: &str, fingerprint: &str, status: Vec<u8>) -> CollabResult<()>;

    /// Merge-patch the device's status (`PATCH`); the in-memory stand-in
    /// treats this identically to `update_status` since it has no structured
    /// schema to merge against.
    async fn patch(&self, org_id: &str, fingerprint: &str, status: Vec<u8>) -> CollabResult<()>;
}

/// In-memory `DeviceService`, keyed by `(org_id, fingerprint)`.
#[derive(Debug, Default)]
pub struct InMemoryDeviceStore {
    records: DashMap<(String, String), DeviceRecord>,
}

impl InMemoryDeviceStore {
    /// Construct an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a device record — used by tests and by gateway bootstrap when
    /// pre-provisioning a rendered spec for a fingerprint.
    pub fn seed(&self, org_id: impl Into<String>, fingerprint: impl Into<String>, record: DeviceRecord) {
        self.records.insert((org_id.into(), fingerprint.into()), record);
    }
}

#[async_trait]
impl DeviceService for InMemoryDeviceStore {
    async fn get(&self, org_id: &str, fingerprint: &str) -> CollabResult<DeviceRecord> {
        self.records
            .get(&(org_id.to_string(), fingerprint.to_string()))
            .map(|entry| entry.value().clone())
            .ok_or_else(|| CollabError::NotFound {
                org_id: org_id.to_string(),
                name: fingerprint.to_string(),
            })
    }

    async fn get_rendered(&self, org_id: &str, fingerprint: &str) -> CollabResult<Vec<u8>> {
        self.get(org_id, fingerprint).await.map(|r| r.rendered_spec)
    }

    async fn update_status(&self, org_id: &str, fingerprint: &str, status: Vec<u8>) -> CollabResult<()> {
        let key = (org_id.to_string(), fingerprint.to_string());
        self.records.entry(key).or_default().status = status;
        Ok(())
    }

    async fn patch(&self, org_id: &str, fingerprint: &str, status: Vec<u8>) -> CollabResult<()> {
        self.update_status(org_id, fingerprint, status).await
    }
}
