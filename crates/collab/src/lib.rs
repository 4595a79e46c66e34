//! Stand-ins for the core's external collaborators (§6): the
//! `EnrollmentRequestService`, `DeviceService`, and `OrgResolver` interfaces
//! the core consumes. Persistence, device CRUD, and organization management
//! are all explicitly out of scope for the core itself (§1); this crate only
//! holds the traits the core depends on plus an in-memory implementation of
//! each, since no real database is in scope here.
//!
//! `ConsoleSessionManager` is not defined here: it is implemented directly
//! by `agenttrust-rendezvous`, since starting a console session is really an
//! operation on the rendezvous map itself.

#![warn(missing_docs)]

pub mod csr_store;
pub mod device_store;
pub mod enrollment_store;
pub mod error;
pub mod org_resolver;

pub use csr_store::{CsrRecord, InMemoryCsrStore};
pub use device_store::{DeviceRecord, DeviceService, InMemoryDeviceStore};
pub use enrollment_store::{EnrollmentRequestService, InMemoryEnrollmentStore};
pub use error::{CollabError, CollabResult};
pub use org_resolver::{OrgResolver, StaticOrgResolver};
