//! Generated gRPC service and message types for `agenttrust.v1` (§6).
//!
//! Nothing here is hand-written beyond the `.proto` source and this
//! re-export shim; all classification/forwarding logic lives in the crates
//! that implement these services (`agenttrust-tpm`, `agenttrust-rendezvous`,
//! the gateway binary's REST/health/agent handlers).

#![allow(missing_docs)]

tonic::include_proto!("agenttrust.v1");
