//! `StreamRendezvous` (component F, §4.F): pairs two session parties —
//! either two live gRPC streams, or a stream and an in-process console
//! session — by session id, and forwards bytes between them until either
//! side closes.

#![warn(missing_docs)]

mod error;
mod forward;
mod grpc_server;
mod handle;
mod map;
mod message;
mod router;

pub use error::{RendezvousError, RendezvousResult};
pub use grpc_server::RouterGrpcService;
pub use handle::{Arrival, ConsoleHandle, StreamHandle, CHANNEL_CAPACITY};
pub use message::Message;
pub use router::RendezvousRouter;
