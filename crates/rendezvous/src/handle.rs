//! The two kinds of party a rendezvous session can pair: a live gRPC stream,
//! or an in-process console session bridged by channels (§4.F).

use agenttrust_proto::StreamResponse;
use tokio::sync::mpsc;
use tonic::Status;

use crate::message::Message;

/// Outbound/inbound channel depth for both stream handles and console
/// bridges, matching the §4.F "default capacity 2048 messages" backpressure
/// bound.
pub const CHANNEL_CAPACITY: usize = 2048;

/// One side of a live `RouterService::Stream` gRPC call, reduced to the two
/// channels the rendezvous forwarder needs.
pub struct StreamHandle {
    /// The stream's `client-name` metadata, kept for diagnostics.
    pub client_name: String,
    /// Messages received from this stream's peer are written here to reach
    /// the gRPC client.
    pub outbound: mpsc::Sender<Result<StreamResponse, Status>>,
    /// Messages this stream's client sent arrive here, translated from
    /// `StreamRequest` by the inbound pump task.
    pub inbound: mpsc::Receiver<Message>,
}

/// One side of an in-process console session, registered via
/// [`crate::router::RendezvousRouter::start_session`].
pub struct ConsoleHandle {
    /// The device name the console expects to attach to, kept for diagnostics.
    pub device_name: String,
    /// Bytes the console wants sent to the device arrive here (the
    /// console's "sendCh", dequeued by the forwarder).
    pub to_device: mpsc::Receiver<Vec<u8>>,
    /// Bytes received from the device are pushed here (the console's
    /// "recvCh").
    pub from_device: mpsc::Sender<Vec<u8>>,
}

/// Either kind of party that can occupy a [`crate::map::SlotState::Waiting`]
/// slot or complete a pairing.
pub enum Arrival {
    /// A live gRPC stream.
    Stream(StreamHandle),
    /// An in-process console session.
    Console(ConsoleHandle),
}

impl Arrival {
    /// Label used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Arrival::Stream(_) => "stream",
            Arrival::Console(_) => "console",
        }
    }
}
