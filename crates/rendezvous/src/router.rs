//! Public entry points into the rendezvous subsystem: registering gRPC
//! streams and in-process console sessions (§4.F).

use std::sync::Arc;

use agenttrust_proto::StreamResponse;
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tonic::Status;
use uuid::Uuid;

use crate::error::{RendezvousError, RendezvousResult};
use crate::handle::{Arrival, ConsoleHandle, StreamHandle, CHANNEL_CAPACITY};
use crate::map::{JoinOutcome, RendezvousMap, WaitOutcome};
use crate::message::Message;

/// The rendezvous router: pairs two parties that arrive independently under
/// the same session id, then forwards bytes between them until either side
/// closes (§4.F).
///
/// Cheaply cloneable; the underlying map is reference-counted.
#[derive(Clone, Default)]
pub struct RendezvousRouter {
    map: Arc<RendezvousMap>,
}

impl RendezvousRouter {
    /// Construct a router with an empty pairing table.
    pub fn new() -> Self {
        Self { map: Arc::new(RendezvousMap::new()) }
    }

    /// Register an in-process console session under `session_id`, to be
    /// paired with a `device_name` stream that dials in separately.
    ///
    /// Returns the console-facing channel halves: a sender for bytes bound
    /// for the device, and a receiver for bytes the device sent. Internally
    /// this is the `ConsoleSessionManager.StartSession` hook (§4.F): it is
    /// implemented here directly because starting a console session is an
    /// operation on this map.
    pub fn start_session(
        &self,
        session_id: Uuid,
        device_name: String,
    ) -> RendezvousResult<(mpsc::Sender<Vec<u8>>, mpsc::Receiver<Vec<u8>>)> {
        let (to_device_tx, to_device_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (from_device_tx, from_device_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let console = ConsoleHandle { device_name, to_device: to_device_rx, from_device: from_device_tx };

        match self.map.join(session_id, Arrival::Console(console))? {
            JoinOutcome::Waiting(done_rx) => {
                // No counterpart yet; evict this slot if the caller tears
                // down before one shows up.
                let map = Arc::clone(&self.map);
                tokio::spawn(async move {
                    if let Ok(WaitOutcome::Evicted) = done_rx.await {
                        tracing::debug!(%session_id, "console session evicted before a stream joined");
                    }
                    let _ = map; // keep the map alive for the duration of the wait
                });
            }
            JoinOutcome::Paired => {
                tracing::debug!(%session_id, "console session paired immediately");
            }
        }

        Ok((to_device_tx, from_device_rx))
    }

    /// Close a console session that never paired, e.g. because the console
    /// operator canceled before a device connected. No-op if the session
    /// already paired or was never registered.
    pub fn close_session(&self, session_id: Uuid) {
        self.map.evict_if_waiting(session_id);
    }

    /// Accept an inbound `RouterService::Stream` call: builds a
    /// [`StreamHandle`], spawns the task that pumps `inbound_requests` into
    /// it, joins the pairing table, and returns the stream the gRPC handler
    /// should respond with.
    pub fn accept_stream(
        &self,
        session_id: Uuid,
        client_name: String,
        mut inbound_requests: tonic::Streaming<agenttrust_proto::StreamRequest>,
    ) -> RendezvousResult<impl Stream<Item = Result<StreamResponse, Status>>> {
        let (outbound_tx, outbound_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let handle = StreamHandle { client_name, outbound: outbound_tx, inbound: inbound_rx };
        let outcome = self.map.join(session_id, Arrival::Stream(handle))?;

        let map = Arc::clone(&self.map);
        tokio::spawn(async move {
            loop {
                match inbound_requests.message().await {
                    Ok(Some(req)) => {
                        if inbound_tx.send(Message::from(req)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
            // The client disconnected or sent no Closed message; if this
            // slot is still waiting (no counterpart ever showed), evict it.
            // If already paired, dropping `inbound_tx` ends the forwarder's
            // read loop, which sends the final Closed marker on its own.
            map.evict_if_waiting(session_id);
        });

        if let JoinOutcome::Waiting(_done_rx) = outcome {
            tracing::debug!(%session_id, "stream waiting for a counterpart");
        }

        Ok(tokio_stream::wrappers::ReceiverStream::new(outbound_rx))
    }
}
