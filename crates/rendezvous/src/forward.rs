//! Byte forwarding between a paired session's two parties (§4.F).
//!
//! Two tasks — one per direction — copy messages in parallel; neither holds
//! a lock on the rendezvous map while running. Message order is preserved
//! within each direction; there is no ordering guarantee across directions
//! (§5).

use agenttrust_proto::StreamResponse;
use tokio::sync::mpsc;
use tonic::Status;

use crate::handle::{Arrival, ConsoleHandle, StreamHandle};
use crate::message::Message;

/// Drive forwarding between `first` (whichever party arrived first and was
/// holding the slot) and `second` (the party whose arrival completed the
/// pair), until both directions observe closure.
pub async fn run(first: Arrival, second: Arrival) {
    match (first, second) {
        (Arrival::Stream(a), Arrival::Stream(b)) => stream_to_stream(a, b).await,
        (Arrival::Stream(stream), Arrival::Console(console))
        | (Arrival::Console(console), Arrival::Stream(stream)) => stream_to_channel(stream, console).await,
        (Arrival::Console(_), Arrival::Console(_)) => {
            tracing::warn!("two console sessions paired on the same session id; nothing to forward");
        }
    }
}

/// The legacy gRPC-to-gRPC path: pipe each stream's inbound messages to the
/// other's outbound sender.
async fn stream_to_stream(a: StreamHandle, b: StreamHandle) {
    let StreamHandle { outbound: a_tx, inbound: a_rx, .. } = a;
    let StreamHandle { outbound: b_tx, inbound: b_rx, .. } = b;

    tokio::join!(forward_loop(a_rx, b_tx), forward_loop(b_rx, a_tx));
}

/// Pump one direction of a paired stream: every [`Message::Payload`] read
/// from `rx` is forwarded to `tx`; a [`Message::Closed`] (or `rx` closing on
/// its own) sends exactly one closed marker to `tx` and ends the loop —
/// idempotent per §8 Property 6.
async fn forward_loop(mut rx: mpsc::Receiver<Message>, tx: mpsc::Sender<Result<StreamResponse, Status>>) {
    while let Some(msg) = rx.recv().await {
        match msg {
            Message::Payload(bytes) => {
                if tx.send(Ok(Message::Payload(bytes).into())).await.is_err() {
                    return;
                }
            }
            Message::Closed => {
                let _ = tx.send(Ok(Message::Closed.into())).await;
                return;
            }
        }
    }
    // `rx` closed without an explicit Closed message (peer task ended); send
    // the best-effort closed marker regardless (§5 cancellation policy).
    let _ = tx.send(Ok(Message::Closed.into())).await;
}

/// The channel-bridge path for in-process console sessions (§4.F): bytes
/// from the gRPC stream are enqueued on `console.from_device` (the
/// console's "recvCh"); bytes dequeued from `console.to_device` (the
/// console's "sendCh") are sent to the gRPC stream.
async fn stream_to_channel(stream: StreamHandle, console: ConsoleHandle) {
    let StreamHandle { outbound: stream_tx, inbound: mut stream_rx, .. } = stream;
    let ConsoleHandle { mut to_device, from_device, .. } = console;

    let device_to_console = async move {
        while let Some(msg) = stream_rx.recv().await {
            match msg {
                Message::Payload(bytes) => {
                    if from_device.send(bytes).await.is_err() {
                        break;
                    }
                }
                Message::Closed => break,
            }
        }
        // Dropping the sender closes the console's recvCh.
    };

    let console_to_device = async move {
        while let Some(bytes) = to_device.recv().await {
            if stream_tx.send(Ok(Message::Payload(bytes).into())).await.is_err() {
                return;
            }
        }
        // sendCh closed: tell the device side, best-effort.
        let _ = stream_tx.send(Ok(Message::Closed.into())).await;
    };

    tokio::join!(device_to_console, console_to_device);
}
