//! The pairing table: matches two independently-arriving session parties by
//! UUID and hands the pair off to a forwarder task (§4.F).

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::handle::Arrival;

/// What occupies a session slot.
enum SlotState {
    /// One party has arrived and is waiting for its counterpart.
    Waiting(Waiter),
    /// Both parties arrived; the forwarder task owns them now.
    Paired,
    /// The session has torn down. Kept as a tombstone rather than removed so
    /// a late third arrival gets [`crate::error::RendezvousError::SessionClosed`]
    /// instead of silently starting a fresh pairing (§8 Property 7).
    Closed,
}

/// A party waiting alone in a slot, plus the signal it uses to learn when
/// its counterpart shows up (or the slot is evicted out from under it).
struct Waiter {
    arrival: Arrival,
    done_tx: oneshot::Sender<WaitOutcome>,
}

/// What a waiting caller learns once its wait ends.
pub enum WaitOutcome {
    /// A counterpart joined before the wait ended; forwarding already runs
    /// in a background task.
    Paired,
    /// The slot was evicted (caller disconnected or a soft timeout fired)
    /// before a counterpart arrived.
    Evicted,
}

/// The outcome of a call to [`RendezvousMap::join`].
pub enum JoinOutcome {
    /// This caller is first; it must wait on the returned receiver to learn
    /// whether (and when) it gets paired.
    Waiting(oneshot::Receiver<WaitOutcome>),
    /// This caller is second; pairing (and forwarding) has already started.
    Paired,
}

/// Thread-safe table of in-flight and completed rendezvous sessions.
///
/// Uses [`DashMap`]'s synchronous `Entry` API so no lock is ever held across
/// an `.await`: each `join` call does a single synchronous map operation and
/// returns immediately, spawning the forwarder (if pairing completed) as a
/// separate task.
#[derive(Default)]
pub struct RendezvousMap {
    slots: DashMap<Uuid, SlotState>,
}

impl RendezvousMap {
    /// Construct an empty table.
    pub fn new() -> Self {
        Self { slots: DashMap::new() }
    }

    /// Join `session_id` as `arrival`. If a counterpart is already waiting,
    /// pairs them and spawns the forwarder. Otherwise this arrival becomes
    /// the waiting party.
    ///
    /// Returns [`crate::error::RendezvousError::SessionFull`] if two parties
    /// already occupy the slot, or `SessionClosed` if the slot has already
    /// torn down.
    pub fn join(&self, session_id: Uuid, arrival: Arrival) -> Result<JoinOutcome, crate::error::RendezvousError> {
        match self.slots.entry(session_id) {
            Entry::Vacant(vacant) => {
                let (done_tx, done_rx) = oneshot::channel();
                vacant.insert(SlotState::Waiting(Waiter { arrival, done_tx }));
                Ok(JoinOutcome::Waiting(done_rx))
            }
            Entry::Occupied(mut occupied) => match occupied.get() {
                SlotState::Waiting(_) => {
                    let previous = std::mem::replace(occupied.get_mut(), SlotState::Paired);
                    let waiter = match previous {
                        SlotState::Waiting(w) => w,
                        _ => unreachable!("just matched Waiting"),
                    };
                    let _ = waiter.done_tx.send(WaitOutcome::Paired);
                    tokio::spawn(crate::forward::run(waiter.arrival, arrival));
                    Ok(JoinOutcome::Paired)
                }
                SlotState::Paired => Err(crate::error::RendezvousError::SessionFull),
                SlotState::Closed => Err(crate::error::RendezvousError::SessionClosed),
            },
        }
    }

    /// Evict `session_id` if (and only if) it is still in the `Waiting`
    /// state, signaling the waiter that it was evicted and marking the slot
    /// `Closed`. No-op if the slot is already `Paired` or `Closed`, or
    /// absent.
    ///
    /// Used when a waiting stream's client disconnects, or a console
    /// session is explicitly closed before a counterpart arrives.
    pub fn evict_if_waiting(&self, session_id: Uuid) {
        if let Some(mut entry) = self.slots.get_mut(&session_id) {
            if matches!(*entry, SlotState::Waiting(_)) {
                let previous = std::mem::replace(&mut *entry, SlotState::Closed);
                if let SlotState::Waiting(waiter) = previous {
                    let _ = waiter.done_tx.send(WaitOutcome::Evicted);
                }
            }
        }
    }

    /// Number of sessions currently tracked (any state). Exposed for tests
    /// and diagnostics.
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
