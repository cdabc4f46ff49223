//! Pending-request table: the turn primitive shared by the dispatcher and
//! the connection manager.
//!
//! The dispatcher registers a slot before sending a blocking request; the
//! inbound handler completes a slot for every non-lifecycle message. How a
//! message picks its slot depends on the [`CorrelationPolicy`].

use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::{Mutex, oneshot};

use crate::error::ClientError;
use crate::protocol::{RequestKind, ResponseEnvelope};

/// How inbound messages are paired with pending requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CorrelationPolicy {
    /// Fixed per-kind identifiers. At most one blocking request is in
    /// flight; any non-lifecycle message completes it. Correct only
    /// because the remote application answers in request order.
    #[default]
    SingleFlight,
    /// Each request gets the fixed identifier plus a UUID suffix, and a
    /// message completes the slot whose identifier it echoes. Blocking
    /// requests may overlap.
    UniqueIds,
}

impl CorrelationPolicy {
    /// Identifier to put on the wire for a request of `kind`.
    #[must_use]
    pub fn request_id(self, kind: RequestKind) -> String {
        match self {
            Self::SingleFlight => kind.request_id().to_string(),
            Self::UniqueIds => format!("{}-{}", kind.request_id(), uuid::Uuid::new_v4()),
        }
    }
}

impl FromStr for CorrelationPolicy {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single_flight" | "single-flight" => Ok(Self::SingleFlight),
            "unique_ids" | "unique-ids" => Ok(Self::UniqueIds),
            other => Err(ClientError::Config(format!(
                "unknown correlation policy: {other}"
            ))),
        }
    }
}

#[derive(Debug)]
struct PendingSlot {
    request_id: String,
    responder: oneshot::Sender<ResponseEnvelope>,
}

#[derive(Debug, Default)]
struct PendingTable {
    slots: VecDeque<PendingSlot>,
    closed: bool,
}

/// Queue of requests awaiting a response.
///
/// Cheap to clone; clones share the same table.
#[derive(Debug, Clone)]
pub struct PendingRequests {
    policy: CorrelationPolicy,
    table: Arc<Mutex<PendingTable>>,
}

impl PendingRequests {
    /// Creates an empty table.
    #[must_use]
    pub fn new(policy: CorrelationPolicy) -> Self {
        Self {
            policy,
            table: Arc::new(Mutex::new(PendingTable::default())),
        }
    }

    /// The policy this table completes slots by.
    #[must_use]
    pub const fn policy(&self) -> CorrelationPolicy {
        self.policy
    }

    /// Opens a slot for `request_id` and returns the receiving end.
    ///
    /// The receiver resolves with the completing message, or with an error
    /// once the table is closed. Registering on a closed table yields a
    /// receiver that fails immediately.
    pub async fn register(&self, request_id: String) -> oneshot::Receiver<ResponseEnvelope> {
        let (responder, rx) = oneshot::channel();
        let mut table = self.table.lock().await;
        if !table.closed {
            table.slots.push_back(PendingSlot {
                request_id,
                responder,
            });
        }
        rx
    }

    /// Completes one slot with `envelope`.
    ///
    /// Slots whose waiter has gone away are skipped. Returns `false` if no
    /// waiting slot matched.
    pub async fn complete(&self, envelope: ResponseEnvelope) -> bool {
        let mut table = self.table.lock().await;
        let slots = &mut table.slots;
        match self.policy {
            CorrelationPolicy::SingleFlight => loop {
                let Some(slot) = slots.pop_front() else {
                    return false;
                };
                if slot.responder.is_closed() {
                    continue;
                }
                return slot.responder.send(envelope).is_ok();
            },
            CorrelationPolicy::UniqueIds => {
                slots.retain(|slot| !slot.responder.is_closed());
                let Some(id) = envelope.request_id.as_deref() else {
                    return false;
                };
                let Some(pos) = slots.iter().position(|slot| slot.request_id == id) else {
                    return false;
                };
                let Some(slot) = slots.remove(pos) else {
                    return false;
                };
                slot.responder.send(envelope).is_ok()
            }
        }
    }

    /// Drops every slot, waking all waiters with an error, and refuses
    /// further registrations.
    ///
    /// Returns the number of slots dropped.
    pub async fn close_all(&self) -> usize {
        let mut table = self.table.lock().await;
        table.closed = true;
        let count = table.slots.len();
        table.slots.clear();
        count
    }

    /// Number of open slots.
    pub async fn len(&self) -> usize {
        self.table.lock().await.slots.len()
    }

    /// Returns `true` if no slot is open.
    pub async fn is_empty(&self) -> bool {
        self.table.lock().await.slots.is_empty()
    }
}
