//! Pending-request fan-out queue.
//!
//! Callers that arrive while a session is still registering park a
//! [`oneshot`] sender here. When the barrier fires, [`PendingQueue::drain_all`]
//! sends every one of them the same [`Snapshot`] and empties the queue.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::debug;

use super::log::Contribution;
use super::state::SessionPhase;
use crate::error::{DebateError, DebateResult};

/// Immutable view of a session at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub session_id: String,
    pub topic: String,
    pub phase: SessionPhase,
    /// Contributions sorted by timestamp, append order between ties.
    pub responses: Vec<Contribution>,
    pub participant_count: usize,
    pub taken_at: DateTime<Utc>,
}

/// Key for a read-only waiter on a connection, kept apart from identities.
pub fn reader_key(connection: &str) -> String {
    format!("client-{}", connection)
}

/// Outcome of asking a session for its snapshot.
#[derive(Debug)]
pub enum Admission {
    /// The session is active; the snapshot is available now.
    Ready(Arc<Snapshot>),
    /// The session is registering; the snapshot arrives when the barrier fires.
    Waiting(oneshot::Receiver<Arc<Snapshot>>),
}

impl Admission {
    /// Wait for the snapshot if it is not available yet.
    pub async fn resolve(self) -> DebateResult<Arc<Snapshot>> {
        match self {
            Self::Ready(snapshot) => Ok(snapshot),
            Self::Waiting(receiver) => receiver.await.map_err(|_| DebateError::WaiterAbandoned),
        }
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self, Self::Waiting(_))
    }
}

/// Suspended callers grouped by waiter key.
#[derive(Debug, Default)]
pub struct PendingQueue {
    waiters: HashMap<String, Vec<oneshot::Sender<Arc<Snapshot>>>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a caller under `key`. The caller must have checked the session is
    /// still registering while holding the session lock.
    pub fn enqueue(&mut self, key: &str) -> oneshot::Receiver<Arc<Snapshot>> {
        let (sender, receiver) = oneshot::channel();
        self.waiters.entry(key.to_string()).or_default().push(sender);
        receiver
    }

    /// Resolve every waiter with `snapshot` and clear the queue.
    ///
    /// Returns how many waiters were still listening.
    pub fn drain_all(&mut self, snapshot: &Arc<Snapshot>) -> usize {
        let mut released = 0;
        for (key, senders) in self.waiters.drain() {
            for sender in senders {
                if sender.send(Arc::clone(snapshot)).is_ok() {
                    released += 1;
                } else {
                    debug!(waiter = %key, "Waiter went away before registration closed");
                }
            }
        }
        released
    }

    /// Total number of parked callers.
    pub fn len(&self) -> usize {
        self.waiters.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}
