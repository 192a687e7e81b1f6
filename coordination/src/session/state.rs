//! Debate session state machine: registration phase, then rounds.
//!
//! ```text
//! Registering ──(quiet period elapses)──▶ Active
//!     ▲  │
//!     └──┘ register: re-arm barrier
//! ```
//!
//! A session is mutated only while its mutex is held. The barrier task holds
//! a weak reference and takes the same mutex when it fires.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::barrier::RegistrationBarrier;
use super::log::{Contribution, ResponseLog};
use super::registry::{Participant, ParticipantRegistry, PersonaMetadata};
use super::waiters::{Admission, PendingQueue, Snapshot};
use crate::config::DebateConfig;
use crate::error::{DebateError, DebateResult};
use crate::events::{DebateEvent, SharedEventBus};

/// Shared handle to a session.
pub type SharedSession = Arc<Mutex<Session>>;

/// Lock a session, recovering the guard if a previous holder panicked.
pub fn lock_session(session: &SharedSession) -> MutexGuard<'_, Session> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Phase of a debate session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Accepting participants; the barrier has not fired.
    Registering,
    /// Registration closed; participants exchange rounds.
    Active,
}

impl SessionPhase {
    pub fn is_registering(self) -> bool {
        self == Self::Registering
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registering => write!(f, "registering"),
            Self::Active => write!(f, "active"),
        }
    }
}

/// Result of a successful registration.
#[derive(Debug)]
pub struct Registration {
    pub session_id: String,
    pub participant: Participant,
    pub is_new: bool,
    pub admission: Admission,
}

/// Result of a successful submit.
#[derive(Debug, Clone)]
pub struct RoundReceipt {
    pub identity: String,
    pub current_round: u32,
    pub rounds_remaining: u32,
    pub snapshot: Arc<Snapshot>,
}

/// Phase and size of a session, without its contributions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub topic: String,
    pub phase: SessionPhase,
    pub participant_count: usize,
    pub contribution_count: usize,
    pub pending_waiters: usize,
}

/// A forming-then-closed group discussion over one topic.
#[derive(Debug)]
pub struct Session {
    id: String,
    topic: String,
    participants: ParticipantRegistry,
    log: ResponseLog,
    registration_open: bool,
    waiters: PendingQueue,
    barrier: RegistrationBarrier,
    created_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
    max_rounds: u32,
    events: SharedEventBus,
    this: Weak<Mutex<Session>>,
}

impl Session {
    /// Create a session in the registering phase.
    pub fn shared(topic: &str, config: &DebateConfig, events: SharedEventBus) -> SharedSession {
        let now = Utc::now();
        Arc::new_cyclic(|this| {
            Mutex::new(Self {
                id: Uuid::new_v4().to_string(),
                topic: topic.to_string(),
                participants: ParticipantRegistry::new(),
                log: ResponseLog::new(),
                registration_open: true,
                waiters: PendingQueue::new(),
                barrier: RegistrationBarrier::new(config.quiet_period),
                created_at: now,
                last_activity_at: now,
                max_rounds: config.max_rounds,
                events,
                this: this.clone(),
            })
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn phase(&self) -> SessionPhase {
        if self.registration_open {
            SessionPhase::Registering
        } else {
            SessionPhase::Active
        }
    }

    pub fn is_registration_open(&self) -> bool {
        self.registration_open
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    pub fn max_rounds(&self) -> u32 {
        self.max_rounds
    }

    pub fn participant(&self, identity: &str) -> Option<&Participant> {
        self.participants.find(identity)
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Join the session and record the initial contribution.
    ///
    /// Returns `None` when registration already closed; the caller must then
    /// start a new session instead. Must run inside a tokio runtime.
    pub fn try_register(
        &mut self,
        identity: &str,
        initial_text: &str,
        metadata: Option<PersonaMetadata>,
    ) -> Option<Registration> {
        if !self.registration_open {
            return None;
        }

        let (participant, is_new) = self.participants.join_or_get(&self.id, identity, metadata);
        let participant = participant.clone();
        self.log
            .append(Contribution::new(identity, &self.topic, initial_text));
        self.last_activity_at = Utc::now();
        self.arm_barrier();

        self.events.publish(DebateEvent::ParticipantJoined {
            session_id: self.id.clone(),
            identity: identity.to_string(),
            rejoined: !is_new,
            participant_count: self.participants.len(),
            timestamp: self.last_activity_at,
        });
        info!(
            session_id = %self.id,
            identity,
            rejoined = !is_new,
            participants = self.participants.len(),
            "Participant registered"
        );

        let admission = self.admit(identity);
        Some(Registration {
            session_id: self.id.clone(),
            participant,
            is_new,
            admission,
        })
    }

    /// Snapshot now if active, otherwise park a waiter under `key`.
    pub fn admit(&mut self, key: &str) -> Admission {
        if self.registration_open {
            debug!(session_id = %self.id, waiter = key, "Waiting for registration period to end");
            Admission::Waiting(self.waiters.enqueue(key))
        } else {
            Admission::Ready(Arc::new(self.snapshot()))
        }
    }

    /// Record one more round for `identity`.
    pub fn submit(&mut self, identity: &str, text: &str) -> DebateResult<RoundReceipt> {
        if self.registration_open {
            return Err(DebateError::RegistrationNotClosed);
        }
        if self.participants.find(identity).is_none() {
            return Err(DebateError::ParticipantNotFound {
                identity: identity.to_string(),
            });
        }

        let current_round = self.participants.advance_round(identity, self.max_rounds)?;
        let contribution = Contribution::new(identity, &self.topic, text);
        let timestamp = contribution.timestamp;
        self.log.append(contribution);

        self.events.publish(DebateEvent::ResponseSubmitted {
            session_id: self.id.clone(),
            identity: identity.to_string(),
            round: current_round,
            timestamp,
        });
        info!(session_id = %self.id, identity, round = current_round, "Response stored");

        Ok(RoundReceipt {
            identity: identity.to_string(),
            current_round,
            rounds_remaining: self.max_rounds.saturating_sub(current_round),
            snapshot: Arc::new(self.snapshot()),
        })
    }

    /// Close registration if `epoch` is the armed barrier epoch.
    ///
    /// Every waiter is released with one shared snapshot. Returns that
    /// snapshot, or `None` if the call was stale or the session already closed.
    pub fn close_registration(&mut self, epoch: u64) -> Option<Arc<Snapshot>> {
        if !self.registration_open || !self.barrier.is_current(epoch) {
            debug!(session_id = %self.id, epoch, "Ignoring stale barrier fire");
            return None;
        }

        self.registration_open = false;
        self.barrier.disarm();

        let snapshot = Arc::new(self.snapshot());
        let released = self.waiters.drain_all(&snapshot);

        self.events.publish(DebateEvent::RegistrationClosed {
            session_id: self.id.clone(),
            participant_count: snapshot.participant_count,
            contribution_count: snapshot.responses.len(),
            waiters_released: released,
            timestamp: snapshot.taken_at,
        });
        info!(
            session_id = %self.id,
            topic = %preview(&self.topic),
            participants = snapshot.participant_count,
            released,
            "Registration period ended"
        );

        Some(snapshot)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            session_id: self.id.clone(),
            topic: self.topic.clone(),
            phase: self.phase(),
            responses: self.log.snapshot(),
            participant_count: self.participants.len(),
            taken_at: Utc::now(),
        }
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus {
            session_id: self.id.clone(),
            topic: self.topic.clone(),
            phase: self.phase(),
            participant_count: self.participants.len(),
            contribution_count: self.log.len(),
            pending_waiters: self.waiters.len(),
        }
    }

    fn arm_barrier(&mut self) {
        let this = self.this.clone();
        self.barrier.arm(move |epoch| {
            if let Some(session) = this.upgrade() {
                lock_session(&session).close_registration(epoch);
            }
        });
    }
}

/// First 30 characters of a topic, for log lines and messages.
pub fn preview(topic: &str) -> String {
    match topic.char_indices().nth(30) {
        Some((idx, _)) => format!("{}...", &topic[..idx]),
        None => topic.to_string(),
    }
}
