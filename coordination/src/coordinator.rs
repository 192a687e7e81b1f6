//! Debate coordinator - process-wide session directory and round protocol
//!
//! The coordinator maps topics to their current session and connections to
//! the session (and identity) they registered with. Every operation takes the
//! directory lock before a session lock, and releases both before awaiting a
//! suspended admission.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info};

use crate::config::{DebateConfig, SubmitShape};
use crate::error::{DebateError, DebateResult};
use crate::events::{DebateEvent, SharedEventBus};
use crate::session::{
    lock_session, preview, reader_key, Participant, PersonaMetadata, RoundReceipt, Session,
    SessionStatus, SharedSession, Snapshot,
};

/// Identifier of one physical client connection.
pub type ConnectionKey = String;

/// Shared reference to Coordinator
pub type SharedCoordinator = Arc<Coordinator>;

/// Arguments of a registration.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
    pub identity: String,
    pub topic: String,
    pub initial_text: String,
    pub metadata: Option<PersonaMetadata>,
}

impl RegisterRequest {
    pub fn new(identity: &str, topic: &str, initial_text: &str) -> Self {
        Self {
            identity: identity.to_string(),
            topic: topic.to_string(),
            initial_text: initial_text.to_string(),
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: PersonaMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// Registration released by the barrier.
#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub participant_id: String,
    pub is_new: bool,
    pub snapshot: Arc<Snapshot>,
}

/// Acknowledgement of a submitted round.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub identity: String,
    pub current_round: u32,
    pub rounds_remaining: u32,
    pub max_rounds: u32,
    /// Present when the deployment inlines the snapshot into submit.
    pub snapshot: Option<Arc<Snapshot>>,
}

/// Session a connection is bound to, and who registered on it.
#[derive(Debug, Clone)]
struct Binding {
    session: SharedSession,
    identity: String,
}

#[derive(Debug, Default)]
struct SessionDirectory {
    by_topic: HashMap<String, SharedSession>,
    by_connection: HashMap<ConnectionKey, Binding>,
}

/// Central coordinator for debate sessions
#[derive(Debug)]
pub struct Coordinator {
    config: DebateConfig,
    directory: Mutex<SessionDirectory>,
    events: SharedEventBus,
}

impl Coordinator {
    /// Create a new coordinator
    pub fn new(config: DebateConfig, events: SharedEventBus) -> Self {
        Self {
            config,
            directory: Mutex::new(SessionDirectory::default()),
            events,
        }
    }

    /// Create a shared reference to this coordinator
    pub fn shared(self) -> SharedCoordinator {
        Arc::new(self)
    }

    pub fn config(&self) -> &DebateConfig {
        &self.config
    }

    pub fn events(&self) -> &SharedEventBus {
        &self.events
    }

    // =========================================================================
    // Registration phase
    // =========================================================================

    /// Register a participant and wait for the registration period to end.
    ///
    /// Binds `connection` to the joined session. Resolves with the snapshot
    /// taken when the barrier fired.
    pub async fn register(
        &self,
        connection: &str,
        request: RegisterRequest,
    ) -> DebateResult<RegisterOutcome> {
        let RegisterRequest {
            identity,
            topic,
            initial_text,
            metadata,
        } = request;

        let registration = {
            let mut directory = self.directory();
            let key = self.config.session_key(&topic).to_string();

            let mut session = self.open_session(&mut directory, &key, &topic);
            let registration = loop {
                let attempt =
                    lock_session(&session).try_register(&identity, &initial_text, metadata.clone());
                match attempt {
                    Some(registration) => break registration,
                    // closed between lookup and lock: late joiners start the next session
                    None => session = self.create_session(&mut directory, &key, &topic),
                }
            };

            directory.by_connection.insert(
                connection.to_string(),
                Binding {
                    session,
                    identity: identity.clone(),
                },
            );
            registration
        };

        debug!(
            connection,
            identity = %identity,
            session_id = %registration.session_id,
            "Registration request is waiting for registration period to end"
        );
        let snapshot = registration.admission.resolve().await?;

        Ok(RegisterOutcome {
            participant_id: registration.participant.identity,
            is_new: registration.is_new,
            snapshot,
        })
    }

    // =========================================================================
    // Round phase
    // =========================================================================

    /// Submit the next round for `identity`, or for the identity registered
    /// on `connection` when none is given.
    pub fn submit(
        &self,
        connection: &str,
        identity: Option<&str>,
        text: &str,
    ) -> DebateResult<SubmitOutcome> {
        let binding = self.binding(connection)?;
        let identity = identity.unwrap_or(&binding.identity);

        let RoundReceipt {
            identity,
            current_round,
            rounds_remaining,
            snapshot,
        } = lock_session(&binding.session).submit(identity, text)?;

        let snapshot = match self.config.submit_shape {
            SubmitShape::Ack => None,
            SubmitShape::WithResponses => Some(snapshot),
        };

        Ok(SubmitOutcome {
            identity,
            current_round,
            rounds_remaining,
            max_rounds: self.config.max_rounds,
            snapshot,
        })
    }

    /// Read every contribution so far, waiting out the registration period.
    pub async fn read(&self, connection: &str) -> DebateResult<Arc<Snapshot>> {
        let binding = self.binding(connection)?;
        let admission = lock_session(&binding.session).admit(&reader_key(connection));
        admission.resolve().await
    }

    /// Phase and size of the connection's session, without waiting.
    pub fn status(&self, connection: &str) -> DebateResult<SessionStatus> {
        let binding = self.binding(connection)?;
        let status = lock_session(&binding.session).status();
        Ok(status)
    }

    /// Copy of a participant in the connection's session.
    pub fn participant(&self, connection: &str, identity: &str) -> DebateResult<Participant> {
        let binding = self.binding(connection)?;
        let session = lock_session(&binding.session);
        session
            .participant(identity)
            .cloned()
            .ok_or_else(|| DebateError::ParticipantNotFound {
                identity: identity.to_string(),
            })
    }

    /// Identity registered on a connection, if any.
    pub fn bound_identity(&self, connection: &str) -> Option<String> {
        self.directory()
            .by_connection
            .get(connection)
            .map(|binding| binding.identity.clone())
    }

    /// Number of topics with a current session.
    pub fn topic_count(&self) -> usize {
        self.directory().by_topic.len()
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn directory(&self) -> MutexGuard<'_, SessionDirectory> {
        self.directory.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn binding(&self, connection: &str) -> DebateResult<Binding> {
        self.directory()
            .by_connection
            .get(connection)
            .cloned()
            .ok_or(DebateError::SessionNotFound)
    }

    /// Current session for `key` if it still accepts registrations.
    fn open_session(
        &self,
        directory: &mut SessionDirectory,
        key: &str,
        topic: &str,
    ) -> SharedSession {
        if let Some(existing) = directory.by_topic.get(key) {
            if lock_session(existing).is_registration_open() {
                return Arc::clone(existing);
            }
        }
        self.create_session(directory, key, topic)
    }

    fn create_session(
        &self,
        directory: &mut SessionDirectory,
        key: &str,
        topic: &str,
    ) -> SharedSession {
        let session = Session::shared(topic, &self.config, Arc::clone(&self.events));
        let session_id = lock_session(&session).id().to_string();

        // a replaced session lives on through the connections bound to it
        directory
            .by_topic
            .insert(key.to_string(), Arc::clone(&session));

        self.events.publish(DebateEvent::SessionCreated {
            session_id: session_id.clone(),
            topic: topic.to_string(),
            timestamp: Utc::now(),
        });
        info!(session_id = %session_id, topic = %preview(topic), "Debate session created");

        session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use std::time::Duration;

    fn coordinator(quiet_ms: u64) -> SharedCoordinator {
        let config = DebateConfig::default().with_quiet_period(Duration::from_millis(quiet_ms));
        Coordinator::new(config, EventBus::new().shared()).shared()
    }

    #[tokio::test]
    async fn test_unbound_connection() {
        let coordinator = coordinator(500);
        assert_eq!(
            coordinator.submit("nobody", None, "hi").unwrap_err(),
            DebateError::SessionNotFound
        );
        assert_eq!(
            coordinator.read("nobody").await.unwrap_err(),
            DebateError::SessionNotFound
        );
        assert_eq!(
            coordinator.status("nobody").unwrap_err(),
            DebateError::SessionNotFound
        );
        assert!(coordinator.bound_identity("nobody").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_register_binds_connection() {
        let coordinator = coordinator(500);
        let outcome = coordinator
            .register("conn-a", RegisterRequest::new("A", "X", "opening"))
            .await
            .unwrap();

        assert_eq!(outcome.participant_id, "A");
        assert!(outcome.is_new);
        assert_eq!(outcome.snapshot.participant_count, 1);
        assert_eq!(coordinator.bound_identity("conn-a").as_deref(), Some("A"));
        assert_eq!(coordinator.topic_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_defaults_to_bound_identity() {
        let coordinator = coordinator(500);
        coordinator
            .register("conn-a", RegisterRequest::new("A", "X", "opening"))
            .await
            .unwrap();

        let outcome = coordinator.submit("conn-a", None, "second").unwrap();
        assert_eq!(outcome.identity, "A");
        assert_eq!(outcome.current_round, 2);
        assert_eq!(outcome.rounds_remaining, 2);
        assert!(outcome.snapshot.is_none());

        assert_eq!(
            coordinator.participant("conn-a", "A").unwrap().rounds_completed,
            2
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_unpartitioned_sessions_share_one_key() {
        let config = DebateConfig::default()
            .with_quiet_period(Duration::from_millis(500))
            .with_partition_by_topic(false);
        let coordinator = Coordinator::new(config, EventBus::new().shared()).shared();

        let a = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator
                    .register("conn-a", RegisterRequest::new("A", "first topic", "a"))
                    .await
            })
        };
        let b = {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move {
                coordinator
                    .register("conn-b", RegisterRequest::new("B", "second topic", "b"))
                    .await
            })
        };

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert_eq!(a.snapshot.session_id, b.snapshot.session_id);
        assert_eq!(a.snapshot.participant_count, 2);
        // the first registrant names the shared session
        assert_eq!(a.snapshot.topic, "first topic");
        assert_eq!(coordinator.topic_count(), 1);
    }
}
