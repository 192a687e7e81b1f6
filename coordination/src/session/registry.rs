//! Per-session participant registry and round accounting.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DebateError, DebateResult};

/// Opaque persona metadata supplied at registration. Never interpreted.
pub type PersonaMetadata = HashMap<String, serde_json::Value>;

/// One registered voice in a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique within the owning session.
    pub identity: String,
    /// Owning session id.
    pub session_id: String,
    pub joined_at: DateTime<Utc>,
    /// Starts at 1: the registration contribution is round 1.
    pub rounds_completed: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PersonaMetadata>,
}

impl Participant {
    pub fn new(identity: &str, session_id: &str, metadata: Option<PersonaMetadata>) -> Self {
        Self {
            identity: identity.to_string(),
            session_id: session_id.to_string(),
            joined_at: Utc::now(),
            rounds_completed: 1,
            metadata,
        }
    }

    /// Count one more round, failing untouched once `max_rounds` is reached.
    pub fn advance_round(&mut self, max_rounds: u32) -> DebateResult<u32> {
        if self.rounds_completed >= max_rounds {
            return Err(DebateError::RoundLimitExceeded { max_rounds });
        }
        self.rounds_completed += 1;
        Ok(self.rounds_completed)
    }

    pub fn rounds_remaining(&self, max_rounds: u32) -> u32 {
        max_rounds.saturating_sub(self.rounds_completed)
    }
}

/// Participants of one session keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct ParticipantRegistry {
    participants: HashMap<String, Participant>,
}

impl ParticipantRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the participant for `identity`, creating it if unseen.
    ///
    /// The flag is `true` when the participant was created by this call. A
    /// returning participant keeps its join time and round count; supplied
    /// metadata replaces whatever was stored.
    pub fn join_or_get(
        &mut self,
        session_id: &str,
        identity: &str,
        metadata: Option<PersonaMetadata>,
    ) -> (&Participant, bool) {
        let mut is_new = false;
        let participant = self
            .participants
            .entry(identity.to_string())
            .and_modify(|existing| {
                if metadata.is_some() {
                    existing.metadata = metadata.clone();
                }
            })
            .or_insert_with(|| {
                is_new = true;
                Participant::new(identity, session_id, metadata.clone())
            });
        (participant, is_new)
    }

    pub fn find(&self, identity: &str) -> Option<&Participant> {
        self.participants.get(identity)
    }

    /// Advance the round counter of a registered participant.
    pub fn advance_round(&mut self, identity: &str, max_rounds: u32) -> DebateResult<u32> {
        self.participants
            .get_mut(identity)
            .ok_or_else(|| DebateError::ParticipantNotFound {
                identity: identity.to_string(),
            })?
            .advance_round(max_rounds)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}
