//! Event types for debate coordination

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// All debate coordination events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DebateEvent {
    /// A new session started registering
    SessionCreated {
        session_id: String,
        topic: String,
        timestamp: DateTime<Utc>,
    },

    /// A participant registered (or re-registered) in a session
    ParticipantJoined {
        session_id: String,
        identity: String,
        rejoined: bool,
        participant_count: usize,
        timestamp: DateTime<Utc>,
    },

    /// The barrier fired and released every waiter
    RegistrationClosed {
        session_id: String,
        participant_count: usize,
        contribution_count: usize,
        waiters_released: usize,
        timestamp: DateTime<Utc>,
    },

    /// A participant submitted a round
    ResponseSubmitted {
        session_id: String,
        identity: String,
        round: u32,
        timestamp: DateTime<Utc>,
    },
}

impl DebateEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session_created",
            Self::ParticipantJoined { .. } => "participant_joined",
            Self::RegistrationClosed { .. } => "registration_closed",
            Self::ResponseSubmitted { .. } => "response_submitted",
        }
    }

    /// Get the timestamp of the event
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::SessionCreated { timestamp, .. }
            | Self::ParticipantJoined { timestamp, .. }
            | Self::RegistrationClosed { timestamp, .. }
            | Self::ResponseSubmitted { timestamp, .. } => *timestamp,
        }
    }

    /// Get the session this event belongs to
    pub fn session_id(&self) -> &str {
        match self {
            Self::SessionCreated { session_id, .. }
            | Self::ParticipantJoined { session_id, .. }
            | Self::RegistrationClosed { session_id, .. }
            | Self::ResponseSubmitted { session_id, .. } => session_id,
        }
    }

    /// Get the participant identity, if the event concerns one
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::ParticipantJoined { identity, .. } | Self::ResponseSubmitted { identity, .. } => {
                Some(identity)
            }
            _ => None,
        }
    }
}
