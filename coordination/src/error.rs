//! Coordinator error types
//!
//! Every failure a caller can provoke is a variant of [`DebateError`]. None of
//! them are fatal: the tool layer turns each one into a [`StructuredError`]
//! body with a machine-readable code and a recovery action, so a participant
//! can correct course without the server ever dropping the connection.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for coordinator operations
pub type DebateResult<T> = Result<T, DebateError>;

/// Errors that can occur while coordinating a debate
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebateError {
    /// The connection never registered, so no session is bound to it
    #[error("No session found for this client")]
    SessionNotFound,

    /// The identity never registered in the bound session
    #[error("Participant '{identity}' not found in this session")]
    ParticipantNotFound { identity: String },

    /// The participant has used every round it is allowed
    #[error("You have completed all {max_rounds} rounds of discussion.")]
    RoundLimitExceeded { max_rounds: u32 },

    /// A round operation arrived while the session was still registering
    #[error("Registration period has not ended yet")]
    RegistrationNotClosed,

    /// A suspended request lost its continuation before being resolved
    #[error("Session was dropped before the pending request could be answered")]
    WaiterAbandoned,
}

impl DebateError {
    /// Machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::SessionNotFound => "SESSION_NOT_FOUND",
            Self::ParticipantNotFound { .. } => "PARTICIPANT_NOT_FOUND",
            Self::RoundLimitExceeded { .. } => "ROUND_LIMIT_EXCEEDED",
            Self::RegistrationNotClosed => "REGISTRATION_NOT_CLOSED",
            Self::WaiterAbandoned => "WAITER_ABANDONED",
        }
    }

    /// Actionable next step for the caller
    pub fn recovery_action(&self) -> String {
        match self {
            Self::SessionNotFound => {
                "Call register-participant first to join a debate session".to_string()
            }
            Self::ParticipantNotFound { identity } => format!(
                "Register '{}' with register-participant, or submit under the identity you registered with",
                identity
            ),
            Self::RoundLimitExceeded { .. } => {
                "The discussion is over for you. Use get-responses to read the final transcript"
                    .to_string()
            }
            Self::RegistrationNotClosed => {
                "Wait for register-participant to return (or call get-responses, which waits for registration to end)"
                    .to_string()
            }
            Self::WaiterAbandoned => "Register again to join a new session".to_string(),
        }
    }

    /// Rounds left for the caller, when the error concerns the round budget
    pub fn rounds_remaining(&self) -> Option<u32> {
        match self {
            Self::RoundLimitExceeded { .. } => Some(0),
            _ => None,
        }
    }

    /// Convert to the structured body returned to tool callers
    pub fn to_structured(&self) -> StructuredError {
        let mut structured =
            StructuredError::new(self.code(), self.to_string(), self.recovery_action());
        if let Self::RoundLimitExceeded { max_rounds } = self {
            structured.max_rounds = Some(*max_rounds);
            structured.rounds_remaining = self.rounds_remaining();
        }
        structured
    }
}

/// Structured error body returned by every tool on failure.
///
/// # Example Response
/// ```json
/// {
///   "status": "error",
///   "code": "ROUND_LIMIT_EXCEEDED",
///   "message": "You have completed all 4 rounds of discussion.",
///   "recoveryAction": "The discussion is over for you. Use get-responses to read the final transcript",
///   "roundsRemaining": 0,
///   "maxRounds": 4
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredError {
    /// Always `"error"`
    pub status: String,

    /// Machine-readable error code (e.g., "SESSION_NOT_FOUND")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Actionable recovery instruction for the caller
    pub recovery_action: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds_remaining: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
}

impl StructuredError {
    /// Create a new structured error
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        recovery_action: impl Into<String>,
    ) -> Self {
        Self {
            status: "error".to_string(),
            code: code.into(),
            message: message.into(),
            recovery_action: recovery_action.into(),
            rounds_remaining: None,
            max_rounds: None,
        }
    }
}

impl std::fmt::Display for StructuredError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for StructuredError {}

impl From<DebateError> for StructuredError {
    fn from(err: DebateError) -> Self {
        err.to_structured()
    }
}
