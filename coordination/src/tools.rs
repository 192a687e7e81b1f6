//! MCP tool bodies for debate coordination
//!
//! Provides the operations behind the four tools:
//! - register-participant: join a debate and wait for registration to end
//! - submit-response: record the next round
//! - get-responses: read every contribution so far
//! - get-session-status: phase and size of the bound session
//!
//! Each function returns a typed response; [`render`] turns it (or a
//! [`DebateError`]) into the JSON text handed back to the caller.

use rmcp::schemars;
use serde::{Deserialize, Serialize};

use crate::coordinator::{Coordinator, RegisterRequest};
use crate::error::{DebateError, DebateResult};
use crate::session::{preview, Contribution, PersonaMetadata, SessionPhase};

// ============================================================================
// Request/Response Types for MCP Tools
// ============================================================================

/// Request for register-participant tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RegisterParticipantRequest {
    #[serde(alias = "name")]
    #[schemars(description = "Name of the participant; unique within a debate")]
    pub identity: String,

    #[serde(alias = "prompt")]
    #[schemars(description = "Topic under discussion; participants with the same topic debate together")]
    pub topic: String,

    #[serde(alias = "initial_response")]
    #[schemars(description = "Opening contribution of this participant")]
    pub initial_text: String,

    #[serde(default, alias = "persona_metadata")]
    #[schemars(description = "Optional persona details, stored as given")]
    pub metadata: Option<PersonaMetadata>,
}

impl From<RegisterParticipantRequest> for RegisterRequest {
    fn from(req: RegisterParticipantRequest) -> Self {
        Self {
            identity: req.identity,
            topic: req.topic,
            initial_text: req.initial_text,
            metadata: req.metadata,
        }
    }
}

/// Response for register-participant tool
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterParticipantResponse {
    pub status: &'static str,
    pub message: String,
    pub participant_id: String,
    pub registration_open: bool,
    pub responses: Vec<Contribution>,
    pub participant_count: usize,
    pub instructions: String,
}

/// Request for submit-response tool
#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SubmitResponseRequest {
    #[serde(alias = "response")]
    #[schemars(description = "Your contribution for the next round")]
    pub text: String,

    #[serde(default, alias = "name")]
    #[schemars(description = "Identity to submit as (defaults to the one registered on this connection)")]
    pub identity: Option<String>,
}

/// Response for submit-response tool
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponseResponse {
    pub status: &'static str,
    pub message: String,
    pub current_round: u32,
    pub rounds_remaining: u32,
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<Contribution>>,
}

/// Response for get-responses tool
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GetResponsesResponse {
    pub status: &'static str,
    pub responses: Vec<Contribution>,
    pub participant_count: usize,
    pub topic: String,
    pub instructions: String,
}

/// Response for get-session-status tool
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusResponse {
    /// `ready`, `waiting` or `not_found`
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Tool Implementation Functions
// ============================================================================

/// Register a participant, resolving once the registration period ends
pub async fn register_participant(
    coordinator: &Coordinator,
    connection: &str,
    req: RegisterParticipantRequest,
) -> DebateResult<RegisterParticipantResponse> {
    let topic = req.topic.clone();
    let outcome = coordinator.register(connection, req.into()).await?;
    let name = &outcome.participant_id;

    Ok(RegisterParticipantResponse {
        status: "success",
        message: format!(
            "{} registered successfully for prompt \"{}\"",
            name,
            preview(&topic)
        ),
        participant_id: name.clone(),
        registration_open: false,
        responses: outcome.snapshot.responses.clone(),
        participant_count: outcome.snapshot.participant_count,
        instructions: register_instructions(name, coordinator.config().max_rounds),
    })
}

/// Store the next round for the caller
pub fn submit_response(
    coordinator: &Coordinator,
    connection: &str,
    req: SubmitResponseRequest,
) -> DebateResult<SubmitResponseResponse> {
    let outcome = coordinator.submit(connection, req.identity.as_deref(), &req.text)?;

    let instructions = if outcome.rounds_remaining == 0 {
        "You have completed all rounds of the discussion.".to_string()
    } else {
        "Continue to use \"get-responses\" to see other responses and \"submit-response\" for your next response.".to_string()
    };

    Ok(SubmitResponseResponse {
        status: "success",
        message: format!(
            "Response from {} has been stored successfully.",
            outcome.identity
        ),
        current_round: outcome.current_round,
        rounds_remaining: outcome.rounds_remaining,
        instructions,
        responses: outcome.snapshot.map(|s| s.responses.clone()),
    })
}

/// Read all contributions of the bound session
pub async fn get_responses(
    coordinator: &Coordinator,
    connection: &str,
) -> DebateResult<GetResponsesResponse> {
    let snapshot = coordinator.read(connection).await?;

    Ok(GetResponsesResponse {
        status: "success",
        responses: snapshot.responses.clone(),
        participant_count: snapshot.participant_count,
        topic: preview(&snapshot.topic),
        instructions: "Review these responses from other participants and stay in character. \
            Use the \"submit-response\" tool to submit your next response in the discussion."
            .to_string(),
    })
}

/// Phase of the bound session, without waiting
pub fn get_session_status(coordinator: &Coordinator, connection: &str) -> SessionStatusResponse {
    match coordinator.status(connection) {
        Ok(status) => SessionStatusResponse {
            status: match status.phase {
                SessionPhase::Registering => "waiting",
                SessionPhase::Active => "ready",
            },
            participant_count: Some(status.participant_count),
            topic: Some(status.topic),
            message: None,
        },
        Err(err) => SessionStatusResponse {
            status: "not_found",
            participant_count: None,
            topic: None,
            message: Some(err.to_string()),
        },
    }
}

/// Serialize a tool result, turning domain errors into a structured body.
///
/// Only a serialization failure is reported as `Err`.
pub fn render<T: Serialize>(result: DebateResult<T>) -> Result<String, String> {
    let body = match result {
        Ok(response) => serde_json::to_string_pretty(&response),
        Err(err) => serde_json::to_string_pretty(&error_body(err)),
    };
    body.map_err(|e| format!("Serialization error: {}", e))
}

fn error_body(err: DebateError) -> crate::error::StructuredError {
    tracing::debug!(code = err.code(), "Tool call rejected: {}", err);
    err.to_structured()
}

fn register_instructions(name: &str, max_rounds: u32) -> String {
    format!(
        "You are now participating as {name}. You have provided your initial thoughts. \
         After seeing the other responses, use the \"submit-response\" tool to send your \
         subsequent answers and the \"get-responses\" tool to read responses. \
         This conversation will continue for {max_rounds} rounds total. \
         Stay in character as {name} throughout the conversation."
    )
}
