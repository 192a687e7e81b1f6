//! MCP server exposing the debate tools
//!
//! One [`DebateServer`] instance serves one client connection. It carries a
//! fresh connection key, which the coordinator binds to a session on the first
//! `register-participant` call.

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};
use uuid::Uuid;

use crate::coordinator::SharedCoordinator;
use crate::tools::{self, RegisterParticipantRequest, SubmitResponseRequest};

/// MCP server for a single client connection
#[derive(Clone)]
pub struct DebateServer {
    coordinator: SharedCoordinator,
    connection: String,
    tool_router: ToolRouter<Self>,
}

impl DebateServer {
    pub fn new(coordinator: SharedCoordinator) -> Self {
        Self::with_connection(coordinator, Uuid::new_v4().to_string())
    }

    pub fn with_connection(coordinator: SharedCoordinator, connection: String) -> Self {
        tracing::debug!(connection = %connection, "New debate connection");
        Self {
            coordinator,
            connection,
            tool_router: Self::tool_router(),
        }
    }

    /// Key identifying this connection to the coordinator
    pub fn connection(&self) -> &str {
        &self.connection
    }
}

#[tool_router]
impl DebateServer {
    #[tool(
        name = "register-participant",
        description = "Register as a participant in a debate on a topic and provide your initial response. Waits until the registration period ends, then returns every participant's opening response."
    )]
    async fn register_participant(
        &self,
        Parameters(req): Parameters<RegisterParticipantRequest>,
    ) -> Result<String, String> {
        tools::render(tools::register_participant(&self.coordinator, &self.connection, req).await)
    }

    #[tool(
        name = "submit-response",
        description = "Submit your next response in the debate. Each participant has a fixed number of rounds, counting the initial response."
    )]
    async fn submit_response(
        &self,
        Parameters(req): Parameters<SubmitResponseRequest>,
    ) -> Result<String, String> {
        tools::render(tools::submit_response(&self.coordinator, &self.connection, req))
    }

    #[tool(
        name = "get-responses",
        description = "Get all responses in your debate session, ordered by time. Waits if registration has not ended yet.",
        annotations(read_only_hint = true)
    )]
    async fn get_responses(&self) -> Result<String, String> {
        tools::render(tools::get_responses(&self.coordinator, &self.connection).await)
    }

    #[tool(
        name = "get-session-status",
        description = "Check whether your debate session is still registering (waiting) or ready for rounds.",
        annotations(read_only_hint = true)
    )]
    async fn get_session_status(&self) -> Result<String, String> {
        tools::render(Ok(tools::get_session_status(
            &self.coordinator,
            &self.connection,
        )))
    }
}

#[tool_handler]
impl ServerHandler for DebateServer {
    fn get_info(&self) -> ServerInfo {
        let max_rounds = self.coordinator.config().max_rounds;
        let instructions = format!(
            "Debate coordination server. Participants on the same topic debate together.\n\
             1. `register-participant` with your name, the topic and your initial response. \
             The call returns once no one else has joined for a short quiet period, with every opening response.\n\
             2. `submit-response` to add each further round ({max_rounds} rounds in total, counting the initial response).\n\
             3. `get-responses` to read the whole discussion.\n\
             - `get-session-status`: read-only, returns immediately.\n\
             Errors carry a `code` and a `recoveryAction` describing the next step."
        );

        ServerInfo {
            instructions: Some(instructions),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
