//! Debate Coordination Library
//!
//! This library provides:
//! - A debounced registration barrier that closes a debate once joins go quiet
//! - A fan-out queue releasing every suspended caller with one shared snapshot
//! - A round protocol capping how many contributions each participant makes
//! - MCP tools exposing the protocol to agent clients
//!
//! # Tools
//!
//! - `register-participant`: Join a debate and wait for registration to end
//! - `submit-response`: Record the next round
//! - `get-responses`: Read every contribution so far
//! - `get-session-status`: Check whether the session is still registering
//!
//! # Usage
//!
//! ```bash
//! # Serve one client over stdio
//! debate-coordination
//!
//! # Serve many clients over streamable HTTP
//! debate-coordination --transport http --bind 127.0.0.1:62887
//!
//! # Custom configuration
//! DEBATE_QUIET_PERIOD_MS=3000 DEBATE_MAX_ROUNDS=3 debate-coordination
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod server;
pub mod session;
pub mod tools;

pub use config::{DebateConfig, SubmitShape};
pub use coordinator::{
    Coordinator, RegisterOutcome, RegisterRequest, SharedCoordinator, SubmitOutcome,
};
pub use error::{DebateError, DebateResult, StructuredError};
pub use events::{DebateEvent, EventBus, EventBusExt, EventFilter, SharedEventBus};
pub use server::DebateServer;
pub use session::{Contribution, Participant, SessionPhase, SessionStatus, Snapshot};
