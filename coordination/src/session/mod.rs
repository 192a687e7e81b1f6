//! Debate sessions: registration barrier, fan-out queue and round protocol.
//!
//! # Session Lifecycle
//!
//! ```text
//! register ──▶ Registering ──(barrier fires)──▶ Active
//!   │   ▲          │                              │
//!   │   └──────────┘ re-arm quiet period          ├─ submit: next round (capped)
//!   │                                             └─ read: snapshot now
//!   └─ register after close ──▶ new session for the same topic
//! ```
//!
//! # Components
//!
//! - **ResponseLog**: append-only contributions, read as a time-ordered copy
//! - **ParticipantRegistry**: identities and their round counters
//! - **RegistrationBarrier**: debounced quiet-period timer with an epoch guard
//! - **PendingQueue**: parked callers released together with one snapshot
//! - **Session**: the state machine tying them together under one mutex

pub mod barrier;
pub mod log;
pub mod registry;
pub mod state;
pub mod waiters;

pub use barrier::RegistrationBarrier;
pub use log::{Contribution, ResponseLog};
pub use registry::{Participant, ParticipantRegistry, PersonaMetadata};
pub use state::{
    lock_session, preview, Registration, RoundReceipt, Session, SessionPhase, SessionStatus,
    SharedSession,
};
pub use waiters::{reader_key, Admission, PendingQueue, Snapshot};
