//! Event-driven notifications for debate coordination
//!
//! Sessions publish a [`DebateEvent`] at every lifecycle step so embedders
//! and diagnostics can follow a debate without polling the coordinator.
//!
//! # Event Flow
//!
//! ```text
//! ┌──────────────┐     ┌──────────────┐     ┌──────────────┐
//! │   Session    │────▶│  Event Bus   │────▶│  Subscribers │
//! │  (publish)   │     │  (broadcast) │     │   (recv)     │
//! └──────────────┘     └──────────────┘     └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use debate_coordination::events::{EventBusExt, EventFilter};
//!
//! let mut closed = coordinator
//!     .events()
//!     .subscribe_filtered(EventFilter::new().types(vec!["registration_closed"]));
//! let event = closed.recv().await?;
//! ```

pub mod bus;
pub mod types;

pub use bus::{EventBus, EventBusExt, EventFilter, FilteredReceiver, SharedEventBus};
pub use types::DebateEvent;
