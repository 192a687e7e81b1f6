//! Deployment configuration for the debate coordinator.
//!
//! The quiet period, round cap and submit shape are fixed per deployment.
//! Values come from environment variables and may be overridden on the
//! command line.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Debounce window after the last registration.
pub const DEFAULT_QUIET_PERIOD_MS: u64 = 500;

/// Registration counts as round 1.
pub const DEFAULT_MAX_ROUNDS: u32 = 4;

/// Session key used when sessions are not partitioned by topic.
pub const SHARED_SESSION_KEY: &str = "default";

/// What `submit-response` hands back on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitShape {
    /// Round number and rounds remaining only; callers read separately.
    #[default]
    Ack,
    /// Acknowledgement plus the full current snapshot.
    WithResponses,
}

impl SubmitShape {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "ack" | "acknowledge" => Some(Self::Ack),
            "with_responses" | "inline" | "combined" => Some(Self::WithResponses),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubmitShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ack => write!(f, "ack"),
            Self::WithResponses => write!(f, "with_responses"),
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateConfig {
    /// Quiet period that must elapse with no registration before the barrier fires
    pub quiet_period: Duration,

    /// Maximum rounds per participant, including the registration round
    pub max_rounds: u32,

    /// Shape of the submit acknowledgement
    pub submit_shape: SubmitShape,

    /// Whether sessions are keyed by topic or share one process-wide key
    pub partition_by_topic: bool,
}

impl Default for DebateConfig {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(DEFAULT_QUIET_PERIOD_MS),
            max_rounds: DEFAULT_MAX_ROUNDS,
            submit_shape: SubmitShape::Ack,
            partition_by_topic: true,
        }
    }
}

impl DebateConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(ms) = std::env::var("DEBATE_QUIET_PERIOD_MS") {
            if let Ok(n) = ms.parse() {
                config.quiet_period = Duration::from_millis(n);
            }
        }
        if let Ok(max) = std::env::var("DEBATE_MAX_ROUNDS") {
            if let Ok(n) = max.parse() {
                config = config.with_max_rounds(n);
            }
        }
        if let Ok(shape) = std::env::var("DEBATE_SUBMIT_SHAPE") {
            if let Some(shape) = SubmitShape::parse(&shape) {
                config.submit_shape = shape;
            }
        }
        if let Ok(val) = std::env::var("DEBATE_PARTITION_BY_TOPIC") {
            config.partition_by_topic = val.to_lowercase() == "true" || val == "1";
        }

        config
    }

    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = quiet_period;
        self
    }

    /// Set the round cap. Zero is raised to one since registration is round 1.
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    pub fn with_submit_shape(mut self, submit_shape: SubmitShape) -> Self {
        self.submit_shape = submit_shape;
        self
    }

    pub fn with_partition_by_topic(mut self, partition_by_topic: bool) -> Self {
        self.partition_by_topic = partition_by_topic;
        self
    }

    /// Directory key for a topic under this configuration
    pub fn session_key<'a>(&self, topic: &'a str) -> &'a str {
        if self.partition_by_topic {
            topic
        } else {
            SHARED_SESSION_KEY
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = DebateConfig::default();
        assert_eq!(config.quiet_period, Duration::from_millis(500));
        assert_eq!(config.max_rounds, 4);
        assert_eq!(config.submit_shape, SubmitShape::Ack);
        assert!(config.partition_by_topic);
    }

    #[test]
    fn test_max_rounds_floor() {
        let config = DebateConfig::default().with_max_rounds(0);
        assert_eq!(config.max_rounds, 1);
    }

    #[test]
    fn test_session_key() {
        let partitioned = DebateConfig::default();
        assert_eq!(partitioned.session_key("climate"), "climate");

        let shared = DebateConfig::default().with_partition_by_topic(false);
        assert_eq!(shared.session_key("climate"), SHARED_SESSION_KEY);
    }

    #[test]
    fn test_submit_shape_parse() {
        assert_eq!(SubmitShape::parse("ack"), Some(SubmitShape::Ack));
        assert_eq!(
            SubmitShape::parse(" With_Responses "),
            Some(SubmitShape::WithResponses)
        );
        assert_eq!(SubmitShape::parse("inline"), Some(SubmitShape::WithResponses));
        assert_eq!(SubmitShape::parse("bogus"), None);
        assert_eq!(SubmitShape::WithResponses.to_string(), "with_responses");
    }
}
