//! Append-only response log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped message in a debate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
    /// Who said it.
    pub identity: String,
    /// Topic of the session it belongs to.
    pub topic: String,
    /// The message body.
    pub text: String,
    /// When it was recorded, encoded as Unix epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

impl Contribution {
    /// Create a contribution stamped with the current time.
    pub fn new(identity: &str, topic: &str, text: &str) -> Self {
        Self::at(identity, topic, text, Utc::now())
    }

    /// Create a contribution with an explicit timestamp.
    pub fn at(identity: &str, topic: &str, text: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            identity: identity.to_string(),
            topic: topic.to_string(),
            text: text.to_string(),
            timestamp,
        }
    }
}

/// Ordered record of every contribution in a session.
///
/// Entries are kept in append order. Reads go through [`ResponseLog::snapshot`],
/// which orders by timestamp and keeps append order between equal timestamps.
#[derive(Debug, Clone, Default)]
pub struct ResponseLog {
    entries: Vec<Contribution>,
}

impl ResponseLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, contribution: Contribution) {
        self.entries.push(contribution);
    }

    /// Copy of the log sorted by ascending timestamp.
    pub fn snapshot(&self) -> Vec<Contribution> {
        let mut sorted = self.entries.clone();
        // stable: ties keep append order
        sorted.sort_by_key(|c| c.timestamp);
        sorted
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
