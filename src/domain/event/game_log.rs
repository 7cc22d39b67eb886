use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry in the shared game log
///
/// Logs are collected in a durable queue so that none get lost while the authority is offline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameLog {
    /// Time at which the entry has been written
    pub timestamp: DateTime<Utc>,
    /// Participant the entry originates from
    pub participant: String,
    /// Free-form description of what happened
    pub message: String,
}

impl GameLog {
    /// Creates a new entry timestamped with the current time
    pub fn new(participant: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            participant: participant.into(),
            message: message.into(),
        }
    }
}
