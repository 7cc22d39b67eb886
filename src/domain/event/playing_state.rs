use serde::{Deserialize, Serialize};

/// Authority paused or resumed the game
///
/// Broadcast on the direct exchange with the `pause` key, so every participant mailbox
/// bound to that key receives one copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayingState {
    /// Whether moves are currently forbidden
    pub paused: bool,
}

impl PlayingState {
    /// State announcing that the game has been paused
    pub fn paused() -> Self {
        Self { paused: true }
    }

    /// State announcing that the game has been resumed
    pub fn resumed() -> Self {
        Self { paused: false }
    }
}
