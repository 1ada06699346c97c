//! Poller lifecycle.
//!
//! ```text
//! Idle ──start──▶ Streaming ──stop──▶ Stopped
//!                     ▲                  │
//!                     └──────start───────┘
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollerState {
    /// Never started; no timer registered.
    #[default]
    Idle,
    /// Timer armed; one request per tick.
    Streaming,
    /// Timer cancelled. Requests issued before the stop may still land.
    Stopped,
}

impl PollerState {
    pub fn can_start(self) -> bool {
        !matches!(self, Self::Streaming)
    }

    pub fn can_stop(self) -> bool {
        matches!(self, Self::Streaming)
    }
}

impl fmt::Display for PollerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Streaming => "streaming",
            Self::Stopped => "stopped",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transitions() {
        assert!(PollerState::Idle.can_start());
        assert!(PollerState::Stopped.can_start());
        assert!(!PollerState::Streaming.can_start());

        assert!(PollerState::Streaming.can_stop());
        assert!(!PollerState::Idle.can_stop());
        assert!(!PollerState::Stopped.can_stop());
    }
}
