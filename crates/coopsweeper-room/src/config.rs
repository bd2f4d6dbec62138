//! Room configuration and lifecycle state.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// Settings shared by every room a registry spawns.
///
/// The board configuration is per room and passed at creation; this is the
/// part that the server operator tunes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Minimum spacing between cursor-only broadcasts. Moves inside the
    /// window are coalesced and the latest positions go out when it ends.
    /// Zero disables throttling.
    pub cursor_throttle: Duration,

    /// Capacity of each room's command channel. When full, senders wait.
    pub channel_size: usize,

    /// How long a room may sit in [`RoomState::Empty`] before its actor
    /// stops. The registry then treats it as gone.
    pub empty_timeout: Duration,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            cursor_throttle: Duration::from_millis(50),
            channel_size: 64,
            empty_timeout: Duration::from_secs(60),
        }
    }
}

// ---------------------------------------------------------------------------
// RoomState
// ---------------------------------------------------------------------------

/// The lifecycle state of a room.
///
/// ```text
/// Empty → Active → Destroying
/// ```
///
/// - **Empty**: created, nobody has joined yet. Stops after
///   [`RoomConfig::empty_timeout`] if nobody joins.
/// - **Active**: at least one participant. The board's own
///   `Playing / Won / Lost` status lives inside this state.
/// - **Destroying**: the last participant left or the room was shut down.
///   The actor stops and the registry forgets the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomState {
    Empty,
    Active,
    Destroying,
}

impl RoomState {
    /// Returns `true` if the room still accepts participants.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Empty | Self::Active)
    }
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Active => write!(f, "Active"),
            Self::Destroying => write!(f, "Destroying"),
        }
    }
}
