//! Solved-board records handed to the persistence collaborator.

use std::time::Duration;

use coopsweeper_board::{BoardConfig, Difficulty};
use coopsweeper_protocol::{ParticipantId, RoomId};
use serde::Serialize;

/// Emitted once per board, on the transition to `Won`.
///
/// Carries what a best-time store needs: who solved it together, how
/// fast, and on which difficulty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameResult {
    pub room_id: RoomId,
    pub difficulty: Difficulty,
    pub config: BoardConfig,
    /// First click to last reveal.
    pub solve_time: Duration,
    pub participants: Vec<ResultParticipant>,
}

/// A participant's share of a solved board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultParticipant {
    pub identity: ParticipantId,
    pub username: String,
    pub squares_cleared: u32,
}

impl GameResult {
    /// Usernames of everyone in the room, for "solved with" listings.
    pub fn usernames(&self) -> Vec<&str> {
        self.participants.iter().map(|p| p.username.as_str()).collect()
    }
}
