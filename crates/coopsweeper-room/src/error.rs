//! Error types for the room layer.

use coopsweeper_board::BoardError;
use coopsweeper_protocol::{ParticipantId, RoomId};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(RoomId),

    /// A live room already uses this id.
    #[error("room {0} already exists")]
    RoomAlreadyExists(RoomId),

    /// The board configuration cannot be played.
    #[error(transparent)]
    InvalidConfig(#[from] BoardError),

    #[error("invalid room id {0:?}")]
    InvalidRoomId(String),

    #[error("participant {0} not in room {1}")]
    NotInRoom(ParticipantId, RoomId),

    /// The room's actor is gone or its channel is closed.
    #[error("room {0} is unavailable")]
    Unavailable(RoomId),

    #[error("invalid room state for this operation: {0}")]
    InvalidState(String),
}
