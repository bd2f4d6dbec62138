//! Core protocol types for Coopsweeper's wire format.
//!
//! Every type here is serialized, sent over the socket, and deserialized on
//! the other side, so the serde attributes are part of the contract with
//! the browser client. The tests at the bottom pin the JSON shapes.

use std::collections::BTreeMap;
use std::fmt;

use coopsweeper_board::{BoardConfig, BoardView, GameStatus};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identity of one connected participant.
///
/// Issued by the server during the handshake and stable for the lifetime
/// of the connection. It is a plain string on the wire and is used as the
/// key of the `users` map in every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Longest accepted room id.
pub const MAX_ROOM_ID_LEN: usize = 32;

/// Identifier of a room, e.g. the four-digit code `"1234"`.
///
/// Any string decodes; [`is_valid`](Self::is_valid) is checked by the room
/// registry before a room is created under it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Non-empty, at most [`MAX_ROOM_ID_LEN`] characters, only ASCII
    /// letters, digits, `_` and `-`.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= MAX_ROOM_ID_LEN
            && self
                .0
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Participants and snapshots
// ---------------------------------------------------------------------------

/// A participant's pointer position in board pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
}

impl Cursor {
    /// Where a cursor sits before its owner first moves it: just off the
    /// top-left corner, so nothing is drawn over the board.
    pub const OFF_BOARD: Self = Self { x: -30.0, y: -30.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::OFF_BOARD
    }
}

/// What every occupant of a room sees about one participant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub username: String,
    pub cursor: Cursor,
    /// Cells this participant revealed since the last reset.
    pub squares_cleared: u32,
}

/// The complete, consistent state of one room.
///
/// Always sent whole; there are no deltas. Users are keyed by identity and
/// ordered, so two snapshots of the same state encode identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub board: BoardView,
    pub users: BTreeMap<ParticipantId, UserView>,
}

/// A summary of a room returned in room listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomListEntry {
    pub room_id: RoomId,
    /// Number of participants currently connected.
    pub participant_count: usize,
    pub config: BoardConfig,
    pub status: GameStatus,
}

// ---------------------------------------------------------------------------
// SystemMessage: connection and room plumbing
// ---------------------------------------------------------------------------

/// Messages that manage the connection and room membership.
///
/// Internally tagged, so a message reads as
/// `{ "type": "JoinRoom", "room_id": "1234" }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SystemMessage {
    // -- Connection lifecycle --
    /// Client → Server, first message on every connection.
    Handshake {
        version: u32,
        #[serde(default)]
        username: Option<String>,
    },

    /// Server → Client: the identity this connection will be known by.
    HandshakeAck {
        identity: ParticipantId,
        server_time: u64,
    },

    /// Either direction: the sender is going away.
    Disconnect { reason: String },

    // -- Heartbeat --
    /// Client → Server keep-alive. Also resets the idle timeout.
    Heartbeat { client_time: u64 },

    /// Server → Client: echoes `client_time` so the client can measure RTT.
    HeartbeatAck { client_time: u64, server_time: u64 },

    // -- Room management --
    /// Client → Server: create a room. Without `room_id` the server picks
    /// a free four-digit code. `config` defaults to the easy preset.
    CreateRoom {
        #[serde(default)]
        room_id: Option<RoomId>,
        #[serde(default)]
        config: BoardConfig,
    },

    /// Server → Client: the room now exists. The creator is not joined
    /// automatically.
    RoomCreated { room_id: RoomId },

    /// Client → Server: does this room exist?
    CheckRoom { room_id: RoomId },

    /// Server → Client: answer to `CheckRoom`.
    RoomStatus { room_id: RoomId, exists: bool },

    /// Client → Server: enter a room.
    JoinRoom { room_id: RoomId },

    /// Server → Client: admission succeeded. A `GameUpdate` follows.
    RoomJoined {
        room_id: RoomId,
        identity: ParticipantId,
    },

    /// Client → Server: leave the current room but keep the connection.
    LeaveRoom,

    /// Client → Server: list live rooms.
    ListRooms,

    /// Server → Client: answer to `ListRooms`.
    RoomList { rooms: Vec<RoomListEntry> },

    // -- Errors --
    /// Server → Client. `code` follows HTTP conventions: 400 bad request,
    /// 404 unknown room, 409 conflict.
    Error { code: u16, message: String },
}

// ---------------------------------------------------------------------------
// GameMessage: board events and state pushes
// ---------------------------------------------------------------------------

/// Messages about the shared board.
///
/// Client → Server: `click`, `flag`, `cursor_movement`, `reset`.
/// Server → Client: `GameUpdate` (full snapshot) and `UsersUpdate`
/// (participants only, sent for cursor movement).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum GameMessage {
    /// Reveal, or chord on a revealed number.
    #[serde(rename = "click")]
    Click { x: i32, y: i32 },

    /// Toggle a flag.
    #[serde(rename = "flag")]
    Flag { x: i32, y: i32 },

    /// Pointer moved. Pixel coordinates, not cells.
    #[serde(rename = "cursor_movement")]
    CursorMovement { x: f64, y: f64 },

    /// Start a fresh board with the room's configuration.
    #[serde(rename = "reset")]
    Reset,

    GameUpdate(RoomSnapshot),

    UsersUpdate {
        users: BTreeMap<ParticipantId, UserView>,
    },
}

// ---------------------------------------------------------------------------
// Payload / Envelope
// ---------------------------------------------------------------------------

/// The content of an envelope.
///
/// Adjacently tagged:
/// `{ "type": "System", "data": { "type": "Heartbeat", "client_time": 1 } }`
/// or `{ "type": "Game", "data": { "type": "click", "x": 0, "y": 0 } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Payload {
    System(SystemMessage),
    Game(GameMessage),
}

/// Every frame on the wire is one envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Per-connection, per-direction counter.
    pub seq: u64,

    /// Milliseconds since the sender's connection started.
    pub timestamp: u64,

    pub payload: Payload,
}

// =========================================================================
// Tests
// =========================================================================
