//! Rooms for Coopsweeper.
//!
//! Each room runs as an isolated Tokio task (actor) that owns one board
//! and the room's participants. Every mutation arrives through the actor's
//! channel, so a room has exactly one writer and its broadcasts are always
//! consistent with its board.
//!
//! # Key types
//!
//! - [`RoomRegistry`]: creates, finds and destroys rooms
//! - [`RoomHandle`]: sends commands to a running room actor
//! - [`RoomOutbound`]: what a room pushes to each participant's connection
//! - [`RoomState`]: `Empty → Active → Destroying`
//! - [`GameResult`]: emitted when a board is won

mod config;
mod error;
mod manager;
mod participant;
mod result;
mod room;
mod throttle;

pub use config::{RoomConfig, RoomState};
pub use error::RoomError;
pub use manager::RoomRegistry;
pub use participant::Participant;
pub use result::{GameResult, ResultParticipant};
pub use room::{LeaveOutcome, ParticipantSender, RoomHandle, RoomInfo, RoomOutbound};
