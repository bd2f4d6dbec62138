//! # Coopsweeper
//!
//! Cooperative multiplayer Minesweeper over WebSocket.
//!
//! Every room owns one shared board. Participants connect, join a room by
//! its code, and click, flag and move their cursors on the same board;
//! after every change each participant receives the complete room state.
//!
//! This crate is the transport adapter that ties the layers together:
//!
//! ```text
//! WebSocket (coopsweeper-transport)
//!     ↕ Envelope (coopsweeper-protocol)
//! connection handler (this crate)
//!     ↕ RoomHandle
//! room actor (coopsweeper-room) → Board (coopsweeper-board)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coopsweeper::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), CoopsweeperError> {
//!     let server = CoopsweeperServer::builder()
//!         .bind("0.0.0.0:8080")
//!         .build()
//!         .await?;
//!     server.run().await
//! }
//! ```

mod config;
mod error;
mod handler;
mod identity;
mod server;
mod sink;

pub use config::ServerConfig;
pub use error::CoopsweeperError;
pub use identity::{MAX_USERNAME_LEN, generate_identity, normalize_username};
pub use server::{CoopsweeperServer, CoopsweeperServerBuilder, PROTOCOL_VERSION};
pub use sink::{LogSink, ResultSink, SinkError};

pub use coopsweeper_board::{BoardConfig, Coord, Difficulty, GameStatus};
pub use coopsweeper_protocol::{
    Envelope, GameMessage, JsonCodec, ParticipantId, Payload, RoomId, RoomListEntry, RoomSnapshot,
    SystemMessage,
};
pub use coopsweeper_room::{GameResult, ResultParticipant};

/// Everything needed to run a server or write a client test.
pub mod prelude {
    pub use crate::{
        BoardConfig, CoopsweeperError, CoopsweeperServer, CoopsweeperServerBuilder, Envelope,
        GameMessage, GameResult, GameStatus, JsonCodec, LogSink, PROTOCOL_VERSION, ParticipantId,
        Payload, ResultSink, RoomId, RoomSnapshot, ServerConfig, SinkError, SystemMessage,
    };
}
