//! Wire protocol for Coopsweeper.
//!
//! This crate defines what clients and the server say to each other:
//!
//! - **Types** ([`Envelope`], [`SystemMessage`], [`GameMessage`],
//!   [`RoomSnapshot`]): the structures that travel on the wire.
//! - **Identity** ([`ParticipantId`], [`RoomId`]): string newtypes used as
//!   map keys throughout the room layer.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes become bytes.
//! - **Errors** ([`ProtocolError`]).
//!
//! The protocol layer knows nothing about connections or room actors. It
//! reuses the board crate's view types so a snapshot is serialized exactly
//! once, in the shape the engine produced it.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Room (board + participants)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Cursor, Envelope, GameMessage, MAX_ROOM_ID_LEN, ParticipantId, Payload, RoomId,
    RoomListEntry, RoomSnapshot, SystemMessage, UserView,
};
