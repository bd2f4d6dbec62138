//! Unified error type for the Coopsweeper server.

use coopsweeper_board::BoardError;
use coopsweeper_protocol::ProtocolError;
use coopsweeper_room::RoomError;
use coopsweeper_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant lets `?` convert sub-crate
/// errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CoopsweeperError {
    /// A transport-level error (connection, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (not found, duplicate id, not a member).
    #[error(transparent)]
    Room(#[from] RoomError),

    #[error(transparent)]
    Board(#[from] BoardError),

    /// A malformed configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use coopsweeper_protocol::RoomId;

    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let err: CoopsweeperError = err.into();
        assert!(matches!(err, CoopsweeperError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let err: CoopsweeperError = err.into();
        assert!(matches!(err, CoopsweeperError::Protocol(_)));
    }

    #[test]
    fn test_from_room_error() {
        let err = RoomError::NotFound(RoomId::new("1234"));
        let err: CoopsweeperError = err.into();
        assert!(matches!(err, CoopsweeperError::Room(_)));
        assert!(err.to_string().contains("1234"));
    }

    #[test]
    fn test_config_error_message() {
        let err = CoopsweeperError::Config("PORT is not a number".into());
        assert_eq!(err.to_string(), "invalid configuration: PORT is not a number");
    }
}
