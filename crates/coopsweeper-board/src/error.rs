//! Error types for the board engine.

/// Errors that can occur when building a board.
///
/// Gameplay itself never fails: an illegal click or flag is a no-op that
/// reports "nothing happened" through its return value, so one stale or
/// hostile client cannot break a shared board.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    /// The dimensions or mine count cannot form a playable board.
    #[error("invalid board config: {0}")]
    InvalidConfig(String),
}
