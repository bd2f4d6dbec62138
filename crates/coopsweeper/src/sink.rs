//! Where solved boards go.
//!
//! Rooms report every won board as a [`GameResult`]. Storing them (best
//! times, per-user history) belongs to an external service, so the server
//! only hands results to a [`ResultSink`] and never reads anything back.

use coopsweeper_room::GameResult;
use tokio::sync::mpsc;

/// Errors a [`ResultSink`] may report. They are logged and the result is
/// dropped; nothing is retried.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The backing store could not be reached.
    #[error("result store unavailable: {0}")]
    Unavailable(String),

    /// The store refused this result.
    #[error("result rejected: {0}")]
    Rejected(String),
}

/// Records solved boards.
///
/// # Example
///
/// ```rust
/// use coopsweeper::{GameResult, ResultSink, SinkError};
///
/// /// Only keeps solo games.
/// struct SoloOnly;
///
/// impl ResultSink for SoloOnly {
///     async fn record(&self, result: GameResult) -> Result<(), SinkError> {
///         if result.participants.len() != 1 {
///             return Err(SinkError::Rejected("not a solo game".into()));
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait ResultSink: Send + Sync + 'static {
    fn record(
        &self,
        result: GameResult,
    ) -> impl std::future::Future<Output = Result<(), SinkError>> + Send;
}

/// Writes each result as a structured log line. The default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl ResultSink for LogSink {
    async fn record(&self, result: GameResult) -> Result<(), SinkError> {
        tracing::info!(
            room_id = %result.room_id,
            difficulty = %result.difficulty,
            config = %result.config,
            solve_time_ms = result.solve_time.as_millis() as u64,
            users = ?result.usernames(),
            "game result"
        );
        Ok(())
    }
}

/// Feeds results from the registry into `sink` until every sender is gone.
pub(crate) async fn drain_results<S: ResultSink>(
    mut results: mpsc::UnboundedReceiver<GameResult>,
    sink: S,
) {
    while let Some(result) = results.recv().await {
        let room_id = result.room_id.clone();
        if let Err(e) = sink.record(result).await {
            tracing::warn!(%room_id, error = %e, "failed to record game result");
        }
    }
    tracing::debug!("result channel closed");
}
