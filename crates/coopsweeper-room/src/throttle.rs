//! Rate limiting for cursor-only broadcasts.
//!
//! Sits inside the room actor's `tokio::select!` loop next to the command
//! channel:
//!
//! ```ignore
//! loop {
//!     tokio::select! {
//!         cmd = receiver.recv() => { /* commands */ }
//!         () = throttle.wait_for_flush() => broadcast_users(),
//!     }
//! }
//! ```

use std::time::Duration;

use tokio::time::{self, Instant};

/// Decides when cursor movement is broadcast.
///
/// The first move after a quiet window goes out immediately. Moves inside
/// the window only arm a single deferred flush at the end of the window,
/// which then carries the latest positions.
#[derive(Debug)]
pub(crate) struct CursorThrottle {
    window: Duration,
    last_sent: Option<Instant>,
    flush_at: Option<Instant>,
}

impl CursorThrottle {
    pub(crate) fn new(window: Duration) -> Self {
        Self {
            window,
            last_sent: None,
            flush_at: None,
        }
    }

    /// Records a cursor move. Returns `true` if the caller should broadcast
    /// now; otherwise a flush has been scheduled.
    pub(crate) fn on_move(&mut self) -> bool {
        let now = Instant::now();
        match self.last_sent {
            Some(last) if now < last + self.window => {
                self.flush_at.get_or_insert(last + self.window);
                false
            }
            _ => {
                self.last_sent = Some(now);
                self.flush_at = None;
                true
            }
        }
    }

    /// Marks the deferred flush as sent.
    pub(crate) fn on_flush(&mut self) {
        self.last_sent = Some(Instant::now());
        self.flush_at = None;
    }

    /// A full update already carried every cursor; drop the pending flush.
    pub(crate) fn cancel_pending(&mut self) {
        self.flush_at = None;
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.flush_at.is_some()
    }

    /// Resolves when the deferred flush is due. Pends forever while none
    /// is scheduled.
    pub(crate) async fn wait_for_flush(&self) {
        match self.flush_at {
            Some(at) => time::sleep_until(at).await,
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_on_move_first_move_sends_immediately() {
        let mut throttle = CursorThrottle::new(Duration::from_millis(50));
        assert!(throttle.on_move());
        assert!(!throttle.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_move_inside_window_defers() {
        let mut throttle = CursorThrottle::new(Duration::from_millis(50));
        let start = Instant::now();
        assert!(throttle.on_move());

        time::advance(Duration::from_millis(10)).await;
        assert!(!throttle.on_move());
        assert!(!throttle.on_move());
        assert!(throttle.is_pending());

        throttle.wait_for_flush().await;
        let waited = Instant::now() - start;
        assert!(waited >= Duration::from_millis(50) && waited < Duration::from_millis(52));
        throttle.on_flush();
        assert!(!throttle.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_on_move_after_window_sends_immediately() {
        let mut throttle = CursorThrottle::new(Duration::from_millis(50));
        assert!(throttle.on_move());
        time::advance(Duration::from_millis(60)).await;
        assert!(throttle.on_move());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_pending_clears_flush() {
        let mut throttle = CursorThrottle::new(Duration::from_millis(50));
        throttle.on_move();
        throttle.on_move();
        assert!(throttle.is_pending());

        throttle.cancel_pending();
        assert!(!throttle.is_pending());
        let waited = time::timeout(Duration::from_secs(1), throttle.wait_for_flush()).await;
        assert!(waited.is_err(), "no flush should be scheduled");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_window_never_defers() {
        let mut throttle = CursorThrottle::new(Duration::ZERO);
        assert!(throttle.on_move());
        assert!(throttle.on_move());
        assert!(!throttle.is_pending());
    }
}
