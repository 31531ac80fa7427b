//! Elapsed-seconds tracking for the playing source
//!
//! A coarse 1-second tick, not a media-clock sample position. Good enough for
//! seek targets and position display, which need no sub-second accuracy.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

const LOG_TARGET: &str = "resono::player::position";

/// Tracks elapsed playback seconds while running; retains the value when
/// stopped.
pub struct PositionTracker {
    seconds: Arc<AtomicU64>,
    ticker: Option<JoinHandle<()>>,
}

impl PositionTracker {
    pub fn new() -> Self {
        PositionTracker {
            seconds: Arc::new(AtomicU64::new(0)),
            ticker: None,
        }
    }

    /// (Re)starts the tick. With `initial` the position is set first; without
    /// it, counting continues from the retained value. A running tick is
    /// replaced, never doubled.
    pub fn start(&mut self, initial: Option<u64>) {
        if let Some(seconds) = initial {
            self.seconds.store(seconds, Ordering::SeqCst);
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }

        let seconds = self.seconds.clone();
        self.ticker = Some(tokio::spawn(async move {
            let mut tick = tokio::time::interval_at(
                tokio::time::Instant::now() + Duration::from_secs(1),
                Duration::from_secs(1),
            );
            loop {
                tick.tick().await;
                let now = seconds.fetch_add(1, Ordering::SeqCst) + 1;
                trace!(target: LOG_TARGET, "Position tick: {}s", now);
            }
        }));
    }

    /// Sets the position without touching the tick.
    pub fn set(&mut self, seconds: u64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }

    /// Halts the tick; the position value is retained.
    pub fn stop(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    /// Current position in seconds, valid whether running or stopped.
    pub fn get(&self) -> u64 {
        self.seconds.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.ticker
            .as_ref()
            .map(|t| !t.is_finished())
            .unwrap_or(false)
    }
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PositionTracker {
    fn drop(&mut self) {
        self.stop();
    }
}
