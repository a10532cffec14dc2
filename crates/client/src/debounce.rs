//! Trailing-edge debounce for free-text input.

use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;

/// Delivers a message once input has been quiet for `delay`.
///
/// Each [`schedule`](Debouncer::schedule) cancels the previously scheduled
/// delivery. A delivery that had already fired when it was superseded is
/// caught by [`is_current`](Debouncer::is_current).
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Option<CancellationToken>,
    seq: u64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            seq: 0,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedule `message(seq)` to be sent on `tx` after the quiet period.
    pub fn schedule<T, F>(&mut self, tx: UnboundedSender<T>, message: F) -> u64
    where
        T: Send + 'static,
        F: FnOnce(u64) -> T + Send + 'static,
    {
        self.cancel();
        self.seq += 1;

        let token = CancellationToken::new();
        let seq = self.seq;
        let delay = self.delay;
        let cancelled = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    // The receiver is gone when the session shut down.
                    let _ = tx.send(message(seq));
                }
            }
        });

        self.pending = Some(token);
        seq
    }

    /// Drop the pending delivery, if any.
    pub fn cancel(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }

    /// Whether `seq` is the most recently scheduled delivery.
    pub fn is_current(&self, seq: u64) -> bool {
        self.pending.is_some() && seq == self.seq
    }

    /// Mark the current delivery as consumed.
    pub fn settle(&mut self, seq: u64) -> bool {
        if self.is_current(seq) {
            self.pending = None;
            true
        } else {
            false
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
