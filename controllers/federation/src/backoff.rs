//! # Fibonacci Backoff
//!
//! Progressive retry delay for failed reconcile passes. Grows more slowly
//! than exponential backoff, so a resource stuck on a flaky partner is
//! retried often at first without hammering the partner later on.
//!
//! Sequence with the controller defaults: 5s, 5s, 10s, 15s, 25s, 40s, ...
//! capped at 300s.

use std::time::Duration;

/// First (and second) delay of the error backoff, in seconds
pub const MIN_BACKOFF_SECS: u64 = 5;
/// Longest delay of the error backoff, in seconds
pub const MAX_BACKOFF_SECS: u64 = 300;

/// Fibonacci backoff calculator
///
/// Each delay is the sum of the previous two, capped at `max_secs`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    min_secs: u64,
    prev_secs: u64,
    current_secs: u64,
    max_secs: u64,
}

impl Default for FibonacciBackoff {
    fn default() -> Self {
        Self::new(MIN_BACKOFF_SECS, MAX_BACKOFF_SECS)
    }
}

impl FibonacciBackoff {
    /// Creates a backoff starting at `min_secs` and capped at `max_secs`
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            min_secs,
            prev_secs: 0,
            current_secs: min_secs,
            max_secs,
        }
    }

    /// Returns the current delay and advances the sequence
    pub fn next_backoff(&mut self) -> Duration {
        let result = self.current_secs;
        let next = self.prev_secs + self.current_secs;
        self.prev_secs = self.current_secs;
        self.current_secs = std::cmp::min(next, self.max_secs);
        Duration::from_secs(result)
    }

    /// Restarts the sequence
    pub fn reset(&mut self) {
        self.prev_secs = 0;
        self.current_secs = self.min_secs;
    }
}
