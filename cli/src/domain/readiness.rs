//! Polling policy shared by every readiness check.

use std::time::Duration;

/// Probe every `interval` until `timeout` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl PollPolicy {
    #[must_use]
    pub const fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Number of probes a run that never succeeds performs: one up front and
    /// one after each full interval that fits in the budget.
    #[must_use]
    pub fn max_probes(&self) -> u128 {
        if self.interval.is_zero() {
            return 1;
        }
        self.timeout.as_nanos() / self.interval.as_nanos() + 1
    }
}
