//! Wall-clock staleness detection for the push channel.
//!
//! The monitor only tracks the age of the last delivered message; it holds
//! no timers of its own. The owning widget polls it from its periodic
//! check, which keeps the logic deterministic under test.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Observes how long the push channel has been quiet.
///
/// A channel that has not delivered anything yet is in a grace period, not
/// stale. Once the quiet time exceeds the threshold the monitor signals
/// exactly once; it stays latched until a message arrives or a refresh
/// resets it.
#[derive(Debug, Clone)]
pub struct StalenessMonitor {
    threshold: Duration,
    last_message_at: Option<DateTime<Utc>>,
    signalled: bool,
}

impl StalenessMonitor {
    /// Create a monitor with the given quiet-time threshold.
    pub fn new(threshold: Duration) -> Self {
        Self {
            threshold,
            last_message_at: None,
            signalled: false,
        }
    }

    /// Record an inbound message. Clears any latched stale signal.
    pub fn observe(&mut self, now: DateTime<Utc>) {
        self.last_message_at = Some(now);
        self.signalled = false;
    }

    /// Restart the quiet period after a successful full refresh.
    ///
    /// The refresh proved the backend reachable, so the fallback cycle
    /// starts over from now; if the channel stays quiet another full
    /// threshold, staleness fires again and the widget keeps polling.
    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.last_message_at = Some(now);
        self.signalled = false;
    }

    /// Check the quiet time. Returns true exactly once per quiet period,
    /// at the first check past the threshold.
    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        if self.signalled {
            return false;
        }
        let Some(last) = self.last_message_at else {
            return false;
        };
        let age = (now - last).to_std().unwrap_or_default();
        if age > self.threshold {
            self.signalled = true;
            true
        } else {
            false
        }
    }

    /// When the last message arrived, if any has.
    pub fn last_message_at(&self) -> Option<DateTime<Utc>> {
        self.last_message_at
    }

    /// Current quiet time, if a message has arrived at all.
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.last_message_at
            .map(|last| (now - last).to_std().unwrap_or_default())
    }
}
