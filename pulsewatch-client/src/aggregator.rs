//! Incremental timeline maintenance.
//!
//! Single live events are placed into the held timeline in place (as a
//! copy-on-write replacement) so the dashboard does not need a backend
//! round-trip per event. Anything that cannot be placed safely falls back
//! to a full resynchronization rather than inventing buckets.

use chrono::{DateTime, Utc};
use pulsewatch_types::{bucket_start, Timeline};

use crate::message::StreamMessage;

/// Why an event could not be applied incrementally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResyncReason {
    /// The event carried no `occurred_at`; there is no safe placement.
    MissingTimestamp,
    /// The event's bucket is not in the held window (or the bucket grid
    /// moved underneath us).
    BucketMiss { bucket_start: DateTime<Utc> },
}

/// Result of applying one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The event was placed; the held timeline was replaced with a bumped
    /// copy.
    Incremented,
    /// No safe incremental placement; the caller must request a full
    /// resynchronization.
    ResyncRequired(ResyncReason),
}

/// Keeps one widget's timeline current from single live events.
#[derive(Debug)]
pub struct IncrementalAggregator {
    timeline: Timeline,
}

impl IncrementalAggregator {
    /// Create an aggregator holding no buckets yet; the seed refresh
    /// populates it.
    pub fn new(bucket_minutes: u32) -> Self {
        Self {
            timeline: Timeline::empty(bucket_minutes),
        }
    }

    /// Create an aggregator over an existing timeline.
    pub fn with_timeline(timeline: Timeline) -> Self {
        Self { timeline }
    }

    /// The held timeline.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Total event count across the held window.
    pub fn total(&self) -> u64 {
        self.timeline.total()
    }

    /// Apply one event.
    pub fn apply(&mut self, message: &StreamMessage) -> ApplyOutcome {
        let Some(occurred_at) = message.occurred_at else {
            return ApplyOutcome::ResyncRequired(ResyncReason::MissingTimestamp);
        };

        let slot = bucket_start(occurred_at, self.timeline.bucket_minutes());
        match self.timeline.incremented(slot) {
            Some(next) => {
                self.timeline = next;
                ApplyOutcome::Incremented
            }
            None => ApplyOutcome::ResyncRequired(ResyncReason::BucketMiss { bucket_start: slot }),
        }
    }

    /// Replace the whole timeline from a full refresh.
    pub fn replace(&mut self, timeline: Timeline) {
        debug_assert!(timeline.is_dense());
        self.timeline = timeline;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, h, m, s).unwrap()
    }

    fn event(occurred_at: Option<DateTime<Utc>>) -> StreamMessage {
        StreamMessage {
            kind: "event".to_string(),
            payload: serde_json::json!({}),
            occurred_at,
            tenant: None,
        }
    }

    #[test]
    fn event_inside_window_is_placed() {
        // two 15-minute buckets: [10:00, 10:15], both empty
        let mut agg =
            IncrementalAggregator::with_timeline(Timeline::zeroed(at(10, 15, 0), 30, 15));

        let outcome = agg.apply(&event(Some(at(10, 7, 30))));
        assert_eq!(outcome, ApplyOutcome::Incremented);

        let buckets = agg.timeline().buckets();
        assert_eq!(buckets[0].bucket_start, at(10, 0, 0));
        assert_eq!(buckets[0].count, 1);
        assert_eq!(buckets[1].count, 0);
    }

    #[test]
    fn each_increment_adds_exactly_one() {
        let mut agg =
            IncrementalAggregator::with_timeline(Timeline::zeroed(at(10, 15, 0), 30, 15));
        let before = agg.total();

        agg.apply(&event(Some(at(10, 7, 30))));
        assert_eq!(agg.total(), before + 1);

        agg.apply(&event(Some(at(10, 15, 0))));
        assert_eq!(agg.total(), before + 2);
    }

    #[test]
    fn event_outside_window_requests_resync() {
        let mut agg =
            IncrementalAggregator::with_timeline(Timeline::zeroed(at(10, 15, 0), 30, 15));

        // 10:30 would need a bucket past the window end
        let outcome = agg.apply(&event(Some(at(10, 30, 0))));
        assert_eq!(
            outcome,
            ApplyOutcome::ResyncRequired(ResyncReason::BucketMiss {
                bucket_start: at(10, 30, 0),
            })
        );
        // nothing was invented
        assert_eq!(agg.total(), 0);
        assert_eq!(agg.timeline().len(), 2);
    }

    #[test]
    fn event_without_timestamp_requests_resync() {
        let mut agg =
            IncrementalAggregator::with_timeline(Timeline::zeroed(at(10, 15, 0), 30, 15));
        assert_eq!(
            agg.apply(&event(None)),
            ApplyOutcome::ResyncRequired(ResyncReason::MissingTimestamp)
        );
    }

    #[test]
    fn empty_aggregator_always_requests_resync() {
        let mut agg = IncrementalAggregator::new(15);
        assert!(matches!(
            agg.apply(&event(Some(at(10, 7, 30)))),
            ApplyOutcome::ResyncRequired(ResyncReason::BucketMiss { .. })
        ));
    }

    #[test]
    fn replace_swaps_the_whole_window() {
        let mut agg = IncrementalAggregator::new(15);
        agg.replace(Timeline::zeroed(at(12, 0, 0), 60, 15));
        assert_eq!(agg.timeline().len(), 4);
        assert_eq!(agg.timeline().last_start(), Some(at(12, 0, 0)));
    }
}
