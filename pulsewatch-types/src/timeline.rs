//! Dense, fixed-width bucket timelines.
//!
//! A [`Timeline`] covers a trailing window with one [`Bucket`] per slot.
//! Gaps are represented explicitly with count 0, never omitted, so
//! consumers can assume a dense, regularly-spaced series. The invariant is
//! enforced at construction; there is no way to build or mutate a
//! `Timeline` into an invalid shape through the public API.

use core::fmt;

use chrono::{DateTime, TimeDelta, Utc};

use crate::bucket::{bucket_start, Bucket};

/// Errors produced when validating buckets received from a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    /// The response contained no buckets at all.
    Empty,
    /// A bucket start was not aligned to the bucket width.
    Misaligned { found: DateTime<Utc> },
    /// Two adjacent buckets were not exactly one width apart.
    Gap {
        expected: DateTime<Utc>,
        found: DateTime<Utc>,
    },
}

impl fmt::Display for TimelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimelineError::Empty => write!(f, "timeline contained no buckets"),
            TimelineError::Misaligned { found } => {
                write!(f, "bucket start {} is not on a bucket boundary", found)
            }
            TimelineError::Gap { expected, found } => {
                write!(f, "expected bucket start {}, found {}", expected, found)
            }
        }
    }
}

impl std::error::Error for TimelineError {}

/// An ordered, dense sequence of buckets covering a trailing window.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Timeline {
    bucket_minutes: u32,
    buckets: Vec<Bucket>,
}

impl Timeline {
    /// Create a timeline holding no buckets yet.
    ///
    /// Used for a freshly mounted widget before its first full refresh.
    pub fn empty(bucket_minutes: u32) -> Self {
        Self {
            bucket_minutes,
            buckets: Vec::new(),
        }
    }

    /// Create a zero-filled timeline whose last bucket contains `end`.
    ///
    /// The window is rounded up to a whole number of buckets, with a
    /// minimum of one.
    pub fn zeroed(end: DateTime<Utc>, window_minutes: u32, bucket_minutes: u32) -> Self {
        let slots = (window_minutes.div_ceil(bucket_minutes)).max(1);
        let last = bucket_start(end, bucket_minutes);
        let width = TimeDelta::minutes(i64::from(bucket_minutes));

        let buckets = (0..slots)
            .rev()
            .map(|back| Bucket::zero(last - width * back as i32))
            .collect();

        Self {
            bucket_minutes,
            buckets,
        }
    }

    /// Validate buckets received from a backend into a timeline.
    ///
    /// The buckets must be aligned to the bucket width, strictly ascending,
    /// and exactly one width apart.
    pub fn from_buckets(bucket_minutes: u32, buckets: Vec<Bucket>) -> Result<Self, TimelineError> {
        if buckets.is_empty() {
            return Err(TimelineError::Empty);
        }

        let width = TimeDelta::minutes(i64::from(bucket_minutes));
        let mut expected = None;
        for bucket in &buckets {
            if !bucket.is_aligned(bucket_minutes) {
                return Err(TimelineError::Misaligned {
                    found: bucket.bucket_start,
                });
            }
            if let Some(expected) = expected {
                if bucket.bucket_start != expected {
                    return Err(TimelineError::Gap {
                        expected,
                        found: bucket.bucket_start,
                    });
                }
            }
            expected = Some(bucket.bucket_start + width);
        }

        Ok(Self {
            bucket_minutes,
            buckets,
        })
    }

    /// The bucket width in minutes.
    pub fn bucket_minutes(&self) -> u32 {
        self.bucket_minutes
    }

    /// The buckets, ascending by start.
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    /// Number of buckets held.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True if no buckets are held yet.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Start of the earliest bucket, if any.
    pub fn first_start(&self) -> Option<DateTime<Utc>> {
        self.buckets.first().map(|b| b.bucket_start)
    }

    /// Start of the latest bucket, if any.
    pub fn last_start(&self) -> Option<DateTime<Utc>> {
        self.buckets.last().map(|b| b.bucket_start)
    }

    /// Total event count across the window.
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.count).sum()
    }

    /// Whether a bucket with the given start is held.
    pub fn contains(&self, start: DateTime<Utc>) -> bool {
        self.buckets.iter().any(|b| b.bucket_start == start)
    }

    /// Return a copy of this timeline with the count at `start` bumped by
    /// one, or `None` if that bucket is not held.
    ///
    /// The original is left untouched so the caller can replace its state
    /// as a whole value.
    pub fn incremented(&self, start: DateTime<Utc>) -> Option<Timeline> {
        let index = self.buckets.iter().position(|b| b.bucket_start == start)?;
        let mut next = self.clone();
        next.buckets[index].count += 1;
        Some(next)
    }

    /// Check density and strict ordering.
    ///
    /// Holds by construction; exposed for tests and debug assertions.
    pub fn is_dense(&self) -> bool {
        let width = TimeDelta::minutes(i64::from(self.bucket_minutes));
        self.buckets
            .windows(2)
            .all(|pair| pair[1].bucket_start - pair[0].bucket_start == width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 9, h, m, 0).unwrap()
    }

    #[test]
    fn zeroed_covers_whole_window() {
        let timeline = Timeline::zeroed(at(10, 7), 24 * 60, 15);
        assert_eq!(timeline.len(), 96);
        assert_eq!(timeline.total(), 0);
        assert_eq!(timeline.last_start(), Some(at(10, 0)));
        assert!(timeline.is_dense());
    }

    #[test]
    fn zeroed_rounds_window_up() {
        let timeline = Timeline::zeroed(at(10, 0), 40, 15);
        assert_eq!(timeline.len(), 3);
    }

    #[test]
    fn from_buckets_accepts_dense_input() {
        let buckets = vec![
            Bucket::new(at(10, 0), 3),
            Bucket::new(at(10, 15), 0),
            Bucket::new(at(10, 30), 7),
        ];
        let timeline = Timeline::from_buckets(15, buckets).unwrap();
        assert_eq!(timeline.total(), 10);
        assert!(timeline.is_dense());
    }

    #[test]
    fn from_buckets_rejects_empty() {
        assert_eq!(
            Timeline::from_buckets(15, Vec::new()),
            Err(TimelineError::Empty)
        );
    }

    #[test]
    fn from_buckets_rejects_gaps() {
        let buckets = vec![Bucket::zero(at(10, 0)), Bucket::zero(at(10, 30))];
        assert_eq!(
            Timeline::from_buckets(15, buckets),
            Err(TimelineError::Gap {
                expected: at(10, 15),
                found: at(10, 30),
            })
        );
    }

    #[test]
    fn from_buckets_rejects_unordered_input() {
        let buckets = vec![Bucket::zero(at(10, 15)), Bucket::zero(at(10, 0))];
        assert!(matches!(
            Timeline::from_buckets(15, buckets),
            Err(TimelineError::Gap { .. })
        ));
    }

    #[test]
    fn from_buckets_rejects_misaligned_starts() {
        let buckets = vec![Bucket::zero(at(10, 7))];
        assert_eq!(
            Timeline::from_buckets(15, buckets),
            Err(TimelineError::Misaligned { found: at(10, 7) })
        );
    }

    #[test]
    fn incremented_bumps_exactly_one_bucket() {
        let timeline = Timeline::zeroed(at(10, 15), 30, 15);
        let before = timeline.total();

        let bumped = timeline.incremented(at(10, 0)).unwrap();
        assert_eq!(bumped.total(), before + 1);
        assert_eq!(bumped.buckets()[0].count, 1);
        assert_eq!(bumped.buckets()[1].count, 0);

        // the original is untouched
        assert_eq!(timeline.total(), before);
    }

    #[test]
    fn incremented_misses_outside_window() {
        let timeline = Timeline::zeroed(at(10, 15), 30, 15);
        assert!(timeline.incremented(at(10, 30)).is_none());
        assert!(timeline.incremented(at(9, 30)).is_none());
    }

    #[test]
    fn empty_timeline_has_no_buckets() {
        let timeline = Timeline::empty(15);
        assert!(timeline.is_empty());
        assert_eq!(timeline.first_start(), None);
        assert!(!timeline.contains(at(10, 0)));
    }
}
