//! Fixed-width time buckets and the clock that assigns events to them.

use chrono::{DateTime, TimeDelta, Utc};

/// A single fixed-width aggregation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bucket {
    /// Start of the slot. Always an exact multiple of the bucket width
    /// measured from the unix epoch.
    pub bucket_start: DateTime<Utc>,

    /// Number of events observed in the slot.
    pub count: u64,
}

impl Bucket {
    /// Create a bucket with the given start and count.
    pub fn new(bucket_start: DateTime<Utc>, count: u64) -> Self {
        Self {
            bucket_start,
            count,
        }
    }

    /// Create an empty bucket at the given start.
    pub fn zero(bucket_start: DateTime<Utc>) -> Self {
        Self::new(bucket_start, 0)
    }

    /// Check that this bucket's start lies exactly on a bucket boundary.
    pub fn is_aligned(&self, bucket_minutes: u32) -> bool {
        bucket_start(self.bucket_start, bucket_minutes) == self.bucket_start
    }
}

/// Snap a timestamp down to the start of its containing bucket.
///
/// Sub-minute components are zeroed and the minute is rounded down to the
/// nearest multiple of `bucket_minutes`, anchored at the unix epoch in UTC.
/// The input's timezone offset is irrelevant: the same instant always maps
/// to the same bucket. A timestamp exactly on a boundary maps to itself.
///
/// `bucket_minutes` must be nonzero.
pub fn bucket_start(ts: DateTime<Utc>, bucket_minutes: u32) -> DateTime<Utc> {
    let width_secs = i64::from(bucket_minutes) * 60;
    let rem = ts.timestamp().rem_euclid(width_secs);
    ts - TimeDelta::seconds(rem) - TimeDelta::nanoseconds(i64::from(ts.timestamp_subsec_nanos()))
}
