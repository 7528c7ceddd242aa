//! Anomaly classifications produced by the backend, aligned onto the
//! timeline's bucket coordinates.

use chrono::{DateTime, Utc};

use crate::bucket::Bucket;
use crate::timeline::Timeline;

/// A bucket the backend classifier flagged as a statistical outlier.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnomalyBucket {
    /// Start of the flagged slot; must lie on the same bucket grid as the
    /// timeline it overlays.
    pub bucket_start: DateTime<Utc>,

    /// Observed count in the slot.
    pub count: u64,

    /// Expected count for the slot.
    pub baseline: f64,

    /// How far the observation deviates from the baseline.
    pub factor: f64,
}

impl AnomalyBucket {
    /// Create an anomaly classification for one slot.
    pub fn new(bucket_start: DateTime<Utc>, count: u64, baseline: f64, factor: f64) -> Self {
        Self {
            bucket_start,
            count,
            baseline,
            factor,
        }
    }
}

/// The classifier's full verdict: unusually busy and unusually quiet slots.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AnomalyOverlay {
    /// Slots with significantly more events than expected.
    pub anomalies: Vec<AnomalyBucket>,

    /// Slots with significantly fewer events than expected.
    #[cfg_attr(feature = "serde", serde(default))]
    pub quiet: Vec<Bucket>,
}

impl AnomalyOverlay {
    /// An overlay flagging nothing.
    pub fn empty() -> Self {
        Self::default()
    }

    /// True if nothing is flagged.
    pub fn is_empty(&self) -> bool {
        self.anomalies.is_empty() && self.quiet.is_empty()
    }

    /// Keep only entries whose bucket start is held by `timeline`.
    ///
    /// Classifications for slots the timeline no longer covers (or that sit
    /// off the bucket grid) are dropped rather than snapped, so the overlay
    /// can never disagree with the series it decorates.
    pub fn aligned_to(&self, timeline: &Timeline) -> AnomalyOverlay {
        AnomalyOverlay {
            anomalies: self
                .anomalies
                .iter()
                .filter(|a| timeline.contains(a.bucket_start))
                .cloned()
                .collect(),
            quiet: self
                .quiet
                .iter()
                .filter(|q| timeline.contains(q.bucket_start))
                .cloned()
                .collect(),
        }
    }
}
