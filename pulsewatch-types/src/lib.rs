//! # pulsewatch-types
//!
//! Core timeline types for live dashboard telemetry. This crate defines the
//! bucket/timeline schema shared between the backend endpoints that produce
//! aggregated event data and the pulsewatch client that keeps dashboard
//! widgets fed with it.
//!
//! ## Design Goals
//!
//! - **Minimal dependencies**: only `chrono` for UTC timestamp arithmetic
//! - **Optional serialization**: enable the `serde` feature as needed
//! - **Invariants by construction**: a [`Timeline`] is always dense and
//!   strictly ordered; consumers never need to re-validate
//! - **Timezone consistent**: bucket boundaries are anchored to the unix
//!   epoch in UTC, so two clients in different timezones compute identical
//!   boundaries for the same instant
//! - **Versioned schema**: serialized payloads can carry version info for
//!   forward compatibility
//!
//! ## Features
//!
//! - `serde`: JSON/etc. serialization via serde
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use pulsewatch_types::{bucket_start, Timeline};
//!
//! // 24h of 15-minute buckets ending at the bucket containing `now`
//! let now = Utc.with_ymd_and_hms(2026, 3, 9, 10, 7, 30).unwrap();
//! let timeline = Timeline::zeroed(now, 24 * 60, 15);
//! assert_eq!(timeline.len(), 96);
//! assert_eq!(timeline.total(), 0);
//!
//! // Place one event and get a bumped copy back
//! let slot = bucket_start(now, 15);
//! let timeline = timeline.incremented(slot).unwrap();
//! assert_eq!(timeline.total(), 1);
//! ```
//!
//! ## Schema Version
//!
//! The current schema version is **1**. The version can be included in
//! serialized payloads to allow consumers to handle format evolution
//! gracefully.

mod anomaly;
mod bucket;
mod health;
mod timeline;
mod version;

pub use anomaly::*;
pub use bucket::*;
pub use health::*;
pub use timeline::*;
pub use version::*;

/// Current schema version.
///
/// Increment this when making breaking changes to the timeline format.
/// Consumers should check this version and handle older formats appropriately.
pub const SCHEMA_VERSION: u32 = 1;
