//! # pulsewatch-client
//!
//! A live telemetry stream client for dashboard widgets. It keeps a
//! time-bucketed event timeline continuously fed from a push channel,
//! detects when the channel has gone quiet, falls back to on-demand
//! polling against a request/response endpoint, reports its own health,
//! and maintains the timeline incrementally instead of re-fetching the
//! whole dataset on every update.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         LiveWidget                           │
//! │  ┌────────┐   ┌─────────┐   ┌────────────┐   ┌────────────┐ │
//! │  │ stream │──▶│ tenant  │──▶│ monitor /  │──▶│ aggregator │ │
//! │  │ (push) │   │ (admit) │   │ controller │   │ (timeline) │ │
//! │  └────────┘   └─────────┘   └─────┬──────┘   └─────┬──────┘ │
//! │       ▲                          │ fallback        │        │
//! │   heartbeat                      ▼                 ▼        │
//! │                            ┌──────────┐   watch::Receiver   │
//! │                            │ refresh  │   <WidgetSnapshot>  │
//! │                            │ (HTTP)   │                     │
//! │                            └──────────┘                     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`stream`]**: the persistent push channel - newline-delimited JSON
//!   frames in, periodic heartbeats out
//! - **[`tenant`]**: client-side admit/reject so switching tenants never
//!   reconnects the stream
//! - **[`monitor`] / [`controller`]**: staleness detection and the
//!   LIVE/STALE/DEGRADED state machine with its polling fallback
//! - **[`aggregator`]**: in-place single-bucket increments over a dense
//!   timeline, full resync when an event cannot be placed
//! - **[`refresh`]**: the request/response fallback ([`Refresher`] seam
//!   plus the HTTP implementation)
//! - **[`telemetry`]**: fire-and-forget health transition reporting
//! - **[`widget`]**: the runtime that owns all of the above and publishes
//!   whole-value snapshots
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use pulsewatch_client::{LiveWidget, RefreshClient, TelemetrySink, WatchConfig};
//!
//! # tokio_test::block_on(async {
//! let refresher = Arc::new(
//!     RefreshClient::builder()
//!         .base_url("http://dash.local/api/events")
//!         .build(),
//! );
//!
//! let widget = LiveWidget::connect(
//!     "dash.local:9090",
//!     WatchConfig::default(),
//!     refresher,
//!     TelemetrySink::disabled(),
//! )
//! .await
//! .unwrap();
//!
//! let mut snapshots = widget.snapshots();
//! while snapshots.changed().await.is_ok() {
//!     let snapshot = snapshots.borrow().clone();
//!     println!(
//!         "{}: {} events",
//!         snapshot.health.state.symbol(),
//!         snapshot.timeline.total()
//!     );
//! }
//! # });
//! ```

pub mod aggregator;
pub mod config;
pub mod controller;
pub mod error;
pub mod message;
pub mod monitor;
pub mod refresh;
pub mod stream;
pub mod telemetry;
pub mod tenant;
pub mod widget;

// Re-export main types for convenience
pub use aggregator::{ApplyOutcome, IncrementalAggregator, ResyncReason};
pub use config::{format_duration, parse_duration, Settings, WatchConfig};
pub use controller::{DegradationController, Effect, RefreshReason};
pub use error::ClientError;
pub use message::{HeartbeatFrame, StreamMessage};
pub use monitor::StalenessMonitor;
pub use refresh::{RefreshClient, Refresher};
pub use stream::StreamConnection;
pub use telemetry::{TelemetryRecord, TelemetrySink};
pub use tenant::{TenantScope, TenantSelection};
pub use widget::{LiveWidget, WidgetSnapshot};
