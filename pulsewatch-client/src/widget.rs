//! The widget runtime.
//!
//! A [`LiveWidget`] owns exactly one stream connection, one staleness
//! monitor, one degradation controller, and one aggregator, and runs them
//! on a single event loop. Nothing is shared across widgets; every
//! mutation is published as a whole-value [`WidgetSnapshot`] through a
//! watch channel, so consumers only ever see complete, consistent state.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                        LiveWidget runtime                      │
//! │                                                                │
//! │  StreamConnection ──message──▶ TenantScope ──▶ Monitor         │
//! │                                     │            │ stale       │
//! │                                     ▼            ▼             │
//! │                              Aggregator ◀── Controller ──▶ Telemetry
//! │                                     │            │             │
//! │                                     │     StartRefresh         │
//! │                                     │            ▼             │
//! │                                     │       Refresher (HTTP)   │
//! │                                     ▼                          │
//! │                          watch::Sender<WidgetSnapshot>         │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use pulsewatch_types::{AnomalyOverlay, ConnectionHealth, Timeline};

use crate::aggregator::{ApplyOutcome, IncrementalAggregator};
use crate::config::WatchConfig;
use crate::controller::{DegradationController, Effect, RefreshReason};
use crate::error::ClientError;
use crate::message::StreamMessage;
use crate::monitor::StalenessMonitor;
use crate::refresh::Refresher;
use crate::stream::StreamConnection;
use crate::telemetry::{TelemetryRecord, TelemetrySink};
use crate::tenant::{TenantScope, TenantSelection};

/// Everything a rendering layer needs, replaced atomically on each change.
#[derive(Debug, Clone)]
pub struct WidgetSnapshot {
    /// The aggregated event timeline.
    pub timeline: Timeline,
    /// Trust state of the live channel.
    pub health: ConnectionHealth,
    /// Anomaly classifications aligned to the timeline.
    pub overlay: AnomalyOverlay,
}

enum Command {
    SetTenant(TenantSelection),
}

struct RefreshOutcome {
    reason: RefreshReason,
    tenant: TenantSelection,
    result: Result<Timeline, ClientError>,
}

struct OverlayOutcome {
    tenant: TenantSelection,
    result: Result<AnomalyOverlay, ClientError>,
}

/// Handle to a running widget.
///
/// Dropping the handle (or calling [`shutdown`](LiveWidget::shutdown))
/// tears the runtime down: the heartbeat and staleness check stop, the
/// connection closes, and any in-flight refresh resolution becomes a
/// no-op.
pub struct LiveWidget {
    commands: mpsc::Sender<Command>,
    shutdown: watch::Sender<bool>,
    snapshots: watch::Receiver<WidgetSnapshot>,
    task: JoinHandle<()>,
}

impl LiveWidget {
    /// Connect to a TCP stream endpoint and spawn the runtime.
    pub async fn connect(
        addr: &str,
        config: WatchConfig,
        refresher: Arc<dyn Refresher>,
        sink: TelemetrySink,
    ) -> Result<Self, ClientError> {
        config.validate()?;
        let (tenant_tx, tenant_rx) = watch::channel(config.tenant.clone());
        let connection =
            StreamConnection::connect(addr, config.heartbeat_interval, tenant_rx).await?;
        Ok(Self::spawn(config, connection, tenant_tx, refresher, sink))
    }

    /// Spawn the runtime over an already-established connection.
    ///
    /// `tenant` must be the sender whose receiver the connection's
    /// heartbeat watches, so tenant switches reach the pings.
    pub fn spawn(
        config: WatchConfig,
        connection: StreamConnection,
        tenant: watch::Sender<TenantSelection>,
        refresher: Arc<dyn Refresher>,
        sink: TelemetrySink,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (refresh_tx, refresh_rx) = mpsc::channel(1);
        let (overlay_tx, overlay_rx) = mpsc::channel(1);

        let initial = WidgetSnapshot {
            timeline: Timeline::empty(config.bucket_minutes),
            health: ConnectionHealth::initial(),
            overlay: AnomalyOverlay::empty(),
        };
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);

        let runtime = Runtime {
            scope: TenantScope::new(config.tenant.clone()),
            monitor: StalenessMonitor::new(config.staleness_threshold),
            controller: DegradationController::new(config.staleness_threshold),
            aggregator: IncrementalAggregator::new(config.bucket_minutes),
            overlay: AnomalyOverlay::empty(),
            overlay_in_flight: false,
            overlay_dirty: false,
            config,
            connection,
            tenant,
            refresher,
            sink: Arc::new(sink),
            snapshots: snapshot_tx,
            refresh_tx,
            overlay_tx,
        };

        let task = tokio::spawn(runtime.run(shutdown_rx, command_rx, refresh_rx, overlay_rx));

        Self {
            commands: command_tx,
            shutdown: shutdown_tx,
            snapshots: snapshot_rx,
            task,
        }
    }

    /// A receiver of whole-state snapshots; use
    /// [`watch::Receiver::changed`] to wake on updates.
    pub fn snapshots(&self) -> watch::Receiver<WidgetSnapshot> {
        self.snapshots.clone()
    }

    /// Switch the active tenant.
    ///
    /// The connection is kept: future messages are re-filtered client-side
    /// and one tenant-scoped full refresh re-fetches the aggregates.
    /// A no-op after shutdown.
    pub async fn set_tenant(&self, selection: TenantSelection) {
        let _ = self.commands.send(Command::SetTenant(selection)).await;
    }

    /// Tear the widget down. Safe to call repeatedly.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Wait for the runtime to finish after [`shutdown`](Self::shutdown).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

struct Runtime {
    config: WatchConfig,
    connection: StreamConnection,
    scope: TenantScope,
    tenant: watch::Sender<TenantSelection>,
    monitor: StalenessMonitor,
    controller: DegradationController,
    aggregator: IncrementalAggregator,
    overlay: AnomalyOverlay,
    overlay_in_flight: bool,
    overlay_dirty: bool,
    refresher: Arc<dyn Refresher>,
    sink: Arc<TelemetrySink>,
    snapshots: watch::Sender<WidgetSnapshot>,
    refresh_tx: mpsc::Sender<RefreshOutcome>,
    overlay_tx: mpsc::Sender<OverlayOutcome>,
}

impl Runtime {
    async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
        mut commands: mpsc::Receiver<Command>,
        mut refresh_rx: mpsc::Receiver<RefreshOutcome>,
        mut overlay_rx: mpsc::Receiver<OverlayOutcome>,
    ) {
        let mut check = tokio::time::interval(self.config.check_interval);
        check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut messages = self.connection.take_messages();
        let mut stream_open = true;

        // seed the timeline so a freshly mounted widget has data without
        // waiting for live events
        let effects = self
            .controller
            .request_refresh(Utc::now(), RefreshReason::Seed);
        self.apply_effects(effects);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                message = messages.recv(), if stream_open => match message {
                    Some(message) => {
                        self.handle_message(message);
                    }
                    None => {
                        debug!("push channel closed; staleness fallback takes over");
                        stream_open = false;
                    }
                },
                Some(command) = commands.recv() => {
                    self.handle_command(command);
                }
                _ = check.tick() => {
                    self.handle_tick();
                }
                Some(outcome) = refresh_rx.recv() => {
                    self.handle_refresh_outcome(outcome);
                }
                Some(outcome) = overlay_rx.recv() => {
                    self.handle_overlay_outcome(outcome);
                }
            }
        }

        self.connection.shutdown();
    }

    fn handle_message(&mut self, message: StreamMessage) {
        // reject before the monitor or aggregator ever see it
        if !self.scope.admits(&message) {
            return;
        }

        let now = Utc::now();
        self.monitor.observe(now);
        let effects = self.controller.on_message(now);
        self.apply_effects(effects);

        if message.kind == self.config.event_kind {
            match self.aggregator.apply(&message) {
                ApplyOutcome::Incremented => {
                    // keep long-lived classifications accurate without a
                    // full refetch
                    self.request_overlay();
                }
                ApplyOutcome::ResyncRequired(reason) => {
                    debug!("incremental placement failed ({:?}); resyncing", reason);
                    let effects = self.controller.request_refresh(now, RefreshReason::Resync);
                    self.apply_effects(effects);
                }
            }
        }

        self.publish();
    }

    fn handle_tick(&mut self) {
        let now = Utc::now();
        let stale = self.monitor.poll(now);
        let effects = self.controller.on_tick(now, stale);
        if !effects.is_empty() {
            self.apply_effects(effects);
            self.publish();
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetTenant(selection) => {
                if !self.scope.set_active(selection.clone()) {
                    return;
                }
                info!("tenant scope changed to {}", selection.label());
                // future heartbeats carry the new tenant
                let _ = self.tenant.send(selection);
                let effects = self
                    .controller
                    .request_refresh(Utc::now(), RefreshReason::TenantSwitch);
                self.apply_effects(effects);
            }
        }
    }

    fn handle_refresh_outcome(&mut self, outcome: RefreshOutcome) {
        let now = Utc::now();

        if outcome.tenant != *self.scope.active() {
            // the tenant changed while this refresh was in flight; its
            // data is scoped wrong, so discard and re-issue
            debug!("discarding refresh for superseded tenant scope");
            self.controller.on_refresh_discarded();
            let effects = self
                .controller
                .request_refresh(now, RefreshReason::TenantSwitch);
            self.apply_effects(effects);
            return;
        }

        match outcome.result {
            Ok(timeline) => {
                self.aggregator.replace(timeline);
                self.overlay = self.overlay.aligned_to(self.aggregator.timeline());
                self.monitor.reset(now);
                let effects = self.controller.on_refresh_success(now);
                self.apply_effects(effects);
                self.request_overlay();
            }
            Err(err) => {
                warn!("full refresh failed: {}", err);
                let reason = match outcome.reason {
                    RefreshReason::Seed => format!("initial load failed: {}", err),
                    RefreshReason::Stale | RefreshReason::Retry => {
                        format!("stream stale and refresh failed: {}", err)
                    }
                    RefreshReason::Resync => {
                        format!("event outside held window and refresh failed: {}", err)
                    }
                    RefreshReason::TenantSwitch => {
                        format!("tenant-scoped refresh failed: {}", err)
                    }
                };
                let effects = self.controller.on_refresh_failure(outcome.reason, reason);
                self.apply_effects(effects);
            }
        }

        self.publish();
    }

    fn handle_overlay_outcome(&mut self, outcome: OverlayOutcome) {
        self.overlay_in_flight = false;

        if outcome.tenant == *self.scope.active() {
            match outcome.result {
                Ok(overlay) => {
                    self.overlay = overlay.aligned_to(self.aggregator.timeline());
                    self.publish();
                }
                Err(err) => {
                    // the overlay is decoration; failures never gate state
                    debug!("overlay refresh failed: {}", err);
                }
            }
        } else {
            self.overlay_dirty = true;
        }

        if self.overlay_dirty {
            self.overlay_dirty = false;
            self.request_overlay();
        }
    }

    fn apply_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartRefresh(reason) => self.start_refresh(reason),
                Effect::Emit(event) => self.emit(event),
            }
        }
    }

    fn start_refresh(&self, reason: RefreshReason) {
        let refresher = self.refresher.clone();
        let tx = self.refresh_tx.clone();
        let tenant = self.scope.active().clone();
        let window = self.config.window_minutes;
        let bucket = self.config.bucket_minutes;

        tokio::spawn(async move {
            let result = refresher
                .fetch_timeline(tenant.query_value(), window, bucket)
                .await;
            // after teardown the runtime is gone and this send is a no-op
            let _ = tx
                .send(RefreshOutcome {
                    reason,
                    tenant,
                    result,
                })
                .await;
        });
    }

    fn request_overlay(&mut self) {
        if self.overlay_in_flight {
            self.overlay_dirty = true;
            return;
        }
        self.overlay_in_flight = true;

        let refresher = self.refresher.clone();
        let tx = self.overlay_tx.clone();
        let tenant = self.scope.active().clone();
        let window = self.config.window_minutes;
        let bucket = self.config.bucket_minutes;

        tokio::spawn(async move {
            let result = refresher
                .fetch_overlay(tenant.query_value(), window, bucket)
                .await;
            let _ = tx.send(OverlayOutcome { tenant, result }).await;
        });
    }

    fn emit(&self, event: pulsewatch_types::TelemetryEvent) {
        let sink = self.sink.clone();
        let record = TelemetryRecord {
            component: self.config.component.clone(),
            event,
            tenant: self.scope.active().label().to_string(),
        };
        tokio::spawn(async move {
            sink.emit(record).await;
        });
    }

    fn publish(&self) {
        self.snapshots.send_replace(WidgetSnapshot {
            timeline: self.aggregator.timeline().clone(),
            health: self.controller.health().clone(),
            overlay: self.overlay.clone(),
        });
    }
}
