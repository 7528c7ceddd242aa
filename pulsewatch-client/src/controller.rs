//! LIVE / STALE / DEGRADED state machine.
//!
//! The controller is a plain value: every input returns the effects the
//! owning widget must carry out (start a refresh, report a telemetry
//! event), which keeps the whole transition table testable without timers,
//! sockets, or an executor.
//!
//! Splitting "stale" (suspected) from "degraded" (confirmed, user-visible)
//! avoids flapping the degradation banner on transient heartbeat jitter,
//! while still recovering silently on the common case where the channel or
//! a single heartbeat was merely delayed.

use std::time::Duration;

use chrono::{DateTime, Utc};
use pulsewatch_types::{ConnectionHealth, ConnectionState, TelemetryEvent};

/// Why a full refresh is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    /// First load after mount.
    Seed,
    /// The push channel went quiet past the staleness threshold.
    Stale,
    /// An inbound event could not be placed in the held timeline.
    Resync,
    /// The active tenant changed; aggregates must be re-scoped server-side.
    TenantSwitch,
    /// Polling fallback while stale or degraded.
    Retry,
}

/// Side effects the widget runtime must perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Launch a full refresh against the fallback endpoint.
    StartRefresh(RefreshReason),
    /// Report a health transition to the telemetry sink.
    Emit(TelemetryEvent),
}

/// Consumes staleness signals and refresh resolutions, tracks the health
/// value published to the UI, and enforces the single-flight refresh rule.
#[derive(Debug)]
pub struct DegradationController {
    health: ConnectionHealth,
    in_flight: bool,
    retry_interval: Duration,
    last_attempt_at: Option<DateTime<Utc>>,
}

impl DegradationController {
    /// Create a controller in the optimistic initial state.
    ///
    /// `retry_interval` paces the polling fallback while the widget is
    /// stale or degraded with no refresh outstanding.
    pub fn new(retry_interval: Duration) -> Self {
        Self {
            health: ConnectionHealth::initial(),
            in_flight: false,
            retry_interval,
            last_attempt_at: None,
        }
    }

    /// The health value to publish.
    pub fn health(&self) -> &ConnectionHealth {
        &self.health
    }

    /// Whether a full refresh is currently outstanding.
    pub fn refresh_in_flight(&self) -> bool {
        self.in_flight
    }

    fn start_refresh(&mut self, now: DateTime<Utc>, reason: RefreshReason) -> Effect {
        self.in_flight = true;
        self.last_attempt_at = Some(now);
        Effect::StartRefresh(reason)
    }

    fn recover(&mut self, now: DateTime<Utc>, effects: &mut Vec<Effect>) {
        if self.health.state != ConnectionState::Live {
            self.health.state = ConnectionState::Live;
            self.health.degraded_reason = None;
            self.health.last_recovered_at = Some(now);
            effects.push(Effect::Emit(TelemetryEvent::Recovered));
        }
    }

    fn retry_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_attempt_at {
            Some(at) => (now - at).to_std().unwrap_or_default() >= self.retry_interval,
            None => true,
        }
    }

    /// An inbound message arrived: proof of liveness, regardless of prior
    /// state.
    pub fn on_message(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        self.health.last_message_at = Some(now);
        let mut effects = Vec::new();
        self.recover(now, &mut effects);
        effects
    }

    /// Periodic check. `stale` is the monitor's signal for this tick.
    pub fn on_tick(&mut self, now: DateTime<Utc>, stale: bool) -> Vec<Effect> {
        match self.health.state {
            ConnectionState::Live if stale => {
                self.health.state = ConnectionState::Stale;
                let mut effects = vec![Effect::Emit(TelemetryEvent::WsStale)];
                if !self.in_flight {
                    effects.push(self.start_refresh(now, RefreshReason::Stale));
                }
                effects
            }
            ConnectionState::Stale | ConnectionState::Degraded
                if !self.in_flight && self.retry_due(now) =>
            {
                vec![self.start_refresh(now, RefreshReason::Retry)]
            }
            _ => Vec::new(),
        }
    }

    /// Ask for a refresh outside the staleness path (seed, resync, tenant
    /// switch). Dropped if one is already outstanding; the outstanding
    /// request's resolution drives the next transition.
    pub fn request_refresh(&mut self, now: DateTime<Utc>, reason: RefreshReason) -> Vec<Effect> {
        if self.in_flight {
            return Vec::new();
        }
        vec![self.start_refresh(now, reason)]
    }

    /// The outstanding refresh delivered a fresh timeline.
    pub fn on_refresh_success(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        self.in_flight = false;
        let mut effects = Vec::new();
        self.recover(now, &mut effects);
        effects
    }

    /// The outstanding refresh failed; staleness is now confirmed.
    ///
    /// The last-known timeline is deliberately left in place - degradation
    /// is a trust signal on stale data, not a data-loss event.
    ///
    /// Exception: a staleness-driven fallback whose failure lands after a
    /// message already proved the stream live again must not re-degrade
    /// the widget.
    pub fn on_refresh_failure(&mut self, refresh: RefreshReason, reason: String) -> Vec<Effect> {
        self.in_flight = false;
        if self.health.state == ConnectionState::Live
            && matches!(refresh, RefreshReason::Stale | RefreshReason::Retry)
        {
            return vec![Effect::Emit(TelemetryEvent::HttpRefreshFailed)];
        }
        self.health.state = ConnectionState::Degraded;
        self.health.degraded_reason = Some(reason);
        vec![
            Effect::Emit(TelemetryEvent::HttpRefreshFailed),
            Effect::Emit(TelemetryEvent::Degraded),
        ]
    }

    /// The outstanding refresh resolved but its result is unusable (the
    /// tenant changed while it was in flight). Clears the single-flight
    /// guard without transitioning.
    pub fn on_refresh_discarded(&mut self) {
        self.in_flight = false;
    }
}
