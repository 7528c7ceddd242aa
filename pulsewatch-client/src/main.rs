use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use pulsewatch_client::{
    format_duration, parse_duration, LiveWidget, RefreshClient, Settings, TelemetrySink,
    TenantSelection, WatchConfig,
};

#[derive(Parser, Debug)]
#[command(name = "pulsewatch")]
#[command(about = "Headless watcher for live dashboard timeline streams")]
struct Args {
    /// Stream endpoint to connect to (host:port)
    #[arg(short, long)]
    connect: Option<String>,

    /// Base URL of the full-refresh endpoints
    #[arg(short, long)]
    refresh_url: Option<String>,

    /// Telemetry collector URL (omit to disable reporting)
    #[arg(long)]
    telemetry_url: Option<String>,

    /// Tenant to scope to ("all" for every tenant)
    #[arg(short, long)]
    tenant: Option<String>,

    /// Message kind aggregated into the timeline
    #[arg(long)]
    kind: Option<String>,

    /// Heartbeat interval (e.g., "15s")
    #[arg(long)]
    heartbeat: Option<String>,

    /// Quiet time before the stream is considered stale (e.g., "35s")
    #[arg(long)]
    stale_after: Option<String>,

    /// Staleness check cadence (e.g., "5s")
    #[arg(long)]
    check_every: Option<String>,

    /// Bucket width in minutes
    #[arg(long)]
    bucket_minutes: Option<u32>,

    /// Trailing window in minutes
    #[arg(long)]
    window_minutes: Option<u32>,

    /// Optional settings file; flags take precedence over it
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => Settings::load(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => Settings::default(),
    };

    let connect = args
        .connect
        .or(settings.connect)
        .context("no stream endpoint; pass --connect or set `connect` in the settings file")?;
    let refresh_url = args
        .refresh_url
        .or(settings.refresh_url)
        .context("no refresh endpoint; pass --refresh-url or set `refresh_url`")?;
    let telemetry_url = args.telemetry_url.or(settings.telemetry_url);

    let defaults = WatchConfig::default();
    let tenant = args.tenant.or(settings.tenant).unwrap_or_else(|| "all".to_string());
    let config = WatchConfig {
        tenant: TenantSelection::from_label(&tenant),
        event_kind: args
            .kind
            .or(settings.event_kind)
            .unwrap_or_else(|| defaults.event_kind.clone()),
        heartbeat_interval: parse_flag(args.heartbeat.or(settings.heartbeat))?
            .unwrap_or(defaults.heartbeat_interval),
        staleness_threshold: parse_flag(args.stale_after.or(settings.stale_after))?
            .unwrap_or(defaults.staleness_threshold),
        check_interval: parse_flag(args.check_every.or(settings.check_every))?
            .unwrap_or(defaults.check_interval),
        bucket_minutes: args
            .bucket_minutes
            .or(settings.bucket_minutes)
            .unwrap_or(defaults.bucket_minutes),
        window_minutes: args
            .window_minutes
            .or(settings.window_minutes)
            .unwrap_or(defaults.window_minutes),
        ..defaults
    };
    config.validate()?;

    let refresher = Arc::new(RefreshClient::builder().base_url(&refresh_url).build());
    let sink = match telemetry_url {
        Some(url) => TelemetrySink::http(url),
        None => TelemetrySink::disabled(),
    };

    info!(
        "connecting to {} (refresh: {}, stale after {})",
        connect,
        refresh_url,
        format_duration(config.staleness_threshold)
    );
    let widget = LiveWidget::connect(&connect, config, refresher, sink).await?;
    let mut snapshots = widget.snapshots();
    let mut last_state = snapshots.borrow().health.state;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    warn!("widget runtime stopped");
                    break;
                }
                let snapshot = snapshots.borrow().clone();
                if snapshot.health.state != last_state {
                    last_state = snapshot.health.state;
                    match &snapshot.health.degraded_reason {
                        Some(reason) => info!("health: {} ({})", last_state.symbol(), reason),
                        None => info!("health: {}", last_state.symbol()),
                    }
                }
                info!(
                    "{} events across {} buckets, {} anomalies",
                    snapshot.timeline.total(),
                    snapshot.timeline.len(),
                    snapshot.overlay.anomalies.len()
                );
            }
        }
    }

    widget.shutdown();
    widget.join().await;
    Ok(())
}

fn parse_flag(value: Option<String>) -> Result<Option<std::time::Duration>> {
    value.map(|v| parse_duration(&v).map_err(Into::into)).transpose()
}
