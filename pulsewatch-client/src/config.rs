//! Widget tuning knobs and the optional settings file.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ClientError;
use crate::tenant::TenantSelection;

/// Tunables for one live widget.
///
/// The defaults are the deployed policy values: a 15s heartbeat, a 35s
/// staleness threshold (the threshold must exceed the heartbeat interval
/// with margin, or ordinary heartbeat jitter would trip it), a 5s check
/// cadence, and a 24h window of 15-minute buckets.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Component name reported to the telemetry sink.
    pub component: String,
    /// Message kind aggregated into the timeline. Messages of other kinds
    /// still count as liveness but are not bucketed.
    pub event_kind: String,
    /// Tenant scope applied to inbound messages and refresh requests.
    pub tenant: TenantSelection,
    /// How often a liveness ping is sent on the push channel.
    pub heartbeat_interval: Duration,
    /// Quiet time after which the channel is suspected stale.
    pub staleness_threshold: Duration,
    /// How often staleness is checked.
    pub check_interval: Duration,
    /// Bucket width of the aggregated timeline.
    pub bucket_minutes: u32,
    /// Trailing window covered by the timeline.
    pub window_minutes: u32,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            component: "event_timeline".to_string(),
            event_kind: "event".to_string(),
            tenant: TenantSelection::All,
            heartbeat_interval: Duration::from_secs(15),
            staleness_threshold: Duration::from_secs(35),
            check_interval: Duration::from_secs(5),
            bucket_minutes: 15,
            window_minutes: 24 * 60,
        }
    }
}

impl WatchConfig {
    /// Reject configurations that cannot work.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.bucket_minutes == 0 {
            return Err(ClientError::Config("bucket width must be nonzero".into()));
        }
        if self.window_minutes < self.bucket_minutes {
            return Err(ClientError::Config(
                "window must cover at least one bucket".into(),
            ));
        }
        if self.staleness_threshold <= self.heartbeat_interval {
            return Err(ClientError::Config(
                "staleness threshold must exceed the heartbeat interval".into(),
            ));
        }
        if self.check_interval.is_zero() {
            return Err(ClientError::Config("check interval must be nonzero".into()));
        }
        Ok(())
    }
}

/// Settings loadable from a file, overridable from the environment with the
/// `PULSEWATCH_` prefix. Command-line flags take precedence over both.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    pub connect: Option<String>,
    pub refresh_url: Option<String>,
    pub telemetry_url: Option<String>,
    pub tenant: Option<String>,
    pub event_kind: Option<String>,
    pub heartbeat: Option<String>,
    pub stale_after: Option<String>,
    pub check_every: Option<String>,
    pub bucket_minutes: Option<u32>,
    pub window_minutes: Option<u32>,
}

impl Settings {
    /// Load settings from a file, layered under `PULSEWATCH_*` environment
    /// variables.
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("PULSEWATCH"))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ClientError::Config(e.to_string()))
    }
}

/// Suffix to nanoseconds multiplier (order matters: longer suffixes first)
const UNITS: &[(&str, f64)] = &[
    ("ns", 1.0),
    ("µs", 1_000.0),
    ("us", 1_000.0),
    ("ms", 1_000_000.0),
    ("s", 1_000_000_000.0),
    ("m", 60_000_000_000.0),
    ("h", 3_600_000_000_000.0),
];

/// Parse duration strings like "35s", "500ms", "15m", "24h"
pub fn parse_duration(s: &str) -> Result<Duration, ClientError> {
    let s = s.trim();

    for (suffix, multiplier) in UNITS {
        if let Some(val_str) = s.strip_suffix(suffix) {
            let val: f64 = val_str
                .parse()
                .map_err(|_| ClientError::Config(format!("bad duration value: {}", s)))?;
            return Ok(Duration::from_nanos((val * multiplier) as u64));
        }
    }

    Err(ClientError::Config(format!(
        "unknown duration format: {}",
        s
    )))
}

/// Format a duration for display
pub fn format_duration(d: Duration) -> String {
    let nanos = d.as_nanos();
    if nanos == 0 {
        "0ns".to_string()
    } else if nanos < 1_000 {
        format!("{}ns", nanos)
    } else if nanos < 1_000_000 {
        format!("{:.2}µs", nanos as f64 / 1_000.0)
    } else if nanos < 1_000_000_000 {
        format!("{:.2}ms", nanos as f64 / 1_000_000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_the_deployed_policy() {
        let config = WatchConfig::default();
        assert_eq!(config.heartbeat_interval, Duration::from_secs(15));
        assert_eq!(config.staleness_threshold, Duration::from_secs(35));
        assert_eq!(config.check_interval, Duration::from_secs(5));
        assert_eq!(config.bucket_minutes, 15);
        assert_eq!(config.window_minutes, 1440);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_bucket_width() {
        let config = WatchConfig {
            bucket_minutes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_threshold_below_heartbeat() {
        let config = WatchConfig {
            staleness_threshold: Duration::from_secs(10),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_window_smaller_than_bucket() {
        let config = WatchConfig {
            window_minutes: 5,
            bucket_minutes: 15,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn parse_seconds_and_minutes() {
        assert_eq!(parse_duration("35s").unwrap(), Duration::from_secs(35));
        assert_eq!(parse_duration("15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_duration("24h").unwrap(), Duration::from_secs(86400));
    }

    #[test]
    fn parse_subsecond_units() {
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("16.958µs").unwrap().as_nanos(), 16958);
        assert_eq!(parse_duration("0ns").unwrap(), Duration::ZERO);
    }

    #[test]
    fn parse_rejects_unknown_formats() {
        assert!(parse_duration("35").is_err());
        assert!(parse_duration("fast").is_err());
    }

    #[test]
    fn format_round_numbers() {
        assert_eq!(format_duration(Duration::from_secs(35)), "35.00s");
        assert_eq!(format_duration(Duration::ZERO), "0ns");
    }

    #[test]
    fn settings_load_from_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        writeln!(
            file,
            "connect = \"localhost:9090\"\nstale_after = \"40s\"\nbucket_minutes = 5"
        )
        .unwrap();

        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings.connect.as_deref(), Some("localhost:9090"));
        assert_eq!(settings.stale_after.as_deref(), Some("40s"));
        assert_eq!(settings.bucket_minutes, Some(5));
        assert!(settings.refresh_url.is_none());
    }
}
