//! Full-refresh and anomaly-overlay fetching.
//!
//! When live updates cannot be trusted (staleness, a bucket miss, a tenant
//! switch) the widget replaces its state wholesale from the backend's
//! request/response endpoints. The [`Refresher`] trait is the seam; the
//! widget runtime never talks HTTP directly.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use pulsewatch_types::{AnomalyBucket, AnomalyOverlay, Bucket, Timeline};

use crate::error::ClientError;

/// Backend fetches performed on behalf of a widget.
#[async_trait]
pub trait Refresher: Send + Sync {
    /// Fetch the full aggregated timeline for the given scope and window.
    async fn fetch_timeline(
        &self,
        tenant: Option<&str>,
        window_minutes: u32,
        bucket_minutes: u32,
    ) -> Result<Timeline, ClientError>;

    /// Fetch only the anomaly overlay for the same coordinates.
    async fn fetch_overlay(
        &self,
        tenant: Option<&str>,
        window_minutes: u32,
        bucket_minutes: u32,
    ) -> Result<AnomalyOverlay, ClientError>;
}

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    timeline: Vec<Bucket>,
}

#[derive(Debug, Deserialize)]
struct OverlayResponse {
    anomalies: Vec<AnomalyBucket>,
    #[serde(default)]
    quiet: Vec<Bucket>,
}

/// HTTP implementation of [`Refresher`].
#[derive(Debug, Clone)]
pub struct RefreshClient {
    client: Client,
    base_url: String,
}

impl RefreshClient {
    /// Create a new builder for configuring the client.
    pub fn builder() -> RefreshClientBuilder {
        RefreshClientBuilder::default()
    }

    async fn get(
        &self,
        path: &str,
        tenant: Option<&str>,
        window_minutes: u32,
        bucket_minutes: u32,
    ) -> Result<reqwest::Response, ClientError> {
        let mut request = self
            .client
            .get(format!("{}/{}", self.base_url, path))
            .query(&[
                ("window_minutes", window_minutes),
                ("bucket_minutes", bucket_minutes),
            ]);
        if let Some(tenant) = tenant {
            request = request.query(&[("tenant", tenant)]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Http(format!(
                "API returned status {}",
                response.status()
            )));
        }
        Ok(response)
    }
}

#[async_trait]
impl Refresher for RefreshClient {
    async fn fetch_timeline(
        &self,
        tenant: Option<&str>,
        window_minutes: u32,
        bucket_minutes: u32,
    ) -> Result<Timeline, ClientError> {
        let response = self
            .get("timeline", tenant, window_minutes, bucket_minutes)
            .await?;
        let body: TimelineResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Timeline::from_buckets(bucket_minutes, body.timeline)
            .map_err(|e| ClientError::Parse(e.to_string()))
    }

    async fn fetch_overlay(
        &self,
        tenant: Option<&str>,
        window_minutes: u32,
        bucket_minutes: u32,
    ) -> Result<AnomalyOverlay, ClientError> {
        let response = self
            .get("anomalies", tenant, window_minutes, bucket_minutes)
            .await?;
        let body: OverlayResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(AnomalyOverlay {
            anomalies: body.anomalies,
            quiet: body.quiet,
        })
    }
}

/// Builder for [`RefreshClient`].
#[derive(Debug, Default)]
pub struct RefreshClientBuilder {
    base_url: Option<String>,
    timeout: Option<Duration>,
}

impl RefreshClientBuilder {
    /// Set the base URL of the refresh endpoints
    /// (e.g., "http://localhost:8080/api/events").
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client.
    pub fn build(self) -> RefreshClient {
        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");

        RefreshClient {
            client,
            base_url: self
                .base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| "http://localhost:8080/api/events".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let client = RefreshClient::builder().build();
        assert_eq!(client.base_url, "http://localhost:8080/api/events");
    }

    #[test]
    fn builder_strips_trailing_slash() {
        let client = RefreshClient::builder()
            .base_url("http://dash.local/api/events/")
            .timeout(Duration::from_secs(3))
            .build();
        assert_eq!(client.base_url, "http://dash.local/api/events");
    }

    #[test]
    fn timeline_response_parses_and_validates() {
        let json = r#"{"timeline": [
            {"bucket_start": "2026-03-09T10:00:00Z", "count": 3},
            {"bucket_start": "2026-03-09T10:15:00Z", "count": 0}
        ]}"#;
        let body: TimelineResponse = serde_json::from_str(json).unwrap();
        let timeline = Timeline::from_buckets(15, body.timeline).unwrap();
        assert_eq!(timeline.total(), 3);
    }

    #[test]
    fn overlay_response_defaults_quiet() {
        let json = r#"{"anomalies": [
            {"bucket_start": "2026-03-09T10:00:00Z", "count": 40, "baseline": 4.0, "factor": 10.0}
        ]}"#;
        let body: OverlayResponse = serde_json::from_str(json).unwrap();
        assert_eq!(body.anomalies.len(), 1);
        assert!(body.quiet.is_empty());
    }
}
