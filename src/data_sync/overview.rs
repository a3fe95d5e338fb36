use crate::data_sync::config::DashboardSyncConfig;
use crate::data_sync::error::SyncError;
use crate::data_sync::normalizer::SnapshotNormalizer;
use crate::data_sync::snapshot::DashboardSnapshot;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Pull source: fetches one snapshot from the overview endpoint.
///
/// Every failure degrades to the default snapshot; callers always get renderable data.
#[derive(Debug, Clone)]
pub struct OverviewClient {
    http_client: reqwest::Client,
    overview_url: Option<String>,
    normalizer: SnapshotNormalizer,
}

impl OverviewClient {
    pub fn new(config: &DashboardSyncConfig, normalizer: SnapshotNormalizer) -> Self {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.http_timeout() {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build().unwrap_or_else(|e| {
            warn!("Failed to configure HTTP client, using defaults: {}", e);
            reqwest::Client::new()
        });

        Self {
            http_client,
            overview_url: config.overview_url(),
            normalizer,
        }
    }

    pub fn overview_url(&self) -> Option<&str> {
        self.overview_url.as_deref()
    }

    /// Fetch the initial snapshot. At most one request, never retried, never fails.
    pub async fn fetch_initial(&self) -> DashboardSnapshot {
        match self.try_fetch().await {
            Ok(snapshot) => snapshot,
            Err(SyncError::ConfigurationAbsent(_)) => {
                debug!("No dashboard API configured, serving default snapshot");
                self.normalizer.default_snapshot()
            }
            Err(e) => {
                warn!("Dashboard overview unavailable, serving default snapshot: {}", e);
                self.normalizer.default_snapshot()
            }
        }
    }

    async fn try_fetch(&self) -> Result<DashboardSnapshot, SyncError> {
        let url = self
            .overview_url
            .as_deref()
            .ok_or(SyncError::ConfigurationAbsent("overview"))?;

        let response = self.http_client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::Transport(format!("{} returned HTTP {}", url, status)));
        }

        let body = response.text().await?;
        let payload: Value = serde_json::from_str(&body)?;
        info!("Fetched dashboard overview from {}", url);
        Ok(self.normalizer.normalize(&payload))
    }
}
