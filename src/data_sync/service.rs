use crate::data_sync::{
    config::DashboardSyncConfig,
    normalizer::SnapshotNormalizer,
    overview::OverviewClient,
    snapshot::{DEFAULT_SNAPSHOT, DashboardSnapshot},
    websocket::{FeedConnector, FeedSubscription, FixedDelay, ReconnectPolicy, WebSocketFeed},
};
use crate::utils::format::{format_currency, format_market_cap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Dashboard synchronization service
///
/// The only surface the rendering layer depends on. Call
/// [`get_initial_snapshot`](Self::get_initial_snapshot) once, then
/// [`subscribe_to_updates`](Self::subscribe_to_updates) once, and treat every
/// snapshot from either path as a full replacement of the displayed state.
/// Pull results are never retried nor merged with pushed ones.
#[derive(Debug, Clone)]
pub struct DashboardSyncService {
    config: DashboardSyncConfig,
    overview: OverviewClient,
    feed: WebSocketFeed,
}

impl DashboardSyncService {
    /// Create a service with the built-in default snapshot and a flat reconnect delay
    pub fn new(config: DashboardSyncConfig) -> Self {
        DashboardSyncServiceBuilder::new().with_config(config).build()
    }

    /// Initial snapshot from the pull source, the default snapshot on any failure
    pub async fn get_initial_snapshot(&self) -> DashboardSnapshot {
        self.overview.fetch_initial().await
    }

    /// Stream pushed snapshots into `on_snapshot` until the returned handle is unsubscribed or dropped
    pub fn subscribe_to_updates<F>(&self, on_snapshot: F) -> FeedSubscription
    where
        F: FnMut(DashboardSnapshot) + Send + 'static,
    {
        self.feed.subscribe(on_snapshot)
    }

    /// Same as [`subscribe_to_updates`](Self::subscribe_to_updates), delivering into a channel instead.
    ///
    /// The channel closes once the subscription ends for good.
    pub fn updates(&self) -> (mpsc::UnboundedReceiver<DashboardSnapshot>, FeedSubscription) {
        let (snapshot_tx, snapshot_rx) = mpsc::unbounded_channel();
        let subscription = self.feed.subscribe(move |snapshot| {
            if snapshot_tx.send(snapshot).is_err() {
                warn!("Dashboard update receiver dropped, discarding snapshot");
            }
        });
        (snapshot_rx, subscription)
    }

    /// Portfolio value as US dollars
    pub fn format_portfolio(&self, value: f64) -> String {
        format_currency(value)
    }

    /// Market capitalization abbreviated to trillions or billions
    pub fn format_market_cap(&self, value: f64) -> String {
        format_market_cap(value)
    }

    /// True when neither an overview nor a streaming endpoint is configured
    pub fn is_offline(&self) -> bool {
        self.config.is_offline()
    }

    pub fn get_config(&self) -> &DashboardSyncConfig {
        &self.config
    }
}

/// Builder for DashboardSyncService to make creation more ergonomic
pub struct DashboardSyncServiceBuilder {
    config: Option<DashboardSyncConfig>,
    default_snapshot: Option<DashboardSnapshot>,
    reconnect_policy: Option<Arc<dyn ReconnectPolicy>>,
    connector: Option<Arc<dyn FeedConnector>>,
}

impl DashboardSyncServiceBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            default_snapshot: None,
            reconnect_policy: None,
            connector: None,
        }
    }

    pub fn with_config(mut self, config: DashboardSyncConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the fallback snapshot served whenever live data is partial or missing
    pub fn with_default_snapshot(mut self, snapshot: DashboardSnapshot) -> Self {
        self.default_snapshot = Some(snapshot);
        self
    }

    pub fn with_reconnect_policy<P: ReconnectPolicy + 'static>(mut self, policy: P) -> Self {
        self.reconnect_policy = Some(Arc::new(policy));
        self
    }

    pub fn with_connector(mut self, connector: Arc<dyn FeedConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    pub fn build(self) -> DashboardSyncService {
        let config = self.config.unwrap_or_else(|| {
            DashboardSyncConfig::from_env().unwrap_or_else(|e| {
                warn!("Failed to load dashboard sync config from environment, using defaults: {}", e);
                DashboardSyncConfig::default()
            })
        });

        let defaults = self.default_snapshot.unwrap_or_else(|| DEFAULT_SNAPSHOT.clone());
        let normalizer = SnapshotNormalizer::new(Arc::new(defaults));

        let reconnect_policy = self
            .reconnect_policy
            .unwrap_or_else(|| Arc::new(FixedDelay::new(config.reconnect_delay())));
        let mut feed = WebSocketFeed::new(config.feed_url(), normalizer.clone()).with_reconnect_policy(reconnect_policy);
        if let Some(connector) = self.connector {
            feed = feed.with_connector(connector);
        }

        let overview = OverviewClient::new(&config, normalizer);

        info!(
            "Dashboard sync configured: overview={:?}, feed={:?}",
            overview.overview_url(),
            feed.feed_url()
        );

        DashboardSyncService { config, overview, feed }
    }
}

impl Default for DashboardSyncServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_service_creation() {
        let service = DashboardSyncService::new(DashboardSyncConfig::default());
        assert!(service.is_offline());
        assert_eq!(service.get_config(), &DashboardSyncConfig::default());
    }

    #[tokio::test]
    async fn test_offline_service_serves_defaults() {
        let service = DashboardSyncService::new(DashboardSyncConfig::default());

        let snapshot = service.get_initial_snapshot().await;
        assert_eq!(&snapshot, DashboardSnapshot::default_snapshot());

        let subscription = service.subscribe_to_updates(|_| panic!("offline service must not deliver"));
        assert!(!subscription.is_active());
        assert_eq!(subscription.connection_attempts(), 0);
        subscription.unsubscribe();
        subscription.unsubscribe();
    }

    #[tokio::test]
    async fn test_custom_default_snapshot() {
        let mut custom = DEFAULT_SNAPSHOT.clone();
        custom.metrics.portfolio_value = 1.0;
        custom.assets.nfts.clear();

        let service = DashboardSyncServiceBuilder::new()
            .with_config(DashboardSyncConfig::default())
            .with_default_snapshot(custom.clone())
            .build();

        assert_eq!(service.get_initial_snapshot().await, custom);
    }

    #[tokio::test]
    async fn test_offline_updates_channel_closes() {
        let service = DashboardSyncService::new(DashboardSyncConfig::default());
        let (mut updates, subscription) = service.updates();

        assert!(!subscription.is_active());
        drop(subscription);
        assert!(updates.recv().await.is_none());
    }

    #[test]
    fn test_formatting_helpers() {
        let service = DashboardSyncService::new(DashboardSyncConfig::default());
        assert_eq!(service.format_portfolio(128_456.32), "$128,456.32");
        assert_eq!(service.format_market_cap(2.41e12), "$2.41T");
    }
}
