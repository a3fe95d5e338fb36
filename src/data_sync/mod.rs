/// Dashboard Data Synchronization Layer
///
/// Keeps consumers supplied with complete dashboard snapshots:
///
/// - Snapshot model and the immutable default snapshot
/// - Total normalization of partial, untrusted payloads
/// - One-shot pull of the initial snapshot over HTTP
/// - WebSocket push feed with flat, unbounded reconnects
/// - A single service facade for the rendering layer
///
/// Every failure is absorbed here: the pull path degrades to the default
/// snapshot and the push path drops bad frames or reconnects.

// Core data sync components
pub mod config;
pub mod error;
pub mod normalizer;
pub mod overview;
pub mod service;
pub mod snapshot;
pub mod websocket;

// Tests
#[cfg(test)]
mod tests;

// Re-export main components for easy usage
pub use config::{DEFAULT_RECONNECT_DELAY_MS, DashboardSyncConfig, FEED_PATH, OVERVIEW_PATH};
pub use error::SyncError;
pub use normalizer::SnapshotNormalizer;
pub use overview::OverviewClient;
pub use service::{DashboardSyncService, DashboardSyncServiceBuilder};
pub use snapshot::{
    ActivityKind, AssetItem, DEFAULT_SNAPSHOT, DashboardAssets, DashboardMetrics, DashboardSnapshot,
    MAX_RECENT_ACTIVITIES, RecentActivity,
};
pub use websocket::{
    FeedChannel, FeedConnector, FeedState, FeedSubscription, FixedDelay, ReconnectPolicy, TungsteniteConnector,
    WebSocketFeed,
};
