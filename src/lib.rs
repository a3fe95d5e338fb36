// Data Layer: snapshot model, normalization, pull and push sources, service facade
pub mod data_sync;
// Reference live-sync server the client is built against
pub mod feed;

// Common utilities: config loading, formatting, logging
pub mod utils;

// Re-export key components
pub use data_sync::{
    DEFAULT_SNAPSHOT, DashboardSnapshot, DashboardSyncConfig, DashboardSyncService, DashboardSyncServiceBuilder,
    FeedState, FeedSubscription, FixedDelay, ReconnectPolicy, SnapshotNormalizer, SyncError,
};
pub use utils::{format_currency, format_market_cap};
