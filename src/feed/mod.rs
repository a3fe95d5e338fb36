/// Reference live-sync server
///
/// Serves the latest simulated snapshot over `GET /api/dashboard/overview`
/// and pushes a fresh one to every `/ws/dashboard` client on each tick.
/// Used by the `dashboard_feed_server` binary and as the real peer in the
/// data sync integration tests.
pub mod server;
pub mod simulator;

pub use server::{FeedServerConfig, FeedServerState, build_cors_layer, router, run_ticker};
pub use simulator::build_snapshot;
