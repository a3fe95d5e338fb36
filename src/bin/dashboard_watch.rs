use dashboard_sync::{DashboardSnapshot, DashboardSyncConfig, DashboardSyncService, DashboardSyncServiceBuilder};
use dashboard_sync::utils::init_logging;
use tracing::info;

/// Usage: `dashboard_watch [config.toml]`, environment variables otherwise
#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => DashboardSyncConfig::from_file(path).await?,
        None => DashboardSyncConfig::from_env()?,
    };

    let service = DashboardSyncServiceBuilder::new().with_config(config).build();
    if service.is_offline() {
        info!("No dashboard endpoint configured, showing the default snapshot only");
    }

    let initial = service.get_initial_snapshot().await;
    log_snapshot(&service, "initial", &initial);

    let (mut updates, subscription) = service.updates();
    loop {
        tokio::select! {
            received = updates.recv() => match received {
                Some(snapshot) => log_snapshot(&service, "update", &snapshot),
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    subscription.shutdown().await;
    Ok(())
}

fn log_snapshot(service: &DashboardSyncService, source: &str, snapshot: &DashboardSnapshot) {
    let metrics = &snapshot.metrics;
    info!(
        "[{}] {} portfolio={} ({:+.2}%) market_cap={} ({:+.2}%) altseason={} fear_greed={} activities={}",
        source,
        snapshot.updated_at.to_rfc3339(),
        service.format_portfolio(metrics.portfolio_value),
        metrics.portfolio_change_percent,
        service.format_market_cap(metrics.total_market_cap),
        metrics.market_cap_change_percent,
        metrics.altseason_index,
        metrics.fear_greed_index,
        snapshot.recent_activities.len(),
    );
}
