use dashboard_sync::feed::{FeedServerConfig, FeedServerState, build_cors_layer, build_snapshot, router, run_ticker};
use dashboard_sync::utils::init_logging;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_logging();

    let config = FeedServerConfig::from_env()?;
    let bind_addr = config.bind_addr()?;

    let state = FeedServerState::new(build_snapshot(0));
    let ticker = tokio::spawn(run_ticker(state.clone(), config.tick_interval()));

    let cors = build_cors_layer(config.frontend_origins.as_deref());
    let app = router(state, cors);

    let listener = TcpListener::bind(bind_addr).await?;
    info!("Dashboard feed server listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received");
        })
        .await?;

    ticker.abort();
    Ok(())
}
