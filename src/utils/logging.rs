// Console logging setup shared by the binaries. The library itself only emits `tracing` events.
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset or invalid
const DEFAULT_FILTER: &str = "warn,dashboard_sync=info";

/// Install a console subscriber honoring `RUST_LOG`. Calling it twice is a no-op.
pub fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init();
}
