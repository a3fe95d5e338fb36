use crate::data_sync::config::{FEED_PATH, OVERVIEW_PATH};
use crate::data_sync::snapshot::DashboardSnapshot;
use crate::feed::simulator::build_snapshot;
use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::HeaderValue,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{RwLock, broadcast};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, info, warn};

/// Configuration for the reference live-sync server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedServerConfig {
    pub host: String,
    pub port: u16,
    /// Interval between simulated snapshots in milliseconds
    pub tick_interval_ms: u64,
    /// Comma-separated allowed origins, any origin when unset
    pub frontend_origins: Option<String>,
}

impl Default for FeedServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            tick_interval_ms: 3_000,
            frontend_origins: None,
        }
    }
}

impl FeedServerConfig {
    /// Load configuration from environment variables (and `.env` if present)
    pub fn from_env() -> eyre::Result<Self> {
        dotenvy::dotenv().ok();
        let mut config = Self::default();

        if let Ok(host) = std::env::var("BACKEND_HOST") {
            config.host = host;
        }

        if let Ok(port_str) = std::env::var("BACKEND_PORT") {
            config.port = port_str
                .parse()
                .map_err(|e| eyre::eyre!("Invalid BACKEND_PORT: {}", e))?;
        }

        if let Ok(interval_str) = std::env::var("FEED_TICK_INTERVAL_MS") {
            config.tick_interval_ms = interval_str
                .parse()
                .map_err(|e| eyre::eyre!("Invalid FEED_TICK_INTERVAL_MS: {}", e))?;
        }

        config.frontend_origins = std::env::var("FRONTEND_ORIGINS").ok();

        Ok(config)
    }

    pub fn bind_addr(&self) -> eyre::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| eyre::eyre!("Invalid bind address {}:{}: {}", self.host, self.port, e))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Latest snapshot plus the fan-out channel every WebSocket client listens on
#[derive(Clone)]
pub struct FeedServerState {
    latest_snapshot: Arc<RwLock<DashboardSnapshot>>,
    tx: broadcast::Sender<DashboardSnapshot>,
}

impl FeedServerState {
    pub fn new(initial_snapshot: DashboardSnapshot) -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            latest_snapshot: Arc::new(RwLock::new(initial_snapshot)),
            tx,
        }
    }

    pub async fn latest(&self) -> DashboardSnapshot {
        self.latest_snapshot.read().await.clone()
    }

    /// Store `snapshot` as the latest and push it to every connected client
    pub async fn publish(&self, snapshot: DashboardSnapshot) {
        *self.latest_snapshot.write().await = snapshot.clone();
        // No receivers just means nobody is connected
        let _ = self.tx.send(snapshot);
    }

    pub fn connected_clients(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Routes: banner, overview and the dashboard stream
pub fn router(state: FeedServerState, cors: CorsLayer) -> Router {
    Router::new()
        .route("/", get(root))
        .route(OVERVIEW_PATH, get(get_dashboard_overview))
        .route(FEED_PATH, get(ws_dashboard))
        .layer(cors)
        .with_state(state)
}

/// Publish a fresh simulated snapshot every `tick_interval`, forever
pub async fn run_ticker(state: FeedServerState, tick_interval: Duration) {
    let mut tick: u64 = 1;
    let mut interval = tokio::time::interval(tick_interval);

    loop {
        interval.tick().await;
        state.publish(build_snapshot(tick)).await;
        debug!("Published snapshot #{} to {} clients", tick, state.connected_clients());
        tick = tick.saturating_add(1);
    }
}

/// Permissive unless a non-empty list of valid origins is given
pub fn build_cors_layer(origins: Option<&str>) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty() && *origin != "*")
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Ignoring invalid origin {}: {}", origin, e);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allowed.is_empty() {
        cors.allow_origin(Any)
    } else {
        cors.allow_origin(AllowOrigin::list(allowed))
    }
}

async fn root() -> &'static str {
    "Dashboard live sync server"
}

async fn get_dashboard_overview(State(state): State<FeedServerState>) -> Json<DashboardSnapshot> {
    Json(state.latest().await)
}

async fn ws_dashboard(ws: WebSocketUpgrade, State(state): State<FeedServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
}

async fn handle_ws_connection(mut socket: WebSocket, state: FeedServerState) {
    // Subscribe first so nothing published after the initial send is missed
    let mut rx = state.tx.subscribe();
    info!("Dashboard client connected ({} total)", state.connected_clients());

    let initial_snapshot = state.latest().await;
    if send_snapshot(&mut socket, &initial_snapshot).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            published = rx.recv() => {
                match published {
                    Ok(snapshot) => {
                        if send_snapshot(&mut socket, &snapshot).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Dashboard client lagging, skipped {} snapshots", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    info!("Dashboard client disconnected");
}

async fn send_snapshot(socket: &mut WebSocket, snapshot: &DashboardSnapshot) -> Result<(), axum::Error> {
    let text = serde_json::to_string(snapshot).map_err(axum::Error::new)?;
    socket.send(Message::Text(text)).await
}
