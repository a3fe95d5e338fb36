/// Integration tests for the data synchronization layer
///
/// These run the pull and push sources against real HTTP / WebSocket servers
/// bound to ephemeral local ports.

#[cfg(test)]
mod integration_tests {
    use super::super::*;
    use crate::feed::{FeedServerState, build_cors_layer, build_snapshot, router, run_ticker};
    use axum::{
        Json, Router,
        extract::ws::{Message, WebSocketUpgrade},
        http::StatusCode,
        routing::get,
    };
    use serde_json::json;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;
    use tokio::time::{Duration, sleep, timeout};

    async fn spawn_app(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn spawn_feed_server(tick_interval: Option<Duration>) -> (SocketAddr, FeedServerState) {
        let state = FeedServerState::new(build_snapshot(5));
        if let Some(tick_interval) = tick_interval {
            tokio::spawn(run_ticker(state.clone(), tick_interval));
        }
        let addr = spawn_app(router(state.clone(), build_cors_layer(None))).await;
        (addr, state)
    }

    fn config_for(addr: SocketAddr) -> DashboardSyncConfig {
        DashboardSyncConfig {
            api_base_url: Some(format!("http://{}/", addr)),
            reconnect_delay_ms: 200,
            ..DashboardSyncConfig::default()
        }
    }

    async fn collect(updates: &mut tokio::sync::mpsc::UnboundedReceiver<DashboardSnapshot>, count: usize) -> Vec<DashboardSnapshot> {
        let mut received = Vec::with_capacity(count);
        while received.len() < count {
            let snapshot = timeout(Duration::from_secs(5), updates.recv())
                .await
                .expect("timed out waiting for a pushed snapshot")
                .expect("update channel closed early");
            received.push(snapshot);
        }
        received
    }

    #[tokio::test]
    async fn test_pull_from_feed_server() {
        let (addr, state) = spawn_feed_server(None).await;
        let service = DashboardSyncService::new(config_for(addr));

        let snapshot = service.get_initial_snapshot().await;
        assert_eq!(snapshot, state.latest().await);
        assert_ne!(snapshot.metrics, DEFAULT_SNAPSHOT.metrics);
        assert!(snapshot.validate().is_ok());
    }

    #[tokio::test]
    async fn test_pull_degrades_on_server_error() {
        let app = Router::new().route(OVERVIEW_PATH, get(|| async { StatusCode::INTERNAL_SERVER_ERROR }));
        let addr = spawn_app(app).await;
        let service = DashboardSyncService::new(config_for(addr));

        let snapshot = service.get_initial_snapshot().await;
        assert_eq!(&snapshot, DashboardSnapshot::default_snapshot());
    }

    #[tokio::test]
    async fn test_pull_degrades_on_undecodable_body() {
        let app = Router::new().route(OVERVIEW_PATH, get(|| async { "<html>maintenance</html>" }));
        let addr = spawn_app(app).await;
        let service = DashboardSyncService::new(config_for(addr));

        let snapshot = service.get_initial_snapshot().await;
        assert_eq!(&snapshot, DashboardSnapshot::default_snapshot());
    }

    #[tokio::test]
    async fn test_pull_normalizes_partial_body() {
        let app = Router::new().route(
            OVERVIEW_PATH,
            get(|| async { Json(json!({ "metrics": { "portfolioValue": 42.5 }, "assets": { "nfts": [] } })) }),
        );
        let addr = spawn_app(app).await;
        let service = DashboardSyncService::new(config_for(addr));

        let snapshot = service.get_initial_snapshot().await;
        let defaults = DashboardSnapshot::default_snapshot();
        assert_eq!(snapshot.metrics.portfolio_value, 42.5);
        assert_eq!(snapshot.metrics.fear_greed_index, defaults.metrics.fear_greed_index);
        assert_eq!(snapshot.recent_activities, defaults.recent_activities);
        assert_eq!(snapshot.assets.tokens, defaults.assets.tokens);
        assert!(snapshot.assets.nfts.is_empty());
    }

    #[tokio::test]
    async fn test_push_end_to_end() {
        let (addr, state) = spawn_feed_server(Some(Duration::from_millis(50))).await;
        let service = DashboardSyncService::new(config_for(addr));

        let (mut updates, subscription) = service.updates();
        let received = collect(&mut updates, 3).await;

        assert_eq!(subscription.state(), FeedState::Open);
        assert_eq!(subscription.connection_attempts(), 1);
        for snapshot in &received {
            assert!(snapshot.validate().is_ok());
        }
        assert!(received.windows(2).all(|pair| pair[0].updated_at <= pair[1].updated_at));

        subscription.shutdown().await;

        // The server notices the close and drops the client
        timeout(Duration::from_secs(5), async {
            while state.connected_clients() > 0 {
                sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("server kept the client after unsubscribe");
    }

    #[tokio::test]
    async fn test_push_reconnects_after_server_close() {
        let connections = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&connections);
        let app = Router::new().route(
            FEED_PATH,
            get(move |ws: WebSocketUpgrade| {
                let counter = Arc::clone(&counter);
                async move {
                    ws.on_upgrade(move |mut socket| async move {
                        let session = counter.fetch_add(1, Ordering::SeqCst) + 1;
                        let frame = json!({ "metrics": { "portfolioValue": session } }).to_string();
                        let _ = socket.send(Message::Text(frame)).await;
                        let _ = socket.close().await;
                    })
                }
            }),
        );
        let addr = spawn_app(app).await;
        let service = DashboardSyncService::new(config_for(addr));

        let (mut updates, subscription) = service.updates();
        let received = collect(&mut updates, 3).await;

        let values: Vec<f64> = received.iter().map(|s| s.metrics.portfolio_value).collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0]);
        assert!(subscription.connection_attempts() >= 3);
        assert!(connections.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_push_survives_unreachable_server() {
        // Nothing listens here until the server below takes the port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let service = DashboardSyncService::new(config_for(addr));
        let (mut updates, subscription) = service.updates();

        sleep(Duration::from_millis(500)).await;
        assert!(subscription.connection_attempts() >= 2);
        assert_ne!(subscription.state(), FeedState::Open);

        let state = FeedServerState::new(build_snapshot(9));
        let listener = TcpListener::bind(addr).await.unwrap();
        let app = router(state.clone(), build_cors_layer(None));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let received = collect(&mut updates, 1).await;
        assert_eq!(received[0], state.latest().await);
    }

    #[tokio::test]
    async fn test_no_callbacks_after_unsubscribe() {
        let (addr, _state) = spawn_feed_server(Some(Duration::from_millis(20))).await;
        let service = DashboardSyncService::new(config_for(addr));

        let received = Arc::new(Mutex::new(0usize));
        let sink = Arc::clone(&received);
        let subscription = service.subscribe_to_updates(move |_| *sink.lock().unwrap() += 1);

        timeout(Duration::from_secs(5), async {
            while *received.lock().unwrap() < 2 {
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("no snapshots pushed");

        subscription.unsubscribe();
        let seen = *received.lock().unwrap();
        sleep(Duration::from_millis(300)).await;
        assert_eq!(*received.lock().unwrap(), seen);
        assert_eq!(subscription.connection_attempts(), 1);
    }

    #[tokio::test]
    async fn test_explicit_ws_url_without_api_base() {
        let (addr, state) = spawn_feed_server(None).await;
        let service = DashboardSyncService::new(DashboardSyncConfig {
            ws_base_url: Some(format!("ws://{}", addr)),
            ..DashboardSyncConfig::default()
        });

        // No overview endpoint: the pull path never leaves the process
        assert_eq!(&service.get_initial_snapshot().await, DashboardSnapshot::default_snapshot());

        let (mut updates, _subscription) = service.updates();
        let received = collect(&mut updates, 1).await;
        assert_eq!(received[0], state.latest().await);
    }
}

/// Unit tests for the layer without any network
#[cfg(test)]
mod unit_tests {
    use super::super::*;

    #[test]
    fn test_config_from_defaults() {
        let config = DashboardSyncConfig::default();
        assert_eq!(config.reconnect_delay_ms, DEFAULT_RECONNECT_DELAY_MS);
        assert!(config.is_offline());
    }

    #[tokio::test]
    async fn test_no_configuration_is_fully_offline() {
        let service = DashboardSyncServiceBuilder::new()
            .with_config(DashboardSyncConfig::default())
            .build();

        assert!(service.is_offline());
        assert_eq!(&service.get_initial_snapshot().await, DashboardSnapshot::default_snapshot());

        let subscription = service.subscribe_to_updates(|_| panic!("no delivery without an endpoint"));
        assert!(!subscription.is_active());
        assert_eq!(subscription.state(), FeedState::Disconnected);
        subscription.unsubscribe();
    }

    #[test]
    fn test_normalization_never_breaks_invariants() {
        let normalizer = SnapshotNormalizer::default();
        let payloads = [
            serde_json::json!({}),
            serde_json::json!({ "metrics": { "portfolioValue": 1e308, "altseasonIndex": 1e9 } }),
            serde_json::json!({ "recentActivities": (0..40).map(|i| serde_json::json!({
                "action": "Sold", "amount": i.to_string(), "value": "$1", "time": "now",
                "chain": "SOL", "chainColor": "bg-purple-500", "type": "sell"
            })).collect::<Vec<_>>() }),
        ];

        for payload in payloads {
            let snapshot = normalizer.normalize(&payload);
            assert!(snapshot.validate().is_ok(), "payload {}", payload);
            assert!(snapshot.recent_activities.len() <= MAX_RECENT_ACTIVITIES);
        }
    }
}
