use crate::data_sync::error::SyncError;
use crate::data_sync::normalizer::SnapshotNormalizer;
use crate::data_sync::snapshot::DashboardSnapshot;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use strum_macros::Display;
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Lifecycle of the push channel owned by one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum FeedState {
    Disconnected,
    Connecting,
    Open,
}

/// Decides whether and when the push source reconnects after losing its channel.
///
/// `attempt` counts consecutive failed or dropped connections since the last
/// successful open, starting at 1.
pub trait ReconnectPolicy: Send + Sync + Debug {
    fn should_retry(&self, attempt: u32) -> bool;
    fn delay(&self, attempt: u32) -> Duration;
}

/// Flat delay between attempts. Unbounded unless `max_attempts` is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay, max_attempts: None }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self::new(Duration::from_millis(crate::data_sync::config::DEFAULT_RECONNECT_DELAY_MS))
    }
}

impl ReconnectPolicy for FixedDelay {
    fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }

    fn delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// A single open, receive-only streaming channel
#[async_trait]
pub trait FeedChannel: Send {
    /// Next text frame; `Ok(None)` once the peer has closed the channel
    async fn next_text(&mut self) -> Result<Option<String>, SyncError>;

    async fn close(&mut self);
}

/// Opens streaming channels. The production implementation is [`TungsteniteConnector`].
#[async_trait]
pub trait FeedConnector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Box<dyn FeedChannel>, SyncError>;
}

/// WebSocket connector backed by tokio-tungstenite
#[derive(Debug, Clone, Default)]
pub struct TungsteniteConnector;

#[async_trait]
impl FeedConnector for TungsteniteConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn FeedChannel>, SyncError> {
        let (ws_stream, _) = connect_async(url).await?;
        Ok(Box::new(TungsteniteChannel { ws_stream }))
    }
}

struct TungsteniteChannel {
    ws_stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl FeedChannel for TungsteniteChannel {
    async fn next_text(&mut self) -> Result<Option<String>, SyncError> {
        loop {
            match self.ws_stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Ping(data))) => {
                    self.ws_stream.send(Message::Pong(data)).await?;
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => {
                    // Binary and pong frames carry no snapshot
                }
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.ws_stream.close(None).await {
            debug!("Dashboard feed close handshake failed: {}", e);
        }
    }
}

type SnapshotHandler = Box<dyn FnMut(DashboardSnapshot) + Send>;

/// State shared between a subscription handle and its feed task
struct FeedShared {
    closed_by_client: AtomicBool,
    handler: Mutex<Option<SnapshotHandler>>,
    connection_attempts: AtomicU32,
}

impl FeedShared {
    fn is_closed(&self) -> bool {
        self.closed_by_client.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.closed_by_client.store(true, Ordering::SeqCst);
        // A delivery in flight holds the lock; it re-checks the flag before the next one
        if let Ok(mut handler) = self.handler.try_lock() {
            handler.take();
        }
    }

    /// Drop the consumer once the feed has ended for good
    fn release(&self) {
        self.handler.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    /// Hand a snapshot to the consumer. Returns false once the client has unsubscribed.
    fn deliver(&self, snapshot: DashboardSnapshot) -> bool {
        let mut handler = self.handler.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_closed() {
            handler.take();
            return false;
        }
        match handler.as_mut() {
            Some(on_snapshot) => {
                on_snapshot(snapshot);
                true
            }
            None => false,
        }
    }
}

enum ChannelExit {
    ClosedByClient,
    Lost,
}

/// Handle to one live push subscription.
///
/// Dropping the handle unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct FeedSubscription {
    shared: Option<Arc<FeedShared>>,
    shutdown_tx: Option<watch::Sender<bool>>,
    state_rx: watch::Receiver<FeedState>,
    task: Option<JoinHandle<()>>,
}

impl FeedSubscription {
    /// Subscription that never connects, used when no endpoint is configured
    fn inert() -> Self {
        let (_, state_rx) = watch::channel(FeedState::Disconnected);
        Self {
            shared: None,
            shutdown_tx: None,
            state_rx,
            task: None,
        }
    }

    /// Stop delivery, cancel any pending reconnect and close the channel. Safe to call repeatedly.
    pub fn unsubscribe(&self) {
        if let Some(shared) = &self.shared {
            shared.close();
        }
        if let Some(shutdown_tx) = &self.shutdown_tx {
            shutdown_tx.send_replace(true);
        }
    }

    /// Unsubscribe and wait until the feed task has closed its channel
    pub async fn shutdown(mut self) {
        self.unsubscribe();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!("Dashboard feed task error during shutdown: {}", e);
            }
        }
    }

    /// False for subscriptions created without a streaming endpoint
    pub fn is_active(&self) -> bool {
        self.shared.is_some()
    }

    pub fn state(&self) -> FeedState {
        *self.state_rx.borrow()
    }

    /// Watch the channel lifecycle
    pub fn state_changes(&self) -> watch::Receiver<FeedState> {
        self.state_rx.clone()
    }

    /// Number of times a channel has been requested, including the first
    pub fn connection_attempts(&self) -> u32 {
        self.shared
            .as_ref()
            .map_or(0, |shared| shared.connection_attempts.load(Ordering::SeqCst))
    }
}

impl Debug for FeedSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedSubscription")
            .field("active", &self.is_active())
            .field("state", &self.state())
            .field("connection_attempts", &self.connection_attempts())
            .finish()
    }
}

impl Drop for FeedSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Push source: keeps a best-effort live feed of snapshots over a streaming channel
#[derive(Clone)]
pub struct WebSocketFeed {
    feed_url: Option<String>,
    normalizer: SnapshotNormalizer,
    connector: Arc<dyn FeedConnector>,
    reconnect_policy: Arc<dyn ReconnectPolicy>,
}

impl WebSocketFeed {
    pub fn new(feed_url: Option<String>, normalizer: SnapshotNormalizer) -> Self {
        Self {
            feed_url,
            normalizer,
            connector: Arc::new(TungsteniteConnector),
            reconnect_policy: Arc::new(FixedDelay::default()),
        }
    }

    pub fn with_connector(mut self, connector: Arc<dyn FeedConnector>) -> Self {
        self.connector = connector;
        self
    }

    pub fn with_reconnect_policy(mut self, reconnect_policy: Arc<dyn ReconnectPolicy>) -> Self {
        self.reconnect_policy = reconnect_policy;
        self
    }

    pub fn feed_url(&self) -> Option<&str> {
        self.feed_url.as_deref()
    }

    /// Start streaming snapshots into `on_snapshot`, in arrival order.
    ///
    /// Without a streaming endpoint (or outside a tokio runtime) the returned
    /// subscription is inert and no connection is ever attempted.
    pub fn subscribe<F>(&self, on_snapshot: F) -> FeedSubscription
    where
        F: FnMut(DashboardSnapshot) + Send + 'static,
    {
        let Some(url) = self.feed_url.clone() else {
            debug!("No dashboard feed endpoint configured, live updates disabled");
            return FeedSubscription::inert();
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("Cannot start dashboard feed outside a tokio runtime: {}", e);
                return FeedSubscription::inert();
            }
        };

        let shared = Arc::new(FeedShared {
            closed_by_client: AtomicBool::new(false),
            handler: Mutex::new(Some(Box::new(on_snapshot))),
            connection_attempts: AtomicU32::new(0),
        });
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (state_tx, state_rx) = watch::channel(FeedState::Disconnected);

        let task = runtime.spawn(Self::run(
            url,
            Arc::clone(&self.connector),
            Arc::clone(&self.reconnect_policy),
            self.normalizer.clone(),
            Arc::clone(&shared),
            state_tx,
            shutdown_rx,
        ));

        FeedSubscription {
            shared: Some(shared),
            shutdown_tx: Some(shutdown_tx),
            state_rx,
            task: Some(task),
        }
    }

    /// Connect, pump, wait, repeat until the client unsubscribes or the policy gives up
    async fn run(
        url: String,
        connector: Arc<dyn FeedConnector>,
        reconnect_policy: Arc<dyn ReconnectPolicy>,
        normalizer: SnapshotNormalizer,
        shared: Arc<FeedShared>,
        state_tx: watch::Sender<FeedState>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut attempt: u32 = 0;

        loop {
            if shared.is_closed() {
                break;
            }

            state_tx.send_replace(FeedState::Connecting);
            shared.connection_attempts.fetch_add(1, Ordering::SeqCst);
            info!("Connecting to dashboard feed: {}", url);

            let connected = tokio::select! {
                connected = connector.connect(&url) => connected,
                _ = shutdown_rx.changed() => break,
            };

            match connected {
                Ok(mut channel) => {
                    if shared.is_closed() {
                        channel.close().await;
                        break;
                    }
                    state_tx.send_replace(FeedState::Open);
                    info!("Dashboard feed open");
                    attempt = 0;

                    match Self::pump(channel.as_mut(), &normalizer, &shared, &mut shutdown_rx).await {
                        ChannelExit::ClosedByClient => {
                            channel.close().await;
                            break;
                        }
                        ChannelExit::Lost => {}
                    }
                }
                Err(e) => {
                    warn!("Dashboard feed connection failed: {}", e);
                }
            }

            state_tx.send_replace(FeedState::Disconnected);
            if shared.is_closed() {
                break;
            }

            attempt = attempt.saturating_add(1);
            if !reconnect_policy.should_retry(attempt) {
                warn!("Dashboard feed gave up after {} consecutive failures", attempt);
                break;
            }

            let delay = reconnect_policy.delay(attempt);
            info!("Reconnecting to dashboard feed #{} in {:?}", attempt, delay);
            tokio::select! {
                _ = sleep(delay) => {}
                _ = shutdown_rx.changed() => break,
            }
        }

        state_tx.send_replace(FeedState::Disconnected);
        shared.release();
        debug!("Dashboard feed task ended");
    }

    /// Deliver frames until the channel drops or the client unsubscribes
    async fn pump(
        channel: &mut dyn FeedChannel,
        normalizer: &SnapshotNormalizer,
        shared: &FeedShared,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> ChannelExit {
        loop {
            let frame = tokio::select! {
                frame = channel.next_text() => frame,
                _ = shutdown_rx.changed() => return ChannelExit::ClosedByClient,
            };

            match frame {
                Ok(Some(text)) => match normalizer.normalize_text(&text) {
                    Ok(snapshot) => {
                        if !shared.deliver(snapshot) {
                            return ChannelExit::ClosedByClient;
                        }
                    }
                    Err(e) => {
                        debug!("Discarding dashboard frame: {}", e);
                    }
                },
                Ok(None) => {
                    info!("Dashboard feed closed by server");
                    return ChannelExit::Lost;
                }
                Err(e) => {
                    warn!("Dashboard feed error: {}", e);
                    return ChannelExit::Lost;
                }
            }
        }
    }
}

impl Debug for WebSocketFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketFeed")
            .field("feed_url", &self.feed_url)
            .field("reconnect_policy", &self.reconnect_policy)
            .finish()
    }
}
