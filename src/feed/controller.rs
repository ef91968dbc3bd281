use super::backoff::ReconnectPolicy;
use super::endpoint::Endpoints;
use super::metrics::{FeedMetrics, MetricsSnapshot};
use super::status::{FeedState, FeedStatus, FeedView};
use super::worker::FeedWorker;
use crate::config::{AppConfig, FeedConfig};
use crate::snapshot::SnapshotView;
use crate::transport::{HttpPullSource, PullSource, PushConnector, WsConnector};
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A running worker and the means to stop it
struct ActiveFeed {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ActiveFeed {
    /// Cancel the worker and wait until it has closed its channel.
    async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            if e.is_panic() {
                warn!(error = %e, "Feed worker panicked");
            }
        }
    }
}

struct Lifecycle {
    epoch: u64,
    active: Option<ActiveFeed>,
}

/// Maintains a live vessel snapshot from a push channel, falling back to a
/// pull source whenever the channel is down.
///
/// Consumers only read: [`get_snapshot`](Self::get_snapshot),
/// [`get_status`](Self::get_status), [`view`](Self::view) or a
/// [`subscribe`](Self::subscribe) receiver. None of the operations return
/// errors; failures surface in the status.
pub struct LiveFeedController {
    endpoints: Endpoints,
    connector: Arc<dyn PushConnector>,
    pull: Arc<dyn PullSource>,
    policy: ReconnectPolicy,
    state_tx: Arc<watch::Sender<FeedState>>,
    metrics: FeedMetrics,
    lifecycle: Mutex<Lifecycle>,
}

impl LiveFeedController {
    pub fn new(
        endpoints: Endpoints,
        connector: Arc<dyn PushConnector>,
        pull: Arc<dyn PullSource>,
        policy: ReconnectPolicy,
    ) -> Self {
        let (state_tx, _) = watch::channel(FeedState::default());
        Self {
            endpoints,
            connector,
            pull,
            policy,
            state_tx: Arc::new(state_tx),
            metrics: FeedMetrics::new(),
            lifecycle: Mutex::new(Lifecycle {
                epoch: 0,
                active: None,
            }),
        }
    }

    /// Build a controller with the WebSocket and HTTP transports.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let endpoints = Endpoints::from_config(&config.client)?;
        let connector = WsConnector::new(Duration::from_millis(config.client.connect_timeout_ms));
        let pull = HttpPullSource::new(
            endpoints.pull.clone(),
            Duration::from_millis(config.client.request_timeout_ms),
        )?;

        Ok(Self::new(
            endpoints,
            Arc::new(connector),
            Arc::new(pull),
            config.reconnect.clone(),
        ))
    }

    /// Begin (or restart) the feed with `config`.
    ///
    /// Any previous worker is cancelled and awaited first, so its channel is
    /// closed before the new one opens.
    pub async fn start(&self, config: FeedConfig) {
        let mut lifecycle = self.lifecycle.lock().await;
        lifecycle.epoch += 1;
        let epoch = lifecycle.epoch;

        // Fence off the old worker before it is even cancelled
        self.state_tx.send_modify(|s| s.epoch = epoch);
        if let Some(previous) = lifecycle.active.take() {
            previous.shutdown().await;
        }
        self.state_tx.send_modify(|s| s.begin());

        info!(
            region = %config.region,
            page_size = config.page_size,
            url = %self.endpoints.push,
            "Starting live feed"
        );

        let cancel = CancellationToken::new();
        let worker = FeedWorker {
            epoch,
            config,
            endpoints: self.endpoints.clone(),
            connector: Arc::clone(&self.connector),
            pull: Arc::clone(&self.pull),
            policy: self.policy.clone(),
            state_tx: Arc::clone(&self.state_tx),
            metrics: self.metrics.clone(),
            cancel: cancel.clone(),
        };
        let handle = tokio::spawn(worker.run());

        lifecycle.active = Some(ActiveFeed { cancel, handle });
    }

    /// Stop the feed. The last snapshot stays readable.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        lifecycle.epoch += 1;
        let epoch = lifecycle.epoch;

        self.state_tx.send_modify(|s| s.epoch = epoch);
        let was_running = match lifecycle.active.take() {
            Some(active) => {
                active.shutdown().await;
                true
            }
            None => false,
        };
        self.state_tx.send_modify(|s| s.stop());

        if was_running {
            info!("Live feed stopped");
        }
    }

    /// Renderable vessels and the data around them
    pub fn get_snapshot(&self) -> SnapshotView {
        self.state_tx.borrow().snapshot_view()
    }

    pub fn get_status(&self) -> FeedStatus {
        self.state_tx.borrow().status()
    }

    pub fn view(&self) -> FeedView {
        self.state_tx.borrow().view()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<FeedState> {
        self.state_tx.subscribe()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.get_snapshot()
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

impl Drop for LiveFeedController {
    fn drop(&mut self) {
        if let Some(active) = self.lifecycle.get_mut().active.take() {
            active.cancel.cancel();
        }
    }
}
