use super::backoff::ReconnectPolicy;
use super::endpoint::Endpoints;
use super::metrics::FeedMetrics;
use super::status::FeedState;
use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::protocol::{
    parse_port_connections, BatchPayload, ClientMessage, ConfigMessage, PullQuery, ServerMessage,
};
use crate::snapshot::ParsedBatch;
use crate::transport::{Inbound, PullSource, PushConnector};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How one push session ended
enum SessionEnd {
    /// Cancelled or superseded; the worker must exit without touching state
    Cancelled,
    Closed {
        reason: Option<String>,
        opened: bool,
    },
    Failed {
        error: String,
        opened: bool,
    },
}

/// The task behind one `start` call.
///
/// Connect, stream, fall back to one pull, wait, repeat, until cancelled.
pub(crate) struct FeedWorker {
    pub(crate) epoch: u64,
    pub(crate) config: FeedConfig,
    pub(crate) endpoints: Endpoints,
    pub(crate) connector: Arc<dyn PushConnector>,
    pub(crate) pull: Arc<dyn PullSource>,
    pub(crate) policy: ReconnectPolicy,
    pub(crate) state_tx: Arc<watch::Sender<FeedState>>,
    pub(crate) metrics: FeedMetrics,
    pub(crate) cancel: CancellationToken,
}

impl FeedWorker {
    pub(crate) async fn run(self) {
        let mut attempt: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            self.metrics.record_connect_attempt();
            let opened = match self.connect_and_stream().await {
                SessionEnd::Cancelled => break,
                SessionEnd::Closed { reason, opened } => {
                    info!(
                        region = %self.config.region,
                        reason = reason.as_deref().unwrap_or(""),
                        "Push channel closed"
                    );
                    if !self.update(|s| s.mark_closed(reason)) {
                        break;
                    }
                    opened
                }
                SessionEnd::Failed { error, opened } => {
                    warn!(region = %self.config.region, error = %error, "Push channel failed");
                    if !self.update(|s| s.mark_failed(FeedError::Transport(error))) {
                        break;
                    }
                    opened
                }
            };

            if opened {
                attempt = 0;
            }

            if !self.fallback_fetch().await {
                break;
            }

            let delay = self.policy.delay(attempt);
            attempt = attempt.saturating_add(1);
            debug!(attempt, delay_ms = delay.as_millis() as u64, "Scheduling reconnect");

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }

            if !self.update(|s| s.mark_connecting()) {
                break;
            }
        }

        debug!(epoch = self.epoch, "Feed worker stopped");
    }

    /// Apply `f` to the shared state if this worker is still current.
    ///
    /// Returns false once the worker has been superseded.
    fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut FeedState),
    {
        let epoch = self.epoch;
        let mut applied = false;
        self.state_tx.send_if_modified(|state| {
            if state.epoch != epoch {
                return false;
            }
            f(state);
            applied = true;
            true
        });
        applied
    }

    async fn connect_and_stream(&self) -> SessionEnd {
        let connected = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return SessionEnd::Cancelled,
            result = self.connector.connect(&self.endpoints.push) => result,
        };

        let mut channel = match connected {
            Ok(channel) => channel,
            Err(e) => {
                return SessionEnd::Failed {
                    error: format!("{:#}", e),
                    opened: false,
                }
            }
        };

        if !self.update(|s| s.mark_open()) {
            channel.close().await;
            return SessionEnd::Cancelled;
        }
        self.metrics.record_open();
        info!(url = %self.endpoints.push, region = %self.config.region, "Push channel open");

        let message = ClientMessage::Config(ConfigMessage::from(&self.config));
        let sent = match serde_json::to_string(&message) {
            Ok(text) => channel.send(text).await,
            Err(e) => Err(e.into()),
        };
        if let Err(e) = sent {
            channel.close().await;
            return SessionEnd::Failed {
                error: format!("{:#}", e),
                opened: true,
            };
        }

        loop {
            let inbound = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    channel.close().await;
                    return SessionEnd::Cancelled;
                }
                inbound = channel.recv() => inbound,
            };

            match inbound {
                Ok(Inbound::Text(text)) => {
                    if !self.handle_message(&text) {
                        channel.close().await;
                        return SessionEnd::Cancelled;
                    }
                }
                Ok(Inbound::Closed { reason }) => {
                    return SessionEnd::Closed {
                        reason,
                        opened: true,
                    }
                }
                Err(e) => {
                    channel.close().await;
                    return SessionEnd::Failed {
                        error: format!("{:#}", e),
                        opened: true,
                    };
                }
            }
        }
    }

    /// Apply one inbound message. Returns false if the worker was superseded.
    fn handle_message(&self, text: &str) -> bool {
        self.metrics.record_message();

        let message: ServerMessage = match serde_json::from_str(text) {
            Ok(message) => message,
            Err(e) => {
                self.metrics.record_parse_error();
                warn!(error = %e, "Skipping unparseable feed message");
                return true;
            }
        };

        match message {
            ServerMessage::Vessels(batch) | ServerMessage::VesselUpdate(batch) => {
                self.apply_batch(batch)
            }
            ServerMessage::Error { message } => {
                let message = message.unwrap_or_else(|| "unspecified server error".to_string());
                self.metrics.record_server_error();
                warn!(region = %self.config.region, message = %message, "Server reported an error");
                self.update(|s| s.server_notice(message))
            }
            ServerMessage::Unknown => {
                debug!("Ignoring feed message of unknown type");
                true
            }
        }
    }

    fn apply_batch(&self, batch: BatchPayload) -> bool {
        let now = Utc::now();
        let parsed = ParsedBatch::from_records(batch.records(), now);
        let rejected = parsed.rejected;
        let connections = batch
            .port_connections
            .as_deref()
            .map(parse_port_connections);

        let mut outcome = None;
        let applied = self.update(|s| outcome = Some(s.apply_batch(parsed, connections, now)));

        if let Some(outcome) = outcome {
            self.metrics.record_batch(outcome.unmappable(), rejected);
            debug!(
                total = outcome.total,
                renderable = outcome.renderable,
                changed = outcome.changed,
                removed = outcome.removed,
                rejected,
                "Applied vessel batch"
            );
        }
        applied
    }

    /// One immediate pull after the push channel went away.
    ///
    /// Returns false if cancelled or superseded.
    async fn fallback_fetch(&self) -> bool {
        self.metrics.record_fallback();
        let query = PullQuery::from(&self.config);

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            result = self.pull.fetch(&query) => result,
        };

        match result {
            Ok(response) => {
                let now = Utc::now();
                let parsed = ParsedBatch::from_records(&response.vessels, now);
                let rejected = parsed.rejected;
                let mut outcome = None;
                let applied = self.update(|s| outcome = s.apply_pull(parsed, now));

                match outcome {
                    Some(outcome) => {
                        self.metrics.record_batch(outcome.unmappable(), rejected);
                        info!(total = outcome.total, "Fallback pull applied");
                    }
                    None if applied => debug!("Fallback pull returned no vessels, keeping snapshot"),
                    None => {}
                }
                applied
            }
            Err(e) => {
                let error = format!("{:#}", e);
                self.metrics.record_fallback_failure();
                warn!(error = %error, "Fallback pull failed");
                self.update(|s| s.pull_failed(FeedError::Pull(error)))
            }
        }
    }
}
