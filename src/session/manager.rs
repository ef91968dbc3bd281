use crate::config::ServerConfig;
use crate::fleet::{FleetChange, FleetStore, VesselQuery};
use crate::protocol::{ClientMessage, ConfigMessage, ErrorNotice, VesselsMessage};
use crate::proximity::PortRegistry;
use axum::extract::ws::{Message, WebSocket};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Timing and limits shared by every push session
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub refresh_interval: Duration,
    pub min_push_interval: Duration,
    pub max_limit: u32,
}

impl From<&ServerConfig> for SessionSettings {
    fn from(config: &ServerConfig) -> Self {
        Self {
            refresh_interval: Duration::from_secs(config.refresh_interval_seconds.max(1)),
            min_push_interval: Duration::from_millis(config.min_push_interval_ms),
            max_limit: config.max_limit.max(1),
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

/// Check a config message before a session adopts it.
pub fn validate_config(config: &ConfigMessage) -> Result<(), String> {
    if config.page == 0 {
        return Err("page must be at least 1".to_string());
    }
    if config.page_size == 0 {
        return Err("pageSize must be at least 1".to_string());
    }
    if !config.proximity_radius.is_finite() || config.proximity_radius < 0.0 {
        return Err("proximityRadius must be a non-negative number".to_string());
    }
    Ok(())
}

/// Build the full snapshot a session with `config` should see.
pub fn build_snapshot(
    fleet: &FleetStore,
    ports: &PortRegistry,
    config: &ConfigMessage,
    max_limit: u32,
) -> VesselsMessage {
    let vessels = fleet.query(&VesselQuery {
        region: config.region.clone(),
        page: config.page,
        page_size: config.page_size.min(max_limit),
        load_all: config.load_all_vessels,
    });

    let port_connections = if config.track_port_proximity {
        ports.connections_for(&vessels, config.proximity_radius)
    } else {
        Vec::new()
    };

    VesselsMessage::new(vessels, port_connections)
}

/// Manages a single push-channel WebSocket.
///
/// Nothing is sent until the client has sent its config; after that every
/// message is a full snapshot for the session's filter.
pub struct PushSession {
    id: Uuid,
    fleet: Arc<FleetStore>,
    ports: Arc<PortRegistry>,
    settings: SessionSettings,
    filter: Option<ConfigMessage>,
}

impl PushSession {
    pub fn new(fleet: Arc<FleetStore>, ports: Arc<PortRegistry>, settings: SessionSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            fleet,
            ports,
            settings,
            filter: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Handle the WebSocket connection lifecycle
    pub async fn handle(mut self, mut socket: WebSocket) {
        let mut change_rx = self.fleet.subscribe();
        let mut refresh = tokio::time::interval_at(
            Instant::now() + self.settings.refresh_interval,
            self.settings.refresh_interval,
        );
        refresh.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut pending = false;
        let mut last_push = Instant::now();

        info!(session_id = %self.id, "Push session established");

        loop {
            let flush_at = last_push + self.settings.min_push_interval;

            tokio::select! {
                msg = socket.recv() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            match self.handle_client_message(&mut socket, &text).await {
                                Ok(true) => {
                                    last_push = Instant::now();
                                    pending = false;
                                }
                                Ok(false) => {}
                                Err(e) => {
                                    error!(session_id = %self.id, error = %e, "Failed to answer client message");
                                    break;
                                }
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            info!(session_id = %self.id, "Push client disconnected");
                            break;
                        }
                        Some(Ok(Message::Ping(data))) => {
                            if let Err(e) = socket.send(Message::Pong(data)).await {
                                error!(error = %e, "Failed to send pong");
                                break;
                            }
                        }
                        Some(Ok(_)) => {
                            // Ignore binary, pong messages
                        }
                        Some(Err(e)) => {
                            warn!(session_id = %self.id, error = %e, "WebSocket error");
                            break;
                        }
                    }
                }

                result = change_rx.recv() => {
                    match result {
                        Ok(FleetChange::Upserted(_)) | Ok(FleetChange::Removed(_)) => {
                            pending = self.filter.is_some();
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // A full snapshot covers whatever was skipped
                            debug!(session_id = %self.id, skipped, "Fleet changes lagged");
                            pending = self.filter.is_some();
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            error!("Fleet change channel closed");
                            break;
                        }
                    }
                }

                _ = tokio::time::sleep_until(flush_at), if pending => {
                    if let Err(e) = self.send_snapshot(&mut socket).await {
                        warn!(session_id = %self.id, error = %e, "Failed to push snapshot");
                        break;
                    }
                    last_push = Instant::now();
                    pending = false;
                }

                _ = refresh.tick() => {
                    if self.filter.is_some() {
                        if let Err(e) = self.send_snapshot(&mut socket).await {
                            warn!(session_id = %self.id, error = %e, "Failed to push refresh");
                            break;
                        }
                        last_push = Instant::now();
                        pending = false;
                    }
                }
            }
        }

        info!(session_id = %self.id, "Push session closed");
    }

    /// Handle a client message. Returns true when a snapshot was sent.
    async fn handle_client_message(
        &mut self,
        socket: &mut WebSocket,
        text: &str,
    ) -> anyhow::Result<bool> {
        let config = match serde_json::from_str::<ClientMessage>(text) {
            Ok(ClientMessage::Config(config)) => config,
            Err(e) => {
                debug!(session_id = %self.id, error = %e, "Rejected client message");
                self.send_error(socket, format!("invalid config message: {}", e))
                    .await?;
                return Ok(false);
            }
        };

        if let Err(reason) = validate_config(&config) {
            self.send_error(socket, format!("invalid config message: {}", reason))
                .await?;
            return Ok(false);
        }

        info!(
            session_id = %self.id,
            region = %config.region,
            page = config.page,
            page_size = config.page_size,
            load_all = config.load_all_vessels,
            "Session configured"
        );
        self.filter = Some(config);
        self.send_snapshot(socket).await?;
        Ok(true)
    }

    async fn send_snapshot(&self, socket: &mut WebSocket) -> anyhow::Result<()> {
        let Some(filter) = &self.filter else {
            return Ok(());
        };

        let msg = build_snapshot(&self.fleet, &self.ports, filter, self.settings.max_limit);
        debug!(
            session_id = %self.id,
            vessels = msg.vessels.len(),
            port_connections = msg.port_connections.len(),
            "Pushing snapshot"
        );
        let json = serde_json::to_string(&msg)?;
        socket.send(Message::Text(json)).await?;
        Ok(())
    }

    async fn send_error(&self, socket: &mut WebSocket, message: String) -> anyhow::Result<()> {
        let json = serde_json::to_string(&ErrorNotice::new(message))?;
        socket.send(Message::Text(json)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{EntityId, TrackedEntity};
    use crate::proximity::Port;

    fn config(region: &str) -> ConfigMessage {
        ConfigMessage {
            region: region.to_string(),
            load_all_vessels: false,
            page: 1,
            page_size: 1000,
            track_port_proximity: true,
            proximity_radius: 50.0,
        }
    }

    fn fleet() -> FleetStore {
        let fleet = FleetStore::new();
        let mut a = TrackedEntity::new(1, Some(51.9), Some(4.1));
        a.region = Some("europe".to_string());
        let mut b = TrackedEntity::new(2, Some(1.2), Some(103.8));
        b.region = Some("asia".to_string());
        fleet.upsert(a);
        fleet.upsert(b);
        fleet
    }

    fn ports() -> PortRegistry {
        PortRegistry::new(vec![Port {
            id: EntityId::Number(1),
            name: "Rotterdam".to_string(),
            lat: 51.95,
            lng: 4.14,
        }])
    }

    #[test]
    fn test_validate_config() {
        assert!(validate_config(&config("global")).is_ok());

        let mut bad = config("global");
        bad.page_size = 0;
        assert!(validate_config(&bad).is_err());

        let mut bad = config("global");
        bad.proximity_radius = f64::NAN;
        assert!(validate_config(&bad).is_err());

        let mut bad = config("global");
        bad.page = 0;
        assert!(validate_config(&bad).is_err());
    }

    #[test]
    fn test_build_snapshot_filters_and_annotates() {
        let fleet = fleet();
        let ports = ports();

        let msg = build_snapshot(&fleet, &ports, &config("europe"), 1000);
        assert_eq!(msg.vessels.len(), 1);
        assert_eq!(msg.port_connections.len(), 1);
        assert_eq!(msg.port_connections[0].port_name.as_deref(), Some("Rotterdam"));

        let msg = build_snapshot(&fleet, &ports, &config("global"), 1000);
        assert_eq!(msg.vessels.len(), 2);
        assert_eq!(msg.port_connections.len(), 1);

        let mut untracked = config("global");
        untracked.track_port_proximity = false;
        let msg = build_snapshot(&fleet, &ports, &untracked, 1000);
        assert!(msg.port_connections.is_empty());
    }

    #[test]
    fn test_build_snapshot_caps_page_size() {
        let fleet = fleet();
        let msg = build_snapshot(&fleet, &ports(), &config("global"), 1);
        assert_eq!(msg.vessels.len(), 1);
    }
}
