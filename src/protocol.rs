//! Wire messages exchanged over the push channel and the pull endpoint.

use crate::config::FeedConfig;
use crate::entity::{EntityId, TrackedEntity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

/// Client → Server message types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Sent exactly once per successful open
    Config(ConfigMessage),
}

/// Feed configuration carried by a `config` message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigMessage {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub load_all_vessels: bool,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub track_port_proximity: bool,
    #[serde(default = "default_proximity_radius")]
    pub proximity_radius: f64,
}

fn default_region() -> String {
    "global".to_string()
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    1000
}

fn default_proximity_radius() -> f64 {
    50.0
}

impl From<&FeedConfig> for ConfigMessage {
    fn from(config: &FeedConfig) -> Self {
        Self {
            region: config.region.clone(),
            load_all_vessels: config.load_all_vessels,
            page: config.page,
            page_size: config.page_size,
            track_port_proximity: config.track_port_proximity,
            proximity_radius: config.proximity_radius,
        }
    }
}

/// Annotation linking a vessel to the port it is near
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortConnection {
    pub vessel_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port_name: Option<String>,
    /// Distance to the port in nautical miles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Server → Client message kinds.
///
/// Vessel records stay as raw JSON here; they are validated one by one when
/// applied so a single bad record never discards the whole batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full picture of the fleet
    Vessels(BatchPayload),
    /// Same semantics as `Vessels`; older servers use this name
    VesselUpdate(BatchPayload),
    /// Soft error reported by the server; the channel stays open
    Error {
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

/// Entity batch carried by `vessels` / `vessel_update` messages
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchPayload {
    #[serde(default)]
    pub vessels: Option<Vec<Value>>,
    #[serde(default)]
    pub port_connections: Option<Vec<Value>>,
}

impl BatchPayload {
    pub fn records(&self) -> &[Value] {
        self.vessels.as_deref().unwrap_or(&[])
    }
}

/// Decode port connections, dropping entries that do not name a vessel.
pub fn parse_port_connections(values: &[Value]) -> Vec<PortConnection> {
    values
        .iter()
        .filter_map(|value| match serde_json::from_value(value.clone()) {
            Ok(connection) => Some(connection),
            Err(e) => {
                debug!(error = %e, "Dropping malformed port connection");
                None
            }
        })
        .collect()
}

/// Server → Client: full snapshot of the vessels matching a session's filter
#[derive(Debug, Clone, Serialize)]
pub struct VesselsMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub vessels: Vec<TrackedEntity>,
    #[serde(rename = "portConnections")]
    pub port_connections: Vec<PortConnection>,
}

impl VesselsMessage {
    pub fn new(vessels: Vec<TrackedEntity>, port_connections: Vec<PortConnection>) -> Self {
        Self {
            msg_type: "vessels".to_string(),
            vessels,
            port_connections,
        }
    }
}

/// Server → Client: error notice
#[derive(Debug, Clone, Serialize)]
pub struct ErrorNotice {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub message: String,
}

impl ErrorNotice {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            msg_type: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Pull endpoint query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullQuery {
    pub region: String,
    pub limit: u32,
}

impl From<&FeedConfig> for PullQuery {
    fn from(config: &FeedConfig) -> Self {
        Self {
            region: config.region.clone(),
            limit: config.page_size,
        }
    }
}

/// Pull endpoint response body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullResponse {
    #[serde(default)]
    pub vessels: Vec<Value>,
}
