pub mod env;
pub use env::{apply_env_overrides, apply_overrides};

use crate::error::ConfigError;
use crate::feed::ReconnectPolicy;
use crate::proximity::Port;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Complete vessel-feed configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub reconnect: ReconnectPolicy,
    #[serde(default)]
    pub server: ServerConfig,
}

/// What a controller asks the server for (argument to `start`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Region/scope filter
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_page")]
    pub page: u32,
    /// Page size ceiling, also used as the pull `limit`
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Ask for the whole dataset instead of one page
    #[serde(default)]
    pub load_all_vessels: bool,
    /// Ask the server to annotate vessels with their nearest port
    #[serde(default = "default_track_port_proximity")]
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

fn default_track_port_proximity() -> bool {
    true
}

fn default_proximity_radius() -> f64 {
    50.0
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            page: default_page(),
            page_size: default_page_size(),
            load_all_vessels: false,
            track_port_proximity: default_track_port_proximity(),
            proximity_radius: default_proximity_radius(),
        }
    }
}

impl FeedConfig {
    /// Config for one region with default paging.
    pub fn for_region(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Self::default()
        }
    }
}

/// Where the controller connects and how long it waits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Origin the endpoints are derived from (e.g. "https://app.example.com")
    #[serde(default = "default_origin")]
    pub origin: String,
    #[serde(default = "default_push_path")]
    pub push_path: String,
    #[serde(default = "default_pull_path")]
    pub pull_path: String,
    /// Explicit push URL, overrides origin + push_path
    #[serde(default)]
    pub push_url: Option<String>,
    /// Explicit pull URL, overrides origin + pull_path
    #[serde(default)]
    pub pull_url: Option<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_push_path() -> String {
    "/ws".to_string()
}

fn default_pull_path() -> String {
    "/api/vessels".to_string()
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_request_timeout_ms() -> u64 {
    15_000
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            origin: default_origin(),
            push_path: default_push_path(),
            pull_path: default_pull_path(),
            push_url: None,
            pull_url: None,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

/// Reference feed server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Periodic full-snapshot refresh per session (seconds)
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_seconds: u64,
    /// Minimum gap between change-driven pushes (milliseconds)
    #[serde(default = "default_min_push_interval")]
    pub min_push_interval_ms: u64,
    /// Default and maximum `limit` on the pull endpoint
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
    /// Optional JSON file (array of vessel records) loaded at startup
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
    #[serde(default)]
    pub ports: Vec<Port>,
}

fn default_bind() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_refresh_interval() -> u64 {
    30
}

fn default_min_push_interval() -> u64 {
    250
}

fn default_max_limit() -> u32 {
    10_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            refresh_interval_seconds: default_refresh_interval(),
            min_push_interval_ms: default_min_push_interval(),
            max_limit: default_max_limit(),
            seed_file: None,
            ports: Vec::new(),
        }
    }
}

/// Load configuration from TOML file
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config: AppConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Resolve the effective configuration: the TOML file at `path` if one is
/// given, defaults otherwise, then `VESSEL_FEED_*` overrides on top.
pub fn resolve_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    apply_env_overrides(&mut config)?;
    Ok(config)
}
