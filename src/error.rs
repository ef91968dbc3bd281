use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Failures surfaced to feed consumers.
///
/// Nothing here is ever returned from a controller operation; these values
/// only appear inside [`crate::feed::FeedView`] and [`crate::feed::FeedStatus`]
/// so a consumer can show what went wrong while it keeps rendering the last
/// good snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum FeedError {
    /// The push channel failed to open or broke while open.
    #[error("push channel error: {0}")]
    Transport(String),

    /// The pull source could not be reached or returned garbage.
    #[error("pull source error: {0}")]
    Pull(String),

    /// The server sent an explicit error notice over an open channel.
    #[error("server reported: {0}")]
    Server(String),
}

/// Errors raised while loading configuration or building endpoints.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid origin '{0}': expected an http or https URL with a host")]
    InvalidOrigin(String),

    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}
