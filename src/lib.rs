// Vessel records and field normalization
pub mod entity;

// Wire messages for the push channel and pull endpoint
pub mod protocol;

// Client-side snapshot store
pub mod snapshot;

// Live feed controller, worker and reconnect policy
pub mod feed;

// Push/pull transports (WebSocket and HTTP)
pub mod transport;

// Configuration loading
pub mod config;

pub mod error;

// Reference server: fleet state, port proximity and push sessions
pub mod fleet;
pub mod proximity;
pub mod session;

// HTTP and WebSocket APIs
pub mod api;

pub use config::{AppConfig, FeedConfig};
pub use error::{ConfigError, FeedError};
pub use feed::{ConnectionState, FeedStatus, FeedView, LiveFeedController, ReconnectPolicy};
pub use snapshot::SnapshotView;
