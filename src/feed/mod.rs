//! Client side of the live vessel feed.

pub mod backoff;
pub mod controller;
pub mod endpoint;
pub mod metrics;
pub mod status;
mod worker;


pub use backoff::ReconnectPolicy;
pub use controller::LiveFeedController;
pub use endpoint::Endpoints;
pub use metrics::{FeedMetrics, MetricsSnapshot};
pub use status::{ConnectionState, FeedState, FeedStatus, FeedView};
