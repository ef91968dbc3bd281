//! Seams between the feed controller and the network.
//!
//! The controller only sees these traits; production code plugs in
//! [`ws::WsConnector`] and [`http::HttpPullSource`], tests plug in fakes.

use crate::protocol::{PullQuery, PullResponse};
use anyhow::Result;
use async_trait::async_trait;
use url::Url;

pub mod http;
pub mod ws;

pub use http::HttpPullSource;
pub use ws::{WsChannel, WsConnector};

/// One inbound event on an open push channel
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Text(String),
    /// The peer closed the channel (or the stream ended)
    Closed { reason: Option<String> },
}

/// Opens push channels
#[async_trait]
pub trait PushConnector: Send + Sync {
    async fn connect(&self, url: &Url) -> Result<Box<dyn PushChannel>>;
}

/// An open, bidirectional message channel
#[async_trait]
pub trait PushChannel: Send {
    async fn send(&mut self, text: String) -> Result<()>;

    /// Next inbound event. An `Err` means the transport broke.
    async fn recv(&mut self) -> Result<Inbound>;

    /// Close the channel. Never fails; errors are logged.
    async fn close(&mut self);
}

/// Request/response source returning the same entity set as the push channel
#[async_trait]
pub trait PullSource: Send + Sync {
    async fn fetch(&self, query: &PullQuery) -> Result<PullResponse>;
}
