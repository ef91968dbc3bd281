use super::{Inbound, PushChannel, PushConnector};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(2);

/// WebSocket push connector
#[derive(Debug, Clone)]
pub struct WsConnector {
    connect_timeout: Duration,
}

impl WsConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl PushConnector for WsConnector {
    async fn connect(&self, url: &Url) -> Result<Box<dyn PushChannel>> {
        let (stream, response) = tokio::time::timeout(self.connect_timeout, connect_async(url.as_str()))
            .await
            .map_err(|_| anyhow!("timed out connecting to {} after {:?}", url, self.connect_timeout))?
            .with_context(|| format!("failed to connect to {}", url))?;

        debug!(url = %url, status = %response.status(), "Push channel handshake complete");
        Ok(Box::new(WsChannel { stream }))
    }
}

/// Open WebSocket push channel
pub struct WsChannel {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl PushChannel for WsChannel {
    async fn send(&mut self, text: String) -> Result<()> {
        self.stream
            .send(Message::Text(text))
            .await
            .context("failed to send on push channel")
    }

    async fn recv(&mut self) -> Result<Inbound> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Inbound::Text(text)),
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => return Ok(Inbound::Text(text)),
                    Err(_) => {
                        debug!("Ignoring non-UTF-8 binary frame");
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = frame
                        .map(|f| f.reason.to_string())
                        .filter(|r| !r.is_empty());
                    return Ok(Inbound::Closed { reason });
                }
                // Pongs are queued by tungstenite and flushed on the next read/write
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) | Some(Ok(Message::Frame(_))) => {}
                Some(Err(e)) => return Err(e).context("push channel receive failed"),
                None => return Ok(Inbound::Closed { reason: None }),
            }
        }
    }

    async fn close(&mut self) {
        match tokio::time::timeout(CLOSE_TIMEOUT, self.stream.close(None)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(error = %e, "Push channel close returned an error"),
            Err(_) => warn!("Timed out closing push channel"),
        }
    }
}
