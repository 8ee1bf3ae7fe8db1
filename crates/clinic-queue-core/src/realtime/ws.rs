//! Websocket transport over tokio-tungstenite.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use super::{ChannelError, ChannelResult, Link, Transport};

/// Connects to the backend's socket.io endpoint using the websocket transport.
#[derive(Debug, Clone)]
pub struct WsTransport {
    url: Url,
}

impl WsTransport {
    /// Derive the socket URL from the REST base (`http` → `ws`, `https` → `wss`).
    pub fn new(api_base: &Url) -> ChannelResult<Self> {
        let mut url = api_base
            .join("socket.io/")
            .map_err(|e| ChannelError::Socket(format!("Bad socket URL: {}", e)))?;

        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            _ => "ws",
        };
        url.set_scheme(scheme)
            .map_err(|_| ChannelError::Socket(format!("Cannot use scheme {}", scheme)))?;
        url.set_query(Some("EIO=4&transport=websocket"));

        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn connect(&self) -> ChannelResult<Box<dyn Link>> {
        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::Socket(e.to_string()))?;
        tracing::debug!(url = %self.url, "Websocket connected");
        Ok(Box::new(WsLink { stream }))
    }
}

struct WsLink {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Link for WsLink {
    async fn send(&mut self, frame: String) -> ChannelResult<()> {
        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(|e| ChannelError::Socket(e.to_string()))
    }

    async fn recv(&mut self) -> Option<ChannelResult<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(e) => return Some(Err(ChannelError::Socket(e.to_string()))),
            }
        }
    }
}
