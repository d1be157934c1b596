//! WebSocket transport for the bridge connection

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::{Connector, Established, Link};
use crate::{RelayError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connects to a `ws://` or `wss://` endpoint.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait::async_trait]
impl Connector for WebSocketConnector {
    async fn connect(&self) -> Result<Established> {
        let request = self.url.as_str().into_client_request().map_err(|e| {
            RelayError::connection_failed_with_source(format!("invalid URL {}", self.url), Box::new(e))
        })?;

        let (stream, _response) = tokio_tungstenite::connect_async(request).await.map_err(|e| {
            RelayError::connection_failed_with_source(format!("handshake with {} failed", self.url), Box::new(e))
        })?;

        let (sink, stream) = stream.split();
        let closed = CancellationToken::new();
        tokio::spawn(watch_inbound(stream, closed.clone(), self.url.clone()));

        Ok(Established::new(Box::new(WebSocketLink { sink, closed: closed.clone() }), closed))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// Drains inbound frames and signals `closed` when the remote goes away.
///
/// The bridge only pushes, so inbound payloads are ignored.
async fn watch_inbound(mut stream: SplitStream<WsStream>, closed: CancellationToken, url: String) {
    loop {
        tokio::select! {
            _ = closed.cancelled() => return,
            msg = stream.next() => match msg {
                Some(Ok(Message::Close(frame))) => {
                    debug!(%url, "Remote closed connection: {:?}", frame);
                    break;
                }
                Some(Ok(other)) => {
                    trace!(%url, "Ignoring inbound message: {:?}", other);
                }
                Some(Err(e)) => {
                    debug!(%url, "Connection error: {}", e);
                    break;
                }
                None => {
                    debug!(%url, "Connection stream ended");
                    break;
                }
            }
        }
    }
    closed.cancel();
}

/// Write half of a bridge WebSocket.
pub struct WebSocketLink {
    sink: SplitSink<WsStream, Message>,
    closed: CancellationToken,
}

#[async_trait::async_trait]
impl Link for WebSocketLink {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        if self.closed.is_cancelled() {
            return Err(RelayError::send_failed("bridge", "connection closed"));
        }
        self.sink
            .send(Message::Text(text.to_string()))
            .await
            .map_err(|e| RelayError::send_failed("bridge", e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
        self.closed.cancel();
    }
}
