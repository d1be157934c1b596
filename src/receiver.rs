//! Receiving end of bridge mode
//!
//! Accepts bridge connections and logs every decoded payload. Useful as a
//! stand-in for the downstream processor when testing a bridge.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::{self, DecodedPayload};
use crate::{RelayError, Result};

/// Bound receiver listener.
pub struct Receiver {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Receiver {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|source| RelayError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "Receiver listening");
        Ok(Self { listener, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn serve(self, cancel: CancellationToken) -> Result<()> {
        let router = Router::new().route("/", get(upgrade));
        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;
        info!(local_addr = %self.local_addr, "Receiver stopped");
        Ok(())
    }
}

async fn upgrade(ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(handle_socket)
}

async fn handle_socket(mut socket: WebSocket) {
    info!("Bridge connected");
    let mut received = 0u64;

    while let Some(message) = socket.recv().await {
        match message {
            Ok(Message::Text(text)) => {
                if inspect(&text).is_some() {
                    received += 1;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("Bridge socket error: {}", e);
                break;
            }
        }
    }

    info!(received, "Bridge disconnected");
}

/// Decode and log one payload. Invalid payloads are logged and dropped.
pub fn inspect(text: &str) -> Option<DecodedPayload> {
    match codec::decode(text) {
        Ok(payload) => {
            info!(kind = %payload.kind, fields = payload.fields.len(), "Received telemetry");
            debug!("Payload: {}", text);
            Some(payload)
        }
        Err(e) => {
            warn!("Invalid payload: {}", e);
            None
        }
    }
}
