//! WebSocket endpoint for server broadcast mode

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::registry::{Session, SessionRegistry};
use crate::{RelayError, Result};

#[derive(Clone)]
struct ServerState {
    registry: Arc<SessionRegistry>,
    session_buffer: usize,
}

/// Bound WebSocket listener feeding a [`SessionRegistry`].
///
/// Each accepted socket becomes one session: it receives the connect
/// acknowledgement, then every broadcast until either side closes.
pub struct TelemetryServer {
    listener: TcpListener,
    router: Router,
    local_addr: SocketAddr,
    registry: Arc<SessionRegistry>,
}

impl TelemetryServer {
    /// Bind the listener. Failing to bind is a startup error.
    pub async fn bind(
        addr: SocketAddr,
        path: &str,
        session_buffer: usize,
        registry: Arc<SessionRegistry>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await.map_err(|source| RelayError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        let state = ServerState { registry: Arc::clone(&registry), session_buffer };
        let router = Router::new().route(path, get(upgrade)).with_state(state);

        info!(%local_addr, path, "Telemetry server listening");
        Ok(Self { listener, router, local_addr, registry })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `cancel` fires, then drop every session.
    pub async fn serve(self, cancel: CancellationToken) -> Result<()> {
        let Self { listener, router, local_addr, registry } = self;

        let sessions = Arc::clone(&registry);
        let shutdown = async move {
            cancel.cancelled().await;
            // Dropping the senders ends every socket task
            let closed = sessions.close_all();
            debug!(closed, "Closed subscriber sessions");
        };

        axum::serve(listener, router).with_graceful_shutdown(shutdown).await?;
        info!(%local_addr, remaining = registry.len(), "Telemetry server stopped");
        Ok(())
    }
}

async fn upgrade(ws: WebSocketUpgrade, State(state): State<ServerState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: ServerState) {
    let (session, mut outbound) = Session::channel(state.session_buffer);
    let id = match state.registry.register(session) {
        Ok(id) => id,
        Err(e) => {
            debug!("Failed to register subscriber: {}", e);
            return;
        }
    };

    loop {
        tokio::select! {
            next = outbound.recv() => match next {
                Some(payload) => {
                    if socket.send(Message::Text(payload.to_string())).await.is_err() {
                        debug!(%id, "Subscriber write failed");
                        break;
                    }
                }
                // Registry dropped the session
                None => break,
            },
            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(other)) => trace!(%id, "Ignoring subscriber message: {:?}", other),
                Some(Err(e)) => {
                    debug!(%id, "Subscriber socket error: {}", e);
                    break;
                }
            },
        }
    }

    state.registry.unregister(id);
    let _ = socket.send(Message::Close(None)).await;
}
