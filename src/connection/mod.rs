//! Outbound connection for bridge mode.
//!
//! [`ResilientConnection`] owns one link to a fixed endpoint and keeps it
//! alive: unsolicited closes move it to `Disconnected`, a supervisor task
//! waits a fixed backoff and reconnects, and `send` retries inline when the
//! link is down. Transports plug in through [`Connector`] and [`Link`].

use tokio_util::sync::CancellationToken;

use crate::Result;

mod resilient;
mod websocket;

#[cfg(test)]
mod tests;

pub use resilient::{ReconnectPolicy, ResilientConnection};
pub use websocket::{WebSocketConnector, WebSocketLink};

/// Write side of an established transport link.
#[async_trait::async_trait]
pub trait Link: Send + 'static {
    /// Send one text message.
    async fn send_text(&mut self, text: &str) -> Result<()>;

    /// Close the link, best effort.
    async fn close(&mut self);
}

/// A freshly established link plus its close signal.
///
/// `closed` is cancelled by the transport when the remote closes or errors,
/// and by the connection itself when a send fails.
pub struct Established {
    pub link: Box<dyn Link>,
    pub closed: CancellationToken,
}

impl Established {
    pub fn new(link: Box<dyn Link>, closed: CancellationToken) -> Self {
        Self { link, closed }
    }
}

/// Opens links to a fixed remote endpoint.
#[async_trait::async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Attempt one connection.
    async fn connect(&self) -> Result<Established>;

    /// Endpoint label used in logs and errors.
    fn endpoint(&self) -> &str;
}
