//! Outbound connection state

use std::fmt;

/// State of the resilient outbound connection.
///
/// Transitions:
/// `Disconnected -> Connecting -> Connected`,
/// `Connected -> Disconnected` on error or close,
/// `Disconnected -> Backoff -> Connecting` on a supervised retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Backoff,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Backoff => "backoff",
        };
        f.write_str(name)
    }
}
