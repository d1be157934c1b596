//! Relay configuration.
//!
//! Every setting has a default, so an empty or missing YAML file yields a
//! working configuration:
//!
//! ```yaml
//! queue_capacity: 512
//! dispatch_interval_ms: 100
//! forward:
//!   physics: true
//!   graphics: true
//!   static_info: true
//! server:
//!   bind: 127.0.0.1:8081
//!   path: /telemetry
//!   session_buffer: 256
//! bridge:
//!   url: ws://localhost:8765
//!   backoff_ms: 1000
//!   connect_timeout_ms: 2000
//!   send_timeout_ms: 2000
//! receiver:
//!   bind: 127.0.0.1:8765
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::SnapshotKind;
use crate::{RelayError, Result};

/// Top-level relay configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Handoff queue capacity; the oldest snapshot is evicted beyond this
    pub queue_capacity: usize,
    /// Dispatcher period in milliseconds
    pub dispatch_interval_ms: u64,
    pub forward: ForwardPolicy,
    pub server: ServerConfig,
    pub bridge: BridgeConfig,
    pub receiver: ReceiverConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 512,
            dispatch_interval_ms: 100,
            forward: ForwardPolicy::default(),
            server: ServerConfig::default(),
            bridge: BridgeConfig::default(),
            receiver: ReceiverConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Load and validate a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text).map_err(|e| match e {
            RelayError::Config { details, .. } => RelayError::config(path.display().to_string(), details),
            other => other,
        })
    }

    /// Parse and validate YAML text. Empty text yields the defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let config = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml_ng::from_str(text).map_err(|e| RelayError::config("yaml", e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(RelayError::config("queue_capacity", "must be greater than 0"));
        }
        if self.dispatch_interval_ms == 0 {
            return Err(RelayError::config("dispatch_interval_ms", "must be greater than 0"));
        }
        if !self.server.path.starts_with('/') {
            return Err(RelayError::config("server.path", "must start with '/'"));
        }
        if self.server.session_buffer == 0 {
            return Err(RelayError::config("server.session_buffer", "must be greater than 0"));
        }
        if !(self.bridge.url.starts_with("ws://") || self.bridge.url.starts_with("wss://")) {
            return Err(RelayError::config("bridge.url", "must use the ws:// or wss:// scheme"));
        }
        if self.bridge.backoff_ms == 0 {
            return Err(RelayError::config("bridge.backoff_ms", "must be greater than 0"));
        }
        if self.bridge.connect_timeout_ms == 0 || self.bridge.send_timeout_ms == 0 {
            return Err(RelayError::config("bridge", "timeouts must be greater than 0"));
        }
        Ok(())
    }

    pub fn dispatch_interval(&self) -> Duration {
        Duration::from_millis(self.dispatch_interval_ms)
    }
}

/// Which snapshot kinds the dispatcher forwards over the wire.
///
/// Kinds switched off are still drained from the queue, then dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ForwardPolicy {
    pub physics: bool,
    pub graphics: bool,
    pub static_info: bool,
}

impl Default for ForwardPolicy {
    fn default() -> Self {
        Self::all()
    }
}

impl ForwardPolicy {
    /// Forward every kind.
    pub const fn all() -> Self {
        Self { physics: true, graphics: true, static_info: true }
    }

    /// Forward physics only.
    pub const fn physics_only() -> Self {
        Self { physics: true, graphics: false, static_info: false }
    }

    pub fn forwards(&self, kind: SnapshotKind) -> bool {
        match kind {
            SnapshotKind::Physics => self.physics,
            SnapshotKind::Graphics => self.graphics,
            SnapshotKind::StaticInfo => self.static_info,
        }
    }
}

/// Broadcast server settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// Path of the streaming endpoint
    pub path: String,
    /// Messages buffered per subscriber before it starts missing broadcasts
    pub session_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8081)),
            path: "/telemetry".to_string(),
            session_buffer: 256,
        }
    }
}

/// Bridge client settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub url: String,
    /// Fixed delay between supervised reconnect attempts
    pub backoff_ms: u64,
    pub connect_timeout_ms: u64,
    pub send_timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8765".to_string(),
            backoff_ms: 1000,
            connect_timeout_ms: 2000,
            send_timeout_ms: 2000,
        }
    }
}

impl BridgeConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

/// Receiver (sink) settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReceiverConfig {
    pub bind: SocketAddr,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self { bind: SocketAddr::from(([127, 0, 0, 1], 8765)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = RelayConfig::from_yaml("").unwrap();
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.dispatch_interval(), Duration::from_millis(100));
        assert_eq!(config.bridge.backoff(), Duration::from_secs(1));
        assert_eq!(config.server.path, "/telemetry");
    }

    #[test]
    fn partial_yaml_overrides_selected_values() {
        let yaml = "queue_capacity: 64\nforward:\n  graphics: false\nserver:\n  bind: 0.0.0.0:9000\n";
        let config = RelayConfig::from_yaml(yaml).unwrap();

        assert_eq!(config.queue_capacity, 64);
        assert!(config.forward.forwards(SnapshotKind::Physics));
        assert!(!config.forward.forwards(SnapshotKind::Graphics));
        assert!(config.forward.forwards(SnapshotKind::StaticInfo));
        assert_eq!(config.server.bind.port(), 9000);
        assert_eq!(config.server.path, "/telemetry");
    }

    #[test]
    fn invalid_values_are_rejected() {
        for yaml in [
            "queue_capacity: 0",
            "dispatch_interval_ms: 0",
            "server:\n  path: telemetry",
            "bridge:\n  url: http://localhost:8765",
            "bridge:\n  backoff_ms: 0",
            "unknown_key: 1",
        ] {
            let err = RelayConfig::from_yaml(yaml).unwrap_err();
            assert!(matches!(err, RelayError::Config { .. }), "{yaml} -> {err}");
        }
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RelayConfig::load("/nonexistent/relay.yaml").unwrap_err();
        assert!(matches!(err, RelayError::Io(_)));
    }
}
