use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::transport_kind::TransportKind;

/// Connection-level options for the notification socket.
///
/// These options control:
/// - Which transport carries the STOMP session
/// - Automatic reconnection (fixed delay, no backoff)
/// - STOMP heart-beating in both directions
/// - The endpoint and the destination subscribed to
///
/// # Example
///
/// ```rust
/// use notify_link::{ConnectionOptions, TransportKind};
///
/// let options = ConnectionOptions::default()
///     .with_transport(TransportKind::WebSocket)
///     .with_reconnect_delay_ms(1000)
///     .with_max_reconnect_attempts(Some(10));
/// assert_eq!(options.heartbeat_outgoing_ms, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    /// Reconnect automatically when the transport closes.
    /// Default: true
    #[serde(default = "default_auto_reconnect")]
    pub auto_reconnect: bool,

    /// Fixed delay between reconnection attempts in milliseconds.
    /// Default: 3000ms
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Maximum number of consecutive failed reconnection attempts.
    /// Default: None (retry forever)
    #[serde(default)]
    pub max_reconnect_attempts: Option<u32>,

    /// Interval at which the client offers to send heart-beats.
    /// Set to `0` to disable. Default: 10000ms
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_outgoing_ms: u64,

    /// Interval at which the client asks the server for heart-beats.
    /// Set to `0` to disable. Default: 10000ms
    #[serde(default = "default_heartbeat_ms")]
    pub heartbeat_incoming_ms: u64,

    /// Transport carrying the STOMP frames. Default: SockJS
    #[serde(default)]
    pub transport: TransportKind,

    /// Path of the real-time endpoint, relative to the API base.
    /// Default: `/notify-ws`
    #[serde(default = "default_endpoint_path")]
    pub endpoint_path: String,

    /// Destination subscribed to after every successful connect.
    /// Default: `/user/queue/notify`
    #[serde(default = "default_destination")]
    pub destination: String,

    /// Trace every inbound and outbound frame through `log::debug!`.
    /// Default: false
    #[serde(default)]
    pub debug: bool,
}

fn default_auto_reconnect() -> bool {
    true
}

fn default_reconnect_delay_ms() -> u64 {
    3000
}

fn default_heartbeat_ms() -> u64 {
    10_000
}

fn default_endpoint_path() -> String {
    "/notify-ws".to_string()
}

fn default_destination() -> String {
    "/user/queue/notify".to_string()
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            auto_reconnect: default_auto_reconnect(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_attempts: None,
            heartbeat_outgoing_ms: default_heartbeat_ms(),
            heartbeat_incoming_ms: default_heartbeat_ms(),
            transport: TransportKind::default(),
            endpoint_path: default_endpoint_path(),
            destination: default_destination(),
            debug: false,
        }
    }
}

impl ConnectionOptions {
    /// Create new connection options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether to automatically reconnect on connection loss
    pub fn with_auto_reconnect(mut self, enabled: bool) -> Self {
        self.auto_reconnect = enabled;
        self
    }

    /// Set the fixed delay between reconnection attempts (in milliseconds)
    pub fn with_reconnect_delay_ms(mut self, delay_ms: u64) -> Self {
        self.reconnect_delay_ms = delay_ms;
        self
    }

    /// Set the maximum number of reconnection attempts
    /// Pass None for infinite retries
    pub fn with_max_reconnect_attempts(mut self, max_attempts: Option<u32>) -> Self {
        self.max_reconnect_attempts = max_attempts;
        self
    }

    /// Set both heart-beat intervals (in milliseconds, `0` disables)
    pub fn with_heartbeat_ms(mut self, outgoing: u64, incoming: u64) -> Self {
        self.heartbeat_outgoing_ms = outgoing;
        self.heartbeat_incoming_ms = incoming;
        self
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_endpoint_path(mut self, path: impl Into<String>) -> Self {
        self.endpoint_path = path.into();
        self
    }

    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = destination.into();
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}
