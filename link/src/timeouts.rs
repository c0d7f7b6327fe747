//! Timeout configuration for notify-link operations.

use std::time::Duration;

/// Timeout configuration for REST calls and socket sessions.
///
/// # Examples
///
/// ```rust
/// use notify_link::NotifyLinkTimeouts;
/// use std::time::Duration;
///
/// let timeouts = NotifyLinkTimeouts::builder()
///     .connection_timeout(Duration::from_secs(20))
///     .receive_timeout_secs(60)
///     .build();
///
/// let local = NotifyLinkTimeouts::fast();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyLinkTimeouts {
    /// Timeout for opening a connection (TCP + TLS + websocket upgrade).
    /// Default: 10 seconds
    pub connection_timeout: Duration,

    /// Timeout for a whole HTTP request, response body included.
    /// Default: 30 seconds
    pub receive_timeout: Duration,

    /// Timeout for the STOMP `CONNECTED` reply after `CONNECT` is sent.
    /// Default: 10 seconds
    pub connect_ack_timeout: Duration,
}

impl Default for NotifyLinkTimeouts {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(10),
            receive_timeout: Duration::from_secs(30),
            connect_ack_timeout: Duration::from_secs(10),
        }
    }
}

impl NotifyLinkTimeouts {
    /// Create a new builder for custom timeout configuration.
    pub fn builder() -> NotifyLinkTimeoutsBuilder {
        NotifyLinkTimeoutsBuilder::new()
    }

    /// Short timeouts for localhost servers.
    pub fn fast() -> Self {
        Self {
            connection_timeout: Duration::from_secs(2),
            receive_timeout: Duration::from_secs(5),
            connect_ack_timeout: Duration::from_secs(2),
        }
    }

    /// Long timeouts for high-latency networks.
    pub fn relaxed() -> Self {
        Self {
            connection_timeout: Duration::from_secs(30),
            receive_timeout: Duration::from_secs(120),
            connect_ack_timeout: Duration::from_secs(30),
        }
    }

    /// Check if a duration represents "no timeout" (zero or very large).
    pub fn is_no_timeout(duration: Duration) -> bool {
        duration.is_zero() || duration > Duration::from_secs(86400 * 365)
    }
}

/// Builder for [`NotifyLinkTimeouts`].
#[derive(Debug, Clone)]
pub struct NotifyLinkTimeoutsBuilder {
    timeouts: NotifyLinkTimeouts,
}

impl NotifyLinkTimeoutsBuilder {
    fn new() -> Self {
        Self {
            timeouts: NotifyLinkTimeouts::default(),
        }
    }

    /// Set the connection timeout.
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connection_timeout = timeout;
        self
    }

    /// Set the connection timeout in seconds.
    pub fn connection_timeout_secs(self, secs: u64) -> Self {
        self.connection_timeout(Duration::from_secs(secs))
    }

    /// Set the HTTP request timeout.
    pub fn receive_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.receive_timeout = timeout;
        self
    }

    /// Set the HTTP request timeout in seconds.
    pub fn receive_timeout_secs(self, secs: u64) -> Self {
        self.receive_timeout(Duration::from_secs(secs))
    }

    /// Set how long to wait for the STOMP `CONNECTED` frame.
    pub fn connect_ack_timeout(mut self, timeout: Duration) -> Self {
        self.timeouts.connect_ack_timeout = timeout;
        self
    }

    /// Build the timeout configuration.
    pub fn build(self) -> NotifyLinkTimeouts {
        self.timeouts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timeouts() {
        let timeouts = NotifyLinkTimeouts::default();
        assert_eq!(timeouts.connection_timeout, Duration::from_secs(10));
        assert_eq!(timeouts.receive_timeout, Duration::from_secs(30));
        assert_eq!(timeouts.connect_ack_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_builder() {
        let timeouts = NotifyLinkTimeouts::builder()
            .connection_timeout_secs(60)
            .receive_timeout_secs(120)
            .connect_ack_timeout(Duration::from_millis(500))
            .build();

        assert_eq!(timeouts.connection_timeout, Duration::from_secs(60));
        assert_eq!(timeouts.receive_timeout, Duration::from_secs(120));
        assert_eq!(timeouts.connect_ack_timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_presets_are_ordered() {
        assert!(NotifyLinkTimeouts::fast().connection_timeout <= Duration::from_secs(5));
        assert!(NotifyLinkTimeouts::relaxed().receive_timeout >= Duration::from_secs(60));
    }

    #[test]
    fn test_is_no_timeout() {
        assert!(NotifyLinkTimeouts::is_no_timeout(Duration::ZERO));
        assert!(!NotifyLinkTimeouts::is_no_timeout(Duration::from_secs(1)));
    }
}
