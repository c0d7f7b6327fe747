//! Error types for the notify-link client library.

use thiserror::Error;

/// Errors produced by the notification clients.
///
/// The REST side raises these directly. The socket side never raises; its
/// failures are carried to the host through
/// [`ConnectionError`](crate::event_handlers::ConnectionError) callbacks.
#[derive(Error, Debug, Clone)]
pub enum NotifyLinkError {
    /// The server answered with a status outside the success range.
    #[error("[HTTP {status}] {status_text} {body}")]
    HttpError {
        status: u16,
        status_text: String,
        /// Best-effort response body text; empty when it could not be read.
        body: String,
    },

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    #[error("WebSocket error: {0}")]
    WebSocketError(String),

    #[error("Protocol error: {0}")]
    ProtocolError(String),

    #[error("Timeout: {0}")]
    TimeoutError(String),
}

impl NotifyLinkError {
    /// HTTP status code for [`NotifyLinkError::HttpError`], `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for NotifyLinkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::TimeoutError(err.to_string())
        } else {
            Self::NetworkError(err.to_string())
        }
    }
}

impl From<serde_json::Error> for NotifyLinkError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Result type for notify-link operations.
pub type Result<T> = std::result::Result<T, NotifyLinkError>;
