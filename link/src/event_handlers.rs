//! Callbacks through which the notification socket reports to the host.
//!
//! - [`on_message`](EventHandlers::on_message): a notification arrived on the subscription
//! - [`on_connect`](EventHandlers::on_connect): STOMP session established and subscribed
//! - [`on_disconnect`](EventHandlers::on_disconnect): the transport closed (may be followed by a reconnect)
//! - [`on_error`](EventHandlers::on_error): precondition failures and protocol `ERROR` frames
//! - [`on_receive`](EventHandlers::on_receive) / [`on_send`](EventHandlers::on_send): raw transport text, for debugging
//!
//! Every handler is optional; emitting to a missing handler does nothing.
//! Handlers run on the connection task and must not block.
//!
//! # Example
//!
//! ```rust
//! use notify_link::EventHandlers;
//!
//! let handlers = EventHandlers::new()
//!     .on_message(|payload, _frame| println!("notification: {}", payload))
//!     .on_disconnect(|reason| println!("socket closed: {}", reason))
//!     .on_error(|error| eprintln!("notification socket error: {}", error));
//! assert!(handlers.has_any());
//! ```

use crate::stomp::Frame;
use crate::subscription::SubscriptionHandle;
use std::fmt;
use std::sync::Arc;

/// Reason for a disconnect event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisconnectReason {
    /// Human-readable description of why the connection closed.
    pub message: String,
    /// WebSocket or SockJS close code, if available.
    pub code: Option<u16>,
}

impl DisconnectReason {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: u16) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.code {
            write!(f, "{} (code: {})", self.message, code)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

/// Failure class reported through `on_error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The socket could not be started (missing token, no runtime, bad URL).
    /// No connection was attempted.
    Precondition,
    /// The server sent a STOMP `ERROR` frame or an unparsable frame.
    Protocol,
    /// Reconnection gave up.
    Transport,
}

/// Error information passed to the `on_error` handler.
#[derive(Debug, Clone)]
pub struct ConnectionError {
    pub kind: ErrorKind,
    pub message: String,
    /// The `ERROR` frame, for protocol errors raised by the server.
    pub frame: Option<Frame>,
    /// Whether the connection may still recover on its own.
    pub recoverable: bool,
}

impl ConnectionError {
    pub fn precondition(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Precondition,
            message: message.into(),
            frame: None,
            recoverable: false,
        }
    }

    pub fn protocol(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Protocol,
            message: message.into(),
            frame: None,
            recoverable: true,
        }
    }

    /// A server `ERROR` frame; its `message` header becomes the message.
    pub fn error_frame(frame: Frame) -> Self {
        let message = frame
            .header("message")
            .map(str::to_string)
            .unwrap_or_else(|| frame.body_text().into_owned());
        Self {
            kind: ErrorKind::Protocol,
            message,
            frame: Some(frame),
            recoverable: true,
        }
    }

    pub fn transport(message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            kind: ErrorKind::Transport,
            message: message.into(),
            frame: None,
            recoverable,
        }
    }
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

pub type OnMessageCallback = Arc<dyn Fn(&str, &Frame) + Send + Sync>;

pub type OnConnectCallback = Arc<dyn Fn(SubscriptionHandle) + Send + Sync>;

pub type OnDisconnectCallback = Arc<dyn Fn(DisconnectReason) + Send + Sync>;

pub type OnErrorCallback = Arc<dyn Fn(ConnectionError) + Send + Sync>;

/// Debug hook receiving raw transport text.
pub type OnRawCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Optional socket callbacks.
#[derive(Clone, Default)]
pub struct EventHandlers {
    pub(crate) on_message: Option<OnMessageCallback>,
    pub(crate) on_connect: Option<OnConnectCallback>,
    pub(crate) on_disconnect: Option<OnDisconnectCallback>,
    pub(crate) on_error: Option<OnErrorCallback>,
    pub(crate) on_receive: Option<OnRawCallback>,
    pub(crate) on_send: Option<OnRawCallback>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_message", &self.on_message.is_some())
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_receive", &self.on_receive.is_some())
            .field("on_send", &self.on_send.is_some())
            .finish()
    }
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called for every message on the subscription with the raw body text
    /// and the full `MESSAGE` frame. The body is not parsed.
    pub fn on_message(mut self, f: impl Fn(&str, &Frame) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    /// Called after every successful (re)connect, once the subscription is
    /// in place.
    pub fn on_connect(mut self, f: impl Fn(SubscriptionHandle) + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Called whenever the transport closes, including closures that will be
    /// followed by an automatic reconnect. Not a terminal signal.
    pub fn on_disconnect(mut self, f: impl Fn(DisconnectReason) + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(ConnectionError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Debug hook: every raw text message received from the transport.
    pub fn on_receive(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_receive = Some(Arc::new(f));
        self
    }

    /// Debug hook: every raw text message sent to the transport.
    pub fn on_send(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_send = Some(Arc::new(f));
        self
    }

    /// Returns `true` if any handler is registered.
    pub fn has_any(&self) -> bool {
        self.on_message.is_some()
            || self.on_connect.is_some()
            || self.on_disconnect.is_some()
            || self.on_error.is_some()
            || self.on_receive.is_some()
            || self.on_send.is_some()
    }

    // ---------------------------------------------------------------
    // Internal dispatch helpers
    // ---------------------------------------------------------------

    pub(crate) fn emit_message(&self, payload: &str, frame: &Frame) {
        if let Some(cb) = &self.on_message {
            cb(payload, frame);
        }
    }

    pub(crate) fn emit_connect(&self, handle: SubscriptionHandle) {
        if let Some(cb) = &self.on_connect {
            cb(handle);
        }
    }

    pub(crate) fn emit_disconnect(&self, reason: DisconnectReason) {
        if let Some(cb) = &self.on_disconnect {
            cb(reason);
        }
    }

    pub(crate) fn emit_error(&self, error: ConnectionError) {
        if let Some(cb) = &self.on_error {
            cb(error);
        }
    }

    pub(crate) fn emit_receive(&self, raw: &str) {
        if let Some(cb) = &self.on_receive {
            cb(raw);
        }
    }

    pub(crate) fn emit_send(&self, raw: &str) {
        if let Some(cb) = &self.on_send {
            cb(raw);
        }
    }
}
