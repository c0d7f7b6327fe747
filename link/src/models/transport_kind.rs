use serde::{Deserialize, Serialize};

/// Transport used to carry the STOMP session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransportKind {
    /// SockJS websocket transport: `<endpoint>/<server>/<session>/websocket`
    /// with SockJS framing around every STOMP frame.
    #[default]
    #[serde(rename = "sockjs")]
    SockJs,

    /// Raw websocket at `<endpoint>/websocket`; STOMP frames are sent as
    /// plain text messages.
    #[serde(rename = "websocket", alias = "ws")]
    WebSocket,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportKind::SockJs => write!(f, "sockjs"),
            TransportKind::WebSocket => write!(f, "websocket"),
        }
    }
}
