//! SockJS websocket transport.
//!
//! The client dials `<endpoint>/<server-id>/<session-id>/websocket`. Every
//! server message starts with a type letter:
//!
//! - `o`: session open
//! - `h`: server heartbeat
//! - `a["..", ..]`: JSON array of application messages
//! - `c[code,"reason"]`: session closed
//!
//! Client messages are JSON arrays of strings.

use crate::error::{NotifyLinkError, Result};
use crate::models::TransportKind;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::Url;

const SESSION_ID_LEN: usize = 8;

/// A decoded SockJS server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SockJsFrame {
    Open,
    Heartbeat,
    Messages(Vec<String>),
    Close { code: u16, reason: String },
}

/// Decode one websocket text message sent by a SockJS server.
pub fn decode(text: &str) -> Result<SockJsFrame> {
    let mut chars = text.chars();
    let kind = chars.next().ok_or_else(|| {
        NotifyLinkError::ProtocolError("Empty SockJS frame".to_string())
    })?;
    let payload = chars.as_str();

    match kind {
        'o' => Ok(SockJsFrame::Open),
        'h' => Ok(SockJsFrame::Heartbeat),
        'a' => {
            let messages: Vec<String> = serde_json::from_str(payload).map_err(|e| {
                NotifyLinkError::ProtocolError(format!("Invalid SockJS message array: {}", e))
            })?;
            Ok(SockJsFrame::Messages(messages))
        },
        // A single message, sent by older servers.
        'm' => {
            let message: String = serde_json::from_str(payload).map_err(|e| {
                NotifyLinkError::ProtocolError(format!("Invalid SockJS message: {}", e))
            })?;
            Ok(SockJsFrame::Messages(vec![message]))
        },
        'c' => {
            let (code, reason): (u16, String) = serde_json::from_str(payload).map_err(|e| {
                NotifyLinkError::ProtocolError(format!("Invalid SockJS close frame: {}", e))
            })?;
            Ok(SockJsFrame::Close { code, reason })
        },
        other => Err(NotifyLinkError::ProtocolError(format!(
            "Unknown SockJS frame type '{}'",
            other
        ))),
    }
}

/// Encode one outbound message as a SockJS JSON array.
pub fn encode(message: &str) -> String {
    serde_json::Value::Array(vec![serde_json::Value::String(message.to_string())]).to_string()
}

/// Random 3-digit server id and 8-character session id.
pub fn session_path() -> String {
    let mut rng = rand::thread_rng();
    let server_id: u16 = rng.gen_range(0..1000);
    let session_id: String = (&mut rng)
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!("{:03}/{}", server_id, session_id)
}

/// Websocket URL for `endpoint_path` below `base_url`.
///
/// `http` maps to `ws` and `https` to `wss`. A path already present on the
/// base (a reverse-proxy prefix) is kept.
pub fn websocket_url(
    base_url: &str,
    endpoint_path: &str,
    transport: TransportKind,
) -> Result<String> {
    let mut url = Url::parse(base_url.trim()).map_err(|e| {
        NotifyLinkError::ConfigurationError(format!("Invalid base_url '{}': {}", base_url, e))
    })?;

    let ws_scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(NotifyLinkError::ConfigurationError(format!(
                "Unsupported base_url scheme '{}'; expected http(s) or ws(s)",
                other
            )));
        },
    };
    url.set_scheme(ws_scheme).map_err(|_| {
        NotifyLinkError::ConfigurationError("Failed to set WebSocket URL scheme".to_string())
    })?;

    let prefix = url.path().trim_end_matches('/').to_string();
    let endpoint = endpoint_path.trim_matches('/');
    let path = match transport {
        TransportKind::SockJs => format!("{}/{}/{}/websocket", prefix, endpoint, session_path()),
        TransportKind::WebSocket => format!("{}/{}/websocket", prefix, endpoint),
    };
    url.set_path(&path);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url.to_string())
}
