//! STOMP 1.2 frames: encoding, incremental parsing and heart-beat negotiation.
//!
//! A frame is `COMMAND EOL *(header EOL) EOL body NUL`. Bare EOLs between
//! frames are heart-beats. Header values are escaped in every frame except
//! `CONNECT` and `CONNECTED`.

use crate::error::{NotifyLinkError, Result};
use std::borrow::Cow;
use std::fmt;

/// STOMP protocol versions offered in `CONNECT`.
pub const ACCEPT_VERSION: &str = "1.2,1.1,1.0";

/// Upper bound for a single buffered frame.
const MAX_FRAME_BYTES: usize = 16 << 20;

/// STOMP frame commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Connect,
    Stomp,
    Connected,
    Send,
    Subscribe,
    Unsubscribe,
    Ack,
    Nack,
    Begin,
    Commit,
    Abort,
    Disconnect,
    Message,
    Receipt,
    Error,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Command::Connect => "CONNECT",
            Command::Stomp => "STOMP",
            Command::Connected => "CONNECTED",
            Command::Send => "SEND",
            Command::Subscribe => "SUBSCRIBE",
            Command::Unsubscribe => "UNSUBSCRIBE",
            Command::Ack => "ACK",
            Command::Nack => "NACK",
            Command::Begin => "BEGIN",
            Command::Commit => "COMMIT",
            Command::Abort => "ABORT",
            Command::Disconnect => "DISCONNECT",
            Command::Message => "MESSAGE",
            Command::Receipt => "RECEIPT",
            Command::Error => "ERROR",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let command = match raw {
            "CONNECT" => Command::Connect,
            "STOMP" => Command::Stomp,
            "CONNECTED" => Command::Connected,
            "SEND" => Command::Send,
            "SUBSCRIBE" => Command::Subscribe,
            "UNSUBSCRIBE" => Command::Unsubscribe,
            "ACK" => Command::Ack,
            "NACK" => Command::Nack,
            "BEGIN" => Command::Begin,
            "COMMIT" => Command::Commit,
            "ABORT" => Command::Abort,
            "DISCONNECT" => Command::Disconnect,
            "MESSAGE" => Command::Message,
            "RECEIPT" => Command::Receipt,
            "ERROR" => Command::Error,
            _ => return None,
        };
        Some(command)
    }

    fn escapes_headers(&self) -> bool {
        !matches!(self, Command::Connect | Command::Connected)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single STOMP frame.
///
/// Headers keep wire order; repeated headers are allowed and the first
/// occurrence wins on lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: Command,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Frame {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// `CONNECT` frame with the credential headers and heart-beat offer.
    pub fn connect(
        host: &str,
        credential_headers: Vec<(String, String)>,
        heartbeat_outgoing_ms: u64,
        heartbeat_incoming_ms: u64,
    ) -> Self {
        let mut frame = Frame::new(Command::Connect)
            .with_header("accept-version", ACCEPT_VERSION)
            .with_header(
                "heart-beat",
                format!("{},{}", heartbeat_outgoing_ms, heartbeat_incoming_ms),
            )
            .with_header("host", host);
        frame.headers.extend(credential_headers);
        frame
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Frame::new(Command::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
    }

    pub fn unsubscribe(id: &str) -> Self {
        Frame::new(Command::Unsubscribe).with_header("id", id)
    }

    pub fn disconnect() -> Self {
        Frame::new(Command::Disconnect)
    }

    /// First value of header `name`.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Body as text; invalid UTF-8 is replaced.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Serialize to wire text, NUL terminator included.
    ///
    /// A `content-length` header is added for non-empty bodies that do not
    /// carry one.
    pub fn encode(&self) -> String {
        let escape = self.command.escapes_headers();
        let mut out = String::with_capacity(64 + self.body.len());
        out.push_str(self.command.as_str());
        out.push('\n');
        for (name, value) in &self.headers {
            if escape {
                out.push_str(&escape_header(name));
                out.push(':');
                out.push_str(&escape_header(value));
            } else {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.header("content-length").is_none() {
            out.push_str(&format!("content-length:{}\n", self.body.len()));
        }
        out.push('\n');
        out.push_str(&self.body_text());
        out.push('\0');
        out
    }
}

/// Escape a header name or value (STOMP 1.2 §Value Encoding).
pub fn escape_header(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['\\', '\n', '\r', ':']) {
        return Cow::Borrowed(raw);
    }
    let mut out = String::with_capacity(raw.len() + 4);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Reverse of [`escape_header`]. Undefined escape sequences are an error.
pub fn unescape_header(raw: &str) -> Result<String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(NotifyLinkError::ProtocolError(format!(
                    "Invalid header escape sequence '\\{}'",
                    other.map(String::from).unwrap_or_default()
                )));
            },
        }
    }
    Ok(out)
}

/// Output of [`FrameParser::next_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// A bare EOL between frames.
    Heartbeat,
    Frame(Frame),
}

/// Incremental STOMP parser.
///
/// Transport messages may carry several frames or a fragment of one; feed
/// them in order with [`push`](Self::push) and drain with
/// [`next_event`](Self::next_event).
#[derive(Debug, Default)]
pub struct FrameParser {
    buf: Vec<u8>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Bytes buffered but not yet consumed.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }

    /// Next complete event, or `None` when more data is needed.
    ///
    /// A malformed frame clears the buffer and returns an error; parsing can
    /// continue with the next pushed data.
    pub fn next_event(&mut self) -> Result<Option<Parsed>> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        if self.buf[0] == b'\n' {
            self.buf.drain(..1);
            return Ok(Some(Parsed::Heartbeat));
        }
        if self.buf.starts_with(b"\r\n") {
            self.buf.drain(..2);
            return Ok(Some(Parsed::Heartbeat));
        }
        if self.buf == b"\r" {
            return Ok(None);
        }

        match self.parse_frame() {
            Ok(Some((frame, consumed))) => {
                self.buf.drain(..consumed);
                Ok(Some(Parsed::Frame(frame)))
            },
            Ok(None) => {
                if self.buf.len() > MAX_FRAME_BYTES {
                    self.buf.clear();
                    return Err(NotifyLinkError::ProtocolError(format!(
                        "Frame exceeds {} bytes",
                        MAX_FRAME_BYTES
                    )));
                }
                Ok(None)
            },
            Err(e) => {
                self.buf.clear();
                Err(e)
            },
        }
    }

    fn parse_frame(&self) -> Result<Option<(Frame, usize)>> {
        let buf = &self.buf;
        let mut pos = 0;
        let mut command: Option<Command> = None;
        let mut headers: Vec<(String, String)> = Vec::new();

        let body_start = loop {
            let Some(rel) = buf[pos..].iter().position(|b| *b == b'\n') else {
                return Ok(None);
            };
            let line_end = pos + rel;
            let mut line = &buf[pos..line_end];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            pos = line_end + 1;

            let line = std::str::from_utf8(line).map_err(|e| {
                NotifyLinkError::ProtocolError(format!("Frame header is not UTF-8: {}", e))
            })?;

            match command {
                None => {
                    command = Some(Command::parse(line).ok_or_else(|| {
                        NotifyLinkError::ProtocolError(format!("Unknown command '{}'", line))
                    })?);
                },
                Some(_) if line.is_empty() => break pos,
                Some(cmd) => {
                    let (name, value) = line.split_once(':').ok_or_else(|| {
                        NotifyLinkError::ProtocolError(format!("Malformed header line '{}'", line))
                    })?;
                    if cmd.escapes_headers() {
                        headers.push((unescape_header(name)?, unescape_header(value)?));
                    } else {
                        headers.push((name.to_string(), value.to_string()));
                    }
                },
            }
        };

        let command = command.ok_or_else(|| {
            NotifyLinkError::ProtocolError("Frame without command".to_string())
        })?;

        let content_length = headers
            .iter()
            .find(|(name, _)| name == "content-length")
            .map(|(_, value)| {
                value.trim().parse::<usize>().map_err(|_| {
                    NotifyLinkError::ProtocolError(format!("Invalid content-length '{}'", value))
                })
            })
            .transpose()?;

        let body_end = match content_length {
            Some(len) => {
                if len > MAX_FRAME_BYTES {
                    return Err(NotifyLinkError::ProtocolError(format!(
                        "Declared content-length {} exceeds {} bytes",
                        len, MAX_FRAME_BYTES
                    )));
                }
                let end = body_start.checked_add(len).ok_or_else(|| {
                    NotifyLinkError::ProtocolError(format!("content-length {} overflows", len))
                })?;
                if buf.len() <= end {
                    return Ok(None);
                }
                if buf[end] != 0 {
                    return Err(NotifyLinkError::ProtocolError(
                        "Frame body not terminated by NUL after content-length bytes".to_string(),
                    ));
                }
                end
            },
            None => match buf[body_start..].iter().position(|b| *b == 0) {
                Some(rel) => body_start + rel,
                None => return Ok(None),
            },
        };

        let frame = Frame {
            command,
            headers,
            body: buf[body_start..body_end].to_vec(),
        };
        Ok(Some((frame, body_end + 1)))
    }
}

/// Parse a `heart-beat` header value `"<cx>,<cy>"`.
pub fn parse_heart_beat(value: &str) -> Option<(u64, u64)> {
    let (first, second) = value.split_once(',')?;
    Some((first.trim().parse().ok()?, second.trim().parse().ok()?))
}

/// Negotiated heart-beat periods in milliseconds, `0` meaning disabled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartBeat {
    /// How often the client must send something.
    pub outgoing_ms: u64,
    /// How often the server has promised to send something.
    pub incoming_ms: u64,
}

impl HeartBeat {
    /// Combine the client offer with the server's `heart-beat` header.
    ///
    /// A missing or unparsable server header disables heart-beating.
    pub fn negotiate(client_out: u64, client_in: u64, server_header: Option<&str>) -> Self {
        let (server_out, server_in) = server_header.and_then(parse_heart_beat).unwrap_or((0, 0));
        let outgoing_ms = if client_out == 0 || server_in == 0 {
            0
        } else {
            client_out.max(server_in)
        };
        let incoming_ms = if client_in == 0 || server_out == 0 {
            0
        } else {
            client_in.max(server_out)
        };
        Self {
            outgoing_ms,
            incoming_ms,
        }
    }
}
