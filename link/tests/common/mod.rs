//! Shared helpers for the integration tests: logging setup and a small
//! in-process STOMP server speaking raw websocket or SockJS framing.

#![allow(dead_code)]

use futures_util::{SinkExt, StreamExt};
use notify_link::stomp::{Command, Frame, FrameParser, Parsed};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::WebSocketStream;

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(true)
        .try_init();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    Raw,
    SockJs,
}

/// How the server reacts to a client.
#[derive(Debug, Clone)]
pub struct ServerScript {
    pub framing: Framing,
    /// Answer `CONNECT` with an `ERROR` frame carrying this message.
    pub reject_connect: Option<String>,
    /// Bodies pushed as `MESSAGE` frames right after `SUBSCRIBE`.
    pub messages: Vec<String>,
    /// `ERROR` frame sent after the messages.
    pub error_after_subscribe: Option<String>,
    /// Drop the connection right after handling `SUBSCRIBE`.
    pub close_after_subscribe: bool,
    /// `heart-beat` header of the `CONNECTED` reply.
    pub heart_beat: String,
    /// Unchecked STOMP text sent right after `SUBSCRIBE`, before the messages.
    pub raw_after_subscribe: Vec<String>,
}

impl ServerScript {
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            reject_connect: None,
            messages: Vec::new(),
            error_after_subscribe: None,
            close_after_subscribe: false,
            heart_beat: "0,0".to_string(),
            raw_after_subscribe: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ServerEvent {
    Opened { conn: usize, path: String },
    Frame { conn: usize, frame: Frame },
    Heartbeat { conn: usize },
    Closed { conn: usize },
}

pub struct StompTestServer {
    pub base_url: String,
    events: mpsc::UnboundedReceiver<ServerEvent>,
}

impl StompTestServer {
    pub async fn start(script: ServerScript) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind test server");
        let addr = listener.local_addr().expect("local addr");
        let (tx, rx) = mpsc::unbounded_channel();
        let script = Arc::new(script);
        let counter = Arc::new(AtomicUsize::new(0));

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let conn = counter.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(conn, stream, script.clone(), tx.clone()));
            }
        });

        Self {
            base_url: format!("http://{}", addr),
            events: rx,
        }
    }

    /// Next server event; panics after [`EVENT_TIMEOUT`].
    pub async fn next_event(&mut self) -> ServerEvent {
        self.try_next_event(EVENT_TIMEOUT)
            .await
            .expect("timed out waiting for server event")
    }

    pub async fn try_next_event(&mut self, wait: Duration) -> Option<ServerEvent> {
        tokio::time::timeout(wait, self.events.recv()).await.ok().flatten()
    }

    /// Next frame received from a client, skipping open/close events.
    pub async fn next_frame(&mut self) -> (usize, Frame) {
        loop {
            if let ServerEvent::Frame { conn, frame } = self.next_event().await {
                return (conn, frame);
            }
        }
    }

    /// Next frame with `command`, skipping everything else.
    pub async fn expect_command(&mut self, command: Command) -> (usize, Frame) {
        loop {
            let (conn, frame) = self.next_frame().await;
            if frame.command == command {
                return (conn, frame);
            }
        }
    }
}

async fn send_frame(ws: &mut WebSocketStream<TcpStream>, framing: Framing, frame: &Frame) {
    send_text(ws, framing, frame.encode()).await;
}

async fn send_text(ws: &mut WebSocketStream<TcpStream>, framing: Framing, text: String) {
    let wire = match framing {
        Framing::Raw => text,
        Framing::SockJs => format!("a{}", serde_json::to_string(&vec![text]).unwrap()),
    };
    let _ = ws.send(Message::Text(wire.into())).await;
}

async fn serve(
    conn: usize,
    stream: TcpStream,
    script: Arc<ServerScript>,
    events: mpsc::UnboundedSender<ServerEvent>,
) {
    let mut path = String::new();
    let callback = |request: &Request, response: Response| {
        path = request.uri().path().to_string();
        Ok::<Response, ErrorResponse>(response)
    };
    let mut ws = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(_) => return,
    };
    let _ = events.send(ServerEvent::Opened { conn, path });

    if script.framing == Framing::SockJs {
        let _ = ws.send(Message::Text("o".into())).await;
    }

    let mut parser = FrameParser::new();
    let mut message_id = 0usize;

    'conn: while let Some(Ok(message)) = ws.next().await {
        let text = match message {
            Message::Text(text) => text.to_string(),
            Message::Close(_) => break,
            _ => continue,
        };
        let payloads = match script.framing {
            Framing::Raw => vec![text],
            Framing::SockJs => serde_json::from_str::<Vec<String>>(&text).unwrap_or_default(),
        };
        for payload in payloads {
            parser.push(payload.as_bytes());
        }

        while let Ok(Some(parsed)) = parser.next_event() {
            let frame = match parsed {
                Parsed::Frame(frame) => frame,
                Parsed::Heartbeat => {
                    let _ = events.send(ServerEvent::Heartbeat { conn });
                    continue;
                },
            };
            let _ = events.send(ServerEvent::Frame {
                conn,
                frame: frame.clone(),
            });

            match frame.command {
                Command::Connect => {
                    if let Some(reason) = &script.reject_connect {
                        let error =
                            Frame::new(Command::Error).with_header("message", reason.as_str());
                        send_frame(&mut ws, script.framing, &error).await;
                        let _ = ws.close(None).await;
                        break 'conn;
                    }
                    let connected = Frame::new(Command::Connected)
                        .with_header("version", "1.2")
                        .with_header("heart-beat", script.heart_beat.as_str());
                    send_frame(&mut ws, script.framing, &connected).await;
                },
                Command::Subscribe => {
                    let id = frame.header("id").unwrap_or_default().to_string();
                    let destination = frame.header("destination").unwrap_or_default().to_string();
                    for text in &script.raw_after_subscribe {
                        send_text(&mut ws, script.framing, text.clone()).await;
                    }
                    for body in &script.messages {
                        let message = Frame::new(Command::Message)
                            .with_header("subscription", id.as_str())
                            .with_header("destination", destination.as_str())
                            .with_header("message-id", message_id.to_string())
                            .with_header("content-type", "application/json")
                            .with_body(body.as_str());
                        message_id += 1;
                        send_frame(&mut ws, script.framing, &message).await;
                    }
                    if let Some(reason) = &script.error_after_subscribe {
                        let error = Frame::new(Command::Error)
                            .with_header("message", reason.as_str())
                            .with_body("details");
                        send_frame(&mut ws, script.framing, &error).await;
                    }
                    if script.close_after_subscribe {
                        let _ = ws.close(None).await;
                        break 'conn;
                    }
                },
                _ => {},
            }
        }
    }

    let _ = events.send(ServerEvent::Closed { conn });
}
