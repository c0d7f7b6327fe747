//! Notification socket: one STOMP subscription over a websocket, kept alive
//! across transport failures.
//!
//! [`connect`] validates its input synchronously and hands the rest to a
//! background task which:
//!
//! - dials the endpoint (SockJS websocket transport or a raw websocket)
//! - sends `CONNECT` with the bearer token and waits for `CONNECTED`
//! - subscribes to the user queue and reports the handle through `on_connect`
//! - forwards every `MESSAGE` on that subscription to `on_message`
//! - keeps STOMP heart-beats flowing and closes a silent connection
//! - reconnects after a fixed delay whenever the transport closes
//!
//! Nothing here returns an error to the caller; failures surface through
//! [`EventHandlers`].

use crate::{
    auth::AuthProvider,
    error::{NotifyLinkError, Result},
    event_handlers::{ConnectionError, DisconnectReason, EventHandlers},
    models::{ConnectionOptions, TransportKind},
    sockjs::{self, SockJsFrame},
    stomp::{Command, Frame, FrameParser, HeartBeat, Parsed},
    subscription::{Disposer, NotificationSocket, SocketCmd, SocketShared, SubscriptionHandle},
    timeouts::NotifyLinkTimeouts,
};
use futures_util::{SinkExt, StreamExt};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant as TokioInstant;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{error::Error as WsError, protocol::Message},
    MaybeTlsStream,
};

type WebSocketStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Far enough ahead to never fire; stays clear of `Instant` overflow.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 3600);

/// Missed incoming heart-beat periods tolerated before closing.
const INCOMING_TOLERANCE: u32 = 2;

/// Everything needed to open a notification socket.
#[derive(Debug, Clone)]
pub struct SocketConfig {
    /// REST base address; the websocket URL is derived from it.
    pub base_url: String,
    /// Bearer token. Blank tokens are rejected before any network activity.
    pub token: String,
    pub handlers: EventHandlers,
    pub options: ConnectionOptions,
    pub timeouts: NotifyLinkTimeouts,
}

impl SocketConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            handlers: EventHandlers::default(),
            options: ConnectionOptions::default(),
            timeouts: NotifyLinkTimeouts::default(),
        }
    }

    pub fn with_handlers(mut self, handlers: EventHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_timeouts(mut self, timeouts: NotifyLinkTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }
}

/// Open a notification socket and return its [`Disposer`].
///
/// Returns immediately. A blank token, an unusable base URL, or a call
/// outside a Tokio runtime reports one `on_error` and yields a no-op
/// disposer without touching the network.
pub fn connect(config: SocketConfig) -> Disposer {
    let SocketConfig {
        base_url,
        token,
        handlers,
        options,
        timeouts,
    } = config;

    if token.trim().is_empty() {
        log::warn!("[notify-link] No access token; notification socket not started");
        let error = NotifyLinkError::AuthenticationError(
            "No access token: cannot open the notification socket".to_string(),
        );
        handlers.emit_error(ConnectionError::precondition(error.to_string()));
        return Disposer::noop();
    }

    if let Err(e) = sockjs::websocket_url(&base_url, &options.endpoint_path, options.transport) {
        log::warn!("[notify-link] {}", e);
        handlers.emit_error(ConnectionError::precondition(e.to_string()));
        return Disposer::noop();
    }

    let runtime = match tokio::runtime::Handle::try_current() {
        Ok(handle) => handle,
        Err(_) => {
            handlers.emit_error(ConnectionError::precondition(
                "No Tokio runtime available to drive the notification socket",
            ));
            return Disposer::noop();
        },
    };

    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
    let shared = Arc::new(SocketShared::new(cmd_tx));
    let task = ConnectionTask {
        base_url,
        auth: AuthProvider::from_token(&token),
        handlers,
        options,
        timeouts,
        shared: shared.clone(),
        next_subscription: 0,
    };
    runtime.spawn(task.run(cmd_rx));

    Disposer::new(NotificationSocket::new(shared))
}

/// What the transport produced next.
enum Inbound {
    /// SockJS session opened.
    Open,
    /// A heart-beat or transport-level keepalive.
    Activity,
    Frame(Frame),
    Malformed(NotifyLinkError),
    Closed(DisconnectReason),
}

/// How a connected session ended.
enum SessionEnd {
    Shutdown,
    Lost(DisconnectReason),
}

/// STOMP frames over one websocket, with optional SockJS framing.
struct StompTransport {
    ws: WebSocketStream,
    kind: TransportKind,
    parser: FrameParser,
    handlers: EventHandlers,
    debug: bool,
    last_inbound: TokioInstant,
}

impl StompTransport {
    fn new(ws: WebSocketStream, kind: TransportKind, handlers: EventHandlers, debug: bool) -> Self {
        Self {
            ws,
            kind,
            parser: FrameParser::new(),
            handlers,
            debug,
            last_inbound: TokioInstant::now(),
        }
    }

    async fn send_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send_text(frame.encode()).await
    }

    /// A bare EOL, the STOMP heart-beat.
    async fn send_heartbeat(&mut self) -> Result<()> {
        self.send_text("\n".to_string()).await
    }

    async fn send_text(&mut self, stomp: String) -> Result<()> {
        let wire = match self.kind {
            TransportKind::SockJs => sockjs::encode(&stomp),
            TransportKind::WebSocket => stomp,
        };
        if self.debug {
            log::debug!("[notify-link] >>> {:?}", wire);
        }
        self.handlers.emit_send(&wire);
        self.ws
            .send(Message::Text(wire.into()))
            .await
            .map_err(|e| NotifyLinkError::WebSocketError(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }

    /// Next event from the transport. Cancel-safe: partially received
    /// frames stay buffered in the parser.
    async fn next_inbound(&mut self) -> Inbound {
        loop {
            match self.parser.next_event() {
                Ok(Some(Parsed::Frame(frame))) => return Inbound::Frame(frame),
                Ok(Some(Parsed::Heartbeat)) => return Inbound::Activity,
                Ok(None) => {},
                Err(e) => return Inbound::Malformed(e),
            }

            let message = match self.ws.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => {
                    let reason = DisconnectReason::new(format!("WebSocket error: {}", e));
                    return Inbound::Closed(reason);
                },
                None => return Inbound::Closed(DisconnectReason::new("WebSocket stream ended")),
            };
            self.last_inbound = TokioInstant::now();

            match message {
                Message::Text(text) => {
                    if self.debug {
                        log::debug!("[notify-link] <<< {:?}", text.as_str());
                    }
                    self.handlers.emit_receive(&text);
                    if let Some(event) = self.accept_text(&text) {
                        return event;
                    }
                },
                Message::Binary(data) => match self.kind {
                    TransportKind::WebSocket => self.parser.push(&data),
                    TransportKind::SockJs => {
                        log::debug!("[notify-link] Ignoring binary message on SockJS transport");
                    },
                },
                Message::Ping(payload) => {
                    let _ = self.ws.send(Message::Pong(payload)).await;
                    return Inbound::Activity;
                },
                Message::Pong(_) => return Inbound::Activity,
                Message::Close(frame) => {
                    let reason = match frame {
                        Some(f) => DisconnectReason::with_code(f.reason.to_string(), f.code.into()),
                        None => DisconnectReason::new("Server closed connection"),
                    };
                    return Inbound::Closed(reason);
                },
                Message::Frame(_) => {},
            }
        }
    }

    /// Feed one text message; returns an event when the message is not
    /// STOMP data.
    fn accept_text(&mut self, text: &str) -> Option<Inbound> {
        match self.kind {
            TransportKind::WebSocket => {
                self.parser.push(text.as_bytes());
                None
            },
            TransportKind::SockJs => match sockjs::decode(text) {
                Ok(SockJsFrame::Open) => Some(Inbound::Open),
                Ok(SockJsFrame::Heartbeat) => Some(Inbound::Activity),
                Ok(SockJsFrame::Messages(messages)) => {
                    for message in &messages {
                        self.parser.push(message.as_bytes());
                    }
                    None
                },
                Ok(SockJsFrame::Close { code, reason }) => {
                    Some(Inbound::Closed(DisconnectReason::with_code(reason, code)))
                },
                Err(e) => Some(Inbound::Malformed(e)),
            },
        }
    }
}

fn period(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

struct ConnectionTask {
    base_url: String,
    auth: AuthProvider,
    handlers: EventHandlers,
    options: ConnectionOptions,
    timeouts: NotifyLinkTimeouts,
    shared: Arc<SocketShared>,
    next_subscription: u64,
}

impl ConnectionTask {
    /// Connect, serve, and reconnect until deactivated or out of attempts.
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<SocketCmd>) {
        let mut reconnect_attempts: u32 = 0;

        loop {
            let outcome = {
                let establish = self.establish();
                tokio::pin!(establish);
                loop {
                    tokio::select! {
                        result = &mut establish => break Some(result),
                        cmd = cmd_rx.recv() => match cmd {
                            Some(SocketCmd::Unsubscribe { id }) => {
                                log::debug!(
                                    "[notify-link] Ignoring unsubscribe for '{}' while connecting",
                                    id
                                );
                            },
                            Some(SocketCmd::Shutdown) | None => break None,
                        },
                    }
                }
            };

            let reason = match outcome {
                None => {
                    log::info!("[notify-link] Deactivated while connecting");
                    self.handlers
                        .emit_disconnect(DisconnectReason::new("Client deactivated"));
                    return;
                },
                Some(Ok((transport, heartbeat))) => {
                    reconnect_attempts = 0;
                    match self.run_session(transport, heartbeat, &mut cmd_rx).await {
                        SessionEnd::Shutdown => {
                            log::info!("[notify-link] Notification socket deactivated");
                            self.handlers
                                .emit_disconnect(DisconnectReason::new("Client deactivated"));
                            return;
                        },
                        SessionEnd::Lost(reason) => reason,
                    }
                },
                Some(Err(reason)) => reason,
            };

            log::warn!("[notify-link] Notification socket closed: {}", reason);
            self.handlers.emit_disconnect(reason);

            if !self.options.auto_reconnect {
                log::info!("[notify-link] Auto-reconnect disabled; socket stays closed");
                return;
            }
            if let Some(max) = self.options.max_reconnect_attempts {
                if reconnect_attempts >= max {
                    log::warn!("[notify-link] Max reconnection attempts ({}) reached", max);
                    self.handlers.emit_error(ConnectionError::transport(
                        format!("Max reconnection attempts ({}) reached", max),
                        false,
                    ));
                    return;
                }
            }
            reconnect_attempts += 1;

            let delay = self.options.reconnect_delay();
            log::info!(
                "[notify-link] Reconnecting in {:?} (attempt {})",
                delay,
                reconnect_attempts
            );
            let sleep = tokio::time::sleep(delay);
            tokio::pin!(sleep);
            loop {
                tokio::select! {
                    _ = &mut sleep => break,
                    cmd = cmd_rx.recv() => match cmd {
                        Some(SocketCmd::Unsubscribe { id }) => {
                            log::debug!(
                                "[notify-link] Ignoring unsubscribe for '{}' while disconnected",
                                id
                            );
                        },
                        Some(SocketCmd::Shutdown) | None => {
                            log::info!("[notify-link] Deactivated while waiting to reconnect");
                            return;
                        },
                    },
                }
            }
        }
    }

    /// Open the transport and complete the STOMP handshake.
    async fn establish(
        &self,
    ) -> std::result::Result<(StompTransport, HeartBeat), DisconnectReason> {
        let url = sockjs::websocket_url(
            &self.base_url,
            &self.options.endpoint_path,
            self.options.transport,
        )
        .map_err(|e| DisconnectReason::new(e.to_string()))?;
        let host = reqwest::Url::parse(&url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_default();
        log::info!("[notify-link] Connecting to {}", url);

        let connecting = connect_async(url.as_str());
        let result = if NotifyLinkTimeouts::is_no_timeout(self.timeouts.connection_timeout) {
            connecting.await
        } else {
            match tokio::time::timeout(self.timeouts.connection_timeout, connecting).await {
                Ok(result) => result,
                Err(_) => {
                    return Err(DisconnectReason::new(format!(
                        "Connection timeout ({:?})",
                        self.timeouts.connection_timeout
                    )));
                },
            }
        };

        let ws = match result {
            Ok((stream, _response)) => stream,
            Err(WsError::Http(response)) => {
                return Err(DisconnectReason::new(format!(
                    "WebSocket handshake rejected: HTTP {}",
                    response.status()
                )));
            },
            Err(e) => return Err(DisconnectReason::new(format!("Connection failed: {}", e))),
        };

        let mut transport = StompTransport::new(
            ws,
            self.options.transport,
            self.handlers.clone(),
            self.options.debug,
        );

        let ack_timeout = self.timeouts.connect_ack_timeout;
        let handshake = self.handshake(&mut transport, &host);
        let negotiated = if NotifyLinkTimeouts::is_no_timeout(ack_timeout) {
            handshake.await
        } else {
            match tokio::time::timeout(ack_timeout, handshake).await {
                Ok(result) => result,
                Err(_) => Err(DisconnectReason::new(format!(
                    "Timed out after {:?} waiting for CONNECTED",
                    ack_timeout
                ))),
            }
        };

        match negotiated {
            Ok(heartbeat) => Ok((transport, heartbeat)),
            Err(reason) => {
                transport.close().await;
                Err(reason)
            },
        }
    }

    async fn handshake(
        &self,
        transport: &mut StompTransport,
        host: &str,
    ) -> std::result::Result<HeartBeat, DisconnectReason> {
        if transport.kind == TransportKind::SockJs {
            loop {
                match transport.next_inbound().await {
                    Inbound::Open => break,
                    Inbound::Activity => {},
                    Inbound::Closed(reason) => return Err(reason),
                    Inbound::Frame(_) | Inbound::Malformed(_) => {
                        return Err(DisconnectReason::new("SockJS session did not open"));
                    },
                }
            }
        }

        let client_out = self.options.heartbeat_outgoing_ms;
        let client_in = self.options.heartbeat_incoming_ms;
        let connect = Frame::connect(host, self.auth.connect_headers(), client_out, client_in);
        transport
            .send_frame(&connect)
            .await
            .map_err(|e| DisconnectReason::new(format!("Failed to send CONNECT: {}", e)))?;

        loop {
            match transport.next_inbound().await {
                Inbound::Frame(frame) => match frame.command {
                    Command::Connected => {
                        let heartbeat =
                            HeartBeat::negotiate(client_out, client_in, frame.header("heart-beat"));
                        log::debug!(
                            "[notify-link] STOMP session established (version {}, heart-beat {:?})",
                            frame.header("version").unwrap_or("1.0"),
                            heartbeat
                        );
                        return Ok(heartbeat);
                    },
                    Command::Error => {
                        let error = ConnectionError::error_frame(frame);
                        log::warn!("[notify-link] Server rejected CONNECT: {}", error);
                        self.handlers.emit_error(error);
                        return Err(DisconnectReason::new("Server rejected STOMP CONNECT"));
                    },
                    other => {
                        log::debug!("[notify-link] Ignoring {} before CONNECTED", other);
                    },
                },
                Inbound::Open | Inbound::Activity => {},
                Inbound::Malformed(e) => {
                    self.handlers.emit_error(ConnectionError::protocol(e.to_string()));
                },
                Inbound::Closed(reason) => return Err(reason),
            }
        }
    }

    /// Subscribe, then serve the connection until it ends.
    async fn run_session(
        &mut self,
        mut transport: StompTransport,
        heartbeat: HeartBeat,
        cmd_rx: &mut mpsc::UnboundedReceiver<SocketCmd>,
    ) -> SessionEnd {
        let subscription_id = format!("sub-{}", self.next_subscription);
        self.next_subscription += 1;

        let subscribe = Frame::subscribe(&subscription_id, &self.options.destination);
        if let Err(e) = transport.send_frame(&subscribe).await {
            transport.close().await;
            return SessionEnd::Lost(DisconnectReason::new(format!("Subscribe failed: {}", e)));
        }

        let mut active = Some(subscription_id.clone());
        self.shared.set_connected(true);
        self.shared.set_active_subscriptions(1);
        log::info!(
            "[notify-link] Connected; subscribed to {} as {}",
            self.options.destination,
            subscription_id
        );
        self.handlers.emit_connect(SubscriptionHandle::new(
            subscription_id,
            NotificationSocket::new(self.shared.clone()),
        ));

        let outgoing = period(heartbeat.outgoing_ms);
        let incoming = period(heartbeat.incoming_ms).map(|p| p * INCOMING_TOLERANCE);
        let mut ping_deadline = TokioInstant::now() + outgoing.unwrap_or(FAR_FUTURE);

        let end = loop {
            let ping_sleep = tokio::time::sleep_until(ping_deadline);
            tokio::pin!(ping_sleep);
            let idle_sleep =
                tokio::time::sleep_until(transport.last_inbound + incoming.unwrap_or(FAR_FUTURE));
            tokio::pin!(idle_sleep);

            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(SocketCmd::Unsubscribe { id }) => {
                        if active.as_deref() == Some(id.as_str()) {
                            active = None;
                            self.shared.set_active_subscriptions(0);
                            if let Err(e) = transport.send_frame(&Frame::unsubscribe(&id)).await {
                                log::warn!("[notify-link] Failed to unsubscribe '{}': {}", id, e);
                            }
                        } else {
                            log::debug!(
                                "[notify-link] Ignoring stale unsubscribe for '{}' (active: {:?})",
                                id,
                                active
                            );
                        }
                    },
                    Some(SocketCmd::Shutdown) | None => {
                        let _ = transport.send_frame(&Frame::disconnect()).await;
                        transport.close().await;
                        break SessionEnd::Shutdown;
                    },
                },

                _ = &mut ping_sleep, if outgoing.is_some() => {
                    if let Err(e) = transport.send_heartbeat().await {
                        transport.close().await;
                        let reason = DisconnectReason::new(format!("Heart-beat failed: {}", e));
                        break SessionEnd::Lost(reason);
                    }
                    ping_deadline = TokioInstant::now() + outgoing.unwrap_or(FAR_FUTURE);
                },

                _ = &mut idle_sleep, if incoming.is_some() => {
                    let limit = incoming.unwrap_or(FAR_FUTURE);
                    if transport.last_inbound.elapsed() >= limit {
                        transport.close().await;
                        break SessionEnd::Lost(DisconnectReason::new(format!(
                            "No data from server within {:?}",
                            limit
                        )));
                    }
                },

                inbound = transport.next_inbound() => match inbound {
                    Inbound::Frame(frame) => self.dispatch(frame, active.as_deref()),
                    Inbound::Open | Inbound::Activity => {},
                    Inbound::Malformed(e) => {
                        log::warn!("[notify-link] Malformed frame: {}", e);
                        self.handlers.emit_error(ConnectionError::protocol(e.to_string()));
                    },
                    Inbound::Closed(reason) => break SessionEnd::Lost(reason),
                },
            }
        };

        self.shared.set_connected(false);
        self.shared.set_active_subscriptions(0);
        end
    }

    fn dispatch(&self, frame: Frame, active: Option<&str>) {
        match frame.command {
            Command::Message => match (frame.header("subscription"), active) {
                (Some(id), Some(current)) if id == current => {
                    self.handlers.emit_message(&frame.body_text(), &frame);
                },
                (id, _) => {
                    log::debug!(
                        "[notify-link] Dropping message for inactive subscription {:?}",
                        id
                    );
                },
            },
            Command::Error => {
                let error = ConnectionError::error_frame(frame);
                log::warn!("[notify-link] STOMP ERROR: {}", error);
                self.handlers.emit_error(error);
            },
            other => {
                log::debug!("[notify-link] Ignoring {} frame", other);
            },
        }
    }
}
