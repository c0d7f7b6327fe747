//! Notification socket behaviour against an in-process STOMP server.

use common::{Framing, ServerEvent, ServerScript, StompTestServer};
use notify_link::{
    connect, Command, ConnectionError, ConnectionOptions, DisconnectReason, ErrorKind,
    EventHandlers, NotifyLinkTimeouts, SocketConfig, SubscriptionHandle, TransportKind,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

mod common;

const QUIET_PERIOD: Duration = Duration::from_millis(300);

fn options(framing: Framing) -> ConnectionOptions {
    let transport = match framing {
        Framing::Raw => TransportKind::WebSocket,
        Framing::SockJs => TransportKind::SockJs,
    };
    ConnectionOptions::new()
        .with_transport(transport)
        .with_reconnect_delay_ms(50)
        .with_debug(true)
}

fn config(server: &StompTestServer, token: &str, framing: Framing) -> SocketConfig {
    SocketConfig::new(server.base_url.clone(), token)
        .with_options(options(framing))
        .with_timeouts(NotifyLinkTimeouts::fast())
}

/// Handlers that forward every callback into channels.
struct Recorder {
    connects: mpsc::UnboundedReceiver<SubscriptionHandle>,
    messages: mpsc::UnboundedReceiver<(String, Option<String>)>,
    errors: mpsc::UnboundedReceiver<ConnectionError>,
    disconnects: Arc<AtomicUsize>,
    reasons: mpsc::UnboundedReceiver<DisconnectReason>,
}

fn recorder() -> (EventHandlers, Recorder) {
    let (connect_tx, connects) = mpsc::unbounded_channel();
    let (message_tx, messages) = mpsc::unbounded_channel();
    let (error_tx, errors) = mpsc::unbounded_channel();
    let disconnects = Arc::new(AtomicUsize::new(0));
    let disconnect_count = disconnects.clone();
    let (reason_tx, reasons) = mpsc::unbounded_channel();

    let handlers = EventHandlers::new()
        .on_connect(move |handle| {
            let _ = connect_tx.send(handle);
        })
        .on_message(move |payload, frame| {
            let subscription = frame.header("subscription").map(str::to_string);
            let _ = message_tx.send((payload.to_string(), subscription));
        })
        .on_error(move |error| {
            let _ = error_tx.send(error);
        })
        .on_disconnect(move |reason| {
            disconnect_count.fetch_add(1, Ordering::SeqCst);
            let _ = reason_tx.send(reason);
        });

    (
        handlers,
        Recorder {
            connects,
            messages,
            errors,
            disconnects,
            reasons,
        },
    )
}

async fn recv<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    timeout(common::EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for callback")
        .expect("callback channel closed")
}

#[tokio::test]
async fn blank_token_never_touches_the_network() {
    common::init_logging();
    let mut server = StompTestServer::start(ServerScript::new(Framing::Raw)).await;
    let (handlers, mut rec) = recorder();

    let disposer = connect(config(&server, "   ", Framing::Raw).with_handlers(handlers));

    assert!(disposer.is_noop());
    let error = rec.errors.try_recv().expect("error reported synchronously");
    assert_eq!(error.kind, ErrorKind::Precondition);
    assert!(rec.errors.try_recv().is_err());
    assert!(server.try_next_event(QUIET_PERIOD).await.is_none());

    disposer.dispose();
    disposer.dispose();
    assert_eq!(rec.disconnects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn connect_sends_both_header_casings_and_subscribes() {
    common::init_logging();
    let mut server = StompTestServer::start(ServerScript::new(Framing::Raw)).await;
    let (handlers, mut rec) = recorder();

    let _disposer = connect(config(&server, "tok-1", Framing::Raw).with_handlers(handlers));

    match server.next_event().await {
        ServerEvent::Opened { path, .. } => assert_eq!(path, "/notify-ws/websocket"),
        other => panic!("unexpected event: {:?}", other),
    }

    let (_, connect_frame) = server.expect_command(Command::Connect).await;
    assert_eq!(connect_frame.header("Authorization"), Some("Bearer tok-1"));
    assert_eq!(connect_frame.header("authorization"), Some("Bearer tok-1"));
    assert_eq!(connect_frame.header("accept-version"), Some("1.2,1.1,1.0"));
    assert_eq!(connect_frame.header("heart-beat"), Some("10000,10000"));
    assert_eq!(connect_frame.header("host"), Some("127.0.0.1"));

    let (_, subscribe) = server.expect_command(Command::Subscribe).await;
    assert_eq!(subscribe.header("id"), Some("sub-0"));
    assert_eq!(subscribe.header("destination"), Some("/user/queue/notify"));

    let handle = recv(&mut rec.connects).await;
    assert_eq!(handle.id(), "sub-0");
    assert!(handle.client().is_connected());
    assert_eq!(handle.client().active_subscriptions(), 1);
}

#[tokio::test]
async fn sockjs_transport_forwards_messages_in_order() {
    common::init_logging();
    let mut script = ServerScript::new(Framing::SockJs);
    script.messages = vec![
        r#"{"id":1,"title":"first"}"#.to_string(),
        r#"{"id":2,"title":"second"}"#.to_string(),
    ];
    let mut server = StompTestServer::start(script).await;
    let (handlers, mut rec) = recorder();

    let _disposer = connect(config(&server, "tok", Framing::SockJs).with_handlers(handlers));

    match server.next_event().await {
        ServerEvent::Opened { path, .. } => {
            let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
            assert_eq!(segments.len(), 4, "path: {}", path);
            assert_eq!(segments[0], "notify-ws");
            assert_eq!(segments[1].len(), 3);
            assert_eq!(segments[2].len(), 8);
            assert_eq!(segments[3], "websocket");
        },
        other => panic!("unexpected event: {:?}", other),
    }

    let (first, subscription) = recv(&mut rec.messages).await;
    assert_eq!(first, r#"{"id":1,"title":"first"}"#);
    assert_eq!(subscription.as_deref(), Some("sub-0"));
    let (second, _) = recv(&mut rec.messages).await;
    assert_eq!(second, r#"{"id":2,"title":"second"}"#);
}

#[tokio::test]
async fn error_frame_is_reported_without_dropping_the_session() {
    common::init_logging();
    let mut script = ServerScript::new(Framing::Raw);
    script.error_after_subscribe = Some("Quota exceeded".to_string());
    let server = StompTestServer::start(script).await;
    let (handlers, mut rec) = recorder();

    let _disposer = connect(config(&server, "tok", Framing::Raw).with_handlers(handlers));

    let handle = recv(&mut rec.connects).await;
    let error = recv(&mut rec.errors).await;
    assert_eq!(error.kind, ErrorKind::Protocol);
    assert_eq!(error.message, "Quota exceeded");
    assert!(error.recoverable);
    assert_eq!(
        error.frame.as_ref().map(|f| f.body_text().into_owned()),
        Some("details".to_string())
    );

    sleep(QUIET_PERIOD).await;
    assert!(handle.client().is_connected());
    assert_eq!(rec.disconnects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_frame_is_reported_and_the_session_survives() {
    common::init_logging();
    let mut script = ServerScript::new(Framing::Raw);
    script.raw_after_subscribe = vec![
        "MESSAGE\nsubscription:sub-0\ncontent-length:18446744073709551615\n\nx\0".to_string(),
    ];
    script.messages = vec![r#"{"id":1}"#.to_string()];
    let server = StompTestServer::start(script).await;
    let (handlers, mut rec) = recorder();

    let _disposer = connect(config(&server, "tok", Framing::Raw).with_handlers(handlers));

    let handle = recv(&mut rec.connects).await;
    let error = recv(&mut rec.errors).await;
    assert_eq!(error.kind, ErrorKind::Protocol);
    assert!(error.recoverable);
    assert!(error.message.contains("content-length"), "message: {}", error.message);

    let (payload, subscription) = recv(&mut rec.messages).await;
    assert_eq!(payload, r#"{"id":1}"#);
    assert_eq!(subscription.as_deref(), Some("sub-0"));
    assert!(handle.client().is_connected());
    assert_eq!(rec.disconnects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn silent_server_is_dropped_after_twice_the_incoming_period() {
    common::init_logging();
    let mut script = ServerScript::new(Framing::Raw);
    script.heart_beat = "100,0".to_string();
    let mut server = StompTestServer::start(script).await;
    let (handlers, mut rec) = recorder();

    let mut cfg = config(&server, "tok", Framing::Raw).with_handlers(handlers);
    cfg.options = cfg.options.with_heartbeat_ms(0, 100);
    let _disposer = connect(cfg);

    let (first_conn, _) = server.expect_command(Command::Subscribe).await;
    recv(&mut rec.connects).await;

    let reason = recv(&mut rec.reasons).await;
    assert!(
        reason.message.starts_with("No data from server within 200ms"),
        "reason: {}",
        reason
    );

    let (second_conn, frame) = server.expect_command(Command::Subscribe).await;
    assert_ne!(first_conn, second_conn);
    assert_eq!(frame.header("id"), Some("sub-1"));
    let handle = recv(&mut rec.connects).await;
    assert_eq!(handle.id(), "sub-1");
}

#[tokio::test]
async fn client_heart_beats_follow_the_negotiated_outgoing_period() {
    common::init_logging();
    let mut script = ServerScript::new(Framing::SockJs);
    script.heart_beat = "0,100".to_string();
    let mut server = StompTestServer::start(script).await;
    let (handlers, mut rec) = recorder();

    let mut cfg = config(&server, "tok", Framing::SockJs).with_handlers(handlers);
    cfg.options = cfg.options.with_heartbeat_ms(100, 0);
    let _disposer = connect(cfg);

    let (conn, connect_frame) = server.expect_command(Command::Connect).await;
    assert_eq!(connect_frame.header("heart-beat"), Some("100,0"));
    server.expect_command(Command::Subscribe).await;
    let subscribed_at = tokio::time::Instant::now();

    const BEATS: usize = 3;
    let mut beats = 0;
    while beats < BEATS {
        match server.next_event().await {
            ServerEvent::Heartbeat { conn: from } => {
                assert_eq!(from, conn);
                beats += 1;
            },
            ServerEvent::Closed { .. } => panic!("connection closed while heart-beating"),
            _ => {},
        }
    }

    let elapsed = subscribed_at.elapsed();
    assert!(elapsed >= Duration::from_millis(250), "beats came too fast: {:?}", elapsed);
    assert!(elapsed < Duration::from_secs(2), "beats came too slow: {:?}", elapsed);
    assert!(recv(&mut rec.connects).await.client().is_connected());
    assert_eq!(rec.disconnects.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn rejected_connect_retries_until_attempts_run_out() {
    common::init_logging();
    let mut script = ServerScript::new(Framing::Raw);
    script.reject_connect = Some("Bad credentials".to_string());
    let server = StompTestServer::start(script).await;
    let (handlers, mut rec) = recorder();

    let mut cfg = config(&server, "expired", Framing::Raw).with_handlers(handlers);
    cfg.options = cfg.options.with_max_reconnect_attempts(Some(1));
    let _disposer = connect(cfg);

    let first = recv(&mut rec.errors).await;
    assert_eq!(first.kind, ErrorKind::Protocol);
    assert_eq!(first.message, "Bad credentials");
    let second = recv(&mut rec.errors).await;
    assert_eq!(second.kind, ErrorKind::Protocol);
    let last = recv(&mut rec.errors).await;
    assert_eq!(last.kind, ErrorKind::Transport);
    assert!(!last.recoverable);

    assert_eq!(rec.disconnects.load(Ordering::SeqCst), 2);
    assert!(rec.connects.try_recv().is_err());
}

#[tokio::test]
async fn reconnect_cycles_keep_exactly_one_subscription() {
    common::init_logging();
    let mut script = ServerScript::new(Framing::SockJs);
    script.close_after_subscribe = true;
    let mut server = StompTestServer::start(script).await;
    let (handlers, mut rec) = recorder();

    let _disposer = connect(config(&server, "tok", Framing::SockJs).with_handlers(handlers));

    const CYCLES: usize = 3;
    let mut per_connection: HashMap<usize, usize> = HashMap::new();
    let mut subscription_ids = Vec::new();
    while subscription_ids.len() < CYCLES {
        let (conn, frame) = server.expect_command(Command::Subscribe).await;
        *per_connection.entry(conn).or_default() += 1;
        subscription_ids.push(frame.header("id").unwrap_or_default().to_string());
    }

    assert_eq!(per_connection.len(), CYCLES);
    assert!(per_connection.values().all(|count| *count == 1));
    assert_eq!(subscription_ids, vec!["sub-0", "sub-1", "sub-2"]);

    for _ in 0..CYCLES {
        let handle = recv(&mut rec.connects).await;
        assert!(handle.client().active_subscriptions() <= 1);
    }
    assert!(rec.disconnects.load(Ordering::SeqCst) >= CYCLES - 1);
}

#[tokio::test]
async fn unsubscribe_all_cancels_once_and_stale_calls_are_ignored() {
    common::init_logging();
    let mut server = StompTestServer::start(ServerScript::new(Framing::Raw)).await;
    let (handlers, mut rec) = recorder();

    let _disposer = connect(config(&server, "tok", Framing::Raw).with_handlers(handlers));
    server.expect_command(Command::Subscribe).await;
    let handle = recv(&mut rec.connects).await;

    handle.unsubscribe_all();
    let (_, unsubscribe) = server.expect_command(Command::Unsubscribe).await;
    assert_eq!(unsubscribe.header("id"), Some("sub-0"));

    handle.unsubscribe_all();
    assert!(server.try_next_event(QUIET_PERIOD).await.is_none());
    assert_eq!(handle.client().active_subscriptions(), 0);
    assert!(handle.client().is_connected());
}

#[tokio::test]
async fn dispose_disconnects_once_and_is_idempotent() {
    common::init_logging();
    let mut server = StompTestServer::start(ServerScript::new(Framing::SockJs)).await;
    let (handlers, mut rec) = recorder();

    let disposer = connect(config(&server, "tok", Framing::SockJs).with_handlers(handlers));
    server.expect_command(Command::Subscribe).await;
    let handle = recv(&mut rec.connects).await;

    disposer.dispose();
    disposer.dispose();
    handle.client().deactivate();

    server.expect_command(Command::Disconnect).await;
    loop {
        if let ServerEvent::Closed { .. } = server.next_event().await {
            break;
        }
    }

    sleep(QUIET_PERIOD).await;
    assert_eq!(rec.disconnects.load(Ordering::SeqCst), 1);
    assert!(!handle.client().is_connected());
    assert!(handle.client().is_deactivated());

    drop(disposer);
    assert!(server.try_next_event(QUIET_PERIOD).await.is_none());
    assert_eq!(rec.disconnects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn dropping_the_disposer_deactivates() {
    common::init_logging();
    let mut server = StompTestServer::start(ServerScript::new(Framing::Raw)).await;
    let (handlers, mut rec) = recorder();

    let disposer = connect(config(&server, "tok", Framing::Raw).with_handlers(handlers));
    recv(&mut rec.connects).await;
    drop(disposer);

    server.expect_command(Command::Disconnect).await;
}

#[tokio::test]
async fn unreachable_server_reports_disconnects_and_keeps_retrying() {
    common::init_logging();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (handlers, rec) = recorder();
    let cfg = SocketConfig::new(format!("http://{}", addr), "tok")
        .with_options(options(Framing::Raw))
        .with_handlers(handlers);
    let disposer = connect(cfg);

    timeout(common::EVENT_TIMEOUT, async {
        while rec.disconnects.load(Ordering::SeqCst) < 2 {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("at least two failed attempts");

    disposer.dispose();
    assert!(!disposer.socket().map(|s| s.is_connected()).unwrap_or(true));
}
