//! Handles the host holds on a live notification socket.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Commands sent from the public handles to the background connection task.
#[derive(Debug)]
pub(crate) enum SocketCmd {
    /// Cancel the subscription with this id if it is still the active one.
    Unsubscribe { id: String },
    /// Deactivate the transport and stop reconnecting.
    Shutdown,
}

/// State shared between the connection task and the host's handles.
#[derive(Debug)]
pub(crate) struct SocketShared {
    cmd_tx: mpsc::UnboundedSender<SocketCmd>,
    connected: AtomicBool,
    active_subscriptions: AtomicUsize,
    disposed: AtomicBool,
}

impl SocketShared {
    pub(crate) fn new(cmd_tx: mpsc::UnboundedSender<SocketCmd>) -> Self {
        Self {
            cmd_tx,
            connected: AtomicBool::new(false),
            active_subscriptions: AtomicUsize::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    pub(crate) fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub(crate) fn set_active_subscriptions(&self, count: usize) {
        self.active_subscriptions.store(count, Ordering::SeqCst);
    }
}

/// The live socket behind a [`Disposer`] and every [`SubscriptionHandle`].
///
/// Cheap to clone; all clones observe and control the same connection.
#[derive(Debug, Clone)]
pub struct NotificationSocket {
    shared: Arc<SocketShared>,
}

impl NotificationSocket {
    pub(crate) fn new(shared: Arc<SocketShared>) -> Self {
        Self { shared }
    }

    /// Whether a STOMP session is currently established.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions on the current session (0 or 1).
    pub fn active_subscriptions(&self) -> usize {
        self.shared.active_subscriptions.load(Ordering::SeqCst)
    }

    /// Whether [`deactivate`](Self::deactivate) has been called.
    pub fn is_deactivated(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    /// Deactivate the transport. Only the first call has an effect; later
    /// calls, or calls after the connection task has ended, do nothing.
    pub fn deactivate(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        if self.shared.cmd_tx.send(SocketCmd::Shutdown).is_err() {
            log::debug!("[notify-link] Deactivate after connection task exited");
        }
    }

    fn unsubscribe(&self, id: &str) {
        let _ = self.shared.cmd_tx.send(SocketCmd::Unsubscribe { id: id.to_string() });
    }
}

/// Passed to `on_connect` after each successful (re)connect.
///
/// Handles are tied to the subscription made on that connect: once the
/// session is replaced by a reconnect, [`unsubscribe_all`](Self::unsubscribe_all)
/// on an older handle does nothing.
#[derive(Debug, Clone)]
pub struct SubscriptionHandle {
    subscription_id: String,
    socket: NotificationSocket,
}

impl SubscriptionHandle {
    pub(crate) fn new(subscription_id: String, socket: NotificationSocket) -> Self {
        Self {
            subscription_id,
            socket,
        }
    }

    /// STOMP subscription id, e.g. `sub-0`.
    pub fn id(&self) -> &str {
        &self.subscription_id
    }

    /// The underlying socket.
    pub fn client(&self) -> &NotificationSocket {
        &self.socket
    }

    /// Cancel the subscription this handle was issued for.
    pub fn unsubscribe_all(&self) {
        self.socket.unsubscribe(&self.subscription_id);
    }
}

/// Tears down a notification socket.
///
/// Returned by [`connect`](crate::connection::connect). Disposal is idempotent
/// and never fails; dropping the disposer disposes.
#[must_use = "dropping the Disposer immediately deactivates the socket"]
#[derive(Debug)]
pub struct Disposer {
    socket: Option<NotificationSocket>,
}

impl Disposer {
    pub(crate) fn new(socket: NotificationSocket) -> Self {
        Self {
            socket: Some(socket),
        }
    }

    /// A disposer for a socket that was never started.
    pub(crate) fn noop() -> Self {
        Self { socket: None }
    }

    /// `true` when no connection was attempted (e.g. the token was blank).
    pub fn is_noop(&self) -> bool {
        self.socket.is_none()
    }

    /// The socket, unless this is a no-op disposer.
    pub fn socket(&self) -> Option<&NotificationSocket> {
        self.socket.as_ref()
    }

    /// Deactivate the socket. Safe to call any number of times.
    pub fn dispose(&self) {
        if let Some(socket) = &self.socket {
            socket.deactivate();
        }
    }
}

impl Drop for Disposer {
    fn drop(&mut self) {
        self.dispose();
    }
}
