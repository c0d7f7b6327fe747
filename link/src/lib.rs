//! # notify-link
//!
//! Client library for a notification service: a small REST API for listing
//! and acknowledging notifications, plus a STOMP push channel that delivers
//! new notifications as they are created.
//!
//! ## REST
//!
//! ```rust,no_run
//! use notify_link::{NotifyLinkClient, Pagination};
//!
//! # async fn example() -> notify_link::Result<()> {
//! let client = NotifyLinkClient::from_env()?;
//! let token = "eyJhbGciOi...";
//!
//! let unread = client.fetch_unread_count(token).await?;
//! let latest = client
//!     .fetch_unread_notifications(token, Pagination::limit_offset(5, 0))
//!     .await?;
//! for notification in &latest {
//!     client.mark_read(token, &notification.id.to_string()).await?;
//! }
//! println!("had {:?} unread", unread.count());
//! # Ok(())
//! # }
//! ```
//!
//! ## Push channel
//!
//! ```rust,no_run
//! use notify_link::{EventHandlers, NotifyLinkClient};
//!
//! # async fn example() -> notify_link::Result<()> {
//! let client = NotifyLinkClient::from_env()?;
//! let disposer = client.connect(
//!     "eyJhbGciOi...",
//!     EventHandlers::new()
//!         .on_message(|payload, _frame| println!("new notification: {}", payload))
//!         .on_error(|error| eprintln!("push channel: {}", error)),
//! );
//!
//! // ... later, e.g. on logout
//! disposer.dispose();
//! # Ok(())
//! # }
//! ```
//!
//! The socket never returns errors. Everything it has to report arrives
//! through [`EventHandlers`], and it reconnects on its own until disposed.

pub mod auth;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod event_handlers;
pub mod models;
pub mod request;
pub mod sockjs;
pub mod stomp;
pub mod subscription;
pub mod timeouts;

pub use auth::AuthProvider;
pub use client::{NotifyLinkClient, NotifyLinkClientBuilder};
pub use config::{API_BASE_ENV, DEFAULT_API_BASE};
pub use connection::{connect, SocketConfig};
pub use error::{NotifyLinkError, Result};
pub use event_handlers::{ConnectionError, DisconnectReason, ErrorKind, EventHandlers};
pub use models::{
    ConnectionOptions, DeleteExpiredResponse, MarkAllReadResponse, Notification, PageQuery,
    Pagination, ResponseBody, TransportKind, UnreadCount,
};
pub use stomp::{Command, Frame};
pub use subscription::{Disposer, NotificationSocket, SubscriptionHandle};
pub use timeouts::{NotifyLinkTimeouts, NotifyLinkTimeoutsBuilder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
