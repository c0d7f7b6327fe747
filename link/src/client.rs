//! Notification client with builder pattern.
//!
//! Provides the REST operations against the notification API and opens the
//! real-time notification socket.

use crate::{
    auth::AuthProvider,
    config,
    connection::{self, SocketConfig},
    error::{NotifyLinkError, Result},
    event_handlers::EventHandlers,
    models::{
        ConnectionOptions, DeleteExpiredResponse, MarkAllReadResponse, Notification, Pagination,
        ResponseBody, UnreadCount,
    },
    request::{encode_path_segment, RequestExecutor},
    subscription::Disposer,
    timeouts::NotifyLinkTimeouts,
};
use reqwest::Method;
use std::time::Duration;

const UNREAD_COUNT_PATH: &str = "/api/notifications/unread/count";
const UNREAD_PATH: &str = "/api/notifications/unread";
const READ_PATH: &str = "/api/notifications/read";
const READ_ALL_PATH: &str = "/api/notifications/read-all";
const EXPIRED_PATH: &str = "/api/notifications/expired";

/// Notification API client.
///
/// Every operation takes the caller's bearer token; an empty token sends no
/// `Authorization` header. Failures are returned, never retried.
///
/// # Examples
///
/// ```rust,no_run
/// use notify_link::{NotifyLinkClient, Pagination};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = NotifyLinkClient::builder()
///     .base_url("http://localhost:8080")
///     .build()?;
///
/// let unread = client.fetch_unread_count("my-token").await?;
/// let page = client
///     .fetch_unread_notifications("my-token", Pagination::page_size(0, 10))
///     .await?;
/// println!("{:?} unread, first page has {}", unread.count(), page.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NotifyLinkClient {
    base_url: String,
    executor: RequestExecutor,
    timeouts: NotifyLinkTimeouts,
    connection_options: ConnectionOptions,
}

impl NotifyLinkClient {
    /// Create a new builder for configuring the client
    pub fn builder() -> NotifyLinkClientBuilder {
        NotifyLinkClientBuilder::new()
    }

    /// Client for the base address in `NOTIFY_API_BASE`, or the default
    /// `http://localhost:8080`.
    pub fn from_env() -> Result<Self> {
        Self::builder().base_url(config::api_base_from_env()).build()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeouts(&self) -> &NotifyLinkTimeouts {
        &self.timeouts
    }

    pub fn connection_options(&self) -> &ConnectionOptions {
        &self.connection_options
    }

    /// `GET /api/notifications/unread/count`.
    ///
    /// Replies without a numeric `count` field come back as
    /// [`UnreadCount::Raw`].
    pub async fn fetch_unread_count(&self, token: &str) -> Result<UnreadCount> {
        let body = self.send(Method::GET, UNREAD_COUNT_PATH, token).await?;
        Ok(UnreadCount::from_body(body))
    }

    /// `GET /api/notifications/unread` with the resolved paging query.
    pub async fn fetch_unread(&self, token: &str, pagination: Pagination) -> Result<ResponseBody> {
        let path = format!("{}{}", UNREAD_PATH, pagination.query_string());
        self.send(Method::GET, &path, token).await
    }

    /// `GET /api/notifications/read` with the resolved paging query.
    pub async fn fetch_read(&self, token: &str, pagination: Pagination) -> Result<ResponseBody> {
        let path = format!("{}{}", READ_PATH, pagination.query_string());
        self.send(Method::GET, &path, token).await
    }

    /// Typed view of [`fetch_unread`](Self::fetch_unread).
    pub async fn fetch_unread_notifications(
        &self,
        token: &str,
        pagination: Pagination,
    ) -> Result<Vec<Notification>> {
        self.fetch_unread(token, pagination).await?.into_notifications()
    }

    /// Typed view of [`fetch_read`](Self::fetch_read).
    pub async fn fetch_read_notifications(
        &self,
        token: &str,
        pagination: Pagination,
    ) -> Result<Vec<Notification>> {
        self.fetch_read(token, pagination).await?.into_notifications()
    }

    /// `PATCH /api/notifications/{id}/read`. The id is percent-encoded as a
    /// single path segment.
    pub async fn mark_read(&self, token: &str, id: &str) -> Result<()> {
        let path = format!("/api/notifications/{}/read", encode_path_segment(id));
        self.send(Method::PATCH, &path, token).await?;
        Ok(())
    }

    /// `PATCH /api/notifications/read-all`.
    pub async fn mark_all_read(&self, token: &str) -> Result<MarkAllReadResponse> {
        let body = self.send(Method::PATCH, READ_ALL_PATH, token).await?;
        Ok(MarkAllReadResponse::from_body(body))
    }

    /// `DELETE /api/notifications/expired`.
    pub async fn delete_expired(&self, token: &str) -> Result<DeleteExpiredResponse> {
        let body = self.send(Method::DELETE, EXPIRED_PATH, token).await?;
        Ok(DeleteExpiredResponse::from_body(body))
    }

    /// Open the notification socket for `token`, using this client's base
    /// address, connection options and timeouts.
    ///
    /// Must be called inside a Tokio runtime. See [`connection::connect`].
    pub fn connect(&self, token: &str, handlers: EventHandlers) -> Disposer {
        connection::connect(self.socket_config(token).with_handlers(handlers))
    }

    /// A [`SocketConfig`] pre-filled from this client, for further tuning.
    pub fn socket_config(&self, token: &str) -> SocketConfig {
        SocketConfig::new(self.base_url.clone(), token)
            .with_options(self.connection_options.clone())
            .with_timeouts(self.timeouts.clone())
    }

    async fn send(&self, method: Method, path: &str, token: &str) -> Result<ResponseBody> {
        let auth = AuthProvider::from_token(token);
        self.executor.send(method, path, &auth, None).await
    }
}

/// Builder for configuring [`NotifyLinkClient`] instances.
pub struct NotifyLinkClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    timeouts: NotifyLinkTimeouts,
    connection_options: ConnectionOptions,
}

impl NotifyLinkClientBuilder {
    fn new() -> Self {
        let timeouts = NotifyLinkTimeouts::default();
        Self {
            base_url: None,
            timeout: timeouts.receive_timeout,
            timeouts,
            connection_options: ConnectionOptions::default(),
        }
    }

    /// Set the API base address, e.g. `http://localhost:8080`
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set request timeout (for HTTP requests)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set all timeouts at once. Also replaces the HTTP request timeout
    /// with `receive_timeout`.
    ///
    /// ```rust,no_run
    /// use notify_link::{NotifyLinkClient, NotifyLinkTimeouts};
    ///
    /// # fn example() -> notify_link::Result<()> {
    /// let client = NotifyLinkClient::builder()
    ///     .base_url("http://localhost:8080")
    ///     .timeouts(NotifyLinkTimeouts::fast())
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn timeouts(mut self, timeouts: NotifyLinkTimeouts) -> Self {
        self.timeout = timeouts.receive_timeout;
        self.timeouts = timeouts;
        self
    }

    /// Set notification socket behaviour (reconnect, heart-beats, transport).
    pub fn connection_options(mut self, options: ConnectionOptions) -> Self {
        self.connection_options = options;
        self
    }

    /// Build the client
    pub fn build(self) -> Result<NotifyLinkClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| NotifyLinkError::ConfigurationError("base_url is required".into()))?;
        let base_url = config::normalize_base_url(&base_url);
        config::validate_base_url(&base_url)?;

        let mut client_builder = reqwest::Client::builder().pool_max_idle_per_host(10);
        if !NotifyLinkTimeouts::is_no_timeout(self.timeout) {
            client_builder = client_builder.timeout(self.timeout);
        }
        if !NotifyLinkTimeouts::is_no_timeout(self.timeouts.connection_timeout) {
            client_builder = client_builder.connect_timeout(self.timeouts.connection_timeout);
        }

        let http_client = client_builder
            .build()
            .map_err(|e| NotifyLinkError::ConfigurationError(e.to_string()))?;

        log::debug!("[notify-link] Client configured for {}", base_url);

        Ok(NotifyLinkClient {
            executor: RequestExecutor::new(base_url.clone(), http_client),
            base_url,
            timeouts: self.timeouts,
            connection_options: self.connection_options,
        })
    }
}
