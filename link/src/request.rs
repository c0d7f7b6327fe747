//! Shared HTTP request behaviour for the notification REST endpoints.

use crate::{
    auth::AuthProvider,
    error::{NotifyLinkError, Result},
    models::ResponseBody,
};
use log::{debug, warn};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde_json::Value as JsonValue;
use std::time::Instant;

/// Characters left unescaped in a path segment, matching the
/// `encodeURIComponent` set.
const PATH_SEGMENT_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const JSON_MEDIA_TYPE: &str = "application/json";

/// Prefix `path` with exactly one `/`.
pub fn normalize_path(path: &str) -> String {
    format!("/{}", path.trim_start_matches('/'))
}

/// Percent-encode a single path segment.
pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT_SET).to_string()
}

/// Issues authenticated requests against a fixed base address and decodes
/// the replies. Holds no per-call state.
#[derive(Clone)]
pub struct RequestExecutor {
    base_url: String,
    http_client: reqwest::Client,
}

impl RequestExecutor {
    pub(crate) fn new(base_url: String, http_client: reqwest::Client) -> Self {
        Self {
            base_url,
            http_client,
        }
    }

    /// The absolute URL for `path`.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{}", self.base_url, normalize_path(path))
    }

    /// Send one request.
    ///
    /// - Non-2xx: [`NotifyLinkError::HttpError`] with status, reason phrase and
    ///   best-effort body text.
    /// - 204: [`ResponseBody::Empty`], the body is not read.
    /// - JSON content type: [`ResponseBody::Json`].
    /// - Anything else: [`ResponseBody::Text`].
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        auth: &AuthProvider,
        body: Option<&JsonValue>,
    ) -> Result<ResponseBody> {
        let url = self.url_for(path);
        let mut req_builder = self.http_client.request(method.clone(), &url);
        req_builder = auth.apply_to_request(req_builder)?;

        if let Some(body) = body {
            let payload = serde_json::to_vec(body)?;
            req_builder = req_builder
                .header(CONTENT_TYPE, HeaderValue::from_static(JSON_MEDIA_TYPE))
                .body(payload);
        }

        let start = Instant::now();
        debug!("[notify-link] {} {}", method, url);

        let response = req_builder.send().await.map_err(|e| {
            warn!("[notify-link] {} {} failed: {}", method, url, e);
            NotifyLinkError::from(e)
        })?;

        let status = response.status();
        debug!(
            "[notify-link] {} {} -> {} in {:?}",
            method,
            url,
            status,
            start.elapsed()
        );

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyLinkError::HttpError {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or_default().to_string(),
                body,
            });
        }

        if status == StatusCode::NO_CONTENT {
            return Ok(ResponseBody::Empty);
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains(JSON_MEDIA_TYPE))
            .unwrap_or(false);

        if is_json {
            let bytes = response.bytes().await?;
            Ok(ResponseBody::Json(serde_json::from_slice(&bytes)?))
        } else {
            Ok(ResponseBody::Text(response.text().await?))
        }
    }
}
