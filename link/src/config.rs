//! API base address resolution.
//!
//! The base address is an explicit value handed to each client at
//! construction. [`api_base_from_env`] is the only place the environment is
//! consulted.

use crate::error::{NotifyLinkError, Result};
use reqwest::Url;

/// Base address used when nothing else is configured.
pub const DEFAULT_API_BASE: &str = "http://localhost:8080";

/// Environment variable overriding [`DEFAULT_API_BASE`].
pub const API_BASE_ENV: &str = "NOTIFY_API_BASE";

/// Resolve the API base from [`API_BASE_ENV`], falling back to
/// [`DEFAULT_API_BASE`]. Blank values are ignored.
pub fn api_base_from_env() -> String {
    resolve_api_base(std::env::var(API_BASE_ENV).ok().as_deref())
}

/// Pick `override_value` when it is non-blank, otherwise the default.
pub fn resolve_api_base(override_value: Option<&str>) -> String {
    match override_value.map(str::trim) {
        Some(value) if !value.is_empty() => normalize_base_url(value),
        _ => DEFAULT_API_BASE.to_string(),
    }
}

/// Trim whitespace and trailing separators so paths can be appended verbatim.
pub fn normalize_base_url(base: &str) -> String {
    base.trim().trim_end_matches('/').to_string()
}

/// Validate that `base` is an absolute http(s) URL with a host.
pub(crate) fn validate_base_url(base: &str) -> Result<()> {
    let url = Url::parse(base).map_err(|e| {
        NotifyLinkError::ConfigurationError(format!("Invalid base_url '{}': {}", base, e))
    })?;

    match url.scheme() {
        "http" | "https" => {},
        other => {
            return Err(NotifyLinkError::ConfigurationError(format!(
                "Unsupported base_url scheme '{}'; expected http or https",
                other
            )));
        },
    }

    if url.host_str().is_none() {
        return Err(NotifyLinkError::ConfigurationError(
            "base_url must include a host".to_string(),
        ));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(NotifyLinkError::ConfigurationError(
            "base_url must not include query parameters or fragments".to_string(),
        ));
    }

    Ok(())
}
