//! Bearer-token authentication for the notification clients.
//!
//! Attaches `Authorization: Bearer <token>` to HTTP requests and builds the
//! connect-time headers of the STOMP session.

use crate::error::{NotifyLinkError, Result};

const BEARER_PREFIX: &str = "Bearer ";

/// Credentials supplied by the host.
///
/// # Examples
///
/// ```rust
/// use notify_link::AuthProvider;
///
/// let auth = AuthProvider::jwt_token("eyJhbGc...");
/// assert!(auth.is_authenticated());
///
/// // An empty token means "send no Authorization header".
/// assert!(!AuthProvider::from_token("").is_authenticated());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthProvider {
    /// Bearer token authentication
    JwtToken(String),

    /// No authentication; the server decides whether to reject the call
    None,
}

impl AuthProvider {
    /// Create bearer token authentication
    pub fn jwt_token(token: impl Into<String>) -> Self {
        Self::JwtToken(token.into())
    }

    /// No authentication
    pub fn none() -> Self {
        Self::None
    }

    /// Map a host-supplied token to a provider. An empty token yields
    /// [`AuthProvider::None`]; the token is not otherwise validated.
    pub fn from_token(token: &str) -> Self {
        if token.is_empty() {
            Self::None
        } else {
            Self::JwtToken(token.to_string())
        }
    }

    /// Check if authentication is configured
    pub fn is_authenticated(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// The `Authorization` header value, if any.
    ///
    /// Tokens that already carry the `Bearer ` scheme are used as-is.
    pub fn header_value(&self) -> Option<String> {
        match self {
            Self::JwtToken(token) => Some(bearer_value(token)),
            Self::None => None,
        }
    }

    /// Attach authentication headers to an HTTP request builder
    pub fn apply_to_request(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<reqwest::RequestBuilder> {
        match self.header_value() {
            Some(value) => {
                let header = reqwest::header::HeaderValue::from_str(&value).map_err(|e| {
                    NotifyLinkError::ConfigurationError(format!(
                        "Invalid token for Authorization header: {}",
                        e
                    ))
                })?;
                Ok(request.header(reqwest::header::AUTHORIZATION, header))
            },
            None => Ok(request),
        }
    }

    /// Connect-time STOMP headers carrying the credential.
    ///
    /// The value is sent under both `Authorization` and `authorization` so
    /// that server-side interceptors reading either casing see it.
    pub fn connect_headers(&self) -> Vec<(String, String)> {
        match self.header_value() {
            Some(value) => vec![
                ("Authorization".to_string(), value.clone()),
                ("authorization".to_string(), value),
            ],
            None => Vec::new(),
        }
    }
}

fn bearer_value(token: &str) -> String {
    if token.starts_with(BEARER_PREFIX) {
        token.to_string()
    } else {
        format!("{}{}", BEARER_PREFIX, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_provider_creation() {
        assert!(AuthProvider::jwt_token("t").is_authenticated());
        assert!(!AuthProvider::none().is_authenticated());
        assert_eq!(AuthProvider::from_token("abc"), AuthProvider::jwt_token("abc"));
        assert_eq!(AuthProvider::from_token(""), AuthProvider::None);
    }

    #[test]
    fn test_header_value_adds_scheme_once() {
        assert_eq!(
            AuthProvider::jwt_token("abc").header_value().as_deref(),
            Some("Bearer abc")
        );
        assert_eq!(
            AuthProvider::jwt_token("Bearer abc").header_value().as_deref(),
            Some("Bearer abc")
        );
        assert_eq!(AuthProvider::none().header_value(), None);
    }

    #[test]
    fn test_connect_headers_carry_both_casings() {
        let headers = AuthProvider::jwt_token("tok").connect_headers();
        assert_eq!(
            headers,
            vec![
                ("Authorization".to_string(), "Bearer tok".to_string()),
                ("authorization".to_string(), "Bearer tok".to_string()),
            ]
        );
        assert!(AuthProvider::none().connect_headers().is_empty());
    }

    #[test]
    fn test_apply_rejects_unencodable_token() {
        let client = reqwest::Client::new();
        let request = client.get("http://localhost:8080");
        let result = AuthProvider::jwt_token("bad\ntoken").apply_to_request(request);
        assert!(matches!(result, Err(NotifyLinkError::ConfigurationError(_))));
    }
}
