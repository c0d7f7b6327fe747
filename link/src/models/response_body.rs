use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::error::{NotifyLinkError, Result};

/// A successful response, decoded according to its declared content type.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// `204 No Content`; the body is never read.
    Empty,
    /// The response declared a JSON content type.
    Json(JsonValue),
    /// Any other content type, returned as raw text.
    Text(String),
}

impl ResponseBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Decode a JSON body into `T`.
    ///
    /// Fails with [`NotifyLinkError::SerializationError`] for non-JSON bodies.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Self::Json(value) => Ok(serde_json::from_value(value)?),
            Self::Empty => Err(NotifyLinkError::SerializationError(
                "Expected a JSON body, got an empty response".to_string(),
            )),
            Self::Text(_) => Err(NotifyLinkError::SerializationError(
                "Expected a JSON body, got a non-JSON content type".to_string(),
            )),
        }
    }

    /// Decode a notification page. An empty body is an empty page.
    pub fn into_notifications(self) -> Result<Vec<super::Notification>> {
        match self {
            Self::Empty => Ok(Vec::new()),
            other => other.decode(),
        }
    }
}
