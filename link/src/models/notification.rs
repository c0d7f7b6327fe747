use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A notification as returned by the list endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: i64,

    /// Notification category, e.g. `PVP_RESULT` or `COMMENT`
    #[serde(rename = "type", default)]
    pub kind: Option<String>,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub link_url: Option<String>,

    /// `unread` or `read`
    #[serde(default)]
    pub status: Option<String>,

    /// Free-form metadata, JSON-encoded by the server
    #[serde(default)]
    pub meta_json: Option<String>,

    /// `yyyy-MM-dd'T'HH:mm:ss`, server local time
    #[serde(default)]
    pub created_date: Option<String>,

    #[serde(default)]
    pub read_at: Option<String>,
}

impl Notification {
    pub fn is_read(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|status| status.eq_ignore_ascii_case("read"))
    }

    /// Parse `meta_json`; `None` when absent or not valid JSON.
    pub fn meta(&self) -> Option<JsonValue> {
        self.meta_json
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}
