use serde::{Deserialize, Serialize};

use super::ResponseBody;

/// Reply of `PATCH /api/notifications/read-all`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkAllReadResponse {
    #[serde(default)]
    pub changed: u64,
}

/// Reply of `DELETE /api/notifications/expired`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteExpiredResponse {
    #[serde(default)]
    pub deleted: u64,
}

impl MarkAllReadResponse {
    pub(crate) fn from_body(body: ResponseBody) -> Self {
        Self {
            changed: read_counter(&body, "changed"),
        }
    }
}

impl DeleteExpiredResponse {
    pub(crate) fn from_body(body: ResponseBody) -> Self {
        Self {
            deleted: read_counter(&body, "deleted"),
        }
    }
}

// 204 and non-JSON replies count as zero.
fn read_counter(body: &ResponseBody, field: &str) -> u64 {
    body.as_json()
        .and_then(|value| value.get(field))
        .and_then(|value| value.as_u64())
        .unwrap_or(0)
}
