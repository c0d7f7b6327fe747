use super::ResponseBody;

/// Result of the unread-count endpoint.
///
/// The server is expected to answer `{"count": <n>}`. Any other shape is
/// handed back untouched as [`UnreadCount::Raw`] rather than treated as an
/// error.
#[derive(Debug, Clone, PartialEq)]
pub enum UnreadCount {
    Count(u64),
    Raw(ResponseBody),
}

impl UnreadCount {
    pub fn from_body(body: ResponseBody) -> Self {
        let count = body
            .as_json()
            .and_then(|value| value.get("count"))
            .and_then(|count| count.as_u64());
        match count {
            Some(count) => Self::Count(count),
            None => Self::Raw(body),
        }
    }

    /// The count, when the response had the expected shape.
    pub fn count(&self) -> Option<u64> {
        match self {
            Self::Count(count) => Some(*count),
            Self::Raw(_) => None,
        }
    }
}
