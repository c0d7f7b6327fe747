use serde::{Deserialize, Serialize};

/// Default page size for both pagination modes.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Pagination for the notification list endpoints.
///
/// Two mutually exclusive modes share this struct: `limit`/`offset` and
/// `page`/`size`. If either `page` or `size` is set the request uses
/// page/size (missing half defaulting to `0`/`20`); otherwise it uses
/// limit/offset (defaulting to `20`/`0`).
///
/// # Example
///
/// ```rust
/// use notify_link::Pagination;
///
/// assert_eq!(Pagination::default().query_string(), "?limit=20&offset=0");
/// assert_eq!(Pagination::page_size(1, 10).query_string(), "?page=1&size=10");
/// assert_eq!(Pagination::new().with_size(5).query_string(), "?page=0&size=5");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// The mode a [`Pagination`] resolves to, with defaults filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageQuery {
    LimitOffset { limit: u64, offset: u64 },
    PageSize { page: u64, size: u64 },
}

impl Pagination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit_offset(limit: u64, offset: u64) -> Self {
        Self {
            limit: Some(limit),
            offset: Some(offset),
            ..Self::default()
        }
    }

    pub fn page_size(page: u64, size: u64) -> Self {
        Self {
            page: Some(page),
            size: Some(size),
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_page(mut self, page: u64) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    /// Resolve the pagination mode; page/size wins when either half is set.
    pub fn resolve(&self) -> PageQuery {
        if self.page.is_some() || self.size.is_some() {
            PageQuery::PageSize {
                page: self.page.unwrap_or(0),
                size: self.size.unwrap_or(DEFAULT_PAGE_SIZE),
            }
        } else {
            PageQuery::LimitOffset {
                limit: self.limit.unwrap_or(DEFAULT_PAGE_SIZE),
                offset: self.offset.unwrap_or(0),
            }
        }
    }

    /// Query string, leading `?` included.
    pub fn query_string(&self) -> String {
        match self.resolve() {
            PageQuery::PageSize { page, size } => format!("?page={}&size={}", page, size),
            PageQuery::LimitOffset { limit, offset } => {
                format!("?limit={}&offset={}", limit, offset)
            },
        }
    }
}
