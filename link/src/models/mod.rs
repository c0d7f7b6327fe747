//! Data models for the notify-link client library.
//!
//! Request parameters, decoded responses and socket connection options.

pub mod bulk_update;
pub mod connection_options;
pub mod notification;
pub mod pagination;
pub mod response_body;
pub mod transport_kind;
pub mod unread_count;


pub use bulk_update::{DeleteExpiredResponse, MarkAllReadResponse};
pub use connection_options::ConnectionOptions;
pub use notification::Notification;
pub use pagination::{PageQuery, Pagination, DEFAULT_PAGE_SIZE};
pub use response_body::ResponseBody;
pub use transport_kind::TransportKind;
pub use unread_count::UnreadCount;
