//! Feed loading.
//!
//! - [`types`] - the `FeedItem` wire model
//! - [`loader`] - `FeedClient`, a thin client for `GET /api/feed`

mod loader;
mod types;

pub use loader::{describe_feed_error, FeedClient};
pub use types::{FeedItem, ImageSource};
