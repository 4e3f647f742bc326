use crate::feed::FeedItem;
use crate::http::{get_json, FetchError};
use url::Url;

/// Client for the feed service (`GET /api/feed?limit=<n>`).
///
/// Loading is a single request with no retry. Callers that may be torn down
/// before the response arrives do not abort it; they discard the result
/// instead (see `App`'s generation counter).
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: reqwest::Client,
    base_url: Url,
}

impl FeedClient {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// URL of the feed endpoint for a given page size.
    pub fn feed_url(&self, limit: usize) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["api", "feed"]);
        }
        url.query_pairs_mut()
            .clear()
            .append_pair("limit", &limit.to_string());
        url
    }

    /// Fetch the newest `limit` items, in server order.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::HttpStatus`] carrying the status for non-2xx
    /// responses, or the transport/decode failure otherwise.
    pub async fn load(&self, limit: usize) -> Result<Vec<FeedItem>, FetchError> {
        let url = self.feed_url(limit);
        tracing::debug!(url = %url, limit, "Fetching feed");

        match get_json::<Vec<FeedItem>>(&self.client, url).await {
            Ok(items) => {
                tracing::info!(count = items.len(), "Feed loaded");
                Ok(items)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Feed fetch failed");
                Err(e)
            }
        }
    }
}

/// User-facing description of a feed failure, carrying the status when known.
pub fn describe_feed_error(err: &FetchError) -> String {
    match err.status() {
        Some(status) => format!("Failed to fetch feed ({status})"),
        None => format!("Failed to fetch feed: {err}"),
    }
}
