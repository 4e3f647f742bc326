use crate::http::{get_json, FetchError};
use crate::provenance::{SourceBadge, SourceKey};
use url::Url;

/// Client for the provenance service's badge endpoints.
#[derive(Debug, Clone)]
pub struct ProvenanceClient {
    client: reqwest::Client,
    base_url: Url,
}

impl ProvenanceClient {
    pub fn new(client: reqwest::Client, base_url: Url) -> Self {
        Self { client, base_url }
    }

    /// `<base>/api/v1/badge/source/<source_key>`
    pub fn badge_url(&self, key: &SourceKey) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["api", "v1", "badge", "source", key.as_str()]);
        }
        url
    }

    /// Fetch the JSON badge for a source. One request, no retry.
    pub async fn fetch_badge(&self, key: &SourceKey) -> Result<SourceBadge, FetchError> {
        let url = self.badge_url(key);
        tracing::debug!(source_key = %key, url = %url, "Fetching source badge");
        get_json(&self.client, url).await
    }
}
