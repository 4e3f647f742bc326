//! Shared HTTP plumbing for the feed and provenance clients.
//!
//! Both services speak JSON over GET. Every failure (transport, non-2xx
//! status, oversized or undecodable body) is reported as a [`FetchError`],
//! which is `Clone` so a single outcome can be handed to every caller
//! coalesced onto the same request.
use futures::StreamExt;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Upper bound on any response body read by this crate.
pub const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(Arc<reqwest::Error>),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid response body: {0}")]
    Decode(String),
    /// The task resolving the request ended without producing a result.
    #[error("Request interrupted before completion")]
    Interrupted,
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        FetchError::Network(Arc::new(e))
    }
}

impl FetchError {
    /// HTTP status carried by this error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus(status) => Some(*status),
            _ => None,
        }
    }
}

/// Build the HTTP client shared by the feed and provenance clients.
///
/// No overall request timeout is applied unless one is configured: a stalled
/// badge request keeps its key in flight until the transport gives up.
pub fn build_client(timeout: Option<Duration>) -> Result<reqwest::Client, FetchError> {
    let mut builder = reqwest::Client::builder().user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// GET `url` and return the body bytes, failing on any non-2xx status.
pub(crate) async fn get_bytes(client: &reqwest::Client, url: Url) -> Result<Vec<u8>, FetchError> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus(response.status().as_u16()));
    }

    read_limited(response, MAX_RESPONSE_SIZE).await
}

/// GET `url` and decode the body as JSON.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: Url,
) -> Result<T, FetchError> {
    let bytes = get_bytes(client, url).await?;
    serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
}

async fn read_limited(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
