use serde::{Deserialize, Serialize};

// ============================================================================
// Feed Item
// ============================================================================

/// A single entry in the chronological feed, as returned by `GET /api/feed`.
///
/// Items are immutable once fetched. `content_id` has the shape
/// `<source_key>:<local_id>` and is globally unique. `published_at` is kept
/// as the raw ISO-8601 string because the server does not guarantee it
/// parses; formatting happens at display time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub content_id: String,
    pub title: String,
    pub source_name: String,
    pub source_url: String,
    pub published_at: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub image_source: Option<ImageSource>,
    #[serde(default)]
    pub image_last_checked: Option<String>,
}

// ============================================================================
// Image Source
// ============================================================================

/// Where an item's image was discovered. Open-ended: unknown values are
/// preserved verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ImageSource {
    Rss,
    PageMeta,
    None,
    Other(String),
}

impl ImageSource {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Rss => "rss",
            Self::PageMeta => "page_meta",
            Self::None => "none",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ImageSource {
    fn from(s: String) -> Self {
        match s.as_str() {
            "rss" => Self::Rss,
            "page_meta" => Self::PageMeta,
            "none" => Self::None,
            _ => Self::Other(s),
        }
    }
}

impl From<ImageSource> for String {
    fn from(source: ImageSource) -> Self {
        match source {
            ImageSource::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}
