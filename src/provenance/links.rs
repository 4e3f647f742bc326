use crate::provenance::SourceKey;
use serde::Deserialize;
use url::Url;

/// Shape of item-level provenance links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStyle {
    /// `<base>/explain/<content_id>`
    #[default]
    Explain,
    /// `<base>/<content_id>`
    Direct,
}

/// Builds navigation URLs into the provenance service. These are never
/// fetched by this crate.
#[derive(Debug, Clone)]
pub struct ProvenanceLinks {
    base: Url,
    style: LinkStyle,
}

impl ProvenanceLinks {
    pub fn new(base: Url, style: LinkStyle) -> Self {
        Self { base, style }
    }

    /// `<base>/source/<source_key>`
    pub fn source(&self, key: &SourceKey) -> String {
        self.join(&["source", key.as_str()])
    }

    /// Item-level link keyed by the raw content id.
    pub fn item(&self, content_id: &str) -> String {
        match self.style {
            LinkStyle::Explain => self.join(&["explain", content_id]),
            LinkStyle::Direct => self.join(&[content_id]),
        }
    }

    /// Renderable badge graphic, `<base>/api/v1/badge/source/<key>?format=svg`.
    /// Shown as a link; the JSON badge is what gets fetched and cached.
    pub fn badge_image(&self, key: &SourceKey) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty()
                .extend(["api", "v1", "badge", "source", key.as_str()]);
        }
        url.query_pairs_mut().clear().append_pair("format", "svg");
        url.into()
    }

    // Each segment is percent-encoded; a trailing slash on the base is dropped.
    fn join(&self, segments: &[&str]) -> String {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn links(base: &str, style: LinkStyle) -> ProvenanceLinks {
        ProvenanceLinks::new(Url::parse(base).unwrap(), style)
    }

    #[test]
    fn test_source_link() {
        let l = links("http://127.0.0.1:8010", LinkStyle::Explain);
        let key = SourceKey::new("nyt").unwrap();
        assert_eq!(l.source(&key), "http://127.0.0.1:8010/source/nyt");
    }

    #[test]
    fn test_badge_image_link() {
        let l = links("http://127.0.0.1:8010/", LinkStyle::Direct);
        let key = SourceKey::new("nyt").unwrap();
        assert_eq!(
            l.badge_image(&key),
            "http://127.0.0.1:8010/api/v1/badge/source/nyt?format=svg"
        );
    }

    #[test]
    fn test_item_link_styles() {
        let explain = links("http://127.0.0.1:8010/", LinkStyle::Explain);
        assert_eq!(
            explain.item("plain-id"),
            "http://127.0.0.1:8010/explain/plain-id"
        );
        let direct = links("http://127.0.0.1:8010/", LinkStyle::Direct);
        assert_eq!(direct.item("plain-id"), "http://127.0.0.1:8010/plain-id");
    }

    #[test]
    fn test_item_link_encodes_segment() {
        let l = links("https://graph.example.com/ui", LinkStyle::Explain);
        assert_eq!(
            l.item("a b/c"),
            "https://graph.example.com/ui/explain/a%20b%2Fc"
        );
    }
}
