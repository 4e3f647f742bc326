//! Per-item derivations: source key, provenance link, badge state, and
//! display strings. Nothing here touches the network except through
//! [`BadgeCache`].
use crate::feed::FeedItem;
use crate::provenance::{BadgeCache, Grade, ProvenanceLinks, SourceBadge, SourceKey};
use chrono::{DateTime, Local, NaiveDateTime};

/// Placeholder shown when no badge is available.
pub const UNAVAILABLE_GLYPH: &str = "?";

/// Prefix of `content_id` before its first `:`. `None` when the delimiter is
/// missing or leading.
pub fn source_key_of(content_id: &str) -> Option<SourceKey> {
    SourceKey::from_content_id(content_id)
}

/// Source-level provenance view when a key is derivable, otherwise the
/// item-level view for the raw content id.
pub fn provenance_link_for(item: &FeedItem, links: &ProvenanceLinks) -> String {
    provenance_link_for_id(&item.content_id, links)
}

pub fn provenance_link_for_id(content_id: &str, links: &ProvenanceLinks) -> String {
    match source_key_of(content_id) {
        Some(key) => links.source(&key),
        None => links.item(content_id),
    }
}

/// Decorative glyph for a grade. Never used for control flow.
pub fn grade_glyph(grade: Grade) -> &'static str {
    match grade {
        Grade::APlus => "★",
        Grade::A => "●",
        Grade::B => "◕",
        Grade::C => "◑",
        Grade::D => "◔",
        Grade::F => "○",
        Grade::Unknown => "◌",
    }
}

/// Local-time rendering of an ISO-8601 timestamp, or the raw string when it
/// does not parse.
pub fn format_timestamp(raw: &str) -> String {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string();
    }
    // Naive timestamps are taken as UTC.
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return naive
            .and_utc()
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();
    }
    raw.to_string()
}

// ============================================================================
// Badge State
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BadgeState {
    Loading,
    Resolved(SourceBadge),
    /// No derivable source key, or the lookup failed.
    Unavailable,
}

impl BadgeState {
    /// Starting state for an item: `Loading` if there is anything to look up.
    pub fn initial(key: Option<&SourceKey>) -> Self {
        if key.is_some() {
            Self::Loading
        } else {
            Self::Unavailable
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, Self::Loading)
    }

    /// Short badge text: glyph and pretty grade, or the placeholder.
    pub fn text(&self) -> String {
        match self {
            Self::Loading => "…".to_string(),
            Self::Resolved(badge) => {
                let mut text = format!("{} {}", grade_glyph(badge.grade), badge.grade_pretty);
                if badge.provisional {
                    text.push_str(" (provisional)");
                }
                text
            }
            Self::Unavailable => UNAVAILABLE_GLYPH.to_string(),
        }
    }

    /// Accessible title for the badge.
    pub fn label(&self) -> &str {
        match self {
            Self::Loading => "Loading provenance badge",
            Self::Resolved(badge) => &badge.label,
            Self::Unavailable => "Provenance badge unavailable",
        }
    }
}

/// Look up the badge for an optional key. Failures degrade to `Unavailable`
/// and are never surfaced.
pub async fn resolve_badge(cache: &BadgeCache, key: Option<&SourceKey>) -> BadgeState {
    let Some(key) = key else {
        return BadgeState::Unavailable;
    };
    match cache.get(key).await {
        Ok(badge) => BadgeState::Resolved(badge),
        Err(e) => {
            tracing::debug!(source_key = %key, error = %e, "Badge unavailable");
            BadgeState::Unavailable
        }
    }
}

// ============================================================================
// Item View
// ============================================================================

/// Everything needed to display one feed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemView {
    pub item: FeedItem,
    pub source_key: Option<SourceKey>,
    pub provenance_link: String,
    /// SVG rendering of the source badge, when there is a source.
    pub badge_image_url: Option<String>,
    pub published: String,
    pub badge: BadgeState,
}

impl ItemView {
    pub fn new(item: FeedItem, links: &ProvenanceLinks) -> Self {
        let source_key = source_key_of(&item.content_id);
        let provenance_link = provenance_link_for(&item, links);
        let badge_image_url = source_key.as_ref().map(|key| links.badge_image(key));
        let published = format_timestamp(&item.published_at);
        let badge = BadgeState::initial(source_key.as_ref());
        Self {
            item,
            source_key,
            provenance_link,
            badge_image_url,
            published,
            badge,
        }
    }

    /// Seed the badge from a fresh cache entry, if any. Returns whether a
    /// lookup is still needed.
    pub fn seed_from_cache(&mut self, cache: &BadgeCache) -> bool {
        let Some(key) = &self.source_key else {
            return false;
        };
        match cache.cached(key) {
            Some(badge) => {
                self.badge = BadgeState::Resolved(badge);
                false
            }
            None => true,
        }
    }
}
