use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Source Key
// ============================================================================

/// Identifier for a content origin, e.g. `nyt` in `nyt:123`.
///
/// Never stored on its own: always derived from a content id, and never
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceKey(String);

impl SourceKey {
    /// Build a key from a bare string. Empty keys are invalid.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    /// Derive the key from a `<source_key>:<local_id>` content id.
    ///
    /// Returns `None` when there is no `:` or when it is the first character.
    pub fn from_content_id(content_id: &str) -> Option<Self> {
        match content_id.find(':') {
            Some(idx) if idx > 0 => Some(Self(content_id[..idx].to_string())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Grade
// ============================================================================

/// Trust grade. Grades the client does not recognise decode as `Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Grade {
    APlus,
    A,
    B,
    C,
    D,
    F,
    #[serde(other)]
    Unknown,
}

impl Grade {
    pub const ALL: [Grade; 7] = [
        Grade::APlus,
        Grade::A,
        Grade::B,
        Grade::C,
        Grade::D,
        Grade::F,
        Grade::Unknown,
    ];
}

// ============================================================================
// Source Badge
// ============================================================================

/// Best-effort trust badge for a source, as served by
/// `GET /api/v1/badge/source/<source_key>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBadge {
    pub source_key: String,
    pub grade: Grade,
    pub grade_pretty: String,
    /// Computed from incomplete evidence. Display-only.
    pub provisional: bool,
    /// Accessible title for the badge.
    pub label: String,
    pub href: String,
}
