//! Display theme: the light/dark variant, its terminal palette, and the
//! store that resolves, persists, and tracks it.
//!
//! Resolution order is explicit user choice (persisted) over the OS
//! preference (live-tracked) over `Light`.

mod storage;
mod store;
mod system;

pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{Subscription, SubscriptionMode, ThemeMarker, ThemeMode, ThemeStore, THEME_STORAGE_KEY};
pub use system::{ChannelAppearance, EnvAppearance, ManualAppearance, SystemAppearance};

use crate::provenance::Grade;
use crossterm::style::{Attribute, Color, ContentStyle};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Theme
// ============================================================================

/// Binary display theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown theme '{0}' (expected 'light' or 'dark')")]
pub struct ParseThemeError(String);

impl Theme {
    /// Parse the persisted form. Exact match only: anything else is treated
    /// as absent by the store.
    pub fn from_stored(s: &str) -> Option<Self> {
        match s {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    /// The literal written to storage and to the theme marker.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Light → Dark → Light.
    pub fn next(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Self::Light => Palette::light(),
            Self::Dark => Palette::dark(),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = ParseThemeError;

    /// Case-insensitive, for command-line and config input.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_stored(&s.trim().to_ascii_lowercase()).ok_or_else(|| ParseThemeError(s.to_string()))
    }
}

// ============================================================================
// Palette: semantic roles to terminal styles
// ============================================================================

/// Terminal styles for each visual role in the rendered feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub header: ContentStyle,
    pub title: ContentStyle,
    pub meta: ContentStyle,
    pub link: ContentStyle,
    pub error: ContentStyle,
    pub placeholder: ContentStyle,
    pub grade_strong: ContentStyle,
    pub grade_fair: ContentStyle,
    pub grade_weak: ContentStyle,
    pub grade_unknown: ContentStyle,
    pub provisional: ContentStyle,
}

fn fg(color: Color) -> ContentStyle {
    ContentStyle {
        foreground_color: Some(color),
        ..ContentStyle::default()
    }
}

fn with(mut style: ContentStyle, attribute: Attribute) -> ContentStyle {
    style.attributes.set(attribute);
    style
}

impl Palette {
    fn dark() -> Self {
        Self {
            header: with(fg(Color::Cyan), Attribute::Bold),
            title: with(ContentStyle::default(), Attribute::Bold),
            meta: fg(Color::Grey),
            link: with(fg(Color::Cyan), Attribute::Underlined),
            error: fg(Color::Red),
            placeholder: fg(Color::DarkGrey),
            grade_strong: fg(Color::Green),
            grade_fair: fg(Color::Yellow),
            grade_weak: fg(Color::Red),
            grade_unknown: fg(Color::DarkGrey),
            provisional: with(fg(Color::Grey), Attribute::Italic),
        }
    }

    fn light() -> Self {
        Self {
            header: with(fg(Color::DarkBlue), Attribute::Bold),
            title: with(fg(Color::Black), Attribute::Bold),
            meta: fg(Color::DarkGrey),
            link: with(fg(Color::Blue), Attribute::Underlined),
            error: fg(Color::DarkRed),
            placeholder: fg(Color::DarkGrey),
            grade_strong: fg(Color::DarkGreen),
            grade_fair: fg(Color::DarkYellow),
            grade_weak: fg(Color::DarkRed),
            grade_unknown: fg(Color::DarkGrey),
            provisional: with(fg(Color::DarkGrey), Attribute::Italic),
        }
    }

    /// Colour for a grade badge. Purely decorative.
    pub fn grade(&self, grade: Grade) -> ContentStyle {
        match grade {
            Grade::APlus | Grade::A => self.grade_strong,
            Grade::B | Grade::C => self.grade_fair,
            Grade::D | Grade::F => self.grade_weak,
            Grade::Unknown => self.grade_unknown,
        }
    }
}
