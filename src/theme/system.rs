use super::Theme;
use std::sync::Mutex;
use tokio::sync::watch;

/// Environment variable that pins the OS-level preference for terminals that
/// cannot report one.
pub const COLOR_SCHEME_ENV: &str = "PROVENANCE_FEED_COLOR_SCHEME";

/// Source of the OS-level colour-scheme preference.
///
/// `changes` is a capability probe: sources that can push live updates
/// return a receiver, others return `None` and are polled through
/// `preferred` instead.
pub trait SystemAppearance: Send + Sync {
    /// The current preference, or `None` if it cannot be determined.
    fn preferred(&self) -> Option<Theme>;

    /// Live change notifications, if supported.
    fn changes(&self) -> Option<watch::Receiver<Theme>> {
        None
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Reads the preference from the process environment on every call.
///
/// `PROVENANCE_FEED_COLOR_SCHEME` (`light`/`dark`) wins; otherwise the
/// terminal's `COLORFGBG` background colour is used when present.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvAppearance;

impl SystemAppearance for EnvAppearance {
    fn preferred(&self) -> Option<Theme> {
        if let Ok(value) = std::env::var(COLOR_SCHEME_ENV) {
            if let Ok(theme) = value.parse() {
                return Some(theme);
            }
            tracing::debug!(value = %value, "Ignoring unrecognised colour scheme override");
        }
        std::env::var("COLORFGBG")
            .ok()
            .and_then(|v| theme_from_colorfgbg(&v))
    }
}

/// `COLORFGBG` is `fg;bg` (sometimes `fg;default;bg`). Background 7 and 15
/// are the light greys/white of the 16-colour table; 0-6 and 8 are dark.
fn theme_from_colorfgbg(value: &str) -> Option<Theme> {
    let bg: u8 = value.rsplit(';').next()?.trim().parse().ok()?;
    match bg {
        7 | 15 => Some(Theme::Light),
        0..=6 | 8 => Some(Theme::Dark),
        _ => None,
    }
}

// ============================================================================
// Manual (poll-only)
// ============================================================================

/// A preference set programmatically, with no live notifications. Consumers
/// fall back to polling it.
#[derive(Debug, Default)]
pub struct ManualAppearance {
    current: Mutex<Option<Theme>>,
}

impl ManualAppearance {
    pub fn new(initial: Option<Theme>) -> Self {
        Self {
            current: Mutex::new(initial),
        }
    }

    pub fn set(&self, theme: Option<Theme>) {
        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = theme;
    }
}

impl SystemAppearance for ManualAppearance {
    fn preferred(&self) -> Option<Theme> {
        *self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

// ============================================================================
// Channel (live)
// ============================================================================

/// A preference that pushes every change to subscribers.
#[derive(Debug)]
pub struct ChannelAppearance {
    tx: watch::Sender<Theme>,
}

impl ChannelAppearance {
    pub fn new(initial: Theme) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    pub fn set(&self, theme: Theme) {
        self.tx.send_replace(theme);
    }
}

impl SystemAppearance for ChannelAppearance {
    fn preferred(&self) -> Option<Theme> {
        Some(*self.tx.borrow())
    }

    fn changes(&self) -> Option<watch::Receiver<Theme>> {
        Some(self.tx.subscribe())
    }
}
