use super::{KeyValueStore, SystemAppearance, Theme};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Storage key holding the user's explicit choice (`"light"` or `"dark"`).
pub const THEME_STORAGE_KEY: &str = "provenance-feed.theme";

/// How often a poll-only appearance source is re-read.
const POLL_INTERVAL: Duration = Duration::from_secs(2);

static ROOT_MARKER: OnceLock<ThemeMarker> = OnceLock::new();

// ============================================================================
// Theme Marker
// ============================================================================

/// Observable theme marker on the root presentation context. Styling reads
/// the current theme from here and nowhere else.
#[derive(Debug, Clone)]
pub struct ThemeMarker {
    tx: Arc<watch::Sender<Option<Theme>>>,
}

impl Default for ThemeMarker {
    fn default() -> Self {
        Self::new()
    }
}

impl ThemeMarker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// The process-wide marker.
    pub fn root() -> &'static ThemeMarker {
        ROOT_MARKER.get_or_init(ThemeMarker::new)
    }

    pub fn current(&self) -> Option<Theme> {
        *self.tx.borrow()
    }

    pub fn watch(&self) -> watch::Receiver<Option<Theme>> {
        self.tx.subscribe()
    }

    fn set(&self, theme: Theme) {
        self.tx.send_replace(Some(theme));
    }
}

// ============================================================================
// Subscription
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionMode {
    /// The appearance source pushes changes.
    Live,
    /// The appearance source is re-read on an interval.
    Polling,
    /// No preference can be observed; nothing runs.
    Inert,
}

/// Handle to a system-preference subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    mode: SubscriptionMode,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn mode(&self) -> SubscriptionMode {
        self.mode
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ============================================================================
// Theme Store
// ============================================================================

/// Whether the current theme came from the user or follows the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    UserSet,
    SystemFollow,
}

struct StoreInner {
    storage: Arc<dyn KeyValueStore>,
    appearance: Arc<dyn SystemAppearance>,
    marker: ThemeMarker,
    theme: Mutex<Theme>,
    /// Once set, stays set for the life of the store.
    user_set: Arc<AtomicBool>,
}

/// Theme state machine over {light, dark} × {user-set, system-follow}.
///
/// OS changes update the theme only in `SystemFollow`. An explicit choice
/// moves to `UserSet` permanently and persists the theme.
#[derive(Clone)]
pub struct ThemeStore {
    inner: Arc<StoreInner>,
}

impl std::fmt::Debug for ThemeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThemeStore")
            .field("theme", &self.current())
            .field("mode", &self.mode())
            .finish()
    }
}

impl ThemeStore {
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        appearance: Arc<dyn SystemAppearance>,
        marker: ThemeMarker,
    ) -> Self {
        let stored = load_stored(storage.as_ref());
        let theme = resolve(stored, appearance.as_ref());
        tracing::debug!(theme = %theme, user_set = stored.is_some(), "Resolved initial theme");

        Self {
            inner: Arc::new(StoreInner {
                storage,
                appearance,
                marker,
                theme: Mutex::new(theme),
                user_set: Arc::new(AtomicBool::new(stored.is_some())),
            }),
        }
    }

    /// Persisted theme if valid, else the OS preference, else `Light`.
    pub fn resolve_initial(&self) -> Theme {
        resolve(
            load_stored(self.inner.storage.as_ref()),
            self.inner.appearance.as_ref(),
        )
    }

    /// Best-effort write of the theme to durable storage.
    pub fn persist(&self, theme: Theme) {
        if let Err(e) = self.inner.storage.set(THEME_STORAGE_KEY, theme.as_str()) {
            tracing::debug!(error = %e, theme = %theme, "Failed to persist theme");
        }
    }

    /// Publish `theme` on the marker.
    pub fn apply(&self, theme: Theme) {
        self.inner.marker.set(theme);
    }

    pub fn current(&self) -> Theme {
        *self
            .inner
            .theme
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn mode(&self) -> ThemeMode {
        if self.has_user_theme() {
            ThemeMode::UserSet
        } else {
            ThemeMode::SystemFollow
        }
    }

    pub fn has_user_theme(&self) -> bool {
        self.inner.user_set.load(Ordering::Acquire)
    }

    pub fn marker(&self) -> &ThemeMarker {
        &self.inner.marker
    }

    /// Record an explicit user choice: update, persist, apply, and stop
    /// following the OS for the rest of the session.
    pub fn set_user_theme(&self, theme: Theme) {
        self.inner.user_set.store(true, Ordering::Release);
        self.set_current(theme);
        self.persist(theme);
        self.apply(theme);
        tracing::info!(theme = %theme, "Theme set by user");
    }

    /// Flip the theme as an explicit user choice. Returns the new theme.
    pub fn toggle(&self) -> Theme {
        let next = self.current().next();
        self.set_user_theme(next);
        next
    }

    /// Apply an OS preference change. Ignored once the user has chosen.
    /// Returns whether the theme was updated.
    pub fn on_system_change(&self, theme: Theme) -> bool {
        if self.has_user_theme() {
            tracing::debug!(theme = %theme, "Ignoring OS theme change, user theme set");
            return false;
        }
        self.set_current(theme);
        self.apply(theme);
        tracing::debug!(theme = %theme, "Following OS theme change");
        true
    }

    /// Invoke `callback` on every OS preference change while no user theme
    /// has been recorded.
    ///
    /// Uses live notifications when the appearance source offers them and
    /// falls back to polling otherwise. Must be called within a Tokio
    /// runtime. Dropping the returned handle unsubscribes.
    pub fn subscribe_to_system_changes<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Theme) + Send + Sync + 'static,
    {
        let user_set = Arc::clone(&self.inner.user_set);

        if let Some(mut rx) = self.inner.appearance.changes() {
            let task = tokio::spawn(async move {
                while rx.changed().await.is_ok() {
                    let theme = *rx.borrow_and_update();
                    if !user_set.load(Ordering::Acquire) {
                        callback(theme);
                    }
                }
            });
            return Subscription {
                mode: SubscriptionMode::Live,
                task: Some(task),
            };
        }

        let appearance = Arc::clone(&self.inner.appearance);
        let Some(initial) = appearance.preferred() else {
            tracing::debug!("No OS colour-scheme preference available, not subscribing");
            return Subscription {
                mode: SubscriptionMode::Inert,
                task: None,
            };
        };

        let task = tokio::spawn(async move {
            let mut last = Some(initial);
            let mut ticker = tokio::time::interval(POLL_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let now = appearance.preferred();
                if now == last {
                    continue;
                }
                last = now;
                if let Some(theme) = now {
                    if !user_set.load(Ordering::Acquire) {
                        callback(theme);
                    }
                }
            }
        });
        Subscription {
            mode: SubscriptionMode::Polling,
            task: Some(task),
        }
    }

    fn set_current(&self, theme: Theme) {
        *self
            .inner
            .theme
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = theme;
    }
}

// Stored choice, then OS preference, then `Light`.
fn resolve(stored: Option<Theme>, appearance: &dyn SystemAppearance) -> Theme {
    stored.or_else(|| appearance.preferred()).unwrap_or_default()
}

fn load_stored(storage: &dyn KeyValueStore) -> Option<Theme> {
    match storage.get(THEME_STORAGE_KEY) {
        Ok(Some(raw)) => {
            let theme = Theme::from_stored(&raw);
            if theme.is_none() {
                tracing::debug!(value = %raw, "Ignoring invalid stored theme");
            }
            theme
        }
        Ok(None) => None,
        Err(e) => {
            tracing::debug!(error = %e, "Theme storage unreadable, using defaults");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::{ChannelAppearance, ManualAppearance, MemoryStore};
    use tokio::sync::mpsc;

    fn store_with(storage: MemoryStore, appearance: Arc<dyn SystemAppearance>) -> ThemeStore {
        ThemeStore::new(Arc::new(storage), appearance, ThemeMarker::new())
    }

    #[test]
    fn test_stored_theme_wins() {
        let store = store_with(
            MemoryStore::with_value(THEME_STORAGE_KEY, "dark"),
            Arc::new(ManualAppearance::new(Some(Theme::Light))),
        );
        assert_eq!(store.current(), Theme::Dark);
        assert_eq!(store.mode(), ThemeMode::UserSet);
        assert_eq!(store.resolve_initial(), Theme::Dark);
    }

    #[test]
    fn test_os_preference_used_without_stored_value() {
        let store = store_with(
            MemoryStore::new(),
            Arc::new(ManualAppearance::new(Some(Theme::Dark))),
        );
        assert_eq!(store.current(), Theme::Dark);
        assert_eq!(store.mode(), ThemeMode::SystemFollow);
    }

    #[test]
    fn test_invalid_stored_value_falls_through() {
        let store = store_with(
            MemoryStore::with_value(THEME_STORAGE_KEY, "sepia"),
            Arc::new(ManualAppearance::new(Some(Theme::Dark))),
        );
        assert_eq!(store.current(), Theme::Dark);
        assert!(!store.has_user_theme());
    }

    #[test]
    fn test_resolve_initial_matches_construction() {
        let storage = Arc::new(MemoryStore::new());
        let appearance = Arc::new(ManualAppearance::new(Some(Theme::Dark)));
        let store = ThemeStore::new(storage.clone(), appearance.clone(), ThemeMarker::new());
        assert_eq!(store.resolve_initial(), store.current());

        // Later inputs are re-read with the same precedence.
        appearance.set(None);
        assert_eq!(store.resolve_initial(), Theme::Light);
        storage.set(THEME_STORAGE_KEY, "dark").unwrap();
        appearance.set(Some(Theme::Light));
        assert_eq!(store.resolve_initial(), Theme::Dark);
    }

    #[test]
    fn test_defaults_to_light() {
        let store = store_with(MemoryStore::new(), Arc::new(ManualAppearance::new(None)));
        assert_eq!(store.resolve_initial(), Theme::Light);
    }

    #[test]
    fn test_unavailable_storage_is_swallowed() {
        let store = store_with(
            MemoryStore::unavailable(),
            Arc::new(ManualAppearance::new(Some(Theme::Dark))),
        );
        assert_eq!(store.current(), Theme::Dark);
        // Write failure must not panic or surface.
        store.set_user_theme(Theme::Light);
        assert_eq!(store.current(), Theme::Light);
        assert_eq!(store.mode(), ThemeMode::UserSet);
    }

    #[test]
    fn test_set_user_theme_persists_and_applies() {
        let storage = Arc::new(MemoryStore::new());
        let marker = ThemeMarker::new();
        let store = ThemeStore::new(
            storage.clone(),
            Arc::new(ManualAppearance::new(None)),
            marker.clone(),
        );

        assert_eq!(marker.current(), None);
        store.set_user_theme(Theme::Dark);

        assert_eq!(marker.current(), Some(Theme::Dark));
        assert_eq!(
            storage.get(THEME_STORAGE_KEY).unwrap().as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn test_toggle_flips_and_locks_user_mode() {
        let store = store_with(MemoryStore::new(), Arc::new(ManualAppearance::new(None)));
        assert_eq!(store.toggle(), Theme::Dark);
        assert_eq!(store.toggle(), Theme::Light);
        assert_eq!(store.mode(), ThemeMode::UserSet);
    }

    #[test]
    fn test_system_change_ignored_after_user_choice() {
        let store = store_with(
            MemoryStore::new(),
            Arc::new(ManualAppearance::new(Some(Theme::Dark))),
        );
        assert!(store.on_system_change(Theme::Light));
        assert_eq!(store.current(), Theme::Light);

        store.set_user_theme(Theme::Light);
        assert!(!store.on_system_change(Theme::Dark));
        assert_eq!(store.current(), Theme::Light);
        assert_eq!(store.marker().current(), Some(Theme::Light));
    }

    #[tokio::test]
    async fn test_live_subscription_delivers_changes() {
        let appearance = Arc::new(ChannelAppearance::new(Theme::Light));
        let store = store_with(MemoryStore::new(), appearance.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sub = store.subscribe_to_system_changes(move |theme| {
            let _ = tx.send(theme);
        });
        assert_eq!(sub.mode(), SubscriptionMode::Live);

        appearance.set(Theme::Dark);
        assert_eq!(rx.recv().await, Some(Theme::Dark));
    }

    #[tokio::test]
    async fn test_live_subscription_inert_after_user_choice() {
        let appearance = Arc::new(ChannelAppearance::new(Theme::Light));
        let store = store_with(MemoryStore::new(), appearance.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let _sub = store.subscribe_to_system_changes(move |theme| {
            let _ = tx.send(theme);
        });

        store.set_user_theme(Theme::Light);
        appearance.set(Theme::Dark);

        let received = tokio::time::timeout(Duration::from_millis(50), rx.recv()).await;
        assert!(received.is_err(), "callback must not fire after user choice");
        assert_eq!(store.current(), Theme::Light);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polling_fallback_detects_change() {
        let appearance = Arc::new(ManualAppearance::new(Some(Theme::Light)));
        let store = store_with(MemoryStore::new(), appearance.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();

        let sub = store.subscribe_to_system_changes(move |theme| {
            let _ = tx.send(theme);
        });
        assert_eq!(sub.mode(), SubscriptionMode::Polling);

        appearance.set(Some(Theme::Dark));
        tokio::time::sleep(POLL_INTERVAL * 2).await;
        assert_eq!(rx.recv().await, Some(Theme::Dark));
    }

    #[tokio::test]
    async fn test_no_preference_is_inert() {
        let store = store_with(MemoryStore::new(), Arc::new(ManualAppearance::new(None)));
        let sub = store.subscribe_to_system_changes(|_| {});
        assert_eq!(sub.mode(), SubscriptionMode::Inert);
        sub.unsubscribe();
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let appearance = Arc::new(ChannelAppearance::new(Theme::Light));
        let store = store_with(MemoryStore::new(), appearance.clone());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sub = store.subscribe_to_system_changes(move |theme| {
            let _ = tx.send(theme);
        });

        sub.unsubscribe();
        appearance.set(Theme::Dark);
        // The aborted task drops the sender, closing the channel.
        assert_eq!(rx.recv().await, None);
    }
}
