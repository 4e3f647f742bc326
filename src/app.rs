//! View session: loads the feed once per mount, drives one badge lookup per
//! item, and follows the theme.
//!
//! Background work reports back through [`AppEvent`]s stamped with the
//! generation that spawned it. Unmounting bumps the generation, so results
//! that arrive for a torn-down view are dropped instead of applied. Nothing
//! is aborted: in particular badge fetches are shared with other consumers
//! through the cache and must run to completion.
//!
//! OS theme changes do not go through the event channel; the subscription
//! applies them to the store while the view is mounted.
use crate::feed::{describe_feed_error, FeedClient, FeedItem};
use crate::http::FetchError;
use crate::presenter::{resolve_badge, BadgeState, ItemView};
use crate::provenance::{BadgeCache, ProvenanceLinks, SourceKey};
use crate::theme::{Subscription, Theme, ThemeStore};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Default number of items requested from the feed service.
pub const DEFAULT_FEED_LIMIT: usize = 50;

// ============================================================================
// Interest
// ============================================================================

/// A consumer's "still interested" flag. Cancelling it only marks the
/// consumer as gone; shared work keeps running.
#[derive(Debug, Clone)]
pub struct Interest(Arc<AtomicBool>);

impl Default for Interest {
    fn default() -> Self {
        Self::new()
    }
}

impl Interest {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn cancel(&self) {
        self.0.store(false, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// ============================================================================
// Events
// ============================================================================

/// Results from background tasks.
#[derive(Debug)]
pub enum AppEvent {
    FeedLoaded {
        generation: u64,
        result: Result<Vec<FeedItem>, FetchError>,
    },
    BadgeLoaded {
        generation: u64,
        content_id: String,
        state: BadgeState,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedState {
    /// Not mounted yet.
    Idle,
    Loading,
    Ready(Vec<ItemView>),
    /// User-visible error replacing the list.
    Failed(String),
}

// ============================================================================
// App
// ============================================================================

pub struct App {
    pub theme: ThemeStore,
    pub feed: FeedState,
    feed_client: FeedClient,
    badges: BadgeCache,
    links: ProvenanceLinks,
    limit: usize,
    generation: u64,
    interest: Interest,
    theme_subscription: Option<Subscription>,
}

impl App {
    pub fn new(
        theme: ThemeStore,
        feed_client: FeedClient,
        badges: BadgeCache,
        links: ProvenanceLinks,
        limit: usize,
    ) -> Self {
        let interest = Interest::new();
        interest.cancel();
        Self {
            theme,
            feed: FeedState::Idle,
            feed_client,
            badges,
            links,
            limit,
            generation: 0,
            interest,
            theme_subscription: None,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.interest.is_active()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mount the view: apply the theme, follow OS changes, and start the
    /// feed load. Must be called within a Tokio runtime.
    pub fn mount(&mut self, tx: mpsc::Sender<AppEvent>) {
        if self.is_mounted() {
            tracing::debug!("Mount ignored, already mounted");
            return;
        }
        self.generation += 1;
        self.interest = Interest::new();
        self.feed = FeedState::Loading;

        self.theme.apply(self.theme.current());

        // Kept off the bounded event channel: a live source never re-sends a
        // change, so it must not be dropped when badge results fill it.
        let store = self.theme.clone();
        let interest = self.interest.clone();
        self.theme_subscription = Some(self.theme.subscribe_to_system_changes(move |theme| {
            if interest.is_active() {
                store.on_system_change(theme);
            }
        }));

        spawn_feed_load(
            self.generation,
            self.limit,
            self.feed_client.clone(),
            self.interest.clone(),
            tx,
        );
    }

    /// Tear down the view. Pending results will be discarded on arrival.
    pub fn unmount(&mut self) {
        self.interest.cancel();
        self.generation += 1;
        self.theme_subscription = None;
        tracing::debug!(generation = self.generation, "View unmounted");
    }

    /// Explicit user toggle.
    pub fn toggle_theme(&mut self) -> Theme {
        self.theme.toggle()
    }

    /// True once the feed has settled and no badge is still loading.
    pub fn is_settled(&self) -> bool {
        match &self.feed {
            FeedState::Idle | FeedState::Loading => false,
            FeedState::Failed(_) => true,
            FeedState::Ready(items) => items.iter().all(|i| i.badge.is_settled()),
        }
    }

    pub fn items(&self) -> &[ItemView] {
        match &self.feed {
            FeedState::Ready(items) => items,
            _ => &[],
        }
    }

    pub fn handle_event(&mut self, event: AppEvent, tx: &mpsc::Sender<AppEvent>) {
        match event {
            AppEvent::FeedLoaded { generation, result } => {
                if !self.accepts(generation) {
                    tracing::debug!(generation, "Discarding stale feed result");
                    return;
                }
                self.handle_feed_loaded(result, tx);
            }
            AppEvent::BadgeLoaded {
                generation,
                content_id,
                state,
            } => {
                if !self.accepts(generation) {
                    tracing::debug!(generation, content_id = %content_id, "Discarding stale badge result");
                    return;
                }
                if let FeedState::Ready(items) = &mut self.feed {
                    if let Some(view) = items.iter_mut().find(|v| v.item.content_id == content_id) {
                        view.badge = state;
                    }
                }
            }
        }
    }

    fn accepts(&self, generation: u64) -> bool {
        self.is_mounted() && generation == self.generation
    }

    fn handle_feed_loaded(
        &mut self,
        result: Result<Vec<FeedItem>, FetchError>,
        tx: &mpsc::Sender<AppEvent>,
    ) {
        let items = match result {
            Ok(items) => items,
            Err(e) => {
                self.feed = FeedState::Failed(describe_feed_error(&e));
                return;
            }
        };

        let mut views: Vec<ItemView> = items
            .into_iter()
            .map(|item| ItemView::new(item, &self.links))
            .collect();

        for view in &mut views {
            if !view.seed_from_cache(&self.badges) {
                continue;
            }
            if let Some(key) = &view.source_key {
                spawn_badge_load(
                    self.generation,
                    view.item.content_id.clone(),
                    key.clone(),
                    self.badges.clone(),
                    self.interest.clone(),
                    tx.clone(),
                );
            }
        }

        self.feed = FeedState::Ready(views);
    }
}

/// Load the feed in the background and report `AppEvent::FeedLoaded`.
///
/// The request is not aborted on unmount; its result is dropped instead.
pub fn spawn_feed_load(
    generation: u64,
    limit: usize,
    client: FeedClient,
    interest: Interest,
    tx: mpsc::Sender<AppEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let result = client.load(limit).await;
        if !interest.is_active() {
            tracing::debug!(generation, "Feed load finished after unmount, dropping");
            return;
        }
        if let Err(e) = tx.send(AppEvent::FeedLoaded { generation, result }).await {
            tracing::warn!(error = %e, event = "FeedLoaded", "Channel send failed (receiver dropped)");
        }
    })
}

/// Resolve one item's badge in the background and report
/// `AppEvent::BadgeLoaded`.
pub fn spawn_badge_load(
    generation: u64,
    content_id: String,
    key: SourceKey,
    cache: BadgeCache,
    interest: Interest,
    tx: mpsc::Sender<AppEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let state = resolve_badge(&cache, Some(&key)).await;
        if !interest.is_active() {
            return;
        }
        if let Err(e) = tx
            .send(AppEvent::BadgeLoaded {
                generation,
                content_id,
                state,
            })
            .await
        {
            tracing::warn!(error = %e, event = "BadgeLoaded", "Channel send failed (receiver dropped)");
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interest_cancel() {
        let interest = Interest::new();
        let observer = interest.clone();
        assert!(observer.is_active());
        interest.cancel();
        assert!(!observer.is_active());
    }
}
