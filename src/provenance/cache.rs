//! Per-source TTL cache for trust badges with in-flight request coalescing.
//!
//! Lookup order for a key:
//!
//! 1. A fresh resolved badge is returned without touching the network.
//! 2. An outstanding request is shared with the caller.
//! 3. Otherwise a new request is spawned and registered before the first
//!    poll returns, so callers arriving before the response join it.
//!
//! The request runs on its own task and owns the bookkeeping for its
//! outcome. Dropping a caller's future never cancels it, so one consumer
//! going away cannot break the others waiting on the same key.
//!
//! Failures are not cached: the entry is removed and the next `get` retries.
//! There is no size bound; source keys are few compared to feed items.
use crate::http::FetchError;
use crate::provenance::{ProvenanceClient, SourceBadge, SourceKey};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Freshness window for a resolved badge.
pub const BADGE_TTL: Duration = Duration::from_secs(10 * 60);

type BadgeResult = Result<SourceBadge, FetchError>;
type PendingBadge = Shared<BoxFuture<'static, BadgeResult>>;

static GLOBAL: OnceLock<BadgeCache> = OnceLock::new();

// ============================================================================
// Entries
// ============================================================================

struct CacheEntry {
    /// Set at issue time while in flight, reset at completion on success.
    expires_at: Instant,
    /// Distinguishes this entry from a later one under the same key.
    id: u64,
    state: EntryState,
}

enum EntryState {
    Ready(SourceBadge),
    InFlight(PendingBadge),
}

/// Observable status of a key, for diagnostics and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStatus {
    Fresh,
    InFlight,
    Expired,
}

struct Inner {
    client: ProvenanceClient,
    ttl: Duration,
    entries: Mutex<HashMap<SourceKey, CacheEntry>>,
    next_id: AtomicU64,
}

// ============================================================================
// Badge Cache
// ============================================================================

/// Cheaply cloneable handle; clones share one map.
#[derive(Clone)]
pub struct BadgeCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BadgeCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BadgeCache")
            .field("ttl", &self.inner.ttl)
            .field("entries", &self.len())
            .finish()
    }
}

impl BadgeCache {
    pub fn new(client: ProvenanceClient) -> Self {
        Self::with_ttl(client, BADGE_TTL)
    }

    pub fn with_ttl(client: ProvenanceClient, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                client,
                ttl,
                entries: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Install the process-wide cache. The first call wins; later calls
    /// return the already-installed instance.
    pub fn init_global(client: ProvenanceClient) -> &'static BadgeCache {
        GLOBAL.get_or_init(|| Self::new(client))
    }

    /// Get the badge for `key`, fetching at most once per key at a time.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn get(&self, key: &SourceKey) -> BadgeResult {
        let (id, pending) = {
            let mut entries = self.lock();
            let now = Instant::now();

            match entries.get(key) {
                Some(CacheEntry {
                    state: EntryState::Ready(badge),
                    expires_at,
                    ..
                }) if *expires_at > now => {
                    tracing::trace!(source_key = %key, "Badge cache hit");
                    return Ok(badge.clone());
                }
                Some(CacheEntry {
                    state: EntryState::InFlight(pending),
                    id,
                    ..
                }) => {
                    tracing::debug!(source_key = %key, "Joining in-flight badge request");
                    (*id, pending.clone())
                }
                _ => {
                    let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
                    let pending = self.spawn_fetch(key.clone(), id);
                    entries.insert(
                        key.clone(),
                        CacheEntry {
                            expires_at: now + self.inner.ttl,
                            id,
                            state: EntryState::InFlight(pending.clone()),
                        },
                    );
                    (id, pending)
                }
            }
        };

        let result = pending.await;
        if result.is_err() {
            // The fetch task normally evicts on failure; this also covers a
            // task that died without reporting back.
            self.evict(key, id);
        }
        result
    }

    /// The badge for `key` if a fresh one is cached. Never fetches.
    pub fn cached(&self, key: &SourceKey) -> Option<SourceBadge> {
        let entries = self.lock();
        match entries.get(key) {
            Some(CacheEntry {
                state: EntryState::Ready(badge),
                expires_at,
                ..
            }) if *expires_at > Instant::now() => Some(badge.clone()),
            _ => None,
        }
    }

    /// Status of `key` without fetching.
    pub fn peek(&self, key: &SourceKey) -> Option<EntryStatus> {
        let entries = self.lock();
        entries.get(key).map(|entry| match entry.state {
            EntryState::InFlight(_) => EntryStatus::InFlight,
            EntryState::Ready(_) if entry.expires_at > Instant::now() => EntryStatus::Fresh,
            EntryState::Ready(_) => EntryStatus::Expired,
        })
    }

    /// Number of keys with an entry, fresh or not.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn spawn_fetch(&self, key: SourceKey, id: u64) -> PendingBadge {
        let (tx, rx) = oneshot::channel();
        let inner = Arc::clone(&self.inner);

        tokio::spawn(async move {
            tracing::debug!(source_key = %key, "Badge cache miss, fetching");
            let result = inner.client.fetch_badge(&key).await;

            {
                let mut entries = lock_entries(&inner.entries);
                let ours = entries.get(&key).is_some_and(|e| e.id == id);
                match &result {
                    Ok(badge) if ours => {
                        entries.insert(
                            key.clone(),
                            CacheEntry {
                                expires_at: Instant::now() + inner.ttl,
                                id,
                                state: EntryState::Ready(badge.clone()),
                            },
                        );
                    }
                    Err(e) => {
                        tracing::debug!(source_key = %key, error = %e, "Badge fetch failed, evicting");
                        if ours {
                            entries.remove(&key);
                        }
                    }
                    Ok(_) => {}
                }
            }

            // Every waiter may have gone away; the cache is already updated.
            let _ = tx.send(result);
        });

        async move { rx.await.unwrap_or(Err(FetchError::Interrupted)) }
            .boxed()
            .shared()
    }

    fn evict(&self, key: &SourceKey, id: u64) {
        let mut entries = self.lock();
        if entries.get(key).is_some_and(|e| e.id == id) {
            entries.remove(key);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SourceKey, CacheEntry>> {
        lock_entries(&self.inner.entries)
    }
}

// The map is never left half-updated, so a poisoned lock is still usable.
fn lock_entries(
    entries: &Mutex<HashMap<SourceKey, CacheEntry>>,
) -> MutexGuard<'_, HashMap<SourceKey, CacheEntry>> {
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
