//! Query cache with tag-driven invalidation.
//!
//! Each distinct query owns one entry holding a `watch` channel of its
//! [`QueryState`]. Subscribers read the channel; the cache is the only
//! writer. All entries and the [`TagRegistry`] live behind a single mutex
//! which is never held across an await point.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use metrics::counter;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::config::CacheConfig;
use super::keys::{Tag, display_tags};
use super::lock::MapLock;
use super::query::{CacheQuery, FetchError, QueryFetcher, QueryState, QueryStatus};
use super::registry::TagRegistry;

const METRIC_CACHE_HIT: &str = "libris_cache_hit_total";
const METRIC_CACHE_MISS: &str = "libris_cache_miss_total";
const METRIC_CACHE_EVICT: &str = "libris_cache_evict_total";

/// Identifies one network request issued for an entry.
type FetchId = u64;

/// Result of an invalidation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InvalidationOutcome {
    /// Entries whose provided tags intersected the invalidated set.
    pub marked_stale: usize,
    /// Of those, entries with subscribers that were re-fetched immediately.
    pub refetched: usize,
}

impl InvalidationOutcome {
    pub fn is_noop(&self) -> bool {
        self.marked_stale == 0
    }
}

/// Anything that can receive tag invalidations.
pub trait TagInvalidator: Send + Sync {
    fn invalidate(&self, tags: &[Tag]) -> InvalidationOutcome;
}

struct Entry<D> {
    state: watch::Sender<QueryState<D>>,
    subscribers: usize,
    in_flight: Option<FetchId>,
    released_at: Option<Instant>,
}

impl<D> Entry<D> {
    fn new() -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            state,
            subscribers: 0,
            in_flight: None,
            released_at: None,
        }
    }

    fn needs_fetch(&self) -> bool {
        if self.in_flight.is_some() {
            return false;
        }
        let state = self.state.borrow();
        state.status != QueryStatus::Success || state.is_stale
    }
}

struct CacheMap<Q: CacheQuery> {
    entries: HashMap<Q, Entry<Q::Data>>,
    registry: TagRegistry<Q>,
}

struct Inner<Q: CacheQuery> {
    fetcher: Arc<dyn QueryFetcher<Q>>,
    map: MapLock<CacheMap<Q>>,
    next_fetch_id: AtomicU64,
    config: CacheConfig,
}

impl<Q: CacheQuery> Inner<Q> {
    fn begin_fetch(&self, entry: &mut Entry<Q::Data>) -> FetchId {
        let fetch_id = self.next_fetch_id.fetch_add(1, Ordering::Relaxed);
        entry.in_flight = Some(fetch_id);
        entry.state.send_modify(|state| {
            state.is_fetching = true;
            if state.data.is_none() {
                state.status = QueryStatus::Loading;
                state.error = None;
            }
        });
        fetch_id
    }

    fn spawn_fetch(self: &Arc<Self>, query: Q, fetch_id: FetchId) {
        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let result = inner.fetcher.fetch(&query).await;
            inner.settle(&query, fetch_id, result);
        });
    }

    fn settle(&self, query: &Q, fetch_id: FetchId, result: Result<Q::Data, FetchError>) {
        let mut map = self.map.acquire("settle");
        let Some(entry) = map.entries.get_mut(query) else {
            debug!(
                operation = query.operation(),
                fetch_id, "Discarding response for evicted query"
            );
            return;
        };
        if entry.in_flight != Some(fetch_id) {
            debug!(
                operation = query.operation(),
                fetch_id, "Discarding superseded response"
            );
            return;
        }

        entry.in_flight = None;
        let next = match result {
            Ok(data) => QueryState {
                status: QueryStatus::Success,
                data: Some(data),
                error: None,
                is_fetching: false,
                is_stale: false,
            },
            Err(error) => {
                warn!(
                    operation = query.operation(),
                    query = ?query,
                    error = %error,
                    "Query fetch failed"
                );
                QueryState {
                    status: QueryStatus::Error,
                    data: None,
                    error: Some(error),
                    is_fetching: false,
                    is_stale: false,
                }
            }
        };
        entry.state.send_replace(next);
    }

    fn refetch(self: &Arc<Self>, query: &Q) -> bool {
        let fetch_id = {
            let mut map = self.map.acquire("refetch");
            match map.entries.get_mut(query) {
                Some(entry) if entry.in_flight.is_none() => Some(self.begin_fetch(entry)),
                _ => None,
            }
        };

        match fetch_id {
            Some(fetch_id) => {
                debug!(operation = query.operation(), fetch_id, "Explicit refetch");
                self.spawn_fetch(query.clone(), fetch_id);
                true
            }
            None => false,
        }
    }

    fn release(&self, query: &Q) {
        let mut map = self.map.acquire("release");
        let CacheMap { entries, registry } = &mut *map;
        let Some(entry) = entries.get_mut(query) else {
            return;
        };

        entry.subscribers = entry.subscribers.saturating_sub(1);
        if entry.subscribers > 0 {
            return;
        }

        if self.config.keep_unused_for.is_zero() {
            entries.remove(query);
            registry.unregister(query);
            counter!(METRIC_CACHE_EVICT, "operation" => query.operation()).increment(1);
            debug!(operation = query.operation(), "Evicted released query");
        } else {
            entry.released_at = Some(Instant::now());
        }
    }

    fn sweep(&self) -> usize {
        let now = Instant::now();
        let keep_unused_for = self.config.keep_unused_for;

        let mut map = self.map.acquire("sweep");
        let CacheMap { entries, registry } = &mut *map;

        let expired: Vec<Q> = entries
            .iter()
            .filter(|(_, entry)| {
                entry.subscribers == 0
                    && entry
                        .released_at
                        .is_some_and(|at| now.duration_since(at) >= keep_unused_for)
            })
            .map(|(query, _)| query.clone())
            .collect();

        for query in &expired {
            entries.remove(query);
            registry.unregister(query);
            counter!(METRIC_CACHE_EVICT, "operation" => query.operation()).increment(1);
        }

        if !expired.is_empty() {
            debug!(evicted = expired.len(), "Evicted unused queries");
        }
        expired.len()
    }
}

/// Shared cache of query results.
///
/// Cloning is cheap and yields a handle to the same cache.
pub struct QueryCache<Q: CacheQuery> {
    inner: Arc<Inner<Q>>,
}

impl<Q: CacheQuery> Clone for QueryCache<Q> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<Q: CacheQuery> QueryCache<Q> {
    pub fn new(fetcher: Arc<dyn QueryFetcher<Q>>, config: CacheConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                fetcher,
                map: MapLock::new(CacheMap {
                    entries: HashMap::new(),
                    registry: TagRegistry::new(),
                }),
                next_fetch_id: AtomicU64::new(0),
                config,
            }),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    /// Subscribe to `query`, fetching it if nothing usable is cached.
    ///
    /// Fresh cached data is visible through [`Subscription::current`] right
    /// away with no request. Stale or errored entries keep whatever they hold
    /// and re-fetch in the background; an equal query already in flight is
    /// joined rather than repeated. Must be called within a Tokio runtime.
    pub fn subscribe(&self, query: Q) -> Subscription<Q> {
        let (receiver, fetch_id) = {
            let mut map = self.inner.map.acquire("subscribe");
            let CacheMap { entries, registry } = &mut *map;
            let entry = entries.entry(query.clone()).or_insert_with(|| {
                registry.register(query.clone(), query.provides());
                Entry::new()
            });

            entry.subscribers += 1;
            entry.released_at = None;
            let fetch_id = entry
                .needs_fetch()
                .then(|| self.inner.begin_fetch(entry));
            (entry.state.subscribe(), fetch_id)
        };

        match fetch_id {
            Some(fetch_id) => {
                counter!(METRIC_CACHE_MISS, "operation" => query.operation()).increment(1);
                debug!(operation = query.operation(), fetch_id, "Query cache miss");
                self.inner.spawn_fetch(query.clone(), fetch_id);
            }
            None => {
                counter!(METRIC_CACHE_HIT, "operation" => query.operation()).increment(1);
            }
        }

        Subscription {
            inner: Arc::clone(&self.inner),
            query,
            receiver,
        }
    }

    /// Alias of [`QueryCache::subscribe`].
    pub fn query(&self, query: Q) -> Subscription<Q> {
        self.subscribe(query)
    }

    /// Mark every entry providing one of `tags` stale.
    ///
    /// Entries with subscribers re-fetch at once, superseding any older
    /// request. Entries without subscribers wait for their next subscription
    /// and drop any response still in flight.
    pub fn invalidate(&self, tags: &[Tag]) -> InvalidationOutcome {
        let mut outcome = InvalidationOutcome::default();

        let refetch = {
            let mut map = self.inner.map.acquire("invalidate");
            let CacheMap { entries, registry } = &mut *map;

            let mut refetch = Vec::new();
            for query in registry.queries_for_tags(tags) {
                let Some(entry) = entries.get_mut(&query) else {
                    continue;
                };
                outcome.marked_stale += 1;

                if entry.subscribers > 0 {
                    entry.state.send_modify(|state| state.is_stale = true);
                    let fetch_id = self.inner.begin_fetch(entry);
                    refetch.push((query, fetch_id));
                } else {
                    entry.in_flight = None;
                    entry.state.send_modify(|state| {
                        state.is_stale = true;
                        state.is_fetching = false;
                        if state.status == QueryStatus::Loading {
                            state.status = QueryStatus::Uninitialized;
                        }
                    });
                }
            }
            refetch
        };

        outcome.refetched = refetch.len();
        for (query, fetch_id) in refetch {
            self.inner.spawn_fetch(query, fetch_id);
        }

        if outcome.is_noop() {
            debug!(tags = %display_tags(tags), "Invalidation matched no cached queries");
        } else {
            info!(
                tags = %display_tags(tags),
                marked_stale = outcome.marked_stale,
                refetched = outcome.refetched,
                "Invalidated cached queries"
            );
        }
        outcome
    }

    /// Re-issue the request for a cached query unless one is in flight.
    ///
    /// Returns whether a request was started. Nothing happens for unknown
    /// queries.
    pub fn refetch(&self, query: &Q) -> bool {
        self.inner.refetch(query)
    }

    /// Current state of `query` without subscribing to it.
    pub fn snapshot(&self, query: &Q) -> QueryState<Q::Data> {
        let map = self.inner.map.acquire("snapshot");
        map.entries
            .get(query)
            .map(|entry| entry.state.borrow().clone())
            .unwrap_or_default()
    }

    pub fn subscriber_count(&self, query: &Q) -> usize {
        let map = self.inner.map.acquire("subscriber_count");
        map.entries
            .get(query)
            .map(|entry| entry.subscribers)
            .unwrap_or(0)
    }

    pub fn contains(&self, query: &Q) -> bool {
        self.inner.map.acquire("contains")
            .entries
            .contains_key(query)
    }

    pub fn len(&self) -> usize {
        self.inner.map.acquire("len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict entries that have had no subscribers for the retention period.
    pub fn sweep(&self) -> usize {
        self.inner.sweep()
    }

    /// Periodically run [`QueryCache::sweep`] until every cache handle is dropped.
    pub fn spawn_eviction_sweeper(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.sweep_interval_non_zero();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.sweep();
            }
        })
    }
}

impl<Q: CacheQuery> TagInvalidator for QueryCache<Q> {
    fn invalidate(&self, tags: &[Tag]) -> InvalidationOutcome {
        QueryCache::invalidate(self, tags)
    }
}

/// A consumer's handle on one cache entry.
///
/// Dropping the subscription releases the entry.
pub struct Subscription<Q: CacheQuery> {
    inner: Arc<Inner<Q>>,
    query: Q,
    receiver: watch::Receiver<QueryState<Q::Data>>,
}

impl<Q: CacheQuery> Subscription<Q> {
    pub fn query(&self) -> &Q {
        &self.query
    }

    pub fn current(&self) -> QueryState<Q::Data> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next update of the entry.
    ///
    /// Returns `None` once the entry can no longer change.
    pub async fn changed(&mut self) -> Option<QueryState<Q::Data>> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Wait until no request is in flight for the entry.
    pub async fn settled(&mut self) -> QueryState<Q::Data> {
        let settled = self
            .receiver
            .wait_for(|state| !state.is_fetching)
            .await
            .map(|state| state.clone());
        settled.unwrap_or_else(|_| self.receiver.borrow().clone())
    }

    /// Retry affordance for errored or stale entries.
    pub fn refetch(&self) -> bool {
        self.inner.refetch(&self.query)
    }
}

impl<Q: CacheQuery> Drop for Subscription<Q> {
    fn drop(&mut self) {
        self.inner.release(&self.query);
    }
}

impl<Q: CacheQuery> std::fmt::Debug for Subscription<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("query", &self.query)
            .finish_non_exhaustive()
    }
}
