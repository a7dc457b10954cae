//! Cache-backed reads with request coalescing and invalidation.
//!
//! [`QueryClient`] owns the cache. [`Query`] is a read hook: a key, a
//! fetcher and an `enabled` flag. Reading through a query serves fresh
//! cached data without a network call, otherwise issues at most one request
//! per key at a time and stores the unwrapped payload.
//!
//! # Ordering
//!
//! Every key carries a generation. Invalidations and direct writes bump it;
//! a fetch remembers the generation it started under and only writes its
//! result back if nothing newer happened in between. Callers awaiting an
//! outdated fetch still receive its result.
//!
//! # Subscriptions
//!
//! [`Query::watch`] yields a stream of [`QueryState`]s: the current cache
//! state, the result of any fetch it triggers, and a fresh state after each
//! invalidation or direct write that touches its key. Dropping the stream
//! stops delivery; an in-flight request still completes and lands in the
//! cache.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use futures::future::{BoxFuture, Shared};
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, Erased};
use crate::config::QueryConfig;
use crate::error::ApiError;
use crate::keys::QueryKey;

/// Notifications broadcast to watchers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// Every key starting with this prefix went stale.
    Invalidated(QueryKey),
    /// The entry for exactly this key was written.
    Updated(QueryKey),
    /// The entry for exactly this key was dropped.
    Removed(QueryKey),
    /// The whole cache was torn down.
    Cleared,
}

/// What a screen sees for one query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryState<T> {
    /// The query is disabled and will not fetch.
    Idle,
    /// Nothing cached yet; a fetch is pending or about to start.
    Loading,
    Success {
        data: T,
        /// Whether the data should be refetched.
        is_stale: bool,
    },
    /// The last fetch failed. `data` is the last good value, if any.
    Error { error: ApiError, data: Option<T> },
}

impl<T> QueryState<T> {
    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Success { data, .. } => Some(data),
            QueryState::Error { data, .. } => data.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            QueryState::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    pub const fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub const fn is_success(&self) -> bool {
        matches!(self, QueryState::Success { .. })
    }

    pub const fn is_error(&self) -> bool {
        matches!(self, QueryState::Error { .. })
    }

    pub const fn is_stale(&self) -> bool {
        matches!(self, QueryState::Success { is_stale: true, .. })
    }
}

pub type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync>;

type InFlight = Shared<BoxFuture<'static, Result<Erased, ApiError>>>;

/// The query cache. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct QueryClient {
    cache: Arc<DashMap<QueryKey, CacheEntry>>,
    in_flight: Arc<DashMap<QueryKey, (u64, InFlight)>>,
    generations: Arc<DashMap<QueryKey, u64>>,
    writes: Arc<DashSet<QueryKey>>,
    revision: Arc<AtomicU64>,
    events: broadcast::Sender<CacheEvent>,
    config: QueryConfig,
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.cache.len())
            .field("in_flight", &self.in_flight.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for QueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryClient {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(QueryConfig::default())
    }

    #[must_use]
    pub fn with_config(config: QueryConfig) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            cache: Arc::new(DashMap::new()),
            in_flight: Arc::new(DashMap::new()),
            generations: Arc::new(DashMap::new()),
            writes: Arc::new(DashSet::new()),
            revision: Arc::new(AtomicU64::new(1)),
            events,
            config,
        }
    }

    pub const fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.events.subscribe()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        self.cache.contains_key(key)
    }

    pub fn is_fetching(&self, key: &QueryKey) -> bool {
        self.in_flight.contains_key(key)
    }

    /// Whether the entry for `key` must be refetched on next read.
    pub fn is_stale(&self, key: &QueryKey) -> bool {
        match self.cache.get_mut(key) {
            Some(mut entry) => entry.check_staleness(self.config.stale_time) || entry.error.is_some(),
            None => true,
        }
    }

    pub fn get_query_data<T: Clone + 'static>(&self, key: &QueryKey) -> Option<T> {
        self.cache.get(key).and_then(|entry| entry.downcast::<T>())
    }

    /// Direct write: replace the entry for `key` without a network call.
    pub fn set_query_data<T: Clone + Send + Sync + 'static>(&self, key: QueryKey, data: T) {
        self.bump_generation(&key);
        self.in_flight.remove(&key);
        let revision = self.next_revision();
        let data: Erased = Arc::new(data);
        self.cache
            .entry(key.clone())
            .and_modify(|entry| entry.update(data.clone(), revision))
            .or_insert_with(|| CacheEntry::new(data, revision));
        debug!(key = %key, "cache entry written");
        self.emit(CacheEvent::Updated(key));
    }

    /// Read-modify-write of a typed entry; returning `None` removes it.
    pub fn update_query_data<T, F>(&self, key: QueryKey, f: F)
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(Option<T>) -> Option<T>,
    {
        match f(self.get_query_data::<T>(&key)) {
            Some(data) => self.set_query_data(key, data),
            None => self.remove_query(&key),
        }
    }

    /// Fold `f` into the cached value without touching its freshness or a
    /// fetch in flight. Nothing happens, and `false` is returned, when the
    /// key was invalidated, written or removed since `generation` was read.
    pub(crate) fn merge_query_data<T, F>(&self, key: &QueryKey, generation: u64, f: F) -> bool
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce(T) -> T,
    {
        let merged = match self.cache.get_mut(key) {
            Some(mut entry) if self.generation(key) == generation => match entry.downcast::<T>() {
                Some(current) => {
                    let revision = self.next_revision();
                    entry.replace_data(Arc::new(f(current)), revision);
                    true
                }
                None => false,
            },
            _ => false,
        };
        if merged {
            self.emit(CacheEvent::Updated(key.clone()));
        } else {
            debug!(key = %key, "entry changed underneath, merge skipped");
        }
        merged
    }

    pub fn remove_query(&self, key: &QueryKey) {
        self.bump_generation(key);
        self.in_flight.remove(key);
        if self.cache.remove(key).is_some() {
            debug!(key = %key, "cache entry removed");
        }
        self.emit(CacheEvent::Removed(key.clone()));
    }

    /// Mark every entry under `prefix` stale and notify watchers, which
    /// refetch. Returns the number of cached entries affected.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let mut touched = Vec::new();
        for mut entry in self.cache.iter_mut() {
            if entry.key().starts_with(prefix) {
                entry.mark_stale();
                touched.push(entry.key().clone());
            }
        }
        let pending: Vec<QueryKey> = self
            .in_flight
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();
        for key in &pending {
            self.in_flight.remove(key);
        }
        for key in touched.iter().chain(&pending) {
            self.bump_generation(key);
        }
        debug!(prefix = %prefix, entries = touched.len(), "invalidated");
        self.emit(CacheEvent::Invalidated(prefix.clone()));
        touched.len()
    }

    /// Drop every entry and forget pending fetches. Fetches already running
    /// are outdated by this and will not write back.
    pub fn clear(&self) {
        let pending: Vec<QueryKey> = self.in_flight.iter().map(|e| e.key().clone()).collect();
        for key in &pending {
            self.bump_generation(key);
        }
        self.in_flight.clear();
        self.cache.clear();
        debug!("query cache cleared");
        self.emit(CacheEvent::Cleared);
    }

    /// Remove entries not written for longer than `cache_time` and not
    /// currently being fetched.
    pub fn collect_garbage(&self) -> usize {
        let cache_time = self.config.cache_time;
        let before = self.cache.len();
        self.cache
            .retain(|key, entry| !entry.should_gc(cache_time) || self.in_flight.contains_key(key));
        before - self.cache.len()
    }

    /// Reserve `key` for one optimistic write. `None` while another write
    /// to the same key has not settled.
    pub(crate) fn claim_write(&self, key: &QueryKey) -> Option<WriteClaim> {
        self.writes.insert(key.clone()).then(|| WriteClaim {
            writes: self.writes.clone(),
            key: key.clone(),
        })
    }

    fn emit(&self, event: CacheEvent) {
        // No receivers is not an error: nobody is watching.
        let _ = self.events.send(event);
    }

    fn next_revision(&self) -> u64 {
        self.revision.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn generation(&self, key: &QueryKey) -> u64 {
        self.generations.get(key).map(|g| *g).unwrap_or(0)
    }

    fn bump_generation(&self, key: &QueryKey) {
        *self.generations.entry(key.clone()).or_insert(0) += 1;
    }

    /// Snapshot of `key` as a `QueryState`, plus the entry's revision.
    fn snapshot<T: Clone + 'static>(&self, key: &QueryKey) -> (u64, QueryState<T>) {
        let Some(mut entry) = self.cache.get_mut(key) else {
            return (0, QueryState::Loading);
        };
        let is_stale = entry.check_staleness(self.config.stale_time);
        let data = entry.downcast::<T>();
        let state = match (&entry.error, data) {
            (Some(error), data) => QueryState::Error {
                error: error.clone(),
                data,
            },
            (None, Some(data)) => QueryState::Success { data, is_stale },
            (None, None) => QueryState::Loading,
        };
        (entry.revision, state)
    }

    /// Serve from cache when fresh, otherwise join or start the fetch.
    async fn fetch<T>(&self, key: &QueryKey, fetcher: &Fetcher<T>, force: bool) -> Result<T, ApiError>
    where
        T: Clone + Send + Sync + 'static,
    {
        if !force && !self.is_stale(key) {
            if let Some(data) = self.get_query_data::<T>(key) {
                return Ok(data);
            }
        }
        let task = self.start_or_join(key, fetcher);
        let erased = task.await?;
        erased
            .downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| ApiError::Shape(format!("cached value for {key} has a different type")))
    }

    fn start_or_join<T>(&self, key: &QueryKey, fetcher: &Fetcher<T>) -> InFlight
    where
        T: Clone + Send + Sync + 'static,
    {
        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(occupied) => {
                debug!(key = %key, "joining in-flight fetch");
                occupied.get().1.clone()
            }
            Entry::Vacant(vacant) => {
                let generation = self.generation(key);
                let request = fetcher();
                let client = self.clone();
                let settle_key = key.clone();
                debug!(key = %key, "fetching");
                let task = async move {
                    let outcome = request.await.map(|data| Arc::new(data) as Erased);
                    client.settle(&settle_key, generation, &outcome);
                    outcome
                }
                .boxed()
                .shared();
                vacant.insert((generation, task.clone()));
                task
            }
        }
    }

    fn settle(&self, key: &QueryKey, generation: u64, outcome: &Result<Erased, ApiError>) {
        self.in_flight.remove_if(key, |_, (g, _)| *g == generation);
        if self.generation(key) != generation {
            debug!(key = %key, "discarding outdated response");
            return;
        }
        let revision = self.next_revision();
        match outcome {
            Ok(data) => {
                self.cache
                    .entry(key.clone())
                    .and_modify(|entry| entry.update(data.clone(), revision))
                    .or_insert_with(|| CacheEntry::new(data.clone(), revision));
            }
            Err(error) => {
                warn!(key = %key, error = %error, "fetch failed");
                self.cache
                    .entry(key.clone())
                    .and_modify(|entry| entry.record_error(error.clone(), revision))
                    .or_insert_with(|| CacheEntry::failed(error.clone(), revision));
            }
        }
        self.emit(CacheEvent::Updated(key.clone()));
    }
}

/// Released when dropped, whether the write settled or was abandoned.
pub(crate) struct WriteClaim {
    writes: Arc<DashSet<QueryKey>>,
    key: QueryKey,
}

impl Drop for WriteClaim {
    fn drop(&mut self) {
        self.writes.remove(&self.key);
    }
}

/// A read hook: key + fetcher + enabled flag.
pub struct Query<T> {
    key: QueryKey,
    fetcher: Fetcher<T>,
    client: QueryClient,
    enabled: bool,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            fetcher: self.fetcher.clone(),
            client: self.client.clone(),
            enabled: self.enabled,
        }
    }
}

impl<T> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("key", &self.key)
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl<T> Query<T> {
    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl<T> Query<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new<F>(key: QueryKey, fetcher: F, client: QueryClient) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<T, ApiError>> + Send + Sync + 'static,
    {
        Self {
            key,
            fetcher: Arc::new(fetcher),
            client,
            enabled: true,
        }
    }

    /// Gate the query, e.g. on an id being present or a tab being active.
    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }


    /// Current state from the cache, without any I/O.
    pub fn state(&self) -> QueryState<T> {
        if !self.enabled {
            return QueryState::Idle;
        }
        self.client.snapshot(&self.key).1
    }

    /// Cached data, fresh or stale.
    pub fn data(&self) -> Option<T> {
        self.client.get_query_data(&self.key)
    }

    pub fn is_fetching(&self) -> bool {
        self.client.is_fetching(&self.key)
    }

    pub async fn fetch(&self) -> Result<T, ApiError> {
        if !self.enabled {
            return Err(ApiError::QueryDisabled);
        }
        self.client.fetch(&self.key, &self.fetcher, false).await
    }

    /// Fetch regardless of freshness; the manual retry after an error.
    pub async fn refetch(&self) -> Result<T, ApiError> {
        if !self.enabled {
            return Err(ApiError::QueryDisabled);
        }
        self.client.fetch(&self.key, &self.fetcher, true).await
    }

    pub fn invalidate(&self) -> usize {
        self.client.invalidate(&self.key)
    }

    pub fn watch(&self) -> BoxStream<'static, QueryState<T>> {
        let query = self.clone();
        stream::unfold(Watch::Initial, move |state| {
            let query = query.clone();
            async move { query.step(state).await }
        })
        .boxed()
    }

    async fn step(&self, state: Watch) -> Option<(QueryState<T>, Watch)> {
        match state {
            Watch::Initial => {
                if !self.enabled {
                    return Some((QueryState::Idle, Watch::Done));
                }
                let rx = self.client.subscribe();
                let needs_fetch = self.client.is_stale(&self.key);
                let (revision, state) = self.client.snapshot::<T>(&self.key);
                if needs_fetch {
                    Some((state, Watch::Fetching { rx }))
                } else {
                    Some((state, Watch::Watching { rx, seen: revision }))
                }
            }

            Watch::Fetching { rx } => {
                if let Err(error) = self.client.fetch(&self.key, &self.fetcher, false).await {
                    debug!(key = %self.key, error = %error, "watched fetch failed");
                }
                let (seen, state) = self.client.snapshot::<T>(&self.key);
                Some((state, Watch::Watching { rx, seen }))
            }

            Watch::Watching { mut rx, seen } => loop {
                match rx.recv().await {
                    Ok(CacheEvent::Invalidated(prefix)) if self.key.starts_with(&prefix) => {
                        let (_, state) = self.client.snapshot::<T>(&self.key);
                        return Some((state, Watch::Fetching { rx }));
                    }
                    Ok(CacheEvent::Removed(key)) if key == self.key => {
                        return Some((QueryState::Loading, Watch::Fetching { rx }));
                    }
                    Ok(CacheEvent::Updated(key)) if key == self.key => {
                        let (revision, state) = self.client.snapshot::<T>(&self.key);
                        if revision != seen {
                            return Some((state, Watch::Watching { rx, seen: revision }));
                        }
                    }
                    Ok(CacheEvent::Cleared) => return None,
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => {
                        let (revision, state) = self.client.snapshot::<T>(&self.key);
                        return Some((state, Watch::Watching { rx, seen: revision }));
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            },

            Watch::Done => None,
        }
    }
}

/// Internal state machine for [`Query::watch`].
enum Watch {
    Initial,
    Fetching {
        rx: broadcast::Receiver<CacheEvent>,
    },
    Watching {
        rx: broadcast::Receiver<CacheEvent>,
        seen: u64,
    },
    Done,
}
