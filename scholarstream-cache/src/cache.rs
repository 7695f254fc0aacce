use std::any::Any;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use scholarstream_core::ClientError;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::key::QueryKey;
use crate::observer::QueryObserver;
use crate::state::{QueryState, QueryStatus};

type Erased = Arc<dyn Any + Send + Sync>;

struct InFlight {
    seq: u64,
    done: watch::Receiver<bool>,
}

struct Entry {
    data: Option<Erased>,
    error: Option<ClientError>,
    status: QueryStatus,
    updated_at: Option<Instant>,
    /// Fetches with a sequence number at or below this value were issued
    /// before the latest invalidation.
    stale_through: u64,
    /// Sequence number of the newest fetch whose outcome was applied.
    applied_seq: u64,
    in_flight: Option<InFlight>,
    version: watch::Sender<u64>,
}

impl Entry {
    fn new() -> Self {
        let (version, _) = watch::channel(0);
        Self {
            data: None,
            error: None,
            status: QueryStatus::Pending,
            updated_at: None,
            stale_through: 0,
            applied_seq: 0,
            in_flight: None,
            version,
        }
    }

    fn is_stale(&self, ttl: Option<Duration>) -> bool {
        if self.status != QueryStatus::Success || self.applied_seq <= self.stale_through {
            return true;
        }
        match (ttl, self.updated_at) {
            (Some(ttl), Some(at)) => at.elapsed() >= ttl,
            _ => false,
        }
    }

    /// The in-flight fetch, if one is running and was issued after the
    /// latest invalidation.
    fn joinable(&self) -> Option<watch::Receiver<bool>> {
        let in_flight = self.in_flight.as_ref()?;
        if in_flight.seq <= self.stale_through {
            return None;
        }
        // A closed channel without a result means the fetch task died.
        if in_flight.done.has_changed().is_err() && !*in_flight.done.borrow() {
            return None;
        }
        Some(in_flight.done.clone())
    }

    fn bump(&self) {
        self.version.send_modify(|v| *v = v.wrapping_add(1));
    }
}

struct CacheInner {
    entries: DashMap<QueryKey, Entry>,
    next_seq: AtomicU64,
    /// Completions with a sequence number at or below this value are dropped.
    cleared_through: AtomicU64,
    ttl: Option<Duration>,
}

/// Keyed, shared store of server-fetched data.
///
/// - concurrent reads of one key share a single in-flight fetch
/// - each fetch carries a sequence number; a completion older than the
///   newest applied one for its key is discarded
/// - a failed fetch keeps the last good data and records the error
/// - invalidation marks entries stale by key prefix so the next read refetches
///
/// Cloning is cheap and clones share the same store.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<CacheInner>,
}

enum Begin {
    Fresh,
    Join(watch::Receiver<bool>),
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache {
    /// Entries stay fresh until invalidated.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Entries also go stale `ttl` after their last successful fetch.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self::build(Some(ttl))
    }

    fn build(ttl: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                entries: DashMap::new(),
                next_seq: AtomicU64::new(0),
                cleared_through: AtomicU64::new(0),
                ttl,
            }),
        }
    }

    /// Return the entry for `key`, fetching it first if it is missing or stale.
    ///
    /// `fetcher` is only invoked when no fresh data and no joinable in-flight
    /// fetch exist. The fetch itself runs on a spawned task, so dropping the
    /// returned future does not abort it; the result still lands in the cache.
    pub async fn query<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> QueryState<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        if let Begin::Join(mut done) = self.begin(&key, fetcher) {
            if done.wait_for(|finished| *finished).await.is_err() {
                warn!(key = %key, "Fetch task ended without a result");
                let mut state = self.peek::<T>(&key);
                if state.error.is_none() {
                    state.error = Some(ClientError::Cancelled);
                    if state.data.is_none() {
                        state.status = QueryStatus::Error;
                    }
                }
                return state;
            }
        }
        self.peek(&key)
    }

    /// Return the current snapshot immediately, starting a background fetch
    /// if the entry is missing or stale. Must be called within a Tokio runtime.
    pub fn read<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> QueryState<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let _ = self.begin(&key, fetcher);
        self.peek(&key)
    }

    /// Invalidate `key` exactly, then query it.
    pub async fn refetch<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> QueryState<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        self.invalidate(|k| k == &key);
        self.query(key, fetcher).await
    }

    /// Current snapshot without fetching.
    pub fn peek<T>(&self, key: &QueryKey) -> QueryState<T>
    where
        T: Clone + 'static,
    {
        let Some(entry) = self.inner.entries.get(key) else {
            return QueryState::pending();
        };
        let data = match &entry.data {
            Some(any) => match any.downcast_ref::<T>() {
                Some(value) => Some(value.clone()),
                None => {
                    return QueryState {
                        data: None,
                        status: QueryStatus::Error,
                        error: Some(ClientError::Decode(format!(
                            "cached value for '{key}' has a different type"
                        ))),
                        is_fetching: entry.in_flight.is_some(),
                        is_stale: true,
                        updated_at: entry.updated_at,
                    }
                }
            },
            None => None,
        };
        QueryState {
            data,
            status: entry.status,
            error: entry.error.clone(),
            is_fetching: entry.in_flight.is_some(),
            is_stale: entry.is_stale(self.inner.ttl),
            updated_at: entry.updated_at,
        }
    }

    /// Replace the data for `key` directly, as if a fetch had just succeeded.
    pub fn set<T>(&self, key: QueryKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.apply(&key, seq, Ok(Arc::new(value) as Erased));
    }

    /// Mark every entry whose key satisfies `predicate` as stale.
    ///
    /// In-flight fetches for those entries stop being joinable: the next
    /// read issues a fresh request. Returns the number of entries touched.
    pub fn invalidate<P>(&self, predicate: P) -> usize
    where
        P: Fn(&QueryKey) -> bool,
    {
        let issued = self.inner.next_seq.load(Ordering::SeqCst);
        let mut count = 0;
        for mut entry in self.inner.entries.iter_mut() {
            if predicate(entry.key()) {
                entry.stale_through = issued;
                entry.bump();
                count += 1;
            }
        }
        count
    }

    /// Invalidate every entry whose key starts with `prefix`.
    pub fn invalidate_prefix(&self, prefix: &QueryKey) -> usize {
        let count = self.invalidate(|key| key.starts_with(prefix));
        debug!(prefix = %prefix, count, "Invalidated cache entries");
        count
    }

    /// Run a write, then invalidate `prefixes` if and only if it succeeded.
    pub async fn mutate<T, Fut, I>(&self, write: Fut, prefixes: I) -> Result<T, ClientError>
    where
        Fut: Future<Output = Result<T, ClientError>>,
        I: IntoIterator<Item = QueryKey>,
    {
        let result = write.await;
        match &result {
            Ok(_) => {
                for prefix in prefixes {
                    self.invalidate_prefix(&prefix);
                }
            }
            Err(err) => warn!(error = %err, "Mutation failed; cache left untouched"),
        }
        result
    }

    /// Subscribe to changes of `key` (fetch start, completion, invalidation).
    pub fn observe(&self, key: QueryKey) -> QueryObserver {
        let rx = self.version_receiver(&key);
        QueryObserver::new(self.clone(), key, rx)
    }

    pub(crate) fn version_receiver(&self, key: &QueryKey) -> watch::Receiver<u64> {
        self.inner
            .entries
            .entry(key.clone())
            .or_insert_with(Entry::new)
            .version
            .subscribe()
    }

    /// Drop every entry. Completions of fetches still in flight are discarded.
    pub fn clear(&self) {
        let issued = self.inner.next_seq.load(Ordering::SeqCst);
        self.inner.cleared_through.store(issued, Ordering::SeqCst);
        for entry in self.inner.entries.iter() {
            entry.bump();
        }
        self.inner.entries.clear();
        debug!("Query cache cleared");
    }

    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    fn begin<T, F, Fut>(&self, key: &QueryKey, fetcher: F) -> Begin
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        let mut entry = self
            .inner
            .entries
            .entry(key.clone())
            .or_insert_with(Entry::new);
        if !entry.is_stale(self.inner.ttl) {
            return Begin::Fresh;
        }
        if let Some(done) = entry.joinable() {
            debug!(key = %key, "Joining in-flight fetch");
            return Begin::Join(done);
        }
        let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let (done_tx, done_rx) = watch::channel(false);
        entry.in_flight = Some(InFlight {
            seq,
            done: done_rx.clone(),
        });
        entry.bump();
        drop(entry);

        debug!(key = %key, seq, "Fetching");
        let fut = fetcher();
        let cache = self.clone();
        let key = key.clone();
        tokio::spawn(async move {
            let outcome = fut.await.map(|value| Arc::new(value) as Erased);
            cache.apply(&key, seq, outcome);
            let _ = done_tx.send(true);
        });
        Begin::Join(done_rx)
    }

    fn apply(&self, key: &QueryKey, seq: u64, outcome: Result<Erased, ClientError>) {
        if seq <= self.inner.cleared_through.load(Ordering::SeqCst) {
            debug!(key = %key, seq, "Discarding completion issued before clear");
            return;
        }
        let mut entry = self
            .inner
            .entries
            .entry(key.clone())
            .or_insert_with(Entry::new);
        if entry.in_flight.as_ref().is_some_and(|f| f.seq == seq) {
            entry.in_flight = None;
        }
        if seq <= entry.applied_seq {
            debug!(key = %key, seq, applied = entry.applied_seq, "Discarding out-of-order completion");
            entry.bump();
            return;
        }
        entry.applied_seq = seq;
        match outcome {
            Ok(value) => {
                entry.data = Some(value);
                entry.error = None;
                entry.status = QueryStatus::Success;
                entry.updated_at = Some(Instant::now());
            }
            Err(err) => {
                warn!(key = %key, error = %err, "Fetch failed");
                entry.error = Some(err);
                entry.status = QueryStatus::Error;
            }
        }
        entry.bump();
    }
}
