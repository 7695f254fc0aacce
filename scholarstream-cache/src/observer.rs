use tokio::sync::watch;

use crate::cache::QueryCache;
use crate::key::QueryKey;
use crate::state::QueryState;

/// Change feed for a single cache entry.
///
/// Wakes on fetch start, fetch completion, invalidation and clear. After a
/// clear the observer re-attaches to the fresh entry for the same key.
pub struct QueryObserver {
    cache: QueryCache,
    key: QueryKey,
    rx: watch::Receiver<u64>,
}

impl QueryObserver {
    pub(crate) fn new(cache: QueryCache, key: QueryKey, rx: watch::Receiver<u64>) -> Self {
        Self { cache, key, rx }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Wait for the next change to the entry.
    pub async fn changed(&mut self) {
        if self.rx.changed().await.is_err() {
            self.rx = self.cache.version_receiver(&self.key);
        }
    }

    /// Current snapshot of the observed entry.
    pub fn current<T: Clone + 'static>(&self) -> QueryState<T> {
        self.cache.peek(&self.key)
    }
}
