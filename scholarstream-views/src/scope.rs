use std::future::Future;

use scholarstream_cache::QueryState;
use scholarstream_core::ClientError;
use tokio_util::sync::CancellationToken;

/// Lifetime of one mounted page.
///
/// Reads awaited through the scope stop delivering results once the page is
/// left. The underlying fetch keeps running and still lands in the cache,
/// so nothing fetched is wasted; the page just no longer sees it.
#[derive(Debug)]
pub struct PageScope {
    token: CancellationToken,
}

impl PageScope {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// A scope that ends when `self` ends, or earlier via its own `leave`.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn leave(&self) {
        self.token.cancel();
    }

    /// Await `fut` unless the page is left first.
    pub async fn run<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }

    pub(crate) async fn read<T>(&self, fut: impl Future<Output = QueryState<T>>) -> QueryState<T> {
        self.run(fut).await.unwrap_or_else(QueryState::cancelled)
    }

    /// Writes are not interrupted once sent; they are only refused after
    /// the page is gone.
    pub(crate) fn ensure_active(&self) -> Result<(), ClientError> {
        if self.is_active() {
            Ok(())
        } else {
            Err(ClientError::Cancelled)
        }
    }
}

impl Default for PageScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PageScope {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
