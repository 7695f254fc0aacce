use scholarstream_core::ClientError;
use tokio::time::Instant;

/// Outcome of the most recent fetch applied to an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueryStatus {
    /// Nothing has been applied yet.
    Pending,
    Success,
    /// The last applied fetch failed. Earlier data, if any, is still present.
    Error,
}

/// Snapshot of a cache entry as seen by a consumer.
#[derive(Clone, Debug)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub status: QueryStatus,
    pub error: Option<ClientError>,
    /// A fetch for this key is currently in flight.
    pub is_fetching: bool,
    /// The entry was invalidated (or outlived its TTL) and will be re-fetched on next read.
    pub is_stale: bool,
    pub updated_at: Option<Instant>,
}

impl<T> QueryState<T> {
    pub fn pending() -> Self {
        Self {
            data: None,
            status: QueryStatus::Pending,
            error: None,
            is_fetching: false,
            is_stale: true,
            updated_at: None,
        }
    }

    /// No data yet and nothing failed: render a loader.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.status == QueryStatus::Pending
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryState<U> {
        QueryState {
            data: self.data.map(f),
            status: self.status,
            error: self.error,
            is_fetching: self.is_fetching,
            is_stale: self.is_stale,
            updated_at: self.updated_at,
        }
    }

    /// Combine two snapshots. Data is present only when both are; the
    /// error of either side is kept.
    pub fn zip<U>(self, other: QueryState<U>) -> QueryState<(T, U)> {
        let status = match (self.status, other.status) {
            (QueryStatus::Error, _) | (_, QueryStatus::Error) => QueryStatus::Error,
            (QueryStatus::Success, QueryStatus::Success) => QueryStatus::Success,
            _ => QueryStatus::Pending,
        };
        QueryState {
            data: self.data.zip(other.data),
            status,
            error: self.error.or(other.error),
            is_fetching: self.is_fetching || other.is_fetching,
            is_stale: self.is_stale || other.is_stale,
            updated_at: self.updated_at.max(other.updated_at),
        }
    }

    /// Snapshot for a read that was abandoned before it completed.
    pub fn cancelled() -> Self {
        Self {
            status: QueryStatus::Error,
            error: Some(ClientError::Cancelled),
            ..Self::pending()
        }
    }

    /// Data if present, otherwise the error (or `Cancelled` if neither).
    pub fn into_result(self) -> Result<T, ClientError> {
        match (self.data, self.error) {
            (Some(data), _) => Ok(data),
            (None, Some(err)) => Err(err),
            (None, None) => Err(ClientError::Cancelled),
        }
    }
}

impl<T: Default> QueryState<T> {
    pub fn data_or_default(&self) -> T
    where
        T: Clone,
    {
        self.data.clone().unwrap_or_default()
    }
}
