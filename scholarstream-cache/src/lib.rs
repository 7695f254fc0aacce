//! Shared query cache: keyed server data with request deduplication,
//! ordered completion, stale-while-error reads and prefix invalidation.

pub mod cache;
pub mod key;
pub mod observer;
pub mod state;

pub use cache::QueryCache;
pub use key::{KeyPart, QueryKey};
pub use observer::QueryObserver;
pub use state::{QueryState, QueryStatus};
