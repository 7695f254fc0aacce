//! Test utilities: an in-process mock of the ScholarStream REST API and
//! record fixtures.

pub mod fixtures;
mod mock;

pub use mock::{MockApi, RecordedRequest};
