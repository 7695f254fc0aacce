//! HTTP adapters for the ScholarStream REST API.
//!
//! [`HttpClient`] comes in two flavors: public (no credentials) and
//! authenticated (bearer token from the current session, sent only after the
//! session has resolved). [`ScholarStreamApi`] layers typed resource calls on
//! top of both.

mod api;
mod client;

pub use api::{ScholarStreamApi, ScholarshipFilter};
pub use client::HttpClient;
