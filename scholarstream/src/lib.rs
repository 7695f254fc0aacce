//! ScholarStream client.
//!
//! This facade re-exports the workspace crates through a single dependency
//! and wires them together from configuration:
//!
//! ```ignore
//! use scholarstream::prelude::*;
//!
//! let ctx = scholarstream::bootstrap("dev", InMemoryIdentityProvider::new())?;
//! let page = ScholarshipCatalog::new(ctx.clone());
//! let state = page.load().await;
//! ```
//!
//! | Crate                    | Provides                                        |
//! |--------------------------|-------------------------------------------------|
//! | `scholarstream-core`     | records, identity, errors, config, logging      |
//! | `scholarstream-cache`    | keyed query cache with invalidation              |
//! | `scholarstream-security` | session store, role resolver, route guards      |
//! | `scholarstream-http`     | public and authenticated REST clients           |
//! | `scholarstream-views`    | application context, page view models, routes   |

pub extern crate scholarstream_cache;
pub extern crate scholarstream_core;
pub extern crate scholarstream_http;
pub extern crate scholarstream_security;
pub extern crate scholarstream_views;

mod bootstrap;
pub mod prelude;

pub use bootstrap::{bootstrap, bootstrap_from, BootstrapError};
pub use scholarstream_core::*;
