//! Page-level composition for the ScholarStream client.
//!
//! [`AppContext`] bundles the process-wide pieces (session, roles, query
//! cache, REST API). Page view models in [`pages`] read through the cache,
//! derive what they show with the pure helpers in [`derive`], and write
//! through [`AppContext::mutate`], which applies the fixed invalidation map
//! in [`Mutation`]. [`RouteTable`] maps paths to pages and their guards.

pub mod context;
pub mod derive;
pub mod form;
pub mod keys;
pub mod mutations;
pub mod pages;
pub mod routes;
pub mod scope;

pub use context::AppContext;
pub use form::{FieldError, FormError, ReviewDraft};
pub use mutations::Mutation;
pub use routes::{GuardKind, PageKind, Route, RouteMatch, RouteTable};
pub use scope::PageScope;
