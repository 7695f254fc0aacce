//! Everything a page host needs with a single `use`.

pub use scholarstream_cache::{QueryCache, QueryKey, QueryObserver, QueryState, QueryStatus};
pub use scholarstream_core::{
    init_tracing, Application, AuthError, ClientError, ClientSettings, Identity, Review, Role,
    RoleError, ScholarConfig, Scholarship, UserRecord,
};
pub use scholarstream_http::{ScholarStreamApi, ScholarshipFilter};
pub use scholarstream_security::{
    AuthenticatedGuard, Gate, GuardDecision, IdentityProvider, InMemoryIdentityProvider,
    Rejection, RoleGuard, RoleResolver, RoleStatus, SessionState, SessionStore,
};
pub use scholarstream_views::derive::FeeOrder;
pub use scholarstream_views::pages::*;
pub use scholarstream_views::{
    AppContext, FieldError, FormError, GuardKind, Mutation, PageKind, PageScope, ReviewDraft,
    RouteTable,
};

pub use crate::{bootstrap, BootstrapError};
