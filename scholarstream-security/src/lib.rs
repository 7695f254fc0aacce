//! Session, role, and route-guard layer for the ScholarStream client.
//!
//! - [`SessionStore`]: three-state (`Unknown` / `Present` / `Absent`) identity
//!   store fed by an [`IdentityProvider`]
//! - [`RoleResolver`]: fail-closed role lookup cached per identity
//! - [`Guard`]s and [`Gate`]: route gating that stays `Pending` until the
//!   session and role have resolved

pub mod guards;
pub mod memory;
pub mod provider;
pub mod roles;
pub mod session;

pub use guards::{
    evaluate, AuthenticatedGuard, Gate, Guard, GuardContext, GuardDecision, Rejection, RoleGuard,
    FORBIDDEN_MESSAGE,
};
pub use memory::InMemoryIdentityProvider;
pub use provider::IdentityProvider;
pub use roles::{RoleResolver, RoleSource, RoleStatus};
pub use session::{SessionState, SessionStore, SessionSubscription};
