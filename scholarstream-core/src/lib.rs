//! Shared types for the ScholarStream client: the records exchanged with the
//! REST API, identity and role types, the error taxonomy, configuration,
//! and logging setup.

pub mod config;
pub mod error;
pub mod identity;
pub mod logging;
pub mod model;

pub use config::{ClientSettings, ConfigError, ConfigValue, ScholarConfig};
pub use error::{AuthError, ClientError, RoleError};
pub use identity::{Identity, ProfileUpdate, Role, RoleRecord};
pub use logging::init_tracing;
pub use model::{
    Application, ApplicationPatch, CheckoutRequest, CheckoutSession, InsertResult, Review,
    ReviewPatch, RoleLookup, RolePatch, Scholarship, ScholarshipPatch, UserRecord, WriteResult,
};

/// Convenience alias used across the workspace.
pub type ClientResult<T> = Result<T, ClientError>;
