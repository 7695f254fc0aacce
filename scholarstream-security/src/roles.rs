use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use scholarstream_core::{ClientError, Identity, Role, RoleError, RoleRecord};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::session::SessionState;

/// Where role names come from (the REST API's role lookup endpoint).
pub trait RoleSource: Send + Sync + 'static {
    /// The role name stored for `email`, or `None` if the record carries none.
    fn fetch_role(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<String>, ClientError>> + Send;
}

/// Object-safe wrapper for `RoleSource`.
trait RoleSourceErased: Send + Sync {
    fn fetch_role<'a>(
        &'a self,
        email: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, ClientError>> + Send + 'a>>;
}

impl<T: RoleSource> RoleSourceErased for T {
    fn fetch_role<'a>(
        &'a self,
        email: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Option<String>, ClientError>> + Send + 'a>> {
        Box::pin(RoleSource::fetch_role(self, email))
    }
}

/// Role resolution for a session state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleStatus {
    /// The identity is unknown or absent, so nothing was looked up.
    Unresolved,
    Resolved(Role),
    /// The lookup failed or carried no usable role. Treated as deny.
    Failed(RoleError),
}

impl RoleStatus {
    pub fn role(&self) -> Option<Role> {
        match self {
            RoleStatus::Resolved(role) => Some(*role),
            _ => None,
        }
    }
}

/// Maps identities to roles, caching each result until the identity changes.
///
/// Failed lookups are not cached; the next call asks again. A record with no
/// role is a failure, never a silent default.
#[derive(Clone)]
pub struct RoleResolver {
    source: Arc<dyn RoleSourceErased>,
    /// Map: lowercased email -> resolved record
    cache: Arc<RwLock<HashMap<String, RoleRecord>>>,
    /// Serializes lookups so concurrent guards share one request per email.
    lookup_lock: Arc<Mutex<()>>,
}

impl RoleResolver {
    pub fn new<S: RoleSource>(source: S) -> Self {
        Self {
            source: Arc::new(source),
            cache: Arc::new(RwLock::new(HashMap::new())),
            lookup_lock: Arc::new(Mutex::new(())),
        }
    }

    pub async fn resolve_role(&self, identity: &Identity) -> Result<RoleRecord, RoleError> {
        let key = identity.email.trim().to_lowercase();
        if let Some(record) = self.cached_record(&key, identity).await {
            return Ok(record);
        }

        let _lookup = self.lookup_lock.lock().await;
        // Another caller may have resolved it while we waited for the lock.
        if let Some(record) = self.cached_record(&key, identity).await {
            return Ok(record);
        }

        debug!(email = %identity.email, "Resolving role");
        let name = self
            .source
            .fetch_role(&identity.email)
            .await
            .map_err(|e| {
                warn!(email = %identity.email, error = %e, "Role lookup failed");
                RoleError::Lookup(e.to_string())
            })?;
        let role = Role::parse(name.as_deref().unwrap_or_default())?;

        let record = RoleRecord {
            identity_id: identity.id.clone(),
            email: identity.email.clone(),
            role,
        };
        self.cache.write().await.insert(key, record.clone());
        Ok(record)
    }

    /// Role status for whatever the session currently holds.
    ///
    /// Only a present identity triggers a lookup.
    pub async fn status_for(&self, session: &SessionState) -> RoleStatus {
        match session {
            SessionState::Present(identity) => match self.resolve_role(identity).await {
                Ok(record) => RoleStatus::Resolved(record.role),
                Err(err) => RoleStatus::Failed(err),
            },
            SessionState::Unknown | SessionState::Absent => RoleStatus::Unresolved,
        }
    }

    /// Cached role for `identity`, without a lookup.
    pub async fn cached(&self, identity: &Identity) -> Option<Role> {
        let key = identity.email.trim().to_lowercase();
        self.cached_record(&key, identity).await.map(|r| r.role)
    }

    /// Drop the cached role for `email` (after a role change).
    pub async fn forget(&self, email: &str) {
        self.cache.write().await.remove(&email.trim().to_lowercase());
    }

    pub async fn clear(&self) {
        self.cache.write().await.clear();
    }

    async fn cached_record(&self, key: &str, identity: &Identity) -> Option<RoleRecord> {
        let cache = self.cache.read().await;
        cache
            .get(key)
            .filter(|record| record.identity_id == identity.id)
            .cloned()
    }
}
