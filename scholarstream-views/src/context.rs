use std::future::Future;
use std::sync::Arc;

use scholarstream_cache::{QueryCache, QueryKey, QueryState};
use scholarstream_core::{AuthError, ClientError, ClientSettings, Identity};
use scholarstream_http::ScholarStreamApi;
use scholarstream_security::{
    Gate, Guard, RoleResolver, RoleStatus, SessionState, SessionStore, SessionSubscription,
};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::mutations::Mutation;

/// Process-wide state handed to every page: settings, the session, the role
/// resolver, the query cache and the REST API.
///
/// Cloning is cheap. A background task clears cached data and roles
/// whenever the signed-in identity goes away or changes; it stops when the
/// last clone is dropped.
#[derive(Clone)]
pub struct AppContext {
    settings: Arc<ClientSettings>,
    session: SessionStore,
    roles: RoleResolver,
    cache: QueryCache,
    api: ScholarStreamApi,
    _watcher: Arc<DropGuard>,
}

impl AppContext {
    /// Wire the REST API to `session` using `settings`. Must be called within
    /// a Tokio runtime.
    pub fn new(settings: ClientSettings, session: SessionStore) -> Result<Self, ClientError> {
        let api = ScholarStreamApi::new(&settings.api, session.clone())?;
        let cache = match settings.cache.ttl {
            Some(ttl) => QueryCache::with_ttl(ttl),
            None => QueryCache::new(),
        };
        let roles = RoleResolver::new(api.clone());
        Ok(Self::from_parts(settings, session, roles, cache, api))
    }

    pub fn from_parts(
        settings: ClientSettings,
        session: SessionStore,
        roles: RoleResolver,
        cache: QueryCache,
        api: ScholarStreamApi,
    ) -> Self {
        let token = CancellationToken::new();
        tokio::spawn(watch_identity(
            session.subscribe(),
            cache.clone(),
            roles.clone(),
            token.clone(),
        ));
        Self {
            settings: Arc::new(settings),
            session,
            roles,
            cache,
            api,
            _watcher: Arc::new(token.drop_guard()),
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn roles(&self) -> &RoleResolver {
        &self.roles
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn api(&self) -> &ScholarStreamApi {
        &self.api
    }

    /// The signed-in identity once the session has resolved.
    pub async fn require_identity(&self) -> Result<Identity, ClientError> {
        self.session
            .resolved()
            .await
            .ok_or(ClientError::Auth(AuthError::NoActiveIdentity))
    }

    /// Role of the current session; `Unresolved` unless someone is signed in.
    pub async fn current_role(&self) -> RoleStatus {
        self.roles.status_for(&self.session.state()).await
    }

    pub async fn query<T, F, Fut>(&self, key: QueryKey, fetcher: F) -> QueryState<T>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>> + Send + 'static,
    {
        self.cache.query(key, fetcher).await
    }

    /// Run a write, then apply the invalidations `mutation` calls for.
    pub async fn mutate<T, Fut>(&self, mutation: Mutation, write: Fut) -> Result<T, ClientError>
    where
        Fut: Future<Output = Result<T, ClientError>>,
    {
        debug!(mutation = mutation.name(), "Mutation");
        let result = self.cache.mutate(write, mutation.invalidations()).await;
        if result.is_ok() {
            if let Some(email) = mutation.forgets_role_of() {
                self.roles.forget(email).await;
            }
        }
        result
    }

    /// Start a route gate for `guard` at `path` against this context's
    /// session and roles.
    pub fn gate<G: Guard + 'static>(&self, guard: G, path: &str) -> Gate {
        Gate::spawn(guard, path, &self.session, self.roles.clone())
    }

    /// Sign out and drop everything cached for the previous user.
    pub async fn sign_out(&self) {
        self.session.sign_out().await;
        self.cache.clear();
        self.roles.clear().await;
    }
}

async fn watch_identity(
    mut subscription: SessionSubscription,
    cache: QueryCache,
    roles: RoleResolver,
    token: CancellationToken,
) {
    let mut last = identity_key(&subscription.current());
    loop {
        let state = tokio::select! {
            _ = token.cancelled() => return,
            next = subscription.changed() => match next {
                Some(state) => state,
                None => return,
            },
        };
        let current = identity_key(&state);
        if last.is_some() && current != last {
            info!("Identity changed; clearing cached data");
            cache.clear();
            roles.clear().await;
        }
        if !state.is_unknown() {
            last = current;
        }
    }
}

fn identity_key(state: &SessionState) -> Option<String> {
    state.identity().map(|i| i.id.clone())
}
