use std::future::Future;
use std::pin::Pin;

use scholarstream_core::{AuthError, Identity, ProfileUpdate};
use tokio::sync::broadcast;

/// External identity provider consumed by the [`SessionStore`](crate::SessionStore).
///
/// Implement this trait to back the session store with a hosted auth service.
/// [`InMemoryIdentityProvider`](crate::InMemoryIdentityProvider) is the
/// development and test implementation.
pub trait IdentityProvider: Send + Sync + 'static {
    /// Create an account and sign it in.
    fn register(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    /// Email/password sign-in.
    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    /// Run the federated (popup) sign-in flow.
    fn sign_in_with_federated_provider(
        &self,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    /// Revoke the provider-side session.
    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send;

    /// Change display attributes of `identity`; returns the updated identity.
    fn update_profile(
        &self,
        identity: &Identity,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send;

    /// Restore a persisted session on startup. Resolves once the provider knows.
    fn restore_session(&self) -> impl Future<Output = Option<Identity>> + Send;

    /// Provider-side session changes (sign-in elsewhere, expiry, revocation).
    fn session_changes(&self) -> broadcast::Receiver<Option<Identity>>;
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Object-safe wrapper for `IdentityProvider`.
pub(crate) trait IdentityProviderErased: Send + Sync {
    fn register<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Identity, AuthError>>;
    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Identity, AuthError>>;
    fn sign_in_with_federated_provider(&self) -> BoxFuture<'_, Result<Identity, AuthError>>;
    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>>;
    fn update_profile<'a>(
        &'a self,
        identity: &'a Identity,
        update: &'a ProfileUpdate,
    ) -> BoxFuture<'a, Result<Identity, AuthError>>;
    fn restore_session(&self) -> BoxFuture<'_, Option<Identity>>;
    fn session_changes(&self) -> broadcast::Receiver<Option<Identity>>;
}

impl<T: IdentityProvider> IdentityProviderErased for T {
    fn register<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Identity, AuthError>> {
        Box::pin(IdentityProvider::register(self, email, password))
    }

    fn sign_in<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<Identity, AuthError>> {
        Box::pin(IdentityProvider::sign_in(self, email, password))
    }

    fn sign_in_with_federated_provider(&self) -> BoxFuture<'_, Result<Identity, AuthError>> {
        Box::pin(IdentityProvider::sign_in_with_federated_provider(self))
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        Box::pin(IdentityProvider::sign_out(self))
    }

    fn update_profile<'a>(
        &'a self,
        identity: &'a Identity,
        update: &'a ProfileUpdate,
    ) -> BoxFuture<'a, Result<Identity, AuthError>> {
        Box::pin(IdentityProvider::update_profile(self, identity, update))
    }

    fn restore_session(&self) -> BoxFuture<'_, Option<Identity>> {
        Box::pin(IdentityProvider::restore_session(self))
    }

    fn session_changes(&self) -> broadcast::Receiver<Option<Identity>> {
        IdentityProvider::session_changes(self)
    }
}
