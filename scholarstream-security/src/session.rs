use std::sync::Arc;

use scholarstream_core::{AuthError, Identity, ProfileUpdate};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info, warn};

use crate::provider::{IdentityProvider, IdentityProviderErased};

/// Who is signed in, as far as this process knows.
///
/// `Unknown` means the provider has not finished restoring the session yet.
/// It is never the same thing as `Absent`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionState {
    Unknown,
    Present(Identity),
    Absent,
}

impl SessionState {
    pub fn is_unknown(&self) -> bool {
        matches!(self, SessionState::Unknown)
    }

    pub fn is_resolved(&self) -> bool {
        !self.is_unknown()
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Present(identity) => Some(identity),
            _ => None,
        }
    }
}

impl From<Option<Identity>> for SessionState {
    fn from(identity: Option<Identity>) -> Self {
        match identity {
            Some(identity) => SessionState::Present(identity),
            None => SessionState::Absent,
        }
    }
}

struct SessionInner {
    provider: Arc<dyn IdentityProviderErased>,
    state: Arc<watch::Sender<SessionState>>,
    _listener: DropGuard,
}

/// Process-wide source of truth for the signed-in identity.
///
/// Starts in [`SessionState::Unknown`] and moves to `Present` or `Absent`
/// once the provider's session restore completes. Provider-side session
/// changes are applied as they arrive. The background listener stops when
/// the last clone of the store is dropped.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

impl SessionStore {
    /// Create the store and begin restoring the session. Must be called
    /// within a Tokio runtime.
    pub fn start<P: IdentityProvider>(provider: P) -> Self {
        let provider: Arc<dyn IdentityProviderErased> = Arc::new(provider);
        let (tx, _) = watch::channel(SessionState::Unknown);
        let state = Arc::new(tx);
        let token = CancellationToken::new();

        // Subscribe before restoring so no change between the two is lost.
        let changes = provider.session_changes();
        tokio::spawn(listen(provider.clone(), state.clone(), changes, token.clone()));

        Self {
            inner: Arc::new(SessionInner {
                provider,
                state,
                _listener: token.drop_guard(),
            }),
        }
    }

    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.state.borrow().identity().cloned()
    }

    /// Wait until the state is no longer `Unknown` and return the identity, if any.
    pub async fn resolved(&self) -> Option<Identity> {
        let mut rx = self.inner.state.subscribe();
        let identity = match rx.wait_for(SessionState::is_resolved).await {
            Ok(state) => state.identity().cloned(),
            Err(_) => None,
        };
        identity
    }

    /// Observe state transitions. Dropping the subscription unsubscribes.
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.inner.state.subscribe(),
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = self.inner.provider.register(email, password).await?;
        info!(email = %identity.email, "Registered and signed in");
        self.set(SessionState::Present(identity.clone()));
        Ok(identity)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = self.inner.provider.sign_in(email, password).await?;
        info!(email = %identity.email, "Signed in");
        self.set(SessionState::Present(identity.clone()));
        Ok(identity)
    }

    pub async fn sign_in_with_federated_provider(&self) -> Result<Identity, AuthError> {
        let identity = self.inner.provider.sign_in_with_federated_provider().await?;
        info!(email = %identity.email, "Signed in with federated provider");
        self.set(SessionState::Present(identity.clone()));
        Ok(identity)
    }

    /// Change the active identity's display attributes.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<(), AuthError> {
        let current = self.identity().ok_or(AuthError::NoActiveIdentity)?;
        let updated = self.inner.provider.update_profile(&current, &update).await?;
        self.inner.state.send_if_modified(|state| match state {
            SessionState::Present(identity) if identity.id == updated.id => {
                *identity = updated;
                true
            }
            _ => false,
        });
        Ok(())
    }

    /// Clear the local session immediately, then tell the provider.
    ///
    /// A provider failure is logged, not returned: the user is signed out
    /// locally either way.
    pub async fn sign_out(&self) {
        self.set(SessionState::Absent);
        info!("Signed out");
        if let Err(err) = self.inner.provider.sign_out().await {
            warn!(error = %err, "Provider sign-out failed; local session already cleared");
        }
    }

    fn set(&self, next: SessionState) {
        self.inner.state.send_if_modified(|state| {
            if *state == next {
                false
            } else {
                *state = next;
                true
            }
        });
    }
}

/// Handle returned by [`SessionStore::subscribe`].
pub struct SessionSubscription {
    rx: watch::Receiver<SessionState>,
}

impl SessionSubscription {
    pub fn current(&self) -> SessionState {
        self.rx.borrow().clone()
    }

    /// Wait for the next transition. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<SessionState> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

async fn listen(
    provider: Arc<dyn IdentityProviderErased>,
    state: Arc<watch::Sender<SessionState>>,
    mut changes: broadcast::Receiver<Option<Identity>>,
    token: CancellationToken,
) {
    let restored = tokio::select! {
        _ = token.cancelled() => return,
        restored = provider.restore_session() => restored,
    };
    // A sign-in that finished first wins over the restore result.
    state.send_if_modified(|current| {
        if current.is_unknown() {
            *current = SessionState::from(restored);
            true
        } else {
            false
        }
    });
    info!(present = state.borrow().identity().is_some(), "Session restored");

    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            change = changes.recv() => match change {
                Ok(identity) => {
                    let next = SessionState::from(identity);
                    state.send_if_modified(|current| {
                        if *current == next {
                            false
                        } else {
                            debug!("Provider session changed");
                            *current = next;
                            true
                        }
                    });
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Missed provider session changes");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    }
}
