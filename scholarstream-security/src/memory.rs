use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use dashmap::DashMap;
use scholarstream_core::{AuthError, Identity, ProfileUpdate};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::provider::IdentityProvider;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone)]
struct Account {
    id: String,
    email: String,
    display_name: Option<String>,
    photo_url: Option<String>,
    /// `None` for accounts created through the federated flow.
    password_hash: Option<String>,
}

impl Account {
    fn issue_identity(&self) -> Identity {
        Identity {
            id: self.id.clone(),
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            photo_url: self.photo_url.clone(),
            id_token: format!("tok-{}", Uuid::new_v4()),
        }
    }
}

#[derive(Clone, Debug)]
struct FederatedProfile {
    email: String,
    display_name: Option<String>,
    photo_url: Option<String>,
}

/// In-memory identity provider for development and testing.
///
/// Passwords are hashed with argon2. Clones share the same accounts and
/// session, so a test can keep a handle to revoke the session while the
/// session store owns another.
#[derive(Clone)]
pub struct InMemoryIdentityProvider {
    /// Map: lowercased email -> account
    accounts: Arc<DashMap<String, Account>>,
    session: Arc<RwLock<Option<Identity>>>,
    federated: Option<FederatedProfile>,
    restore_delay: Duration,
    sign_out_fails: Arc<AtomicBool>,
    profile_update_fails: Arc<AtomicBool>,
    changes: broadcast::Sender<Option<Identity>>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(32);
        Self {
            accounts: Arc::new(DashMap::new()),
            session: Arc::new(RwLock::new(None)),
            federated: None,
            restore_delay: Duration::ZERO,
            sign_out_fails: Arc::new(AtomicBool::new(false)),
            profile_update_fails: Arc::new(AtomicBool::new(false)),
            changes,
        }
    }

    /// Add an account with a plaintext password (hashed with argon2).
    pub fn with_user(self, email: &str, password: &str, display_name: Option<&str>) -> Self {
        match hash_password(password) {
            Ok(hash) => {
                let account = Account {
                    id: Uuid::new_v4().to_string(),
                    email: email.trim().to_string(),
                    display_name: display_name.map(str::to_string),
                    photo_url: None,
                    password_hash: Some(hash),
                };
                self.accounts.insert(normalize(email), account);
            }
            Err(err) => warn!(email, error = %err, "Could not add account"),
        }
        self
    }

    /// The account returned by the federated flow. Without one the flow
    /// behaves as if the user closed the popup.
    pub fn with_federated_account(mut self, email: &str, display_name: &str) -> Self {
        self.federated = Some(FederatedProfile {
            email: email.trim().to_string(),
            display_name: Some(display_name.to_string()),
            photo_url: None,
        });
        self
    }

    /// Delay before `restore_session` resolves.
    pub fn with_restore_delay(mut self, delay: Duration) -> Self {
        self.restore_delay = delay;
        self
    }

    /// Start with a persisted session for an existing account.
    pub fn with_persisted_session(self, email: &str) -> Self {
        match self.accounts.get(&normalize(email)) {
            Some(account) => {
                let identity = account.issue_identity();
                *write(&self.session) = Some(identity);
            }
            None => warn!(email, "No account to persist a session for"),
        }
        self
    }

    /// Make the remote half of `sign_out` fail.
    pub fn set_sign_out_failure(&self, fails: bool) {
        self.sign_out_fails.store(fails, Ordering::SeqCst);
    }

    pub fn set_profile_update_failure(&self, fails: bool) {
        self.profile_update_fails.store(fails, Ordering::SeqCst);
    }

    /// End the session from the provider side (expiry, revocation elsewhere).
    pub fn revoke_session(&self) {
        *write(&self.session) = None;
        self.publish(None);
    }

    pub fn current_session(&self) -> Option<Identity> {
        read(&self.session).clone()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    fn start_session(&self, identity: Identity) -> Identity {
        *write(&self.session) = Some(identity.clone());
        self.publish(Some(identity.clone()));
        identity
    }

    fn publish(&self, change: Option<Identity>) {
        // No receivers is fine: nobody is listening yet.
        let _ = self.changes.send(change);
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn register(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send {
        let email = email.trim().to_string();
        let password = password.to_string();
        async move {
            if password.len() < MIN_PASSWORD_LEN {
                return Err(AuthError::WeakPassword);
            }
            let key = normalize(&email);
            if self.accounts.contains_key(&key) {
                return Err(AuthError::EmailInUse);
            }
            let hash = tokio::task::spawn_blocking(move || hash_password(&password))
                .await
                .map_err(|e| AuthError::Provider(e.to_string()))??;

            let account = Account {
                id: Uuid::new_v4().to_string(),
                email,
                display_name: None,
                photo_url: None,
                password_hash: Some(hash),
            };
            // Re-check: another registration may have won while hashing.
            match self.accounts.entry(key) {
                dashmap::mapref::entry::Entry::Occupied(_) => Err(AuthError::EmailInUse),
                dashmap::mapref::entry::Entry::Vacant(slot) => {
                    let identity = account.issue_identity();
                    slot.insert(account);
                    debug!(email = %identity.email, "Account registered");
                    Ok(self.start_session(identity))
                }
            }
        }
    }

    fn sign_in(
        &self,
        email: &str,
        password: &str,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send {
        let account = self.accounts.get(&normalize(email)).map(|a| a.value().clone());
        let password = password.to_string();
        async move {
            let Some(account) = account else {
                return Err(AuthError::InvalidCredentials);
            };
            let Some(hash) = account.password_hash.clone() else {
                return Err(AuthError::InvalidCredentials);
            };
            // Run argon2 verification in a blocking task to avoid blocking the async runtime.
            let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
                .await
                .unwrap_or(false);
            if !verified {
                return Err(AuthError::InvalidCredentials);
            }
            Ok(self.start_session(account.issue_identity()))
        }
    }

    fn sign_in_with_federated_provider(
        &self,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send {
        let profile = self.federated.clone();
        async move {
            let profile = profile.ok_or(AuthError::FederatedCancelled)?;
            let account = self
                .accounts
                .entry(normalize(&profile.email))
                .or_insert_with(|| Account {
                    id: Uuid::new_v4().to_string(),
                    email: profile.email.clone(),
                    display_name: profile.display_name.clone(),
                    photo_url: profile.photo_url.clone(),
                    password_hash: None,
                })
                .value()
                .clone();
            Ok(self.start_session(account.issue_identity()))
        }
    }

    fn sign_out(&self) -> impl Future<Output = Result<(), AuthError>> + Send {
        let fails = self.sign_out_fails.load(Ordering::SeqCst);
        async move {
            if fails {
                return Err(AuthError::Provider("sign-out request timed out".into()));
            }
            *write(&self.session) = None;
            self.publish(None);
            Ok(())
        }
    }

    fn update_profile(
        &self,
        identity: &Identity,
        update: &ProfileUpdate,
    ) -> impl Future<Output = Result<Identity, AuthError>> + Send {
        if self.profile_update_fails.load(Ordering::SeqCst) {
            return std::future::ready(Err(AuthError::Provider("profile update rejected".into())));
        }
        let result = match self.accounts.get_mut(&normalize(&identity.email)) {
            Some(mut account) => {
                if let Some(name) = &update.display_name {
                    account.display_name = Some(name.clone());
                }
                if let Some(url) = &update.photo_url {
                    account.photo_url = Some(url.clone());
                }
                let mut updated = identity.clone();
                updated.apply(update);
                Ok(updated)
            }
            None => Err(AuthError::NoActiveIdentity),
        };
        if let Ok(updated) = &result {
            let mut session = write(&self.session);
            if session.as_ref().is_some_and(|s| s.id == updated.id) {
                *session = Some(updated.clone());
                drop(session);
                self.publish(Some(updated.clone()));
            }
        }
        std::future::ready(result)
    }

    fn restore_session(&self) -> impl Future<Output = Option<Identity>> + Send {
        let delay = self.restore_delay;
        async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            self.current_session()
        }
    }

    fn session_changes(&self) -> broadcast::Receiver<Option<Identity>> {
        self.changes.subscribe()
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Provider(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

fn read(lock: &RwLock<Option<Identity>>) -> std::sync::RwLockReadGuard<'_, Option<Identity>> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write(lock: &RwLock<Option<Identity>>) -> std::sync::RwLockWriteGuard<'_, Option<Identity>> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}
