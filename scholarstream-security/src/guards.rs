use scholarstream_core::Role;
use tokio::sync::watch;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use crate::roles::{RoleResolver, RoleStatus};
use crate::session::{SessionState, SessionStore, SessionSubscription};

pub const FORBIDDEN_MESSAGE: &str = "Access is Forbidden.";

/// Why a guard refused.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    /// Redirect to the sign-in view, returning to `from` afterwards.
    SignIn { from: String },
    /// Render a forbidden view in place.
    Forbidden { reason: String },
}

/// Output of a guard at one point in time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    /// Identity or role still resolving: render a loader, nothing else.
    Pending,
    Allow,
    Deny(Rejection),
}

impl GuardDecision {
    pub fn is_pending(&self) -> bool {
        matches!(self, GuardDecision::Pending)
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// Everything a guard may look at.
pub struct GuardContext<'a> {
    /// Path of the route being entered.
    pub path: &'a str,
    pub session: &'a SessionState,
    pub role: &'a RoleStatus,
}

/// Decides whether a route subtree may render.
///
/// Guards are pure functions of the context; [`Gate`] re-evaluates them as
/// the session and role change.
pub trait Guard: Send + Sync {
    fn check(&self, ctx: &GuardContext<'_>) -> GuardDecision;

    /// Whether the decision depends on the resolved role.
    fn needs_role(&self) -> bool {
        false
    }
}

/// Allows any signed-in identity. Sends anonymous visitors to sign in.
pub struct AuthenticatedGuard;

impl Guard for AuthenticatedGuard {
    fn check(&self, ctx: &GuardContext<'_>) -> GuardDecision {
        match ctx.session {
            SessionState::Unknown => GuardDecision::Pending,
            SessionState::Present(_) => GuardDecision::Allow,
            SessionState::Absent => GuardDecision::Deny(Rejection::SignIn {
                from: ctx.path.to_string(),
            }),
        }
    }
}

/// Allows only identities whose role is exactly `required`.
///
/// Roles are not ordered: an admin does not pass a moderator guard.
pub struct RoleGuard {
    pub required: Role,
}

impl RoleGuard {
    pub fn admin() -> Self {
        Self {
            required: Role::Admin,
        }
    }

    pub fn moderator() -> Self {
        Self {
            required: Role::Moderator,
        }
    }
}

impl Guard for RoleGuard {
    fn check(&self, ctx: &GuardContext<'_>) -> GuardDecision {
        let forbidden = |reason: String| GuardDecision::Deny(Rejection::Forbidden { reason });
        match (ctx.session, ctx.role) {
            (SessionState::Unknown, _) => GuardDecision::Pending,
            (SessionState::Absent, _) => forbidden("not signed in".into()),
            (SessionState::Present(_), RoleStatus::Unresolved) => GuardDecision::Pending,
            (SessionState::Present(_), RoleStatus::Failed(err)) => forbidden(err.to_string()),
            (SessionState::Present(_), RoleStatus::Resolved(role)) if *role == self.required => {
                GuardDecision::Allow
            }
            (SessionState::Present(_), RoleStatus::Resolved(role)) => {
                forbidden(format!("role '{role}' cannot access {} pages", self.required))
            }
        }
    }

    fn needs_role(&self) -> bool {
        true
    }
}

/// One-shot evaluation: waits for the session to resolve and, if needed,
/// for the role, then returns the settled decision.
pub async fn evaluate<G: Guard + ?Sized>(
    guard: &G,
    path: &str,
    session: &SessionStore,
    roles: &RoleResolver,
) -> GuardDecision {
    session.resolved().await;
    let state = session.state();
    let role = if guard.needs_role() {
        roles.status_for(&state).await
    } else {
        RoleStatus::Unresolved
    };
    guard.check(&GuardContext {
        path,
        session: &state,
        role: &role,
    })
}

/// A guard bound to a route, re-evaluated on every session change.
///
/// Publishes `Pending` until the inputs settle. Dropping the gate stops it.
pub struct Gate {
    rx: watch::Receiver<GuardDecision>,
    _task: DropGuard,
}

impl Gate {
    /// Start evaluating `guard` for `path`. Must be called within a Tokio runtime.
    pub fn spawn<G: Guard + 'static>(
        guard: G,
        path: impl Into<String>,
        session: &SessionStore,
        roles: RoleResolver,
    ) -> Self {
        let (tx, rx) = watch::channel(GuardDecision::Pending);
        let token = CancellationToken::new();
        let subscription = session.subscribe();
        tokio::spawn(drive(guard, path.into(), subscription, roles, tx, token.clone()));
        Self {
            rx,
            _task: token.drop_guard(),
        }
    }

    pub fn decision(&self) -> GuardDecision {
        self.rx.borrow().clone()
    }

    /// Wait for the next decision change. `None` once the gate stopped.
    pub async fn changed(&mut self) -> Option<GuardDecision> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Wait until the decision is no longer `Pending`.
    pub async fn settled(&mut self) -> GuardDecision {
        if let Ok(decision) = self.rx.wait_for(|d| !d.is_pending()).await {
            return decision.clone();
        }
        self.decision()
    }
}

async fn drive<G: Guard>(
    guard: G,
    path: String,
    mut session: SessionSubscription,
    roles: RoleResolver,
    tx: watch::Sender<GuardDecision>,
    token: CancellationToken,
) {
    let publish = |decision: GuardDecision| {
        tx.send_if_modified(|current| {
            if *current == decision {
                false
            } else {
                debug!(path = %path, ?decision, "Guard decision");
                *current = decision;
                true
            }
        });
    };

    // Role last resolved for this identity id; profile edits keep it.
    let mut known: Option<(String, RoleStatus)> = None;

    loop {
        let state = session.current();
        let mut role = match (&state, &known) {
            (SessionState::Present(identity), Some((id, status))) if *id == identity.id => {
                status.clone()
            }
            _ => RoleStatus::Unresolved,
        };
        publish(guard.check(&GuardContext {
            path: &path,
            session: &state,
            role: &role,
        }));

        if guard.needs_role() && matches!(state, SessionState::Present(_)) {
            tokio::select! {
                _ = token.cancelled() => return,
                status = roles.status_for(&state) => {
                    if let SessionState::Present(identity) = &state {
                        known = Some((identity.id.clone(), status.clone()));
                    }
                    role = status;
                }
                changed = session.changed() => {
                    if changed.is_none() {
                        return;
                    }
                    continue;
                }
            }
            publish(guard.check(&GuardContext {
                path: &path,
                session: &state,
                role: &role,
            }));
        }

        tokio::select! {
            _ = token.cancelled() => return,
            changed = session.changed() => {
                if changed.is_none() {
                    return;
                }
            }
        }
    }
}
