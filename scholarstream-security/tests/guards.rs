use std::collections::HashMap;
use std::time::Duration;

use scholarstream_core::{ClientError, Identity, ProfileUpdate, Role, RoleError};
use scholarstream_security::{
    evaluate, AuthenticatedGuard, Gate, Guard, GuardContext, GuardDecision,
    InMemoryIdentityProvider, Rejection, RoleGuard, RoleResolver, RoleSource, RoleStatus,
    SessionState, SessionStore,
};

const TICK: Duration = Duration::from_millis(1);

#[derive(Clone, Default)]
struct StaticRoles {
    roles: HashMap<String, Option<String>>,
    delay: Duration,
}

impl RoleSource for StaticRoles {
    async fn fetch_role(&self, email: &str) -> Result<Option<String>, ClientError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.roles
            .get(email)
            .cloned()
            .ok_or_else(|| ClientError::network("connection reset"))
    }
}

fn roles(pairs: &[(&str, &str)]) -> RoleResolver {
    RoleResolver::new(StaticRoles {
        roles: pairs
            .iter()
            .map(|(email, role)| (email.to_string(), Some(role.to_string())))
            .collect(),
        delay: Duration::ZERO,
    })
}

/// A store whose session restore for `email` takes `ticks` milliseconds.
fn signed_in_after(email: &str, ticks: u64) -> SessionStore {
    let provider = InMemoryIdentityProvider::new()
        .with_user(email, "secret1", None)
        .with_persisted_session(email)
        .with_restore_delay(TICK * ticks as u32);
    SessionStore::start(provider)
}

fn anonymous_after(ticks: u64) -> SessionStore {
    SessionStore::start(
        InMemoryIdentityProvider::new().with_restore_delay(TICK * ticks as u32),
    )
}

async fn assert_pending_for(gate: &Gate, ticks: u64) {
    for tick in 0..ticks {
        assert_eq!(gate.decision(), GuardDecision::Pending, "tick {tick}");
        tokio::time::sleep(TICK).await;
    }
}

#[tokio::test(start_paused = true)]
async fn admin_guard_denies_student_after_pending() {
    let store = signed_in_after("student@uni.edu", 5);
    let mut gate = Gate::spawn(
        RoleGuard::admin(),
        "/dashboard/manageUsers",
        &store,
        roles(&[("student@uni.edu", "student")]),
    );

    assert_pending_for(&gate, 5).await;
    assert!(matches!(
        gate.settled().await,
        GuardDecision::Deny(Rejection::Forbidden { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn admin_guard_allows_admin_after_pending() {
    let store = signed_in_after("admin@uni.edu", 5);
    let mut gate = Gate::spawn(
        RoleGuard::admin(),
        "/dashboard/manageUsers",
        &store,
        roles(&[("admin@uni.edu", "admin")]),
    );

    assert_pending_for(&gate, 5).await;
    assert_eq!(gate.settled().await, GuardDecision::Allow);
}

#[tokio::test(start_paused = true)]
async fn pending_while_role_lookup_is_in_flight() {
    let store = signed_in_after("mod@uni.edu", 0);
    let resolver = RoleResolver::new(StaticRoles {
        roles: HashMap::from([("mod@uni.edu".to_string(), Some("moderator".to_string()))]),
        delay: TICK * 10,
    });
    let mut gate = Gate::spawn(RoleGuard::moderator(), "/dashboard/allReviews", &store, resolver);

    assert_pending_for(&gate, 10).await;
    assert_eq!(gate.settled().await, GuardDecision::Allow);
}

#[tokio::test]
async fn admin_does_not_pass_moderator_guard() {
    let store = signed_in_after("admin@uni.edu", 0);
    let decision = evaluate(
        &RoleGuard::moderator(),
        "/dashboard/manageAppliedApplications",
        &store,
        &roles(&[("admin@uni.edu", "admin")]),
    )
    .await;
    assert!(matches!(decision, GuardDecision::Deny(Rejection::Forbidden { .. })));
}

#[tokio::test]
async fn role_lookup_failure_denies() {
    let store = signed_in_after("ghost@uni.edu", 0);
    let decision = evaluate(&RoleGuard::admin(), "/dashboard/analytics", &store, &roles(&[])).await;
    assert!(matches!(decision, GuardDecision::Deny(Rejection::Forbidden { .. })));
}

#[tokio::test(start_paused = true)]
async fn authenticated_guard_redirects_anonymous_with_return_path() {
    let store = anonymous_after(3);
    let mut gate = Gate::spawn(AuthenticatedGuard, "/dashboard/myProfile", &store, roles(&[]));

    assert_pending_for(&gate, 3).await;
    assert_eq!(
        gate.settled().await,
        GuardDecision::Deny(Rejection::SignIn {
            from: "/dashboard/myProfile".into()
        })
    );
}

#[tokio::test]
async fn gate_follows_sign_out() {
    let store = signed_in_after("ana@uni.edu", 0);
    let mut gate = Gate::spawn(AuthenticatedGuard, "/dashboard/myApplications", &store, roles(&[]));
    assert_eq!(gate.settled().await, GuardDecision::Allow);

    store.sign_out().await;
    let next = tokio::time::timeout(Duration::from_secs(1), gate.changed())
        .await
        .expect("decision changed");
    assert!(matches!(next, Some(GuardDecision::Deny(Rejection::SignIn { .. }))));
}

#[tokio::test(start_paused = true)]
async fn profile_edit_keeps_the_resolved_role() {
    let store = signed_in_after("admin@uni.edu", 0);
    let resolver = RoleResolver::new(StaticRoles {
        roles: HashMap::from([("admin@uni.edu".to_string(), Some("admin".to_string()))]),
        delay: TICK * 10,
    });
    let mut gate = Gate::spawn(RoleGuard::admin(), "/dashboard/analytics", &store, resolver);
    assert_eq!(gate.settled().await, GuardDecision::Allow);

    store
        .update_profile(ProfileUpdate {
            display_name: Some("Ada".into()),
            photo_url: None,
        })
        .await
        .unwrap();
    let change = tokio::time::timeout(TICK * 30, gate.changed()).await;
    assert!(change.is_err(), "decision moved to {change:?}");
    assert_eq!(gate.decision(), GuardDecision::Allow);
}

#[test]
fn role_guard_table() {
    let present = SessionState::Present(Identity::new("1", "a@b.c", "t"));
    let check = |session: &SessionState, role: RoleStatus| {
        RoleGuard::admin().check(&GuardContext {
            path: "/dashboard/analytics",
            session,
            role: &role,
        })
    };

    assert_eq!(check(&SessionState::Unknown, RoleStatus::Resolved(Role::Admin)), GuardDecision::Pending);
    assert_eq!(check(&present, RoleStatus::Unresolved), GuardDecision::Pending);
    assert_eq!(check(&present, RoleStatus::Resolved(Role::Admin)), GuardDecision::Allow);
    assert!(!check(&present, RoleStatus::Resolved(Role::Moderator)).is_allowed());
    assert!(!check(&present, RoleStatus::Failed(RoleError::Missing)).is_allowed());
    assert!(!check(&SessionState::Absent, RoleStatus::Unresolved).is_pending());
}
