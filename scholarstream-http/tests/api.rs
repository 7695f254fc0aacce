use std::time::Duration;

use scholarstream_core::config::ApiSettings;
use scholarstream_core::{ApplicationPatch, CheckoutRequest, ClientError, Role, RolePatch};
use scholarstream_http::{HttpClient, ScholarStreamApi, ScholarshipFilter};
use scholarstream_security::{InMemoryIdentityProvider, RoleResolver, RoleSource, SessionStore};
use scholarstream_test::{fixtures, MockApi};

async fn mock() -> MockApi {
    MockApi::start().await.expect("mock API starts")
}

fn anonymous() -> SessionStore {
    SessionStore::start(InMemoryIdentityProvider::new())
}

fn signed_in(email: &str) -> SessionStore {
    SessionStore::start(
        InMemoryIdentityProvider::new()
            .with_user(email, "secret1", None)
            .with_persisted_session(email),
    )
}

fn api(mock: &MockApi, session: SessionStore) -> ScholarStreamApi {
    ScholarStreamApi::new(&mock.settings().api, session).expect("client builds")
}

#[tokio::test]
async fn catalog_filters_are_sent_as_query_params() {
    let mock = mock().await;
    mock.seed("scholarships", &fixtures::scholarship("Law Grant", "Oxford", "UK", "10"));
    mock.seed("scholarships", &fixtures::scholarship("Tech Grant", "MIT", "USA", "20"));
    let api = api(&mock, anonymous());

    let all = api.scholarships(&ScholarshipFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);

    let uk = api
        .scholarships(&ScholarshipFilter::default().country("UK"))
        .await
        .unwrap();
    assert_eq!(uk.len(), 1);
    assert_eq!(uk[0].university_name, "Oxford");

    let last = mock.requests().pop().unwrap();
    assert_eq!(last.path, "/scholarships");
    assert_eq!(last.query.as_deref(), Some("country=UK"));
    assert_eq!(last.bearer, None);
}

#[tokio::test]
async fn public_reads_never_carry_a_token() {
    let mock = mock().await;
    let id = mock.seed("scholarships", &fixtures::scholarship("Grant", "Oxford", "UK", "10"));
    let api = api(&mock, signed_in("ana@uni.edu"));

    let scholarship = api.scholarship(&id).await.unwrap();
    assert_eq!(scholarship.id.as_deref(), Some(id.as_str()));
    assert!(mock.requests().iter().all(|r| r.bearer.is_none()));
}

#[tokio::test]
async fn secure_requests_wait_for_session_restore() {
    let mock = mock().await;
    mock.require_auth(true);
    mock.seed("applications", &fixtures::application("s1", "ana@uni.edu", "Oxford"));
    let session = SessionStore::start(
        InMemoryIdentityProvider::new()
            .with_user("ana@uni.edu", "secret1", None)
            .with_persisted_session("ana@uni.edu")
            .with_restore_delay(Duration::from_millis(50)),
    );
    let api = api(&mock, session.clone());
    assert!(session.state().is_unknown());

    let mine = api.applications(Some("ana@uni.edu")).await.unwrap();
    assert_eq!(mine.len(), 1);

    let token = session.identity().unwrap().id_token;
    let requests = mock.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].bearer.as_deref(), Some(token.as_str()));
}

#[tokio::test]
async fn anonymous_secure_request_is_rejected_by_the_server() {
    let mock = mock().await;
    mock.require_auth(true);
    let api = api(&mock, anonymous());

    let err = api.applications(Some("ana@uni.edu")).await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(
        err,
        ClientError::api(401, "unauthorized access")
    );
}

#[tokio::test]
async fn server_messages_become_api_errors() {
    let mock = mock().await;
    mock.fail("POST /applications", 400, "already applied");
    let api = api(&mock, signed_in("ana@uni.edu"));

    let err = api
        .create_application(&fixtures::application("s1", "ana@uni.edu", "Oxford"))
        .await
        .unwrap_err();
    assert_eq!(err, ClientError::api(400, "already applied"));
    assert!(!err.is_retryable());

    let err = api.scholarship("missing").await.unwrap_err();
    assert_eq!(err.status(), Some(404));
}

#[tokio::test]
async fn unreachable_server_is_a_network_error() {
    let settings = ApiSettings {
        base_url: "http://127.0.0.1:9/".parse().unwrap(),
        timeout: Some(Duration::from_secs(2)),
    };
    let client = HttpClient::public(&settings).unwrap();
    let err = client
        .get::<serde_json::Value>(&["scholarships"], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Network { .. }), "{err:?}");
    assert!(err.is_retryable());
}

#[tokio::test]
async fn timeouts_are_flagged() {
    let mock = mock().await;
    mock.set_latency("GET /scholarships", Duration::from_millis(500));
    let settings = ApiSettings {
        timeout: Some(Duration::from_millis(50)),
        ..mock.settings().api
    };
    let client = HttpClient::public(&settings).unwrap();
    let err = client
        .get::<serde_json::Value>(&["scholarships"], &[])
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Network { timeout: true, .. }), "{err:?}");
}

#[tokio::test]
async fn application_lifecycle() {
    let mock = mock().await;
    let api = api(&mock, signed_in("ana@uni.edu"));

    let inserted = api
        .create_application(&fixtures::application("s1", "ana@uni.edu", "Oxford"))
        .await
        .unwrap();
    let id = inserted.inserted_id.expect("inserted id");

    api.update_application(
        &id,
        &ApplicationPatch {
            feedback: Some("Add transcripts".into()),
            enrollment_status: Some("processing".into()),
        },
    )
    .await
    .unwrap();
    api.mark_application_paid(&id).await.unwrap();

    let stored = api.application(&id).await.unwrap();
    assert!(stored.is_paid());
    assert_eq!(stored.feedback.as_deref(), Some("Add transcripts"));
    assert_eq!(mock.count("PATCH", &format!("/applications/payment-done/{id}")), 1);

    let deleted = api.delete_application(&id).await.unwrap();
    assert_eq!(deleted.deleted_count, Some(1));
    assert!(api.applications(Some("ana@uni.edu")).await.unwrap().is_empty());
}

#[tokio::test]
async fn role_lookup_feeds_the_resolver() {
    let mock = mock().await;
    let admin_id = mock.seed("users", &fixtures::user("boss@uni.edu", "admin"));
    let session = signed_in("boss@uni.edu");
    let api = api(&mock, session.clone());

    assert_eq!(
        api.fetch_role("boss@uni.edu").await.unwrap().as_deref(),
        Some("admin")
    );
    assert!(mock
        .requests()
        .iter()
        .any(|r| r.path == "/users/role/boss@uni.edu"));

    let identity = session.resolved().await.unwrap();
    let resolver = RoleResolver::new(api.clone());
    assert_eq!(resolver.resolve_role(&identity).await.unwrap().role, Role::Admin);

    api.update_user_role(&admin_id, &RolePatch { role: Role::Moderator })
        .await
        .unwrap();
    resolver.forget("boss@uni.edu").await;
    assert_eq!(resolver.resolve_role(&identity).await.unwrap().role, Role::Moderator);
}

#[tokio::test]
async fn duplicate_user_is_acknowledged_without_id() {
    let mock = mock().await;
    mock.seed("users", &fixtures::user("ana@uni.edu", "student"));
    let api = api(&mock, signed_in("ana@uni.edu"));

    let result = api
        .create_user(&fixtures::user("ana@uni.edu", "student"))
        .await
        .unwrap();
    assert_eq!(result.inserted_id, None);
    assert_eq!(mock.records("users").len(), 1);
    assert!(api.user("ana@uni.edu").await.unwrap().is_some());
}

#[tokio::test]
async fn checkout_session_returns_gateway_url() {
    let mock = mock().await;
    let api = api(&mock, signed_in("ana@uni.edu"));

    let session = api
        .create_checkout_session(&CheckoutRequest {
            application_fee: Some("25".into()),
            id: "app-1".into(),
            email: "ana@uni.edu".into(),
            scholarship_name: "Grant".into(),
        })
        .await
        .unwrap();
    assert_eq!(
        session.url.as_deref(),
        Some("https://checkout.example.test/pay/app-1")
    );
}
