use std::time::Duration;

use scholarstream_cache::QueryStatus;
use scholarstream_core::{Application, ClientError, Role, Scholarship, ScholarshipPatch, WriteResult};
use scholarstream_security::{GuardDecision, InMemoryIdentityProvider, Rejection, RoleStatus, SessionStore};
use scholarstream_test::{fixtures, MockApi};
use scholarstream_views::derive::FeeOrder;
use scholarstream_views::pages::{
    AddScholarship, Analytics, ApplyOutcome, HomePage, LoginPage, ManageScholarships, ManageUsers,
    MyApplications, MyProfile, PaymentSuccess, RegisterForm, RegisterPage, ScholarshipCatalog,
    ScholarshipDetails,
};
use scholarstream_views::{keys, AppContext, FormError, GuardKind, ReviewDraft, RouteTable};

struct Harness {
    mock: MockApi,
    provider: InMemoryIdentityProvider,
    ctx: AppContext,
}

async fn harness(signed_in: Option<&str>) -> Harness {
    let mock = MockApi::start().await.expect("mock API starts");
    mock.require_auth(true);
    let mut provider = InMemoryIdentityProvider::new();
    if let Some(email) = signed_in {
        provider = provider
            .with_user(email, "secret1", Some("Ana"))
            .with_persisted_session(email);
    }
    let session = SessionStore::start(provider.clone());
    let ctx = AppContext::new(mock.settings(), session).expect("context builds");
    ctx.session().resolved().await;
    Harness { mock, provider, ctx }
}

#[tokio::test]
async fn applying_refreshes_my_applications() {
    let h = harness(Some("ana@uni.edu")).await;
    let id = h.mock.seed("scholarships", &fixtures::scholarship("Grant", "Oxford", "UK", "25"));

    let mine = MyApplications::new(h.ctx.clone());
    let before = mine.load().await;
    assert!(before.is_success());
    assert!(before.data.unwrap().is_empty());

    let details = ScholarshipDetails::new(h.ctx.clone(), id.clone());
    let outcome = details.apply().await.unwrap();
    let ApplyOutcome::Applied { application_id, redirect } = outcome else {
        panic!("expected an application, got {outcome:?}");
    };
    assert!(application_id.is_some());
    assert_eq!(redirect, "/dashboard/myApplications");

    let after = mine.load().await.data.unwrap();
    assert_eq!(after.len(), 1);
    assert_eq!(after[0].scholarship_id, id);
    assert_eq!(after[0].payment_status.as_deref(), Some("unpaid"));
    assert_eq!(h.mock.count("GET", "/applications"), 2);
}

#[tokio::test]
async fn anonymous_apply_redirects_to_sign_in() {
    let h = harness(None).await;
    let id = h.mock.seed("scholarships", &fixtures::scholarship("Grant", "Oxford", "UK", "25"));

    let outcome = ScholarshipDetails::new(h.ctx.clone(), id.clone()).apply().await.unwrap();
    assert_eq!(
        outcome,
        ApplyOutcome::SignIn {
            from: format!("/scholarships/{id}")
        }
    );
    assert_eq!(h.mock.count("POST", "/applications"), 0);
}

#[tokio::test]
async fn failed_write_leaves_cached_reads_alone() {
    let h = harness(Some("ana@uni.edu")).await;
    let id = h.mock.seed("scholarships", &fixtures::scholarship("Grant", "Oxford", "UK", "25"));
    let mine = MyApplications::new(h.ctx.clone());
    mine.load().await;

    h.mock.fail("POST /applications", 500, "db down");
    let err = ScholarshipDetails::new(h.ctx.clone(), id).apply().await.unwrap_err();
    assert_eq!(err, ClientError::api(500, "db down"));

    let state = mine.load().await;
    assert!(state.is_success());
    assert_eq!(h.mock.count("GET", "/applications"), 1);
}

#[tokio::test]
async fn catalog_paginates_and_sorts() {
    let h = harness(None).await;
    for fee in 1..=10 {
        let name = format!("Grant {fee}");
        h.mock.seed("scholarships", &fixtures::scholarship(&name, "Oxford", "UK", &format!("${fee}")));
    }
    let mut catalog = ScholarshipCatalog::new(h.ctx.clone());
    catalog.set_sort(Some(FeeOrder::HighToLow));

    let first = catalog.load().await.data.unwrap();
    assert_eq!(first.items.len(), 8);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.items[0].scholarship_name, "Grant 10");

    catalog.set_page(2);
    let second = catalog.load().await.data.unwrap();
    let names: Vec<&str> = second.items.iter().map(|s| s.scholarship_name.as_str()).collect();
    assert_eq!(names, ["Grant 2", "Grant 1"]);

    assert_eq!(h.mock.count("GET", "/scholarships"), 1);
}

#[tokio::test]
async fn catalog_search_resets_page_and_hits_the_server() {
    let h = harness(None).await;
    h.mock.seed("scholarships", &fixtures::scholarship("Law Grant", "Oxford", "UK", "10"));
    h.mock.seed("scholarships", &fixtures::scholarship("Tech Grant", "MIT", "USA", "20"));
    let mut catalog = ScholarshipCatalog::new(h.ctx.clone());
    catalog.set_page(3);
    catalog.set_search_input("  law ");
    assert_eq!(catalog.params().search, "");

    catalog.submit_search();
    assert_eq!(catalog.params().page, 1);
    let page = catalog.load().await.data.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(h.mock.requests().pop().unwrap().query.as_deref(), Some("search=law"));

    let countries = catalog.countries().await.data.unwrap();
    assert_eq!(countries, ["UK", "USA"]);
}

#[tokio::test]
async fn mine_only_is_ignored_for_anonymous_visitors() {
    let h = harness(None).await;
    let mut catalog = ScholarshipCatalog::new(h.ctx.clone());
    catalog.set_mine_only(true);
    assert!(catalog.filter().params().is_empty());

    let h = harness(Some("ana@uni.edu")).await;
    let mut catalog = ScholarshipCatalog::new(h.ctx.clone());
    catalog.set_mine_only(true);
    assert_eq!(catalog.filter().params(), [("email", "ana@uni.edu")]);
}

#[tokio::test]
async fn applied_only_catalog_follows_applications() {
    let h = harness(Some("ana@uni.edu")).await;
    let id = h.mock.seed("scholarships", &fixtures::scholarship("Grant", "Oxford", "UK", "25"));
    let mut catalog = ScholarshipCatalog::new(h.ctx.clone());
    catalog.set_mine_only(true);
    assert_eq!(catalog.load().await.data.unwrap().total, 0);

    ScholarshipDetails::new(h.ctx.clone(), id.clone()).apply().await.unwrap();
    let applied = catalog.load().await.data.unwrap();
    assert_eq!(applied.total, 1);
    assert_eq!(applied.items[0].id.as_deref(), Some(id.as_str()));

    let mine = MyApplications::new(h.ctx.clone());
    let application = mine.load().await.data.unwrap().remove(0);
    mine.delete(&application).await.unwrap();
    assert_eq!(catalog.load().await.data.unwrap().total, 0);
}

#[tokio::test]
async fn payment_is_recorded_once() {
    let h = harness(Some("ana@uni.edu")).await;
    let id = h.mock.seed("applications", &fixtures::application("s1", "ana@uni.edu", "Oxford"));
    let mine = MyApplications::new(h.ctx.clone());
    assert!(!mine.load().await.data.unwrap()[0].is_paid());

    let page = PaymentSuccess::new(h.ctx.clone(), Some(id.clone()));
    let (a, b) = tokio::join!(page.confirm(), page.confirm());
    assert!(a.is_success() && b.is_success());

    let revisit = PaymentSuccess::new(h.ctx.clone(), Some(id.clone()));
    assert!(revisit.confirm().await.is_success());
    assert_eq!(h.mock.count("PATCH", &format!("/applications/payment-done/{id}")), 1);

    let refreshed = mine.load().await.data.unwrap();
    assert!(refreshed[0].is_paid());
}

#[tokio::test]
async fn payment_waits_for_an_application_id() {
    let h = harness(Some("ana@uni.edu")).await;
    let state = PaymentSuccess::new(h.ctx.clone(), Some(String::new())).confirm().await;
    assert_eq!(state.status, QueryStatus::Pending);
    assert!(h.mock.requests().is_empty());
}

#[tokio::test]
async fn invalid_review_is_not_sent() {
    let h = harness(Some("ana@uni.edu")).await;
    let application = Application {
        id: Some("a1".into()),
        ..fixtures::application("s1", "ana@uni.edu", "Oxford")
    };
    let mine = MyApplications::new(h.ctx.clone());

    let err = mine
        .add_review(&application, &ReviewDraft::new(0, "  "))
        .await
        .unwrap_err();
    let fields: Vec<&str> = err.fields().iter().map(|f| f.field).collect();
    assert_eq!(fields, ["ratingPoint", "reviewComment"]);
    assert_eq!(h.mock.count("POST", "/reviews"), 0);

    mine.add_review(&application, &ReviewDraft::new(5, "Loved it"))
        .await
        .unwrap();
    let stored = h.mock.records("reviews");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0]["email"], "ana@uni.edu");
    assert_eq!(stored[0]["ratingPoint"], 5);
}

#[tokio::test]
async fn checkout_returns_gateway_url_for_unpaid_applications() {
    let h = harness(Some("ana@uni.edu")).await;
    let mine = MyApplications::new(h.ctx.clone());
    let mut application = Application {
        id: Some("a1".into()),
        ..fixtures::application("s1", "ana@uni.edu", "Oxford")
    };

    let url = mine.pay(&application).await.unwrap();
    assert_eq!(url, "https://checkout.example.test/pay/a1");

    application.payment_status = Some("paid".into());
    let err = mine.pay(&application).await.unwrap_err();
    assert!(matches!(err, FormError::Invalid(_)));
}

#[tokio::test]
async fn role_change_is_seen_by_the_next_resolution() {
    let h = harness(Some("boss@uni.edu")).await;
    h.mock.seed("users", &fixtures::user("boss@uni.edu", "admin"));
    assert_eq!(h.ctx.current_role().await, RoleStatus::Resolved(Role::Admin));

    let users = ManageUsers::new(h.ctx.clone());
    let me = users.load().await.data.unwrap().remove(0);
    assert!(!users.change_role(&me, Role::Admin).await.unwrap());

    assert!(users.change_role(&me, Role::Student).await.unwrap());
    let id = me.id.clone().unwrap();
    assert_eq!(h.mock.count("PATCH", &format!("/users/{id}")), 1);
    assert_eq!(h.ctx.current_role().await, RoleStatus::Resolved(Role::Student));
    assert_eq!(h.mock.count("GET", "/users/role/boss@uni.edu"), 2);
}

#[tokio::test]
async fn user_list_filters_by_role() {
    let h = harness(Some("boss@uni.edu")).await;
    h.mock.seed("users", &fixtures::user("boss@uni.edu", "admin"));
    h.mock.seed("users", &fixtures::user("mo@uni.edu", "moderator"));
    h.mock.seed("users", &fixtures::user("st@uni.edu", "student"));
    let mut users = ManageUsers::new(h.ctx.clone());

    assert_eq!(users.load().await.data.unwrap().len(), 3);
    users.set_role_filter(Some(Role::Moderator));
    let moderators = users.load().await.data.unwrap();
    assert_eq!(moderators.len(), 1);
    assert_eq!(moderators[0].email, "mo@uni.edu");
    assert_eq!(h.mock.count("GET", "/users"), 1);
}

#[tokio::test]
async fn sign_out_drops_cached_data() {
    let h = harness(Some("ana@uni.edu")).await;
    MyApplications::new(h.ctx.clone()).load().await;
    assert!(!h.ctx.cache().is_empty());

    h.ctx.sign_out().await;
    assert!(h.ctx.cache().is_empty());
    assert!(h.ctx.session().identity().is_none());

    let state = MyApplications::new(h.ctx.clone()).load().await;
    assert_eq!(state.error, Some(ClientError::Auth(scholarstream_core::AuthError::NoActiveIdentity)));
}

#[tokio::test]
async fn revoked_session_clears_the_cache() {
    let h = harness(Some("ana@uni.edu")).await;
    MyApplications::new(h.ctx.clone()).load().await;
    assert!(!h.ctx.cache().is_empty());

    h.provider.revoke_session();
    tokio::time::timeout(Duration::from_secs(2), async {
        while !h.ctx.cache().is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("cache cleared after the identity went away");
}

#[tokio::test]
async fn leaving_a_page_cancels_its_reads_but_keeps_the_fetch() {
    let h = harness(None).await;
    h.mock.seed("scholarships", &fixtures::scholarship("Grant", "Oxford", "UK", "25"));
    h.mock.set_latency("GET /scholarships", Duration::from_millis(200));
    let catalog = ScholarshipCatalog::new(h.ctx.clone());

    let (state, _) = tokio::join!(catalog.load(), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        catalog.scope().leave();
    });
    assert_eq!(state.error, Some(ClientError::Cancelled));

    let joined = h
        .ctx
        .cache()
        .query(keys::all_scholarships(), || async {
            Err::<Vec<Scholarship>, _>(ClientError::Cancelled)
        })
        .await;
    assert_eq!(joined.data.map(|list| list.len()), Some(1));
    assert_eq!(h.mock.count("GET", "/scholarships"), 1);

    let details = ScholarshipDetails::new(h.ctx.clone(), "x");
    details.scope().leave();
    assert_eq!(details.apply().await, Err(ClientError::Cancelled));
}

#[tokio::test]
async fn stale_data_survives_a_failed_refetch() {
    let h = harness(Some("ana@uni.edu")).await;
    h.mock.seed("applications", &fixtures::application("s1", "ana@uni.edu", "Oxford"));
    let mine = MyApplications::new(h.ctx.clone());
    assert_eq!(mine.load().await.data.unwrap().len(), 1);

    h.mock.fail("GET /applications", 503, "maintenance");
    h.ctx.cache().invalidate_prefix(&keys::my_applications("ana@uni.edu"));
    let state = mine.load().await;
    assert_eq!(state.data.map(|a| a.len()), Some(1));
    assert_eq!(state.error, Some(ClientError::api(503, "maintenance")));
}

#[tokio::test]
async fn home_page_reads_anonymously() {
    let h = harness(None).await;
    let s1 = h.mock.seed("scholarships", &fixtures::scholarship("A", "Oxford", "UK", "10"));
    h.mock.seed("scholarships", &fixtures::scholarship("B", "MIT", "USA", "5"));
    h.mock.seed("applications", &fixtures::application(&s1, "x@uni.edu", "Oxford"));
    h.mock.seed("reviews", &fixtures::review(&s1, "x@uni.edu", 5, "Great"));
    let home = HomePage::new(h.ctx.clone());

    let featured = home.featured_scholarships().await.data.unwrap();
    assert_eq!(featured[0].scholarship_name, "B");

    let stats = home.stats().await.data.unwrap();
    assert_eq!((stats.scholarships, stats.applications, stats.countries), (2, 1, 2));

    let reviews = home.featured_reviews().await.data.unwrap();
    assert_eq!(reviews.len(), 1);
    assert!(h.mock.requests().iter().all(|r| r.bearer.is_none()));

    let details = ScholarshipDetails::new(h.ctx.clone(), s1);
    assert_eq!(details.reviews().await.data.unwrap().len(), 1);
}

#[tokio::test]
async fn profile_joins_record_and_role() {
    let h = harness(Some("mo@uni.edu")).await;
    h.mock.seed("users", &fixtures::user("mo@uni.edu", "moderator"));
    let view = MyProfile::new(h.ctx.clone()).load().await.data.unwrap();
    assert_eq!(view.identity.email, "mo@uni.edu");
    assert_eq!(view.role, Some(Role::Moderator));
    assert_eq!(view.record.unwrap().email, "mo@uni.edu");
}

#[tokio::test]
async fn admin_scholarship_forms_validate_before_sending() {
    let h = harness(Some("boss@uni.edu")).await;
    let add = AddScholarship::new(h.ctx.clone());

    let err = add
        .submit(&Scholarship {
            application_fee: Some("free".into()),
            image: Some("not a url".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
    let fields: Vec<&str> = err.fields().iter().map(|f| f.field).collect();
    assert!(fields.contains(&"scholarshipName"));
    assert!(fields.contains(&"applicationFee"));
    assert!(fields.contains(&"image"));
    assert_eq!(h.mock.count("POST", "/scholarships"), 0);

    add.submit(&fixtures::scholarship("Grant", "Oxford", "UK", "10"))
        .await
        .unwrap();
    let manage = ManageScholarships::new(h.ctx.clone());
    let listed = manage.load().await.data.unwrap();
    assert_eq!(listed.len(), 1);

    let id = listed[0].id.clone().unwrap();
    assert!(manage.update(&id, &ScholarshipPatch::default()).await.is_err());
    let patch = ScholarshipPatch {
        application_fee: Some("15".into()),
        ..Default::default()
    };
    let result: WriteResult = manage.update(&id, &patch).await.unwrap();
    assert_eq!(result.modified_count, Some(1));
    assert_eq!(manage.load().await.data.unwrap()[0].application_fee.as_deref(), Some("15"));
}

#[tokio::test]
async fn analytics_summarises_shared_lists() {
    let h = harness(Some("boss@uni.edu")).await;
    h.mock.seed("users", &fixtures::user("boss@uni.edu", "admin"));
    h.mock.seed("scholarships", &fixtures::scholarship("Grant", "Oxford", "UK", "10"));
    let mut paid = fixtures::application("s1", "x@uni.edu", "Oxford");
    paid.payment_status = Some("paid".into());
    h.mock.seed("applications", &paid);
    h.mock.seed("applications", &fixtures::application("s1", "y@uni.edu", "Oxford"));

    let summary = Analytics::new(h.ctx.clone()).load().await.data.unwrap();
    assert_eq!(summary.total_users, 1);
    assert_eq!(summary.total_scholarships, 1);
    assert_eq!(summary.fees_collected_display(), "25.00");
    assert_eq!(summary.per_university, [("Oxford".to_string(), 2)]);
}

#[tokio::test]
async fn route_guards_follow_the_resolved_role() {
    let h = harness(Some("st@uni.edu")).await;
    h.mock.seed("users", &fixtures::user("st@uni.edu", "student"));
    let table = RouteTable::default();

    let admin = table.resolve("/dashboard/analytics").unwrap();
    let mut gate = admin.route.guard.gate(&h.ctx, "/dashboard/analytics").unwrap();
    assert!(matches!(
        gate.settled().await,
        GuardDecision::Deny(Rejection::Forbidden { .. })
    ));

    let mine = table.resolve("/dashboard/myApplications").unwrap();
    let mut gate = mine.route.guard.gate(&h.ctx, "/dashboard/myApplications").unwrap();
    assert_eq!(gate.settled().await, GuardDecision::Allow);

    assert!(GuardKind::Public.gate(&h.ctx, "/").is_none());
}

#[tokio::test]
async fn anonymous_visitors_are_sent_to_sign_in() {
    let h = harness(None).await;
    let mut gate = GuardKind::Authenticated
        .gate(&h.ctx, "/dashboard/myReviews")
        .unwrap();
    assert_eq!(
        gate.settled().await,
        GuardDecision::Deny(Rejection::SignIn {
            from: "/dashboard/myReviews".into()
        })
    );
}

#[tokio::test]
async fn registration_creates_a_student_record() {
    let h = harness(None).await;
    let page = RegisterPage::new(h.ctx.clone());

    let err = page.register(&RegisterForm::default()).await.unwrap_err();
    assert!(matches!(err, FormError::Invalid(_)));

    let form = RegisterForm {
        name: "New Student".into(),
        email: "new@uni.edu".into(),
        password: "secret1".into(),
        photo_url: None,
    };
    assert_eq!(page.register(&form).await.unwrap(), "/");
    let users = h.mock.records("users");
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["email"], "new@uni.edu");
    assert_eq!(users[0]["role"], "student");
    assert_eq!(
        h.ctx.session().identity().unwrap().display_name.as_deref(),
        Some("New Student")
    );
}

#[tokio::test]
async fn registration_reports_a_rejected_profile_update() {
    let h = harness(None).await;
    h.provider.set_profile_update_failure(true);
    let form = RegisterForm {
        name: "New Student".into(),
        email: "new@uni.edu".into(),
        password: "secret1".into(),
        photo_url: None,
    };

    let err = RegisterPage::new(h.ctx.clone()).register(&form).await.unwrap_err();
    assert!(matches!(err, FormError::Client(ClientError::Auth(_))));
    assert_eq!(h.mock.records("users").len(), 1);
    assert_eq!(h.ctx.session().identity().unwrap().display_name, None);
}

#[tokio::test]
async fn login_returns_to_the_guarded_page() {
    let mock = MockApi::start().await.unwrap();
    let provider = InMemoryIdentityProvider::new().with_user("ana@uni.edu", "secret1", None);
    let ctx = AppContext::new(mock.settings(), SessionStore::start(provider)).unwrap();
    ctx.session().resolved().await;

    let page = LoginPage::new(ctx.clone(), Some("/dashboard/myReviews".into()));
    assert!(page.sign_in("ana@uni.edu", "wrong").await.is_err());
    assert_eq!(
        page.sign_in("ana@uni.edu", "secret1").await.unwrap(),
        "/dashboard/myReviews"
    );

    let page = LoginPage::new(ctx, Some("/login".into()));
    assert_eq!(page.redirect(), "/");
}
