use std::collections::{HashMap, HashSet, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::extract::{Path, Query, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use dashmap::DashMap;
use scholarstream_core::ClientSettings;
use serde_json::{json, Map, Value};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

const RESOURCES: [&str; 4] = ["scholarships", "applications", "reviews", "users"];

/// One request as seen by the mock server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    /// Bearer token from the `Authorization` header, if any.
    pub bearer: Option<String>,
}

struct MockInner {
    collections: DashMap<&'static str, Vec<Value>>,
    requests: Mutex<Vec<RecordedRequest>>,
    /// Rule -> fixed latency. Rules are `"METHOD /path-prefix"`.
    latency: DashMap<String, Duration>,
    /// Rule -> one-shot latencies consumed in order.
    queued_delays: Mutex<HashMap<String, VecDeque<Duration>>>,
    failures: DashMap<String, (u16, String)>,
    require_auth: AtomicBool,
}

#[derive(Clone)]
struct MockState {
    inner: Arc<MockInner>,
}

impl MockState {
    fn new() -> Self {
        let collections = DashMap::new();
        for resource in RESOURCES {
            collections.insert(resource, Vec::new());
        }
        Self {
            inner: Arc::new(MockInner {
                collections,
                requests: Mutex::new(Vec::new()),
                latency: DashMap::new(),
                queued_delays: Mutex::new(HashMap::new()),
                failures: DashMap::new(),
                require_auth: AtomicBool::new(false),
            }),
        }
    }

    fn collection(resource: &str) -> Option<&'static str> {
        RESOURCES.into_iter().find(|r| *r == resource)
    }

    fn records(&self, resource: &'static str) -> Vec<Value> {
        self.inner
            .collections
            .get(resource)
            .map(|c| c.value().clone())
            .unwrap_or_default()
    }

    fn insert(&self, resource: &'static str, mut record: Value) -> String {
        let id = match record.get("_id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => uuid::Uuid::new_v4().simple().to_string(),
        };
        if let Some(obj) = record.as_object_mut() {
            obj.insert("_id".into(), Value::String(id.clone()));
            obj.entry("createdAt")
                .or_insert_with(|| Value::String(format!("2025-01-01T00:00:{:02}Z", self.len(resource) % 60)));
        }
        if let Some(mut collection) = self.inner.collections.get_mut(resource) {
            collection.push(record);
        }
        id
    }

    fn len(&self, resource: &'static str) -> usize {
        self.inner.collections.get(resource).map(|c| c.len()).unwrap_or(0)
    }

    fn delay_for(&self, key: &str) -> Option<Duration> {
        {
            let mut queued = lock(&self.inner.queued_delays);
            for (rule, delays) in queued.iter_mut() {
                if key.starts_with(rule.as_str()) {
                    if let Some(delay) = delays.pop_front() {
                        return Some(delay);
                    }
                }
            }
        }
        self.inner
            .latency
            .iter()
            .find(|rule| key.starts_with(rule.key().as_str()))
            .map(|rule| *rule.value())
    }

    fn failure_for(&self, key: &str) -> Option<(u16, String)> {
        self.inner
            .failures
            .iter()
            .find(|rule| key.starts_with(rule.key().as_str()))
            .map(|rule| rule.value().clone())
    }

    /// Catalog and home-page reads stay public; everything else needs a token.
    fn needs_token(&self, method: &str, path: &str, query: Option<&str>) -> bool {
        if !self.inner.require_auth.load(Ordering::SeqCst) {
            return false;
        }
        if method != "GET" {
            return true;
        }
        let unfiltered = query.map_or(true, |q| !q.contains("email="));
        !(path.starts_with("/scholarships")
            || (unfiltered && (path == "/applications" || path == "/reviews")))
    }
}

/// In-process REST API with in-memory resources.
///
/// Serves the same routes as the real backend on an ephemeral port, records
/// every request, and can inject latency and failures per route prefix.
/// The server stops when the `MockApi` is dropped.
pub struct MockApi {
    addr: SocketAddr,
    state: MockState,
    _shutdown: DropGuard,
}

impl MockApi {
    pub async fn start() -> std::io::Result<Self> {
        let state = MockState::new();
        let router = router(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let token = CancellationToken::new();
        let shutdown = token.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, router)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
        });
        debug!(%addr, "Mock API listening");
        Ok(Self {
            addr,
            state,
            _shutdown: token.drop_guard(),
        })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    /// Client settings pointing at this server.
    pub fn settings(&self) -> ClientSettings {
        ClientSettings::for_base_url(&self.base_url()).expect("mock address is a valid URL")
    }

    // -- seeding and inspection ------------------------------------------

    /// Insert a record (anything serializable) into `resource`; returns its id.
    pub fn seed<T: serde::Serialize>(&self, resource: &str, record: &T) -> String {
        let resource = MockState::collection(resource).expect("known resource");
        let value = serde_json::to_value(record).expect("record serializes");
        self.state.insert(resource, value)
    }

    pub fn records(&self, resource: &str) -> Vec<Value> {
        MockState::collection(resource)
            .map(|r| self.state.records(r))
            .unwrap_or_default()
    }

    pub fn find(&self, resource: &str, id: &str) -> Option<Value> {
        self.records(resource)
            .into_iter()
            .find(|r| r.get("_id").and_then(Value::as_str) == Some(id))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.inner.requests).clone()
    }

    /// Number of requests with exactly this method and path.
    pub fn count(&self, method: &str, path: &str) -> usize {
        lock(&self.state.inner.requests)
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    // -- fault injection -------------------------------------------------

    /// Delay every request matching `rule` (`"GET /scholarships"`).
    pub fn set_latency(&self, rule: &str, latency: Duration) {
        self.state.inner.latency.insert(rule.to_string(), latency);
    }

    /// Delay only the next request matching `rule`. Calls queue up.
    pub fn delay_next(&self, rule: &str, latency: Duration) {
        lock(&self.state.inner.queued_delays)
            .entry(rule.to_string())
            .or_default()
            .push_back(latency);
    }

    /// Answer every request matching `rule` with `status` and a JSON message.
    pub fn fail(&self, rule: &str, status: u16, message: &str) {
        self.state
            .inner
            .failures
            .insert(rule.to_string(), (status, message.to_string()));
    }

    pub fn clear_failure(&self, rule: &str) {
        self.state.inner.failures.remove(rule);
    }

    /// Reject non-public requests that carry no bearer token with 401.
    pub fn require_auth(&self, required: bool) {
        self.state.inner.require_auth.store(required, Ordering::SeqCst);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn router(state: MockState) -> Router {
    Router::new()
        .route("/create-checkout-sessions", post(create_checkout_session))
        .route("/users/role/{email}", get(role_of))
        .route("/applications/payment-done/{id}", patch(payment_done))
        .route("/{resource}", get(list).post(create))
        .route("/{resource}/{id}", get(get_one).patch(update).delete(remove))
        .layer(middleware::from_fn_with_state(state.clone(), observe))
        .with_state(state)
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

async fn observe(State(state): State<MockState>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let query = request.uri().query().map(str::to_string);
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    let key = format!("{method} {path}");
    let needs_token = state.needs_token(&method, &path, query.as_deref());
    let anonymous = bearer.is_none();

    lock(&state.inner.requests).push(RecordedRequest {
        method,
        path,
        query,
        bearer,
    });

    if let Some(delay) = state.delay_for(&key) {
        tokio::time::sleep(delay).await;
    }
    if let Some((status, text)) = state.failure_for(&key) {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        return message(status, &text);
    }
    if needs_token && anonymous {
        return message(StatusCode::UNAUTHORIZED, "unauthorized access");
    }
    next.run(request).await
}

fn field<'a>(record: &'a Value, name: &str) -> &'a str {
    record.get(name).and_then(Value::as_str).unwrap_or_default()
}

async fn list(
    State(state): State<MockState>,
    Path(resource): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Response {
    let Some(resource) = MockState::collection(&resource) else {
        return message(StatusCode::NOT_FOUND, "unknown resource");
    };
    let email = params.get("email").filter(|e| !e.is_empty());
    let records = state.records(resource);

    let filtered: Vec<Value> = match resource {
        "scholarships" => {
            let search = params.get("search").map(|s| s.to_lowercase());
            let country = params.get("country").map(|c| c.to_lowercase());
            let applied: Option<HashSet<String>> = email.map(|email| {
                state
                    .records("applications")
                    .iter()
                    .filter(|a| field(a, "userEmail") == email)
                    .map(|a| field(a, "scholarshipId").to_string())
                    .collect()
            });
            records
                .into_iter()
                .filter(|s| {
                    search.as_ref().map_or(true, |term| {
                        ["scholarshipName", "universityName", "degree"]
                            .iter()
                            .any(|f| field(s, f).to_lowercase().contains(term))
                    })
                })
                .filter(|s| {
                    country
                        .as_ref()
                        .map_or(true, |c| field(s, "country").to_lowercase() == *c)
                })
                .filter(|s| {
                    applied
                        .as_ref()
                        .map_or(true, |ids| ids.contains(field(s, "_id")))
                })
                .collect()
        }
        "applications" => records
            .into_iter()
            .filter(|a| email.map_or(true, |e| field(a, "userEmail") == e))
            .collect(),
        _ => records
            .into_iter()
            .filter(|r| email.map_or(true, |e| field(r, "email") == e))
            .collect(),
    };
    Json(Value::Array(filtered)).into_response()
}

async fn get_one(
    State(state): State<MockState>,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    let Some(resource) = MockState::collection(&resource) else {
        return message(StatusCode::NOT_FOUND, "unknown resource");
    };
    match state
        .records(resource)
        .into_iter()
        .find(|r| field(r, "_id") == id)
    {
        Some(record) => Json(record).into_response(),
        None => message(StatusCode::NOT_FOUND, "not found"),
    }
}

async fn create(
    State(state): State<MockState>,
    Path(resource): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some(resource) = MockState::collection(&resource) else {
        return message(StatusCode::NOT_FOUND, "unknown resource");
    };
    if !body.is_object() {
        return message(StatusCode::BAD_REQUEST, "expected a JSON object");
    }
    if resource == "users" {
        let email = field(&body, "email");
        if state.records("users").iter().any(|u| field(u, "email") == email) {
            return Json(json!({ "message": "user already exists", "insertedId": null }))
                .into_response();
        }
    }
    let id = state.insert(resource, body);
    Json(json!({ "insertedId": id, "acknowledged": true })).into_response()
}

fn modify(
    state: &MockState,
    resource: &'static str,
    id: &str,
    change: impl FnOnce(&mut Map<String, Value>),
) -> Response {
    let Some(mut collection) = state.inner.collections.get_mut(resource) else {
        return message(StatusCode::NOT_FOUND, "unknown resource");
    };
    match collection
        .iter_mut()
        .find(|r| field(r, "_id") == id)
        .and_then(Value::as_object_mut)
    {
        Some(record) => {
            change(record);
            Json(json!({ "modifiedCount": 1, "acknowledged": true })).into_response()
        }
        None => message(StatusCode::NOT_FOUND, "not found"),
    }
}

async fn update(
    State(state): State<MockState>,
    Path((resource, id)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    let Some(resource) = MockState::collection(&resource) else {
        return message(StatusCode::NOT_FOUND, "unknown resource");
    };
    let Value::Object(fields) = body else {
        return message(StatusCode::BAD_REQUEST, "expected a JSON object");
    };
    modify(&state, resource, &id, |record| {
        for (k, v) in fields {
            record.insert(k, v);
        }
    })
}

async fn remove(
    State(state): State<MockState>,
    Path((resource, id)): Path<(String, String)>,
) -> Response {
    let Some(resource) = MockState::collection(&resource) else {
        return message(StatusCode::NOT_FOUND, "unknown resource");
    };
    let Some(mut collection) = state.inner.collections.get_mut(resource) else {
        return message(StatusCode::NOT_FOUND, "unknown resource");
    };
    let before = collection.len();
    collection.retain(|r| field(r, "_id") != id);
    let deleted = before - collection.len();
    Json(json!({ "deletedCount": deleted, "acknowledged": true })).into_response()
}

async fn payment_done(State(state): State<MockState>, Path(id): Path<String>) -> Response {
    modify(&state, "applications", &id, |record| {
        record.insert("paymentStatus".into(), Value::String("paid".into()));
    })
}

async fn role_of(State(state): State<MockState>, Path(email): Path<String>) -> Response {
    match state
        .records("users")
        .into_iter()
        .find(|u| field(u, "email") == email)
    {
        Some(user) => Json(json!({ "role": user.get("role").cloned().unwrap_or(Value::Null) }))
            .into_response(),
        None => message(StatusCode::NOT_FOUND, "user not found"),
    }
}

async fn create_checkout_session(Json(body): Json<Value>) -> Response {
    let id = field(&body, "id");
    if id.is_empty() {
        return message(StatusCode::BAD_REQUEST, "missing application id");
    }
    Json(json!({ "url": format!("https://checkout.example.test/pay/{id}") })).into_response()
}
