//! In-process Keystone + Swift stand-in for integration tests.
//!
//! ## Routes
//! - `POST   /v3/auth/tokens`: password auth, issues `X-Subject-Token`
//! - `GET|HEAD|POST /v1/{account}`: list containers, account metadata
//! - `PUT|GET|HEAD|POST|DELETE /v1/{account}/{container}`
//! - `PUT|GET|HEAD|POST|DELETE /v1/{account}/{container}/{*object}`

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use object_storage::Endpoints;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tokio::net::TcpListener;
use uuid::Uuid;

pub const PROJECT: &str = "p";
pub const USER: &str = "u";
pub const PASSWORD: &str = "pw";

#[derive(Default)]
struct MockObject {
    data: Bytes,
    meta: BTreeMap<String, String>,
}

#[derive(Default)]
struct MockContainer {
    meta: BTreeMap<String, String>,
    objects: BTreeMap<String, MockObject>,
}

struct Inner {
    tokens: Mutex<HashSet<String>>,
    account_meta: Mutex<BTreeMap<String, String>>,
    containers: Mutex<BTreeMap<String, MockContainer>>,
    expires_at: Mutex<String>,
    auth_calls: AtomicUsize,
}

/// Shared state of the mock server; clones observe the same server.
#[derive(Clone)]
pub struct MockSwift {
    inner: Arc<Inner>,
}

impl MockSwift {
    /// Start the server on an ephemeral port and return it with matching endpoints.
    pub async fn spawn() -> (Self, Endpoints) {
        let mock = MockSwift {
            inner: Arc::new(Inner {
                tokens: Mutex::new(HashSet::new()),
                account_meta: Mutex::new(BTreeMap::new()),
                containers: Mutex::new(BTreeMap::new()),
                expires_at: Mutex::new("2999-01-01T00:00:00.000000Z".to_string()),
                auth_calls: AtomicUsize::new(0),
            }),
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = routes().with_state(mock.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let endpoints = Endpoints::new(
            format!("http://{addr}/v3/auth/tokens"),
            format!("http://{addr}/v1/AUTH_"),
        );
        (mock, endpoints)
    }

    /// Expiry stamped on tokens issued from now on.
    pub fn set_expiry(&self, expires_at: &str) {
        *self.inner.expires_at.lock() = expires_at.to_string();
    }

    pub fn auth_calls(&self) -> usize {
        self.inner.auth_calls.load(Ordering::SeqCst)
    }

    /// Forget every issued token, as if they were revoked server-side.
    pub fn revoke_tokens(&self) {
        self.inner.tokens.lock().clear();
    }
}

fn routes() -> Router<MockSwift> {
    Router::new()
        .route("/v3/auth/tokens", post(issue_token))
        .route(
            "/v1/{account}",
            get(list_containers).head(head_account).post(post_account),
        )
        .route(
            "/v1/{account}/{container}",
            put(create_container)
                .get(list_objects)
                .head(head_container)
                .post(post_container)
                .delete(delete_container),
        )
        .route(
            "/v1/{account}/{container}/{*object}",
            put(put_object)
                .get(get_object)
                .head(head_object)
                .post(post_object)
                .delete(delete_object),
        )
}

async fn issue_token(State(mock): State<MockSwift>, Json(body): Json<Value>) -> Response {
    mock.inner.auth_calls.fetch_add(1, Ordering::SeqCst);

    let user = &body["auth"]["identity"]["password"]["user"];
    let project = &body["auth"]["scope"]["project"]["id"];
    if user["id"] != USER || user["password"] != PASSWORD || project != PROJECT {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"code": 401, "title": "Unauthorized"}})),
        )
            .into_response();
    }

    let token = Uuid::new_v4().simple().to_string();
    mock.inner.tokens.lock().insert(token.clone());
    let expires_at = mock.inner.expires_at.lock().clone();

    (
        StatusCode::CREATED,
        [("X-Subject-Token", token)],
        Json(json!({"token": {"expires_at": expires_at, "methods": ["password"]}})),
    )
        .into_response()
}

fn authorize(mock: &MockSwift, headers: &HeaderMap) -> Result<(), StatusCode> {
    let token = headers
        .get("x-auth-token")
        .and_then(|v| v.to_str().ok())
        .ok_or(StatusCode::UNAUTHORIZED)?;
    if mock.inner.tokens.lock().contains(token) {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

fn collect_meta(headers: &HeaderMap, prefix: &str, into: &mut BTreeMap<String, String>) {
    for (name, value) in headers {
        if name.as_str().starts_with(prefix) {
            if let Ok(value) = value.to_str() {
                into.insert(name.as_str().to_string(), value.to_string());
            }
        }
    }
}

fn meta_headers(meta: &BTreeMap<String, String>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in meta {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.insert(name, value);
        }
    }
    headers
}

fn listing(names: Vec<String>) -> Response {
    if names.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }
    let mut body = names.join("\n");
    body.push('\n');
    (StatusCode::OK, body).into_response()
}

async fn list_containers(
    State(mock): State<MockSwift>,
    Path(_account): Path<String>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&mock, &headers)?;
    let names = mock.inner.containers.lock().keys().cloned().collect();
    Ok(listing(names))
}

async fn head_account(
    State(mock): State<MockSwift>,
    Path(_account): Path<String>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&mock, &headers)?;
    let mut out = meta_headers(&mock.inner.account_meta.lock());
    let count = mock.inner.containers.lock().len();
    out.insert("x-account-container-count", HeaderValue::from(count));
    Ok((StatusCode::NO_CONTENT, out).into_response())
}

async fn post_account(
    State(mock): State<MockSwift>,
    Path(_account): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    authorize(&mock, &headers)?;
    collect_meta(&headers, "x-account-meta-", &mut mock.inner.account_meta.lock());
    Ok(StatusCode::NO_CONTENT)
}

async fn create_container(
    State(mock): State<MockSwift>,
    Path((_account, container)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    authorize(&mock, &headers)?;
    let mut containers = mock.inner.containers.lock();
    if containers.contains_key(&container) {
        return Ok(StatusCode::ACCEPTED);
    }
    containers.insert(container, MockContainer::default());
    Ok(StatusCode::CREATED)
}

async fn list_objects(
    State(mock): State<MockSwift>,
    Path((_account, container)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&mock, &headers)?;
    let containers = mock.inner.containers.lock();
    let found = containers.get(&container).ok_or(StatusCode::NOT_FOUND)?;
    Ok(listing(found.objects.keys().cloned().collect()))
}

async fn head_container(
    State(mock): State<MockSwift>,
    Path((_account, container)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&mock, &headers)?;
    let containers = mock.inner.containers.lock();
    let found = containers.get(&container).ok_or(StatusCode::NOT_FOUND)?;
    let mut out = meta_headers(&found.meta);
    out.insert("x-container-object-count", HeaderValue::from(found.objects.len()));
    Ok((StatusCode::NO_CONTENT, out).into_response())
}

async fn post_container(
    State(mock): State<MockSwift>,
    Path((_account, container)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    authorize(&mock, &headers)?;
    let mut containers = mock.inner.containers.lock();
    let found = containers.get_mut(&container).ok_or(StatusCode::NOT_FOUND)?;
    collect_meta(&headers, "x-container-meta-", &mut found.meta);
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_container(
    State(mock): State<MockSwift>,
    Path((_account, container)): Path<(String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    authorize(&mock, &headers)?;
    let mut containers = mock.inner.containers.lock();
    let found = containers.get(&container).ok_or(StatusCode::NOT_FOUND)?;
    if !found.objects.is_empty() {
        return Err(StatusCode::CONFLICT);
    }
    containers.remove(&container);
    Ok(StatusCode::NO_CONTENT)
}

async fn put_object(
    State(mock): State<MockSwift>,
    Path((_account, container, object)): Path<(String, String, String)>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, StatusCode> {
    authorize(&mock, &headers)?;
    let mut containers = mock.inner.containers.lock();
    let found = containers.get_mut(&container).ok_or(StatusCode::NOT_FOUND)?;
    let etag = format!("{:x}", md5::compute(&body));
    found.objects.insert(
        object,
        MockObject {
            data: body,
            meta: BTreeMap::new(),
        },
    );
    Ok((StatusCode::CREATED, [("etag", etag)]).into_response())
}

async fn get_object(
    State(mock): State<MockSwift>,
    Path((_account, container, object)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&mock, &headers)?;
    let containers = mock.inner.containers.lock();
    let found = containers
        .get(&container)
        .and_then(|c| c.objects.get(&object))
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok((StatusCode::OK, meta_headers(&found.meta), found.data.clone()).into_response())
}

async fn head_object(
    State(mock): State<MockSwift>,
    Path((_account, container, object)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<Response, StatusCode> {
    authorize(&mock, &headers)?;
    let containers = mock.inner.containers.lock();
    let found = containers
        .get(&container)
        .and_then(|c| c.objects.get(&object))
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok((StatusCode::OK, meta_headers(&found.meta)).into_response())
}

async fn post_object(
    State(mock): State<MockSwift>,
    Path((_account, container, object)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    authorize(&mock, &headers)?;
    let mut containers = mock.inner.containers.lock();
    let found = containers
        .get_mut(&container)
        .and_then(|c| c.objects.get_mut(&object))
        .ok_or(StatusCode::NOT_FOUND)?;
    found.meta.clear();
    collect_meta(&headers, "x-object-meta-", &mut found.meta);
    Ok(StatusCode::ACCEPTED)
}

async fn delete_object(
    State(mock): State<MockSwift>,
    Path((_account, container, object)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Result<StatusCode, StatusCode> {
    authorize(&mock, &headers)?;
    let mut containers = mock.inner.containers.lock();
    containers
        .get_mut(&container)
        .and_then(|c| c.objects.remove(&object))
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(StatusCode::NO_CONTENT)
}
