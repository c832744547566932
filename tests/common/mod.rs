//! Shared harness: the full router over an in-memory repository with three
//! accounts, driven through `tower::ServiceExt::oneshot`.
#![allow(dead_code)]

use anime_catalog::{
    AppState, InMemoryRepository, RepositoryState, auth::ensure_user, create_router, models::Role,
};
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const ADMIN: (&str, &str) = ("admin", "adminpass");
pub const USER: (&str, &str) = ("user", "userpass");
/// Authenticates fine but holds no roles.
pub const GUEST: (&str, &str) = ("guest", "guestpass");

pub struct TestApp {
    pub router: Router,
    pub repo: RepositoryState,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// `Value::Null` when the body is empty.
    pub body: Value,
}

pub async fn spawn_app() -> TestApp {
    let repo: RepositoryState = Arc::new(InMemoryRepository::new());
    seed_accounts(&repo).await;
    TestApp {
        router: create_router(AppState::new(repo.clone())),
        repo,
    }
}

pub async fn seed_accounts(repo: &RepositoryState) {
    ensure_user(repo, ADMIN.0, ADMIN.1, &[Role::Admin, Role::User])
        .await
        .unwrap();
    ensure_user(repo, USER.0, USER.1, &[Role::User]).await.unwrap();
    ensure_user(repo, GUEST.0, GUEST.1, &[]).await.unwrap();
}

pub fn basic(credentials: (&str, &str)) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{}:{}", credentials.0, credentials.1))
    )
}

pub fn request(
    method: Method,
    uri: &str,
    credentials: Option<(&str, &str)>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(credentials) = credentials {
        builder = builder.header(header::AUTHORIZATION, basic(credentials));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body: {}", String::from_utf8_lossy(&bytes))
            })
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, credentials: Option<(&str, &str)>) -> TestResponse {
        self.send(request(Method::GET, uri, credentials, None)).await
    }

    pub async fn post(&self, uri: &str, credentials: (&str, &str), body: Value) -> TestResponse {
        self.send(request(Method::POST, uri, Some(credentials), Some(body)))
            .await
    }

    pub async fn put(&self, uri: &str, credentials: (&str, &str), body: Value) -> TestResponse {
        self.send(request(Method::PUT, uri, Some(credentials), Some(body)))
            .await
    }

    pub async fn delete(&self, uri: &str, credentials: (&str, &str)) -> TestResponse {
        self.send(request(Method::DELETE, uri, Some(credentials), None))
            .await
    }
}

/// Asserts the `{status, error, message}` part of the error contract.
pub fn assert_error(response: &TestResponse, status: StatusCode, message: Option<&str>) {
    assert_eq!(response.status, status, "body: {}", response.body);
    assert_eq!(response.body["status"], status.as_u16());
    assert_eq!(
        response.body["error"],
        status.canonical_reason().unwrap()
    );
    if let Some(message) = message {
        assert_eq!(response.body["message"], message);
    }
}
