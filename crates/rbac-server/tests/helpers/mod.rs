//! Shared helpers for HTTP integration tests

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use rbac_server::{config::Config, container::AppContainer};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;

/// Configuration suitable for tests: cheapest bcrypt cost
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.security.bcrypt_cost = 4;
    config
}

/// Full application router on top of the test pool
pub fn setup_app(pool: PgPool) -> Router {
    AppContainer::from_pool(pool, &test_config()).router(&test_config())
}

/// Test request builder
pub struct TestRequest {
    method: &'static str,
    uri: String,
    body: Option<Value>,
    headers: Vec<(&'static str, String)>,
}

impl TestRequest {
    pub fn get(uri: impl Into<String>) -> Self {
        Self::new("GET", uri)
    }

    pub fn post(uri: impl Into<String>, body: Value) -> Self {
        Self::new("POST", uri).json(body)
    }

    pub fn put(uri: impl Into<String>, body: Value) -> Self {
        Self::new("PUT", uri).json(body)
    }

    pub fn delete(uri: impl Into<String>) -> Self {
        Self::new("DELETE", uri)
    }

    fn new(method: &'static str, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }

    /// Send through the router and decode the JSON body
    pub async fn send(self, app: &Router) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(self.method).uri(&self.uri);
        for (name, value) in &self.headers {
            builder = builder.header(*name, value);
        }

        let body = match self.body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            },
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }
}

/// Assert the failure envelope and return its error code
pub fn error_code(body: &Value) -> &str {
    assert_eq!(body["success"], false, "expected failure envelope: {body}");
    body["error"]["code"].as_str().unwrap()
}

/// Create a user over the API and return its id
pub async fn create_user(app: &Router, username: &str) -> i64 {
    let (status, body) = TestRequest::post(
        "/api/v1/users",
        serde_json::json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "secret123",
        }),
    )
    .send(app)
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().unwrap()
}

/// Create a role over the API and return its id
pub async fn create_role(app: &Router, name: &str) -> i64 {
    let (status, body) = TestRequest::post(
        "/api/v1/roles",
        serde_json::json!({ "name": name, "display_name": name.to_uppercase() }),
    )
    .send(app)
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().unwrap()
}

/// Create a permission over the API and return its id
pub async fn create_permission(app: &Router, resource: &str, action: &str) -> i64 {
    let (status, body) = TestRequest::post(
        "/api/v1/permissions",
        serde_json::json!({
            "name": format!("{resource}:{action}"),
            "display_name": format!("{action} {resource}"),
            "resource": resource,
            "action": action,
        }),
    )
    .send(app)
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().unwrap()
}
