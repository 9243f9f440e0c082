//! Common test utilities for dashboard integration tests

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use sharedash::{
    AppState, DefaultAccount, crypto::password::HashingParams, routes,
    storage::memory::MemoryKeyValueStore,
};
use tower::ServiceExt;

/// Builds an in-memory app with the default admin account.
pub fn create_test_app() -> (Router, AppState) {
    let state = AppState::new(
        Arc::new(MemoryKeyValueStore::new()),
        chrono::Duration::days(7),
        HashingParams::fast(),
    );
    state
        .auth
        .ensure_default_account(&DefaultAccount::default())
        .expect("bootstrap account");

    (routes::create_router(state.clone()), state)
}

/// Sends a request and returns the status with the decoded JSON body.
pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };

    (status, json)
}

pub fn signup_body(username: &str, email: &str) -> Value {
    serde_json::json!({
        "firstName": "Grace",
        "lastName": "Hopper",
        "username": username,
        "email": email,
        "password": "abc123!@",
        "confirmPassword": "abc123!@",
    })
}
