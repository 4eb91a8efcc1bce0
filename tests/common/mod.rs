// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request, Response};
use mavericks_admin::config::Config;
use mavericks_admin::db::{FirestoreDb, MemoryStore, UpdatePolicy};
use mavericks_admin::routes::create_router;
use mavericks_admin::services::IdentityGateway;
use mavericks_admin::AppState;
use std::sync::Arc;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::new("test-project", UpdatePolicy::FailIfMissing)
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Test app over in-memory backends.
#[allow(dead_code)]
pub struct TestApp {
    pub router: axum::Router,
    pub state: Arc<AppState>,
    pub store: Arc<MemoryStore>,
}

/// Create a test app on a fresh in-memory store and account table.
#[allow(dead_code)]
pub fn create_test_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let db = FirestoreDb::with_memory_store(store.clone(), UpdatePolicy::Upsert);
    let state = Arc::new(AppState::new(
        Config::test_default(),
        db,
        IdentityGateway::new_in_memory(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        store,
    }
}

/// Create a test app whose document store is offline.
#[allow(dead_code)]
pub fn create_offline_app() -> TestApp {
    let state = Arc::new(AppState::new(
        Config::test_default(),
        FirestoreDb::new_mock(),
        IdentityGateway::new_in_memory(),
    ));

    TestApp {
        router: create_router(state.clone()),
        state,
        store: Arc::new(MemoryStore::new()),
    }
}

#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::USER_AGENT, "test-agent")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[allow(dead_code)]
pub fn authed_request(method: &str, uri: &str, token: &str, body: Option<serde_json::Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token));

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}
