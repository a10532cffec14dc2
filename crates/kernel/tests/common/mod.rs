#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! [`TestApp`] wraps the REAL kernel router and state. Tests that need rows
//! use [`TestApp::with_database`], which returns `None` when `DATABASE_URL`
//! is unset so the test can return early. Everything else runs against a
//! lazy pool that never connects.

#![allow(dead_code)]

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use codex_kernel::{AppState, Config, build_app};
use codex_test_utils::{TestCard, TestDatabase};

/// Points at a closed port; only used by pools that never connect.
const UNREACHABLE_DATABASE_URL: &str = "postgres://codex@127.0.0.1:1/codex";

pub fn test_config(database_url: &str) -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some(database_url.to_string()),
        "MAX_PAGE_LIMIT" => Some("50".to_string()),
        _ => None,
    })
    .expect("Failed to build test config")
}

/// Test application wrapper using the REAL kernel routes and state.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub db: Option<TestDatabase>,
}

/// A buffered response.
pub struct TestResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: String,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body)
            .unwrap_or_else(|e| panic!("Response is not JSON ({e}): {}", self.body))
    }
}

impl TestApp {
    /// App whose pool never connects.
    pub fn lazy() -> Self {
        let config = test_config(UNREACHABLE_DATABASE_URL);
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(std::time::Duration::from_millis(500))
            .connect_lazy(&config.database_url)
            .expect("Failed to create lazy pool");
        let state = AppState::with_pool(pool, &config);
        Self {
            router: build_app(state.clone(), &config),
            state,
            db: None,
        }
    }

    /// App backed by a private schema seeded with `cards`.
    pub async fn with_database(cards: &[TestCard]) -> Option<Self> {
        let db = TestDatabase::connect().await?;
        db.insert(cards).await;

        let config = test_config("postgres://unused");
        let state = AppState::with_pool(db.pool.clone(), &config);
        Some(Self {
            router: build_app(state.clone(), &config),
            state,
            db: Some(db),
        })
    }

    /// Send a GET request to the test application.
    pub async fn get(&self, uri: &str) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .expect("Failed to send request");

        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to read body")
            .to_bytes();

        TestResponse {
            status,
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        }
    }

    pub async fn cleanup(self) {
        if let Some(db) = self.db {
            db.cleanup().await;
        }
    }
}
