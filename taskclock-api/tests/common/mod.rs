//! Common test utilities for integration tests
//!
//! Builds the full router over the in-memory store and a manually driven
//! clock, so the API tests need no database.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::Arc;
use taskclock_api::app::{build_router, AppState};
use taskclock_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use taskclock_shared::auth::jwt::{create_token, Claims, TokenType};
use taskclock_shared::models::user::{CreateUser, User};
use taskclock_shared::store::{memory::MemoryStore, Store};
use taskclock_shared::time::FixedClock;
use tower::ServiceExt;

pub const ACCESS_SECRET: &str = "test-access-secret-at-least-32-bytes!";
pub const REFRESH_SECRET: &str = "test-refresh-secret-at-least-32-bytes";

/// A user known to the store, with a valid access token
pub struct TestUser {
    pub user: User,
    pub token: String,
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub clock: Arc<FixedClock>,
    pub app: axum::Router,
}

pub fn test_config() -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
        },
        database: DatabaseConfig {
            url: "postgresql://unused".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: ACCESS_SECRET.to_string(),
            refresh_secret: REFRESH_SECRET.to_string(),
        },
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
}

impl TestContext {
    pub fn new() -> Self {
        let clock = Arc::new(FixedClock::new(start_time()));
        let store = Arc::new(MemoryStore::with_clock(clock.clone()));
        let state = AppState::with_clock(store.clone(), clock.clone(), test_config());

        Self {
            store,
            clock,
            app: build_router(state),
        }
    }

    /// Inserts a user directly and mints an access token for it
    pub async fn user(&self, name: &str) -> TestUser {
        let user = self
            .store
            .insert_user(CreateUser {
                name: name.to_string(),
                email: format!("{}@example.com", name),
                password_hash: "unused".to_string(),
            })
            .await
            .unwrap();
        let token = create_token(
            &Claims::new(user.id, user.email.clone(), TokenType::Access),
            ACCESS_SECRET,
        )
        .unwrap();

        TestUser { user, token }
    }

    /// Sends a request and returns the status with the parsed JSON body
    /// (`Value::Null` for an empty body)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }
}
