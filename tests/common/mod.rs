#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate, Utc};
use firecrm_api::{
    auth::Claims,
    config::AppConfig,
    db,
    entities::{call, product, site},
    events::{self},
    services::{calls::NewCall, products::NewProduct, sites::NewSite},
    AppState,
};
use rust_decimal::Decimal;
use serde_json::Value;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "test_secret_key_for_testing_purposes_only_32chars";
pub const TEST_USER: &str = "dispatcher-1";

/// Application state backed by an in-memory SQLite database, plus the full router.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    token: String,
    _uploads: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let uploads = TempDir::new().expect("create upload dir");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "development".to_string(),
        );
        cfg.upload_dir = uploads.path().to_string_lossy().into_owned();

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let (event_sender, event_rx) = events::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let cors = firecrm_api::cors_layer(&cfg).expect("development config allows any origin");
        let state = AppState::new(Arc::new(pool), cfg, event_sender);
        let router = firecrm_api::build_router(state.clone(), cors);

        Self {
            router,
            state,
            token: token_for(TEST_USER, 3600),
            _uploads: uploads,
            _event_task: event_task,
        }
    }

    /// Access the bearer token for the default user.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };
        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Convenience helper for authenticated JSON requests.
    pub async fn request_authenticated(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        self.request(method, uri, body, Some(self.token())).await
    }

    /// Authenticated request with a raw body, used for uploads.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        bytes: Vec<u8>,
    ) -> axum::response::Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", self.token()))
            .header("content-type", "application/octet-stream")
            .body(Body::from(bytes))
            .expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    pub async fn seed_site(&self, name: &str) -> site::Model {
        self.state
            .services
            .sites
            .create_site(NewSite {
                name: name.to_string(),
                customer_name: Some("Acme Facilities".to_string()),
                address: None,
            })
            .await
            .expect("seed site")
    }

    pub async fn seed_call(&self, site_id: uuid::Uuid) -> call::Model {
        self.state
            .services
            .calls
            .create_call(
                NewCall {
                    site_id,
                    system_id: Some("FA-PANEL-2".to_string()),
                    call_type: Some("maintenance".to_string()),
                    reason: Some("quarterly inspection".to_string()),
                    engineer_id: None,
                    deadline: None,
                    next_action: None,
                    waiting: false,
                    waiting_reason: None,
                    status: None,
                },
                TEST_USER,
            )
            .await
            .expect("seed call")
    }

    pub async fn seed_product(&self, code: &str, opening_stock: i32) -> product::Model {
        self.state
            .services
            .products
            .create_product(NewProduct {
                code: code.to_string(),
                name: format!("Product {}", code),
                description: None,
                unit_cost: Decimal::new(1250, 2),
                selling_price: Some(Decimal::new(1999, 2)),
                opening_stock: Some(opening_stock),
            })
            .await
            .expect("seed product")
    }

    pub async fn on_hand(&self, product_id: uuid::Uuid) -> i32 {
        self.state
            .services
            .products
            .get_product(product_id)
            .await
            .expect("product exists")
            .on_hand
    }
}

/// HS256 token signed with the test secret
pub fn token_for(user_id: &str, ttl_secs: i64) -> String {
    let claims = Claims {
        sub: user_id.to_string(),
        role: Some("admin".to_string()),
        exp: Utc::now().timestamp() + ttl_secs,
    };
    jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .expect("encode access token")
}

/// A date safely in the future so bookings pass the past-date check.
pub fn future_date(days: i64) -> NaiveDate {
    Utc::now().date_naive() + Duration::days(days)
}

pub async fn response_json(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if body.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&body).expect("response body is json")
}

pub fn assert_status(response: &axum::response::Response, expected: StatusCode) {
    assert_eq!(response.status(), expected, "unexpected status");
}
