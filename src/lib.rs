//! FireCRM API Library
//!
//! Field-service back office: sites, call logging, engineer diary
//! scheduling, purchase orders, delivery challans and the stock ledger
//! they drive.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod files;
pub mod handlers;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::{DefaultBodyLimit, FromRef, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::{sync::Arc, time::Duration};
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowHeaders, AllowMethods, Any, CorsLayer},
    timeout::TimeoutLayer,
};

use crate::auth::TokenVerifier;
use crate::files::{FileStore, LocalFileStore};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: Arc<events::EventSender>,
    pub services: handlers::AppServices,
    pub token_verifier: Arc<TokenVerifier>,
    pub files: Arc<dyn FileStore>,
}

impl AppState {
    /// Wires every service against one connection, one event channel and
    /// the attachment directory named in the config.
    pub fn new(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
    ) -> Self {
        let files: Arc<dyn FileStore> = Arc::new(LocalFileStore::new(config.upload_dir.clone()));
        Self::with_file_store(db, config, event_sender, files)
    }

    pub fn with_file_store(
        db: Arc<DatabaseConnection>,
        config: config::AppConfig,
        event_sender: events::EventSender,
        files: Arc<dyn FileStore>,
    ) -> Self {
        let event_sender = Arc::new(event_sender);
        let token_verifier = Arc::new(TokenVerifier::new(&config.jwt_secret));
        let services = handlers::AppServices::new(db.clone(), event_sender.clone(), files.clone());
        Self {
            db,
            config,
            event_sender,
            services,
            token_verifier,
            files,
        }
    }
}

impl FromRef<AppState> for Arc<TokenVerifier> {
    fn from_ref(state: &AppState) -> Self {
        state.token_verifier.clone()
    }
}

/// Every authenticated route under `/api`
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/status", get(api_status))
        .nest("/diary", handlers::diary::diary_routes())
        .nest("/calls", handlers::calls::call_routes())
        .nest("/sites", handlers::sites::site_routes())
        .nest("/products", handlers::products::product_routes())
        .nest(
            "/purchase-order",
            handlers::purchase_orders::purchase_order_routes(),
        )
        .nest(
            "/delivery-challans",
            handlers::delivery_challans::delivery_challan_routes(),
        )
        .nest("/uploads", handlers::uploads::upload_routes())
}

/// CORS from config: explicit origins win, permissive only in development
/// or when explicitly allowed. `None` means the deployment is misconfigured.
pub fn cors_layer(cfg: &config::AppConfig) -> Option<CorsLayer> {
    let origins: Vec<HeaderValue> = cfg
        .cors_origins()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    if !origins.is_empty() {
        let layer = CorsLayer::new().allow_origin(origins);
        // credentials cannot be combined with wildcard methods or headers
        let layer = if cfg.cors_allow_credentials {
            layer
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request())
                .allow_credentials(true)
        } else {
            layer.allow_methods(Any).allow_headers(Any)
        };
        return Some(layer);
    }

    if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            environment = %cfg.environment,
            "no CORS origins configured; allowing any origin"
        );
        return Some(CorsLayer::permissive());
    }
    None
}

/// Full application: health, `/api`, Swagger UI and the middleware stack.
pub fn build_router(state: AppState, cors: CorsLayer) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::<AppState>::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .merge(openapi::swagger_ui())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(cors)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state)
}

async fn api_status(
    State(state): State<AppState>,
    _user: auth::AuthUser,
) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "git": option_env!("GIT_HASH").unwrap_or("unknown"),
        "service": "firecrm-api",
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let (status, db_status) = match db::check_connection(&state.db).await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    (
        status,
        Json(json!({
            "status": db_status,
            "checks": { "database": db_status },
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
}
