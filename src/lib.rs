//! Manufacturing hub module
//!
//! Hub-scoped bills of materials, production orders and production batches,
//! served as a JSON / HTMX web surface under `/manufacturing`.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod auth;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod export;
pub mod forms;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod render;
pub mod services;
pub mod tracing;

use axum::{extract::FromRef, Router};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::auth::{AuthConfig, AuthService};
use crate::forms::InputPolicy;
use crate::health::HealthState;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub auth: Arc<AuthService>,
    pub health: Arc<HealthState>,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn new(db: Arc<DatabaseConnection>, config: config::AppConfig) -> Self {
        let auth = Arc::new(AuthService::new(AuthConfig::from(&config)));
        let policy = InputPolicy {
            strict: config.strict_input,
        };
        let services = handlers::AppServices::new(db.clone(), policy);
        let health = Arc::new(HealthState::new(db.clone()));
        Self {
            db,
            config,
            auth,
            health,
            services,
        }
    }
}

impl FromRef<AppState> for Arc<AuthService> {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// The manufacturing module and health endpoints, with request ids and HTTP
/// tracing applied. Transport layers (CORS, compression) are added by the binary.
pub fn app_router(state: AppState) -> Router {
    let health_router = health::health_routes(state.health.clone());

    handlers::manufacturing_routes()
        .with_state(state)
        .merge(health_router)
        .layer(crate::tracing::configure_http_tracing())
        .layer(axum::middleware::from_fn(
            middleware_helpers::request_id::request_id_middleware,
        ))
}
