// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post, put},
};
use flaregate_core::{FlareError, PluginAdapter};
use flaregate_workflow::Workflow;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_admin;
use crate::{admin, handlers};

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
    /// Adapters reported on `GET /health`.
    pub adapters: Vec<Arc<dyn PluginAdapter>>,
}

impl HealthState {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            prometheus_render: None,
            adapters: Vec::new(),
        }
    }
}

impl Default for HealthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub workflow: Arc<Workflow>,
    /// Health state for unauthenticated endpoints.
    pub health: HealthState,
}

impl GatewayState {
    pub fn new(workflow: Arc<Workflow>, health: HealthState) -> Self {
        Self { workflow, health }
    }
}

/// Gateway server configuration (mirrors `[server]` from flaregate-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Builds the full application router.
///
/// - `GET /health`, `GET /ping`, `GET /metrics` (no auth)
/// - user flow under `/api/...` (no auth)
/// - `POST /api/admin/login`, `POST /api/admin/logout` (no auth)
/// - every other `/api/admin/...` route behind [`require_admin`]
pub fn router(state: GatewayState) -> Router {
    // Unauthenticated public routes (health + metrics for keep-alive and Prometheus).
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/ping", get(handlers::ping))
        .route("/metrics", get(handlers::get_metrics));

    let user_routes = Router::new()
        .route("/api/check-user", post(handlers::check_user))
        .route("/api/login", post(handlers::login))
        .route("/api/verify-username", post(handlers::verify_username))
        .route(
            "/api/verification-session/{id}",
            get(handlers::get_verification_session),
        )
        .route("/api/verify-about/{session_id}", post(handlers::verify_about))
        .route("/api/set-password", post(handlers::set_password))
        .route("/api/bot-config", post(handlers::create_bot_config))
        .route(
            "/api/bot-config/{id}/complete",
            put(handlers::complete_bot_config),
        )
        .route("/api/bot-status/{bot_name}", get(handlers::get_bot_status))
        .route("/api/bot-statuses", get(handlers::list_bot_statuses))
        .route("/api/request-access", post(handlers::request_access))
        .route(
            "/api/generate-link/{session_id}",
            post(handlers::generate_link),
        )
        .route("/api/submit-key", post(handlers::submit_key))
        .route("/api/key-status/{id}", get(handlers::get_key_status))
        .route("/api/key-submission/{id}", get(handlers::get_key_submission));

    let admin_session_routes = Router::new()
        .route("/api/admin/login", post(admin::login))
        .route("/api/admin/logout", post(admin::logout));

    // Routes requiring an active admin session.
    let admin_routes = Router::new()
        .route("/api/admin/check-auth", get(admin::check_auth))
        .route("/api/admin/dashboard", get(admin::dashboard))
        .route("/api/admin/provide-link/{id}", post(admin::provide_link))
        .route("/api/admin/approve-key/{id}", post(admin::approve_key))
        .route(
            "/api/admin/release-bot/{bot_name}",
            post(admin::release_bot),
        )
        .route("/api/admin/submission/{id}", delete(admin::delete_submission))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_admin,
        ));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(admin_session_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds to the configured host:port and serves until `shutdown` fires.
pub async fn serve(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), FlareError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| FlareError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!(%addr, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| FlareError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
