//! HTTP server for the control plane.
//!
//! Provides endpoints for:
//! - App catalog (`/v1/apps`) and app starts (`/v1/apps/:app_id/start`)
//! - Task queries, kill and rerun (`/v1/tasks/...`)
//! - Service status (`/v1/status`)
//! - Health check (`/health`)
//! - Prometheus metrics (`/metrics`)

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::AppService;

mod handlers;
pub mod responses;

/// Create the HTTP router.
pub fn create_router(service: Arc<AppService>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Service routes
        .route("/v1/status", get(handlers::service_status))
        .route("/v1/apps", get(handlers::enumerate_apps))
        .route("/v1/apps/:app_id/start", post(handlers::start_app))
        .route("/v1/apps/:app_id/start2", post(handlers::start_app2))
        // Task routes
        .route("/v1/tasks", get(handlers::enumerate_tasks))
        .route("/v1/tasks/query", post(handlers::query_tasks))
        .route("/v1/tasks/summary", get(handlers::query_task_summary))
        .route("/v1/tasks/:id", get(handlers::query_task_details))
        .route("/v1/tasks/:id/kill", post(handlers::kill_task))
        .route("/v1/tasks/:id/rerun", post(handlers::rerun_task))
        // Observability routes
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(service)
}
