//! Catalog, status and start handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use tracing::info;

use appservice_core::{AppDescriptor, AppId, StatusRecord, Task};

use super::caller_from_headers;
use crate::error::ServiceError;
use crate::http::responses::{StartApp2Request, StartAppRequest};
use crate::service::AppService;

/// Service and executor health.
pub async fn service_status(
    State(service): State<Arc<AppService>>,
    headers: HeaderMap,
) -> Json<Vec<StatusRecord>> {
    let caller = caller_from_headers(&headers);
    Json(service.service_status(&caller).await)
}

/// List the apps the caller may start.
pub async fn enumerate_apps(
    State(service): State<Arc<AppService>>,
    headers: HeaderMap,
) -> Json<Vec<AppDescriptor>> {
    let caller = caller_from_headers(&headers);
    Json(service.enumerate_apps(&caller).await)
}

/// Start an app in a workspace.
pub async fn start_app(
    State(service): State<Arc<AppService>>,
    Path(app_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<StartAppRequest>,
) -> Result<Json<Task>, ServiceError> {
    let caller = caller_from_headers(&headers);
    info!(app = %app_id, user = ?caller.user_id, "start_app requested");

    let task = service
        .start_app(&caller, &AppId::new(app_id), req.params, req.workspace)
        .await?;
    Ok(Json(task))
}

/// Start an app with full start parameters.
pub async fn start_app2(
    State(service): State<Arc<AppService>>,
    Path(app_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<StartApp2Request>,
) -> Result<Json<Task>, ServiceError> {
    let caller = caller_from_headers(&headers);
    info!(app = %app_id, user = ?caller.user_id, "start_app2 requested");

    let task = service
        .start_app2(&caller, &AppId::new(app_id), req.params, req.start_params)
        .await?;
    Ok(Json(task))
}
