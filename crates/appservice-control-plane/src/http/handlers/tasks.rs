//! Task query and lifecycle handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};

use appservice_core::{KillOutcome, Task, TaskDetails, TaskId, TaskSummary};

use super::caller_from_headers;
use crate::error::ServiceError;
use crate::http::responses::{EnumerateTasksQuery, QueryTasksRequest, RerunResponse};
use crate::service::AppService;

/// Look up several tasks by id.
pub async fn query_tasks(
    State(service): State<Arc<AppService>>,
    headers: HeaderMap,
    Json(req): Json<QueryTasksRequest>,
) -> Json<HashMap<TaskId, Task>> {
    let caller = caller_from_headers(&headers);
    Json(service.query_tasks(&caller, &req.task_ids).await)
}

/// Task counts by state.
pub async fn query_task_summary(
    State(service): State<Arc<AppService>>,
    headers: HeaderMap,
) -> Json<TaskSummary> {
    let caller = caller_from_headers(&headers);
    Json(service.query_task_summary(&caller).await)
}

/// Deep view of one task.
pub async fn query_task_details(
    State(service): State<Arc<AppService>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<TaskDetails>, ServiceError> {
    let caller = caller_from_headers(&headers);
    let details = service
        .query_task_details(&caller, &TaskId::new(id))
        .await?;
    Ok(Json(details))
}

/// A page of tasks in creation order.
pub async fn enumerate_tasks(
    State(service): State<Arc<AppService>>,
    Query(page): Query<EnumerateTasksQuery>,
    headers: HeaderMap,
) -> Json<Vec<Task>> {
    let caller = caller_from_headers(&headers);
    Json(
        service
            .enumerate_tasks(&caller, page.offset, page.count)
            .await,
    )
}

/// Kill a task.
pub async fn kill_task(
    State(service): State<Arc<AppService>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<KillOutcome>, ServiceError> {
    let caller = caller_from_headers(&headers);
    let outcome = service.kill_task(&caller, &TaskId::new(id)).await?;
    Ok(Json(outcome))
}

/// Rerun a task under a new id.
pub async fn rerun_task(
    State(service): State<Arc<AppService>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<RerunResponse>, ServiceError> {
    let caller = caller_from_headers(&headers);
    let task_id = service.rerun_task(&caller, &TaskId::new(id)).await?;
    Ok(Json(RerunResponse { task_id }))
}
