//! HTTP request and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use appservice_core::{StartParams, TaskId, TaskParams};

use crate::error::ServiceError;

// ============================================================================
// Start types
// ============================================================================

/// Request body for `start_app`.
#[derive(Debug, Deserialize)]
pub struct StartAppRequest {
    /// App parameters.
    #[serde(default)]
    pub params: TaskParams,

    /// Workspace the app writes to.
    pub workspace: String,
}

/// Request body for `start_app2`.
#[derive(Debug, Deserialize)]
pub struct StartApp2Request {
    /// App parameters.
    #[serde(default)]
    pub params: TaskParams,

    /// Startup configuration.
    #[serde(default)]
    pub start_params: StartParams,
}

// ============================================================================
// Task types
// ============================================================================

/// Request body for `query_tasks`.
#[derive(Debug, Deserialize)]
pub struct QueryTasksRequest {
    pub task_ids: Vec<TaskId>,
}

/// Query string for `enumerate_tasks`.
#[derive(Debug, Deserialize)]
pub struct EnumerateTasksQuery {
    #[serde(default)]
    pub offset: usize,

    #[serde(default = "default_count")]
    pub count: usize,
}

fn default_count() -> usize {
    100
}

/// Response for `rerun_task`.
#[derive(Debug, Serialize)]
pub struct RerunResponse {
    pub task_id: TaskId,
}

// ============================================================================
// Error types
// ============================================================================

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServiceError::AppNotFound(_) | ServiceError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::InvalidParams(_) | ServiceError::InvalidInput(_) => {
                StatusCode::BAD_REQUEST
            }
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
