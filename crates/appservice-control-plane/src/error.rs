//! Errors surfaced to callers of the service.

use thiserror::Error;

use appservice_core::{AppId, CoreError, TaskId};

use crate::store::StoreError;

/// Errors returned synchronously by `AppService` methods.
///
/// Executor failures never appear here: they are recorded on the task.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("App not found: {0}")]
    AppNotFound(AppId),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidParams(msg) => Self::InvalidParams(msg),
            CoreError::InvalidInput(msg) => Self::InvalidInput(msg),
            other @ CoreError::InvalidStateTransition { .. } => Self::Internal(other.to_string()),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::TaskNotFound(id),
            StoreError::Core(core) => core.into(),
            other @ StoreError::DuplicateId(_) => Self::Internal(other.to_string()),
        }
    }
}
