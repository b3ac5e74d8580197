//! Executor capability: whatever actually runs an app.
//!
//! The control plane only launches, kills and polls; it never assumes a
//! particular substrate.

mod process;

pub use process::ProcessExecutor;

use async_trait::async_trait;
use thiserror::Error;

use appservice_core::{
    AppDescriptor, CallerContext, ExecutionStatus, ExecutorHandle, StartParams, StatusRecord,
    TaskId, TaskParams,
};

/// Errors reported by an executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Launch failed: {0}")]
    LaunchFailed(String),

    #[error("Executor has no execution for handle {0}")]
    HandleNotFound(String),

    #[error("Kill failed: {0}")]
    KillFailed(String),

    #[error("Executor unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything an executor needs to start one task.
#[derive(Debug, Clone)]
pub struct LaunchRequest {
    pub task_id: TaskId,
    pub app: AppDescriptor,
    pub parameters: TaskParams,
    pub start_params: StartParams,
    pub caller: CallerContext,
}

/// Runs apps on behalf of the control plane.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Start the backing execution for a task.
    async fn launch(&self, request: &LaunchRequest) -> Result<ExecutorHandle, ExecutorError>;

    /// Stop an execution. `HandleNotFound` if the executor does not know it.
    async fn kill(&self, handle: &ExecutorHandle) -> Result<(), ExecutorError>;

    /// Current status of an execution. Must be idempotent.
    async fn poll(&self, handle: &ExecutorHandle) -> Result<ExecutionStatus, ExecutorError>;

    /// Health record for `service_status`.
    fn health(&self) -> StatusRecord {
        StatusRecord {
            service: "executor".to_string(),
            up: true,
            version: None,
            uptime_secs: None,
            message: String::new(),
        }
    }
}
