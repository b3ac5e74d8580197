//! Executor-facing types: handles and reported execution status.

use serde::{Deserialize, Serialize};

use crate::TaskState;

/// Opaque reference to a backing execution, issued by an executor on launch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExecutorHandle {
    /// Executor-scoped identifier.
    pub id: String,

    /// OS process id, when the executor runs local processes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// Where the execution's standard output is captured, if anywhere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_path: Option<String>,
}

impl ExecutorHandle {
    /// Create a handle with only an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            pid: None,
            stdout_path: None,
            stderr_path: None,
        }
    }
}

/// What an executor knows about a finished execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Process exit code, when there was a process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_path: Option<String>,
}

/// Result of polling an executor for one handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Still executing.
    Running,
    /// Finished successfully.
    Completed { report: ExecutionReport },
    /// Finished unsuccessfully.
    Failed {
        error: String,
        report: ExecutionReport,
    },
}

impl ExecutionStatus {
    /// Returns true if the execution has finished.
    pub fn is_finished(&self) -> bool {
        !matches!(self, Self::Running)
    }

    /// Task state this status maps to.
    pub fn task_state(&self) -> TaskState {
        match self {
            Self::Running => TaskState::Running,
            Self::Completed { .. } => TaskState::Completed,
            Self::Failed { .. } => TaskState::Failed,
        }
    }
}
