//! Task records and the views derived from them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AppId, CoreError, ExecutionReport, ExecutionStatus, ExecutorHandle, TaskId, TaskParams,
    TaskState,
};

/// Startup configuration of a task beyond its app parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartParams {
    /// Workspace folder the app writes its output to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,

    /// Task that spawned this one, for apps launched by other apps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Base URL the app should call back into.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Executor-specific container or image to run in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<String>,

    /// Free-form metadata attached by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_metadata: Option<String>,

    /// Executor-specific resource reservation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reservation: Option<String>,

    /// Skip the executor's preflight checks.
    #[serde(default)]
    pub disable_preflight: bool,
}

impl StartParams {
    /// Start parameters carrying only a workspace, as `start_app` uses.
    pub fn for_workspace(workspace: impl Into<String>) -> Self {
        Self {
            workspace: Some(workspace.into()),
            ..Self::default()
        }
    }
}

/// A tracked execution of an app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,

    /// App being executed.
    pub app: AppId,

    /// Validated parameters, defaults included.
    pub parameters: TaskParams,

    /// Startup configuration.
    pub start_params: StartParams,

    /// User that started the task.
    pub owner: Option<String>,

    /// Current lifecycle state.
    pub state: TaskState,

    /// When the task was created.
    pub submitted_at: DateTime<Utc>,

    /// When the task record last changed.
    pub updated_at: DateTime<Utc>,

    /// When the executor accepted the launch.
    pub started_at: Option<DateTime<Utc>>,

    /// When the task reached a terminal state.
    pub completed_at: Option<DateTime<Utc>>,

    /// Executor report for a finished execution.
    pub result: Option<ExecutionReport>,

    /// Error message if the task failed.
    pub error: Option<String>,

    /// Reference into the executor, once launched.
    pub handle: Option<ExecutorHandle>,

    /// Task this one was rerun from.
    pub rerun_of: Option<TaskId>,

    /// A kill is in flight at the executor. While set, the task only moves
    /// to `KILLED`.
    #[serde(default)]
    pub kill_requested: bool,
}

impl Task {
    /// Create a new queued Task.
    pub fn new(app: impl Into<AppId>, parameters: TaskParams, start_params: StartParams) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::generate(),
            app: app.into(),
            parameters,
            start_params,
            owner: None,
            state: TaskState::Queued,
            submitted_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
            handle: None,
            rerun_of: None,
            kill_requested: false,
        }
    }

    /// Builder method to set a specific ID (useful for testing).
    pub fn with_id(mut self, id: TaskId) -> Self {
        self.id = id;
        self
    }

    /// Builder method to record the owner.
    pub fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner = owner;
        self
    }

    /// Builder method to link the task to the one it reruns.
    pub fn with_rerun_of(mut self, original: TaskId) -> Self {
        self.rerun_of = Some(original);
        self
    }

    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Move to `next`, stamping timestamps. Rejects transitions the state
    /// machine does not permit.
    pub fn transition(&mut self, next: TaskState) -> Result<(), CoreError> {
        if !self.state.can_transition_to(next) {
            return Err(CoreError::InvalidStateTransition {
                from: self.state,
                to: next,
            });
        }

        let now = Utc::now();
        self.state = next;
        self.updated_at = now;
        if next == TaskState::Running {
            self.started_at = Some(now);
        }
        if next.is_terminal() {
            self.completed_at = Some(now);
            self.kill_requested = false;
        }
        Ok(())
    }

    /// Mark the task as running under `handle`.
    pub fn start(&mut self, handle: ExecutorHandle) -> Result<(), CoreError> {
        self.transition(TaskState::Running)?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Mark the task as killed.
    pub fn kill(&mut self) -> Result<(), CoreError> {
        self.transition(TaskState::Killed)
    }

    /// Apply a finished execution status reported by the executor.
    ///
    /// `Running` is a no-op.
    pub fn apply_execution(&mut self, status: ExecutionStatus) -> Result<(), CoreError> {
        if !status.is_finished() {
            return Ok(());
        }
        self.transition(status.task_state())?;
        self.record_outcome(status);
        Ok(())
    }

    /// Copy the report and error of an execution onto the task without
    /// touching its state.
    pub fn record_outcome(&mut self, status: ExecutionStatus) {
        match status {
            ExecutionStatus::Running => {}
            ExecutionStatus::Completed { report } => {
                self.result = Some(report);
            }
            ExecutionStatus::Failed { error, report } => {
                self.error = Some(error);
                self.result = Some(report);
            }
        }
    }
}

/// Task counts grouped by state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskSummary(BTreeMap<TaskState, u64>);

impl TaskSummary {
    /// Count the given states. Every state is present, zero included.
    pub fn from_states<I>(states: I) -> Self
    where
        I: IntoIterator<Item = TaskState>,
    {
        let mut counts: BTreeMap<TaskState, u64> =
            TaskState::ALL.iter().map(|s| (*s, 0)).collect();
        for state in states {
            *counts.entry(state).or_insert(0) += 1;
        }
        Self(counts)
    }

    /// Count for one state.
    pub fn count(&self, state: TaskState) -> u64 {
        self.0.get(&state).copied().unwrap_or(0)
    }

    /// Sum over all states.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Iterate `(state, count)` pairs in lifecycle order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskState, u64)> + '_ {
        self.0.iter().map(|(s, c)| (*s, *c))
    }
}

/// Deep view of one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDetails {
    #[serde(flatten)]
    pub task: Task,

    /// Live executor status at query time, when available.
    pub progress: Option<ExecutionStatus>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
}

/// Outcome of a kill request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillOutcome {
    /// 1 if this call killed the task, 0 otherwise.
    pub killed: u32,

    /// Human-readable explanation.
    pub message: String,
}

impl KillOutcome {
    /// The task was killed by this call.
    pub fn killed() -> Self {
        Self {
            killed: 1,
            message: "task killed".to_string(),
        }
    }

    /// Nothing was killed.
    pub fn not_killed(message: impl Into<String>) -> Self {
        Self {
            killed: 0,
            message: message.into(),
        }
    }
}

/// Health record returned by `service_status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Component name.
    pub service: String,

    /// Whether the component is up.
    pub up: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uptime_secs: Option<u64>,

    #[serde(default)]
    pub message: String,
}
