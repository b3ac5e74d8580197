//! Query and aggregation over the task store.
//!
//! Reads refresh `RUNNING` tasks from the executor before returning them.
//! When the executor cannot answer, the last known state is returned.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, warn};

use appservice_core::{ExecutionStatus, Task, TaskDetails, TaskId, TaskState, TaskSummary};

use crate::error::ServiceError;
use crate::state::AppState;
use crate::store::TransitionOutcome;

/// Poll the executor for a running task and fold a finished status into
/// the store.
///
/// Returns the current task and the status the executor reported, if any.
pub(crate) async fn refresh_task(state: &AppState, task: Task) -> (Task, Option<ExecutionStatus>) {
    if task.state != TaskState::Running {
        return (task, None);
    }
    let Some(handle) = task.handle.clone() else {
        return (task, None);
    };

    let status = match state.executor.poll(&handle).await {
        Ok(status) => status,
        Err(e) => {
            warn!(task_id = %task.id, error = %e, "Poll failed, keeping last known state");
            return (task, None);
        }
    };

    if !status.is_finished() {
        return (task, Some(status));
    }

    if task.kill_requested {
        // The kill in flight decides the final state.
        return (task, Some(status));
    }

    debug!(task_id = %task.id, status = ?status, "Execution finished");
    let outcome = status.clone();
    let updated = state
        .store
        .transition(&task.id, TaskState::Running, status.task_state(), move |t| {
            t.record_outcome(outcome)
        })
        .await;

    match updated {
        Ok(TransitionOutcome::Applied(task) | TransitionOutcome::Stale(task)) => {
            (task, Some(status))
        }
        Err(e) => {
            warn!(task_id = %task.id, error = %e, "Failed to record finished execution");
            (task, Some(status))
        }
    }
}

async fn refresh_all(state: &AppState, tasks: Vec<Task>) -> Vec<Task> {
    join_all(tasks.into_iter().map(|task| refresh_task(state, task)))
        .await
        .into_iter()
        .map(|(task, _)| task)
        .collect()
}

/// Read side of the service.
#[derive(Clone)]
pub struct QueryService {
    state: Arc<AppState>,
}

impl QueryService {
    /// Create a new QueryService.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Look up several tasks. Unknown ids are omitted; an empty request
    /// yields an empty map.
    pub async fn query_tasks(&self, ids: &[TaskId]) -> HashMap<TaskId, Task> {
        let found = self.state.store.get_many(ids).await;
        refresh_all(&self.state, found.into_values().collect())
            .await
            .into_iter()
            .map(|task| (task.id.clone(), task))
            .collect()
    }

    /// Count every task by state.
    pub async fn query_task_summary(&self) -> TaskSummary {
        let tasks = self.state.store.snapshot().await;
        let tasks = refresh_all(&self.state, tasks).await;
        TaskSummary::from_states(tasks.iter().map(|t| t.state))
    }

    /// Deep view of one task, including live executor status.
    pub async fn query_task_details(&self, id: &TaskId) -> Result<TaskDetails, ServiceError> {
        let task = self.state.store.get(id).await?;
        let (task, progress) = refresh_task(&self.state, task).await;

        let (stdout_path, stderr_path) = match (&task.result, &task.handle) {
            (Some(report), _) if report.stdout_path.is_some() || report.stderr_path.is_some() => {
                (report.stdout_path.clone(), report.stderr_path.clone())
            }
            (_, Some(handle)) => (handle.stdout_path.clone(), handle.stderr_path.clone()),
            _ => (None, None),
        };
        let pid = task.handle.as_ref().and_then(|h| h.pid);

        Ok(TaskDetails {
            task,
            progress,
            stdout_path,
            stderr_path,
            pid,
        })
    }

    /// A page of tasks in creation order.
    pub async fn enumerate_tasks(&self, offset: usize, count: usize) -> Vec<Task> {
        let page = self.state.store.list(offset, count).await;
        refresh_all(&self.state, page).await
    }
}
