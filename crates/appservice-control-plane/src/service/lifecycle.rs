//! Kill and rerun.

use std::sync::Arc;

use tracing::{info, warn};

use appservice_core::{CallerContext, KillOutcome, TaskId, TaskState};

use crate::dispatcher::Dispatcher;
use crate::error::ServiceError;
use crate::service::query::refresh_task;
use crate::state::AppState;
use crate::store::TransitionOutcome;

/// Message returned when killing a task that already reached `state`.
fn already_terminal(state: TaskState) -> KillOutcome {
    let message = match state {
        TaskState::Failed => "task already failed",
        TaskState::Killed => "task already killed",
        _ => "task already finished",
    };
    KillOutcome::not_killed(message)
}

/// Coordinates state changes that involve the executor.
#[derive(Clone)]
pub struct LifecycleController {
    state: Arc<AppState>,
    dispatcher: Dispatcher,
}

impl LifecycleController {
    /// Create a new LifecycleController.
    pub fn new(state: Arc<AppState>, dispatcher: Dispatcher) -> Self {
        Self { state, dispatcher }
    }

    /// Kill a task. Idempotent: killing a finished task reports `killed = 0`.
    ///
    /// A running task stays marked kill-pending while the executor stops it;
    /// refreshes leave such a task alone.
    pub async fn kill_task(
        &self,
        _caller: &CallerContext,
        id: &TaskId,
    ) -> Result<KillOutcome, ServiceError> {
        loop {
            let task = self.state.store.get(id).await?;
            if task.is_terminal() {
                return Ok(already_terminal(task.state));
            }

            let Some(handle) = task.handle.clone() else {
                // Launch still in flight; the dispatcher stops the execution
                // once it sees the task was killed.
                let outcome = self
                    .state
                    .store
                    .transition(id, TaskState::Queued, TaskState::Killed, |_| {})
                    .await?;
                if let TransitionOutcome::Applied(_) = outcome {
                    info!(task_id = %id, "Killed queued task");
                    return Ok(KillOutcome::killed());
                }
                continue;
            };

            let (current, marked) = self
                .state
                .store
                .update(id, |t| {
                    if t.state != TaskState::Running {
                        return Ok((t.state, false));
                    }
                    let marked = !t.kill_requested;
                    t.kill_requested = true;
                    Ok((t.state, marked))
                })
                .await?;
            if current.is_terminal() {
                return Ok(already_terminal(current));
            }
            if current != TaskState::Running {
                continue;
            }

            if let Err(e) = self.state.executor.kill(&handle).await {
                warn!(task_id = %id, error = %e, "Executor failed to kill task");
                if marked {
                    self.state
                        .store
                        .update(id, |t| {
                            if t.state == TaskState::Running {
                                t.kill_requested = false;
                            }
                            Ok(())
                        })
                        .await?;
                }

                // The execution may simply have finished already.
                let task = self.state.store.get(id).await?;
                let (task, _) = refresh_task(&self.state, task).await;
                if task.is_terminal() {
                    return Ok(already_terminal(task.state));
                }
                return Ok(KillOutcome::not_killed(e.to_string()));
            }

            let outcome = self
                .state
                .store
                .transition(id, TaskState::Running, TaskState::Killed, |_| {})
                .await?;

            return Ok(match outcome {
                TransitionOutcome::Applied(_) => {
                    info!(task_id = %id, handle = %handle.id, "Killed running task");
                    KillOutcome::killed()
                }
                TransitionOutcome::Stale(task) => already_terminal(task.state),
            });
        }
    }

    /// Start a fresh task with the same app, parameters and start
    /// parameters as `id`. The original task is left untouched.
    pub async fn rerun_task(
        &self,
        caller: &CallerContext,
        id: &TaskId,
    ) -> Result<TaskId, ServiceError> {
        let original = self.state.store.get(id).await?;
        let task = self
            .dispatcher
            .dispatch(
                caller,
                &original.app,
                original.parameters,
                original.start_params,
                Some(original.id),
            )
            .await?;

        info!(task_id = %task.id, rerun_of = %id, "Task rerun");
        Ok(task.id)
    }
}
