//! Dispatcher - turns start requests into launched tasks.

use std::sync::Arc;

use tracing::{info, warn};

use appservice_core::{AppId, CallerContext, StartParams, Task, TaskId, TaskParams, TaskState};

use crate::error::ServiceError;
use crate::executor::LaunchRequest;
use crate::state::AppState;
use crate::store::TransitionOutcome;

/// Creates tasks and hands them to the executor.
#[derive(Clone)]
pub struct Dispatcher {
    state: Arc<AppState>,
}

impl Dispatcher {
    /// Create a new Dispatcher.
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Validate, record and launch a new task.
    ///
    /// Only catalog lookup and parameter validation fail the call. A launch
    /// failure is recorded on the returned task as `FAILED`.
    pub async fn dispatch(
        &self,
        caller: &CallerContext,
        app_id: &AppId,
        params: TaskParams,
        start_params: StartParams,
        rerun_of: Option<TaskId>,
    ) -> Result<Task, ServiceError> {
        let app = self
            .state
            .catalog
            .get(app_id, caller)
            .ok_or_else(|| ServiceError::AppNotFound(app_id.clone()))?;
        let parameters = app.validate_params(&params)?;

        let mut task = Task::new(app.id.clone(), parameters, start_params)
            .with_owner(caller.user_id.clone());
        if let Some(original) = rerun_of {
            task = task.with_rerun_of(original);
        }
        let task = self.state.store.insert_new(task).await;
        let task_id = task.id.clone();

        info!(
            task_id = %task_id,
            app = %app.id,
            owner = ?task.owner,
            rerun_of = ?task.rerun_of,
            "Task queued"
        );

        let request = LaunchRequest {
            task_id: task_id.clone(),
            app,
            parameters: task.parameters,
            start_params: task.start_params,
            caller: caller.clone(),
        };

        // No store lock is held while the executor works.
        match self.state.executor.launch(&request).await {
            Ok(handle) => {
                let outcome = self
                    .state
                    .store
                    .transition(&task_id, TaskState::Queued, TaskState::Running, |t| {
                        t.handle = Some(handle.clone())
                    })
                    .await?;

                match outcome {
                    TransitionOutcome::Applied(_) => {
                        info!(task_id = %task_id, handle = %handle.id, "Task running");
                    }
                    TransitionOutcome::Stale(_) => {
                        // Killed while the launch was in flight.
                        warn!(task_id = %task_id, "Task killed during launch, stopping execution");
                        self.state
                            .store
                            .update(&task_id, |t| {
                                t.handle = Some(handle.clone());
                                Ok(())
                            })
                            .await?;
                        if let Err(e) = self.state.executor.kill(&handle).await {
                            warn!(task_id = %task_id, error = %e, "Failed to stop execution of killed task");
                        }
                    }
                }
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Launch failed");
                self.state
                    .store
                    .transition(&task_id, TaskState::Queued, TaskState::Failed, |t| {
                        t.error = Some(e.to_string())
                    })
                    .await?;
            }
        }

        Ok(self.state.store.get(&task_id).await?)
    }
}
