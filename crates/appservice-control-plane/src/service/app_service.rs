//! The AppService method surface.

use std::collections::HashMap;
use std::sync::Arc;

use appservice_core::{
    AppDescriptor, AppId, CallerContext, KillOutcome, StartParams, StatusRecord, Task,
    TaskDetails, TaskId, TaskParams, TaskSummary,
};

use crate::dispatcher::Dispatcher;
use crate::error::ServiceError;
use crate::service::lifecycle::LifecycleController;
use crate::service::query::QueryService;
use crate::state::AppState;

/// Name reported by `service_status`.
pub const SERVICE_NAME: &str = "AppService";

/// Every operation the service offers, each taking the caller's context.
#[derive(Clone)]
pub struct AppService {
    state: Arc<AppState>,
    dispatcher: Dispatcher,
    query: QueryService,
    lifecycle: LifecycleController,
}

impl AppService {
    /// Create a new AppService.
    pub fn new(state: Arc<AppState>) -> Self {
        let dispatcher = Dispatcher::new(state.clone());
        let query = QueryService::new(state.clone());
        let lifecycle = LifecycleController::new(state.clone(), dispatcher.clone());
        Self {
            state,
            dispatcher,
            query,
            lifecycle,
        }
    }

    /// Shared state behind the service.
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Health of the service and its executor.
    pub async fn service_status(&self, caller: &CallerContext) -> Vec<StatusRecord> {
        let tasks = self.state.task_count().await;
        let apps = self.state.catalog.list(caller).len();

        vec![
            StatusRecord {
                service: SERVICE_NAME.to_string(),
                up: true,
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
                uptime_secs: Some(self.state.started_at.elapsed().as_secs()),
                message: format!("{tasks} tasks, {apps} apps"),
            },
            self.state.executor.health(),
        ]
    }

    /// Apps the caller may start.
    pub async fn enumerate_apps(&self, caller: &CallerContext) -> Vec<AppDescriptor> {
        self.state.catalog.list(caller)
    }

    /// Start an app in a workspace.
    pub async fn start_app(
        &self,
        caller: &CallerContext,
        app_id: &AppId,
        params: TaskParams,
        workspace: impl Into<String>,
    ) -> Result<Task, ServiceError> {
        self.dispatcher
            .dispatch(
                caller,
                app_id,
                params,
                StartParams::for_workspace(workspace),
                None,
            )
            .await
    }

    /// Start an app with full start parameters.
    pub async fn start_app2(
        &self,
        caller: &CallerContext,
        app_id: &AppId,
        params: TaskParams,
        start_params: StartParams,
    ) -> Result<Task, ServiceError> {
        self.dispatcher
            .dispatch(caller, app_id, params, start_params, None)
            .await
    }

    /// Current state of several tasks.
    pub async fn query_tasks(
        &self,
        _caller: &CallerContext,
        ids: &[TaskId],
    ) -> HashMap<TaskId, Task> {
        self.query.query_tasks(ids).await
    }

    /// Task counts by state.
    pub async fn query_task_summary(&self, _caller: &CallerContext) -> TaskSummary {
        self.query.query_task_summary().await
    }

    /// Deep view of one task.
    pub async fn query_task_details(
        &self,
        _caller: &CallerContext,
        id: &TaskId,
    ) -> Result<TaskDetails, ServiceError> {
        self.query.query_task_details(id).await
    }

    /// A page of tasks in creation order.
    pub async fn enumerate_tasks(
        &self,
        _caller: &CallerContext,
        offset: usize,
        count: usize,
    ) -> Vec<Task> {
        self.query.enumerate_tasks(offset, count).await
    }

    /// Kill a task.
    pub async fn kill_task(
        &self,
        caller: &CallerContext,
        id: &TaskId,
    ) -> Result<KillOutcome, ServiceError> {
        self.lifecycle.kill_task(caller, id).await
    }

    /// Rerun a task under a new id.
    pub async fn rerun_task(
        &self,
        caller: &CallerContext,
        id: &TaskId,
    ) -> Result<TaskId, ServiceError> {
        self.lifecycle.rerun_task(caller, id).await
    }
}
