//! HTTP client for the control plane REST endpoints.

use std::collections::HashMap;

use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use appservice_core::{
    AppDescriptor, AppId, KillOutcome, StartParams, StatusRecord, Task, TaskDetails, TaskId,
    TaskParams, TaskSummary,
};

use crate::error::ClientError;

/// Header carrying the caller's user id.
const USER_ID_HEADER: &str = "x-user-id";

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct RerunBody {
    task_id: TaskId,
}

/// HTTP client for the AppService API.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    base_url: String,
    user_id: Option<String>,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client.
    pub fn new(base_url: &str) -> Self {
        Self {
            inner: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            user_id: None,
            token: None,
        }
    }

    /// Act on behalf of `user_id`.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Send `token` as the `Authorization` header.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check if the control plane is healthy.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let url = self.url("/health");
        debug!(url = %url, "Checking health");

        let response = self.inner.get(&url).send().await.map_err(connection)?;
        Ok(response.status().is_success())
    }

    /// Health of the service and its executor.
    pub async fn service_status(&self) -> Result<Vec<StatusRecord>, ClientError> {
        self.get_json("/v1/status").await
    }

    /// Apps the caller may start.
    pub async fn enumerate_apps(&self) -> Result<Vec<AppDescriptor>, ClientError> {
        self.get_json("/v1/apps").await
    }

    /// Start `app_id` in `workspace`.
    pub async fn start_app(
        &self,
        app_id: &AppId,
        params: &TaskParams,
        workspace: &str,
    ) -> Result<Task, ClientError> {
        let url = self.endpoint(&["v1", "apps", app_id.as_str(), "start"])?;
        let body = json!({ "params": params, "workspace": workspace });
        self.send_json(self.inner.post(url).json(&body)).await
    }

    /// Start `app_id` with full start parameters.
    pub async fn start_app2(
        &self,
        app_id: &AppId,
        params: &TaskParams,
        start_params: &StartParams,
    ) -> Result<Task, ClientError> {
        let url = self.endpoint(&["v1", "apps", app_id.as_str(), "start2"])?;
        let body = json!({ "params": params, "start_params": start_params });
        self.send_json(self.inner.post(url).json(&body)).await
    }

    /// Current state of several tasks; unknown ids are absent.
    pub async fn query_tasks(
        &self,
        task_ids: &[TaskId],
    ) -> Result<HashMap<TaskId, Task>, ClientError> {
        let body = json!({ "task_ids": task_ids });
        self.send_json(self.inner.post(self.url("/v1/tasks/query")).json(&body))
            .await
    }

    /// Task counts by state.
    pub async fn query_task_summary(&self) -> Result<TaskSummary, ClientError> {
        self.get_json("/v1/tasks/summary").await
    }

    /// Deep view of one task.
    pub async fn query_task_details(&self, id: &TaskId) -> Result<TaskDetails, ClientError> {
        let url = self.endpoint(&["v1", "tasks", id.as_str()])?;
        self.send_json(self.inner.get(url)).await
    }

    /// A page of tasks in creation order.
    pub async fn enumerate_tasks(
        &self,
        offset: usize,
        count: usize,
    ) -> Result<Vec<Task>, ClientError> {
        let request = self
            .inner
            .get(self.url("/v1/tasks"))
            .query(&[("offset", offset), ("count", count)]);
        self.send_json(request).await
    }

    /// Kill a task.
    pub async fn kill_task(&self, id: &TaskId) -> Result<KillOutcome, ClientError> {
        let url = self.endpoint(&["v1", "tasks", id.as_str(), "kill"])?;
        self.send_json(self.inner.post(url)).await
    }

    /// Rerun a task, returning the new task's id.
    pub async fn rerun_task(&self, id: &TaskId) -> Result<TaskId, ClientError> {
        let url = self.endpoint(&["v1", "tasks", id.as_str(), "rerun"])?;
        let body: RerunBody = self.send_json(self.inner.post(url)).await?;
        Ok(body.task_id)
    }

    /// Get JSON from an endpoint.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.send_json(self.inner.get(self.url(path))).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// URL for a path built from `segments`, each percent-encoded so ids
    /// containing `/`, `?` or `#` stay one segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        mut request: RequestBuilder,
    ) -> Result<T, ClientError> {
        if let Some(user_id) = &self.user_id {
            request = request.header(USER_ID_HEADER, user_id);
        }
        if let Some(token) = &self.token {
            request = request.header(reqwest::header::AUTHORIZATION, token);
        }

        let response = request.send().await.map_err(connection)?;
        debug!(url = %response.url(), status = %response.status(), "Response");

        let response = check_status(response).await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::Serialization(e.to_string()))
    }
}

fn connection(e: reqwest::Error) -> ClientError {
    if e.is_connect() {
        ClientError::Connection(e.to_string())
    } else {
        ClientError::Http(e)
    }
}

async fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|b| b.error)
        .unwrap_or(text);

    Err(error_for_status(status, message))
}

fn error_for_status(status: StatusCode, message: String) -> ClientError {
    if status == StatusCode::NOT_FOUND {
        ClientError::NotFound(message)
    } else {
        ClientError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}
