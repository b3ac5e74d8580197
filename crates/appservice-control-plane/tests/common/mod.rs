//! Shared fixtures: a scripted executor and a small catalog.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use appservice_control_plane::{
    AppService, AppState, Executor, ExecutorError, LaunchRequest, StaticCatalog,
};
use appservice_core::{
    AppDescriptor, AppParameter, ExecutionReport, ExecutionStatus, ExecutorHandle, ParamKind,
};

/// App whose launch always fails.
pub const BROKEN_APP: &str = "broken";
/// App whose launch waits for `ScriptedExecutor::release_launch`.
pub const GATED_APP: &str = "gated";

/// Executor whose behaviour is driven by the test.
#[derive(Default)]
pub struct ScriptedExecutor {
    next_handle: AtomicU64,
    statuses: Mutex<HashMap<String, ExecutionStatus>>,
    killed: Mutex<Vec<String>>,
    launches: Mutex<Vec<LaunchRequest>>,
    gate: Notify,
    kill_parked: Notify,
    kill_gate: Notify,
    pub fail_kill: AtomicBool,
    /// Park `kill` after the execution has stopped, until `release_kill`.
    pub hold_kill: AtomicBool,
    pub poll_unavailable: AtomicBool,
}

impl ScriptedExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Let one gated launch proceed.
    pub fn release_launch(&self) {
        self.gate.notify_one();
    }

    /// Wait until a held `kill` has stopped the execution.
    pub async fn kill_parked(&self) {
        self.kill_parked.notified().await;
    }

    /// Let a held `kill` return.
    pub fn release_kill(&self) {
        self.kill_gate.notify_one();
    }

    /// Make the execution behind `handle` finish.
    pub fn finish(&self, handle: &ExecutorHandle, exit_code: i32) {
        let report = ExecutionReport {
            exit_code: Some(exit_code),
            stdout_path: Some(format!("/out/{}/stdout.txt", handle.id)),
            stderr_path: None,
        };
        let status = if exit_code == 0 {
            ExecutionStatus::Completed { report }
        } else {
            ExecutionStatus::Failed {
                error: format!("exit code {exit_code}"),
                report,
            }
        };
        self.statuses
            .lock()
            .unwrap()
            .insert(handle.id.clone(), status);
    }

    pub fn killed(&self) -> Vec<String> {
        self.killed.lock().unwrap().clone()
    }

    pub fn launches(&self) -> Vec<LaunchRequest> {
        self.launches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn launch(&self, request: &LaunchRequest) -> Result<ExecutorHandle, ExecutorError> {
        self.launches.lock().unwrap().push(request.clone());

        match request.app.id.as_str() {
            BROKEN_APP => {
                return Err(ExecutorError::LaunchFailed("no capacity".to_string()));
            }
            GATED_APP => self.gate.notified().await,
            _ => {}
        }

        let n = self.next_handle.fetch_add(1, Ordering::SeqCst);
        let handle = ExecutorHandle::new(format!("h-{n}"));
        self.statuses
            .lock()
            .unwrap()
            .insert(handle.id.clone(), ExecutionStatus::Running);
        Ok(handle)
    }

    async fn kill(&self, handle: &ExecutorHandle) -> Result<(), ExecutorError> {
        if self.fail_kill.load(Ordering::SeqCst) {
            return Err(ExecutorError::KillFailed("executor refused".to_string()));
        }

        {
            let mut statuses = self.statuses.lock().unwrap();
            match statuses.get(&handle.id).cloned() {
                None => return Err(ExecutorError::HandleNotFound(handle.id.clone())),
                Some(ExecutionStatus::Running) => {
                    statuses.insert(
                        handle.id.clone(),
                        ExecutionStatus::Failed {
                            error: "signal 9".to_string(),
                            report: ExecutionReport::default(),
                        },
                    );
                    self.killed.lock().unwrap().push(handle.id.clone());
                }
                Some(_) => {
                    return Err(ExecutorError::KillFailed("already exited".to_string()));
                }
            }
        }

        if self.hold_kill.load(Ordering::SeqCst) {
            self.kill_parked.notify_one();
            self.kill_gate.notified().await;
        }
        Ok(())
    }

    async fn poll(&self, handle: &ExecutorHandle) -> Result<ExecutionStatus, ExecutorError> {
        if self.poll_unavailable.load(Ordering::SeqCst) {
            return Err(ExecutorError::Unavailable("connection refused".to_string()));
        }

        self.statuses
            .lock()
            .unwrap()
            .get(&handle.id)
            .cloned()
            .ok_or_else(|| ExecutorError::HandleNotFound(handle.id.clone()))
    }
}

pub fn catalog() -> StaticCatalog {
    StaticCatalog::new([
        AppDescriptor::new("app1").with_command(["true"]),
        AppDescriptor::new("Assembly")
            .with_parameter(AppParameter::new("reads", ParamKind::String).required())
            .with_parameter(
                AppParameter::new("recipe", ParamKind::Enum)
                    .with_enum_values(["auto", "fast"])
                    .with_default(json!("auto")),
            ),
        AppDescriptor::new(BROKEN_APP),
        AppDescriptor::new(GATED_APP),
    ])
    .unwrap()
}

pub fn service() -> (AppService, Arc<ScriptedExecutor>) {
    let executor = ScriptedExecutor::new();
    let state = AppState::new(Arc::new(catalog()), executor.clone());
    (AppService::new(state), executor)
}
