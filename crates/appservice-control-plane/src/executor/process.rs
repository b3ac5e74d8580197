//! Executor that runs each app as a local child process.
//!
//! Every task gets a directory under the work dir holding `params.json`,
//! `stdout.txt` and `stderr.txt`. The app's command is run with the path of
//! `params.json` appended as its last argument.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::json;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use appservice_core::{ExecutionReport, ExecutionStatus, ExecutorHandle, StatusRecord};

use super::{Executor, ExecutorError, LaunchRequest};

struct TrackedProcess {
    child: Child,
    stdout_path: PathBuf,
    stderr_path: PathBuf,
}

impl TrackedProcess {
    fn report(&self, exit_code: Option<i32>) -> ExecutionReport {
        ExecutionReport {
            exit_code,
            stdout_path: Some(self.stdout_path.display().to_string()),
            stderr_path: Some(self.stderr_path.display().to_string()),
        }
    }

    /// Reap the child if it exited.
    fn check(&mut self) -> Result<Option<ExecutionStatus>, ExecutorError> {
        let Some(status) = self.child.try_wait()? else {
            return Ok(None);
        };

        let report = self.report(status.code());
        Ok(Some(if status.success() {
            ExecutionStatus::Completed { report }
        } else {
            ExecutionStatus::Failed {
                error: format!("process exited with {status}"),
                report,
            }
        }))
    }
}

/// Live children, plus the outcome of those already reaped.
#[derive(Default)]
struct ProcessTable {
    running: HashMap<String, TrackedProcess>,
    finished: HashMap<String, ExecutionStatus>,
}

impl ProcessTable {
    /// Status of `id`, moving it to `finished` once its child has exited.
    fn status(&mut self, id: &str) -> Result<Option<ExecutionStatus>, ExecutorError> {
        if let Some(done) = self.finished.get(id) {
            return Ok(Some(done.clone()));
        }
        let Some(tracked) = self.running.get_mut(id) else {
            return Err(ExecutorError::HandleNotFound(id.to_string()));
        };

        let Some(done) = tracked.check()? else {
            return Ok(None);
        };
        self.running.remove(id);
        self.finished.insert(id.to_string(), done.clone());
        Ok(Some(done))
    }
}

/// Runs apps as child processes of the control plane.
pub struct ProcessExecutor {
    work_dir: PathBuf,
    processes: Mutex<ProcessTable>,
}

impl ProcessExecutor {
    /// Create an executor rooted at `work_dir`, creating it if needed.
    pub fn new(work_dir: impl Into<PathBuf>) -> Result<Self, ExecutorError> {
        let work_dir = work_dir.into();
        std::fs::create_dir_all(&work_dir)?;
        Ok(Self {
            work_dir,
            processes: Mutex::new(ProcessTable::default()),
        })
    }

    /// Root directory for per-task files.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn lock(&self) -> Result<MutexGuard<'_, ProcessTable>, ExecutorError> {
        self.processes
            .lock()
            .map_err(|_| ExecutorError::Unavailable("process table mutex poisoned".to_string()))
    }
}

#[async_trait]
impl Executor for ProcessExecutor {
    async fn launch(&self, request: &LaunchRequest) -> Result<ExecutorHandle, ExecutorError> {
        let Some((program, args)) = request.app.command.split_first() else {
            return Err(ExecutorError::LaunchFailed(format!(
                "app '{}' has no command",
                request.app.id
            )));
        };

        let task_dir = self.work_dir.join(request.task_id.as_str());
        tokio::fs::create_dir_all(&task_dir).await?;
        let task_dir = tokio::fs::canonicalize(&task_dir).await?;

        let params_path = task_dir.join("params.json");
        let payload = json!({
            "task_id": request.task_id,
            "app": request.app.id,
            "parameters": request.parameters,
            "start_params": request.start_params,
        });
        let bytes = serde_json::to_vec_pretty(&payload)
            .map_err(|e| ExecutorError::LaunchFailed(format!("failed to encode params: {e}")))?;
        tokio::fs::write(&params_path, bytes).await?;

        let stdout_path = task_dir.join("stdout.txt");
        let stderr_path = task_dir.join("stderr.txt");
        let stdout = tokio::fs::File::create(&stdout_path).await?.into_std().await;
        let stderr = tokio::fs::File::create(&stderr_path).await?.into_std().await;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(&params_path)
            .current_dir(&task_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .env("APPSERVICE_TASK_ID", request.task_id.as_str());
        if let Some(user) = &request.caller.user_id {
            cmd.env("APPSERVICE_USER", user);
        }
        if let Some(token) = &request.caller.token {
            cmd.env("APPSERVICE_TOKEN", token);
        }
        if let Some(workspace) = &request.start_params.workspace {
            cmd.env("APPSERVICE_WORKSPACE", workspace);
        }

        let child = cmd.spawn().map_err(|e| {
            ExecutorError::LaunchFailed(format!("failed to spawn '{program}': {e}"))
        })?;

        let handle = ExecutorHandle {
            id: request.task_id.to_string(),
            pid: child.id(),
            stdout_path: Some(stdout_path.display().to_string()),
            stderr_path: Some(stderr_path.display().to_string()),
        };

        info!(
            task_id = %request.task_id,
            app = %request.app.id,
            pid = ?handle.pid,
            "Spawned app process"
        );

        self.lock()?.running.insert(
            handle.id.clone(),
            TrackedProcess {
                child,
                stdout_path,
                stderr_path,
            },
        );

        Ok(handle)
    }

    async fn kill(&self, handle: &ExecutorHandle) -> Result<(), ExecutorError> {
        let mut tracked = {
            let mut processes = self.lock()?;
            if processes.status(&handle.id)?.is_some() {
                return Err(ExecutorError::KillFailed("process already exited".to_string()));
            }
            processes
                .running
                .remove(&handle.id)
                .ok_or_else(|| ExecutorError::HandleNotFound(handle.id.clone()))?
        };

        tracked
            .child
            .start_kill()
            .map_err(|e| ExecutorError::KillFailed(e.to_string()))?;

        info!(handle = %handle.id, pid = ?handle.pid, "Killed app process");

        // Reap in the background so the child does not linger as a zombie.
        let id = handle.id.clone();
        tokio::spawn(async move {
            if let Err(e) = tracked.child.wait().await {
                warn!(handle = %id, error = %e, "Failed to reap killed process");
            }
        });

        Ok(())
    }

    async fn poll(&self, handle: &ExecutorHandle) -> Result<ExecutionStatus, ExecutorError> {
        let status = self.lock()?.status(&handle.id)?;
        Ok(status.unwrap_or(ExecutionStatus::Running))
    }

    fn health(&self) -> StatusRecord {
        let (up, message) = match self.lock() {
            Ok(processes) => {
                let message = format!(
                    "{} running, {} finished, work dir {}",
                    processes.running.len(),
                    processes.finished.len(),
                    self.work_dir.display()
                );
                (true, message)
            }
            Err(e) => (false, e.to_string()),
        };

        StatusRecord {
            service: "process-executor".to_string(),
            up,
            version: None,
            uptime_secs: None,
            message,
        }
    }
}
