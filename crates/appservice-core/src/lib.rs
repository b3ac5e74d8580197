//! AppService Core Domain Types
//!
//! This crate contains pure domain types with no dependencies on:
//! - Network/HTTP
//! - Execution substrates
//! - Runtime specifics
//!
//! All types here represent the core business domain of AppService.

pub mod app;
pub mod context;
pub mod error;
pub mod execution;
pub mod ids;
pub mod status;
pub mod task;

// Re-export commonly used types
pub use app::{AppDescriptor, AppParameter, ParamKind};
pub use context::CallerContext;
pub use error::CoreError;
pub use execution::{ExecutionReport, ExecutionStatus, ExecutorHandle};
pub use ids::{AppId, TaskId};
pub use status::TaskState;
pub use task::{KillOutcome, StartParams, StatusRecord, Task, TaskDetails, TaskSummary};

/// App parameters: an arbitrary JSON object.
pub type TaskParams = serde_json::Map<String, serde_json::Value>;
