//! AppService Control Plane Library
//!
//! This crate provides the task orchestration engine behind AppService:
//! the task store, the dispatcher, query and lifecycle services, the
//! executor capability and the HTTP surface.

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod http;
pub mod metrics;
pub mod service;
pub mod state;
pub mod store;

pub use catalog::{AppCatalog, StaticCatalog};
pub use config::Config;
pub use dispatcher::Dispatcher;
pub use error::ServiceError;
pub use executor::{Executor, ExecutorError, LaunchRequest, ProcessExecutor};
pub use service::AppService;
pub use state::AppState;
pub use store::{StoreError, TaskStore, TransitionOutcome};
