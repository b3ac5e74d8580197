//! Shared application state.

use std::sync::Arc;
use std::time::Instant;

use crate::catalog::AppCatalog;
use crate::executor::Executor;
use crate::store::TaskStore;

/// Shared application state, handed to every component as `Arc<AppState>`.
pub struct AppState {
    /// Tasks indexed by TaskId.
    pub store: TaskStore,

    /// Apps that may be started.
    pub catalog: Arc<dyn AppCatalog>,

    /// Runs the apps.
    pub executor: Arc<dyn Executor>,

    /// When the service started.
    pub started_at: Instant,
}

impl AppState {
    /// Create a new AppState wrapped in Arc.
    pub fn new(catalog: Arc<dyn AppCatalog>, executor: Arc<dyn Executor>) -> Arc<Self> {
        Self::with_store(TaskStore::new(), catalog, executor)
    }

    /// Create a new AppState around an existing store.
    pub fn with_store(
        store: TaskStore,
        catalog: Arc<dyn AppCatalog>,
        executor: Arc<dyn Executor>,
    ) -> Arc<Self> {
        Arc::new(Self {
            store,
            catalog,
            executor,
            started_at: Instant::now(),
        })
    }

    /// Get the number of tasks.
    pub async fn task_count(&self) -> usize {
        self.store.len().await
    }
}
