//! In-memory task store.
//!
//! The index lock is only held long enough to find or insert a record; each
//! record carries its own lock, so a slow reader or writer on one task never
//! blocks the rest of the store.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use appservice_core::{CoreError, Task, TaskId, TaskState};

/// Default upper bound on `list` page sizes.
pub const DEFAULT_MAX_PAGE_SIZE: usize = 1000;

/// Task store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Task not found: {0}")]
    NotFound(TaskId),

    #[error("Task id already exists: {0}")]
    DuplicateId(TaskId),

    /// A mutation was rejected by the task itself.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result of a compare-and-set [`TaskStore::transition`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The task was in the expected state and has moved.
    Applied(Task),
    /// The task had already moved on; it is returned unchanged.
    Stale(Task),
}

type Record = Arc<RwLock<Task>>;

#[derive(Default)]
struct StoreIndex {
    records: HashMap<TaskId, Record>,
    /// Task ids in creation order.
    order: Vec<TaskId>,
}

/// Authoritative registry of task records.
pub struct TaskStore {
    index: RwLock<StoreIndex>,
    max_page_size: usize,
}

impl TaskStore {
    /// Create an empty store with the default page size bound.
    pub fn new() -> Self {
        Self::with_max_page_size(DEFAULT_MAX_PAGE_SIZE)
    }

    /// Create an empty store with a custom page size bound.
    pub fn with_max_page_size(max_page_size: usize) -> Self {
        Self {
            index: RwLock::new(StoreIndex::default()),
            max_page_size: max_page_size.max(1),
        }
    }

    /// Largest page `list` will return.
    pub fn max_page_size(&self) -> usize {
        self.max_page_size
    }

    /// Insert a task under the id it carries.
    pub async fn create(&self, task: Task) -> Result<TaskId, StoreError> {
        let mut index = self.index.write().await;
        if index.records.contains_key(&task.id) {
            return Err(StoreError::DuplicateId(task.id));
        }

        let id = task.id.clone();
        index.order.push(id.clone());
        index.records.insert(id.clone(), Arc::new(RwLock::new(task)));
        Ok(id)
    }

    /// Insert a task under a freshly generated id, regenerating on collision.
    ///
    /// Returns the stored record.
    pub async fn insert_new(&self, mut task: Task) -> Task {
        let mut index = self.index.write().await;
        task.id = TaskId::generate();
        while index.records.contains_key(&task.id) {
            debug!(task_id = %task.id, "Generated task id collided, regenerating");
            task.id = TaskId::generate();
        }

        let stored = task.clone();
        index.order.push(task.id.clone());
        index.records.insert(task.id.clone(), Arc::new(RwLock::new(task)));
        stored
    }

    /// Get a copy of one task.
    pub async fn get(&self, id: &TaskId) -> Result<Task, StoreError> {
        let record = self
            .record(id)
            .await
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        let task = record.read().await.clone();
        Ok(task)
    }

    /// Get copies of several tasks. Unknown ids are omitted.
    pub async fn get_many(&self, ids: &[TaskId]) -> HashMap<TaskId, Task> {
        let records: Vec<Record> = {
            let index = self.index.read().await;
            ids.iter()
                .filter_map(|id| index.records.get(id).cloned())
                .collect()
        };

        let mut tasks = HashMap::with_capacity(records.len());
        for record in records {
            let task = record.read().await.clone();
            tasks.insert(task.id.clone(), task);
        }
        tasks
    }

    /// Apply `mutation` to one task under its record lock.
    ///
    /// The mutation runs on a copy which replaces the record only if it
    /// succeeds, so a rejected mutation leaves the task untouched.
    pub async fn update<F, R>(&self, id: &TaskId, mutation: F) -> Result<R, StoreError>
    where
        F: FnOnce(&mut Task) -> Result<R, CoreError>,
    {
        let record = self
            .record(id)
            .await
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;

        let mut guard = record.write().await;
        let mut draft = guard.clone();
        let out = mutation(&mut draft)?;
        *guard = draft;
        Ok(out)
    }

    /// Move a task from `expected_from` to `to` and apply `patch`, only if
    /// it is still in `expected_from`.
    ///
    /// A task with a kill in flight only accepts a move to `KILLED`; any
    /// other target reports `Stale`.
    pub async fn transition<F>(
        &self,
        id: &TaskId,
        expected_from: TaskState,
        to: TaskState,
        patch: F,
    ) -> Result<TransitionOutcome, StoreError>
    where
        F: FnOnce(&mut Task),
    {
        self.update(id, |t| {
            let held_by_kill = t.kill_requested && to != TaskState::Killed;
            if t.state != expected_from || held_by_kill {
                return Ok(TransitionOutcome::Stale(t.clone()));
            }
            t.transition(to)?;
            patch(t);
            Ok(TransitionOutcome::Applied(t.clone()))
        })
        .await
    }

    /// A page of tasks in creation order.
    ///
    /// `count` is clamped to the page size bound; an offset past the end
    /// yields an empty page.
    pub async fn list(&self, offset: usize, count: usize) -> Vec<Task> {
        let count = count.min(self.max_page_size);
        let records: Vec<Record> = {
            let index = self.index.read().await;
            index
                .order
                .iter()
                .skip(offset)
                .take(count)
                .filter_map(|id| index.records.get(id).cloned())
                .collect()
        };
        read_all(records).await
    }

    /// Every task, in creation order.
    pub async fn snapshot(&self) -> Vec<Task> {
        let records: Vec<Record> = {
            let index = self.index.read().await;
            index
                .order
                .iter()
                .filter_map(|id| index.records.get(id).cloned())
                .collect()
        };
        read_all(records).await
    }

    /// Number of tasks ever created.
    pub async fn len(&self) -> usize {
        self.index.read().await.order.len()
    }

    /// Returns true if no task has been created.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    async fn record(&self, id: &TaskId) -> Option<Record> {
        self.index.read().await.records.get(id).cloned()
    }
}

impl Default for TaskStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_all(records: Vec<Record>) -> Vec<Task> {
    let mut tasks = Vec::with_capacity(records.len());
    for record in records {
        tasks.push(record.read().await.clone());
    }
    tasks
}
