//! Task lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// State of a Task.
///
/// `Queued -> Running -> {Completed, Failed}`, with `Killed` reachable from
/// both non-terminal states and `Failed` reachable from `Queued` when the
/// launch itself fails.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    /// Task recorded, launch not yet acknowledged by the executor.
    #[default]
    Queued,
    /// Executor accepted the launch.
    Running,
    /// Backing execution finished successfully.
    Completed,
    /// Launch or execution failed.
    Failed,
    /// Killed by a caller.
    Killed,
}

impl TaskState {
    /// Every state, in lifecycle order.
    pub const ALL: [TaskState; 5] = [
        TaskState::Queued,
        TaskState::Running,
        TaskState::Completed,
        TaskState::Failed,
        TaskState::Killed,
    ];

    /// Returns true if no further transitions are permitted.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Killed)
    }

    /// Returns true if the task is still active (not terminal).
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }

    /// Whether `self -> next` is a permitted transition.
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        matches!(
            (self, next),
            (Self::Queued, Self::Running)
                | (Self::Queued, Self::Failed)
                | (Self::Queued, Self::Killed)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
                | (Self::Running, Self::Killed)
        )
    }

    /// Wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Killed => "KILLED",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
