//! Core domain errors.

use thiserror::Error;

use crate::TaskState;

/// Core domain errors for AppService.
#[derive(Debug, Error, PartialEq)]
pub enum CoreError {
    /// Parameters do not match the app's schema.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Invalid state transition.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: TaskState, to: TaskState },

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
