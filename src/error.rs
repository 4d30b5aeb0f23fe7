//! Error types for the Taskforge persistence layer.

use crate::state_machine::StateMachineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaskforgeError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("At least one of status, extracted_information, failure_reason, errors, max_steps_per_run or webhook_failure_reason must be provided to update task {task_id}")]
    EmptyUpdate { task_id: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    StateMachine(#[from] StateMachineError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TaskforgeError {
    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        Self::NotFound {
            entity: "Task",
            id: task_id.into(),
        }
    }

    /// Check if this error is a rejected status update
    pub fn is_state_machine(&self) -> bool {
        matches!(self, Self::StateMachine(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<config::ConfigError> for TaskforgeError {
    fn from(err: config::ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, TaskforgeError>;
