use super::states::TaskStatus;
use std::fmt;
use thiserror::Error;

/// Why the transition table rejected an update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidTransitionKind {
    /// The task was canceled and the caller asked for anything but `completed`
    AlreadyCanceled { to: TaskStatus },
    /// The task already timed out
    AlreadyTimedOut,
    /// Any other edge missing from the transition table
    NotAllowed { from: TaskStatus, to: TaskStatus },
}

impl fmt::Display for InvalidTransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyCanceled { to } => {
                write!(f, "task is already canceled, cannot update to {to}")
            }
            Self::AlreadyTimedOut => write!(f, "task has already timed out"),
            Self::NotAllowed { from, to } => write!(f, "{from} -> {to} is not allowed"),
        }
    }
}

/// Validation failures raised by the task status machine
///
/// These are deterministic logic errors. They are never retried and are
/// always surfaced to the caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateMachineError {
    #[error("Invalid status transition for task {task_id}: {kind}")]
    InvalidTransition {
        task_id: String,
        kind: InvalidTransitionKind,
    },

    #[error("Status {status} requires a failure reason (task {task_id})")]
    MissingFailureReason { task_id: String, status: TaskStatus },

    #[error("Status {status} requires extracted information (task {task_id})")]
    MissingExtractedInformation { task_id: String, status: TaskStatus },

    #[error("Status {status} cannot carry extracted information (task {task_id})")]
    UnexpectedExtractedInformation { task_id: String, status: TaskStatus },

    #[error("Failure reason is already set and cannot be overridden (task {task_id})")]
    FailureReasonAlreadySet { task_id: String },
}

impl StateMachineError {
    pub fn task_id(&self) -> &str {
        match self {
            Self::InvalidTransition { task_id, .. }
            | Self::MissingFailureReason { task_id, .. }
            | Self::MissingExtractedInformation { task_id, .. }
            | Self::UnexpectedExtractedInformation { task_id, .. }
            | Self::FailureReasonAlreadySet { task_id } => task_id,
        }
    }

    /// Check if this error came from the transition table rather than a field rule
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, Self::InvalidTransition { .. })
    }

    /// Stable snake_case code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidTransition {
                kind: InvalidTransitionKind::AlreadyCanceled { .. },
                ..
            } => "task_already_canceled",
            Self::InvalidTransition {
                kind: InvalidTransitionKind::AlreadyTimedOut,
                ..
            } => "task_already_timed_out",
            Self::InvalidTransition { .. } => "invalid_task_status_transition",
            Self::MissingFailureReason { .. } => "missing_failure_reason",
            Self::MissingExtractedInformation { .. } => "missing_extracted_information",
            Self::UnexpectedExtractedInformation { .. } => "unexpected_extracted_information",
            Self::FailureReasonAlreadySet { .. } => "failure_reason_already_set",
        }
    }
}

/// Result type alias for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;
