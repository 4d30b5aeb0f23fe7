use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a browser-automation task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Initial status when the task row is created
    #[default]
    Created,
    /// Task has been handed to the scheduler
    Queued,
    /// Task is currently being executed by an agent
    Running,
    /// Task exceeded its time budget
    TimedOut,
    /// Task failed with an error
    Failed,
    /// Task was stopped because a terminate criterion matched
    Terminated,
    /// Task completed successfully
    Completed,
    /// Task was canceled by a caller
    Canceled,
}

impl TaskStatus {
    /// Every status, in transition-table order
    pub const ALL: [TaskStatus; 8] = [
        Self::Created,
        Self::Queued,
        Self::Running,
        Self::TimedOut,
        Self::Failed,
        Self::Terminated,
        Self::Completed,
        Self::Canceled,
    ];

    /// Check if this is a final status (the task never re-enters scheduling)
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::TimedOut | Self::Failed | Self::Terminated | Self::Completed | Self::Canceled
        )
    }

    /// Statuses reachable from this one in a single update
    pub fn allowed_transitions(&self) -> &'static [TaskStatus] {
        match self {
            Self::Created => &[
                Self::Queued,
                Self::Running,
                Self::TimedOut,
                Self::Failed,
                Self::Canceled,
            ],
            Self::Queued => &[Self::Running, Self::TimedOut, Self::Failed, Self::Canceled],
            Self::Running => &[
                Self::Completed,
                Self::Failed,
                Self::Terminated,
                Self::TimedOut,
                Self::Canceled,
            ],
            Self::Failed | Self::Terminated | Self::Completed | Self::TimedOut => &[],
            // A cancel that raced with a finished run is reconciled to completed
            Self::Canceled => &[Self::Completed],
        }
    }

    /// Check if the transition table allows `self -> new_status`
    pub fn can_update_to(&self, new_status: TaskStatus) -> bool {
        self.allowed_transitions().contains(&new_status)
    }

    pub fn requires_failure_reason(&self) -> bool {
        matches!(self, Self::Failed | Self::Terminated)
    }

    /// Statuses that demand extracted output when the task has an extraction goal
    pub fn requires_extracted_information(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Statuses that must never carry extracted output
    pub fn forbids_extracted_information(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Queued | Self::Running | Self::Failed | Self::Terminated
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Queued => "queued",
            Self::Running => "running",
            Self::TimedOut => "timed_out",
            Self::Failed => "failed",
            Self::Terminated => "terminated",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "queued" => Ok(Self::Queued),
            "running" => Ok(Self::Running),
            "timed_out" => Ok(Self::TimedOut),
            "failed" => Ok(Self::Failed),
            "terminated" => Ok(Self::Terminated),
            "completed" => Ok(Self::Completed),
            "canceled" => Ok(Self::Canceled),
            _ => Err(format!("Invalid task status: {s}")),
        }
    }
}

// Lets sqlx decode the TEXT status column via `#[sqlx(try_from = "String")]`
impl TryFrom<String> for TaskStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
