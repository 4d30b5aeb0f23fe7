use super::{
    errors::{InvalidTransitionKind, StateMachineError, StateMachineResult},
    states::TaskStatus,
};
use crate::models::Task;
use serde_json::Value;

/// Validator for task status updates.
///
/// Holds a borrowed snapshot of the fields that constrain an update and
/// answers whether a proposed update is legal. It performs no I/O and never
/// mutates the task: the host applies the update (and the timestamp
/// bookkeeping in [`Task::apply_update`]) only after validation succeeds.
#[derive(Debug, Clone, Copy)]
pub struct TaskStatusMachine<'a> {
    task_id: &'a str,
    status: TaskStatus,
    failure_reason: Option<&'a str>,
    data_extraction_goal: Option<&'a str>,
}

impl<'a> TaskStatusMachine<'a> {
    /// Create a validator for a task currently in `status`
    pub fn new(task_id: &'a str, status: TaskStatus) -> Self {
        Self {
            task_id,
            status,
            failure_reason: None,
            data_extraction_goal: None,
        }
    }

    /// Snapshot the constraining fields of a persisted task
    pub fn from_task(task: &'a Task) -> Self {
        Self {
            task_id: &task.task_id,
            status: task.status,
            failure_reason: task.failure_reason.as_deref(),
            data_extraction_goal: task.data_extraction_goal.as_deref(),
        }
    }

    pub fn with_failure_reason(mut self, failure_reason: Option<&'a str>) -> Self {
        self.failure_reason = failure_reason;
        self
    }

    pub fn with_data_extraction_goal(mut self, goal: Option<&'a str>) -> Self {
        self.data_extraction_goal = goal;
        self
    }

    pub fn current_status(&self) -> TaskStatus {
        self.status
    }

    pub fn task_id(&self) -> &str {
        self.task_id
    }

    /// Validate moving the task to `new_status` with the given field values
    pub fn validate_update(
        &self,
        new_status: TaskStatus,
        extracted_information: Option<&Value>,
        failure_reason: Option<&str>,
    ) -> StateMachineResult<()> {
        let result = self.check_update(new_status, extracted_information, failure_reason);

        if let Err(ref error) = result {
            tracing::debug!(
                task_id = %self.task_id,
                from_status = %self.status,
                to_status = %new_status,
                code = error.code(),
                "Rejected task status update"
            );
        }

        result
    }

    /// Write-once check for updates that touch `failure_reason` without a status change
    pub fn validate_failure_reason(&self, failure_reason: Option<&str>) -> StateMachineResult<()> {
        if self.failure_reason.is_some() && failure_reason.is_some() {
            return Err(StateMachineError::FailureReasonAlreadySet {
                task_id: self.task_id.to_string(),
            });
        }
        Ok(())
    }

    fn check_update(
        &self,
        new_status: TaskStatus,
        extracted_information: Option<&Value>,
        failure_reason: Option<&str>,
    ) -> StateMachineResult<()> {
        self.check_transition(new_status)?;

        if new_status.requires_failure_reason() && failure_reason.is_none() {
            return Err(StateMachineError::MissingFailureReason {
                task_id: self.task_id.to_string(),
                status: new_status,
            });
        }

        if new_status.requires_extracted_information()
            && self.data_extraction_goal.is_some_and(|goal| !goal.is_empty())
            && extracted_information.is_none()
        {
            return Err(StateMachineError::MissingExtractedInformation {
                task_id: self.task_id.to_string(),
                status: new_status,
            });
        }

        if new_status.forbids_extracted_information() && extracted_information.is_some() {
            return Err(StateMachineError::UnexpectedExtractedInformation {
                task_id: self.task_id.to_string(),
                status: new_status,
            });
        }

        self.validate_failure_reason(failure_reason)
    }

    fn check_transition(&self, new_status: TaskStatus) -> StateMachineResult<()> {
        if self.status.can_update_to(new_status) {
            return Ok(());
        }

        let kind = match self.status {
            TaskStatus::Canceled => InvalidTransitionKind::AlreadyCanceled { to: new_status },
            TaskStatus::TimedOut => InvalidTransitionKind::AlreadyTimedOut,
            from => InvalidTransitionKind::NotAllowed {
                from,
                to: new_status,
            },
        };

        Err(StateMachineError::InvalidTransition {
            task_id: self.task_id.to_string(),
            kind,
        })
    }
}
