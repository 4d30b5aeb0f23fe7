use taskforge_core::state_machine::{StateMachineError, TaskStatus, TaskStatusMachine};
use taskforge_core::TaskforgeError;

#[test]
fn test_error_codes_for_api_responses() {
    let canceled = TaskStatusMachine::new("tsk_1", TaskStatus::Canceled);
    let err = canceled
        .validate_update(TaskStatus::Running, None, None)
        .unwrap_err();
    assert_eq!(err.code(), "task_already_canceled");
    assert_eq!(err.task_id(), "tsk_1");

    let timed_out = TaskStatusMachine::new("tsk_2", TaskStatus::TimedOut);
    let err = timed_out
        .validate_update(TaskStatus::Completed, None, None)
        .unwrap_err();
    assert_eq!(err.code(), "task_already_timed_out");

    let completed = TaskStatusMachine::new("tsk_3", TaskStatus::Completed);
    let err = completed
        .validate_update(TaskStatus::Running, None, None)
        .unwrap_err();
    assert_eq!(err.code(), "invalid_task_status_transition");
}

#[test]
fn test_state_machine_error_converts_into_crate_error() {
    let err: TaskforgeError = StateMachineError::FailureReasonAlreadySet {
        task_id: "tsk_4".to_string(),
    }
    .into();

    assert!(err.is_state_machine());
    assert!(!err.is_not_found());
    assert_eq!(
        err.to_string(),
        "Failure reason is already set and cannot be overridden (task tsk_4)"
    );
}
