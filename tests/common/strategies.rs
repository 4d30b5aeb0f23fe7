use proptest::prelude::*;
use serde_json::{json, Value};
use taskforge_core::state_machine::TaskStatus;

/// Strategy for generating any task status
pub fn status_strategy() -> impl Strategy<Value = TaskStatus> {
    prop::sample::select(TaskStatus::ALL.to_vec())
}

/// Strategy for generating `(from, to)` pairs allowed by the transition table
pub fn legal_transition_strategy() -> impl Strategy<Value = (TaskStatus, TaskStatus)> {
    legal_transition_into(|_| true)
}

/// Legal `(from, to)` pairs whose target satisfies `target`
pub fn legal_transition_into(
    target: fn(&TaskStatus) -> bool,
) -> impl Strategy<Value = (TaskStatus, TaskStatus)> {
    let pairs: Vec<(TaskStatus, TaskStatus)> = TaskStatus::ALL
        .iter()
        .flat_map(|from| from.allowed_transitions().iter().map(move |to| (*from, *to)))
        .filter(|(_, to)| target(to))
        .collect();
    prop::sample::select(pairs)
}

/// Strategy for generating `(from, to)` pairs missing from the transition table
pub fn illegal_transition_strategy() -> impl Strategy<Value = (TaskStatus, TaskStatus)> {
    let pairs: Vec<(TaskStatus, TaskStatus)> = TaskStatus::ALL
        .iter()
        .flat_map(|from| TaskStatus::ALL.iter().map(move |to| (*from, *to)))
        .filter(|(from, to)| !from.can_update_to(*to))
        .collect();
    prop::sample::select(pairs)
}

/// Strategy for generating non-empty failure reasons
pub fn failure_reason_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,]{1,64}"
}

/// Strategy for generating extracted-information payloads
pub fn extracted_information_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(|price| json!({ "price": price })),
        "[a-z ]{0,32}".prop_map(Value::String),
        prop::collection::vec(any::<u32>(), 0..5).prop_map(|items| json!(items)),
    ]
}
