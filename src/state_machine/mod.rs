// Task lifecycle state machine
//
// A pure validator over the task status lattice. Persistence hosts load the
// current row, ask the machine whether an update is legal, and only then
// apply the mutation.

pub mod errors;
pub mod states;
pub mod task_state_machine;

// Re-export main types for convenient access
pub use errors::{InvalidTransitionKind, StateMachineError, StateMachineResult};
pub use states::TaskStatus;
pub use task_state_machine::TaskStatusMachine;
