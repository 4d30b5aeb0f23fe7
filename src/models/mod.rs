//! # Data Models
//!
//! - [`task`] - Task row, creation/update requests, listing queries
//! - [`id`] - Prefixed, time-ordered identifiers

pub mod id;
pub mod task;

pub use task::{
    NewTask, OrderBy, SortDirection, Task, TaskFilter, TaskListQuery, TaskOutput, TaskUpdate,
};
