//! # Task Persistence
//!
//! The [`TaskRepository`] trait is the host of the task status machine: it
//! owns the read-validate-write cycle for status updates. Implementations
//! must load the current row under exclusive access, validate the update
//! with [`TaskStatusMachine`], apply it with [`Task::apply_update`] and
//! persist it before releasing access, so that of two racing updates to
//! mutually exclusive final statuses exactly one wins and the other fails
//! with an invalid-transition error.
//!
//! - [`memory::InMemoryTaskRepository`] - DashMap-backed, for tests and embedding
//! - [`postgres::PgTaskRepository`] - SQLx/PostgreSQL using `SELECT ... FOR UPDATE`

pub mod memory;
pub mod postgres;

use crate::config::PaginationConfig;
use crate::error::{Result, TaskforgeError};
use crate::models::{NewTask, Task, TaskFilter, TaskListQuery, TaskUpdate};
use crate::state_machine::{StateMachineResult, TaskStatusMachine};
use async_trait::async_trait;

pub use memory::InMemoryTaskRepository;
pub use postgres::PgTaskRepository;

/// Storage gateway for tasks. Every lookup is scoped by organization;
/// `None` addresses tasks created without an organization.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Persist a new task in the `created` status
    async fn create_task(&self, new_task: NewTask) -> Result<Task>;

    async fn get_task(&self, task_id: &str, organization_id: Option<&str>)
        -> Result<Option<Task>>;

    async fn get_tasks_by_ids(
        &self,
        task_ids: &[String],
        organization_id: Option<&str>,
    ) -> Result<Vec<Task>>;

    /// Paging limits this repository enforces
    fn pagination(&self) -> &PaginationConfig;

    /// First-page listing query for `filter` sized by the configured default
    fn list_query(&self, filter: TaskFilter) -> TaskListQuery {
        TaskListQuery::with_defaults(filter, self.pagination())
    }

    /// One page of tasks matching the query's filter, in the requested order
    async fn get_tasks(&self, query: &TaskListQuery) -> Result<Vec<Task>>;

    async fn get_tasks_count(&self, filter: &TaskFilter) -> Result<i64>;

    /// Validate and apply an update atomically, returning the updated task
    async fn update_task(
        &self,
        task_id: &str,
        organization_id: Option<&str>,
        update: TaskUpdate,
    ) -> Result<Task>;

    /// Reset `failure_reason` so a retried task can record a fresh one
    async fn clear_task_failure_reason(
        &self,
        task_id: &str,
        organization_id: Option<&str>,
    ) -> Result<Task>;
}

/// Reject empty updates and validate payload shape before touching storage
pub(crate) fn prepare_update(task_id: &str, update: TaskUpdate) -> Result<TaskUpdate> {
    if update.is_empty() {
        return Err(TaskforgeError::EmptyUpdate {
            task_id: task_id.to_string(),
        });
    }
    update.sanitize()
}

/// Run the status machine against the current row
pub(crate) fn validate_against(task: &Task, update: &TaskUpdate) -> StateMachineResult<()> {
    let machine = TaskStatusMachine::from_task(task);
    match update.status {
        Some(status) => machine.validate_update(
            status,
            update.extracted_information.as_ref(),
            update.failure_reason.as_deref(),
        ),
        None => machine.validate_failure_reason(update.failure_reason.as_deref()),
    }
}
