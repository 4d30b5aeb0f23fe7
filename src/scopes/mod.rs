//! # Query Scopes Module
//!
//! Chainable, composable queries over the `tasks` table built on SQLx's
//! `QueryBuilder`. Every value is bound as a parameter; only column names and
//! sort directions from closed enums are spliced into the SQL text.
//!
//! ```rust,no_run
//! use taskforge_core::models::{Task, TaskFilter};
//! use taskforge_core::state_machine::TaskStatus;
//!
//! # async fn example(pool: &sqlx::PgPool) -> Result<(), sqlx::Error> {
//! let running = Task::scope()
//!     .filtered(&TaskFilter::for_organization("o_1").with_statuses([TaskStatus::Running]))
//!     .all(pool)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod task;

pub use task::{TaskScope, TASK_COLUMNS};
