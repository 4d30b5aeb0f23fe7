#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Taskforge Core
//!
//! Task lifecycle state machine and persistence layer for a browser-automation
//! agent platform.
//!
//! ## Overview
//!
//! A task moves through a fixed status lattice:
//!
//! ```text
//! created ──► queued ──► running ──► completed
//!    │          │          ├──────► failed / terminated
//!    └──────────┴──────────┴──────► timed_out / failed / canceled
//!                                   canceled ──► completed (late reconciliation)
//! ```
//!
//! [`state_machine::TaskStatusMachine`] is a pure validator over that lattice
//! and its field rules (failure reasons, extracted information). Repositories
//! in [`persistence`] host it: they load the current row under exclusive
//! access, validate, apply the update with set-once lifecycle timestamps and
//! persist, all in one step.
//!
//! ## Module Organization
//!
//! - [`state_machine`] - Task statuses, transition table, update validation
//! - [`models`] - Task row, creation/update requests, prefixed identifiers
//! - [`persistence`] - `TaskRepository` with in-memory and PostgreSQL hosts
//! - [`scopes`] - Composable task queries for PostgreSQL
//! - [`database`] - Connection pool and schema bootstrap
//! - [`config`] - Layered configuration
//! - [`logging`] - Structured logging setup
//! - [`validation`] - JSONB and URL input guards
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust
//! use taskforge_core::models::{NewTask, TaskUpdate};
//! use taskforge_core::persistence::{InMemoryTaskRepository, TaskRepository};
//! use taskforge_core::state_machine::TaskStatus;
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let repo = InMemoryTaskRepository::new();
//! let task = repo
//!     .create_task(NewTask::new("https://example.com").with_data_extraction_goal("get price"))
//!     .await?;
//!
//! repo.update_task(&task.task_id, None, TaskUpdate::status(TaskStatus::Running)).await?;
//! let done = repo
//!     .update_task(&task.task_id, None, TaskUpdate::completed(Some(json!({"price": 42}))))
//!     .await?;
//! assert!(done.finished_at.is_some());
//! # Ok::<(), taskforge_core::TaskforgeError>(())
//! # }).unwrap();
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod models;
pub mod persistence;
pub mod scopes;
pub mod state_machine;
pub mod validation;

pub use error::{Result, TaskforgeError};
pub use models::{NewTask, Task, TaskUpdate};
pub use persistence::{InMemoryTaskRepository, PgTaskRepository, TaskRepository};
pub use state_machine::{StateMachineError, TaskStatus, TaskStatusMachine};
