//! # Task Model
//!
//! A task is one unit of browser-automation work: a starting URL, the goals
//! the agent should pursue there, and the lifecycle status the agent moves it
//! through while working.
//!
//! ## Database Schema
//!
//! Maps to the `tasks` table (see [`crate::database::schema`]):
//! - `task_id`: prefixed primary key (`tsk_<u64>`)
//! - `status`: lifecycle status stored as TEXT
//! - `navigation_payload`, `extracted_information`, `errors`: JSONB
//! - `queued_at`, `started_at`, `finished_at`: set once, on first entry into
//!   the matching status class
//!
//! Status changes are validated by [`TaskStatusMachine`] before
//! [`Task::apply_update`] runs; persistence hosts perform both steps inside
//! one exclusive read-modify-write.

use crate::config::PaginationConfig;
use crate::error::{Result, TaskforgeError};
use crate::models::id;
use crate::state_machine::TaskStatus;
use crate::validation;
use chrono::{NaiveDateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Persisted task row and its view model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub task_id: String,
    pub organization_id: Option<String>,
    pub title: Option<String>,
    pub url: String,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    pub navigation_goal: Option<String>,
    pub data_extraction_goal: Option<String>,
    pub navigation_payload: Option<Value>,
    pub extracted_information: Option<Value>,
    pub extracted_information_schema: Option<Value>,
    pub failure_reason: Option<String>,
    pub webhook_callback_url: Option<String>,
    pub webhook_failure_reason: Option<String>,
    pub workflow_run_id: Option<String>,
    #[sqlx(rename = "task_order")]
    pub order: Option<i32>,
    pub retry: Option<i32>,
    pub max_steps_per_run: Option<i32>,
    #[sqlx(json)]
    pub errors: Vec<Value>,
    pub application: Option<String>,
    pub created_at: NaiveDateTime,
    pub modified_at: NaiveDateTime,
    pub queued_at: Option<NaiveDateTime>,
    pub started_at: Option<NaiveDateTime>,
    pub finished_at: Option<NaiveDateTime>,
}

/// New Task for creation (without generated fields)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewTask {
    pub organization_id: Option<String>,
    pub title: Option<String>,
    pub url: String,
    pub navigation_goal: Option<String>,
    pub data_extraction_goal: Option<String>,
    pub navigation_payload: Option<Value>,
    pub extracted_information_schema: Option<Value>,
    pub webhook_callback_url: Option<String>,
    pub workflow_run_id: Option<String>,
    pub order: Option<i32>,
    pub retry: Option<i32>,
    pub max_steps_per_run: Option<i32>,
    pub application: Option<String>,
}

impl NewTask {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.organization_id = Some(organization_id.into());
        self
    }

    pub fn with_navigation_goal(mut self, goal: impl Into<String>) -> Self {
        self.navigation_goal = Some(goal.into());
        self
    }

    pub fn with_data_extraction_goal(mut self, goal: impl Into<String>) -> Self {
        self.data_extraction_goal = Some(goal.into());
        self
    }

    pub fn with_workflow_run(mut self, workflow_run_id: impl Into<String>) -> Self {
        self.workflow_run_id = Some(workflow_run_id.into());
        self
    }

    pub fn with_application(mut self, application: impl Into<String>) -> Self {
        self.application = Some(application.into());
        self
    }

    /// Validate inputs and strip characters PostgreSQL cannot store
    pub fn sanitize(self) -> Result<NewTask> {
        let url = validation::validate_url("url", &self.url)?;
        let webhook_callback_url = self
            .webhook_callback_url
            .as_deref()
            .map(|raw| validation::validate_url("webhook_callback_url", raw))
            .transpose()?;

        if let Some(ref payload) = self.navigation_payload {
            validation::validate_jsonb_input("navigation_payload", payload)?;
        }
        if let Some(ref schema) = self.extracted_information_schema {
            validation::validate_jsonb_input("extracted_information_schema", schema)?;
        }
        if matches!(self.max_steps_per_run, Some(steps) if steps < 0) {
            return Err(TaskforgeError::InvalidInput(
                "max_steps_per_run cannot be negative".to_string(),
            ));
        }

        Ok(NewTask {
            url,
            webhook_callback_url,
            navigation_payload: self.navigation_payload.map(validation::sanitize_json),
            extracted_information_schema: self
                .extracted_information_schema
                .map(validation::sanitize_json),
            ..self
        })
    }

    /// Build the row for a freshly created task; tasks always start in `created`
    pub fn into_task(self, now: NaiveDateTime) -> Task {
        Task {
            task_id: id::generate_task_id(),
            organization_id: self.organization_id,
            title: self.title,
            url: self.url,
            status: TaskStatus::Created,
            navigation_goal: self.navigation_goal,
            data_extraction_goal: self.data_extraction_goal,
            navigation_payload: self.navigation_payload,
            extracted_information: None,
            extracted_information_schema: self.extracted_information_schema,
            failure_reason: None,
            webhook_callback_url: self.webhook_callback_url,
            webhook_failure_reason: None,
            workflow_run_id: self.workflow_run_id,
            order: self.order,
            retry: self.retry,
            max_steps_per_run: self.max_steps_per_run,
            errors: Vec::new(),
            application: self.application,
            created_at: now,
            modified_at: now,
            queued_at: None,
            started_at: None,
            finished_at: None,
        }
    }
}

/// Partial update of a task. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub extracted_information: Option<Value>,
    pub failure_reason: Option<String>,
    pub webhook_failure_reason: Option<String>,
    pub errors: Option<Vec<Value>>,
    pub max_steps_per_run: Option<i32>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Move to `failed` with the mandatory failure reason
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::status(TaskStatus::Failed).with_failure_reason(reason)
    }

    /// Move to `terminated` with the mandatory failure reason
    pub fn terminated(reason: impl Into<String>) -> Self {
        Self::status(TaskStatus::Terminated).with_failure_reason(reason)
    }

    pub fn completed(extracted_information: Option<Value>) -> Self {
        Self {
            status: Some(TaskStatus::Completed),
            extracted_information,
            ..Default::default()
        }
    }

    pub fn with_failure_reason(mut self, reason: impl Into<String>) -> Self {
        self.failure_reason = Some(reason.into());
        self
    }

    pub fn with_extracted_information(mut self, value: Value) -> Self {
        self.extracted_information = Some(value);
        self
    }

    pub fn with_errors(mut self, errors: Vec<Value>) -> Self {
        self.errors = Some(errors);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.extracted_information.is_none()
            && self.failure_reason.is_none()
            && self.webhook_failure_reason.is_none()
            && self.errors.is_none()
            && self.max_steps_per_run.is_none()
    }

    /// Validate payload shape and strip characters PostgreSQL cannot store
    pub fn sanitize(self) -> Result<TaskUpdate> {
        if let Some(ref info) = self.extracted_information {
            validation::validate_jsonb_input("extracted_information", info)?;
        }
        if let Some(ref errors) = self.errors {
            validation::validate_task_errors(errors)?;
        }
        if matches!(self.max_steps_per_run, Some(steps) if steps < 0) {
            return Err(TaskforgeError::InvalidInput(
                "max_steps_per_run cannot be negative".to_string(),
            ));
        }

        Ok(TaskUpdate {
            extracted_information: self.extracted_information.map(validation::sanitize_json),
            errors: self
                .errors
                .map(|errors| errors.into_iter().map(validation::sanitize_json).collect()),
            ..self
        })
    }
}

impl Task {
    /// Apply an already-validated update.
    ///
    /// Lifecycle timestamps are set-if-absent: `queued_at` on entering
    /// `queued`, `started_at` on entering `running`, `finished_at` on entering
    /// any final status. Re-applying the same update leaves them unchanged.
    pub fn apply_update(&mut self, update: TaskUpdate, now: NaiveDateTime) {
        if let Some(status) = update.status {
            self.status = status;
            if status == TaskStatus::Queued {
                self.queued_at.get_or_insert(now);
            }
            if status == TaskStatus::Running {
                self.started_at.get_or_insert(now);
            }
            if status.is_final() {
                self.finished_at.get_or_insert(now);
            }
        }
        if let Some(info) = update.extracted_information {
            self.extracted_information = Some(info);
        }
        if let Some(reason) = update.failure_reason {
            self.failure_reason = Some(reason);
        }
        if let Some(errors) = update.errors {
            self.errors = errors;
        }
        if let Some(steps) = update.max_steps_per_run {
            self.max_steps_per_run = Some(steps);
        }
        if let Some(reason) = update.webhook_failure_reason {
            self.webhook_failure_reason = Some(reason);
        }
        self.modified_at = now;
    }

    pub fn is_final(&self) -> bool {
        self.status.is_final()
    }

    /// Check if the task belongs to the organization scope (`None` matches unscoped tasks)
    pub fn in_organization(&self, organization_id: Option<&str>) -> bool {
        self.organization_id.as_deref() == organization_id
    }

    pub fn output(&self) -> TaskOutput {
        TaskOutput::from_task(self)
    }
}

/// Compact result view returned to callers once a task finishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task_id: String,
    pub status: TaskStatus,
    pub extracted_information: Option<Value>,
    pub failure_reason: Option<String>,
    pub errors: Vec<Value>,
}

impl TaskOutput {
    pub fn from_task(task: &Task) -> Self {
        Self {
            task_id: task.task_id.clone(),
            status: task.status,
            extracted_information: task.extracted_information.clone(),
            failure_reason: task.failure_reason.clone(),
            errors: task.errors.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    #[default]
    CreatedAt,
    ModifiedAt,
}

impl OrderBy {
    pub fn column(&self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::ModifiedAt => "modified_at",
        }
    }

    pub fn key(&self, task: &Task) -> NaiveDateTime {
        match self {
            Self::CreatedAt => task.created_at,
            Self::ModifiedAt => task.modified_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Filters shared by task listing and counting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilter {
    pub organization_id: Option<String>,
    pub statuses: Vec<TaskStatus>,
    pub workflow_run_id: Option<String>,
    /// Only tasks that do not belong to a workflow run
    pub only_standalone_tasks: bool,
    pub application: Option<String>,
}

impl TaskFilter {
    pub fn for_organization(organization_id: impl Into<String>) -> Self {
        Self {
            organization_id: Some(organization_id.into()),
            ..Default::default()
        }
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn matches(&self, task: &Task) -> bool {
        task.in_organization(self.organization_id.as_deref())
            && (self.statuses.is_empty() || self.statuses.contains(&task.status))
            && self
                .workflow_run_id
                .as_ref()
                .map_or(true, |run| task.workflow_run_id.as_ref() == Some(run))
            && (!self.only_standalone_tasks || task.workflow_run_id.is_none())
            && self
                .application
                .as_ref()
                .map_or(true, |app| task.application.as_ref() == Some(app))
    }
}

/// Paged task listing request. Pages start at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskListQuery {
    pub filter: TaskFilter,
    pub page: u32,
    pub page_size: u32,
    pub order_by: OrderBy,
    pub direction: SortDirection,
}

impl Default for TaskListQuery {
    fn default() -> Self {
        Self {
            filter: TaskFilter::default(),
            page: 1,
            page_size: PaginationConfig::default().default_page_size,
            order_by: OrderBy::CreatedAt,
            direction: SortDirection::Desc,
        }
    }
}

impl TaskListQuery {
    pub fn new(filter: TaskFilter) -> Self {
        Self {
            filter,
            ..Default::default()
        }
    }

    /// First page sized by the configured default page size
    pub fn with_defaults(filter: TaskFilter, pagination: &PaginationConfig) -> Self {
        Self {
            filter,
            page_size: pagination.default_page_size,
            ..Default::default()
        }
    }

    pub fn page(mut self, page: u32, page_size: u32) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    pub fn order(mut self, order_by: OrderBy, direction: SortDirection) -> Self {
        self.order_by = order_by;
        self.direction = direction;
        self
    }

    /// Check paging bounds against the configured maximum page size
    pub fn validate(&self, max_page_size: u32) -> Result<()> {
        if self.page < 1 {
            return Err(TaskforgeError::InvalidInput(format!(
                "Page must be greater than 0, got {}",
                self.page
            )));
        }
        if self.page_size < 1 || self.page_size > max_page_size {
            return Err(TaskforgeError::InvalidInput(format!(
                "Page size must be between 1 and {max_page_size}, got {}",
                self.page_size
            )));
        }
        Ok(())
    }

    /// Zero-based row offset of the requested page
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// Current UTC time at the microsecond precision PostgreSQL `TIMESTAMP` stores
pub(crate) fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}
