//! # Task Scopes
//!
//! Query scopes for the `tasks` table: organization scoping, status and
//! workflow-run filters, ordering and pagination.

use crate::models::task::{OrderBy, SortDirection, TaskFilter, TaskListQuery};
use crate::models::Task;
use crate::state_machine::TaskStatus;
use sqlx::{PgPool, Postgres, QueryBuilder};

/// Column list shared by every task SELECT
pub const TASK_COLUMNS: &str = "task_id, organization_id, title, url, status, navigation_goal, \
     data_extraction_goal, navigation_payload, extracted_information, \
     extracted_information_schema, failure_reason, webhook_callback_url, \
     webhook_failure_reason, workflow_run_id, task_order, retry, max_steps_per_run, errors, \
     application, created_at, modified_at, queued_at, started_at, finished_at";

/// Query builder for Task scopes
pub struct TaskScope {
    query: QueryBuilder<'static, Postgres>,
    has_conditions: bool,
}

impl Task {
    /// Start building a scoped query
    pub fn scope() -> TaskScope {
        TaskScope::new(&format!("SELECT {TASK_COLUMNS} FROM tasks"))
    }

    /// Start building a scoped COUNT(*) query
    pub fn count_scope() -> TaskScope {
        TaskScope::new("SELECT COUNT(*) FROM tasks")
    }
}

impl TaskScope {
    fn new(select: &str) -> Self {
        Self {
            query: QueryBuilder::new(select),
            has_conditions: false,
        }
    }

    /// Add WHERE clause helper
    fn add_condition(&mut self, condition: &str) {
        if self.has_conditions {
            self.query.push(" AND ");
        } else {
            self.query.push(" WHERE ");
            self.has_conditions = true;
        }
        self.query.push(condition);
    }

    /// Scope: tasks owned by the organization; `None` selects unscoped tasks
    pub fn in_organization(mut self, organization_id: Option<String>) -> Self {
        match organization_id {
            Some(org) => {
                self.add_condition("organization_id = ");
                self.query.push_bind(org);
            }
            None => self.add_condition("organization_id IS NULL"),
        }
        self
    }

    pub fn with_task_id(mut self, task_id: String) -> Self {
        self.add_condition("task_id = ");
        self.query.push_bind(task_id);
        self
    }

    pub fn with_task_ids(mut self, task_ids: Vec<String>) -> Self {
        self.add_condition("task_id = ANY(");
        self.query.push_bind(task_ids);
        self.query.push(")");
        self
    }

    /// Scope: tasks whose status is one of `statuses` (no-op when empty)
    pub fn with_statuses(mut self, statuses: &[TaskStatus]) -> Self {
        if !statuses.is_empty() {
            let names: Vec<String> = statuses.iter().map(ToString::to_string).collect();
            self.add_condition("status = ANY(");
            self.query.push_bind(names);
            self.query.push(")");
        }
        self
    }

    pub fn in_workflow_run(mut self, workflow_run_id: String) -> Self {
        self.add_condition("workflow_run_id = ");
        self.query.push_bind(workflow_run_id);
        self
    }

    /// Scope: tasks not attached to any workflow run
    pub fn standalone(mut self) -> Self {
        self.add_condition("workflow_run_id IS NULL");
        self
    }

    pub fn for_application(mut self, application: String) -> Self {
        self.add_condition("application = ");
        self.query.push_bind(application);
        self
    }

    /// Apply every filter of a [`TaskFilter`]
    pub fn filtered(self, filter: &TaskFilter) -> Self {
        let mut scope = self
            .in_organization(filter.organization_id.clone())
            .with_statuses(&filter.statuses);

        if let Some(ref run) = filter.workflow_run_id {
            scope = scope.in_workflow_run(run.clone());
        }
        if filter.only_standalone_tasks {
            scope = scope.standalone();
        }
        if let Some(ref app) = filter.application {
            scope = scope.for_application(app.clone());
        }
        scope
    }

    pub fn order_by(mut self, column: OrderBy, direction: SortDirection) -> Self {
        self.query.push(format!(
            " ORDER BY {} {}, task_id {}",
            column.column(),
            direction.as_sql(),
            direction.as_sql()
        ));
        self
    }

    pub fn paginate(mut self, limit: i64, offset: i64) -> Self {
        self.query.push(" LIMIT ");
        self.query.push_bind(limit);
        self.query.push(" OFFSET ");
        self.query.push_bind(offset);
        self
    }

    /// Apply filters, ordering and paging of a listing request
    pub fn for_list_query(self, query: &TaskListQuery) -> Self {
        let offset = i64::try_from(query.offset()).unwrap_or(i64::MAX);
        self.filtered(&query.filter)
            .order_by(query.order_by, query.direction)
            .paginate(i64::from(query.page_size), offset)
    }

    /// Lock selected rows until the enclosing transaction ends
    pub fn for_update(mut self) -> Self {
        self.query.push(" FOR UPDATE");
        self
    }

    /// The SQL text built so far (placeholders included)
    pub fn sql(&self) -> &str {
        self.query.sql()
    }

    pub async fn all(mut self, pool: &PgPool) -> Result<Vec<Task>, sqlx::Error> {
        self.query.build_query_as::<Task>().fetch_all(pool).await
    }

    pub async fn first(mut self, pool: &PgPool) -> Result<Option<Task>, sqlx::Error> {
        self.query.build_query_as::<Task>().fetch_optional(pool).await
    }

    /// Fetch at most one row on an open transaction
    pub async fn first_in(
        mut self,
        tx: &mut sqlx::Transaction<'_, Postgres>,
    ) -> Result<Option<Task>, sqlx::Error> {
        self.query
            .build_query_as::<Task>()
            .fetch_optional(&mut **tx)
            .await
    }

    /// Run a scope started with [`Task::count_scope`]
    pub async fn count(mut self, pool: &PgPool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = self.query.build_query_as().fetch_one(pool).await?;
        Ok(count)
    }
}
