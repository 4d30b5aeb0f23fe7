use super::{prepare_update, validate_against, TaskRepository};
use crate::config::PaginationConfig;
use crate::error::{Result, TaskforgeError};
use crate::logging::{log_database_operation, log_task_operation};
use crate::models::task::now;
use crate::models::{NewTask, Task, TaskFilter, TaskListQuery, TaskUpdate};
use crate::scopes::TASK_COLUMNS;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use std::time::Instant;

/// PostgreSQL-backed task repository.
///
/// Status updates run inside a transaction that locks the row with
/// `SELECT ... FOR UPDATE`; a concurrent update to the same task waits for
/// the lock and then validates against the committed status.
#[derive(Debug, Clone)]
pub struct PgTaskRepository {
    pool: PgPool,
    pagination: PaginationConfig,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            pagination: PaginationConfig::default(),
        }
    }

    pub fn with_pagination(pool: PgPool, pagination: PaginationConfig) -> Self {
        Self { pool, pagination }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TaskRepository for PgTaskRepository {
    fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    #[tracing::instrument(skip(self, new_task), fields(organization_id = new_task.organization_id.as_deref()))]
    async fn create_task(&self, new_task: NewTask) -> Result<Task> {
        let started = Instant::now();
        let row = new_task.sanitize()?.into_task(now());

        let sql = format!(
            "INSERT INTO tasks (
                task_id, organization_id, title, url, status, navigation_goal,
                data_extraction_goal, navigation_payload, extracted_information_schema,
                webhook_callback_url, workflow_run_id, task_order, retry, max_steps_per_run,
                errors, application, created_at, modified_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $17)
            RETURNING {TASK_COLUMNS}"
        );

        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(&row.task_id)
            .bind(&row.organization_id)
            .bind(&row.title)
            .bind(&row.url)
            .bind(row.status.as_str())
            .bind(&row.navigation_goal)
            .bind(&row.data_extraction_goal)
            .bind(&row.navigation_payload)
            .bind(&row.extracted_information_schema)
            .bind(&row.webhook_callback_url)
            .bind(&row.workflow_run_id)
            .bind(row.order)
            .bind(row.retry)
            .bind(row.max_steps_per_run)
            .bind(Json(&row.errors))
            .bind(&row.application)
            .bind(row.created_at)
            .fetch_one(&self.pool)
            .await?;

        log_database_operation(
            "insert",
            "tasks",
            Some(&task.task_id),
            "success",
            Some(started.elapsed().as_millis() as u64),
        );
        log_task_operation(
            "create",
            &task.task_id,
            task.organization_id.as_deref(),
            task.status.as_str(),
            None,
        );
        Ok(task)
    }

    async fn get_task(
        &self,
        task_id: &str,
        organization_id: Option<&str>,
    ) -> Result<Option<Task>> {
        let task = Task::scope()
            .with_task_id(task_id.to_string())
            .in_organization(organization_id.map(str::to_string))
            .first(&self.pool)
            .await?;

        if task.is_none() {
            tracing::info!(task_id = %task_id, organization_id = organization_id, "Task not found");
        }
        Ok(task)
    }

    async fn get_tasks_by_ids(
        &self,
        task_ids: &[String],
        organization_id: Option<&str>,
    ) -> Result<Vec<Task>> {
        if task_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(Task::scope()
            .with_task_ids(task_ids.to_vec())
            .in_organization(organization_id.map(str::to_string))
            .all(&self.pool)
            .await?)
    }

    async fn get_tasks(&self, query: &TaskListQuery) -> Result<Vec<Task>> {
        query.validate(self.pagination.max_page_size)?;

        Ok(Task::scope()
            .for_list_query(query)
            .all(&self.pool)
            .await?)
    }

    async fn get_tasks_count(&self, filter: &TaskFilter) -> Result<i64> {
        Ok(Task::count_scope().filtered(filter).count(&self.pool).await?)
    }

    #[tracing::instrument(skip(self, update), fields(to_status = ?update.status))]
    async fn update_task(
        &self,
        task_id: &str,
        organization_id: Option<&str>,
        update: TaskUpdate,
    ) -> Result<Task> {
        let started = Instant::now();
        let update = prepare_update(task_id, update)?;

        let mut tx = self.pool.begin().await?;

        let mut current = Task::scope()
            .with_task_id(task_id.to_string())
            .in_organization(organization_id.map(str::to_string))
            .for_update()
            .first_in(&mut tx)
            .await?
            .ok_or_else(|| TaskforgeError::task_not_found(task_id))?;

        let from_status = current.status;
        // Dropping `tx` on the error path rolls back and releases the row lock
        validate_against(&current, &update)?;
        current.apply_update(update, now());

        let sql = format!(
            "UPDATE tasks SET
                status = $2,
                extracted_information = $3,
                failure_reason = $4,
                webhook_failure_reason = $5,
                errors = $6,
                max_steps_per_run = $7,
                modified_at = $8,
                queued_at = $9,
                started_at = $10,
                finished_at = $11
             WHERE task_id = $1
             RETURNING {TASK_COLUMNS}"
        );

        let task = sqlx::query_as::<_, Task>(&sql)
            .bind(&current.task_id)
            .bind(current.status.as_str())
            .bind(&current.extracted_information)
            .bind(&current.failure_reason)
            .bind(&current.webhook_failure_reason)
            .bind(Json(&current.errors))
            .bind(current.max_steps_per_run)
            .bind(current.modified_at)
            .bind(current.queued_at)
            .bind(current.started_at)
            .bind(current.finished_at)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            task_id = %task.task_id,
            from_status = %from_status,
            to_status = %task.status,
            "Updated task"
        );
        log_database_operation(
            "update",
            "tasks",
            Some(&task.task_id),
            "success",
            Some(started.elapsed().as_millis() as u64),
        );
        Ok(task)
    }

    async fn clear_task_failure_reason(
        &self,
        task_id: &str,
        organization_id: Option<&str>,
    ) -> Result<Task> {
        let sql = format!(
            "UPDATE tasks SET failure_reason = NULL, modified_at = $3
             WHERE task_id = $1 AND organization_id IS NOT DISTINCT FROM $2
             RETURNING {TASK_COLUMNS}"
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(task_id)
            .bind(organization_id)
            .bind(now())
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| TaskforgeError::task_not_found(task_id))
    }
}
