use super::{prepare_update, validate_against, TaskRepository};
use crate::config::PaginationConfig;
use crate::error::{Result, TaskforgeError};
use crate::logging::log_task_operation;
use crate::models::task::now;
use crate::models::{NewTask, SortDirection, Task, TaskFilter, TaskListQuery, TaskUpdate};
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::HashSet;

/// In-process task store.
///
/// Status updates hold the DashMap shard lock for the whole
/// read-validate-write cycle, which serializes racing updates to the same
/// task. No lock is held across an `.await`.
#[derive(Debug, Default)]
pub struct InMemoryTaskRepository {
    tasks: DashMap<String, Task>,
    pagination: PaginationConfig,
}

impl InMemoryTaskRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pagination(pagination: PaginationConfig) -> Self {
        Self {
            tasks: DashMap::new(),
            pagination,
        }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    fn matching(&self, filter: &TaskFilter) -> Vec<Task> {
        self.tasks
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskRepository {
    fn pagination(&self) -> &PaginationConfig {
        &self.pagination
    }

    async fn create_task(&self, new_task: NewTask) -> Result<Task> {
        let task = new_task.sanitize()?.into_task(now());
        self.tasks.insert(task.task_id.clone(), task.clone());

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
        let task = self
            .tasks
            .get(task_id)
            .filter(|entry| entry.in_organization(organization_id))
            .map(|entry| entry.value().clone());

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
        let unique: HashSet<&String> = task_ids.iter().collect();
        Ok(unique
            .into_iter()
            .filter_map(|id| self.tasks.get(id))
            .filter(|entry| entry.in_organization(organization_id))
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get_tasks(&self, query: &TaskListQuery) -> Result<Vec<Task>> {
        query.validate(self.pagination.max_page_size)?;

        let mut tasks = self.matching(&query.filter);
        tasks.sort_by(|a, b| {
            let ordering = query
                .order_by
                .key(a)
                .cmp(&query.order_by.key(b))
                .then_with(|| a.task_id.cmp(&b.task_id));
            match query.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });

        let offset = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        Ok(tasks
            .into_iter()
            .skip(offset)
            .take(query.page_size as usize)
            .collect())
    }

    async fn get_tasks_count(&self, filter: &TaskFilter) -> Result<i64> {
        let count = self
            .tasks
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .count();
        Ok(i64::try_from(count).unwrap_or(i64::MAX))
    }

    async fn update_task(
        &self,
        task_id: &str,
        organization_id: Option<&str>,
        update: TaskUpdate,
    ) -> Result<Task> {
        let update = prepare_update(task_id, update)?;

        let mut entry = self
            .tasks
            .get_mut(task_id)
            .filter(|entry| entry.in_organization(organization_id))
            .ok_or_else(|| TaskforgeError::task_not_found(task_id))?;

        let from_status = entry.status;
        validate_against(&entry, &update)?;
        entry.apply_update(update, now());

        tracing::info!(
            task_id = %task_id,
            from_status = %from_status,
            to_status = %entry.status,
            "Updated task"
        );
        Ok(entry.value().clone())
    }

    async fn clear_task_failure_reason(
        &self,
        task_id: &str,
        organization_id: Option<&str>,
    ) -> Result<Task> {
        let mut entry = self
            .tasks
            .get_mut(task_id)
            .filter(|entry| entry.in_organization(organization_id))
            .ok_or_else(|| TaskforgeError::task_not_found(task_id))?;

        entry.failure_reason = None;
        entry.modified_at = now();
        Ok(entry.value().clone())
    }
}
