use crate::common::{new_extraction_task, new_task, task_in_status, TEST_ORG};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use taskforge_core::config::PaginationConfig;
use taskforge_core::models::{
    NewTask, OrderBy, SortDirection, TaskFilter, TaskListQuery, TaskUpdate,
};
use taskforge_core::persistence::{InMemoryTaskRepository, TaskRepository};
use taskforge_core::state_machine::{InvalidTransitionKind, StateMachineError, TaskStatus};
use taskforge_core::TaskforgeError;

#[tokio::test]
async fn test_lifecycle_sets_timestamps_once() {
    let repo = InMemoryTaskRepository::new();
    let task = repo.create_task(new_extraction_task()).await.unwrap();
    let id = task.task_id.clone();

    assert!(id.starts_with("tsk_"));
    assert_eq!(task.status, TaskStatus::Created);
    assert!(task.queued_at.is_none());
    assert!(task.started_at.is_none());
    assert!(task.finished_at.is_none());

    let queued = repo
        .update_task(&id, Some(TEST_ORG), TaskUpdate::status(TaskStatus::Queued))
        .await
        .unwrap();
    assert!(queued.queued_at.is_some());

    let running = repo
        .update_task(&id, Some(TEST_ORG), TaskUpdate::status(TaskStatus::Running))
        .await
        .unwrap();
    assert_eq!(running.queued_at, queued.queued_at);
    assert!(running.started_at.is_some());
    assert!(running.finished_at.is_none());

    let completed = repo
        .update_task(
            &id,
            Some(TEST_ORG),
            TaskUpdate::completed(Some(json!({"price": 42}))),
        )
        .await
        .unwrap();
    assert_eq!(completed.status, TaskStatus::Completed);
    assert_eq!(completed.started_at, running.started_at);
    assert!(completed.finished_at.is_some());
    assert!(completed.modified_at >= running.modified_at);

    let output = completed.output();
    assert_eq!(output.extracted_information, Some(json!({"price": 42})));
    assert!(output.failure_reason.is_none());
}

#[tokio::test]
async fn test_missing_price_is_rejected_then_accepted() {
    let repo = InMemoryTaskRepository::new();
    let task = task_in_status(&repo, new_extraction_task(), TaskStatus::Running).await;

    let err = repo
        .update_task(&task.task_id, Some(TEST_ORG), TaskUpdate::completed(None))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TaskforgeError::StateMachine(StateMachineError::MissingExtractedInformation { .. })
    ));

    let stored = repo
        .get_task(&task.task_id, Some(TEST_ORG))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TaskStatus::Running);

    let done = repo
        .update_task(
            &task.task_id,
            Some(TEST_ORG),
            TaskUpdate::completed(Some(json!({"price": 42}))),
        )
        .await
        .unwrap();
    assert_eq!(done.status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_canceled_reconciliation_keeps_first_finish_time() {
    let repo = InMemoryTaskRepository::new();
    let canceled = task_in_status(&repo, new_task(), TaskStatus::Canceled).await;
    let finished_at = canceled.finished_at;
    assert!(finished_at.is_some());

    let err = repo
        .update_task(&canceled.task_id, Some(TEST_ORG), TaskUpdate::failed("x"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TaskforgeError::StateMachine(StateMachineError::InvalidTransition {
            kind: InvalidTransitionKind::AlreadyCanceled { .. },
            ..
        })
    ));

    let completed = repo
        .update_task(&canceled.task_id, Some(TEST_ORG), TaskUpdate::completed(None))
        .await
        .unwrap();
    assert_eq!(completed.status, TaskStatus::Completed);
    assert_eq!(completed.finished_at, finished_at);
}

#[tokio::test]
async fn test_organization_scoping() {
    let repo = InMemoryTaskRepository::new();
    let scoped = repo.create_task(new_task()).await.unwrap();
    let unscoped = repo
        .create_task(NewTask::new("https://example.com"))
        .await
        .unwrap();

    assert!(repo
        .get_task(&scoped.task_id, Some("o_other"))
        .await
        .unwrap()
        .is_none());
    assert!(repo.get_task(&unscoped.task_id, None).await.unwrap().is_some());

    let err = repo
        .update_task(
            &scoped.task_id,
            Some("o_other"),
            TaskUpdate::status(TaskStatus::Queued),
        )
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let ids = vec![
        scoped.task_id.clone(),
        unscoped.task_id.clone(),
        "tsk_missing".to_string(),
    ];
    let found = repo.get_tasks_by_ids(&ids, Some(TEST_ORG)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].task_id, scoped.task_id);
}

#[tokio::test]
async fn test_empty_update_is_rejected() {
    let repo = InMemoryTaskRepository::new();
    let task = repo.create_task(new_task()).await.unwrap();

    let err = repo
        .update_task(&task.task_id, Some(TEST_ORG), TaskUpdate::default())
        .await
        .unwrap_err();
    assert!(matches!(err, TaskforgeError::EmptyUpdate { .. }));
}

#[tokio::test]
async fn test_clear_failure_reason_allows_a_new_one() {
    let repo = InMemoryTaskRepository::new();
    let task = task_in_status(&repo, new_task(), TaskStatus::Running).await;

    repo.update_task(
        &task.task_id,
        Some(TEST_ORG),
        TaskUpdate::default().with_failure_reason("step failed"),
    )
    .await
    .unwrap();

    let err = repo
        .update_task(&task.task_id, Some(TEST_ORG), TaskUpdate::failed("retry failed"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        TaskforgeError::StateMachine(StateMachineError::FailureReasonAlreadySet { .. })
    ));

    let cleared = repo
        .clear_task_failure_reason(&task.task_id, Some(TEST_ORG))
        .await
        .unwrap();
    assert!(cleared.failure_reason.is_none());

    let failed = repo
        .update_task(&task.task_id, Some(TEST_ORG), TaskUpdate::failed("retry failed"))
        .await
        .unwrap();
    assert_eq!(failed.failure_reason.as_deref(), Some("retry failed"));

    let err = repo
        .clear_task_failure_reason("tsk_missing", Some(TEST_ORG))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_listing_pages_and_ordering() {
    let repo = InMemoryTaskRepository::new();
    for _ in 0..5 {
        repo.create_task(new_task()).await.unwrap();
    }
    repo.create_task(NewTask::new("https://example.com").with_organization("o_other"))
        .await
        .unwrap();

    let filter = TaskFilter::for_organization(TEST_ORG);
    let first = repo
        .get_tasks(&TaskListQuery::new(filter.clone()).page(1, 2))
        .await
        .unwrap();
    let second = repo
        .get_tasks(&TaskListQuery::new(filter.clone()).page(2, 2))
        .await
        .unwrap();
    let third = repo
        .get_tasks(&TaskListQuery::new(filter.clone()).page(3, 2))
        .await
        .unwrap();

    assert_eq!((first.len(), second.len(), third.len()), (2, 2, 1));
    let ids: HashSet<_> = first
        .iter()
        .chain(&second)
        .chain(&third)
        .map(|task| task.task_id.clone())
        .collect();
    assert_eq!(ids.len(), 5);

    let all_desc: Vec<_> = first.iter().chain(&second).chain(&third).collect();
    assert!(all_desc
        .windows(2)
        .all(|pair| pair[0].created_at >= pair[1].created_at));

    let asc = repo
        .get_tasks(
            &TaskListQuery::new(filter)
                .page(1, 10)
                .order(OrderBy::CreatedAt, SortDirection::Asc),
        )
        .await
        .unwrap();
    assert!(asc
        .windows(2)
        .all(|pair| pair[0].created_at <= pair[1].created_at));
}

#[tokio::test]
async fn test_default_listing_uses_configured_page_size() {
    let repo = InMemoryTaskRepository::with_pagination(PaginationConfig {
        default_page_size: 3,
        max_page_size: 20,
    });
    for _ in 0..5 {
        repo.create_task(new_task()).await.unwrap();
    }

    let query = repo.list_query(TaskFilter::for_organization(TEST_ORG));
    assert_eq!(query.page_size, 3);
    assert_eq!(repo.get_tasks(&query).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_repeated_ids_return_each_task_once() {
    let repo = InMemoryTaskRepository::new();
    let task = repo.create_task(new_task()).await.unwrap();

    let ids = vec![task.task_id.clone(), task.task_id.clone()];
    let found = repo.get_tasks_by_ids(&ids, Some(TEST_ORG)).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].task_id, task.task_id);
}

#[tokio::test]
async fn test_listing_rejects_bad_paging() {
    let repo = InMemoryTaskRepository::with_pagination(PaginationConfig {
        default_page_size: 10,
        max_page_size: 20,
    });

    let zero_page = TaskListQuery::default().page(0, 10);
    assert!(matches!(
        repo.get_tasks(&zero_page).await.unwrap_err(),
        TaskforgeError::InvalidInput(_)
    ));

    let oversized = TaskListQuery::default().page(1, 21);
    assert!(matches!(
        repo.get_tasks(&oversized).await.unwrap_err(),
        TaskforgeError::InvalidInput(_)
    ));
}

#[tokio::test]
async fn test_counts_by_status_and_workflow_run() {
    let repo = InMemoryTaskRepository::new();
    task_in_status(&repo, new_task(), TaskStatus::Running).await;
    task_in_status(&repo, new_task(), TaskStatus::Failed).await;
    task_in_status(&repo, new_task().with_workflow_run("wr_1"), TaskStatus::Queued).await;

    let org = TaskFilter::for_organization(TEST_ORG);
    assert_eq!(repo.get_tasks_count(&org).await.unwrap(), 3);

    let active = org
        .clone()
        .with_statuses([TaskStatus::Queued, TaskStatus::Running]);
    assert_eq!(repo.get_tasks_count(&active).await.unwrap(), 2);

    let standalone = TaskFilter {
        only_standalone_tasks: true,
        ..org.clone()
    };
    assert_eq!(repo.get_tasks_count(&standalone).await.unwrap(), 2);

    let in_run = TaskFilter {
        workflow_run_id: Some("wr_1".to_string()),
        ..org
    };
    assert_eq!(repo.get_tasks_count(&in_run).await.unwrap(), 1);
}

#[tokio::test]
async fn test_invalid_url_is_rejected_on_create() {
    let repo = InMemoryTaskRepository::new();
    let err = repo
        .create_task(NewTask::new("ftp://files.example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, TaskforgeError::InvalidInput(_)));
    assert!(repo.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_terminal_updates_have_one_winner() {
    for _ in 0..20 {
        let repo = Arc::new(InMemoryTaskRepository::new());
        let task = task_in_status(repo.as_ref(), new_task(), TaskStatus::Running).await;

        let complete = {
            let repo = Arc::clone(&repo);
            let id = task.task_id.clone();
            tokio::spawn(async move {
                repo.update_task(&id, Some(TEST_ORG), TaskUpdate::completed(None))
                    .await
            })
        };
        let fail = {
            let repo = Arc::clone(&repo);
            let id = task.task_id.clone();
            tokio::spawn(async move {
                repo.update_task(&id, Some(TEST_ORG), TaskUpdate::failed("browser crashed"))
                    .await
            })
        };

        let (complete, fail) = tokio::join!(complete, fail);
        let results = [complete.unwrap(), fail.unwrap()];
        let winners = results.iter().filter(|result| result.is_ok()).count();
        assert_eq!(winners, 1);

        let loser = results.iter().find_map(|result| result.as_ref().err()).unwrap();
        assert!(matches!(
            loser,
            TaskforgeError::StateMachine(StateMachineError::InvalidTransition { .. })
        ));

        let stored = repo
            .get_task(&task.task_id, Some(TEST_ORG))
            .await
            .unwrap()
            .unwrap();
        assert!(stored.is_final());
    }
}
