//! # Schema Bootstrap
//!
//! Creates the `tasks` table and its indexes if they are missing. Every
//! statement is idempotent, so calling [`ensure_schema`] on every start-up
//! is safe.

use sqlx::PgPool;

const CREATE_TASKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    task_id VARCHAR(64) PRIMARY KEY,
    organization_id VARCHAR(64),
    title TEXT,
    url TEXT NOT NULL,
    status VARCHAR(32) NOT NULL DEFAULT 'created',
    navigation_goal TEXT,
    data_extraction_goal TEXT,
    navigation_payload JSONB,
    extracted_information JSONB,
    extracted_information_schema JSONB,
    failure_reason TEXT,
    webhook_callback_url TEXT,
    webhook_failure_reason TEXT,
    workflow_run_id VARCHAR(64),
    task_order INTEGER,
    retry INTEGER,
    max_steps_per_run INTEGER,
    errors JSONB NOT NULL DEFAULT '[]'::jsonb,
    application TEXT,
    created_at TIMESTAMP NOT NULL DEFAULT NOW(),
    modified_at TIMESTAMP NOT NULL DEFAULT NOW(),
    queued_at TIMESTAMP,
    started_at TIMESTAMP,
    finished_at TIMESTAMP,
    CONSTRAINT tasks_status_check CHECK (status IN (
        'created', 'queued', 'running', 'timed_out',
        'failed', 'terminated', 'completed', 'canceled'
    ))
)
"#;

const CREATE_INDEXES: [&str; 3] = [
    "CREATE INDEX IF NOT EXISTS tasks_org_status_idx ON tasks (organization_id, status)",
    "CREATE INDEX IF NOT EXISTS tasks_org_created_at_idx ON tasks (organization_id, created_at)",
    "CREATE INDEX IF NOT EXISTS tasks_workflow_run_id_idx ON tasks (workflow_run_id)",
];

/// Create the task schema if it does not exist yet
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(CREATE_TASKS_TABLE).execute(&mut *tx).await?;
    for statement in CREATE_INDEXES {
        sqlx::query(statement).execute(&mut *tx).await?;
    }

    tx.commit().await?;
    tracing::debug!("Task schema ensured");
    Ok(())
}
