//! Execution and action-execution repository functions.
//!
//! Terminal transitions are guarded in SQL: an update only applies while the
//! row is still `pending` or `running`, so a finished row is never rewritten.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    DbError,
    models::{ActionExecutionRow, ExecutionStatus, WorkflowExecutionRow},
};

// ---------------------------------------------------------------------------
// workflow_executions
// ---------------------------------------------------------------------------

/// Insert a new workflow execution in `running` status inside its own
/// transaction. Once this returns the row is durable.
pub async fn create_execution(
    pool: &PgPool,
    workflow_id: Uuid,
    trigger_data: &str,
) -> Result<WorkflowExecutionRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let mut tx = pool.begin().await?;
    let row = sqlx::query_as::<_, WorkflowExecutionRow>(
        r#"
        INSERT INTO workflow_executions (id, workflow_id, status, trigger_data, started_at)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, workflow_id, status, trigger_data, started_at, completed_at, error
        "#,
    )
    .bind(id)
    .bind(workflow_id)
    .bind(ExecutionStatus::Running.as_str())
    .bind(trigger_data)
    .bind(now)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    Ok(row)
}

/// Move a workflow execution to a terminal status.
///
/// Returns `false` if the row was already terminal (nothing changed).
pub async fn finish_execution(
    pool: &PgPool,
    execution_id: Uuid,
    status: ExecutionStatus,
    error: Option<&str>,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        r#"
        UPDATE workflow_executions
        SET status = $1, completed_at = $2, error = $3
        WHERE id = $4 AND status IN ('pending', 'running')
        "#,
    )
    .bind(status.as_str())
    .bind(Utc::now())
    .bind(error)
    .bind(execution_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

pub async fn get_execution(pool: &PgPool, execution_id: Uuid) -> Result<WorkflowExecutionRow, DbError> {
    let row = sqlx::query_as::<_, WorkflowExecutionRow>(
        r#"
        SELECT id, workflow_id, status, trigger_data, started_at, completed_at, error
        FROM workflow_executions
        WHERE id = $1
        "#,
    )
    .bind(execution_id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

// ---------------------------------------------------------------------------
// workflow_action_executions
// ---------------------------------------------------------------------------

/// Record that an action has started with the given input.
pub async fn insert_action_execution(
    pool: &PgPool,
    execution_id: Uuid,
    action_id: Uuid,
    input: &serde_json::Value,
) -> Result<ActionExecutionRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    let row = sqlx::query_as::<_, ActionExecutionRow>(
        r#"
        INSERT INTO workflow_action_executions
            (id, execution_id, action_id, status, input_data, started_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, execution_id, action_id, status, input_data, output_data,
                  started_at, completed_at, error
        "#,
    )
    .bind(id)
    .bind(execution_id)
    .bind(action_id)
    .bind(ExecutionStatus::Running.as_str())
    .bind(input)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Mark an action execution `completed` with its output.
pub async fn complete_action_execution(
    pool: &PgPool,
    id: Uuid,
    output: &serde_json::Value,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        r#"
        UPDATE workflow_action_executions
        SET status = 'completed', output_data = $1, completed_at = $2
        WHERE id = $3 AND status IN ('pending', 'running')
        "#,
    )
    .bind(output)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Mark an action execution `failed` with an error message.
pub async fn fail_action_execution(pool: &PgPool, id: Uuid, error: &str) -> Result<bool, DbError> {
    let result = sqlx::query(
        r#"
        UPDATE workflow_action_executions
        SET status = 'failed', error = $1, completed_at = $2
        WHERE id = $3 AND status IN ('pending', 'running')
        "#,
    )
    .bind(error)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// All action executions of one workflow execution, in the order they started.
pub async fn list_action_executions(
    pool: &PgPool,
    execution_id: Uuid,
) -> Result<Vec<ActionExecutionRow>, DbError> {
    let rows = sqlx::query_as::<_, ActionExecutionRow>(
        r#"
        SELECT id, execution_id, action_id, status, input_data, output_data,
               started_at, completed_at, error
        FROM workflow_action_executions
        WHERE execution_id = $1
        ORDER BY seq ASC
        "#,
    )
    .bind(execution_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
