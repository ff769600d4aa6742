//! Workflow aggregate reads: definition, ordered actions, data mappings.

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    DbError,
    models::{DataMappingRow, WorkflowActionRow, WorkflowRow},
};

/// Fetch a single workflow by its primary key.
pub async fn get_workflow(pool: &PgPool, id: Uuid) -> Result<WorkflowRow, DbError> {
    let row = sqlx::query_as::<_, WorkflowRow>(
        r#"
        SELECT id, user_id, name, description, status,
               trigger_service, trigger_id, trigger_config,
               created_at, updated_at
        FROM workflows
        WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)?;

    Ok(row)
}

/// Return a workflow's actions in ascending execution order.
pub async fn list_actions(pool: &PgPool, workflow_id: Uuid) -> Result<Vec<WorkflowActionRow>, DbError> {
    let rows = sqlx::query_as::<_, WorkflowActionRow>(
        r#"
        SELECT id, workflow_id, action_service, action_id, action_config, position
        FROM workflow_actions
        WHERE workflow_id = $1
        ORDER BY position ASC
        "#,
    )
    .bind(workflow_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Return a workflow's data mappings in insertion order.
///
/// Order matters: later mappings overwrite earlier ones on the same target field.
pub async fn list_mappings(pool: &PgPool, workflow_id: Uuid) -> Result<Vec<DataMappingRow>, DbError> {
    let rows = sqlx::query_as::<_, DataMappingRow>(
        r#"
        SELECT id, workflow_id, source_service, source_field,
               target_service, target_field, transformer
        FROM workflow_data_mappings
        WHERE workflow_id = $1
        ORDER BY id ASC
        "#,
    )
    .bind(workflow_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
