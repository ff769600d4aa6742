//! Postgres-backed stores over the `db` repository functions.
//!
//! This is where persistence rows become domain models: status strings are
//! parsed and JSON blobs are checked to be objects.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db::models::{
    ActionExecutionRow, ConnectionRow, DataMappingRow, WorkflowActionRow, WorkflowExecutionRow,
    WorkflowRow,
};
use db::repository::{connections, executions, workflows};
use db::{DbError, DbPool};
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use super::{ConnectionStore, ExecutionStore, WorkflowStore};
use crate::models::{
    Action, ActionExecution, Connection, DataMap, DataMapping, ExecutionStatus, TriggerSpec,
    Workflow, WorkflowExecution,
};

#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowStore for PgStore {
    async fn load_workflow(&self, id: Uuid) -> Result<Workflow, DbError> {
        let row = workflows::get_workflow(&self.pool, id).await?;
        let actions = workflows::list_actions(&self.pool, id).await?;
        let mappings = workflows::list_mappings(&self.pool, id).await?;
        workflow_from_rows(row, actions, mappings)
    }
}

#[async_trait]
impl ExecutionStore for PgStore {
    async fn create_execution(
        &self,
        workflow_id: Uuid,
        trigger_payload: &str,
    ) -> Result<WorkflowExecution, DbError> {
        let row = executions::create_execution(&self.pool, workflow_id, trigger_payload).await?;
        execution_from_row(row, Vec::new())
    }

    async fn finish_execution(
        &self,
        execution_id: Uuid,
        status: ExecutionStatus,
        error: Option<&str>,
    ) -> Result<(), DbError> {
        if !executions::finish_execution(&self.pool, execution_id, status, error).await? {
            debug!("execution {execution_id} already terminal; {status} ignored");
        }
        Ok(())
    }

    async fn start_action(
        &self,
        execution_id: Uuid,
        action_id: Uuid,
        input: &DataMap,
    ) -> Result<ActionExecution, DbError> {
        let input = Value::Object(input.clone());
        let row = executions::insert_action_execution(&self.pool, execution_id, action_id, &input).await?;
        action_execution_from_row(row)
    }

    async fn complete_action(&self, id: Uuid, output: &DataMap) -> Result<(), DbError> {
        let output = Value::Object(output.clone());
        if !executions::complete_action_execution(&self.pool, id, &output).await? {
            debug!("action execution {id} missing or already terminal; completion ignored");
        }
        Ok(())
    }

    async fn fail_action(&self, id: Uuid, error: &str) -> Result<(), DbError> {
        if !executions::fail_action_execution(&self.pool, id, error).await? {
            debug!("action execution {id} missing or already terminal; failure ignored");
        }
        Ok(())
    }

    async fn get_execution(&self, id: Uuid) -> Result<WorkflowExecution, DbError> {
        let row = executions::get_execution(&self.pool, id).await?;
        let actions = executions::list_action_executions(&self.pool, id)
            .await?
            .into_iter()
            .map(action_execution_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        execution_from_row(row, actions)
    }
}

#[async_trait]
impl ConnectionStore for PgStore {
    async fn find_active_connection(
        &self,
        user_id: Uuid,
        service: &str,
    ) -> Result<Option<Connection>, DbError> {
        connections::find_active_connection(&self.pool, user_id, service)
            .await?
            .map(connection_from_row)
            .transpose()
    }

    async fn touch_connection(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DbError> {
        connections::touch_connection(&self.pool, id, at).await
    }
}

// ---------------------------------------------------------------------------
// Row → domain conversions
// ---------------------------------------------------------------------------

fn workflow_from_rows(
    row: WorkflowRow,
    actions: Vec<WorkflowActionRow>,
    mappings: Vec<DataMappingRow>,
) -> Result<Workflow, DbError> {
    Ok(Workflow {
        id: row.id,
        user_id: row.user_id,
        name: row.name,
        description: row.description,
        status: row.status.parse().map_err(DbError::Corrupt)?,
        trigger: TriggerSpec {
            service: row.trigger_service,
            trigger_id: row.trigger_id,
            config: row.trigger_config,
        },
        actions: actions
            .into_iter()
            .map(|a| Action {
                id: a.id,
                workflow_id: a.workflow_id,
                service: a.action_service,
                action_id: a.action_id,
                config: a.action_config,
                position: a.position,
            })
            .collect(),
        mappings: mappings
            .into_iter()
            .map(|m| DataMapping {
                source_service: m.source_service,
                source_field: m.source_field,
                target_service: m.target_service,
                target_field: m.target_field,
                transformer: m.transformer,
            })
            .collect(),
        created_at: row.created_at,
    })
}

fn execution_from_row(
    row: WorkflowExecutionRow,
    actions: Vec<ActionExecution>,
) -> Result<WorkflowExecution, DbError> {
    Ok(WorkflowExecution {
        id: row.id,
        workflow_id: row.workflow_id,
        status: row.status.parse().map_err(DbError::Corrupt)?,
        trigger_payload: row.trigger_data,
        started_at: row.started_at,
        completed_at: row.completed_at,
        error: row.error,
        actions,
    })
}

fn action_execution_from_row(row: ActionExecutionRow) -> Result<ActionExecution, DbError> {
    Ok(ActionExecution {
        id: row.id,
        execution_id: row.execution_id,
        action_id: row.action_id,
        status: row.status.parse().map_err(DbError::Corrupt)?,
        input: object("input_data", row.input_data)?,
        output: row.output_data.map(|v| object("output_data", v)).transpose()?,
        started_at: row.started_at,
        completed_at: row.completed_at,
        error: row.error,
    })
}

fn connection_from_row(row: ConnectionRow) -> Result<Connection, DbError> {
    Ok(Connection {
        id: row.id,
        user_id: row.user_id,
        service: row.service,
        auth_data: object("auth_data", row.auth_data)?,
        metadata: object("metadata", row.metadata)?,
        status: row.status.parse().map_err(DbError::Corrupt)?,
        last_used_at: row.last_used_at,
        created_at: row.created_at,
    })
}

/// `null` decodes as an empty map; any other non-object is corrupt.
fn object(column: &str, value: Value) -> Result<DataMap, DbError> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(DataMap::new()),
        other => Err(DbError::Corrupt(format!(
            "{column} must be a JSON object, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkflowStatus;
    use serde_json::json;

    fn workflow_row(status: &str) -> WorkflowRow {
        WorkflowRow {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "alerts".into(),
            description: String::new(),
            status: status.into(),
            trigger_service: "jira".into(),
            trigger_id: "issue_created".into(),
            trigger_config: json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn workflow_rows_become_an_aggregate() {
        let row = workflow_row("active");
        let action = WorkflowActionRow {
            id: Uuid::new_v4(),
            workflow_id: row.id,
            action_service: "slack".into(),
            action_id: "post_message".into(),
            action_config: json!({ "channel": "#ops" }),
            position: 1,
        };
        let mapping = DataMappingRow {
            id: 1,
            workflow_id: row.id,
            source_service: "jira".into(),
            source_field: "summary".into(),
            target_service: "slack".into(),
            target_field: "text".into(),
            transformer: None,
        };

        let wf = workflow_from_rows(row, vec![action], vec![mapping]).unwrap();
        assert_eq!(wf.status, WorkflowStatus::Active);
        assert_eq!(wf.trigger.service, "jira");
        assert_eq!(wf.actions[0].service, "slack");
        assert_eq!(wf.mappings[0].target_field, "text");
    }

    #[test]
    fn unknown_status_is_corrupt() {
        let result = workflow_from_rows(workflow_row("archived"), vec![], vec![]);
        assert!(matches!(result, Err(DbError::Corrupt(_))));
    }

    #[test]
    fn non_object_blob_is_corrupt() {
        assert!(object("input_data", json!([1])).is_err());
        assert!(object("input_data", Value::Null).unwrap().is_empty());
    }
}
