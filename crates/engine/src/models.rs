//! Core domain models for the workflow engine.
//!
//! A [`Workflow`] is an aggregate: the definition row, its ordered
//! [`Action`]s and its [`DataMapping`]s. The engine only ever reads it;
//! creating and editing workflows happens outside this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

pub use db::models::ExecutionStatus;
pub use providers::{Connection, ConnectionStatus, DataMap};

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Active,
    Disabled,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active   => "active",
            Self::Disabled => "disabled",
        }
    }
}

impl Default for WorkflowStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl std::fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for WorkflowStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active"   => Ok(Self::Active),
            "disabled" => Ok(Self::Disabled),
            other      => Err(format!("unknown workflow status: {other}")),
        }
    }
}

/// The event that starts a workflow. `config` is interpreted by the
/// trigger's provider only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerSpec {
    pub service: String,
    pub trigger_id: String,
    #[serde(default)]
    pub config: Value,
}

/// A single step in the workflow pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub workflow_id: Uuid,
    /// Service whose provider runs this action.
    pub service: String,
    /// Provider-specific action identifier (e.g. `post_message`).
    pub action_id: String,
    #[serde(default)]
    pub config: Value,
    /// Execution order; unique within the workflow, ascending.
    pub position: i32,
}

/// Projects one field of a source service's data onto a target field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMapping {
    pub source_service: String,
    pub source_field: String,
    pub target_service: String,
    pub target_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformer: Option<String>,
}

impl DataMapping {
    pub fn new(
        source_service: impl Into<String>,
        source_field: impl Into<String>,
        target_service: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self {
            source_service: source_service.into(),
            source_field: source_field.into(),
            target_service: target_service.into(),
            target_field: target_field.into(),
            transformer: None,
        }
    }

    /// Route the value through the named transformer.
    pub fn through(mut self, transformer: impl Into<String>) -> Self {
        self.transformer = Some(transformer.into());
        self
    }

    pub fn applies_to(&self, source_service: &str, target_service: &str) -> bool {
        self.source_service == source_service && self.target_service == target_service
    }
}

/// A complete workflow aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: WorkflowStatus,
    pub trigger: TriggerSpec,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub mappings: Vec<DataMapping>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Workflow {
    /// Convenience constructor for an active workflow with no actions yet.
    pub fn new(
        user_id: Uuid,
        name: impl Into<String>,
        trigger_service: impl Into<String>,
        trigger_id: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            description: String::new(),
            status: WorkflowStatus::Active,
            trigger: TriggerSpec {
                service: trigger_service.into(),
                trigger_id: trigger_id.into(),
                config: Value::Null,
            },
            actions: Vec::new(),
            mappings: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Append an action after the current last position.
    pub fn with_action(
        mut self,
        service: impl Into<String>,
        action_id: impl Into<String>,
        config: Value,
    ) -> Self {
        let position = self.actions.iter().map(|a| a.position).max().unwrap_or(0) + 1;
        self.actions.push(Action {
            id: Uuid::new_v4(),
            workflow_id: self.id,
            service: service.into(),
            action_id: action_id.into(),
            config,
            position,
        });
        self
    }

    pub fn with_mapping(mut self, mapping: DataMapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Actions sorted by ascending `position`.
    pub fn ordered_actions(&self) -> Vec<&Action> {
        let mut actions: Vec<&Action> = self.actions.iter().collect();
        actions.sort_by_key(|a| a.position);
        actions
    }
}

// ---------------------------------------------------------------------------
// Executions
// ---------------------------------------------------------------------------

/// One run of one action within a workflow execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExecution {
    pub id: Uuid,
    pub execution_id: Uuid,
    /// The [`Action`] this run belongs to.
    pub action_id: Uuid,
    pub status: ExecutionStatus,
    pub input: DataMap,
    pub output: Option<DataMap>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// One run of a workflow, with its action history in start order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowExecution {
    pub id: Uuid,
    pub workflow_id: Uuid,
    pub status: ExecutionStatus,
    /// Trigger payload exactly as received.
    pub trigger_payload: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    #[serde(default)]
    pub actions: Vec<ActionExecution>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn with_action_assigns_increasing_positions() {
        let wf = Workflow::new(Uuid::new_v4(), "wf", "jira", "issue_created")
            .with_action("slack", "post_message", Value::Null)
            .with_action("jira", "comment", Value::Null);

        let positions: Vec<i32> = wf.actions.iter().map(|a| a.position).collect();
        assert_eq!(positions, vec![1, 2]);
        assert!(wf.actions.iter().all(|a| a.workflow_id == wf.id));
    }

    #[test]
    fn ordered_actions_sorts_by_position() {
        let mut wf = Workflow::new(Uuid::new_v4(), "wf", "jira", "issue_created")
            .with_action("a", "x", Value::Null)
            .with_action("b", "y", Value::Null);
        wf.actions[0].position = 10;

        let order: Vec<&str> = wf.ordered_actions().iter().map(|a| a.service.as_str()).collect();
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn workflow_definition_deserialises_with_defaults() {
        let wf: Workflow = serde_json::from_value(json!({
            "user_id": Uuid::nil(),
            "name": "alerts",
            "trigger": { "service": "jira", "trigger_id": "issue_created" },
            "actions": [
                { "service": "slack", "action_id": "post_message", "position": 1,
                  "config": { "channel": "#ops" } }
            ],
            "mappings": [
                { "source_service": "jira", "source_field": "summary",
                  "target_service": "slack", "target_field": "text" }
            ]
        }))
        .unwrap();

        assert_eq!(wf.status, WorkflowStatus::Active);
        assert_eq!(wf.trigger.config, Value::Null);
        assert_eq!(wf.actions[0].config["channel"], "#ops");
        assert_eq!(wf.mappings[0].transformer, None);
    }
}
