//! Storage seams used by the engine.
//!
//! The engine talks to persistence only through these traits, so it can run
//! against Postgres ([`postgres::PgStore`]) or entirely in memory
//! ([`memory::MemoryStore`], used by the test suite).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db::DbError;
use uuid::Uuid;

use crate::models::{
    ActionExecution, Connection, DataMap, ExecutionStatus, Workflow, WorkflowExecution,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Read access to workflow aggregates.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Load a workflow with its actions (ascending position) and mappings.
    ///
    /// Returns `DbError::NotFound` if no such workflow exists.
    async fn load_workflow(&self, id: Uuid) -> Result<Workflow, DbError>;
}

/// Append-only execution history.
#[async_trait]
pub trait ExecutionStore: Send + Sync {
    /// Durably record a new `running` execution.
    async fn create_execution(
        &self,
        workflow_id: Uuid,
        trigger_payload: &str,
    ) -> Result<WorkflowExecution, DbError>;

    /// Move an execution to `completed` or `failed`. No-op on terminal rows.
    async fn finish_execution(
        &self,
        execution_id: Uuid,
        status: ExecutionStatus,
        error: Option<&str>,
    ) -> Result<(), DbError>;

    /// Record a `running` action execution with its computed input.
    async fn start_action(
        &self,
        execution_id: Uuid,
        action_id: Uuid,
        input: &DataMap,
    ) -> Result<ActionExecution, DbError>;

    /// Mark an action execution `completed`. Like `fail_action`, a no-op on
    /// terminal rows.
    async fn complete_action(&self, id: Uuid, output: &DataMap) -> Result<(), DbError>;

    async fn fail_action(&self, id: Uuid, error: &str) -> Result<(), DbError>;

    /// An execution with its action history in start order.
    async fn get_execution(&self, id: Uuid) -> Result<WorkflowExecution, DbError>;
}

/// Stored user connections.
#[async_trait]
pub trait ConnectionStore: Send + Sync {
    /// The most recently used active connection for `(user_id, service)`.
    async fn find_active_connection(
        &self,
        user_id: Uuid,
        service: &str,
    ) -> Result<Option<Connection>, DbError>;

    async fn touch_connection(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DbError>;
}
