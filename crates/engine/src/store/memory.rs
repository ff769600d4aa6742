//! In-process store implementing every storage trait.
//!
//! Mirrors the Postgres semantics the engine relies on: terminal rows are
//! never rewritten, action history keeps start order, and connection lookup
//! prefers the most recently used active connection.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use db::DbError;
use uuid::Uuid;

use super::{ConnectionStore, ExecutionStore, WorkflowStore};
use crate::models::{
    ActionExecution, Connection, ConnectionStatus, DataMap, ExecutionStatus, Workflow,
    WorkflowExecution,
};

#[derive(Default)]
struct State {
    workflows: HashMap<Uuid, Workflow>,
    executions: HashMap<Uuid, WorkflowExecution>,
    connections: Vec<Connection>,
    fail_touch: bool,
    /// 1-based `start_action` / `complete_action` calls that should fail.
    fail_start_on: Option<usize>,
    fail_complete_on: Option<usize>,
    starts: usize,
    completes: usize,
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_workflow(&self, workflow: Workflow) {
        self.lock().workflows.insert(workflow.id, workflow);
    }

    pub fn insert_connection(&self, connection: Connection) {
        self.lock().connections.push(connection);
    }

    /// Snapshot of a stored connection.
    pub fn connection(&self, id: Uuid) -> Option<Connection> {
        self.lock().connections.iter().find(|c| c.id == id).cloned()
    }

    /// Number of executions recorded for `workflow_id`.
    pub fn execution_count(&self, workflow_id: Uuid) -> usize {
        self.lock()
            .executions
            .values()
            .filter(|e| e.workflow_id == workflow_id)
            .count()
    }

    /// Make every `touch_connection` call fail.
    pub fn fail_connection_touches(&self, fail: bool) {
        self.lock().fail_touch = fail;
    }

    /// Make the `call`-th `start_action` (1-based) fail.
    pub fn fail_action_start_on(&self, call: usize) {
        self.lock().fail_start_on = Some(call);
    }

    /// Make the `call`-th `complete_action` (1-based) fail.
    pub fn fail_action_completion_on(&self, call: usize) {
        self.lock().fail_complete_on = Some(call);
    }
}

fn unavailable() -> DbError {
    DbError::Sqlx(sqlx::Error::PoolClosed)
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn load_workflow(&self, id: Uuid) -> Result<Workflow, DbError> {
        let mut workflow = self.lock().workflows.get(&id).cloned().ok_or(DbError::NotFound)?;
        workflow.actions.sort_by_key(|a| a.position);
        Ok(workflow)
    }
}

#[async_trait]
impl ExecutionStore for MemoryStore {
    async fn create_execution(
        &self,
        workflow_id: Uuid,
        trigger_payload: &str,
    ) -> Result<WorkflowExecution, DbError> {
        let execution = WorkflowExecution {
            id: Uuid::new_v4(),
            workflow_id,
            status: ExecutionStatus::Running,
            trigger_payload: trigger_payload.to_owned(),
            started_at: Utc::now(),
            completed_at: None,
            error: None,
            actions: Vec::new(),
        };
        self.lock().executions.insert(execution.id, execution.clone());
        Ok(execution)
    }

    async fn finish_execution(
        &self,
        execution_id: Uuid,
        status: ExecutionStatus,
        error: Option<&str>,
    ) -> Result<(), DbError> {
        let mut state = self.lock();
        let execution = state.executions.get_mut(&execution_id).ok_or(DbError::NotFound)?;
        if !execution.status.is_terminal() {
            execution.status = status;
            execution.completed_at = Some(Utc::now());
            execution.error = error.map(str::to_owned);
        }
        Ok(())
    }

    async fn start_action(
        &self,
        execution_id: Uuid,
        action_id: Uuid,
        input: &DataMap,
    ) -> Result<ActionExecution, DbError> {
        let record = ActionExecution {
            id: Uuid::new_v4(),
            execution_id,
            action_id,
            status: ExecutionStatus::Running,
            input: input.clone(),
            output: None,
            started_at: Utc::now(),
            completed_at: None,
            error: None,
        };
        let mut state = self.lock();
        state.starts += 1;
        if state.fail_start_on == Some(state.starts) {
            return Err(unavailable());
        }
        let execution = state.executions.get_mut(&execution_id).ok_or(DbError::NotFound)?;
        execution.actions.push(record.clone());
        Ok(record)
    }

    async fn complete_action(&self, id: Uuid, output: &DataMap) -> Result<(), DbError> {
        {
            let mut state = self.lock();
            state.completes += 1;
            if state.fail_complete_on == Some(state.completes) {
                return Err(unavailable());
            }
        }
        self.update_action(id, |record| {
            record.status = ExecutionStatus::Completed;
            record.output = Some(output.clone());
        })
    }

    async fn fail_action(&self, id: Uuid, error: &str) -> Result<(), DbError> {
        self.update_action(id, |record| {
            record.status = ExecutionStatus::Failed;
            record.error = Some(error.to_owned());
        })
    }

    async fn get_execution(&self, id: Uuid) -> Result<WorkflowExecution, DbError> {
        self.lock().executions.get(&id).cloned().ok_or(DbError::NotFound)
    }
}

impl MemoryStore {
    fn update_action(
        &self,
        id: Uuid,
        apply: impl FnOnce(&mut ActionExecution),
    ) -> Result<(), DbError> {
        let mut state = self.lock();
        let record = state
            .executions
            .values_mut()
            .flat_map(|e| e.actions.iter_mut())
            .find(|a| a.id == id)
            .ok_or(DbError::NotFound)?;
        if !record.status.is_terminal() {
            apply(record);
            record.completed_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl ConnectionStore for MemoryStore {
    async fn find_active_connection(
        &self,
        user_id: Uuid,
        service: &str,
    ) -> Result<Option<Connection>, DbError> {
        // `None < Some(_)`, so never-used connections rank last.
        Ok(self
            .lock()
            .connections
            .iter()
            .filter(|c| {
                c.user_id == user_id && c.service == service && c.status == ConnectionStatus::Active
            })
            .max_by_key(|c| (c.last_used_at, c.created_at))
            .cloned())
    }

    async fn touch_connection(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), DbError> {
        let mut state = self.lock();
        if state.fail_touch {
            return Err(unavailable());
        }
        let connection = state
            .connections
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or(DbError::NotFound)?;
        connection.last_used_at = Some(at);
        Ok(())
    }
}
