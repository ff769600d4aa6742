//! Engine-level error types.

use std::time::Duration;

use providers::ProviderError;
use thiserror::Error;
use uuid::Uuid;

use crate::models::WorkflowStatus;

/// Coarse classification of [`EngineError`]s, used by callers that only need
/// to know what went wrong (e.g. to pick an HTTP status).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidConfig,
    UnknownTransformer,
    TransformFailed,
    InvalidPayload,
    ConnectionUnavailable,
    ActionExecutionFailed,
    PersistenceFailed,
}

/// Errors produced by the workflow engine (validation + execution).
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Lookup errors ------

    #[error("workflow {0} not found")]
    WorkflowNotFound(Uuid),

    #[error("execution {0} not found")]
    ExecutionNotFound(Uuid),

    #[error("no provider registered for service '{0}'")]
    ProviderNotFound(String),

    // ------ Validation errors ------

    #[error("workflow {id} is {status}, not active")]
    WorkflowInactive { id: Uuid, status: WorkflowStatus },

    #[error("invalid config for trigger '{service}.{trigger_id}': {source}")]
    InvalidTriggerConfig {
        service: String,
        trigger_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("invalid config for action '{service}.{action_id}' at position {position}: {source}")]
    InvalidActionConfig {
        service: String,
        action_id: String,
        position: i32,
        #[source]
        source: ProviderError,
    },

    /// Two actions share the same position.
    #[error("duplicate action position {0}")]
    DuplicatePosition(i32),

    #[error("unknown transformer '{0}'")]
    UnknownTransformer(String),

    // ------ Execution errors ------

    #[error("transformer '{transformer}' failed on field '{field}': {reason}")]
    TransformFailed {
        transformer: String,
        field: String,
        reason: String,
    },

    /// The trigger payload is not a flat JSON object.
    #[error("invalid trigger payload: {0}")]
    InvalidTriggerPayload(String),

    #[error("no active connection for user {user_id} on service '{service}'")]
    NoActiveConnection { user_id: Uuid, service: String },

    #[error("connection {connection_id} rejected by '{service}': {source}")]
    ConnectionRejected {
        connection_id: Uuid,
        service: String,
        #[source]
        source: ProviderError,
    },

    #[error("action '{service}.{action_id}' failed: {source}")]
    ActionFailed {
        service: String,
        action_id: String,
        #[source]
        source: ProviderError,
    },

    #[error("action '{service}.{action_id}' timed out after {timeout:?}")]
    ActionTimedOut {
        service: String,
        action_id: String,
        timeout: Duration,
    },

    /// The provider panicked while running the action.
    #[error("action '{service}.{action_id}' panicked: {reason}")]
    ActionPanicked {
        service: String,
        action_id: String,
        reason: String,
    },

    /// The background pipeline task panicked or was aborted.
    #[error("execution task failed: {0}")]
    TaskFailed(String),

    /// Persistence error from the db crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WorkflowNotFound(_)
            | Self::ExecutionNotFound(_)
            | Self::ProviderNotFound(_)
            | Self::Database(db::DbError::NotFound) => ErrorKind::NotFound,

            Self::WorkflowInactive { .. }
            | Self::InvalidTriggerConfig { .. }
            | Self::InvalidActionConfig { .. }
            | Self::DuplicatePosition(_) => ErrorKind::InvalidConfig,

            Self::UnknownTransformer(_) => ErrorKind::UnknownTransformer,
            Self::TransformFailed { .. } => ErrorKind::TransformFailed,
            Self::InvalidTriggerPayload(_) => ErrorKind::InvalidPayload,

            Self::NoActiveConnection { .. } | Self::ConnectionRejected { .. } => {
                ErrorKind::ConnectionUnavailable
            }

            Self::ActionFailed { .. }
            | Self::ActionTimedOut { .. }
            | Self::ActionPanicked { .. }
            | Self::TaskFailed(_) => ErrorKind::ActionExecutionFailed,

            Self::Database(_) | Self::Serialization(_) => ErrorKind::PersistenceFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_errors_share_a_kind() {
        let missing = EngineError::NoActiveConnection {
            user_id: Uuid::nil(),
            service: "jira".into(),
        };
        let rejected = EngineError::ConnectionRejected {
            connection_id: Uuid::nil(),
            service: "jira".into(),
            source: ProviderError::Unauthorized("no token".into()),
        };
        assert_eq!(missing.kind(), ErrorKind::ConnectionUnavailable);
        assert_eq!(rejected.kind(), ErrorKind::ConnectionUnavailable);
    }

    #[test]
    fn db_not_found_is_not_found() {
        assert_eq!(EngineError::Database(db::DbError::NotFound).kind(), ErrorKind::NotFound);
        assert_eq!(
            EngineError::Database(db::DbError::Corrupt("x".into())).kind(),
            ErrorKind::PersistenceFailed
        );
    }

    #[test]
    fn provider_reason_is_part_of_the_message() {
        let err = EngineError::InvalidTriggerConfig {
            service: "jira".into(),
            trigger_id: "issue_created".into(),
            source: ProviderError::InvalidConfig("missing required field 'project'".into()),
        };
        assert!(err.to_string().contains("missing required field 'project'"));
    }

    #[test]
    fn task_and_panic_failures_are_action_failures() {
        let panicked = EngineError::ActionPanicked {
            service: "slack".into(),
            action_id: "post".into(),
            reason: "bug".into(),
        };
        assert_eq!(panicked.kind(), ErrorKind::ActionExecutionFailed);
        assert_eq!(
            EngineError::TaskFailed("aborted".into()).kind(),
            ErrorKind::ActionExecutionFailed
        );
    }
}
