//! `MockProvider`: a test double for `ServiceProvider`.
//!
//! Useful in unit and integration tests where a real integration is either
//! unavailable or irrelevant.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::{
    ActionHandler, AuthHandler, Capability, ConfigSchema, Connection, DataMap, ProviderError,
    ServiceProvider, TriggerHandler,
};

/// Behaviour injected into a mock action at construction time.
#[derive(Debug, Clone)]
pub enum MockBehaviour {
    /// Return a specific payload.
    ReturnValue(DataMap),
    /// Return the input unchanged.
    Echo,
    /// Fail with a `Request` error.
    Fail(String),
    /// Sleep before returning an empty payload.
    Hang(Duration),
    /// Panic with the given message, as a buggy integration would.
    Panic(String),
}

/// One recorded `execute` call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub action_id: String,
    pub connection_id: uuid::Uuid,
    pub input: DataMap,
}

struct MockAction {
    capability: Capability,
    behaviour: MockBehaviour,
}

/// A mock provider that records every action call it receives and returns a
/// programmer-specified result per action id.
pub struct MockProvider {
    service: String,
    triggers: Vec<Capability>,
    actions: HashMap<String, MockAction>,
    /// Credential key every connection must carry, if any.
    required_credential: Option<String>,
    /// All calls seen by this provider (in call order).
    pub calls: Arc<Mutex<Vec<MockCall>>>,
}

impl MockProvider {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            triggers: Vec::new(),
            actions: HashMap::new(),
            required_credential: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Declare a trigger accepting configs matching `schema`.
    pub fn with_trigger(mut self, id: &'static str, schema: ConfigSchema) -> Self {
        self.triggers.push(Capability::new(id, "mock trigger", schema));
        self
    }

    /// Declare an action with no config requirements.
    pub fn with_action(self, id: &'static str, behaviour: MockBehaviour) -> Self {
        self.with_action_schema(id, ConfigSchema::empty(), behaviour)
    }

    pub fn with_action_schema(
        mut self,
        id: &'static str,
        schema: ConfigSchema,
        behaviour: MockBehaviour,
    ) -> Self {
        self.actions.insert(
            id.to_owned(),
            MockAction {
                capability: Capability::new(id, "mock action", schema),
                behaviour,
            },
        );
        self
    }

    /// Reject connections whose `auth_data` lacks `key`.
    pub fn requiring_credential(mut self, key: impl Into<String>) -> Self {
        self.required_credential = Some(key.into());
        self
    }

    /// Number of times any action of this provider has been executed.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Inputs received so far, in call order.
    pub fn inputs(&self) -> Vec<DataMap> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).iter().map(|c| c.input.clone()).collect()
    }
}

impl AuthHandler for MockProvider {
    fn check_connection(&self, connection: &Connection) -> Result<(), ProviderError> {
        match &self.required_credential {
            Some(key) if connection.auth_str(key).is_none() => Err(ProviderError::Unauthorized(
                format!("connection has no '{key}' credential"),
            )),
            _ => Ok(()),
        }
    }
}

impl TriggerHandler for MockProvider {
    fn triggers(&self) -> Vec<Capability> {
        self.triggers.clone()
    }
}

#[async_trait]
impl ActionHandler for MockProvider {
    fn actions(&self) -> Vec<Capability> {
        self.actions.values().map(|a| a.capability.clone()).collect()
    }

    async fn execute(
        &self,
        connection: &Connection,
        action_id: &str,
        _config: &Value,
        input: DataMap,
    ) -> Result<DataMap, ProviderError> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner).push(MockCall {
            action_id: action_id.to_owned(),
            connection_id: connection.id,
            input: input.clone(),
        });

        let action = self.actions.get(action_id).ok_or_else(|| ProviderError::Unsupported {
            kind: "action",
            id: action_id.to_owned(),
        })?;

        match &action.behaviour {
            MockBehaviour::ReturnValue(v) => Ok(v.clone()),
            MockBehaviour::Echo => Ok(input),
            MockBehaviour::Fail(msg) => Err(ProviderError::Request(msg.clone())),
            MockBehaviour::Hang(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(DataMap::new())
            }
            MockBehaviour::Panic(msg) => panic!("{msg}"),
        }
    }
}

impl ServiceProvider for MockProvider {
    fn service(&self) -> &str {
        &self.service
    }

    fn auth_handler(&self) -> &dyn AuthHandler {
        self
    }

    fn trigger_handler(&self) -> &dyn TriggerHandler {
        self
    }

    fn action_handler(&self) -> &dyn ActionHandler {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(value: Value) -> DataMap {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn returning_action_records_call() {
        let provider = MockProvider::new("jira")
            .with_action("create_issue", MockBehaviour::ReturnValue(data(json!({ "key": "T-1" }))));
        let conn = Connection::active(uuid::Uuid::new_v4(), "jira", DataMap::new());

        let out = provider
            .action_handler()
            .execute(&conn, "create_issue", &Value::Null, data(json!({ "summary": "x" })))
            .await
            .unwrap();

        assert_eq!(out["key"], "T-1");
        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.inputs()[0]["summary"], "x");
    }

    #[tokio::test]
    async fn failing_action_returns_request_error() {
        let provider = MockProvider::new("slack").with_action("post", MockBehaviour::Fail("boom".into()));
        let conn = Connection::active(uuid::Uuid::new_v4(), "slack", DataMap::new());

        let result = provider
            .action_handler()
            .execute(&conn, "post", &Value::Null, DataMap::new())
            .await;
        assert_eq!(result, Err(ProviderError::Request("boom".into())));
    }

    #[test]
    fn required_credential_is_checked() {
        let provider = MockProvider::new("slack").requiring_credential("token");
        let user = uuid::Uuid::new_v4();

        let bare = Connection::active(user, "slack", DataMap::new());
        assert!(matches!(
            provider.auth_handler().check_connection(&bare),
            Err(ProviderError::Unauthorized(_))
        ));

        let authed = Connection::active(user, "slack", data(json!({ "token": "xoxb" })));
        assert!(provider.auth_handler().check_connection(&authed).is_ok());
    }

    #[test]
    fn undeclared_trigger_fails_validation() {
        let provider = MockProvider::new("jira").with_trigger("issue_created", ConfigSchema::empty());
        assert!(provider.trigger_handler().validate_config("issue_created", &Value::Null).is_ok());
        assert!(provider.trigger_handler().validate_config("issue_deleted", &Value::Null).is_err());
    }
}
