//! The `ServiceProvider` trait and its three capability traits.

use async_trait::async_trait;
use serde_json::Value;

use crate::schema::check_capability;
use crate::{Capability, Connection, DataMap, ProviderError};

/// Credential checks for connections scoped to this provider's service.
pub trait AuthHandler: Send + Sync {
    /// Verify the stored credential carries what this provider needs.
    fn check_connection(&self, connection: &Connection) -> Result<(), ProviderError>;
}

/// Events this provider can start a workflow from.
pub trait TriggerHandler: Send + Sync {
    fn triggers(&self) -> Vec<Capability>;

    fn validate_config(&self, trigger_id: &str, config: &Value) -> Result<(), ProviderError> {
        check_capability("trigger", &self.triggers(), trigger_id, config)
    }
}

/// Operations this provider can perform as a pipeline step.
#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn actions(&self) -> Vec<Capability>;

    fn validate_config(&self, action_id: &str, config: &Value) -> Result<(), ProviderError> {
        check_capability("action", &self.actions(), action_id, config)
    }

    /// Run the action with the resolved connection and the mapped `input`,
    /// returning the data handed to the next step.
    async fn execute(
        &self,
        connection: &Connection,
        action_id: &str,
        config: &Value,
        input: DataMap,
    ) -> Result<DataMap, ProviderError>;
}

/// The integration for one external service.
///
/// Registered with the engine by [`ServiceProvider::service`] name.
pub trait ServiceProvider: Send + Sync {
    /// Service name used as the registry key (e.g. `"slack"`).
    fn service(&self) -> &str;

    fn auth_handler(&self) -> &dyn AuthHandler;

    fn trigger_handler(&self) -> &dyn TriggerHandler;

    fn action_handler(&self) -> &dyn ActionHandler;
}
