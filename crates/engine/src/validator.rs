//! Workflow validation: run this before creating any execution record.
//!
//! Rules enforced, in order:
//! 1. Action positions must be unique within the workflow.
//! 2. The trigger's provider must exist and accept the trigger config.
//! 3. Every action's provider must exist and accept the action config.
//! 4. Every transformer named by a data mapping must be registered.
//!
//! Validation is read-only; nothing is persisted.

use std::collections::HashSet;

use crate::models::Workflow;
use crate::registry::ProviderRegistry;
use crate::transform::TransformerRegistry;
use crate::EngineError;

/// Check `workflow` against the registered providers and transformers.
///
/// # Errors
/// - [`EngineError::DuplicatePosition`] if two actions share a position.
/// - [`EngineError::ProviderNotFound`] if a referenced service has no provider.
/// - [`EngineError::InvalidTriggerConfig`] / [`EngineError::InvalidActionConfig`]
///   carrying the provider's reason.
/// - [`EngineError::UnknownTransformer`] for an unregistered transformer.
pub fn validate_workflow(
    workflow: &Workflow,
    providers: &ProviderRegistry,
    transformers: &TransformerRegistry,
) -> Result<(), EngineError> {
    let mut positions = HashSet::new();
    for action in &workflow.actions {
        if !positions.insert(action.position) {
            return Err(EngineError::DuplicatePosition(action.position));
        }
    }

    let trigger = &workflow.trigger;
    providers
        .get(&trigger.service)?
        .trigger_handler()
        .validate_config(&trigger.trigger_id, &trigger.config)
        .map_err(|source| EngineError::InvalidTriggerConfig {
            service: trigger.service.clone(),
            trigger_id: trigger.trigger_id.clone(),
            source,
        })?;

    for action in workflow.ordered_actions() {
        providers
            .get(&action.service)?
            .action_handler()
            .validate_config(&action.action_id, &action.config)
            .map_err(|source| EngineError::InvalidActionConfig {
                service: action.service.clone(),
                action_id: action.action_id.clone(),
                position: action.position,
                source,
            })?;
    }

    for mapping in &workflow.mappings {
        if let Some(name) = &mapping.transformer {
            if !transformers.contains(name) {
                return Err(EngineError::UnknownTransformer(name.clone()));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataMapping;
    use providers::mock::{MockBehaviour, MockProvider};
    use providers::ConfigSchema;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use uuid::Uuid;

    fn registries() -> (ProviderRegistry, TransformerRegistry) {
        let providers = ProviderRegistry::new();
        providers.register(Arc::new(
            MockProvider::new("jira").with_trigger("issue_created", ConfigSchema::requiring(&["project"])),
        ));
        providers.register(Arc::new(MockProvider::new("slack").with_action_schema(
            "post_message",
            ConfigSchema::requiring(&["channel"]),
            MockBehaviour::Echo,
        )));
        (providers, TransformerRegistry::with_builtins())
    }

    fn valid_workflow() -> Workflow {
        let mut wf = Workflow::new(Uuid::new_v4(), "alerts", "jira", "issue_created")
            .with_action("slack", "post_message", json!({ "channel": "#ops" }))
            .with_mapping(DataMapping::new("jira", "summary", "slack", "text").through("trim"));
        wf.trigger.config = json!({ "project": "OPS" });
        wf
    }

    #[test]
    fn valid_workflow_passes() {
        let (p, t) = registries();
        assert!(validate_workflow(&valid_workflow(), &p, &t).is_ok());
    }

    #[test]
    fn bad_trigger_config_is_rejected() {
        let (p, t) = registries();
        let mut wf = valid_workflow();
        wf.trigger.config = Value::Null;

        assert!(matches!(
            validate_workflow(&wf, &p, &t),
            Err(EngineError::InvalidTriggerConfig { service, .. }) if service == "jira"
        ));
    }

    #[test]
    fn bad_action_config_is_rejected() {
        let (p, t) = registries();
        let mut wf = valid_workflow();
        wf.actions[0].config = json!({});

        assert!(matches!(
            validate_workflow(&wf, &p, &t),
            Err(EngineError::InvalidActionConfig { position: 1, .. })
        ));
    }

    #[test]
    fn unsupported_action_id_is_rejected() {
        let (p, t) = registries();
        let mut wf = valid_workflow();
        wf.actions[0].action_id = "delete_channel".into();

        assert!(matches!(
            validate_workflow(&wf, &p, &t),
            Err(EngineError::InvalidActionConfig { .. })
        ));
    }

    #[test]
    fn unregistered_service_is_provider_not_found() {
        let (p, t) = registries();
        let wf = valid_workflow().with_action("gmail", "send", Value::Null);

        assert!(matches!(
            validate_workflow(&wf, &p, &t),
            Err(EngineError::ProviderNotFound(name)) if name == "gmail"
        ));
    }

    #[test]
    fn unknown_transformer_is_rejected() {
        let (p, t) = registries();
        let wf = valid_workflow()
            .with_mapping(DataMapping::new("jira", "key", "slack", "ref").through("shout"));

        assert!(matches!(
            validate_workflow(&wf, &p, &t),
            Err(EngineError::UnknownTransformer(name)) if name == "shout"
        ));
    }

    #[test]
    fn duplicate_position_is_rejected() {
        let (p, t) = registries();
        let mut wf = valid_workflow().with_action("slack", "post_message", json!({ "channel": "#b" }));
        wf.actions[1].position = wf.actions[0].position;

        assert!(matches!(
            validate_workflow(&wf, &p, &t),
            Err(EngineError::DuplicatePosition(1))
        ));
    }
}
