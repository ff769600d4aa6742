//! Service provider registry: service name → provider.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use providers::ServiceProvider;
use tracing::{debug, warn};

use crate::EngineError;

/// Maps service names to registered [`ServiceProvider`]s.
///
/// Cheap to clone; clones share the same table. Registration normally happens
/// once at startup but is safe at any time.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<dyn ServiceProvider>>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under its declared service name.
    ///
    /// A later registration for the same name replaces the earlier one.
    pub fn register(&self, provider: Arc<dyn ServiceProvider>) {
        let service = provider.service().to_owned();
        let mut table = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if table.insert(service.clone(), provider).is_some() {
            warn!("provider for service '{service}' replaced");
        } else {
            debug!("registered provider for service '{service}'");
        }
    }

    pub fn get(&self, service: &str) -> Result<Arc<dyn ServiceProvider>, EngineError> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(service)
            .cloned()
            .ok_or_else(|| EngineError::ProviderNotFound(service.to_owned()))
    }

    /// Registered service names, sorted.
    pub fn services(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use providers::mock::{MockBehaviour, MockProvider};

    #[test]
    fn unknown_service_is_provider_not_found() {
        let registry = ProviderRegistry::new();
        assert!(matches!(
            registry.get("slack"),
            Err(EngineError::ProviderNotFound(name)) if name == "slack"
        ));
    }

    #[test]
    fn last_registration_wins() {
        let registry = ProviderRegistry::new();
        registry.register(Arc::new(MockProvider::new("slack")));
        registry.register(Arc::new(
            MockProvider::new("slack").with_action("post", MockBehaviour::Echo),
        ));

        let provider = registry.get("slack").unwrap();
        let actions = provider.action_handler().actions();
        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].id, "post");
        assert_eq!(registry.services(), vec!["slack"]);
    }

    #[test]
    fn clones_share_registrations() {
        let registry = ProviderRegistry::new();
        let handle = registry.clone();
        handle.register(Arc::new(MockProvider::new("jira")));
        assert!(registry.get("jira").is_ok());
    }
}
