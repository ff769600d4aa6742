//! Connection resolution for action steps.

use std::sync::Arc;

use chrono::Utc;
use tracing::warn;
use uuid::Uuid;

use crate::models::Connection;
use crate::store::ConnectionStore;
use crate::EngineError;

#[derive(Clone)]
pub struct ConnectionResolver {
    store: Arc<dyn ConnectionStore>,
}

impl ConnectionResolver {
    pub fn new(store: Arc<dyn ConnectionStore>) -> Self {
        Self { store }
    }

    /// Return the most recently used active connection for `(user_id, service)`
    /// and stamp its `last_used_at`.
    ///
    /// The stamp is advisory: if it cannot be written, the failure is logged
    /// and the connection is still returned.
    pub async fn resolve(&self, user_id: Uuid, service: &str) -> Result<Connection, EngineError> {
        let mut connection = self
            .store
            .find_active_connection(user_id, service)
            .await?
            .ok_or_else(|| EngineError::NoActiveConnection {
                user_id,
                service: service.to_owned(),
            })?;

        let now = Utc::now();
        match self.store.touch_connection(connection.id, now).await {
            Ok(()) => connection.last_used_at = Some(now),
            Err(e) => warn!(
                connection_id = %connection.id,
                "failed to record connection use: {e}"
            ),
        }

        Ok(connection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataMap;
    use crate::store::MemoryStore;
    use chrono::Duration;

    #[tokio::test]
    async fn missing_connection_is_no_active_connection() {
        let resolver = ConnectionResolver::new(Arc::new(MemoryStore::new()));
        let user = Uuid::new_v4();

        assert!(matches!(
            resolver.resolve(user, "jira").await,
            Err(EngineError::NoActiveConnection { service, .. }) if service == "jira"
        ));
    }

    #[tokio::test]
    async fn resolution_prefers_recent_and_updates_last_used() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let before = Utc::now();

        let mut stale = Connection::active(user, "slack", DataMap::new());
        stale.last_used_at = Some(before - Duration::days(3));
        let mut recent = Connection::active(user, "slack", DataMap::new());
        recent.last_used_at = Some(before - Duration::minutes(1));
        let recent_id = recent.id;
        store.insert_connection(stale);
        store.insert_connection(recent);

        let resolver = ConnectionResolver::new(store.clone());
        let conn = resolver.resolve(user, "slack").await.unwrap();

        assert_eq!(conn.id, recent_id);
        let stored = store.connection(recent_id).unwrap();
        assert!(stored.last_used_at.unwrap() >= before);
        assert_eq!(stored.last_used_at, conn.last_used_at);
    }

    #[tokio::test]
    async fn touch_failure_does_not_fail_resolution() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        let conn = Connection::active(user, "jira", DataMap::new());
        let id = conn.id;
        store.insert_connection(conn);
        store.fail_connection_touches(true);

        let resolved = ConnectionResolver::new(store.clone()).resolve(user, "jira").await.unwrap();
        assert_eq!(resolved.id, id);
        assert_eq!(store.connection(id).unwrap().last_used_at, None);
    }
}
