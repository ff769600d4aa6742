//! The resolved credential handed to action handlers.
//!
//! Defined here (in the providers crate) so both the engine and individual
//! provider implementations can import it without a circular dependency.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Flat key/value payload exchanged between pipeline steps.
pub type DataMap = serde_json::Map<String, serde_json::Value>;

/// Lifecycle of a stored connection. Only `Active` connections are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    Active,
    Revoked,
    Expired,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConnectionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active"  => Ok(Self::Active),
            "revoked" => Ok(Self::Revoked),
            "expired" => Ok(Self::Expired),
            other     => Err(format!("unknown connection status: {other}")),
        }
    }
}

/// A user-owned credential for one service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Service name this credential is scoped to (e.g. `"jira"`).
    pub service: String,
    /// Opaque credential payload, interpreted only by the owning provider.
    pub auth_data: DataMap,
    pub metadata: DataMap,
    pub status: ConnectionStatus,
    /// Tie-break hint when several active connections exist.
    pub last_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Connection {
    /// Convenience constructor for an active connection with no usage history.
    pub fn active(user_id: Uuid, service: impl Into<String>, auth_data: DataMap) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            service: service.into(),
            auth_data,
            metadata: DataMap::new(),
            status: ConnectionStatus::Active,
            last_used_at: None,
            created_at: Utc::now(),
        }
    }

    /// String credential lookup, ignoring non-string values.
    pub fn auth_str(&self, key: &str) -> Option<&str> {
        self.auth_data.get(key).and_then(|v| v.as_str())
    }
}
