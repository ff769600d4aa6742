//! Built-in `http` provider.
//!
//! Offers a `webhook` trigger (no config) and a `post_json` action that posts
//! the mapped input as a JSON body to `config.url`. A `token` in the
//! connection's `auth_data` is sent as a bearer token.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::{
    ActionHandler, AuthHandler, Capability, ConfigSchema, Connection, DataMap, ProviderError,
    ServiceProvider, TriggerHandler,
};

pub const SERVICE: &str = "http";

pub struct HttpProvider {
    client: reqwest::Client,
}

impl HttpProvider {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthHandler for HttpProvider {
    fn check_connection(&self, connection: &Connection) -> Result<(), ProviderError> {
        match connection.auth_data.get("token") {
            None | Some(Value::String(_)) => Ok(()),
            Some(_) => Err(ProviderError::Unauthorized("'token' must be a string".into())),
        }
    }
}

impl TriggerHandler for HttpProvider {
    fn triggers(&self) -> Vec<Capability> {
        vec![Capability::new(
            "webhook",
            "Inbound JSON request",
            ConfigSchema::empty(),
        )]
    }
}

#[async_trait]
impl ActionHandler for HttpProvider {
    fn actions(&self) -> Vec<Capability> {
        vec![Capability::new(
            "post_json",
            "POST the step input as JSON to `url`",
            ConfigSchema::requiring(&["url"]),
        )]
    }

    async fn execute(
        &self,
        connection: &Connection,
        action_id: &str,
        config: &Value,
        input: DataMap,
    ) -> Result<DataMap, ProviderError> {
        if action_id != "post_json" {
            return Err(ProviderError::Unsupported { kind: "action", id: action_id.to_owned() });
        }
        let url = config
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::InvalidConfig("missing required field 'url'".into()))?;

        let mut request = self.client.post(url).json(&input);
        if let Some(token) = connection.auth_str("token") {
            request = request.bearer_auth(token);
        }

        debug!("POST {url} ({} fields)", input.len());
        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Request(format!("{url} responded with {status}")));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProviderError::Request(e.to_string()))?;
        Ok(into_output(status.as_u16(), &body))
    }
}

impl ServiceProvider for HttpProvider {
    fn service(&self) -> &str {
        SERVICE
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

/// JSON objects pass through; anything else lands under `body`.
fn into_output(status: u16, body: &[u8]) -> DataMap {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            let mut out = DataMap::new();
            out.insert("status".into(), status.into());
            out.insert("body".into(), other);
            out
        }
        Err(_) => {
            let mut out = DataMap::new();
            out.insert("status".into(), status.into());
            if !body.is_empty() {
                out.insert("body".into(), String::from_utf8_lossy(body).into_owned().into());
            }
            out
        }
    }
}
