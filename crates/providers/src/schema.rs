//! Provider-declared config schemas.
//!
//! Trigger and action configs are opaque to the engine. Each provider
//! describes what it accepts through a [`ConfigSchema`] attached to a
//! [`Capability`], and the default `validate_config` implementations on the
//! handler traits check configs against it.

use serde_json::Value;

use crate::ProviderError;

/// Minimal structural contract for a config blob.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSchema {
    /// Keys that must be present (and non-null) in the config object.
    pub required: Vec<&'static str>,
    /// Keys that must hold a string when present.
    pub string_fields: Vec<&'static str>,
}

impl ConfigSchema {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn requiring(keys: &[&'static str]) -> Self {
        Self {
            required: keys.to_vec(),
            string_fields: keys.to_vec(),
        }
    }

    /// Check `config` against this schema.
    ///
    /// A `null` config is accepted only when nothing is required.
    pub fn check(&self, config: &Value) -> Result<(), ProviderError> {
        let obj = match config {
            Value::Object(obj) => obj,
            Value::Null if self.required.is_empty() => return Ok(()),
            Value::Null => {
                return Err(ProviderError::InvalidConfig(format!(
                    "missing config; required fields: {}",
                    self.required.join(", ")
                )))
            }
            other => {
                return Err(ProviderError::InvalidConfig(format!(
                    "config must be an object, got {}",
                    json_type(other)
                )))
            }
        };

        for key in &self.required {
            match obj.get(*key) {
                None | Some(Value::Null) => {
                    return Err(ProviderError::InvalidConfig(format!(
                        "missing required field '{key}'"
                    )))
                }
                Some(_) => {}
            }
        }

        for key in &self.string_fields {
            if let Some(value) = obj.get(*key) {
                if !value.is_string() {
                    return Err(ProviderError::InvalidConfig(format!(
                        "field '{key}' must be a string, got {}",
                        json_type(value)
                    )));
                }
            }
        }

        Ok(())
    }
}

/// One trigger or action offered by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capability {
    pub id: &'static str,
    pub description: &'static str,
    pub schema: ConfigSchema,
}

impl Capability {
    pub fn new(id: &'static str, description: &'static str, schema: ConfigSchema) -> Self {
        Self { id, description, schema }
    }
}

/// Look up `id` in `capabilities` and check `config` against its schema.
pub(crate) fn check_capability(
    kind: &'static str,
    capabilities: &[Capability],
    id: &str,
    config: &Value,
) -> Result<(), ProviderError> {
    let capability = capabilities
        .iter()
        .find(|c| c.id == id)
        .ok_or_else(|| ProviderError::Unsupported { kind, id: id.to_owned() })?;
    capability.schema.check(config)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_config_passes_when_nothing_required() {
        assert!(ConfigSchema::empty().check(&Value::Null).is_ok());
    }

    #[test]
    fn missing_required_field_is_rejected() {
        let schema = ConfigSchema::requiring(&["channel"]);
        let err = schema.check(&json!({ "text": "hi" })).unwrap_err();
        assert_eq!(
            err,
            ProviderError::InvalidConfig("missing required field 'channel'".into())
        );
    }

    #[test]
    fn non_object_config_is_rejected() {
        let schema = ConfigSchema::empty();
        assert!(matches!(
            schema.check(&json!([1, 2])),
            Err(ProviderError::InvalidConfig(msg)) if msg.contains("array")
        ));
    }

    #[test]
    fn string_field_type_is_enforced() {
        let schema = ConfigSchema::requiring(&["url"]);
        assert!(schema.check(&json!({ "url": 42 })).is_err());
        assert!(schema.check(&json!({ "url": "http://x" })).is_ok());
    }

    #[test]
    fn unknown_capability_is_unsupported() {
        let caps = vec![Capability::new("post", "post", ConfigSchema::empty())];
        assert_eq!(
            check_capability("action", &caps, "delete", &Value::Null),
            Err(ProviderError::Unsupported { kind: "action", id: "delete".into() })
        );
    }
}
