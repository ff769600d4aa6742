//! Named value transformers applied by data mappings.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

/// A transformer maps one JSON value to another, or explains why it can't.
pub type Transformer = Arc<dyn Fn(&Value) -> Result<Value, String> + Send + Sync>;

/// Transformer table shared by the validator and the data mapper.
#[derive(Clone, Default)]
pub struct TransformerRegistry {
    inner: Arc<RwLock<HashMap<String, Transformer>>>,
}

impl TransformerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry pre-populated with the built-in transformers:
    /// `uppercase`, `lowercase`, `trim`, `to_string`, `to_number`, `to_bool`.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register("uppercase", |v| with_str(v, |s| s.to_uppercase()));
        registry.register("lowercase", |v| with_str(v, |s| s.to_lowercase()));
        registry.register("trim", |v| with_str(v, |s| s.trim().to_owned()));
        registry.register("to_string", to_string);
        registry.register("to_number", to_number);
        registry.register("to_bool", to_bool);
        registry
    }

    /// Register (or replace) a transformer under `name`.
    pub fn register<F>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(&Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.into(), Arc::new(f));
    }

    pub fn get(&self, name: &str) -> Option<Transformer> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }
}

fn with_str(value: &Value, f: impl Fn(&str) -> String) -> Result<Value, String> {
    match value {
        Value::String(s) => Ok(Value::String(f(s))),
        other => Err(format!("expected a string, got {other}")),
    }
}

fn to_string(value: &Value) -> Result<Value, String> {
    Ok(match value {
        Value::String(s) => Value::String(s.clone()),
        Value::Null => Value::String(String::new()),
        other => Value::String(other.to_string()),
    })
}

fn to_number(value: &Value) -> Result<Value, String> {
    match value {
        Value::Number(_) => Ok(value.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Value::from(i));
            }
            s.parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| format!("'{s}' is not a number"))
        }
        Value::Bool(b) => Ok(Value::from(u8::from(*b))),
        other => Err(format!("cannot convert {other} to a number")),
    }
}

fn to_bool(value: &Value) -> Result<Value, String> {
    match value {
        Value::Bool(_) => Ok(value.clone()),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(Value::Bool(true)),
            "false" | "no" | "0" | "" => Ok(Value::Bool(false)),
            other => Err(format!("'{other}' is not a boolean")),
        },
        Value::Number(n) => Ok(Value::Bool(n.as_f64().map_or(false, |f| f != 0.0))),
        Value::Null => Ok(Value::Bool(false)),
        other => Err(format!("cannot convert {other} to a boolean")),
    }
}
