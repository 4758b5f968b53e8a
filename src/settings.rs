use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::Result;

/// Process-wide configuration, read-only while rendering.
///
/// A key that is missing and a key explicitly set to `null` are different
/// things: `get` returns `None` for the former and `Some(Value::Null)` for
/// the latter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings {
    values: Map<String, Value>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder used mostly by tests and the CLI `--set` flag.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Present and not `null`.
    pub fn is_defined(&self, key: &str) -> bool {
        matches!(self.get(key), Some(v) if !v.is_null())
    }

    pub fn get_str(&self, key: &str) -> Option<String> {
        self.get(key).and_then(scalar_to_string)
    }

    /// A defined list setting. Non-string entries are stringified; a scalar
    /// string is treated as a one-element list.
    pub fn get_list(&self, key: &str) -> Option<Vec<String>> {
        match self.get(key)? {
            Value::Null => None,
            Value::Array(items) => Some(items.iter().filter_map(scalar_to_string).collect()),
            other => scalar_to_string(other).map(|s| vec![s]),
        }
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.get(key) {
            None | Some(Value::Null) => default,
            Some(v) => truthy(v),
        }
    }
}

/// Render a scalar JSON value as a plain string. `null`, arrays and objects
/// have no scalar form.
pub(crate) fn scalar_to_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
        _ => None,
    }
}

pub(crate) fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}
