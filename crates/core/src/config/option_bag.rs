use serde_json::{Map, Value};

use crate::shared::error::{Error, Result};

/// A sparse, loosely typed set of training options as supplied by a caller.
///
/// Keys map to arbitrary JSON values; `null` counts as explicitly undefined.
/// Nothing is validated here. The resolver coerces and checks recognised
/// keys once and ignores the rest.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OptionBag {
    values: Map<String, Value>,
}

impl OptionBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts a JSON object, or `null` for "no options".
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::new()),
            Value::Object(values) => Ok(Self { values }),
            other => Err(Error::invalid_config(
                "options",
                format!("expected an object, got {}", type_name(&other)),
            )),
        }
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| Error::invalid_config("options", format!("malformed JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Overlays `other` on top of this bag; keys in `other` win.
    pub fn merge(&mut self, other: OptionBag) {
        self.values.extend(other.values);
    }

    /// First defined value among `keys`, with the key it was found under.
    pub fn lookup<'a>(&'a self, keys: &[&'a str]) -> Option<(&'a str, &'a Value)> {
        keys.iter().find_map(|key| {
            self.values
                .get(*key)
                .filter(|v| !v.is_null())
                .map(|v| (*key, v))
        })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
