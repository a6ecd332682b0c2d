use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Request method for page data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declarative data transform, applied after fetching.
///
/// All variants are pure: the same input always yields the same output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransformSpec {
    /// Select a sub-tree by JSON pointer (`/data/items`)
    Pointer { path: String },

    /// Fill top-level keys that are missing or null
    Defaults { values: BTreeMap<String, Value> },

    /// Nest the whole payload under `key`
    Wrap { key: String },
}

impl TransformSpec {
    /// Apply the transform to `data`.
    pub fn apply(&self, data: Value) -> Result<Value, String> {
        match self {
            TransformSpec::Pointer { path } => data
                .pointer(path)
                .cloned()
                .ok_or_else(|| format!("pointer '{}' matched nothing in the response", path)),
            TransformSpec::Defaults { values } => match data {
                Value::Object(mut map) => {
                    for (key, value) in values {
                        let missing = map.get(key).map_or(true, Value::is_null);
                        if missing {
                            map.insert(key.clone(), value.clone());
                        }
                    }
                    Ok(Value::Object(map))
                }
                other => Err(format!(
                    "defaults transform needs a JSON object, got {}",
                    json_kind(&other)
                )),
            },
            TransformSpec::Wrap { key } => {
                let mut map = serde_json::Map::new();
                map.insert(key.clone(), data);
                Ok(Value::Object(map))
            }
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
