// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Loosely typed plugin arguments.
//!
//! Plugin configuration arrives from the scheduler configuration file as an
//! opaque string-keyed map. Each plugin converts the entries it cares about
//! into its own typed configuration record via [`Arguments::get`]; entries
//! with an unexpected shape are logged and treated as absent, never as a
//! hard failure.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// An opaque string-keyed argument map handed to a plugin at construction.
#[derive(Debug, Clone, Default)]
pub struct Arguments(Map<String, Value>);

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deserialize the entry under `key` into `T`.
    ///
    /// Returns `None` when the key is absent or the value does not have the
    /// expected shape; the latter is logged at warn level.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.0.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                tracing::warn!(key, %err, "plugin argument has unexpected shape, ignoring");
                None
            }
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Arguments {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<Value> for Arguments {
    /// Accept any JSON value; non-objects degrade to an empty map.
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map),
            other => {
                tracing::warn!(?other, "plugin arguments are not a map, ignoring");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn get_typed_entries() {
        let args = Arguments::from(json!({
            "annotationKey": "example.com/group",
            "limit": 3,
            "order": ["priority", "creationTime"],
        }));

        assert_eq!(
            args.get::<String>("annotationKey").as_deref(),
            Some("example.com/group")
        );
        assert_eq!(args.get::<u32>("limit"), Some(3));
        assert_eq!(
            args.get::<Vec<String>>("order"),
            Some(vec!["priority".to_string(), "creationTime".to_string()])
        );
    }

    #[test]
    fn missing_key_is_none() {
        let args = Arguments::from(json!({}));
        assert_eq!(args.get::<String>("absent"), None);
    }

    #[test]
    fn shape_mismatch_is_none() {
        let args = Arguments::from(json!({"limit": "not-a-number"}));
        assert_eq!(args.get::<u32>("limit"), None);
        // The malformed entry is ignored, not removed.
        assert!(args.contains_key("limit"));
    }

    #[test]
    fn non_object_degrades_to_empty() {
        let args = Arguments::from(json!(["a", "b"]));
        assert!(args.is_empty());
    }
}
