//! Declared input parameters of a task.

use crate::task::TaskInputs;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Definition of a single named input.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// JSON type name ("string", "integer", "object", ...)
    #[serde(rename = "type", default = "default_type")]
    pub param_type: String,
    #[serde(default)]
    pub description: String,
    /// Value used when the caller omits the parameter
    #[serde(default)]
    pub default: Option<Value>,
}

fn default_type() -> String {
    "string".to_string()
}

impl ParameterDefinition {
    /// Creates a parameter of the given JSON type.
    pub fn new(param_type: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            param_type: param_type.into(),
            description: description.into(),
            default: None,
        }
    }

    /// Creates a string parameter.
    pub fn string(description: impl Into<String>) -> Self {
        Self::new("string", description)
    }

    /// Sets the default value.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Input schema: which keys a task reads and which of them are mandatory.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    #[serde(default)]
    pub properties: BTreeMap<String, ParameterDefinition>,
    #[serde(default)]
    pub required: Vec<String>,
}

impl InputSchema {
    /// Creates an empty schema (accepts anything, requires nothing).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an optional property.
    pub fn property(mut self, name: impl Into<String>, definition: ParameterDefinition) -> Self {
        self.properties.insert(name.into(), definition);
        self
    }

    /// Adds a required property.
    pub fn required(mut self, name: impl Into<String>, definition: ParameterDefinition) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name.clone());
        }
        self.properties.insert(name, definition);
        self
    }

    /// Returns true if the schema declares no properties.
    pub fn is_open(&self) -> bool {
        self.properties.is_empty()
    }

    /// Required keys that are absent (or null) in `inputs`, in declaration order.
    pub fn missing_required(&self, inputs: &TaskInputs) -> Vec<String> {
        self.required
            .iter()
            .filter(|key| inputs.get(*key).map_or(true, Value::is_null))
            .cloned()
            .collect()
    }

    /// Validates `inputs` and fills in declared defaults.
    ///
    /// Returns the missing required keys on failure.
    pub fn prepare(&self, inputs: &TaskInputs) -> Result<TaskInputs, Vec<String>> {
        let missing = self.missing_required(inputs);
        if !missing.is_empty() {
            return Err(missing);
        }

        let mut prepared = inputs.clone();
        for (name, definition) in &self.properties {
            if let Some(default) = &definition.default {
                let absent = prepared.get(name).map_or(true, Value::is_null);
                if absent {
                    prepared.insert(name.clone(), default.clone());
                }
            }
        }
        Ok(prepared)
    }

    /// Picks the values this schema declares out of a wider environment.
    ///
    /// An open schema takes the whole environment.
    pub fn select_from(&self, environment: &TaskInputs) -> TaskInputs {
        if self.is_open() {
            return environment.clone();
        }
        self.properties
            .keys()
            .filter_map(|key| environment.get(key).map(|v| (key.clone(), v.clone())))
            .collect()
    }
}
