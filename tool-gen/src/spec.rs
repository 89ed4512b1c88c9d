//! Tool specification types.
//!
//! A `ToolSpec` is the advertised contract of a tool: its unique name, a
//! human-readable description, and the schema its arguments must satisfy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Result, ToolError};

/// Longest accepted tool name.
pub const MAX_NAME_LEN: usize = 48;

/// The advertised contract of a tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Unique tool name.
    pub name: String,

    /// What the tool does.
    pub description: String,

    /// Arguments the tool accepts.
    #[serde(default)]
    pub input_schema: InputSchema,
}

impl ToolSpec {
    /// Create a spec with no parameters.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: InputSchema::default(),
        }
    }

    /// Add a required parameter.
    pub fn with_required(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
        description: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.input_schema
            .properties
            .insert(name.clone(), ParameterSpec::new(data_type, description));
        self.input_schema.required.push(name);
        self
    }

    /// Add an optional parameter.
    pub fn with_optional(
        mut self,
        name: impl Into<String>,
        data_type: DataType,
        description: impl Into<String>,
    ) -> Self {
        self.input_schema
            .properties
            .insert(name.into(), ParameterSpec::new(data_type, description));
        self
    }

    /// Check the spec is well formed.
    pub fn validate(&self) -> Result<()> {
        if !is_valid_name(&self.name) {
            return Err(ToolError::InvalidDefinition(format!(
                "tool name '{}' must be lowercase snake_case, 3 to {MAX_NAME_LEN} characters",
                self.name
            )));
        }

        if self.description.trim().is_empty() {
            return Err(ToolError::InvalidDefinition(format!(
                "tool {} has an empty description",
                self.name
            )));
        }

        self.input_schema.validate(&self.name)
    }

    /// Check invocation arguments against the schema.
    pub fn validate_args(&self, args: &Map<String, Value>) -> Result<()> {
        for required in &self.input_schema.required {
            if !args.contains_key(required) {
                return Err(ToolError::MissingParameter {
                    tool: self.name.clone(),
                    parameter: required.clone(),
                });
            }
        }

        for (key, value) in args {
            if let Some(param) = self.input_schema.properties.get(key) {
                if !param.data_type.accepts(value) {
                    return Err(ToolError::InvalidInput(format!(
                        "{key}: expected {}",
                        param.data_type.to_json_type()
                    )));
                }
            }
        }

        Ok(())
    }

    /// Render as a JSON Schema object (function calling format).
    pub fn to_json_schema(&self) -> Value {
        let properties: Map<String, Value> = self
            .input_schema
            .properties
            .iter()
            .map(|(name, param)| {
                (
                    name.clone(),
                    serde_json::json!({
                        "type": param.data_type.to_json_type(),
                        "description": param.description,
                    }),
                )
            })
            .collect();

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": self.input_schema.required,
        })
    }
}

/// Argument schema of a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputSchema {
    /// Declared parameters by name.
    #[serde(default)]
    pub properties: BTreeMap<String, ParameterSpec>,

    /// Names of parameters that must be supplied.
    #[serde(default)]
    pub required: Vec<String>,
}

impl InputSchema {
    fn validate(&self, tool: &str) -> Result<()> {
        let mut seen = Vec::with_capacity(self.required.len());
        for name in &self.required {
            if !self.properties.contains_key(name) {
                return Err(ToolError::InvalidDefinition(format!(
                    "tool {tool} requires undeclared parameter '{name}'"
                )));
            }
            if seen.contains(&name) {
                return Err(ToolError::InvalidDefinition(format!(
                    "tool {tool} lists '{name}' as required twice"
                )));
            }
            seen.push(name);
        }

        for name in self.properties.keys() {
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(ToolError::InvalidDefinition(format!(
                    "tool {tool} has invalid parameter name '{name}'"
                )));
            }
        }

        Ok(())
    }

    /// Whether two schemas accept the same arguments.
    ///
    /// Parameter descriptions and the order of `required` are ignored.
    pub fn same_contract(&self, other: &InputSchema) -> bool {
        let types = |s: &InputSchema| -> Vec<(String, DataType)> {
            s.properties
                .iter()
                .map(|(k, v)| (k.clone(), v.data_type))
                .collect()
        };
        let required = |s: &InputSchema| {
            let mut r = s.required.clone();
            r.sort();
            r
        };

        types(self) == types(other) && required(self) == required(other)
    }

    /// Whether `name` is a declared parameter.
    pub fn declares(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }
}

/// A single declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// JSON type of the argument.
    #[serde(rename = "type")]
    pub data_type: DataType,

    /// What the argument means.
    #[serde(default)]
    pub description: String,
}

impl ParameterSpec {
    /// Create a parameter.
    pub fn new(data_type: DataType, description: impl Into<String>) -> Self {
        Self {
            data_type,
            description: description.into(),
        }
    }
}

/// Data types for tool parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl DataType {
    /// Convert to JSON Schema type string.
    pub fn to_json_type(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// Whether `value` has this type.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

/// Whether `name` follows the tool naming convention.
///
/// Names are lowercase ASCII snake_case starting with a letter, with no
/// leading, trailing, or doubled underscores.
pub fn is_valid_name(name: &str) -> bool {
    let len_ok = (3..=MAX_NAME_LEN).contains(&name.len());
    let starts_ok = name.chars().next().is_some_and(|c| c.is_ascii_lowercase());
    let chars_ok = name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    len_ok && starts_ok && chars_ok && !name.ends_with('_') && !name.contains("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_json_schema_generation() {
        let spec = ToolSpec::new("greet", "Greets a user")
            .with_required("name", DataType::String, "User name")
            .with_optional("age", DataType::Integer, "User age");

        let schema = spec.to_json_schema();
        assert_eq!(schema["properties"]["name"]["type"], "string");
        assert_eq!(schema["required"], serde_json::json!(["name"]));
    }

    #[test]
    fn test_missing_required_argument() {
        let spec = ToolSpec::new("greet", "Greets a user")
            .with_required("name", DataType::String, "User name");

        let err = spec.validate_args(&args(serde_json::json!({}))).unwrap_err();
        match err {
            ToolError::MissingParameter { tool, parameter } => {
                assert_eq!(tool, "greet");
                assert_eq!(parameter, "name");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_wrong_argument_type() {
        let spec = ToolSpec::new("repeat", "Repeats")
            .with_required("count", DataType::Integer, "How many");

        assert!(spec.validate_args(&args(serde_json::json!({"count": 3}))).is_ok());
        assert!(spec.validate_args(&args(serde_json::json!({"count": "3"}))).is_err());
    }

    #[test]
    fn test_required_must_be_declared() {
        let mut spec = ToolSpec::new("broken", "Broken tool");
        spec.input_schema.required.push("ghost".to_string());

        assert!(matches!(
            spec.validate(),
            Err(ToolError::InvalidDefinition(_))
        ));
    }

    #[test]
    fn test_name_convention() {
        assert!(is_valid_name("char_count"));
        assert!(is_valid_name("ask_math"));
        assert!(!is_valid_name("CharCount"));
        assert!(!is_valid_name("ab"));
        assert!(!is_valid_name("count_"));
        assert!(!is_valid_name("char__count"));
        assert!(!is_valid_name("1count"));
        assert!(!is_valid_name("../etc"));
    }

    #[test]
    fn test_same_contract_ignores_descriptions_and_order() {
        let a = ToolSpec::new("pair", "A")
            .with_required("x", DataType::String, "first")
            .with_required("y", DataType::String, "second");
        let b = ToolSpec::new("pair", "B")
            .with_required("y", DataType::String, "other words")
            .with_required("x", DataType::String, "more words");
        let c = ToolSpec::new("pair", "C").with_required("x", DataType::Number, "first");

        assert!(a.input_schema.same_contract(&b.input_schema));
        assert!(!a.input_schema.same_contract(&c.input_schema));
    }

    #[test]
    fn test_schema_deserializes_json_schema_shape() {
        let schema: InputSchema = serde_json::from_value(serde_json::json!({
            "properties": {"text": {"type": "string", "description": "Input text"}},
            "required": ["text"]
        }))
        .unwrap();

        assert_eq!(schema.properties["text"].data_type, DataType::String);
        assert_eq!(schema.required, vec!["text".to_string()]);
    }
}
