//! Parameter schema for tools
//!
//! Tool parameters are described by a closed set of kinds rather than a
//! free-form JSON schema. The same description renders the JSON shape the
//! model client expects and validates incoming arguments, so there is no
//! runtime schema interpretation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::{Result, ToolError};

/// Kind of a single tool parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParamKind {
    /// Free-form or enum-constrained string
    String {
        /// Allowed values; empty means unconstrained
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        enum_values: Vec<String>,
    },
    /// Any JSON number
    Number,
    /// Boolean flag
    Boolean,
}

impl ParamKind {
    fn type_name(&self) -> &'static str {
        match self {
            ParamKind::String { .. } => "string",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            ParamKind::String { enum_values } => match value.as_str() {
                Some(s) => enum_values.is_empty() || enum_values.iter().any(|v| v == s),
                None => false,
            },
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
        }
    }
}

/// One named parameter of a tool
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ParamSpec {
    /// Parameter kind
    pub kind: ParamKind,

    /// Human-readable description, included in the model prompt
    pub description: String,

    /// Whether the parameter must be present
    pub required: bool,
}

/// Schema for a tool's parameters
///
/// Built with the fluent methods below; renders to the
/// `{type: "object", properties, required}` shape models consume.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ToolSchema {
    /// Parameters by name (ordered for stable rendering)
    pub params: BTreeMap<String, ParamSpec>,
}

impl ToolSchema {
    /// Create an empty schema (tool takes no parameters)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a string parameter
    pub fn string<S: Into<String>>(mut self, name: S, description: S, required: bool) -> Self {
        self.params.insert(
            name.into(),
            ParamSpec {
                kind: ParamKind::String {
                    enum_values: Vec::new(),
                },
                description: description.into(),
                required,
            },
        );
        self
    }

    /// Add an enum-constrained string parameter
    pub fn string_enum<S: Into<String>>(
        mut self,
        name: S,
        description: S,
        values: Vec<String>,
        required: bool,
    ) -> Self {
        self.params.insert(
            name.into(),
            ParamSpec {
                kind: ParamKind::String {
                    enum_values: values,
                },
                description: description.into(),
                required,
            },
        );
        self
    }

    /// Add a number parameter
    pub fn number<S: Into<String>>(mut self, name: S, description: S, required: bool) -> Self {
        self.params.insert(
            name.into(),
            ParamSpec {
                kind: ParamKind::Number,
                description: description.into(),
                required,
            },
        );
        self
    }

    /// Add a boolean parameter
    pub fn boolean<S: Into<String>>(mut self, name: S, description: S, required: bool) -> Self {
        self.params.insert(
            name.into(),
            ParamSpec {
                kind: ParamKind::Boolean,
                description: description.into(),
                required,
            },
        );
        self
    }

    /// Render the `{type, properties, required}` parameters object
    pub fn to_parameters_json(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for (name, spec) in &self.params {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), Value::String(spec.kind.type_name().into()));
            prop.insert(
                "description".into(),
                Value::String(spec.description.clone()),
            );
            if let ParamKind::String { enum_values } = &spec.kind {
                if !enum_values.is_empty() {
                    prop.insert(
                        "enum".into(),
                        Value::Array(
                            enum_values
                                .iter()
                                .map(|v| Value::String(v.clone()))
                                .collect(),
                        ),
                    );
                }
            }
            properties.insert(name.clone(), Value::Object(prop));

            if spec.required {
                required.push(Value::String(name.clone()));
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": Value::Object(properties),
            "required": Value::Array(required),
        })
    }

    /// Render the full tool description the model client consumes
    pub fn to_model_tool(&self, name: &str, description: &str) -> Value {
        serde_json::json!({
            "name": name,
            "description": description,
            "parameters": self.to_parameters_json(),
        })
    }

    /// Validate arguments against this schema
    ///
    /// Checks that all required parameters are present and that every
    /// supplied parameter matches its declared kind. Unknown arguments are
    /// rejected.
    pub fn validate(&self, args: &Value) -> Result<()> {
        let obj = args
            .as_object()
            .ok_or_else(|| ToolError::invalid_params("arguments must be a JSON object"))?;

        for (name, spec) in &self.params {
            match obj.get(name) {
                Some(value) => {
                    if !spec.kind.matches(value) {
                        return Err(ToolError::invalid_params(format!(
                            "parameter '{}' must be a {}",
                            name,
                            spec.kind.type_name()
                        )));
                    }
                }
                None if spec.required => {
                    return Err(ToolError::invalid_params(format!(
                        "missing required parameter '{}'",
                        name
                    )));
                }
                None => {}
            }
        }

        for key in obj.keys() {
            if !self.params.contains_key(key) {
                return Err(ToolError::invalid_params(format!(
                    "unknown parameter '{}'",
                    key
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> ToolSchema {
        ToolSchema::new()
            .string("url", "URL to open", true)
            .number("timeout", "Timeout in seconds", false)
            .string_enum(
                "mode",
                "Open mode",
                vec!["tab".to_string(), "window".to_string()],
                false,
            )
    }

    #[test]
    fn test_parameters_json_shape() {
        let params = sample_schema().to_parameters_json();

        assert_eq!(params["type"], "object");
        assert_eq!(params["properties"]["url"]["type"], "string");
        assert_eq!(params["properties"]["timeout"]["type"], "number");
        assert_eq!(params["properties"]["mode"]["enum"][0], "tab");
        assert_eq!(params["required"], serde_json::json!(["url"]));
    }

    #[test]
    fn test_model_tool_shape() {
        let tool = sample_schema().to_model_tool("open_url", "Open a URL");
        assert_eq!(tool["name"], "open_url");
        assert_eq!(tool["description"], "Open a URL");
        assert_eq!(tool["parameters"]["type"], "object");
    }

    #[test]
    fn test_validate_ok() {
        let schema = sample_schema();
        let args = serde_json::json!({"url": "https://example.com", "timeout": 5});
        assert!(schema.validate(&args).is_ok());
    }

    #[test]
    fn test_validate_missing_required() {
        let schema = sample_schema();
        let err = schema.validate(&serde_json::json!({})).unwrap_err();
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn test_validate_wrong_type() {
        let schema = sample_schema();
        let args = serde_json::json!({"url": 42});
        assert!(schema.validate(&args).is_err());
    }

    #[test]
    fn test_validate_enum_membership() {
        let schema = sample_schema();
        let ok = serde_json::json!({"url": "x", "mode": "tab"});
        let bad = serde_json::json!({"url": "x", "mode": "popup"});
        assert!(schema.validate(&ok).is_ok());
        assert!(schema.validate(&bad).is_err());
    }

    #[test]
    fn test_validate_unknown_param() {
        let schema = sample_schema();
        let args = serde_json::json!({"url": "x", "color": "red"});
        assert!(schema.validate(&args).is_err());
    }

    #[test]
    fn test_empty_schema_accepts_empty_args() {
        let schema = ToolSchema::new();
        assert!(schema.validate(&serde_json::json!({})).is_ok());
    }
}
