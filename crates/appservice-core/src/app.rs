//! App descriptors and parameter schema validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppId, CoreError, TaskParams};

/// A runnable app as published by the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDescriptor {
    /// Catalog identifier.
    pub id: AppId,

    /// Short display name.
    #[serde(default)]
    pub label: String,

    /// Longer description.
    #[serde(default)]
    pub description: String,

    /// Program and leading arguments used to launch the app.
    #[serde(default)]
    pub command: Vec<String>,

    /// Accepted parameters. Empty means any parameter object is accepted.
    #[serde(default)]
    pub parameters: Vec<AppParameter>,
}

impl AppDescriptor {
    /// Create a descriptor with no schema and no command.
    pub fn new(id: impl Into<AppId>) -> Self {
        let id = id.into();
        Self {
            label: id.as_str().to_string(),
            id,
            description: String::new(),
            command: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// Builder method to set the launch command.
    pub fn with_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command = command.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to add a parameter to the schema.
    pub fn with_parameter(mut self, parameter: AppParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Validate `params` against the schema and fill in defaults.
    ///
    /// Returns the parameter object to store on the task.
    pub fn validate_params(&self, params: &TaskParams) -> Result<TaskParams, CoreError> {
        if self.parameters.is_empty() {
            return Ok(params.clone());
        }

        for key in params.keys() {
            if !self.parameters.iter().any(|p| &p.id == key) {
                return Err(CoreError::InvalidParams(format!(
                    "unknown parameter '{key}' for app '{}'",
                    self.id
                )));
            }
        }

        let mut resolved = params.clone();
        for param in &self.parameters {
            match params.get(&param.id) {
                Some(Value::Null) | None => {
                    if let Some(default) = &param.default {
                        resolved.insert(param.id.clone(), default.clone());
                    } else if param.required {
                        return Err(CoreError::InvalidParams(format!(
                            "missing required parameter '{}'",
                            param.id
                        )));
                    }
                }
                Some(value) => param.check(value)?,
            }
        }

        Ok(resolved)
    }
}

/// One entry of an app's parameter schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppParameter {
    /// Parameter key.
    pub id: String,

    #[serde(default)]
    pub label: String,

    #[serde(default)]
    pub description: String,

    /// Whether the caller must supply a value when there is no default.
    #[serde(default)]
    pub required: bool,

    /// Value used when the caller omits the parameter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Expected value type.
    #[serde(rename = "type", default)]
    pub kind: ParamKind,

    /// Allowed values for `enum` parameters.
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl AppParameter {
    /// Create an optional parameter of the given kind.
    pub fn new(id: impl Into<String>, kind: ParamKind) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            description: String::new(),
            required: false,
            default: None,
            kind,
            enum_values: Vec::new(),
        }
    }

    /// Builder method to mark the parameter as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Builder method to set a default value.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Builder method to set the allowed values of an enum parameter.
    pub fn with_enum_values<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    fn check(&self, value: &Value) -> Result<(), CoreError> {
        let ok = match self.kind {
            ParamKind::Any => true,
            ParamKind::String => value.is_string(),
            ParamKind::Integer => value.is_i64() || value.is_u64(),
            ParamKind::Number => value.is_number(),
            ParamKind::Boolean => value.is_boolean(),
            ParamKind::List => value.is_array(),
            ParamKind::Object => value.is_object(),
            ParamKind::Enum => {
                return match value.as_str() {
                    Some(v) if self.enum_values.iter().any(|allowed| allowed == v) => Ok(()),
                    _ => Err(CoreError::InvalidParams(format!(
                        "parameter '{}' must be one of [{}]",
                        self.id,
                        self.enum_values.join(", ")
                    ))),
                };
            }
        };

        if ok {
            Ok(())
        } else {
            Err(CoreError::InvalidParams(format!(
                "parameter '{}' must be of type {:?}",
                self.id, self.kind
            )))
        }
    }
}

/// Value type of an app parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
    Enum,
    List,
    Object,
    #[default]
    Any,
}
