//! The tool contract: declared parameters, argument validation, execution.
//!
//! A [`Tool`] only implements the fallible [`execute`](Tool::execute) step.
//! Callers never use it directly; they go through
//! [`ToolRegistry::invoke`](crate::ToolRegistry::invoke), which validates
//! arguments against [`Tool::parameters`], bounds the call with a timeout,
//! and turns every failure into an observation string.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{CoreError, Result};

/// The JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamKind {
    String,
    Integer,
    Number,
    Boolean,
}

impl ParamKind {
    fn as_schema_type(self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Number => "number",
            ParamKind::Boolean => "boolean",
        }
    }
}

/// One declared parameter of a [`Tool`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
    pub description: String,
}

impl ParamSpec {
    /// A required parameter.
    pub fn required(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self { name: name.into(), kind, required: true, description: description.into() }
    }

    /// An optional parameter.
    pub fn optional(name: impl Into<String>, kind: ParamKind, description: impl Into<String>) -> Self {
        Self { name: name.into(), kind, required: false, description: description.into() }
    }
}

/// Validated tool arguments.
///
/// Values have already been checked against the tool's [`ParamSpec`]s, so the
/// typed getters only return `None` for optional parameters that were omitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs(Map<String, Value>);

impl ToolArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        self.0.get(name).and_then(Value::as_i64)
    }

    pub fn f64(&self, name: &str) -> Option<f64> {
        self.0.get(name).and_then(Value::as_f64)
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    /// Fetch a required string parameter.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidArgument`] if the parameter is absent.
    pub fn require_str(&self, name: &str) -> Result<&str> {
        self.str(name)
            .ok_or_else(|| CoreError::InvalidArgument(format!("missing required '{name}' parameter")))
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

/// Check raw arguments against declared parameters.
///
/// `null` is treated as an empty object. Integer parameters also accept
/// numeric strings such as `"5"`, which small models often emit; the value is
/// normalized to a JSON number.
///
/// # Errors
///
/// Returns [`CoreError::InvalidArgument`] if `args` is not an object, names
/// an undeclared parameter, omits a required one, or carries a value of the
/// wrong type.
pub fn validate_args(params: &[ParamSpec], args: &Value) -> Result<ToolArgs> {
    let map = match args {
        Value::Null => Map::new(),
        Value::Object(map) => map.clone(),
        other => {
            return Err(CoreError::InvalidArgument(format!(
                "arguments must be a JSON object, got {}",
                json_type_name(other)
            )));
        }
    };

    if let Some(unknown) = map.keys().find(|key| !params.iter().any(|p| &p.name == *key)) {
        return Err(CoreError::InvalidArgument(format!("unexpected parameter '{unknown}'")));
    }

    let mut validated = Map::with_capacity(map.len());
    for param in params {
        match map.get(&param.name) {
            None | Some(Value::Null) if param.required => {
                return Err(CoreError::InvalidArgument(format!(
                    "missing required '{}' parameter",
                    param.name
                )));
            }
            None | Some(Value::Null) => {}
            Some(value) => {
                let value = coerce(param, value)?;
                validated.insert(param.name.clone(), value);
            }
        }
    }
    Ok(ToolArgs(validated))
}

fn coerce(param: &ParamSpec, value: &Value) -> Result<Value> {
    let ok = match (param.kind, value) {
        (ParamKind::String, Value::String(_)) => true,
        (ParamKind::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (ParamKind::Integer, Value::String(s)) => {
            if let Ok(parsed) = s.trim().parse::<i64>() {
                return Ok(Value::from(parsed));
            }
            false
        }
        (ParamKind::Number, Value::Number(_)) => true,
        (ParamKind::Boolean, Value::Bool(_)) => true,
        _ => false,
    };
    if ok {
        Ok(value.clone())
    } else {
        Err(CoreError::InvalidArgument(format!(
            "parameter '{}' must be {}, got {}",
            param.name,
            param.kind.as_schema_type(),
            json_type_name(value)
        )))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render declared parameters as a JSON-schema object.
pub fn parameters_schema(params: &[ParamSpec]) -> Value {
    let properties: Map<String, Value> = params
        .iter()
        .map(|p| {
            (p.name.clone(), json!({ "type": p.kind.as_schema_type(), "description": p.description }))
        })
        .collect();
    let required: Vec<&str> = params.iter().filter(|p| p.required).map(|p| p.name.as_str()).collect();
    json!({ "type": "object", "properties": properties, "required": required })
}

/// A named capability an agent's model may call.
///
/// Implementations may hold private state established at construction (an
/// opened index, an HTTP client) and must be cheap to call repeatedly.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name the model uses to select this tool.
    fn name(&self) -> &str;

    /// What the tool does, shown to the model.
    fn description(&self) -> &str;

    /// Declared parameters. Arguments are validated against these before
    /// [`execute`](Tool::execute) is called.
    fn parameters(&self) -> Vec<ParamSpec>;

    /// Run the tool with validated arguments.
    async fn execute(&self, args: ToolArgs) -> Result<String>;
}

/// What a model is told about one tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    pub name: String,
    pub description: String,
    pub parameters: Vec<ParamSpec>,
}

impl ToolDeclaration {
    pub fn parameters_schema(&self) -> Value {
        parameters_schema(&self.parameters)
    }
}
