//! Raw, caller-submitted test payloads
//!
//! Inputs arrive as a loose JSON object. Numbers may be sent as numbers or as
//! numeric strings. Required fields are validated here; optional ones degrade
//! to `None` with a warning.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::InvalidInputError;
use crate::models::Gender;

/// Field name to value mapping as submitted by the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawInputs(Map<String, Value>);

impl RawInputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a JSON value, which must be an object
    pub fn from_value(value: Value) -> Result<Self, InvalidInputError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(InvalidInputError::new(
                "inputs",
                format!("expected a JSON object, got {}", kind_of(&other)),
            )),
        }
    }

    /// Builder-style insert
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }

    /// Lenient numeric read: finite numbers or numeric strings, else `None`
    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(as_number)
    }

    /// Optional numeric field; a present but unusable value is logged and dropped
    pub fn optional_number(&self, field: &str) -> Option<f64> {
        let value = self.get(field)?;
        let parsed = as_number(value);
        if parsed.is_none() {
            tracing::warn!(field, value = %value, "Ignoring malformed optional input");
        }
        parsed
    }

    /// Optional non-negative field with a default, used for penalty counts
    pub fn number_or(&self, field: &str, default: f64) -> f64 {
        self.optional_number(field)
            .filter(|v| *v >= 0.0)
            .unwrap_or(default)
    }

    /// Required strictly positive, finite number
    pub fn require_positive(&self, field: &str) -> Result<f64, InvalidInputError> {
        require_positive_value(self.get(field), field)
    }

    /// Required number within an inclusive range
    pub fn require_in_range(&self, field: &str, min: f64, max: f64) -> Result<f64, InvalidInputError> {
        let value = self.require_number(field)?;
        if value < min || value > max {
            return Err(InvalidInputError::new(
                field,
                format!("must be between {} and {}", min, max),
            ));
        }
        Ok(value)
    }

    /// Required finite number of any sign
    pub fn require_number(&self, field: &str) -> Result<f64, InvalidInputError> {
        let value = self
            .get(field)
            .ok_or_else(|| InvalidInputError::missing(field))?;
        as_number(value).ok_or_else(|| InvalidInputError::new(field, "must be a finite number"))
    }

    /// Required array field
    pub fn require_array(&self, field: &str) -> Result<&Vec<Value>, InvalidInputError> {
        match self.get(field) {
            None => Err(InvalidInputError::missing(field)),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(InvalidInputError::new(
                field,
                format!("expected an array, got {}", kind_of(other)),
            )),
        }
    }

    /// Optional array field; anything that is not an array reads as empty
    pub fn array(&self, field: &str) -> &[Value] {
        match self.get(field) {
            Some(Value::Array(items)) => items,
            _ => &[],
        }
    }

    pub fn text(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Optional gender; present values must be recognizable
    pub fn gender(&self) -> Result<Option<Gender>, InvalidInputError> {
        match self.get("gender") {
            None => Ok(None),
            Some(Value::String(s)) => s
                .parse()
                .map(Some)
                .map_err(|_| InvalidInputError::new("gender", "must be 'male' or 'female'")),
            Some(_) => Err(InvalidInputError::new("gender", "must be 'male' or 'female'")),
        }
    }
}

impl From<Map<String, Value>> for RawInputs {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Finite number from a JSON number or numeric string
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

/// Validate a positive number found at `path`, which may be an array path
pub fn require_positive_value(value: Option<&Value>, path: &str) -> Result<f64, InvalidInputError> {
    let value = value
        .filter(|v| !v.is_null())
        .ok_or_else(|| InvalidInputError::missing(path))?;
    match as_number(value) {
        Some(v) if v > 0.0 => Ok(v),
        Some(_) => Err(InvalidInputError::not_positive(path)),
        None => Err(InvalidInputError::new(path, "must be a finite number")),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
