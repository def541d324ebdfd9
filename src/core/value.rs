use crate::core::descriptor::Shape;
use std::fmt;

/// The in-memory form of a payload handed to, or produced by, a unit of logic.
///
/// Raw payloads arrive as [`Value::Bytes`] or [`Value::Text`] and are converted
/// to whatever [`Shape`] the receiving unit declared.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    Bytes(Vec<u8>),
    Structured(serde_json::Value),
}

impl Value {
    /// The shape this value currently has.
    pub fn shape(&self) -> Shape {
        match self {
            Value::Text(_) => Shape::String,
            Value::Integer(_) => Shape::Integer,
            Value::Number(_) => Shape::Number,
            Value::Boolean(_) => Shape::Boolean,
            Value::Bytes(_) => Shape::Bytes,
            Value::Structured(_) => Shape::Structured,
        }
    }

    /// True for zero-length text or bytes.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Text(text) => text.is_empty(),
            Value::Bytes(bytes) => bytes.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Structured(json) => Some(json),
            _ => None,
        }
    }

    /// Renders the value as JSON. Bytes become an array of numbers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Text(text) => serde_json::Value::String(text.clone()),
            Value::Integer(n) => (*n).into(),
            Value::Number(n) => (*n).into(),
            Value::Boolean(b) => (*b).into(),
            Value::Bytes(bytes) => bytes.clone().into(),
            Value::Structured(json) => json.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => f.write_str(text),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Number(n) => write!(f, "{}", n),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Bytes(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            Value::Structured(json) => write!(f, "{}", json),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Text(text)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Value::Bytes(bytes.to_vec())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::Structured(json)
    }
}
