//! DynamicValue - the native side of the value boundary
//!
//! A closed tagged union covering everything that can cross between native
//! code and a script runtime. Values are owned trees (deep-copied), so they
//! are independent of any runtime's heap and safe to move across threads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Native dynamic value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DynamicValue {
    /// Null (also produced for `undefined`)
    #[default]
    Null,

    /// Boolean value
    Bool(bool),

    /// Number (always f64, like the script side)
    Number(f64),

    /// String value
    String(String),

    /// Ordered sequence
    Array(Vec<DynamicValue>),

    /// String-keyed mapping
    Object(BTreeMap<String, DynamicValue>),
}

impl DynamicValue {
    /// Build an object from key/value pairs
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, DynamicValue)>,
    {
        DynamicValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Convert any serializable value.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(DynamicValue::from)
    }

    /// Parse JSON text
    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<serde_json::Value>(text).map(DynamicValue::from)
    }

    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, DynamicValue::Null)
    }

    /// Check if this value is object-shaped
    pub fn is_object(&self) -> bool {
        matches!(self, DynamicValue::Object(_))
    }

    /// Get as boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynamicValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DynamicValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as sequence
    pub fn as_array(&self) -> Option<&[DynamicValue]> {
        match self {
            DynamicValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get as mapping
    pub fn as_object(&self) -> Option<&BTreeMap<String, DynamicValue>> {
        match self {
            DynamicValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Consume into a mapping, handing the value back if it is not one
    pub fn into_object(self) -> Result<BTreeMap<String, DynamicValue>, DynamicValue> {
        match self {
            DynamicValue::Object(map) => Ok(map),
            other => Err(other),
        }
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            DynamicValue::Null => "null",
            DynamicValue::Bool(_) => "boolean",
            DynamicValue::Number(_) => "number",
            DynamicValue::String(_) => "string",
            DynamicValue::Array(_) => "array",
            DynamicValue::Object(_) => "object",
        }
    }
}

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicValue::Null => write!(f, "null"),
            DynamicValue::Bool(b) => write!(f, "{}", b),
            DynamicValue::Number(n) => write!(f, "{}", n),
            DynamicValue::String(s) => write!(f, "\"{}\"", s),
            DynamicValue::Array(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            DynamicValue::Object(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<serde_json::Value> for DynamicValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => DynamicValue::Null,
            serde_json::Value::Bool(b) => DynamicValue::Bool(b),
            serde_json::Value::Number(n) => DynamicValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => DynamicValue::String(s),
            serde_json::Value::Array(items) => {
                DynamicValue::Array(items.into_iter().map(DynamicValue::from).collect())
            }
            serde_json::Value::Object(map) => DynamicValue::Object(
                map.into_iter()
                    .map(|(k, v)| (k, DynamicValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for DynamicValue {
    fn from(b: bool) -> Self {
        DynamicValue::Bool(b)
    }
}

impl From<f64> for DynamicValue {
    fn from(n: f64) -> Self {
        DynamicValue::Number(n)
    }
}

impl From<i32> for DynamicValue {
    fn from(n: i32) -> Self {
        DynamicValue::Number(n as f64)
    }
}

impl From<&str> for DynamicValue {
    fn from(s: &str) -> Self {
        DynamicValue::String(s.to_string())
    }
}

impl From<String> for DynamicValue {
    fn from(s: String) -> Self {
        DynamicValue::String(s)
    }
}

impl From<()> for DynamicValue {
    fn from(_: ()) -> Self {
        DynamicValue::Null
    }
}

impl<T: Into<DynamicValue>> From<Vec<T>> for DynamicValue {
    fn from(items: Vec<T>) -> Self {
        DynamicValue::Array(items.into_iter().map(Into::into).collect())
    }
}
