//! Parameter type tags
//!
//! Each exported function carries one tag per parameter. The codec uses the
//! tag as a hint when turning a script argument into a [`DynamicValue`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::value::DynamicValue;

/// Expected shape of a function argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeTag {
    /// Any convertible value (functions and promises excluded)
    #[default]
    Any,
    /// `number`
    Number,
    /// `boolean`
    Boolean,
    /// `string`
    String,
    /// Plain object, converted to a mapping
    Object,
    /// Array, converted to a sequence
    Array,
}

impl TypeTag {
    /// Decode the numeric tag used by registration front-ends.
    ///
    /// ```text
    /// 0 any | 1 number | 2 boolean | 3 string | 4 object | 5 array
    /// ```
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(TypeTag::Any),
            1 => Some(TypeTag::Number),
            2 => Some(TypeTag::Boolean),
            3 => Some(TypeTag::String),
            4 => Some(TypeTag::Object),
            5 => Some(TypeTag::Array),
            _ => None,
        }
    }

    /// Numeric code (inverse of [`TypeTag::from_code`])
    pub fn code(self) -> i32 {
        match self {
            TypeTag::Any => 0,
            TypeTag::Number => 1,
            TypeTag::Boolean => 2,
            TypeTag::String => 3,
            TypeTag::Object => 4,
            TypeTag::Array => 5,
        }
    }

    /// Decode a whole code array, failing on the first unknown code
    pub fn from_codes(codes: &[i32]) -> Result<Vec<TypeTag>, i32> {
        codes
            .iter()
            .map(|&code| TypeTag::from_code(code).ok_or(code))
            .collect()
    }

    /// Script-facing name of the tag
    pub fn name(self) -> &'static str {
        match self {
            TypeTag::Any => "any",
            TypeTag::Number => "number",
            TypeTag::Boolean => "boolean",
            TypeTag::String => "string",
            TypeTag::Object => "object",
            TypeTag::Array => "array",
        }
    }

    /// Check whether an already-native value satisfies this tag
    pub fn accepts(self, value: &DynamicValue) -> bool {
        matches!(
            (self, value),
            (TypeTag::Any, _)
                | (TypeTag::Number, DynamicValue::Number(_))
                | (TypeTag::Boolean, DynamicValue::Bool(_))
                | (TypeTag::String, DynamicValue::String(_))
                | (TypeTag::Object, DynamicValue::Object(_))
                | (TypeTag::Array, DynamicValue::Array(_))
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
