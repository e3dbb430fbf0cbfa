//! Default value codec
//!
//! Deep-copies values across the boundary through the [`ScriptRuntime`]
//! object API. Recursion is bounded by `max_depth` in both directions.

use std::sync::Arc;

use modbridge_sdk::{
    ConversionError, DynamicValue, ObjectKind, ScriptRuntime, ScriptValue, TypeTag, ValueCodec,
};

/// Default maximum nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Structural codec between [`DynamicValue`] and [`ScriptValue`].
///
/// Script → native rules:
/// - `undefined` and `null` become `Null`, but only for the `Any` hint
/// - scalars must match the hint exactly (no coercion)
/// - arrays become sequences, plain and host objects become mappings;
///   properties reading as `undefined` are skipped
/// - functions and promises are never converted
#[derive(Debug, Clone, Copy)]
pub struct DefaultCodec {
    max_depth: usize,
}

impl DefaultCodec {
    /// Codec with the default depth limit
    pub fn new() -> Self {
        Self::with_max_depth(DEFAULT_MAX_DEPTH)
    }

    /// Codec with a custom depth limit
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Configured depth limit
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn encode(
        &self,
        rt: &dyn ScriptRuntime,
        value: &DynamicValue,
        depth: usize,
    ) -> Result<ScriptValue, ConversionError> {
        if depth > self.max_depth {
            return Err(ConversionError::MaxDepthExceeded(self.max_depth));
        }

        Ok(match value {
            DynamicValue::Null => ScriptValue::Null,
            DynamicValue::Bool(b) => ScriptValue::Bool(*b),
            DynamicValue::Number(n) => ScriptValue::Number(*n),
            DynamicValue::String(s) => ScriptValue::String(Arc::from(s.as_str())),
            DynamicValue::Array(items) => {
                let converted = items
                    .iter()
                    .map(|item| self.encode(rt, item, depth + 1))
                    .collect::<Result<Vec<_>, _>>()?;
                ScriptValue::Object(rt.create_array(converted))
            }
            DynamicValue::Object(map) => {
                let object = rt.create_object();
                for (key, item) in map {
                    let converted = self.encode(rt, item, depth + 1)?;
                    rt.set_property(object, key, converted)?;
                }
                ScriptValue::Object(object)
            }
        })
    }

    fn decode(
        &self,
        rt: &dyn ScriptRuntime,
        value: &ScriptValue,
        hint: TypeTag,
        depth: usize,
    ) -> Result<DynamicValue, ConversionError> {
        if depth > self.max_depth {
            return Err(ConversionError::MaxDepthExceeded(self.max_depth));
        }

        let mismatch = |got: &'static str| ConversionError::TypeMismatch {
            expected: hint,
            got,
        };

        match (value, hint) {
            (ScriptValue::Undefined | ScriptValue::Null, TypeTag::Any) => Ok(DynamicValue::Null),
            (ScriptValue::Bool(b), TypeTag::Any | TypeTag::Boolean) => Ok(DynamicValue::Bool(*b)),
            (ScriptValue::Number(n), TypeTag::Any | TypeTag::Number) => {
                Ok(DynamicValue::Number(*n))
            }
            (ScriptValue::String(s), TypeTag::Any | TypeTag::String) => {
                Ok(DynamicValue::String(s.to_string()))
            }
            (ScriptValue::Object(handle), _) => {
                let handle = *handle;
                match (rt.kind_of(handle)?, hint) {
                    (ObjectKind::Array, TypeTag::Any | TypeTag::Array) => {
                        let items = rt
                            .array_elements(handle)?
                            .iter()
                            .map(|item| self.decode(rt, item, TypeTag::Any, depth + 1))
                            .collect::<Result<Vec<_>, _>>()?;
                        Ok(DynamicValue::Array(items))
                    }
                    (ObjectKind::Plain | ObjectKind::Host, TypeTag::Any | TypeTag::Object) => {
                        let mut map = std::collections::BTreeMap::new();
                        for name in rt.property_names(handle)? {
                            let item = rt.get_property(handle, &name)?;
                            if item.is_undefined() {
                                continue;
                            }
                            let converted =
                                self.decode(rt, &item, TypeTag::Any, depth + 1)?;
                            map.insert(name, converted);
                        }
                        Ok(DynamicValue::Object(map))
                    }
                    (ObjectKind::Function, TypeTag::Any) => {
                        Err(ConversionError::Unconvertible("function"))
                    }
                    (ObjectKind::Promise, TypeTag::Any) => {
                        Err(ConversionError::Unconvertible("promise"))
                    }
                    (kind, _) => Err(mismatch(kind.name())),
                }
            }
            (other, _) => Err(mismatch(other.type_name())),
        }
    }
}

impl Default for DefaultCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ValueCodec for DefaultCodec {
    fn to_script(
        &self,
        rt: &dyn ScriptRuntime,
        value: &DynamicValue,
    ) -> Result<ScriptValue, ConversionError> {
        self.encode(rt, value, 0)
    }

    fn to_native(
        &self,
        rt: &dyn ScriptRuntime,
        value: &ScriptValue,
        hint: TypeTag,
    ) -> Result<DynamicValue, ConversionError> {
        self.decode(rt, value, hint, 0)
    }
}
