//! Value codec interface
//!
//! Converts between [`DynamicValue`] (native) and [`ScriptValue`] (engine).
//! The bridge only consumes this trait; implementations decide how deep
//! structures may nest and how loosely hints are applied.

use crate::error::ConversionError;
use crate::runtime::{ScriptRuntime, ScriptValue};
use crate::types::TypeTag;
use crate::value::DynamicValue;

/// Bidirectional converter across the runtime boundary.
pub trait ValueCodec: Send + Sync {
    /// Native → script. Allocates in `rt` for arrays and objects.
    fn to_script(
        &self,
        rt: &dyn ScriptRuntime,
        value: &DynamicValue,
    ) -> Result<ScriptValue, ConversionError>;

    /// Script → native, using `hint` to validate the shape.
    fn to_native(
        &self,
        rt: &dyn ScriptRuntime,
        value: &ScriptValue,
        hint: TypeTag,
    ) -> Result<DynamicValue, ConversionError>;
}
