//! Bridge error taxonomy
//!
//! Everything inside the bridge returns `BridgeResult`. Errors become script
//! exceptions only at the engine boundary, via [`BridgeError::into_script_error`].

use modbridge_sdk::{ConversionError, DispatchError, RuntimeId, ScriptError, TypeTag};

/// Result type for bridge operations
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised by the bridge
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BridgeError {
    /// Constants payload was not object-shaped
    #[error("Malformed constants for module '{module}': expected an object, got {got}")]
    MalformedConstants {
        /// Module name
        module: String,
        /// What was supplied instead
        got: String,
    },

    /// Script code tried to write a property
    #[error("Cannot override the host object for module '{module}' (property '{property}')")]
    ImmutableModule {
        /// Module name
        module: String,
        /// Property that was written
        property: String,
    },

    /// Call with the wrong number of arguments
    #[error("{function}() expects {expected} argument(s), received {received}")]
    ArityMismatch {
        /// Function name
        function: String,
        /// Declared arity
        expected: usize,
        /// Supplied argument count
        received: usize,
    },

    /// An argument could not be converted to its declared type
    #[error("{function}(): argument {index} cannot be converted to {expected}: {reason}")]
    ArgumentType {
        /// Function name
        function: String,
        /// Zero-based argument position
        index: usize,
        /// Declared parameter type
        expected: TypeTag,
        /// Codec diagnostic
        reason: String,
    },

    /// The native callback failed
    #[error("{function}() failed: {message}")]
    NativeInvocation {
        /// Function name
        function: String,
        /// Native error description
        message: String,
    },

    /// Function registered with an empty name
    #[error("Function name must not be empty (module '{0}')")]
    InvalidFunctionName(String),

    /// Duplicate registration under the `reject` policy
    #[error("Function '{function}' is already registered on module '{module}'")]
    DuplicateFunction {
        /// Module name
        module: String,
        /// Function name
        function: String,
    },

    /// A module host already holds a module with this name
    #[error("Module '{0}' is already registered")]
    DuplicateModule(String),

    /// The registry was dropped while script references survived
    #[error("Module '{0}' has been released")]
    ModuleReleased(String),

    /// Host object requested from a runtime other than the one it lives in
    #[error("Module '{module}' is bound to {bound}, not {requested}")]
    RuntimeMismatch {
        /// Module name
        module: String,
        /// Runtime holding the host object
        bound: RuntimeId,
        /// Runtime that asked
        requested: RuntimeId,
    },

    /// Codec failure outside argument marshaling
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// Async call could not be scheduled
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The runtime raised an error
    #[error(transparent)]
    Script(#[from] ScriptError),
}

impl BridgeError {
    /// Error class name visible to script code
    pub fn script_name(&self) -> &'static str {
        match self {
            BridgeError::MalformedConstants { .. } => "MalformedConstantsError",
            BridgeError::ImmutableModule { .. } => "ImmutableModuleError",
            BridgeError::ArityMismatch { .. } => "ArityMismatchError",
            BridgeError::ArgumentType { .. } => "ArgumentTypeError",
            BridgeError::NativeInvocation { .. } => "NativeInvocationError",
            BridgeError::ModuleReleased(_) => "ModuleReleasedError",
            BridgeError::Conversion(_) => "TypeError",
            _ => "Error",
        }
    }

    /// Convert into the exception handed to the engine
    pub fn into_script_error(self) -> ScriptError {
        match self {
            BridgeError::Script(error) => error,
            other => ScriptError::new(other.script_name(), other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_error_carries_class_name() {
        let err = BridgeError::ArityMismatch {
            function: "add".to_string(),
            expected: 2,
            received: 1,
        }
        .into_script_error();
        assert_eq!(err.name, "ArityMismatchError");
        assert_eq!(err.message, "add() expects 2 argument(s), received 1");
    }

    #[test]
    fn test_script_error_passthrough() {
        let original = ScriptError::type_error("x is not a function");
        let err = BridgeError::from(original.clone()).into_script_error();
        assert_eq!(err, original);
    }

    #[test]
    fn test_immutable_module_message_names_property() {
        let err = BridgeError::ImmutableModule {
            module: "Clipboard".to_string(),
            property: "copy".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Clipboard"));
        assert!(msg.contains("'copy'"));
    }
}
