//! Error types shared across the bridge boundary

use crate::types::TypeTag;

/// Result type for native callbacks
pub type NativeResult<T> = Result<T, NativeError>;

/// Failure raised by a native callback.
///
/// Whatever the variant, the script side sees the `Display` text as the
/// message of the thrown error or rejected promise.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NativeError {
    /// The callback rejected an argument that passed type conversion
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The callback panicked; carries the panic message
    #[error("native function panicked: {0}")]
    Panic(String),

    /// Any other failure reported by the callback
    #[error("{0}")]
    Failed(String),
}

impl From<String> for NativeError {
    fn from(s: String) -> Self {
        NativeError::Failed(s)
    }
}

impl From<&str> for NativeError {
    fn from(s: &str) -> Self {
        NativeError::Failed(s.to_string())
    }
}

/// An exception as the script engine sees it.
///
/// `name` follows the engine convention (`Error`, `TypeError`, ...).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{name}: {message}")]
pub struct ScriptError {
    /// Error constructor name
    pub name: String,
    /// Human readable message
    pub message: String,
}

impl ScriptError {
    /// Create an error with an explicit constructor name
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Plain `Error`
    pub fn error(message: impl Into<String>) -> Self {
        Self::new("Error", message)
    }

    /// `TypeError`
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    /// `RangeError`
    pub fn range_error(message: impl Into<String>) -> Self {
        Self::new("RangeError", message)
    }
}

/// Errors produced by a value codec.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConversionError {
    /// The value does not have the shape the type hint asks for
    #[error("expected {expected}, got {got}")]
    TypeMismatch {
        /// Requested type
        expected: TypeTag,
        /// Script-side type name of the offending value
        got: &'static str,
    },

    /// Value kind that never crosses the boundary (functions, promises)
    #[error("{0} values cannot be converted")]
    Unconvertible(&'static str),

    /// Nesting exceeded the configured depth
    #[error("maximum conversion depth ({0}) exceeded")]
    MaxDepthExceeded(usize),

    /// The runtime rejected an operation while converting
    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Returned by a call invoker whose engine thread is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("script runtime is no longer accepting jobs")]
pub struct InvokerClosed;

/// Errors raised by a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DispatchError {
    /// The dispatcher has been shut down
    #[error("dispatcher '{0}' has been shut down")]
    Closed(String),

    /// The job queue is full
    #[error("dispatcher '{0}' queue is full")]
    QueueFull(String),
}
