//! Modbridge SDK - Lightweight types for exposing native modules to scripts
//!
//! This crate provides the minimal types and traits shared by the bridge core,
//! script runtime adapters and native module authors, without depending on
//! the bridge implementation.
//!
//! # Example
//!
//! ```ignore
//! use modbridge_sdk::{DynamicValue, NativeCallback, TypeTag};
//!
//! let add = NativeCallback::sync(|args| {
//!     let a = args[0].as_f64().unwrap_or_default();
//!     let b = args[1].as_f64().unwrap_or_default();
//!     Ok(DynamicValue::Number(a + b))
//! });
//! registry.register_function("add", 2, vec![TypeTag::Number; 2], add)?;
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod function;
pub mod promise;
pub mod runtime;
pub mod types;
pub mod value;

pub use codec::ValueCodec;
pub use dispatch::{Dispatcher, InlineDispatcher, Job};
pub use error::{
    ConversionError, DispatchError, InvokerClosed, NativeError, NativeResult, ScriptError,
};
pub use function::{AsyncFunctionBody, NativeCallback, SyncFunctionBody};
pub use promise::Promise;
pub use runtime::{
    CallInvoker, EngineJob, HostFunction, HostObject, ObjectHandle, ObjectKind, RuntimeId,
    ScriptRuntime, ScriptValue,
};
pub use types::TypeTag;
pub use value::DynamicValue;
