//! Native callback shapes
//!
//! A synchronous callback returns its result directly; an asynchronous one
//! receives a [`Promise`] continuation and reports completion through it.

use std::fmt;
use std::sync::Arc;

use crate::error::NativeResult;
use crate::promise::Promise;
use crate::value::DynamicValue;

/// Body of a synchronous native function
pub type SyncFunctionBody = dyn Fn(Vec<DynamicValue>) -> NativeResult<DynamicValue> + Send + Sync;

/// Body of an asynchronous native function
pub type AsyncFunctionBody = dyn Fn(Vec<DynamicValue>, Promise) + Send + Sync;

/// Opaque native executable logic behind an exported function.
#[derive(Clone)]
pub enum NativeCallback {
    /// Runs on the engine thread and returns a value
    Sync(Arc<SyncFunctionBody>),
    /// Runs on a dispatcher and settles a promise
    Async(Arc<AsyncFunctionBody>),
}

impl NativeCallback {
    /// Wrap a synchronous body
    pub fn sync(
        body: impl Fn(Vec<DynamicValue>) -> NativeResult<DynamicValue> + Send + Sync + 'static,
    ) -> Self {
        NativeCallback::Sync(Arc::new(body))
    }

    /// Wrap an asynchronous body
    pub fn asynchronous(body: impl Fn(Vec<DynamicValue>, Promise) + Send + Sync + 'static) -> Self {
        NativeCallback::Async(Arc::new(body))
    }

    /// Whether invocation returns a pending result
    pub fn is_async(&self) -> bool {
        matches!(self, NativeCallback::Async(_))
    }
}

impl fmt::Debug for NativeCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NativeCallback::Sync(_) => write!(f, "NativeCallback::Sync"),
            NativeCallback::Async(_) => write!(f, "NativeCallback::Async"),
        }
    }
}
