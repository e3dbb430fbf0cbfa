//! Method descriptors
//!
//! A [`MethodDescriptor`] is the immutable record of one exported function.
//! The only mutable part is the per-runtime cache of the script function
//! built from it.

use std::fmt;

use modbridge_sdk::{ObjectHandle, RuntimeId, TypeTag};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::arena::CallbackId;

/// Metadata describing one exported native function
pub struct MethodDescriptor {
    name: String,
    arity: usize,
    is_async: bool,
    parameter_types: Vec<TypeTag>,
    callback: CallbackId,
    functions: Mutex<FxHashMap<RuntimeId, ObjectHandle>>,
}

impl MethodDescriptor {
    /// Build a descriptor.
    ///
    /// `parameter_types` is truncated or padded with [`TypeTag::Any`] so it
    /// always has exactly `arity` entries.
    pub fn new(
        name: impl Into<String>,
        arity: usize,
        is_async: bool,
        mut parameter_types: Vec<TypeTag>,
        callback: CallbackId,
    ) -> Self {
        parameter_types.resize(arity, TypeTag::Any);
        Self {
            name: name.into(),
            arity,
            is_async,
            parameter_types,
            callback,
            functions: Mutex::new(FxHashMap::default()),
        }
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared argument count
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Whether calls return a promise
    pub fn is_async(&self) -> bool {
        self.is_async
    }

    /// Per-argument conversion hints
    pub fn parameter_types(&self) -> &[TypeTag] {
        &self.parameter_types
    }

    /// Arena handle of the native callback
    pub fn callback(&self) -> CallbackId {
        self.callback
    }

    /// Script function already built for `runtime`, if any
    pub fn cached_function(&self, runtime: RuntimeId) -> Option<ObjectHandle> {
        self.functions.lock().get(&runtime).copied()
    }

    pub(crate) fn cache_function(&self, function: ObjectHandle) -> ObjectHandle {
        *self
            .functions
            .lock()
            .entry(function.runtime())
            .or_insert(function)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("is_async", &self.is_async)
            .field("parameter_types", &self.parameter_types)
            .field("callback", &self.callback)
            .finish()
    }
}
