//! Module registry
//!
//! A [`ModuleRegistry`] holds everything one native module exposes to script
//! code: a constant table, method descriptors and the callback arena that
//! owns the native callbacks. The script-visible object is built lazily on
//! the first [`ModuleRegistry::get_script_object`] call and never rebuilt.
//!
//! # Example
//!
//! ```ignore
//! let registry = ModuleRegistry::new("Clipboard", Arc::new(InlineDispatcher));
//! registry.export_constants(DynamicValue::object([("maxLength", 4096.into())]))?;
//! registry.register_sync_function("length", vec![TypeTag::String], |args| {
//!     Ok(DynamicValue::Number(args[0].as_str().unwrap_or_default().len() as f64))
//! })?;
//! let object = registry.get_script_object(&runtime)?;
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use modbridge_sdk::{
    Dispatcher, DynamicValue, NativeCallback, NativeResult, ObjectHandle, Promise, ScriptRuntime,
    ScriptValue, TypeTag, ValueCodec,
};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::arena::{CallbackArena, CallbackId};
use crate::callable;
use crate::codec::DefaultCodec;
use crate::config::{BridgeConfig, DuplicatePolicy};
use crate::descriptor::MethodDescriptor;
use crate::error::{BridgeError, BridgeResult};
use crate::host_object::ModuleHostObject;

/// Shared state behind a [`ModuleRegistry`].
///
/// Host objects and script functions keep only weak references to it.
pub(crate) struct ModuleInner {
    pub(crate) name: String,
    constants: RwLock<FxHashMap<String, DynamicValue>>,
    methods: RwLock<FxHashMap<String, Arc<MethodDescriptor>>>,
    callbacks: RwLock<CallbackArena>,
    host_object: OnceCell<ObjectHandle>,
    pub(crate) codec: Arc<dyn ValueCodec>,
    pub(crate) dispatcher: Arc<dyn Dispatcher>,
    duplicate_policy: DuplicatePolicy,
}

impl ModuleInner {
    pub(crate) fn callback(&self, id: CallbackId) -> Option<NativeCallback> {
        self.callbacks.read().get(id).cloned()
    }

    pub(crate) fn property_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.methods.read().keys().cloned().collect();
        names.extend(self.constants.read().keys().cloned());
        names.into_iter().collect()
    }

    /// Resolve a property read: constants first, then methods.
    pub(crate) fn read_property(
        self: &Arc<Self>,
        rt: &dyn ScriptRuntime,
        name: &str,
    ) -> BridgeResult<ScriptValue> {
        tracing::trace!(module = %self.name, property = name, "property read");

        let constant = self.constants.read().get(name).cloned();
        if let Some(value) = constant {
            return Ok(self.codec.to_script(rt, &value)?);
        }

        let method = self.methods.read().get(name).cloned();
        match method {
            Some(descriptor) => Ok(ScriptValue::Object(callable::script_function(
                self,
                rt,
                &descriptor,
            ))),
            None => Ok(ScriptValue::Undefined),
        }
    }
}

/// Registry of one native module's constants and functions.
///
/// Cloning is cheap and yields another handle to the same module.
#[derive(Clone)]
pub struct ModuleRegistry {
    inner: Arc<ModuleInner>,
}

impl ModuleRegistry {
    /// Registry with the default codec and the `keep-first` duplicate policy
    pub fn new(name: impl Into<String>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self::builder(name, dispatcher).build()
    }

    /// Registry configured from a [`BridgeConfig`]
    pub fn with_config(
        name: impl Into<String>,
        config: &BridgeConfig,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self::builder(name, dispatcher)
            .codec(Arc::new(DefaultCodec::with_max_depth(config.codec.max_depth)))
            .duplicate_policy(config.registration.duplicate_policy)
            .build()
    }

    /// Start building a registry
    pub fn builder(
        name: impl Into<String>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> ModuleRegistryBuilder {
        ModuleRegistryBuilder {
            name: name.into(),
            dispatcher,
            codec: None,
            duplicate_policy: DuplicatePolicy::default(),
        }
    }

    /// Module name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Active duplicate registration policy
    pub fn duplicate_policy(&self) -> DuplicatePolicy {
        self.inner.duplicate_policy
    }

    // ========================================================================
    // Constants
    // ========================================================================

    /// Copy every entry of an object-shaped value into the constant table.
    ///
    /// Anything other than an object fails with `MalformedConstants` and
    /// leaves the table untouched.
    pub fn export_constants(&self, constants: DynamicValue) -> BridgeResult<()> {
        let entries = constants
            .into_object()
            .map_err(|other| BridgeError::MalformedConstants {
                module: self.inner.name.clone(),
                got: other.type_name().to_string(),
            })?;

        let count = entries.len();
        self.inner.constants.write().extend(entries);
        tracing::debug!(module = %self.inner.name, count, "constants exported");
        Ok(())
    }

    /// Export constants from JSON text
    pub fn export_constants_json(&self, json: &str) -> BridgeResult<()> {
        let value = DynamicValue::from_json_str(json).map_err(|e| BridgeError::MalformedConstants {
            module: self.inner.name.clone(),
            got: format!("invalid JSON ({})", e),
        })?;
        self.export_constants(value)
    }

    /// Export a single constant
    pub fn export_constant(&self, name: impl Into<String>, value: impl Into<DynamicValue>) {
        let name = name.into();
        tracing::debug!(module = %self.inner.name, constant = %name, "constant exported");
        self.inner.constants.write().insert(name, value.into());
    }

    // ========================================================================
    // Functions
    // ========================================================================

    /// Register a function.
    ///
    /// Sync or async is taken from the callback shape. `parameter_types` is
    /// fitted to `arity` (extra entries dropped, missing ones are `Any`).
    /// A name that is already registered is handled per the duplicate policy;
    /// see [`DuplicatePolicy::Replace`] for what replacing retains.
    pub fn register_function(
        &self,
        name: impl Into<String>,
        arity: usize,
        parameter_types: Vec<TypeTag>,
        callback: NativeCallback,
    ) -> BridgeResult<()> {
        let name = name.into();
        if name.is_empty() {
            return Err(BridgeError::InvalidFunctionName(self.inner.name.clone()));
        }

        let mut methods = self.inner.methods.write();
        if methods.contains_key(&name) {
            match self.inner.duplicate_policy {
                DuplicatePolicy::KeepFirst => {
                    tracing::warn!(
                        module = %self.inner.name,
                        function = %name,
                        "function already registered; keeping the first registration"
                    );
                    return Ok(());
                }
                DuplicatePolicy::Reject => {
                    return Err(BridgeError::DuplicateFunction {
                        module: self.inner.name.clone(),
                        function: name,
                    });
                }
                DuplicatePolicy::Replace => {
                    tracing::warn!(
                        module = %self.inner.name,
                        function = %name,
                        "replacing registered function"
                    );
                }
            }
        }

        let is_async = callback.is_async();
        let id = self.inner.callbacks.write().insert(callback);
        tracing::debug!(
            module = %self.inner.name,
            function = %name,
            arity,
            is_async,
            "function registered"
        );
        methods.insert(
            name.clone(),
            Arc::new(MethodDescriptor::new(name, arity, is_async, parameter_types, id)),
        );
        Ok(())
    }

    /// Register a synchronous function; arity is `parameter_types.len()`
    pub fn register_sync_function(
        &self,
        name: impl Into<String>,
        parameter_types: Vec<TypeTag>,
        body: impl Fn(Vec<DynamicValue>) -> NativeResult<DynamicValue> + Send + Sync + 'static,
    ) -> BridgeResult<()> {
        let arity = parameter_types.len();
        self.register_function(name, arity, parameter_types, NativeCallback::sync(body))
    }

    /// Register an asynchronous function; arity is `parameter_types.len()`
    pub fn register_async_function(
        &self,
        name: impl Into<String>,
        parameter_types: Vec<TypeTag>,
        body: impl Fn(Vec<DynamicValue>, Promise) + Send + Sync + 'static,
    ) -> BridgeResult<()> {
        let arity = parameter_types.len();
        self.register_function(name, arity, parameter_types, NativeCallback::asynchronous(body))
    }

    // ========================================================================
    // Script exposure
    // ========================================================================

    /// The module's script-visible object.
    ///
    /// Built on first call and cached; every later call returns the same
    /// handle. Asking from a runtime other than the one the object lives in
    /// fails with `RuntimeMismatch`.
    pub fn get_script_object(&self, rt: &dyn ScriptRuntime) -> BridgeResult<ObjectHandle> {
        let handle = *self.inner.host_object.get_or_init(|| {
            let host = Arc::new(ModuleHostObject::new(&self.inner));
            let handle = rt.create_host_object(host);
            tracing::debug!(module = %self.inner.name, runtime = %rt.id(), "host object created");
            handle
        });

        if handle.runtime() != rt.id() {
            return Err(BridgeError::RuntimeMismatch {
                module: self.inner.name.clone(),
                bound: handle.runtime(),
                requested: rt.id(),
            });
        }
        Ok(handle)
    }

    /// Whether the host object has been created
    pub fn is_exposed(&self) -> bool {
        self.inner.host_object.get().is_some()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Look up a constant
    pub fn constant(&self, name: &str) -> Option<DynamicValue> {
        self.inner.constants.read().get(name).cloned()
    }

    /// Look up a method descriptor
    pub fn method(&self, name: &str) -> Option<Arc<MethodDescriptor>> {
        self.inner.methods.read().get(name).cloned()
    }

    /// Constant names, sorted
    pub fn constant_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.constants.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Method names, sorted
    pub fn method_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.methods.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Names the host object enumerates: methods and constants, sorted,
    /// each listed once
    pub fn property_names(&self) -> Vec<String> {
        self.inner.property_names()
    }
}

impl fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("name", &self.inner.name)
            .field("constants", &self.inner.constants.read().len())
            .field("methods", &self.inner.methods.read().len())
            .field("exposed", &self.is_exposed())
            .finish()
    }
}

/// Builder for [`ModuleRegistry`]
pub struct ModuleRegistryBuilder {
    name: String,
    dispatcher: Arc<dyn Dispatcher>,
    codec: Option<Arc<dyn ValueCodec>>,
    duplicate_policy: DuplicatePolicy,
}

impl ModuleRegistryBuilder {
    /// Use a custom value codec
    pub fn codec(mut self, codec: Arc<dyn ValueCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Set the duplicate registration policy
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Finish building
    pub fn build(self) -> ModuleRegistry {
        let codec = self
            .codec
            .unwrap_or_else(|| Arc::new(DefaultCodec::new()) as Arc<dyn ValueCodec>);
        ModuleRegistry {
            inner: Arc::new(ModuleInner {
                name: self.name,
                constants: RwLock::new(FxHashMap::default()),
                methods: RwLock::new(FxHashMap::default()),
                callbacks: RwLock::new(CallbackArena::new()),
                host_object: OnceCell::new(),
                codec,
                dispatcher: self.dispatcher,
                duplicate_policy: self.duplicate_policy,
            }),
        }
    }
}
