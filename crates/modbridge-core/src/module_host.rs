//! Module host
//!
//! Groups several [`ModuleRegistry`]s behind one script object, typically
//! installed as a global (`NativeModules.Clipboard.copy(...)`). Reading a
//! module name yields that module's own host object, built on demand.

use std::fmt;
use std::sync::{Arc, Weak};

use modbridge_sdk::{
    Dispatcher, HostObject, ObjectHandle, ScriptError, ScriptRuntime, ScriptValue,
};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::ModuleRegistry;

struct HostInner {
    name: String,
    config: BridgeConfig,
    dispatcher: Arc<dyn Dispatcher>,
    modules: RwLock<FxHashMap<String, ModuleRegistry>>,
    host_object: OnceCell<ObjectHandle>,
}

impl HostInner {
    fn module_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.read().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Named collection of native modules exposed as one script object
#[derive(Clone)]
pub struct ModuleHost {
    inner: Arc<HostInner>,
}

impl ModuleHost {
    /// Host with default configuration
    pub fn new(name: impl Into<String>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self::with_config(name, BridgeConfig::default(), dispatcher)
    }

    /// Host whose modules are created from `config`
    pub fn with_config(
        name: impl Into<String>,
        config: BridgeConfig,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        Self {
            inner: Arc::new(HostInner {
                name: name.into(),
                config,
                dispatcher,
                modules: RwLock::new(FxHashMap::default()),
                host_object: OnceCell::new(),
            }),
        }
    }

    /// Host name; also the global [`install`](Self::install) defines
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Create a module with the host's config and dispatcher and register it
    pub fn create_module(&self, name: impl Into<String>) -> BridgeResult<ModuleRegistry> {
        let registry =
            ModuleRegistry::with_config(name, &self.inner.config, self.inner.dispatcher.clone());
        self.register_module(registry.clone())?;
        Ok(registry)
    }

    /// Add an existing module. Names must be unique within the host.
    pub fn register_module(&self, registry: ModuleRegistry) -> BridgeResult<()> {
        let mut modules = self.inner.modules.write();
        if modules.contains_key(registry.name()) {
            return Err(BridgeError::DuplicateModule(registry.name().to_string()));
        }
        tracing::debug!(host = %self.inner.name, module = registry.name(), "module registered");
        modules.insert(registry.name().to_string(), registry);
        Ok(())
    }

    /// Look up a module by name
    pub fn module(&self, name: &str) -> Option<ModuleRegistry> {
        self.inner.modules.read().get(name).cloned()
    }

    /// Registered module names, sorted
    pub fn module_names(&self) -> Vec<String> {
        self.inner.module_names()
    }

    /// The host's script object, built once
    pub fn get_script_object(&self, rt: &dyn ScriptRuntime) -> BridgeResult<ObjectHandle> {
        let handle = *self.inner.host_object.get_or_init(|| {
            let table = Arc::new(ModuleTable {
                host: Arc::downgrade(&self.inner),
                name: self.inner.name.clone(),
            });
            rt.create_host_object(table)
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

    /// Define the host object as a global named after the host
    pub fn install(&self, rt: &dyn ScriptRuntime) -> BridgeResult<ObjectHandle> {
        let handle = self.get_script_object(rt)?;
        rt.set_property(rt.global(), &self.inner.name, ScriptValue::Object(handle))?;
        tracing::debug!(host = %self.inner.name, runtime = %rt.id(), "module host installed");
        Ok(handle)
    }
}

impl fmt::Debug for ModuleHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleHost")
            .field("name", &self.inner.name)
            .field("modules", &self.inner.module_names())
            .finish()
    }
}

struct ModuleTable {
    host: Weak<HostInner>,
    name: String,
}

impl ModuleTable {
    fn read(&self, rt: &dyn ScriptRuntime, name: &str) -> BridgeResult<ScriptValue> {
        let host = self
            .host
            .upgrade()
            .ok_or_else(|| BridgeError::ModuleReleased(self.name.clone()))?;
        let module = host.modules.read().get(name).cloned();
        match module {
            Some(module) => Ok(ScriptValue::Object(module.get_script_object(rt)?)),
            None => Ok(ScriptValue::Undefined),
        }
    }
}

impl HostObject for ModuleTable {
    fn get(&self, rt: &dyn ScriptRuntime, name: &str) -> Result<ScriptValue, ScriptError> {
        self.read(rt, name).map_err(BridgeError::into_script_error)
    }

    fn set(
        &self,
        _rt: &dyn ScriptRuntime,
        name: &str,
        _value: &ScriptValue,
    ) -> Result<(), ScriptError> {
        Err(BridgeError::ImmutableModule {
            module: self.name.clone(),
            property: name.to_string(),
        }
        .into_script_error())
    }

    fn property_names(&self, _rt: &dyn ScriptRuntime) -> Vec<String> {
        self.host
            .upgrade()
            .map(|host| host.module_names())
            .unwrap_or_default()
    }
}
