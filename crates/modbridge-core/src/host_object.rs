//! Host object adapter for a module
//!
//! Implements the engine's property protocol over a [`ModuleInner`]:
//! reads delegate to the registry, writes always fail, enumeration lists
//! method and constant names.

use std::sync::{Arc, Weak};

use modbridge_sdk::{HostObject, ScriptError, ScriptRuntime, ScriptValue};

use crate::error::BridgeError;
use crate::registry::ModuleInner;

pub(crate) struct ModuleHostObject {
    module: Weak<ModuleInner>,
    name: String,
}

impl ModuleHostObject {
    pub(crate) fn new(module: &Arc<ModuleInner>) -> Self {
        Self {
            module: Arc::downgrade(module),
            name: module.name.clone(),
        }
    }

    fn module(&self) -> Result<Arc<ModuleInner>, BridgeError> {
        self.module
            .upgrade()
            .ok_or_else(|| BridgeError::ModuleReleased(self.name.clone()))
    }
}

impl HostObject for ModuleHostObject {
    fn get(&self, rt: &dyn ScriptRuntime, name: &str) -> Result<ScriptValue, ScriptError> {
        self.module()
            .and_then(|module| module.read_property(rt, name))
            .map_err(BridgeError::into_script_error)
    }

    fn set(
        &self,
        _rt: &dyn ScriptRuntime,
        name: &str,
        _value: &ScriptValue,
    ) -> Result<(), ScriptError> {
        tracing::debug!(module = %self.name, property = name, "rejected write to module object");
        Err(BridgeError::ImmutableModule {
            module: self.name.clone(),
            property: name.to_string(),
        }
        .into_script_error())
    }

    fn property_names(&self, _rt: &dyn ScriptRuntime) -> Vec<String> {
        self.module
            .upgrade()
            .map(|module| module.property_names())
            .unwrap_or_default()
    }
}
