//! In-memory script runtime
//!
//! `HeapRuntime` implements [`ScriptRuntime`] over a plain object heap: plain
//! objects, arrays, native-backed functions, promises and host objects, plus
//! a job queue that plays the role of the engine thread's event loop. It has
//! no parser and no interpreter; "script code" is whatever the embedder does
//! through the runtime API (`evaluate_path`, `call_path`, `call`, ...).
//!
//! The runtime is `!Send`: it lives on one thread, which is the engine thread
//! for everything the bridge does with it.

#![warn(missing_docs)]

mod invoker;
mod object;

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError};
use modbridge_sdk::{
    CallInvoker, EngineJob, HostFunction, HostObject, ObjectHandle, ObjectKind, RuntimeId,
    ScriptError, ScriptRuntime, ScriptValue,
};

use crate::invoker::QueueInvoker;
use crate::object::{HeapObject, PropertyRead};

pub use crate::object::PromiseState;

/// Single-threaded in-memory script runtime.
pub struct HeapRuntime {
    id: RuntimeId,
    heap: RefCell<Vec<HeapObject>>,
    global: ObjectHandle,
    jobs: Receiver<EngineJob>,
    invoker: Arc<QueueInvoker>,
}

impl HeapRuntime {
    /// Create a runtime with an empty global object
    pub fn new() -> Self {
        let id = RuntimeId::next();
        let (tx, rx) = channel::unbounded();
        let runtime = Self {
            id,
            heap: RefCell::new(vec![HeapObject::Plain(BTreeMap::new())]),
            global: ObjectHandle::new(id, 0),
            jobs: rx,
            invoker: Arc::new(QueueInvoker::new(tx)),
        };
        tracing::trace!(runtime = %id, "heap runtime created");
        runtime
    }

    /// Number of live heap objects (global included)
    pub fn heap_size(&self) -> usize {
        self.heap.borrow().len()
    }

    fn alloc(&self, object: HeapObject) -> ObjectHandle {
        let mut heap = self.heap.borrow_mut();
        heap.push(object);
        ObjectHandle::new(self.id, (heap.len() - 1) as u64)
    }

    fn slot(&self, handle: ObjectHandle) -> Result<usize, ScriptError> {
        if handle.runtime() != self.id {
            return Err(ScriptError::error(format!(
                "object belongs to {}, not {}",
                handle.runtime(),
                self.id
            )));
        }
        let slot = handle.slot() as usize;
        if slot >= self.heap.borrow().len() {
            return Err(ScriptError::error(format!("dangling object handle {}", slot)));
        }
        Ok(slot)
    }

    fn with_object<R>(
        &self,
        handle: ObjectHandle,
        f: impl FnOnce(&mut HeapObject) -> R,
    ) -> Result<R, ScriptError> {
        let slot = self.slot(handle)?;
        let mut heap = self.heap.borrow_mut();
        Ok(f(&mut heap[slot]))
    }

    // ========================================================================
    // Job queue
    // ========================================================================

    /// Run every job queued through the call invoker so far.
    ///
    /// Returns the number of jobs run.
    pub fn run_pending_jobs(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.jobs.try_recv() {
            job(self as &dyn ScriptRuntime);
            ran += 1;
        }
        ran
    }

    /// Drain jobs until `promise` settles or `timeout` elapses.
    pub fn wait_for_promise(
        &self,
        promise: ObjectHandle,
        timeout: Duration,
    ) -> Result<PromiseState, ScriptError> {
        let deadline = Instant::now() + timeout;
        loop {
            let state = self.promise_state(promise)?;
            if !state.is_pending() {
                return Ok(state);
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.jobs.recv_timeout(remaining) {
                Ok(job) => job(self as &dyn ScriptRuntime),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(ScriptError::error("timed out waiting for promise"))
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(ScriptError::error("job queue disconnected"))
                }
            }
        }
    }

    /// Current state of a promise
    pub fn promise_state(&self, promise: ObjectHandle) -> Result<PromiseState, ScriptError> {
        self.with_object(promise, |object| match object {
            HeapObject::Promise(state) => Ok(state.clone()),
            other => Err(ScriptError::type_error(format!(
                "{} is not a promise",
                other.kind().name()
            ))),
        })?
    }

    // ========================================================================
    // Script-like helpers
    // ========================================================================

    /// Resolve a dotted property path starting at the global object,
    /// e.g. `"NativeModules.Test.answer"`.
    pub fn evaluate_path(&self, path: &str) -> Result<ScriptValue, ScriptError> {
        let mut current = ScriptValue::Object(self.global);
        for segment in path.split('.') {
            let object = current.as_object().ok_or_else(|| {
                ScriptError::type_error(format!(
                    "Cannot read property '{}' of {}",
                    segment,
                    current.type_name()
                ))
            })?;
            current = self.get_property(object, segment)?;
        }
        Ok(current)
    }

    /// Call the function at a dotted path with its parent as `this`.
    pub fn call_path(&self, path: &str, args: &[ScriptValue]) -> Result<ScriptValue, ScriptError> {
        let (this, name) = match path.rsplit_once('.') {
            Some((parent, name)) => (self.evaluate_path(parent)?, name),
            None => (ScriptValue::Object(self.global), path),
        };
        let this_object = this.as_object().ok_or_else(|| {
            ScriptError::type_error(format!("Cannot read property '{}' of {}", name, this.type_name()))
        })?;
        let callee = self.get_property(this_object, name)?;
        match callee.as_object() {
            Some(function) => self.call(function, this, args),
            None => Err(ScriptError::type_error(format!("{} is not a function", path))),
        }
    }

    /// `typeof value`
    pub fn type_of(&self, value: &ScriptValue) -> Result<&'static str, ScriptError> {
        match value {
            ScriptValue::Null => Ok("object"),
            ScriptValue::Object(handle) => Ok(match self.kind_of(*handle)? {
                ObjectKind::Function => "function",
                _ => "object",
            }),
            other => Ok(other.type_name()),
        }
    }

    /// `name in object`, consulting enumeration for host objects
    pub fn has_property(&self, object: ObjectHandle, name: &str) -> Result<bool, ScriptError> {
        Ok(self.property_names(object)?.iter().any(|n| n == name))
    }
}

impl Default for HeapRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRuntime for HeapRuntime {
    fn id(&self) -> RuntimeId {
        self.id
    }

    fn global(&self) -> ObjectHandle {
        self.global
    }

    fn create_object(&self) -> ObjectHandle {
        self.alloc(HeapObject::Plain(BTreeMap::new()))
    }

    fn create_array(&self, items: Vec<ScriptValue>) -> ObjectHandle {
        self.alloc(HeapObject::Array(items))
    }

    fn create_host_object(&self, host: Arc<dyn HostObject>) -> ObjectHandle {
        self.alloc(HeapObject::Host(host))
    }

    fn create_function(&self, name: &str, length: usize, body: HostFunction) -> ObjectHandle {
        self.alloc(HeapObject::Function {
            name: name.to_string(),
            length,
            body: Rc::new(body),
        })
    }

    fn kind_of(&self, object: ObjectHandle) -> Result<ObjectKind, ScriptError> {
        self.with_object(object, |object| object.kind())
    }

    fn get_property(&self, object: ObjectHandle, name: &str) -> Result<ScriptValue, ScriptError> {
        // Host callbacks run after the heap borrow is released; they allocate.
        let read = self.with_object(object, |object| match object {
            HeapObject::Plain(props) => {
                PropertyRead::Value(props.get(name).cloned().unwrap_or_default())
            }
            HeapObject::Array(items) => PropertyRead::Value(match name {
                "length" => ScriptValue::Number(items.len() as f64),
                _ => name
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get(i).cloned())
                    .unwrap_or_default(),
            }),
            HeapObject::Function { name: fname, length, .. } => PropertyRead::Value(match name {
                "name" => ScriptValue::from(fname.as_str()),
                "length" => ScriptValue::Number(*length as f64),
                _ => ScriptValue::Undefined,
            }),
            HeapObject::Promise(_) => PropertyRead::Value(ScriptValue::Undefined),
            HeapObject::Host(host) => PropertyRead::Host(host.clone()),
        })?;
        match read {
            PropertyRead::Value(value) => Ok(value),
            PropertyRead::Host(host) => host.get(self, name),
        }
    }

    fn set_property(
        &self,
        object: ObjectHandle,
        name: &str,
        value: ScriptValue,
    ) -> Result<(), ScriptError> {
        let host = self.with_object(object, |object| match object {
            HeapObject::Plain(props) => {
                props.insert(name.to_string(), value.clone());
                Ok(None)
            }
            HeapObject::Array(items) => match name.parse::<usize>() {
                Ok(i) => {
                    if i >= items.len() {
                        items.resize(i + 1, ScriptValue::Undefined);
                    }
                    items[i] = value.clone();
                    Ok(None)
                }
                Err(_) => Err(ScriptError::type_error(format!(
                    "Cannot set property '{}' on array",
                    name
                ))),
            },
            HeapObject::Host(host) => Ok(Some(host.clone())),
            other => Err(ScriptError::type_error(format!(
                "Cannot set property '{}' on {}",
                name,
                other.kind().name()
            ))),
        })??;
        match host {
            Some(host) => host.set(self, name, &value),
            None => Ok(()),
        }
    }

    fn property_names(&self, object: ObjectHandle) -> Result<Vec<String>, ScriptError> {
        let host = self.with_object(object, |object| match object {
            HeapObject::Plain(props) => Ok(props.keys().cloned().collect()),
            HeapObject::Array(items) => Ok((0..items.len()).map(|i| i.to_string()).collect()),
            HeapObject::Host(host) => Err(host.clone()),
            _ => Ok(Vec::new()),
        })?;
        match host {
            Ok(names) => Ok(names),
            Err(host) => Ok(host.property_names(self)),
        }
    }

    fn array_elements(&self, array: ObjectHandle) -> Result<Vec<ScriptValue>, ScriptError> {
        self.with_object(array, |object| match object {
            HeapObject::Array(items) => Ok(items.clone()),
            other => Err(ScriptError::type_error(format!(
                "{} is not an array",
                other.kind().name()
            ))),
        })?
    }

    fn call(
        &self,
        function: ObjectHandle,
        this: ScriptValue,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError> {
        let body = self.with_object(function, |object| match object {
            HeapObject::Function { body, .. } => Ok(body.clone()),
            other => Err(ScriptError::type_error(format!(
                "{} is not a function",
                other.kind().name()
            ))),
        })??;
        body(self as &dyn ScriptRuntime, &this, args)
    }

    fn create_promise(&self) -> ObjectHandle {
        self.alloc(HeapObject::Promise(PromiseState::Pending))
    }

    fn settle_promise(
        &self,
        promise: ObjectHandle,
        outcome: Result<ScriptValue, ScriptError>,
    ) -> Result<(), ScriptError> {
        self.with_object(promise, |object| match object {
            HeapObject::Promise(state) if state.is_pending() => {
                *state = match outcome {
                    Ok(value) => PromiseState::Fulfilled(value),
                    Err(error) => PromiseState::Rejected(error),
                };
                Ok(())
            }
            HeapObject::Promise(_) => Err(ScriptError::error("promise already settled")),
            other => Err(ScriptError::type_error(format!(
                "{} is not a promise",
                other.kind().name()
            ))),
        })?
    }

    fn call_invoker(&self) -> Arc<dyn CallInvoker> {
        self.invoker.clone()
    }
}
