//! ScriptRuntime trait - abstract script engine operations
//!
//! The bridge never touches a concrete engine. Engines (or engine adapters)
//! implement [`ScriptRuntime`]; the bridge programs against it, the same way
//! native modules program against a VM context without depending on engine
//! internals.
//!
//! # Threading
//!
//! A `ScriptRuntime` is single-threaded: every method is called on the
//! engine's thread. Work produced elsewhere is handed back through the
//! runtime's [`CallInvoker`], which is the only `Send + Sync` piece.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{InvokerClosed, ScriptError};

// ============================================================================
// Handles
// ============================================================================

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one runtime instance.
///
/// Script values are runtime-scoped, so caches of script objects are keyed
/// by this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuntimeId(u64);

impl RuntimeId {
    /// Allocate a fresh, process-unique id
    pub fn next() -> Self {
        RuntimeId(NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw id
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "runtime#{}", self.0)
    }
}

/// Handle to an object living in a runtime's heap.
///
/// Two handles compare equal iff they denote the same script object, which
/// is how object identity is observed from native code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectHandle {
    runtime: RuntimeId,
    slot: u64,
}

impl ObjectHandle {
    /// Create a handle (used by runtime implementations)
    pub const fn new(runtime: RuntimeId, slot: u64) -> Self {
        Self { runtime, slot }
    }

    /// Owning runtime
    pub fn runtime(&self) -> RuntimeId {
        self.runtime
    }

    /// Runtime-specific slot
    pub fn slot(&self) -> u64 {
        self.slot
    }
}

// ============================================================================
// Script values
// ============================================================================

/// A value as held by the script engine.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ScriptValue {
    /// `undefined`; also the "no such property" sentinel
    #[default]
    Undefined,
    /// `null`
    Null,
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// String
    String(Arc<str>),
    /// Any heap object (plain, array, function, promise, host)
    Object(ObjectHandle),
}

impl ScriptValue {
    /// Check for `undefined`
    pub fn is_undefined(&self) -> bool {
        matches!(self, ScriptValue::Undefined)
    }

    /// Get as object handle
    pub fn as_object(&self) -> Option<ObjectHandle> {
        match self {
            ScriptValue::Object(handle) => Some(*handle),
            _ => None,
        }
    }

    /// Get as number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScriptValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ScriptValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// `typeof`-style name; objects report `"object"`
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::Undefined => "undefined",
            ScriptValue::Null => "null",
            ScriptValue::Bool(_) => "boolean",
            ScriptValue::Number(_) => "number",
            ScriptValue::String(_) => "string",
            ScriptValue::Object(_) => "object",
        }
    }
}

impl From<ObjectHandle> for ScriptValue {
    fn from(handle: ObjectHandle) -> Self {
        ScriptValue::Object(handle)
    }
}

impl From<&str> for ScriptValue {
    fn from(s: &str) -> Self {
        ScriptValue::String(Arc::from(s))
    }
}

impl From<f64> for ScriptValue {
    fn from(n: f64) -> Self {
        ScriptValue::Number(n)
    }
}

impl From<bool> for ScriptValue {
    fn from(b: bool) -> Self {
        ScriptValue::Bool(b)
    }
}

/// Kind of a heap object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Ordinary object
    Plain,
    /// Array
    Array,
    /// Callable
    Function,
    /// Promise
    Promise,
    /// Object whose properties are implemented natively
    Host,
}

impl ObjectKind {
    /// Name used in diagnostics
    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Plain => "object",
            ObjectKind::Array => "array",
            ObjectKind::Function => "function",
            ObjectKind::Promise => "promise",
            ObjectKind::Host => "host object",
        }
    }
}

// ============================================================================
// Engine-facing protocols
// ============================================================================

/// Property protocol for natively implemented objects.
///
/// The engine calls these when script code reads, writes or enumerates
/// properties of an object created with [`ScriptRuntime::create_host_object`].
pub trait HostObject: Send + Sync {
    /// Resolve a property read. Unknown names return `Undefined`, not an error.
    fn get(&self, rt: &dyn ScriptRuntime, name: &str) -> Result<ScriptValue, ScriptError>;

    /// Handle a property write
    fn set(&self, rt: &dyn ScriptRuntime, name: &str, value: &ScriptValue) -> Result<(), ScriptError>;

    /// List enumerable property names
    fn property_names(&self, rt: &dyn ScriptRuntime) -> Vec<String>;
}

/// Native body of a script function: `(runtime, this, args) -> value`
pub type HostFunction =
    Box<dyn Fn(&dyn ScriptRuntime, &ScriptValue, &[ScriptValue]) -> Result<ScriptValue, ScriptError>>;

/// Work to run on the engine thread
pub type EngineJob = Box<dyn FnOnce(&dyn ScriptRuntime) + Send>;

/// Thread-safe handle for scheduling work onto the engine thread.
pub trait CallInvoker: Send + Sync {
    /// Queue `job`; it runs later on the engine thread with the runtime.
    fn invoke_async(&self, job: EngineJob) -> Result<(), InvokerClosed>;
}

/// Abstract script runtime.
///
/// This trait is the single entry point for all engine operations the bridge
/// needs: object creation, property access, host objects and functions,
/// promises and the call invoker.
pub trait ScriptRuntime {
    // ========================================================================
    // Identity
    // ========================================================================

    /// Identity of this runtime instance
    fn id(&self) -> RuntimeId;

    /// The global object
    fn global(&self) -> ObjectHandle;

    // ========================================================================
    // Object creation
    // ========================================================================

    /// Allocate an empty plain object
    fn create_object(&self) -> ObjectHandle;

    /// Allocate an array
    fn create_array(&self, items: Vec<ScriptValue>) -> ObjectHandle;

    /// Wrap a native property implementation in a script object
    fn create_host_object(&self, host: Arc<dyn HostObject>) -> ObjectHandle;

    /// Create a callable script function backed by native code
    fn create_function(&self, name: &str, length: usize, body: HostFunction) -> ObjectHandle;

    // ========================================================================
    // Object operations
    // ========================================================================

    /// Get the kind of an object
    fn kind_of(&self, object: ObjectHandle) -> Result<ObjectKind, ScriptError>;

    /// Read a property
    fn get_property(&self, object: ObjectHandle, name: &str) -> Result<ScriptValue, ScriptError>;

    /// Write a property
    fn set_property(
        &self,
        object: ObjectHandle,
        name: &str,
        value: ScriptValue,
    ) -> Result<(), ScriptError>;

    /// Enumerable property names
    fn property_names(&self, object: ObjectHandle) -> Result<Vec<String>, ScriptError>;

    /// Elements of an array
    fn array_elements(&self, array: ObjectHandle) -> Result<Vec<ScriptValue>, ScriptError>;

    /// Call a function
    fn call(
        &self,
        function: ObjectHandle,
        this: ScriptValue,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, ScriptError>;

    // ========================================================================
    // Promises
    // ========================================================================

    /// Create a pending promise
    fn create_promise(&self) -> ObjectHandle;

    /// Resolve (`Ok`) or reject (`Err`) a pending promise.
    ///
    /// Fails if the handle is not a promise or is already settled.
    fn settle_promise(
        &self,
        promise: ObjectHandle,
        outcome: Result<ScriptValue, ScriptError>,
    ) -> Result<(), ScriptError>;

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Invoker for re-entering this runtime's thread
    fn call_invoker(&self) -> Arc<dyn CallInvoker>;
}
