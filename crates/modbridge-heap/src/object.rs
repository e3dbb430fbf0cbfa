//! Heap object representation

use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;

use modbridge_sdk::{HostFunction, HostObject, ObjectKind, ScriptError, ScriptValue};

/// State of a promise slot
#[derive(Debug, Clone, PartialEq)]
pub enum PromiseState {
    /// Not settled yet
    Pending,
    /// Resolved with a value
    Fulfilled(ScriptValue),
    /// Rejected with an error
    Rejected(ScriptError),
}

impl PromiseState {
    /// Whether the promise has not settled yet
    pub fn is_pending(&self) -> bool {
        matches!(self, PromiseState::Pending)
    }
}

pub(crate) enum HeapObject {
    Plain(BTreeMap<String, ScriptValue>),
    Array(Vec<ScriptValue>),
    Function {
        name: String,
        length: usize,
        body: Rc<HostFunction>,
    },
    Promise(PromiseState),
    Host(Arc<dyn HostObject>),
}

impl HeapObject {
    pub(crate) fn kind(&self) -> ObjectKind {
        match self {
            HeapObject::Plain(_) => ObjectKind::Plain,
            HeapObject::Array(_) => ObjectKind::Array,
            HeapObject::Function { .. } => ObjectKind::Function,
            HeapObject::Promise(_) => ObjectKind::Promise,
            HeapObject::Host(_) => ObjectKind::Host,
        }
    }
}

/// What a property read resolved to before leaving the heap borrow.
pub(crate) enum PropertyRead {
    Value(ScriptValue),
    Host(Arc<dyn HostObject>),
}
