//! Callback arena
//!
//! Native callbacks are owned by their module's arena and addressed by
//! [`CallbackId`]. Descriptors store ids, never the callbacks themselves, so
//! dropping the registry drops every callback it registered.

use modbridge_sdk::NativeCallback;

/// Index of a callback inside a [`CallbackArena`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(usize);

impl CallbackId {
    /// Raw index
    pub fn index(self) -> usize {
        self.0
    }
}

/// Append-only storage for native callbacks
#[derive(Debug, Default)]
pub struct CallbackArena {
    callbacks: Vec<NativeCallback>,
}

impl CallbackArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self {
            callbacks: Vec::new(),
        }
    }

    /// Store a callback and return its id
    pub fn insert(&mut self, callback: NativeCallback) -> CallbackId {
        let id = CallbackId(self.callbacks.len());
        self.callbacks.push(callback);
        id
    }

    /// Look up a callback by id
    pub fn get(&self, id: CallbackId) -> Option<&NativeCallback> {
        self.callbacks.get(id.index())
    }

    /// Get the number of stored callbacks
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Check if the arena is empty
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}
