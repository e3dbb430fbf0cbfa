//! Dispatcher - where asynchronous native callbacks execute
//!
//! The bridge hands each async call to a dispatcher as an opaque job and
//! returns to the script immediately. Thread pools, platform queues and the
//! like implement [`Dispatcher`].

use crate::error::DispatchError;

/// Unit of work submitted to a dispatcher
pub type Job = Box<dyn FnOnce() + Send>;

/// Execution context for asynchronous callbacks.
pub trait Dispatcher: Send + Sync {
    /// Schedule `job`. Must not run it to completion on the caller's stack
    /// unless the implementation documents otherwise.
    fn dispatch(&self, job: Job) -> Result<(), DispatchError>;
}

/// Runs every job immediately on the calling thread.
///
/// Completion is still delivered through the runtime's call invoker, so the
/// script sees a pending promise that settles on the next job drain. Useful
/// for deterministic tests and for hosts without worker threads.
#[derive(Debug, Default, Clone, Copy)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, job: Job) -> Result<(), DispatchError> {
        job();
        Ok(())
    }
}
