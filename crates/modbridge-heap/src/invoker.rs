//! Call invoker backed by a crossbeam channel
//!
//! Any thread may queue jobs; the runtime drains them on its own thread.
//! Once the runtime is dropped the receiving end is gone and further jobs
//! are refused with [`InvokerClosed`].

use crossbeam::channel::Sender;
use modbridge_sdk::{CallInvoker, EngineJob, InvokerClosed};

pub(crate) struct QueueInvoker {
    tx: Sender<EngineJob>,
}

impl QueueInvoker {
    pub(crate) fn new(tx: Sender<EngineJob>) -> Self {
        Self { tx }
    }
}

impl CallInvoker for QueueInvoker {
    fn invoke_async(&self, job: EngineJob) -> Result<(), InvokerClosed> {
        self.tx.send(job).map_err(|_| InvokerClosed)
    }
}
