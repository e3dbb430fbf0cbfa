//! Worker pool dispatcher
//!
//! Fixed set of threads pulling jobs from a crossbeam channel. Async native
//! callbacks run here; their completions travel back to the engine thread
//! through the runtime's call invoker, never through the pool.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use modbridge_sdk::{DispatchError, Dispatcher, Job};
use parking_lot::Mutex;

use crate::callable::panic_message;
use crate::config::DispatcherConfig;

/// Thread pool implementing [`Dispatcher`]
pub struct WorkerPool {
    name: String,
    sender: Mutex<Option<Sender<Job>>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Start a pool from configuration
    pub fn start(config: &DispatcherConfig) -> io::Result<Self> {
        let (tx, rx) = if config.queue_capacity == 0 {
            channel::unbounded()
        } else {
            channel::bounded(config.queue_capacity)
        };

        let workers = config.workers.max(1);
        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let rx = rx.clone();
            let handle = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name, i))
                .spawn(move || Self::worker_loop(rx))?;
            handles.push(handle);
        }

        tracing::debug!(name = %config.thread_name, workers, "worker pool started");
        Ok(Self {
            name: config.thread_name.clone(),
            sender: Mutex::new(Some(tx)),
            handles: Mutex::new(handles),
        })
    }

    /// Start an unbounded pool with `workers` threads
    pub fn with_workers(workers: usize) -> io::Result<Self> {
        Self::start(&DispatcherConfig {
            workers,
            ..DispatcherConfig::default()
        })
    }

    /// Pool name (the thread name prefix)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of live worker threads
    pub fn worker_count(&self) -> usize {
        self.handles.lock().len()
    }

    /// Whether the pool still accepts jobs
    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Stop accepting jobs, let workers finish what is queued, then join them.
    ///
    /// Idempotent. When called from one of the pool's own threads that
    /// thread is not joined.
    pub fn shutdown(&self) {
        if self.sender.lock().take().is_none() {
            return;
        }

        let current = thread::current().id();
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                tracing::error!(pool = %self.name, "worker thread terminated abnormally");
            }
        }
        tracing::debug!(pool = %self.name, "worker pool stopped");
    }

    fn worker_loop(rx: Receiver<Job>) {
        while let Ok(job) = rx.recv() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
                tracing::error!(
                    panic = %panic_message(payload.as_ref()),
                    "dispatched job panicked"
                );
            }
        }
    }
}

impl Dispatcher for WorkerPool {
    fn dispatch(&self, job: Job) -> Result<(), DispatchError> {
        let sender = self.sender.lock();
        let Some(sender) = sender.as_ref() else {
            return Err(DispatchError::Closed(self.name.clone()));
        };
        sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => DispatchError::QueueFull(self.name.clone()),
            TrySendError::Disconnected(_) => DispatchError::Closed(self.name.clone()),
        })
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
