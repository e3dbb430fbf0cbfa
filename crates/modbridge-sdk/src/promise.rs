//! Promise - resolve/reject continuation handed to async callbacks
//!
//! An async native function receives a `Promise` along with its arguments and
//! reports completion through it, from any thread. Settling consumes the
//! promise, so a call can complete at most once. A promise dropped without
//! being settled rejects itself, so script code never waits forever on a
//! callback that forgot (or panicked before) reporting.

use std::fmt;

use crate::error::{NativeError, NativeResult};
use crate::value::DynamicValue;

type SettleFn = Box<dyn FnOnce(NativeResult<DynamicValue>) + Send>;

/// Completion handle for one asynchronous native call.
pub struct Promise {
    function: String,
    settle: Option<SettleFn>,
}

impl Promise {
    /// Create a promise whose outcome is delivered to `settle`.
    ///
    /// `function` names the call for diagnostics.
    pub fn new(
        function: impl Into<String>,
        settle: impl FnOnce(NativeResult<DynamicValue>) + Send + 'static,
    ) -> Self {
        Self {
            function: function.into(),
            settle: Some(Box::new(settle)),
        }
    }

    /// Name of the function this promise belongs to
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Fulfil with a value
    pub fn resolve(self, value: impl Into<DynamicValue>) {
        self.settle(Ok(value.into()));
    }

    /// Reject with a native error
    pub fn reject(self, error: impl Into<NativeError>) {
        self.settle(Err(error.into()));
    }

    /// Settle with an already-computed outcome
    pub fn settle(mut self, outcome: NativeResult<DynamicValue>) {
        if let Some(settle) = self.settle.take() {
            settle(outcome);
        }
    }

    /// Drop without settling.
    ///
    /// For callers that never handed the promise's script side out, such as a
    /// call whose job was refused by the dispatcher.
    pub fn discard(mut self) {
        self.settle = None;
    }
}

impl Drop for Promise {
    fn drop(&mut self) {
        if let Some(settle) = self.settle.take() {
            tracing::warn!(function = %self.function, "async call dropped its promise without settling it");
            settle(Err(NativeError::Failed(format!(
                "promise for '{}' was dropped without being settled",
                self.function
            ))));
        }
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("function", &self.function)
            .field("settled", &self.settle.is_none())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn recording() -> (Arc<Mutex<Vec<NativeResult<DynamicValue>>>>, Promise) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let promise = Promise::new("f", move |outcome| sink.lock().unwrap().push(outcome));
        (log, promise)
    }

    #[test]
    fn test_resolve_once() {
        let (log, promise) = recording();
        promise.resolve(20);
        assert_eq!(*log.lock().unwrap(), vec![Ok(DynamicValue::Number(20.0))]);
    }

    #[test]
    fn test_reject() {
        let (log, promise) = recording();
        promise.reject("disk on fire");
        assert_eq!(
            *log.lock().unwrap(),
            vec![Err(NativeError::Failed("disk on fire".to_string()))]
        );
    }

    #[test]
    fn test_drop_rejects() {
        let (log, promise) = recording();
        drop(promise);
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert!(matches!(&log[0], Err(NativeError::Failed(msg)) if msg.contains("'f'")));
    }

    #[test]
    fn test_discard_does_not_settle() {
        let (log, promise) = recording();
        promise.discard();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_settle_from_other_thread() {
        let (log, promise) = recording();
        std::thread::spawn(move || promise.resolve("done"))
            .join()
            .unwrap();
        assert_eq!(*log.lock().unwrap(), vec![Ok(DynamicValue::from("done"))]);
    }
}
