//! Descriptor → script function conversion
//!
//! A call goes through four steps, in order:
//! 1. argument count check against the declared arity
//! 2. argument conversion, each with its declared type hint
//! 3. the native callback (under a panic catcher)
//! 4. result conversion (sync) or promise settlement on the engine thread (async)
//!
//! A failure in steps 1 or 2 means the callback never runs.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use modbridge_sdk::{
    AsyncFunctionBody, DynamicValue, EngineJob, HostFunction, NativeCallback, NativeError,
    ObjectHandle, Promise, ScriptRuntime, ScriptValue, SyncFunctionBody,
};

use crate::descriptor::MethodDescriptor;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::ModuleInner;

/// Script function for `descriptor` in `rt`, built on first use.
pub(crate) fn script_function(
    module: &Arc<ModuleInner>,
    rt: &dyn ScriptRuntime,
    descriptor: &Arc<MethodDescriptor>,
) -> ObjectHandle {
    if let Some(function) = descriptor.cached_function(rt.id()) {
        return function;
    }

    let weak = Arc::downgrade(module);
    let module_name = module.name.clone();
    let captured = descriptor.clone();
    let body: HostFunction = Box::new(
        move |rt: &dyn ScriptRuntime, _this: &ScriptValue, args: &[ScriptValue]| {
            let module = weak.upgrade().ok_or_else(|| {
                BridgeError::ModuleReleased(module_name.clone()).into_script_error()
            })?;
            invoke(&module, rt, &captured, args).map_err(BridgeError::into_script_error)
        },
    );

    let function = rt.create_function(descriptor.name(), descriptor.arity(), body);
    tracing::debug!(
        module = %module.name,
        function = descriptor.name(),
        runtime = %rt.id(),
        "script function created"
    );
    descriptor.cache_function(function)
}

fn invoke(
    module: &Arc<ModuleInner>,
    rt: &dyn ScriptRuntime,
    descriptor: &MethodDescriptor,
    args: &[ScriptValue],
) -> BridgeResult<ScriptValue> {
    tracing::trace!(
        module = %module.name,
        function = descriptor.name(),
        argc = args.len(),
        "native call"
    );

    if args.len() != descriptor.arity() {
        return Err(BridgeError::ArityMismatch {
            function: descriptor.name().to_string(),
            expected: descriptor.arity(),
            received: args.len(),
        });
    }

    let native_args = convert_arguments(module, rt, descriptor, args)?;

    match module.callback(descriptor.callback()) {
        Some(NativeCallback::Sync(body)) => call_sync(module, rt, descriptor, &body, native_args),
        Some(NativeCallback::Async(body)) => call_async(module, rt, descriptor, body, native_args),
        None => Err(BridgeError::ModuleReleased(module.name.clone())),
    }
}

fn convert_arguments(
    module: &ModuleInner,
    rt: &dyn ScriptRuntime,
    descriptor: &MethodDescriptor,
    args: &[ScriptValue],
) -> BridgeResult<Vec<DynamicValue>> {
    args.iter()
        .zip(descriptor.parameter_types())
        .enumerate()
        .map(|(index, (arg, &hint))| {
            module
                .codec
                .to_native(rt, arg, hint)
                .map_err(|e| BridgeError::ArgumentType {
                    function: descriptor.name().to_string(),
                    index,
                    expected: hint,
                    reason: e.to_string(),
                })
        })
        .collect()
}

fn call_sync(
    module: &ModuleInner,
    rt: &dyn ScriptRuntime,
    descriptor: &MethodDescriptor,
    body: &Arc<SyncFunctionBody>,
    args: Vec<DynamicValue>,
) -> BridgeResult<ScriptValue> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(args)))
        .unwrap_or_else(|payload| Err(NativeError::Panic(panic_message(payload.as_ref()))));

    match outcome {
        Ok(value) => Ok(module.codec.to_script(rt, &value)?),
        Err(error) => Err(BridgeError::NativeInvocation {
            function: descriptor.name().to_string(),
            message: error.to_string(),
        }),
    }
}

fn call_async(
    module: &ModuleInner,
    rt: &dyn ScriptRuntime,
    descriptor: &MethodDescriptor,
    body: Arc<AsyncFunctionBody>,
    args: Vec<DynamicValue>,
) -> BridgeResult<ScriptValue> {
    // The script promise is only allocated once the dispatcher accepts the
    // job. Completions run on the engine thread, which is busy with this
    // call until then, so the handle is always set before it is read.
    let handle = Arc::new(OnceCell::new());
    let slot = Arc::new(Mutex::new(Some(completion(
        module,
        rt,
        descriptor.name(),
        handle.clone(),
    ))));

    let function = descriptor.name().to_string();
    let job_slot = slot.clone();
    let dispatched = module.dispatcher.dispatch(Box::new(move || {
        let Some(continuation) = job_slot.lock().take() else {
            return;
        };
        // On panic the continuation is dropped mid-unwind, which rejects it.
        let caught = panic::catch_unwind(AssertUnwindSafe(move || body(args, continuation)));
        if let Err(payload) = caught {
            tracing::error!(
                function = %function,
                panic = %panic_message(payload.as_ref()),
                "async native function panicked"
            );
        }
    }));

    if let Err(error) = dispatched {
        if let Some(continuation) = slot.lock().take() {
            continuation.discard();
        }
        return Err(error.into());
    }

    let promise = *handle.get_or_init(|| rt.create_promise());
    Ok(ScriptValue::Object(promise))
}

/// Continuation that settles the call's promise back on the engine thread.
fn completion(
    module: &ModuleInner,
    rt: &dyn ScriptRuntime,
    function: &str,
    promise: Arc<OnceCell<ObjectHandle>>,
) -> Promise {
    let invoker = rt.call_invoker();
    let codec = module.codec.clone();
    let name = function.to_string();

    Promise::new(function, move |outcome| {
        let job_name = name.clone();
        let job: EngineJob = Box::new(move |rt: &dyn ScriptRuntime| {
            let Some(&promise) = promise.get() else {
                tracing::warn!(
                    function = %job_name,
                    "completion arrived before its promise existed"
                );
                return;
            };
            let settled = match outcome {
                Ok(value) => codec
                    .to_script(rt, &value)
                    .map_err(|e| BridgeError::from(e).into_script_error()),
                Err(error) => Err(BridgeError::NativeInvocation {
                    function: job_name.clone(),
                    message: error.to_string(),
                }
                .into_script_error()),
            };
            if let Err(e) = rt.settle_promise(promise, settled) {
                tracing::warn!(function = %job_name, error = %e, "failed to settle promise");
            }
        });

        if invoker.invoke_async(job).is_err() {
            tracing::error!(
                function = %name,
                "script runtime is gone; dropping async completion"
            );
        }
    })
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}
