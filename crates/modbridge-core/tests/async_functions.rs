//! Integration tests for asynchronous native functions

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::channel;
use modbridge_core::{ModuleRegistry, WorkerPool};
use modbridge_heap::{HeapRuntime, PromiseState};
use modbridge_sdk::{
    DispatchError, Dispatcher, DynamicValue, InlineDispatcher, Job, NativeError, ObjectHandle, ObjectKind,
    ScriptRuntime, ScriptValue, TypeTag,
};
use tracing_subscriber::EnvFilter;

const TIMEOUT: Duration = Duration::from_secs(5);

fn call(
    rt: &HeapRuntime,
    registry: &ModuleRegistry,
    name: &str,
    args: &[ScriptValue],
) -> ObjectHandle {
    let object = registry.get_script_object(rt).unwrap();
    let function = rt.get_property(object, name).unwrap().as_object().unwrap();
    rt.call(function, ScriptValue::Object(object), args)
        .unwrap()
        .as_object()
        .unwrap()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn pool_registry(workers: usize) -> (Arc<WorkerPool>, ModuleRegistry) {
    init_tracing();
    let pool = Arc::new(WorkerPool::with_workers(workers).unwrap());
    let registry = ModuleRegistry::new("Async", pool.clone() as Arc<dyn Dispatcher>);
    (pool, registry)
}

#[test]
fn test_returns_pending_then_resolves() {
    let (_pool, registry) = pool_registry(2);
    let (release_tx, release_rx) = channel::bounded::<()>(1);
    registry
        .register_async_function("f", vec![], move |_args, promise| {
            release_rx.recv().unwrap();
            promise.resolve(20);
        })
        .unwrap();

    let rt = HeapRuntime::new();
    let promise = call(&rt, &registry, "f", &[]);
    assert_eq!(rt.kind_of(promise).unwrap(), ObjectKind::Promise);
    assert_eq!(rt.promise_state(promise).unwrap(), PromiseState::Pending);

    release_tx.send(()).unwrap();
    assert_eq!(
        rt.wait_for_promise(promise, TIMEOUT).unwrap(),
        PromiseState::Fulfilled(ScriptValue::Number(20.0))
    );
}

#[test]
fn test_resolves_with_converted_structure() {
    let (_pool, registry) = pool_registry(1);
    registry
        .register_async_function("lookup", vec![TypeTag::String], |args, promise| {
            let key = args[0].as_str().unwrap_or_default().to_string();
            promise.resolve(DynamicValue::object([
                ("key", DynamicValue::from(key)),
                ("hits", DynamicValue::from(vec![1, 2, 3])),
            ]));
        })
        .unwrap();

    let rt = HeapRuntime::new();
    let promise = call(&rt, &registry, "lookup", &[ScriptValue::from("user")]);
    let PromiseState::Fulfilled(value) = rt.wait_for_promise(promise, TIMEOUT).unwrap() else {
        panic!("promise was not fulfilled");
    };
    let object = value.as_object().unwrap();
    assert_eq!(rt.get_property(object, "key").unwrap(), ScriptValue::from("user"));
    let hits = rt.get_property(object, "hits").unwrap().as_object().unwrap();
    assert_eq!(rt.array_elements(hits).unwrap().len(), 3);
}

#[test]
fn test_rejection_carries_native_message() {
    let (_pool, registry) = pool_registry(1);
    registry
        .register_async_function("fail", vec![], |_, promise| {
            promise.reject(NativeError::Failed("camera busy".to_string()));
        })
        .unwrap();

    let rt = HeapRuntime::new();
    let promise = call(&rt, &registry, "fail", &[]);
    match rt.wait_for_promise(promise, TIMEOUT).unwrap() {
        PromiseState::Rejected(err) => {
            assert_eq!(err.name, "NativeInvocationError");
            assert!(err.message.contains("camera busy"));
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn test_dropped_promise_rejects() {
    let (_pool, registry) = pool_registry(1);
    registry
        .register_async_function("forget", vec![], |_, _promise| {})
        .unwrap();

    let rt = HeapRuntime::new();
    let promise = call(&rt, &registry, "forget", &[]);
    match rt.wait_for_promise(promise, TIMEOUT).unwrap() {
        PromiseState::Rejected(err) => assert!(err.message.contains("dropped")),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn test_panicking_callback_rejects() {
    let (_pool, registry) = pool_registry(1);
    registry
        .register_async_function("explode", vec![], |_, _promise| panic!("worker exploded"))
        .unwrap();

    let rt = HeapRuntime::new();
    let promise = call(&rt, &registry, "explode", &[]);
    assert!(matches!(
        rt.wait_for_promise(promise, TIMEOUT).unwrap(),
        PromiseState::Rejected(_)
    ));
}

#[test]
fn test_validation_errors_throw_before_dispatch() {
    let (_pool, registry) = pool_registry(1);
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    registry
        .register_async_function("square", vec![TypeTag::Number], move |args, promise| {
            counter.fetch_add(1, Ordering::SeqCst);
            let n = args[0].as_f64().unwrap_or_default();
            promise.resolve(n * n);
        })
        .unwrap();

    let rt = HeapRuntime::new();
    let object = registry.get_script_object(&rt).unwrap();
    let square = rt.get_property(object, "square").unwrap().as_object().unwrap();

    let err = rt.call(square, ScriptValue::Undefined, &[]).unwrap_err();
    assert_eq!(err.name, "ArityMismatchError");
    let err = rt
        .call(square, ScriptValue::Undefined, &[ScriptValue::Bool(true)])
        .unwrap_err();
    assert_eq!(err.name, "ArgumentTypeError");

    assert_eq!(rt.run_pending_jobs(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_concurrent_calls_settle_independently() {
    let (_pool, registry) = pool_registry(4);
    registry
        .register_async_function("delayed", vec![TypeTag::Number], |args, promise| {
            let n = args[0].as_f64().unwrap_or_default();
            // Later calls finish first
            thread::sleep(Duration::from_millis((40.0 - n * 10.0) as u64));
            promise.resolve(n);
        })
        .unwrap();

    let rt = HeapRuntime::new();
    let promises: Vec<_> = (0..4)
        .map(|n| call(&rt, &registry, "delayed", &[ScriptValue::Number(n as f64)]))
        .collect();

    for (n, promise) in promises.into_iter().enumerate() {
        assert_eq!(
            rt.wait_for_promise(promise, TIMEOUT).unwrap(),
            PromiseState::Fulfilled(ScriptValue::Number(n as f64))
        );
    }
}

#[test]
fn test_inline_dispatcher_settles_through_invoker() {
    let registry = ModuleRegistry::new("Inline", Arc::new(InlineDispatcher));
    registry
        .register_async_function("now", vec![], |_, promise| promise.resolve("done"))
        .unwrap();

    let rt = HeapRuntime::new();
    let promise = call(&rt, &registry, "now", &[]);
    // The callback already ran, but settlement waits for the engine thread.
    assert_eq!(rt.promise_state(promise).unwrap(), PromiseState::Pending);
    assert_eq!(rt.run_pending_jobs(), 1);
    assert_eq!(
        rt.promise_state(promise).unwrap(),
        PromiseState::Fulfilled(ScriptValue::from("done"))
    );
}

#[test]
fn test_dispatch_after_shutdown_throws() {
    let (pool, registry) = pool_registry(1);
    registry
        .register_async_function("late", vec![], |_, promise| promise.resolve(()))
        .unwrap();
    pool.shutdown();

    let rt = HeapRuntime::new();
    let object = registry.get_script_object(&rt).unwrap();
    let late = rt.get_property(object, "late").unwrap().as_object().unwrap();
    let heap_before = rt.heap_size();

    let err = rt.call(late, ScriptValue::Undefined, &[]).unwrap_err();
    assert!(err.message.contains("shut down"));

    // A refused call leaves no promise and no queued settlement behind
    assert_eq!(rt.heap_size(), heap_before);
    assert_eq!(rt.run_pending_jobs(), 0);
}

/// Dispatcher whose queue is always full
struct Saturated;

impl Dispatcher for Saturated {
    fn dispatch(&self, _job: Job) -> Result<(), DispatchError> {
        Err(DispatchError::QueueFull("saturated".to_string()))
    }
}

#[test]
fn test_refused_job_never_runs_callback() {
    init_tracing();
    let registry = ModuleRegistry::new("Async", Arc::new(Saturated));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    registry
        .register_async_function("busy", vec![TypeTag::Number], move |_, promise| {
            counter.fetch_add(1, Ordering::SeqCst);
            promise.resolve(())
        })
        .unwrap();

    let rt = HeapRuntime::new();
    let object = registry.get_script_object(&rt).unwrap();
    let busy = rt.get_property(object, "busy").unwrap().as_object().unwrap();
    let heap_before = rt.heap_size();

    let err = rt
        .call(busy, ScriptValue::Undefined, &[ScriptValue::Number(1.0)])
        .unwrap_err();
    assert_eq!(err.name, "Error");
    assert!(err.message.contains("queue is full"));
    assert_eq!(rt.heap_size(), heap_before);
    assert_eq!(rt.run_pending_jobs(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_completion_after_runtime_dropped() {
    let (pool, registry) = pool_registry(1);
    let (release_tx, release_rx) = channel::bounded::<()>(1);
    let (done_tx, done_rx) = channel::bounded::<()>(1);
    registry
        .register_async_function("slow", vec![], move |_, promise| {
            release_rx.recv().unwrap();
            promise.resolve(1);
            done_tx.send(()).unwrap();
        })
        .unwrap();

    {
        let rt = HeapRuntime::new();
        call(&rt, &registry, "slow", &[]);
    }

    release_tx.send(()).unwrap();
    done_rx.recv_timeout(TIMEOUT).unwrap();
    pool.shutdown();
}
