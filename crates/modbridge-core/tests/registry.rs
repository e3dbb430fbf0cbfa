//! Integration tests for module registries and their host objects

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use modbridge_core::{BridgeError, DuplicatePolicy, ModuleRegistry};
use modbridge_heap::HeapRuntime;
use modbridge_sdk::{
    DynamicValue, InlineDispatcher, NativeResult, ObjectKind, ScriptRuntime, ScriptValue, TypeTag,
    ValueCodec,
};

fn registry(name: &str) -> ModuleRegistry {
    ModuleRegistry::new(name, Arc::new(InlineDispatcher))
}

fn registry_with_policy(policy: DuplicatePolicy) -> ModuleRegistry {
    ModuleRegistry::builder("Test", Arc::new(InlineDispatcher))
        .duplicate_policy(policy)
        .build()
}

fn read(rt: &HeapRuntime, registry: &ModuleRegistry, property: &str) -> ScriptValue {
    let object = registry.get_script_object(rt).unwrap();
    rt.get_property(object, property).unwrap()
}

fn to_native(rt: &HeapRuntime, value: &ScriptValue) -> DynamicValue {
    modbridge_core::DefaultCodec::new()
        .to_native(rt, value, TypeTag::Any)
        .unwrap()
}

// ============================================================================
// Constants
// ============================================================================

#[test]
fn test_constants_roundtrip() {
    let rt = HeapRuntime::new();
    let r = registry("Device");
    let constants = DynamicValue::object([
        ("model", DynamicValue::from("Pixel")),
        ("year", DynamicValue::Number(2024.0)),
        ("isTablet", DynamicValue::Bool(false)),
        (
            "screen",
            DynamicValue::object([
                ("width", DynamicValue::Number(1080.0)),
                ("height", DynamicValue::Number(2400.0)),
            ]),
        ),
        ("abis", DynamicValue::from(vec!["arm64-v8a", "x86_64"])),
    ]);
    r.export_constants(constants.clone()).unwrap();

    for (name, expected) in constants.as_object().unwrap() {
        let value = read(&rt, &r, name);
        assert_eq!(&to_native(&rt, &value), expected, "constant {}", name);
    }
}

#[test]
fn test_constants_from_serialize() {
    #[derive(serde::Serialize)]
    struct Info {
        version: &'static str,
        build: u32,
    }

    let rt = HeapRuntime::new();
    let r = registry("App");
    r.export_constants(
        DynamicValue::from_serialize(&Info {
            version: "3.1.0",
            build: 42,
        })
        .unwrap(),
    )
    .unwrap();

    assert_eq!(read(&rt, &r, "version"), ScriptValue::from("3.1.0"));
    assert_eq!(read(&rt, &r, "build"), ScriptValue::Number(42.0));
}

#[test]
fn test_malformed_constants() {
    let r = registry("Bad");
    for bag in [
        DynamicValue::Null,
        DynamicValue::Number(1.0),
        DynamicValue::from("constants"),
        DynamicValue::Array(vec![]),
    ] {
        assert!(matches!(
            r.export_constants(bag),
            Err(BridgeError::MalformedConstants { .. })
        ));
    }
    assert!(r.constant_names().is_empty());
}

#[test]
fn test_constant_wins_over_function() {
    let rt = HeapRuntime::new();
    let r = registry("Shadow");
    r.register_sync_function("value", vec![], |_| Ok(DynamicValue::from("function")))
        .unwrap();
    r.export_constant("value", "constant");

    assert_eq!(read(&rt, &r, "value"), ScriptValue::from("constant"));
}

// ============================================================================
// Host object protocol
// ============================================================================

#[test]
fn test_script_object_identity() {
    let rt = HeapRuntime::new();
    let r = registry("Same");
    assert!(!r.is_exposed());

    let first = r.get_script_object(&rt).unwrap();
    let second = r.get_script_object(&rt).unwrap();
    assert_eq!(first, second);
    assert!(r.is_exposed());
    assert_eq!(rt.kind_of(first).unwrap(), ObjectKind::Host);
}

#[test]
fn test_script_object_built_once_across_threads() {
    let r = registry("Racy");
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let r = r.clone();
            std::thread::spawn(move || {
                let rt = HeapRuntime::new();
                r.get_script_object(&rt).is_ok()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(winners, 1);
}

#[test]
fn test_unknown_property_is_undefined() {
    let rt = HeapRuntime::new();
    let r = registry("Sparse");
    r.export_constant("known", 1);
    assert!(read(&rt, &r, "unknown").is_undefined());
}

#[test]
fn test_write_rejected_and_tables_unchanged() {
    let rt = HeapRuntime::new();
    let r = registry("Locked");
    r.export_constant("answer", 42);
    r.register_sync_function("f", vec![], |_| Ok(DynamicValue::Null))
        .unwrap();
    let object = r.get_script_object(&rt).unwrap();

    for property in ["answer", "f", "fresh"] {
        let err = rt
            .set_property(object, property, ScriptValue::Number(0.0))
            .unwrap_err();
        assert_eq!(err.name, "ImmutableModuleError");
        assert!(err.message.contains("Locked"));
        assert!(err.message.contains(property));
    }

    assert_eq!(r.constant("answer"), Some(DynamicValue::Number(42.0)));
    assert_eq!(r.property_names(), vec!["answer", "f"]);
    assert!(rt.get_property(object, "fresh").unwrap().is_undefined());
}

#[test]
fn test_enumeration_independent_of_order() {
    let rt = HeapRuntime::new();

    let a = registry("A");
    a.export_constant("SCALE", 2.0);
    a.register_sync_function("add", vec![TypeTag::Number; 2], |_| Ok(DynamicValue::Null))
        .unwrap();
    a.register_async_function("fetch", vec![TypeTag::String], |_, p| p.resolve(()))
        .unwrap();

    let b = registry("B");
    b.register_async_function("fetch", vec![TypeTag::String], |_, p| p.resolve(()))
        .unwrap();
    b.register_sync_function("add", vec![TypeTag::Number; 2], |_| Ok(DynamicValue::Null))
        .unwrap();
    b.export_constant("SCALE", 2.0);

    let names_a = rt.property_names(a.get_script_object(&rt).unwrap()).unwrap();
    let names_b = rt.property_names(b.get_script_object(&rt).unwrap()).unwrap();
    assert_eq!(names_a, names_b);
    assert_eq!(names_a, vec!["SCALE", "add", "fetch"]);
}

#[test]
fn test_enumeration_reflects_late_registration() {
    let rt = HeapRuntime::new();
    let r = registry("Late");
    let object = r.get_script_object(&rt).unwrap();
    assert!(rt.property_names(object).unwrap().is_empty());

    r.export_constant("late", true);
    assert!(rt.has_property(object, "late").unwrap());
    assert_eq!(rt.get_property(object, "late").unwrap(), ScriptValue::Bool(true));
}

#[test]
fn test_runtime_mismatch() {
    let first = HeapRuntime::new();
    let second = HeapRuntime::new();
    let r = registry("Bound");
    r.get_script_object(&first).unwrap();

    let err = r.get_script_object(&second).unwrap_err();
    assert_eq!(
        err,
        BridgeError::RuntimeMismatch {
            module: "Bound".to_string(),
            bound: first.id(),
            requested: second.id(),
        }
    );
}

#[test]
fn test_released_module() {
    let rt = HeapRuntime::new();
    let r = registry("Gone");
    r.export_constant("x", 1);
    r.register_sync_function("f", vec![], |_| Ok(DynamicValue::Null))
        .unwrap();
    let object = r.get_script_object(&rt).unwrap();
    let function = rt.get_property(object, "f").unwrap().as_object().unwrap();
    drop(r);

    let err = rt.get_property(object, "x").unwrap_err();
    assert_eq!(err.name, "ModuleReleasedError");
    assert!(rt.property_names(object).unwrap().is_empty());

    let err = rt.call(function, ScriptValue::Undefined, &[]).unwrap_err();
    assert_eq!(err.name, "ModuleReleasedError");
}

// ============================================================================
// Duplicate registration
// ============================================================================

fn counting(
    counter: &Arc<AtomicUsize>,
    result: i32,
) -> impl Fn(Vec<DynamicValue>) -> NativeResult<DynamicValue> {
    let counter = counter.clone();
    move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(DynamicValue::from(result))
    }
}

#[test]
fn test_duplicate_keeps_first() {
    let rt = HeapRuntime::new();
    let r = registry_with_policy(DuplicatePolicy::KeepFirst);
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    r.register_sync_function("foo", vec![], counting(&first, 1)).unwrap();
    r.register_sync_function("foo", vec![TypeTag::Number], counting(&second, 2))
        .unwrap();

    assert_eq!(r.method("foo").unwrap().arity(), 0);
    let object = r.get_script_object(&rt).unwrap();
    let foo = rt.get_property(object, "foo").unwrap().as_object().unwrap();
    assert_eq!(
        rt.call(foo, ScriptValue::Object(object), &[]).unwrap(),
        ScriptValue::Number(1.0)
    );
    assert_eq!(first.load(Ordering::SeqCst), 1);
    assert_eq!(second.load(Ordering::SeqCst), 0);
}

#[test]
fn test_duplicate_replace() {
    let rt = HeapRuntime::new();
    let r = registry_with_policy(DuplicatePolicy::Replace);
    let first = Arc::new(AtomicUsize::new(0));
    let second = Arc::new(AtomicUsize::new(0));

    r.register_sync_function("foo", vec![], counting(&first, 1)).unwrap();
    r.register_sync_function("foo", vec![], counting(&second, 2)).unwrap();

    let object = r.get_script_object(&rt).unwrap();
    let foo = rt.get_property(object, "foo").unwrap().as_object().unwrap();
    assert_eq!(
        rt.call(foo, ScriptValue::Object(object), &[]).unwrap(),
        ScriptValue::Number(2.0)
    );
    assert_eq!(first.load(Ordering::SeqCst), 0);
    assert_eq!(second.load(Ordering::SeqCst), 1);
}

#[test]
fn test_duplicate_reject() {
    let r = registry_with_policy(DuplicatePolicy::Reject);
    r.register_sync_function("foo", vec![], |_| Ok(DynamicValue::Null))
        .unwrap();
    let err = r
        .register_sync_function("foo", vec![], |_| Ok(DynamicValue::Null))
        .unwrap_err();
    assert_eq!(
        err,
        BridgeError::DuplicateFunction {
            module: "Test".to_string(),
            function: "foo".to_string()
        }
    );
}
