use std::sync::Arc;

use crate::Value;

#[test]
fn accessors_convert_between_numeric_views() {
    assert_eq!(Value::Int(-3).as_int(), Some(-3));
    assert_eq!(Value::UInt(7).as_int(), Some(7));
    assert_eq!(Value::UInt(u64::MAX).as_int(), None);
    assert_eq!(Value::Int(-1).as_uint(), None);
    assert_eq!(Value::Int(4).as_float(), Some(4.0));
}

#[test]
fn object_get_finds_fields_in_order() {
    let obj = Value::Object(vec![
        ("a".into(), Value::Int(1)),
        ("b".into(), Value::Bool(true)),
    ]);

    assert_eq!(obj.get("a"), Some(&Value::Int(1)));
    assert_eq!(obj.get("b"), Some(&Value::Bool(true)));
    assert_eq!(obj.get("c"), None);
}

#[test]
fn any_compares_by_identity() {
    let payload: Arc<dyn std::any::Any + Send + Sync> = Arc::new(42u8);
    let a = Value::Any(payload.clone());
    let b = Value::Any(payload);
    let c = Value::any(42u8);

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(c.downcast_ref::<u8>(), Some(&42));
}

#[test]
fn mixed_kinds_are_not_equal() {
    assert_ne!(Value::Int(1), Value::UInt(1));
    assert_ne!(Value::Null, Value::Str(String::new()));
}

#[test]
fn debug_renders_compact_literals() {
    let v = Value::Array(vec![Value::Null, Value::Str("x".into()), Value::Int(2)]);
    assert_eq!(format!("{v:?}"), r#"[null, "x", 2]"#);
}
