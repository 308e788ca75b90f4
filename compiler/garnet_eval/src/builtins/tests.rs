use std::sync::Arc;

use super::*;
use pretty_assertions::assert_eq;

use crate::print_handler::silent_handler;
use crate::runtime::JitPolicy;

fn runtime() -> Arc<Runtime> {
    Runtime::new(silent_handler(), JitPolicy::default())
}

#[test]
fn to_s_of_immediates() {
    let rt = runtime();
    assert_eq!(default_to_s(&rt, &Value::Nil), "");
    assert_eq!(default_to_s(&rt, &Value::Bool(true)), "true");
    assert_eq!(default_to_s(&rt, &Value::Fixnum(-3)), "-3");
    assert_eq!(default_to_s(&rt, &Value::Float(2.0)), "2.0");
    assert_eq!(default_to_s(&rt, &Value::Symbol(rt.intern("sym"))), "sym");
    assert_eq!(default_to_s(&rt, rt.main()), "main");
}

#[test]
fn to_s_of_objects_and_modules() {
    let rt = runtime();
    let point = rt.define_class("Point", &rt.core().object);
    let object = Value::Object(Arc::new(crate::value::RObject::new(point.clone())));
    assert_eq!(default_to_s(&rt, &object), "#<Point>");
    assert_eq!(default_to_s(&rt, &Value::Module(point)), "Point");

    let inner = rt.define_class_under(&rt.core().kernel, "Inner", &rt.core().object);
    assert_eq!(default_to_s(&rt, &Value::Module(inner)), "Kernel::Inner");
}

#[test]
fn inspect_quotes_and_nests() {
    let rt = runtime();
    let value = Value::array(vec![
        Value::Nil,
        Value::str("a\"b\n"),
        Value::Symbol(rt.intern("k")),
        Value::array(vec![Value::Fixnum(1), Value::Float(0.5)]),
    ]);
    assert_eq!(inspect_value(&rt, &value), r#"[nil, "a\"b\n", :k, [1, 0.5]]"#);
    assert_eq!(default_to_s(&rt, &Value::array(vec![])), "[]");
}

#[test]
fn floats_keep_a_fraction() {
    assert_eq!(format_float(1.0), "1.0");
    assert_eq!(format_float(-0.25), "-0.25");
    assert_eq!(format_float(f64::NAN), "NaN");
    assert_eq!(format_float(f64::NEG_INFINITY), "-Infinity");
}

#[test]
fn arg_range_reports_bounds() {
    assert!(check_arg_range(&[Value::Nil], 0, 1).is_ok());
    let err = check_arg_range(&[Value::Nil, Value::Nil, Value::Nil], 1, 2)
        .err()
        .map(|e| e.message);
    assert_eq!(err.as_deref(), Some("wrong number of arguments (3 for 1..2)"));
}
