use super::*;
use pretty_assertions::assert_eq;

use crate::module::{ModuleKind, RModule};

#[test]
fn truthiness() {
    assert!(!Value::Nil.is_truthy());
    assert!(!Value::Bool(false).is_truthy());
    assert!(Value::Bool(true).is_truthy());
    assert!(Value::Fixnum(0).is_truthy());
    assert!(Value::str("").is_truthy());
    assert!(Value::array(vec![]).is_truthy());
}

#[test]
fn strings_are_equal_by_content_but_not_identical() {
    let a = Value::str("abc");
    let b = Value::str("abc");
    assert_eq!(a, b);
    assert!(!a.same(&b));
    assert!(a.same(&a.clone()));
    assert_ne!(a.object_id(), b.object_id());
}

#[test]
fn arrays_compare_elementwise() {
    let a = Value::array(vec![Value::Fixnum(1), Value::str("x")]);
    let b = Value::array(vec![Value::Fixnum(1), Value::str("x")]);
    assert_eq!(a, b);
    assert!(!a.same(&b));
    assert_ne!(a, Value::array(vec![Value::Fixnum(1)]));
}

#[test]
fn immediate_object_ids_are_stable() {
    assert_eq!(Value::Nil.object_id(), 4);
    assert_eq!(Value::Bool(true).object_id(), 2);
    assert_eq!(Value::Fixnum(3).object_id(), 7);
    assert_eq!(Value::Fixnum(3).object_id(), Value::Fixnum(3).object_id());
}

#[test]
fn array_set_pads_with_nil() {
    let array = RArray::new(vec![Value::Fixnum(1)]);
    array.set(3, Value::Fixnum(4));
    assert_eq!(
        array.to_vec(),
        vec![Value::Fixnum(1), Value::Nil, Value::Nil, Value::Fixnum(4)]
    );
    assert_eq!(array.pop(), Some(Value::Fixnum(4)));
    assert_eq!(array.len(), 3);
}

#[test]
fn objects_hold_ivars_and_a_singleton() {
    let class = RModule::new(ModuleKind::Class, Some("Point"), None);
    let object = RObject::new(class.clone());
    let x = garnet_ir::Name::new(0, 1);
    assert_eq!(object.ivar_get(x), None);
    object.ivar_set(x, Value::Fixnum(5));
    assert_eq!(object.ivar_get(x), Some(Value::Fixnum(5)));

    assert!(object.singleton().is_none());
    let singleton = RModule::new(ModuleKind::Class, None, Some(class.clone()));
    object.set_singleton(singleton.clone());
    assert!(object.singleton().is_some_and(|s| Arc::ptr_eq(&s, &singleton)));
    assert!(Arc::ptr_eq(object.class(), &class));
}

#[test]
fn debug_formatting() {
    assert_eq!(format!("{:?}", Value::Float(1.0)), "1.0");
    assert_eq!(format!("{:?}", Value::str("a")), "\"a\"");
    assert_eq!(
        format!("{:?}", Value::array(vec![Value::Nil, Value::Bool(false)])),
        "[nil, false]"
    );
}
