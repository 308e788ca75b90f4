use super::*;
use garnet_ir::SymbolTable;
use pretty_assertions::assert_eq;

use crate::method::DynamicMethod;

fn class(name: &str, superclass: Option<&ModuleRef>) -> ModuleRef {
    RModule::new(ModuleKind::Class, Some(name), superclass.cloned())
}

#[test]
fn chain_walks_superclasses() {
    let object = class("Object", None);
    let animal = class("Animal", Some(&object));
    let dog = class("Dog", Some(&animal));
    let names: Vec<String> = dog.chain().map(|m| m.display_name()).collect();
    assert_eq!(names, vec!["Dog", "Animal", "Object"]);
    assert!(dog.inherits_from(&object));
    assert!(!animal.inherits_from(&dog));
}

#[test]
fn include_proxy_forwards_tables() {
    let interner = SymbolTable::new();
    let walk = interner.intern("walk");
    let object = class("Object", None);
    let mixin = RModule::new(ModuleKind::Module, Some("Walker"), None);
    mixin.put_method(walk, std::sync::Arc::new(DynamicMethod::undefined(&mixin)));

    let proxy = RModule::new(ModuleKind::IncludeProxy(mixin.clone()), None, Some(object.clone()));
    let dog = class("Dog", Some(&proxy));

    assert!(proxy.same_origin(&mixin));
    assert_eq!(proxy.name().as_deref(), Some("Walker"));
    let found_in = dog.search_method(walk).map(|(_, at)| at.origin_ref());
    assert!(found_in.is_some_and(|m| Arc::ptr_eq(&m, &mixin)));

    let ancestors: Vec<String> = dog.ancestors().iter().map(|m| m.display_name()).collect();
    assert_eq!(ancestors, vec!["Dog", "Walker", "Object"]);
    assert!(dog.real_superclass().is_some_and(|s| Arc::ptr_eq(&s, &object)));
}

#[test]
fn constants_and_class_vars_are_inherited() {
    let interner = SymbolTable::new();
    let limit = interner.intern("LIMIT");
    let count = interner.intern("@@count");
    let base = class("Base", None);
    let derived = class("Derived", Some(&base));

    base.const_set(limit, Value::Fixnum(10));
    assert_eq!(derived.const_get_own(limit), None);
    assert_eq!(derived.const_get_inherited(limit), Some(Value::Fixnum(10)));

    base.class_var_set(count, Value::Fixnum(0));
    assert!(derived
        .class_var_owner(count)
        .is_some_and(|owner| Arc::ptr_eq(&owner, &base)));
}

#[test]
fn anonymous_modules_are_named_once() {
    let module = RModule::new(ModuleKind::Module, None, None);
    assert!(module.display_name().starts_with("#<Module:0x"));
    module.set_name_if_anonymous("First");
    module.set_name_if_anonymous("Second");
    assert_eq!(module.display_name(), "First");
}

#[test]
fn singleton_names_mention_the_attached_module() {
    let foo = class("Foo", None);
    let meta = RModule::new(
        ModuleKind::Singleton(Attached::Module(Arc::downgrade(&foo))),
        None,
        None,
    );
    assert_eq!(meta.display_name(), "#<Class:Foo>");
    assert!(meta.is_singleton());
    assert!(meta.is_class());
    assert!(!meta.is_module());
}
