//! Core class hierarchy.
//!
//! Built in two steps because metaclass wiring and constant registration
//! need a `Runtime`: [`core_classes`] allocates the bare classes, then
//! [`register_constants`] gives each one its metaclass (superclasses
//! first, so metaclass chains line up), mixes `Kernel` into `Object` and
//! binds the top-level constants.

use crate::module::{ModuleKind, ModuleRef, RModule};

use super::Runtime;

/// Handles to the classes the evaluator itself refers to.
#[derive(Clone)]
pub struct CoreClasses {
    pub object: ModuleRef,
    pub module: ModuleRef,
    pub class: ModuleRef,
    pub kernel: ModuleRef,
    pub nil_class: ModuleRef,
    pub true_class: ModuleRef,
    pub false_class: ModuleRef,
    pub integer: ModuleRef,
    pub float: ModuleRef,
    pub string: ModuleRef,
    pub symbol: ModuleRef,
    pub array: ModuleRef,
    pub proc_class: ModuleRef,
    pub exception: ModuleRef,
    pub standard_error: ModuleRef,
    pub argument_error: ModuleRef,
    pub name_error: ModuleRef,
    pub no_method_error: ModuleRef,
    pub type_error: ModuleRef,
    pub runtime_error: ModuleRef,
    pub local_jump_error: ModuleRef,
    pub zero_division_error: ModuleRef,
    pub index_error: ModuleRef,
    pub range_error: ModuleRef,
    pub system_stack_error: ModuleRef,
    pub signal_exception: ModuleRef,
    pub interrupt: ModuleRef,
}

impl CoreClasses {
    /// `(constant name, class)` in superclass-first order.
    fn in_hierarchy_order(&self) -> [(&'static str, &ModuleRef); 27] {
        [
            ("Object", &self.object),
            ("Module", &self.module),
            ("Class", &self.class),
            ("Kernel", &self.kernel),
            ("NilClass", &self.nil_class),
            ("TrueClass", &self.true_class),
            ("FalseClass", &self.false_class),
            ("Integer", &self.integer),
            ("Float", &self.float),
            ("String", &self.string),
            ("Symbol", &self.symbol),
            ("Array", &self.array),
            ("Proc", &self.proc_class),
            ("Exception", &self.exception),
            ("StandardError", &self.standard_error),
            ("ArgumentError", &self.argument_error),
            ("NameError", &self.name_error),
            ("NoMethodError", &self.no_method_error),
            ("TypeError", &self.type_error),
            ("RuntimeError", &self.runtime_error),
            ("LocalJumpError", &self.local_jump_error),
            ("ZeroDivisionError", &self.zero_division_error),
            ("IndexError", &self.index_error),
            ("RangeError", &self.range_error),
            ("SystemStackError", &self.system_stack_error),
            ("SignalException", &self.signal_exception),
            ("Interrupt", &self.interrupt),
        ]
    }
}

fn class(name: &str, superclass: &ModuleRef) -> ModuleRef {
    RModule::new(ModuleKind::Class, Some(name), Some(superclass.clone()))
}

pub(super) fn core_classes() -> CoreClasses {
    let object = RModule::new(ModuleKind::Class, Some("Object"), None);
    let module = class("Module", &object);
    let class_class = class("Class", &module);
    let kernel = RModule::new(ModuleKind::Module, Some("Kernel"), None);

    let exception = class("Exception", &object);
    let standard_error = class("StandardError", &exception);
    let name_error = class("NameError", &standard_error);
    let signal_exception = class("SignalException", &exception);

    CoreClasses {
        nil_class: class("NilClass", &object),
        true_class: class("TrueClass", &object),
        false_class: class("FalseClass", &object),
        integer: class("Integer", &object),
        float: class("Float", &object),
        string: class("String", &object),
        symbol: class("Symbol", &object),
        array: class("Array", &object),
        proc_class: class("Proc", &object),
        argument_error: class("ArgumentError", &standard_error),
        no_method_error: class("NoMethodError", &name_error),
        type_error: class("TypeError", &standard_error),
        runtime_error: class("RuntimeError", &standard_error),
        local_jump_error: class("LocalJumpError", &standard_error),
        zero_division_error: class("ZeroDivisionError", &standard_error),
        index_error: class("IndexError", &standard_error),
        range_error: class("RangeError", &standard_error),
        system_stack_error: class("SystemStackError", &exception),
        interrupt: class("Interrupt", &signal_exception),
        object,
        module,
        class: class_class,
        kernel,
        exception,
        standard_error,
        name_error,
        signal_exception,
    }
}

pub(super) fn register_constants(runtime: &Runtime) {
    let core = runtime.core();
    for (name, module) in core.in_hierarchy_order() {
        runtime.attach_metaclass(module);
        core.object.const_set(runtime.intern(name), crate::value::Value::Module(module.clone()));
    }
    if let Err(err) = runtime.include_module(&core.object, &core.kernel) {
        tracing::error!(%err, "failed to mix Kernel into Object");
    }
}
