//! State shared by every evaluator thread of one program.
//!
//! The `Runtime` owns the interner, the class hierarchy, globals, the
//! method cache and the output handler. Interpreters (one per thread) hold
//! an `Arc<Runtime>`.
//!
//! Every method-table mutation goes through `Runtime` so the method cache
//! hears about it: [`Runtime::add_method`] invalidates by name before
//! installing, [`Runtime::remove_method`] clears the sites of the removed
//! method, [`Runtime::include_module`] reports the new ancestry.

mod bootstrap;

use std::sync::Arc;

use garnet_ir::{Arity, Name, SharedInterner, Visibility};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::errors::{argument_error, type_error, undefined_method_for_class, EvalError};
use crate::method::{DynamicMethod, MethodCompiler, MethodRef, NativeFn};
use crate::method_cache::MethodCache;
use crate::module::{Attached, ModuleKind, ModuleRef, RModule};
use crate::names::KnownNames;
use crate::print_handler::SharedPrintHandler;
use crate::value::{RObject, Value};

pub use bootstrap::CoreClasses;

/// When and how hot interpreted methods are promoted to compiled bodies.
#[derive(Clone)]
pub struct JitPolicy {
    /// Invocations before the compiler is consulted.
    pub threshold: u32,
    pub compiler: Option<Arc<dyn MethodCompiler>>,
}

impl JitPolicy {
    pub const DEFAULT_THRESHOLD: u32 = 50;
}

impl Default for JitPolicy {
    fn default() -> Self {
        Self {
            threshold: Self::DEFAULT_THRESHOLD,
            compiler: None,
        }
    }
}

pub struct Runtime {
    interner: SharedInterner,
    names: KnownNames,
    core: CoreClasses,
    globals: RwLock<FxHashMap<Name, Value>>,
    method_cache: MethodCache,
    main: Value,
    print_handler: SharedPrintHandler,
    jit: JitPolicy,
}

impl Runtime {
    /// Boot the class hierarchy and the native core library.
    pub fn new(print_handler: SharedPrintHandler, jit: JitPolicy) -> Arc<Self> {
        let interner = SharedInterner::new();
        let names = KnownNames::new(&interner);
        let core = bootstrap::core_classes();
        let main = Value::Object(Arc::new(RObject::new(core.object.clone())));
        let runtime = Arc::new(Self {
            interner,
            names,
            core,
            globals: RwLock::new(FxHashMap::default()),
            method_cache: MethodCache::new(),
            main,
            print_handler,
            jit,
        });
        bootstrap::register_constants(&runtime);
        crate::builtins::install(&runtime);
        runtime.method_cache.flush();
        tracing::debug!("runtime booted");
        runtime
    }

    pub fn interner(&self) -> &SharedInterner {
        &self.interner
    }

    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    pub fn lookup(&self, name: Name) -> &'static str {
        self.interner.lookup(name)
    }

    pub(crate) fn names(&self) -> &KnownNames {
        &self.names
    }

    pub fn core(&self) -> &CoreClasses {
        &self.core
    }

    pub fn method_cache(&self) -> &MethodCache {
        &self.method_cache
    }

    /// The top-level `self`.
    pub fn main(&self) -> &Value {
        &self.main
    }

    pub fn print_handler(&self) -> &SharedPrintHandler {
        &self.print_handler
    }

    pub fn jit(&self) -> &JitPolicy {
        &self.jit
    }

    // Globals

    pub fn global_get(&self, name: Name) -> Value {
        self.globals.read().get(&name).cloned().unwrap_or_default()
    }

    pub fn global_set(&self, name: Name, value: Value) {
        self.globals.write().insert(name, value);
    }

    // Class lookup

    /// The class method lookup starts from: the singleton class if the
    /// value has one.
    pub fn class_of(&self, value: &Value) -> ModuleRef {
        let core = &self.core;
        match value {
            Value::Nil => core.nil_class.clone(),
            Value::Bool(true) => core.true_class.clone(),
            Value::Bool(false) => core.false_class.clone(),
            Value::Fixnum(_) => core.integer.clone(),
            Value::Float(_) => core.float.clone(),
            Value::Symbol(_) => core.symbol.clone(),
            Value::Str(_) => core.string.clone(),
            Value::Array(_) => core.array.clone(),
            Value::Proc(_) => core.proc_class.clone(),
            Value::Object(object) => object.singleton().unwrap_or_else(|| object.class().clone()),
            Value::Module(module) => module.metaclass().unwrap_or_else(|| {
                if module.is_module() {
                    core.module.clone()
                } else {
                    core.class.clone()
                }
            }),
        }
    }

    /// The value's class with singletons and include proxies skipped.
    pub fn real_class_of(&self, value: &Value) -> ModuleRef {
        let class = self.class_of(value);
        if class.is_singleton() || class.is_include_proxy() {
            class.real_superclass().unwrap_or(class)
        } else {
            class
        }
    }

    /// The singleton class of `value`, created on first use. Immediates,
    /// strings, arrays and procs cannot have one.
    pub fn singleton_class_of(&self, value: &Value) -> Result<ModuleRef, EvalError> {
        match value {
            Value::Object(object) => {
                if let Some(singleton) = object.singleton() {
                    return Ok(singleton);
                }
                let singleton = RModule::new(
                    ModuleKind::Singleton(Attached::Object(Arc::downgrade(object))),
                    None,
                    Some(object.class().clone()),
                );
                self.attach_metaclass(&singleton);
                object.set_singleton(singleton.clone());
                Ok(singleton)
            }
            Value::Module(module) => Ok(match module.metaclass() {
                Some(metaclass) => metaclass,
                None => self.attach_metaclass(module),
            }),
            other => Err(type_error(format!(
                "can't define singleton for {}",
                self.real_class_of(other).display_name()
            ))),
        }
    }

    /// Create and attach `module`'s metaclass. A class's metaclass inherits
    /// from its superclass's metaclass, so class methods are inherited.
    pub(crate) fn attach_metaclass(&self, module: &ModuleRef) -> ModuleRef {
        let superclass = if module.is_module() {
            self.core.module.clone()
        } else if module.is_singleton() {
            self.core.class.clone()
        } else {
            module
                .real_superclass()
                .and_then(|s| s.metaclass())
                .unwrap_or_else(|| self.core.class.clone())
        };
        let metaclass = RModule::new(
            ModuleKind::Singleton(Attached::Module(Arc::downgrade(module))),
            None,
            Some(superclass),
        );
        module.set_metaclass(metaclass.clone());
        metaclass
    }

    // Class and module creation

    /// An anonymous class (`Class.new(superclass)`).
    pub fn new_class(&self, superclass: &ModuleRef) -> ModuleRef {
        let class = RModule::new(ModuleKind::Class, None, Some(superclass.clone()));
        self.attach_metaclass(&class);
        class
    }

    pub fn new_module(&self) -> ModuleRef {
        let module = RModule::new(ModuleKind::Module, None, None);
        self.attach_metaclass(&module);
        module
    }

    /// Define a top-level class.
    pub fn define_class(&self, name: &str, superclass: &ModuleRef) -> ModuleRef {
        self.define_class_under(&self.core.object, name, superclass)
    }

    /// Create class `name` as a constant of `outer`.
    pub fn define_class_under(
        &self,
        outer: &ModuleRef,
        name: &str,
        superclass: &ModuleRef,
    ) -> ModuleRef {
        let class = self.new_class(superclass);
        self.name_constant(outer, name, &class);
        class
    }

    pub fn define_module(&self, name: &str) -> ModuleRef {
        self.define_module_under(&self.core.object, name)
    }

    pub fn define_module_under(&self, outer: &ModuleRef, name: &str) -> ModuleRef {
        let module = self.new_module();
        self.name_constant(outer, name, &module);
        module
    }

    /// Bind `module` to constant `name` in `outer`, naming it if anonymous.
    pub(crate) fn name_constant(&self, outer: &ModuleRef, name: &str, module: &ModuleRef) {
        module.set_name_if_anonymous(&self.qualified_name(outer, name));
        outer.const_set(self.intern(name), Value::Module(module.clone()));
    }

    /// `Outer::name`, or plain `name` at the top level.
    pub fn qualified_name(&self, outer: &ModuleRef, name: &str) -> String {
        if outer.same_origin(&self.core.object) {
            name.to_string()
        } else {
            format!("{}::{name}", outer.display_name())
        }
    }

    // Method tables

    /// Install `method` as `name` in `module`.
    ///
    /// Sites caching any method of that name are cleared once the entry is
    /// in place: it may shadow a method they resolved further up the chain.
    pub fn add_method(&self, module: &ModuleRef, name: Name, method: DynamicMethod) -> MethodRef {
        let method = Arc::new(method);
        self.method_cache.install(name, || module.put_method(name, method.clone()));
        method
    }

    /// Remove `name` from `module`'s own table.
    pub fn remove_method(&self, module: &ModuleRef, name: Name) -> Result<MethodRef, EvalError> {
        match module.take_method(name) {
            Some(old) => {
                self.method_cache.remove(&old);
                Ok(old)
            }
            None => Err(crate::errors::name_error(format!(
                "method `{}' not defined in {}",
                self.lookup(name),
                module.display_name()
            ))),
        }
    }

    /// Install the undefined sentinel so lookup of `name` stops at `module`.
    pub fn undef_method(&self, module: &ModuleRef, name: Name) -> Result<(), EvalError> {
        match module.search_method(name) {
            Some((method, _)) if !method.is_undefined() => {
                self.add_method(module, name, DynamicMethod::undefined(module));
                Ok(())
            }
            _ => Err(undefined_method_for_class(
                self.lookup(name),
                &module.display_name(),
            )),
        }
    }

    /// Re-wrap `name` with a new visibility. Methods are never mutated in
    /// place; inherited methods get a wrapper in `module` itself.
    pub fn set_method_visibility(
        &self,
        module: &ModuleRef,
        name: Name,
        visibility: Visibility,
    ) -> Result<MethodRef, EvalError> {
        match module.search_method(name) {
            Some((method, _)) if !method.is_undefined() => {
                if method.visibility() == visibility && module.method_entry(name).is_some() {
                    return Ok(method);
                }
                Ok(self.add_method(module, name, method.with_visibility(visibility)))
            }
            _ => Err(undefined_method_for_class(
                self.lookup(name),
                &module.display_name(),
            )),
        }
    }

    /// Define a native method on `module`.
    pub fn define_native(
        &self,
        module: &ModuleRef,
        name: &str,
        arity: Arity,
        func: NativeFn,
    ) -> MethodRef {
        self.define_native_with_visibility(module, name, Visibility::Public, arity, func)
    }

    pub fn define_native_with_visibility(
        &self,
        module: &ModuleRef,
        name: &str,
        visibility: Visibility,
        arity: Arity,
        func: NativeFn,
    ) -> MethodRef {
        let method = DynamicMethod::native(module, visibility, arity, func);
        self.add_method(module, self.intern(name), method)
    }

    /// Define a native singleton ("class") method.
    pub fn define_singleton_native(
        &self,
        module: &ModuleRef,
        name: &str,
        arity: Arity,
        func: NativeFn,
    ) -> Result<MethodRef, EvalError> {
        let metaclass = self.singleton_class_of(&Value::Module(module.clone()))?;
        Ok(self.define_native(&metaclass, name, arity, func))
    }

    // Inclusion

    /// Insert `module` (and the modules it includes) into `target`'s
    /// ancestry directly above `target`. Modules already in the chain are
    /// skipped.
    pub fn include_module(&self, target: &ModuleRef, module: &ModuleRef) -> Result<(), EvalError> {
        if !module.is_module() {
            return Err(crate::errors::wrong_argument_type(
                &self.real_class_of(&Value::Module(module.clone())).display_name(),
                "Module",
            ));
        }
        if module.inherits_from(target) {
            return Err(argument_error("cyclic include detected"));
        }
        let mut cursor = target.clone();
        for entry in module.chain() {
            let origin = entry.origin_ref();
            if target.inherits_from(&origin) {
                continue;
            }
            let proxy = RModule::new(
                ModuleKind::IncludeProxy(origin.clone()),
                None,
                cursor.superclass(),
            );
            cursor.set_superclass(Some(proxy.clone()));
            cursor = proxy;
            self.method_cache.module_included(target, &origin);
        }
        Ok(())
    }
}
