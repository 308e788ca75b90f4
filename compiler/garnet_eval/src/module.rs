//! Classes, modules, singleton classes and include proxies.
//!
//! Every module owns four tables (methods, constants, class variables,
//! instance variables) behind their own `RwLock`s, since they are shared
//! across evaluator threads. Inclusion inserts an include proxy into the
//! superclass chain; the proxy forwards its tables to the included module.
//!
//! Method-table mutation is `pub(crate)`: outside code goes through
//! [`Runtime::add_method`](crate::Runtime::add_method) and friends, which
//! also notify the method cache.

use std::sync::{Arc, Weak};

use garnet_ir::Name;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::method::MethodRef;
use crate::value::{next_object_id, RObject, Value};

pub type ModuleRef = Arc<RModule>;

/// What a singleton class is attached to.
#[derive(Clone)]
pub enum Attached {
    Object(Weak<RObject>),
    Module(Weak<RModule>),
}

#[derive(Clone)]
pub enum ModuleKind {
    Class,
    Module,
    Singleton(Attached),
    IncludeProxy(ModuleRef),
}

pub struct RModule {
    id: u64,
    kind: ModuleKind,
    name: RwLock<Option<Arc<str>>>,
    superclass: RwLock<Option<ModuleRef>>,
    methods: RwLock<FxHashMap<Name, MethodRef>>,
    constants: RwLock<FxHashMap<Name, Value>>,
    class_vars: RwLock<FxHashMap<Name, Value>>,
    ivars: RwLock<FxHashMap<Name, Value>>,
    metaclass: RwLock<Option<ModuleRef>>,
}

impl RModule {
    pub(crate) fn new(
        kind: ModuleKind,
        name: Option<&str>,
        superclass: Option<ModuleRef>,
    ) -> ModuleRef {
        Arc::new(Self {
            id: next_object_id(),
            kind,
            name: RwLock::new(name.map(Arc::from)),
            superclass: RwLock::new(superclass),
            methods: RwLock::new(FxHashMap::default()),
            constants: RwLock::new(FxHashMap::default()),
            class_vars: RwLock::new(FxHashMap::default()),
            ivars: RwLock::new(FxHashMap::default()),
            metaclass: RwLock::new(None),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> &ModuleKind {
        &self.kind
    }

    pub fn is_class(&self) -> bool {
        matches!(self.kind, ModuleKind::Class | ModuleKind::Singleton(_))
    }

    /// A plain module (`module Foo`), not a class.
    pub fn is_module(&self) -> bool {
        matches!(self.kind, ModuleKind::Module)
    }

    pub fn is_singleton(&self) -> bool {
        matches!(self.kind, ModuleKind::Singleton(_))
    }

    pub fn is_include_proxy(&self) -> bool {
        matches!(self.kind, ModuleKind::IncludeProxy(_))
    }

    /// The module whose tables this entry exposes: the included module for
    /// an include proxy, `self` otherwise.
    pub fn origin(&self) -> &RModule {
        match &self.kind {
            ModuleKind::IncludeProxy(module) => module,
            _ => self,
        }
    }

    /// Owned variant of [`RModule::origin`].
    pub fn origin_ref(self: &Arc<Self>) -> ModuleRef {
        match &self.kind {
            ModuleKind::IncludeProxy(module) => module.clone(),
            _ => self.clone(),
        }
    }

    /// Whether `self` and `other` expose the same tables.
    pub fn same_origin(&self, other: &RModule) -> bool {
        self.origin().id == other.origin().id
    }

    pub fn attached(&self) -> Option<&Attached> {
        match &self.kind {
            ModuleKind::Singleton(attached) => Some(attached),
            _ => None,
        }
    }

    pub fn name(&self) -> Option<Arc<str>> {
        self.origin().name.read().clone()
    }

    /// Name an anonymous module on its first constant assignment.
    pub(crate) fn set_name_if_anonymous(&self, name: &str) {
        let mut slot = self.name.write();
        if slot.is_none() {
            *slot = Some(Arc::from(name));
        }
    }

    /// Human-readable name, including anonymous and singleton forms.
    pub fn display_name(&self) -> String {
        if let Some(name) = self.name() {
            return name.to_string();
        }
        match &self.kind {
            ModuleKind::Singleton(Attached::Module(module)) => match module.upgrade() {
                Some(module) => format!("#<Class:{}>", module.display_name()),
                None => "#<Class:?>".to_string(),
            },
            ModuleKind::Singleton(Attached::Object(object)) => match object.upgrade() {
                Some(object) => format!("#<Class:#<{}>>", object.class().display_name()),
                None => "#<Class:?>".to_string(),
            },
            ModuleKind::Module => format!("#<Module:{:#x}>", self.id),
            _ => format!("#<Class:{:#x}>", self.id),
        }
    }

    pub fn superclass(&self) -> Option<ModuleRef> {
        self.superclass.read().clone()
    }

    pub(crate) fn set_superclass(&self, superclass: Option<ModuleRef>) {
        *self.superclass.write() = superclass;
    }

    /// First superclass that is neither an include proxy nor a singleton.
    pub fn real_superclass(&self) -> Option<ModuleRef> {
        let mut current = self.superclass();
        while let Some(module) = current {
            if !module.is_include_proxy() && !module.is_singleton() {
                return Some(module);
            }
            current = module.superclass();
        }
        None
    }

    pub fn metaclass(&self) -> Option<ModuleRef> {
        self.metaclass.read().clone()
    }

    pub(crate) fn set_metaclass(&self, metaclass: ModuleRef) {
        *self.metaclass.write() = Some(metaclass);
    }

    /// Iterate `self` and its superclass chain, include proxies included.
    pub fn chain(self: &Arc<Self>) -> Chain {
        Chain {
            next: Some(self.clone()),
        }
    }

    /// Ancestors with include proxies replaced by their modules.
    pub fn ancestors(self: &Arc<Self>) -> Vec<ModuleRef> {
        self.chain().map(|m| m.origin_ref()).collect()
    }

    /// `kind_of?` test: whether `other` appears in this chain.
    pub fn inherits_from(self: &Arc<Self>, other: &RModule) -> bool {
        self.chain().any(|m| m.same_origin(other))
    }

    // Methods

    /// Method defined directly in this module's table.
    pub fn method_entry(&self, name: Name) -> Option<MethodRef> {
        self.origin().methods.read().get(&name).cloned()
    }

    pub fn method_names(&self) -> Vec<Name> {
        self.origin().methods.read().keys().copied().collect()
    }

    /// Walk the chain for `name`, returning the method and the chain entry
    /// it was found in. An undefined sentinel stops the search and is
    /// returned like any other method.
    pub fn search_method(self: &Arc<Self>, name: Name) -> Option<(MethodRef, ModuleRef)> {
        self.chain()
            .find_map(|module| module.method_entry(name).map(|method| (method, module)))
    }

    pub(crate) fn put_method(&self, name: Name, method: MethodRef) -> Option<MethodRef> {
        self.origin().methods.write().insert(name, method)
    }

    /// Remove `name` from the own table. An undefined sentinel counts as
    /// absent and stays in place.
    pub(crate) fn take_method(&self, name: Name) -> Option<MethodRef> {
        let mut methods = self.origin().methods.write();
        let defined = methods.get(&name).is_some_and(|m| !m.is_undefined());
        if defined {
            methods.remove(&name)
        } else {
            None
        }
    }

    // Constants

    pub fn const_get_own(&self, name: Name) -> Option<Value> {
        self.origin().constants.read().get(&name).cloned()
    }

    /// Constant from this module or its ancestors.
    pub fn const_get_inherited(self: &Arc<Self>, name: Name) -> Option<Value> {
        self.chain().find_map(|m| m.const_get_own(name))
    }

    pub fn const_set(&self, name: Name, value: Value) {
        self.origin().constants.write().insert(name, value);
    }

    // Class variables

    pub fn class_var_get_own(&self, name: Name) -> Option<Value> {
        self.origin().class_vars.read().get(&name).cloned()
    }

    /// The chain entry that defines class variable `name`.
    pub fn class_var_owner(self: &Arc<Self>, name: Name) -> Option<ModuleRef> {
        self.chain()
            .find(|m| m.origin().class_vars.read().contains_key(&name))
            .map(|m| m.origin_ref())
    }

    pub fn class_var_set(&self, name: Name, value: Value) {
        self.origin().class_vars.write().insert(name, value);
    }

    // Instance variables (of the module object itself)

    pub fn ivar_get(&self, name: Name) -> Option<Value> {
        self.ivars.read().get(&name).cloned()
    }

    pub fn ivar_set(&self, name: Name, value: Value) {
        self.ivars.write().insert(name, value);
    }
}

/// Iterator over a superclass chain.
pub struct Chain {
    next: Option<ModuleRef>,
}

impl Iterator for Chain {
    type Item = ModuleRef;

    fn next(&mut self) -> Option<ModuleRef> {
        let current = self.next.take()?;
        self.next = current.superclass();
        Some(current)
    }
}

#[cfg(test)]
mod tests;
