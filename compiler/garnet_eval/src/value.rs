//! Runtime values.
//!
//! Immediates (`nil`, booleans, integers, floats, symbols) are stored
//! inline; everything with identity lives behind an `Arc`. All values are
//! `Send + Sync` so several evaluator threads can share objects.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use garnet_ir::Name;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::block::Block;
use crate::module::ModuleRef;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(8);

/// Allocate a process-unique object id.
pub(crate) fn next_object_id() -> u64 {
    NEXT_OBJECT_ID.fetch_add(8, Ordering::Relaxed)
}

#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Nil,
    Bool(bool),
    Fixnum(i64),
    Float(f64),
    Symbol(Name),
    Str(Arc<str>),
    Array(Arc<RArray>),
    Object(Arc<RObject>),
    Module(ModuleRef),
    Proc(Arc<RProc>),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Arc::new(RArray::new(items)))
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Everything except `nil` and `false` is true.
    #[inline]
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }

    pub fn as_fixnum(&self) -> Option<i64> {
        match self {
            Value::Fixnum(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_module(&self) -> Option<&ModuleRef> {
        match self {
            Value::Module(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Arc<RArray>> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<RObject>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_proc(&self) -> Option<&Arc<RProc>> {
        match self {
            Value::Proc(p) => Some(p),
            _ => None,
        }
    }

    /// Identity comparison (`equal?`).
    ///
    /// Immediates compare by value; strings are heap objects and compare by
    /// pointer.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Arc::ptr_eq(a, b),
            (Value::Array(a), Value::Array(b)) => Arc::ptr_eq(a, b),
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Arc::ptr_eq(a, b),
            (Value::Proc(a), Value::Proc(b)) => Arc::ptr_eq(a, b),
            _ => self == other,
        }
    }

    /// `object_id`: tagged integers for immediates, allocation ids otherwise.
    #[expect(
        clippy::cast_possible_wrap,
        reason = "object ids are opaque; wrapping is harmless"
    )]
    pub fn object_id(&self) -> i64 {
        match self {
            Value::Nil => 4,
            Value::Bool(false) => 0,
            Value::Bool(true) => 2,
            Value::Fixnum(n) => n.wrapping_mul(2).wrapping_add(1),
            Value::Float(f) => f.to_bits() as i64,
            Value::Symbol(name) => i64::from(name.raw()) * 8 + 6,
            Value::Str(s) => Arc::as_ptr(s).cast::<u8>() as usize as i64,
            Value::Array(a) => a.id as i64,
            Value::Object(o) => o.id as i64,
            Value::Module(m) => m.id() as i64,
            Value::Proc(p) => p.id as i64,
        }
    }
}

/// Structural equality for immediates and strings, identity for everything
/// else. Arrays compare element-wise.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Fixnum(a), Value::Fixnum(b)) => a == b,
            #[expect(clippy::float_cmp, reason = "language-level float equality")]
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                Arc::ptr_eq(a, b) || *a.items.read() == *b.items.read()
            }
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            (Value::Module(a), Value::Module(b)) => Arc::ptr_eq(a, b),
            (Value::Proc(a), Value::Proc(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Fixnum(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Symbol(name) => write!(f, ":{name:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Array(a) => f.debug_list().entries(a.items.read().iter()).finish(),
            Value::Object(o) => write!(f, "#<{}>", o.class.display_name()),
            Value::Module(m) => write!(f, "{}", m.display_name()),
            Value::Proc(p) => write!(f, "#<Proc:{}{}>", p.id, if p.lambda { " (lambda)" } else { "" }),
        }
    }
}

/// Growable array with interior mutability.
pub struct RArray {
    id: u64,
    items: RwLock<Vec<Value>>,
}

impl RArray {
    pub fn new(items: Vec<Value>) -> Self {
        Self {
            id: next_object_id(),
            items: RwLock::new(items),
        }
    }

    /// Snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.items.read().clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Value> {
        self.items.read().get(index).cloned()
    }

    pub fn push(&self, value: Value) {
        self.items.write().push(value);
    }

    pub fn pop(&self) -> Option<Value> {
        self.items.write().pop()
    }

    /// Store at `index`, padding with `nil` when writing past the end.
    pub fn set(&self, index: usize, value: Value) {
        let mut items = self.items.write();
        if index >= items.len() {
            items.resize(index + 1, Value::Nil);
        }
        items[index] = value;
    }
}

/// Instance of a user or core class.
pub struct RObject {
    id: u64,
    class: ModuleRef,
    ivars: RwLock<FxHashMap<Name, Value>>,
    singleton: RwLock<Option<ModuleRef>>,
}

impl RObject {
    pub fn new(class: ModuleRef) -> Self {
        Self {
            id: next_object_id(),
            class,
            ivars: RwLock::new(FxHashMap::default()),
            singleton: RwLock::new(None),
        }
    }

    /// The class the object was allocated from (never the singleton).
    pub fn class(&self) -> &ModuleRef {
        &self.class
    }

    pub fn ivar_get(&self, name: Name) -> Option<Value> {
        self.ivars.read().get(&name).cloned()
    }

    pub fn ivar_set(&self, name: Name, value: Value) {
        self.ivars.write().insert(name, value);
    }

    pub fn singleton(&self) -> Option<ModuleRef> {
        self.singleton.read().clone()
    }

    pub(crate) fn set_singleton(&self, singleton: ModuleRef) {
        *self.singleton.write() = Some(singleton);
    }
}

/// A block promoted to a first-class value.
pub struct RProc {
    id: u64,
    block: Block,
    lambda: bool,
}

impl RProc {
    pub fn new(block: Block, lambda: bool) -> Self {
        Self {
            id: next_object_id(),
            block,
            lambda,
        }
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    pub fn is_lambda(&self) -> bool {
        self.lambda
    }
}

#[cfg(test)]
mod tests;
