//! Local-variable storage.
//!
//! A `DynamicScope` holds the slots named by its [`StaticScope`] and links
//! to the scope it is nested in, so a block body reaches captured variables
//! as `(depth, index)`. Scopes are reference counted: a block that outlives
//! its creating call keeps the scope alive, and later writes from either
//! side stay visible to the other.

use std::sync::Arc;

use garnet_ir::StaticScope;
use parking_lot::RwLock;

use crate::value::Value;

pub type ScopeRef = Arc<DynamicScope>;

pub struct DynamicScope {
    static_scope: Arc<StaticScope>,
    slots: RwLock<Vec<Value>>,
    parent: Option<ScopeRef>,
}

impl DynamicScope {
    pub fn new(static_scope: Arc<StaticScope>, parent: Option<ScopeRef>) -> ScopeRef {
        let slots = vec![Value::Nil; static_scope.len()];
        Arc::new(Self {
            static_scope,
            slots: RwLock::new(slots),
            parent,
        })
    }

    pub fn static_scope(&self) -> &Arc<StaticScope> {
        &self.static_scope
    }

    pub fn parent(&self) -> Option<&ScopeRef> {
        self.parent.as_ref()
    }

    fn ancestor(&self, depth: usize) -> Option<&DynamicScope> {
        let mut scope = self;
        for _ in 0..depth {
            scope = scope.parent.as_deref()?;
        }
        Some(scope)
    }

    /// Read slot `index` of the scope `depth` levels out. Unassigned slots
    /// read as `nil`.
    pub fn get(&self, index: usize, depth: usize) -> Value {
        self.ancestor(depth)
            .and_then(|scope| scope.slots.read().get(index).cloned())
            .unwrap_or_default()
    }

    /// Write slot `index` of the scope `depth` levels out, appending slots
    /// if the index is past the end.
    pub fn set(&self, index: usize, depth: usize, value: Value) {
        let Some(scope) = self.ancestor(depth) else {
            debug_assert!(false, "scope depth {depth} out of range");
            return;
        };
        let mut slots = scope.slots.write();
        if index >= slots.len() {
            slots.resize(index + 1, Value::Nil);
        }
        slots[index] = value;
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.read().is_empty()
    }
}

/// Per-thread stack of active scopes. The root scope is never popped.
pub struct ScopeStack {
    scopes: Vec<ScopeRef>,
}

impl ScopeStack {
    pub fn new(root: ScopeRef) -> Self {
        Self { scopes: vec![root] }
    }

    pub fn push(&mut self, scope: ScopeRef) {
        self.scopes.push(scope);
    }

    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "ScopeStack::pop() would remove the root scope");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    pub fn current(&self) -> &ScopeRef {
        &self.scopes[self.scopes.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}
