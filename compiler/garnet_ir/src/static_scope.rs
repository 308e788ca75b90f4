//! Static (parse-time) variable tables.
//!
//! A `StaticScope` names the slots of the dynamic scopes created from it.
//! Slot indices are fixed once assigned; new variables only append.
//! Block scopes link to the static scope they are nested in so that a
//! name can be resolved to a `(depth, index)` pair.

use crate::Name;
use std::sync::Arc;

/// Whether a scope starts a fresh local-variable namespace or nests in its
/// parent.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScopeKind {
    /// Method bodies, class bodies and the top level.
    Local,
    /// Block bodies; unresolved names continue in the parent scope.
    Block,
}

#[derive(Debug)]
pub struct StaticScope {
    kind: ScopeKind,
    variables: Vec<Name>,
    parent: Option<Arc<StaticScope>>,
}

impl StaticScope {
    pub fn local(variables: Vec<Name>) -> Arc<Self> {
        Arc::new(Self {
            kind: ScopeKind::Local,
            variables,
            parent: None,
        })
    }

    pub fn block(parent: Arc<StaticScope>, variables: Vec<Name>) -> Arc<Self> {
        Arc::new(Self {
            kind: ScopeKind::Block,
            variables,
            parent: Some(parent),
        })
    }

    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<&Arc<StaticScope>> {
        self.parent.as_ref()
    }

    pub fn variables(&self) -> &[Name] {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn variable(&self, index: usize) -> Option<Name> {
        self.variables.get(index).copied()
    }

    pub fn index_of(&self, name: Name) -> Option<usize> {
        self.variables.iter().position(|v| *v == name)
    }

    /// Resolve `name` through block nesting to `(depth, index)`.
    ///
    /// Depth 0 is this scope. Resolution stops at the first `Local` scope.
    pub fn resolve(&self, name: Name) -> Option<(usize, usize)> {
        let mut depth = 0;
        let mut scope = self;
        loop {
            if let Some(index) = scope.index_of(name) {
                return Some((depth, index));
            }
            match (scope.kind, scope.parent.as_deref()) {
                (ScopeKind::Block, Some(parent)) => {
                    scope = parent;
                    depth += 1;
                }
                _ => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests;
