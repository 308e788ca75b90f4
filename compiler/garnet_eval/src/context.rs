//! Lexical evaluation context.
//!
//! An [`EvalContext`] is the immutable "where am I defining things" value
//! threaded through every `eval` call next to the frame and scope: the
//! constant-reference chain (`Cref`) and the module that `def` installs
//! into. Entering a class body, method body or `class_eval` produces a
//! modified copy; nothing is restored by hand on the way out.

use std::sync::Arc;

use crate::module::ModuleRef;

/// Lexical module nesting, innermost first.
#[derive(Clone)]
pub struct Cref(Arc<CrefNode>);

struct CrefNode {
    module: ModuleRef,
    parent: Option<Cref>,
}

impl Cref {
    pub fn root(module: ModuleRef) -> Self {
        Cref(Arc::new(CrefNode {
            module,
            parent: None,
        }))
    }

    #[must_use]
    pub fn push(&self, module: ModuleRef) -> Self {
        Cref(Arc::new(CrefNode {
            module,
            parent: Some(self.clone()),
        }))
    }

    pub fn module(&self) -> &ModuleRef {
        &self.0.module
    }

    pub fn parent(&self) -> Option<&Cref> {
        self.0.parent.as_ref()
    }

    /// Modules from innermost to outermost.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleRef> {
        std::iter::successors(Some(self), |c| c.parent()).map(Cref::module)
    }
}

#[derive(Clone)]
pub struct EvalContext {
    pub cref: Cref,
    /// Target of `def` and the default-visibility operations.
    pub definee: ModuleRef,
}

impl EvalContext {
    pub fn new(cref: Cref) -> Self {
        let definee = cref.module().clone();
        Self { cref, definee }
    }

    /// Context for a class/module body.
    #[must_use]
    pub fn nested(&self, module: ModuleRef) -> Self {
        Self {
            cref: self.cref.push(module.clone()),
            definee: module,
        }
    }

    /// Same constant scope, different `def` target (`instance_eval`).
    #[must_use]
    pub fn with_definee(&self, definee: ModuleRef) -> Self {
        Self {
            cref: self.cref.clone(),
            definee,
        }
    }
}
