//! RAII activation guard.
//!
//! [`ActivationGuard`] holds `&mut Interpreter` and implements
//! `Deref`/`DerefMut`, so code running inside an activation uses the guard
//! exactly like the interpreter. Dropping it pops whatever
//! [`Interpreter::activate`] pushed, in reverse order, and restores the
//! caller's position and lexical context, including during unwinding.

use std::ops::{Deref, DerefMut};

use garnet_ir::{Name, SourcePosition};

use super::Interpreter;
use crate::context::EvalContext;
use crate::errors::{stack_too_deep, EvalError};
use crate::frame::Frame;
use crate::scope::ScopeRef;

/// What an activation pushes.
#[derive(Default)]
pub(crate) struct Activation {
    pub(crate) frame: Option<Frame>,
    pub(crate) scope: Option<ScopeRef>,
    /// Backtrace entry name.
    pub(crate) backtrace: Option<Name>,
    pub(crate) context: Option<EvalContext>,
    /// Count against the call depth limit.
    pub(crate) counts_depth: bool,
}

#[derive(Copy, Clone, Default)]
struct Pushed {
    frame: bool,
    scope: bool,
    backtrace: bool,
    depth: bool,
}

pub(crate) struct ActivationGuard<'a> {
    interpreter: &'a mut Interpreter,
    pushed: Pushed,
    saved_context: Option<EvalContext>,
    saved_position: SourcePosition,
}

impl Drop for ActivationGuard<'_> {
    fn drop(&mut self) {
        let interp = &mut *self.interpreter;
        if let Some(context) = self.saved_context.take() {
            interp.context = context;
        }
        if self.pushed.scope {
            interp.scopes.pop();
        }
        interp.position = if self.pushed.frame {
            interp.frames.pop()
        } else {
            self.saved_position
        };
        if self.pushed.backtrace {
            interp.call_stack.pop();
        }
        if self.pushed.depth {
            interp.depth.exit();
        }
    }
}

impl Deref for ActivationGuard<'_> {
    type Target = Interpreter;

    fn deref(&self) -> &Self::Target {
        self.interpreter
    }
}

impl DerefMut for ActivationGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.interpreter
    }
}

impl Interpreter {
    /// Push an activation. Fails without pushing anything when the call
    /// depth limit is reached.
    pub(crate) fn activate(&mut self, activation: Activation) -> Result<ActivationGuard<'_>, EvalError> {
        let mut pushed = Pushed::default();
        if activation.counts_depth {
            self.depth.enter().map_err(|exceeded| {
                tracing::debug!(limit = exceeded.limit, "call depth limit reached");
                stack_too_deep()
            })?;
            pushed.depth = true;
        }
        let saved_position = self.position;
        if let Some(name) = activation.backtrace {
            self.call_stack.push(name, saved_position);
            pushed.backtrace = true;
        }
        if let Some(frame) = activation.frame {
            self.frames.push(frame, saved_position);
            pushed.frame = true;
        }
        if let Some(scope) = activation.scope {
            self.scopes.push(scope);
            pushed.scope = true;
        }
        let saved_context = activation
            .context
            .map(|context| std::mem::replace(&mut self.context, context));
        Ok(ActivationGuard {
            interpreter: self,
            pushed,
            saved_context,
            saved_position,
        })
    }
}
