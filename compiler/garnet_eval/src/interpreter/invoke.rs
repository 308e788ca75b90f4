//! The method call protocol.
//!
//! Every method variant goes through [`Interpreter::invoke_method`]:
//!
//! 1. poll thread events
//! 2. check arity
//! 3. push frame / backtrace entry / scope as the method's
//!    [`CallConfiguration`] asks, counting call depth
//! 4. bind arguments
//! 5. run the body
//! 6. turn a `return` aimed at this activation into the call's value and
//!    any other stray jump into a `LocalJumpError`
//! 7. pop (the activation guard's drop)
//!
//! Interpreted methods also count invocations here and are handed to the
//! runtime's [`MethodCompiler`](crate::method::MethodCompiler) once hot.

use std::sync::Arc;

use garnet_ir::{Name, StaticScope};

use super::{Activation, Interpreter};
use crate::ast::ArgsDecl;
use crate::block::{Block, BlockKind};
use crate::context::EvalContext;
use crate::errors::{no_method, ControlAction, EvalResult};
use crate::frame::{ActivationId, Frame};
use crate::method::{DynamicMethod, Framing, InterpretedMethod, MethodKind};
use crate::scope::{DynamicScope, ScopeRef};
use crate::value::{RProc, Value};

impl Interpreter {
    /// Invoke a resolved method on `receiver`.
    #[tracing::instrument(level = "trace", skip_all, fields(method = self.runtime.lookup(name)))]
    pub fn invoke_method(
        &mut self,
        method: &DynamicMethod,
        receiver: &Value,
        name: Name,
        args: &[Value],
        block: &Block,
    ) -> EvalResult {
        self.poll_events()?;
        match method.kind() {
            MethodKind::Native(native) => {
                native.arity.check(args.len())?;
                let activation = self.method_activation(method, receiver, name, args, block);
                let mut guard = self.activate(activation)?;
                (native.func)(&mut *guard, receiver, args, block)
            }
            MethodKind::Interpreted(interpreted) => {
                interpreted.arity().check(args.len())?;
                let decl = &interpreted.def().args;
                self.maybe_compile(name, interpreted);
                let mut activation = self.method_activation(method, receiver, name, args, block);
                activation.scope = method_scope(method, &interpreted.def().scope);
                activation.context = Some(EvalContext::new(interpreted.cref().clone()));
                let mut guard = self.activate(activation)?;
                let id = guard.frames.current().activation();
                let result = guard
                    .bind_arguments(decl, args, block, method.config().framing == Framing::Full)
                    .and_then(|()| match interpreted.compiled() {
                        Some(body) => body(&mut *guard, receiver, block),
                        None => guard.eval_opt(interpreted.def().body.as_ref()),
                    });
                drop(guard);
                method_result(result, id)
            }
            MethodKind::Compiled(compiled) => {
                compiled.arity.check(args.len())?;
                let mut activation = self.method_activation(method, receiver, name, args, block);
                activation.scope = method_scope(method, &compiled.scope);
                let mut guard = self.activate(activation)?;
                let id = guard.frames.current().activation();
                for (index, value) in args.iter().enumerate() {
                    guard.set_local(index, value.clone());
                }
                let result = (compiled.entry)(&mut *guard, receiver, block);
                drop(guard);
                method_result(result, id)
            }
            MethodKind::Undefined => {
                Err(no_method(self.runtime.lookup(name), &self.describe_receiver(receiver)).into())
            }
        }
    }

    /// Frame and backtrace entry a call to `method` pushes, per its call
    /// configuration. Scope and context are filled in by the caller.
    fn method_activation(
        &self,
        method: &DynamicMethod,
        receiver: &Value,
        name: Name,
        args: &[Value],
        block: &Block,
    ) -> Activation {
        let config = method.config();
        let frame = (config.framing == Framing::Full).then(|| {
            let klazz = method
                .owner()
                .unwrap_or_else(|| self.runtime.class_of(receiver));
            Frame::for_method(klazz, receiver.clone(), name, block.clone(), Arc::from(args))
        });
        let backtrace = (config.framing != Framing::None).then_some(name);
        Activation {
            frame,
            backtrace,
            counts_depth: true,
            ..Activation::default()
        }
    }

    /// Bind `args` into the fresh method scope: required, optional (with
    /// defaults evaluated in the callee), rest, post, block. With a full
    /// frame, the frame's argument vector is replaced by the bound values
    /// so `zsuper` re-passes evaluated defaults.
    fn bind_arguments(
        &mut self,
        decl: &ArgsDecl,
        args: &[Value],
        block: &Block,
        record_in_frame: bool,
    ) -> Result<(), ControlAction> {
        let scope = self.scopes.current().clone();
        let mut bound = Vec::with_capacity(args.len() + decl.optional.len());
        let mut next = 0;

        for param in &decl.pre {
            scope.set(param.index, 0, args[next].clone());
            bound.push(args[next].clone());
            next += 1;
        }

        let supplied_optional = (args.len() - decl.required_count()).min(decl.optional.len());
        for (i, opt) in decl.optional.iter().enumerate() {
            let value = if i < supplied_optional {
                next += 1;
                args[next - 1].clone()
            } else {
                self.eval_node(&opt.default)?
            };
            scope.set(opt.param.index, 0, value.clone());
            bound.push(value);
        }

        let rest_len = args.len() - next - decl.post.len();
        if let Some(rest) = decl.rest {
            let items = args[next..next + rest_len].to_vec();
            bound.extend_from_slice(&items);
            scope.set(rest.index, 0, Value::array(items));
        }
        next += rest_len;

        for param in &decl.post {
            scope.set(param.index, 0, args[next].clone());
            bound.push(args[next].clone());
            next += 1;
        }

        if let Some(param) = decl.block {
            let value = match block.data() {
                Some(_) => {
                    let lambda = block.kind() == Some(BlockKind::Lambda);
                    Value::Proc(Arc::new(RProc::new(block.clone(), lambda)))
                }
                None => Value::Nil,
            };
            scope.set(param.index, 0, value);
        }

        if record_in_frame {
            self.frames.current_mut().set_args(Arc::from(bound));
        }
        Ok(())
    }

    /// Count the call and, on the call that crosses the threshold, ask the
    /// compiler for a body.
    fn maybe_compile(&self, name: Name, method: &InterpretedMethod) {
        let jit = self.runtime.jit();
        let Some(compiler) = &jit.compiler else {
            return;
        };
        if !method.record_call(jit.threshold) {
            return;
        }
        let method_name = self.runtime.lookup(name);
        match compiler.compile(name, method) {
            Some(body) => {
                tracing::debug!(method = method_name, "compiled hot method");
                method.install_compiled(body);
            }
            None => tracing::trace!(method = method_name, "compiler declined hot method"),
        }
    }
}

/// A fresh scope for the method body, unless the method runs in its
/// caller's scope.
fn method_scope(method: &DynamicMethod, scope: &Arc<StaticScope>) -> Option<ScopeRef> {
    method
        .config()
        .scoping
        .then(|| DynamicScope::new(scope.clone(), None))
}

/// Map the outcome of a method body: a `return` aimed at `activation` is
/// the call's value; a tagged `break` or a `return` for an outer
/// activation keeps unwinding; other loop signals cannot leave a method.
fn method_result(result: EvalResult, activation: ActivationId) -> EvalResult {
    match result {
        Ok(value) => Ok(value),
        Err(ControlAction::Return { target, value }) if target == activation => Ok(value),
        Err(
            action @ (ControlAction::Error(_)
            | ControlAction::Return { .. }
            | ControlAction::Break {
                target: Some(_), ..
            }),
        ) => Err(action),
        Err(action) => Err(action.into_error().into()),
    }
}
