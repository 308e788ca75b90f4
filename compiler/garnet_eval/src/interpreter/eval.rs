//! Node dispatch.
//!
//! `eval_node` is the only recursive entry: it grows the host stack when
//! needed and stamps errors with the position and backtrace of the
//! innermost node they passed through. Sequences and conditionals are
//! evaluated in a loop so their last expression does not add a host frame.

use garnet_ir::CallType;

use super::Interpreter;
use crate::ast::{NodeKind, NodeRef};
use crate::block::Block;
use crate::errors::{local_jump, uninitialized_constant, ControlAction, EvalError, EvalResult, LocalJumpReason};
use crate::value::Value;

impl Interpreter {
    /// Evaluate a top-level program. A `return` at the top level ends the
    /// program with its value; any other escaping signal becomes an error.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn eval(&mut self, node: &NodeRef) -> Result<Value, EvalError> {
        let root = self.frames.current().activation();
        match self.eval_node(node) {
            Ok(value) => Ok(value),
            Err(ControlAction::Return { target, value }) if target == root => Ok(value),
            Err(action) => Err(self.finish_error(action)),
        }
    }

    /// Turn an escaped signal into the error handed to the host, making
    /// sure it carries a position and backtrace.
    pub(crate) fn finish_error(&mut self, action: ControlAction) -> EvalError {
        match self.annotate(action) {
            ControlAction::Error(err) => *err,
            other => {
                let err = other.into_error();
                err.with_position(self.position).with_backtrace(self.backtrace())
            }
        }
    }

    pub(crate) fn eval_node(&mut self, node: &NodeRef) -> EvalResult {
        garnet_stack::ensure_sufficient_stack(|| self.eval_inner(node))
            .map_err(|action| self.annotate(action))
    }

    pub(crate) fn eval_opt(&mut self, node: Option<&NodeRef>) -> EvalResult {
        match node {
            Some(node) => self.eval_node(node),
            None => Ok(Value::Nil),
        }
    }

    /// Attach position and backtrace to an error on its way out of the
    /// node that raised it.
    fn annotate(&mut self, action: ControlAction) -> ControlAction {
        match action {
            ControlAction::Error(err) if err.backtrace.is_none() => {
                let backtrace = self.backtrace();
                ControlAction::Error(Box::new(
                    err.with_position(self.position).with_backtrace(backtrace),
                ))
            }
            other => other,
        }
    }

    fn eval_inner(&mut self, node: &NodeRef) -> EvalResult {
        let mut node = node;
        loop {
            self.position = node.position;
            match &node.kind {
                NodeKind::Block(stmts) => {
                    let Some((last, init)) = stmts.split_last() else {
                        return Ok(Value::Nil);
                    };
                    for stmt in init {
                        self.eval_node(stmt)?;
                    }
                    node = last;
                }
                NodeKind::If {
                    cond,
                    then_body,
                    else_body,
                } => {
                    let branch = if self.eval_node(cond)?.is_truthy() {
                        then_body
                    } else {
                        else_body
                    };
                    match branch {
                        Some(branch) => node = branch,
                        None => return Ok(Value::Nil),
                    }
                }
                NodeKind::And(left, right) => {
                    let value = self.eval_node(left)?;
                    if !value.is_truthy() {
                        return Ok(value);
                    }
                    node = right;
                }
                NodeKind::Or(left, right) => {
                    let value = self.eval_node(left)?;
                    if value.is_truthy() {
                        return Ok(value);
                    }
                    node = right;
                }
                _ => return self.eval_simple(node),
            }
        }
    }

    fn eval_simple(&mut self, node: &NodeRef) -> EvalResult {
        match &node.kind {
            NodeKind::Block(_) | NodeKind::If { .. } | NodeKind::And(..) | NodeKind::Or(..) => {
                self.eval_inner(node)
            }

            // Literals
            NodeKind::Nil => Ok(Value::Nil),
            NodeKind::True => Ok(Value::Bool(true)),
            NodeKind::False => Ok(Value::Bool(false)),
            NodeKind::SelfRef => Ok(self.current_self().clone()),
            NodeKind::Fixnum(n) => Ok(Value::Fixnum(*n)),
            NodeKind::Float(x) => Ok(Value::Float(*x)),
            NodeKind::Str(s) => Ok(Value::Str(s.clone())),
            NodeKind::Symbol(name) => Ok(Value::Symbol(*name)),
            NodeKind::DStr(parts) => {
                let mut out = String::new();
                for part in parts {
                    let value = self.eval_node(part)?;
                    out.push_str(&self.to_s_string(&value)?);
                }
                Ok(Value::str(out))
            }
            NodeKind::Array(items) => Ok(Value::array(self.eval_args(items)?.into_vec())),
            NodeKind::Splat(inner) => {
                let value = self.eval_node(inner)?;
                Ok(Value::array(self.splat_values(value)?))
            }
            NodeKind::Not(inner) => Ok(Value::Bool(!self.eval_node(inner)?.is_truthy())),

            // Control flow
            NodeKind::Case {
                subject,
                whens,
                else_body,
                site,
            } => self.eval_case(subject.as_ref(), whens, else_body.as_ref(), site),
            NodeKind::Loop {
                kind,
                cond,
                body,
                pre_test,
            } => self.eval_loop(*kind, cond, body.as_ref(), *pre_test),
            NodeKind::For { iter, block, site } => self.eval_for(iter, block, site),
            NodeKind::Break(value) => {
                let value = self.eval_opt(value.as_ref())?;
                Err(ControlAction::Break {
                    target: None,
                    value,
                })
            }
            NodeKind::Next(value) => {
                let value = self.eval_opt(value.as_ref())?;
                self.poll_events()?;
                Err(ControlAction::Next(value))
            }
            NodeKind::Redo => {
                self.poll_events()?;
                Err(ControlAction::Redo)
            }
            NodeKind::Retry => {
                self.poll_events()?;
                Err(ControlAction::Retry)
            }
            NodeKind::Return(value) => {
                let value = self.eval_opt(value.as_ref())?;
                self.eval_return(value)
            }
            NodeKind::Rescue {
                body,
                clauses,
                else_body,
            } => self.eval_rescue(body.as_ref(), clauses, else_body.as_ref()),
            NodeKind::Ensure { body, ensure } => {
                self.with_ensure(|interp| interp.eval_opt(body.as_ref()), ensure.as_ref())
            }

            // Calls
            NodeKind::Call {
                receiver,
                args,
                site,
            } => {
                let receiver = self.eval_node(receiver)?;
                self.eval_call(site, &receiver, args)
            }
            NodeKind::FCall { args, site } => {
                let receiver = self.current_self().clone();
                self.eval_call(site, &receiver, args)
            }
            NodeKind::VCall { site } => {
                let receiver = self.current_self().clone();
                site.call(self, &receiver, &[], &Block::none())
            }
            NodeKind::Super { args } => self.eval_super(Some(args), None),
            NodeKind::ZSuper { block } => self.eval_super(None, block.as_ref()),
            NodeKind::Yield { args } => {
                let args = self.eval_args(args)?;
                let block = self.frames.current().block().clone();
                self.yield_block(&block, &args)
            }
            NodeKind::AttrAssign {
                receiver,
                args,
                site,
            } => {
                let receiver = self.eval_node(receiver)?;
                let args = self.eval_args(args)?;
                site.call(self, &receiver, &args, &Block::none())?;
                Ok(args.last().cloned().unwrap_or_default())
            }
            NodeKind::OpAsgn {
                receiver,
                reader,
                writer,
                op,
                value,
            } => self.eval_op_asgn(receiver, reader, writer, op, value),
            NodeKind::OrAsgn { read, assign } => {
                let current = self.eval_asgn_read(read)?;
                if current.is_truthy() {
                    Ok(current)
                } else {
                    self.eval_node(assign)
                }
            }
            NodeKind::AndAsgn { read, assign } => {
                let current = self.eval_asgn_read(read)?;
                if current.is_truthy() {
                    self.eval_node(assign)
                } else {
                    Ok(current)
                }
            }

            // Variables
            NodeKind::LocalVar { index, .. } => Ok(self.scopes.current().get(*index, 0)),
            NodeKind::DVar { index, depth, .. } => Ok(self.scopes.current().get(*index, *depth)),
            NodeKind::InstVar(name) => Ok(self.ivar_get(&self.current_self().clone(), *name)),
            NodeKind::GlobalVar(name) => Ok(self.global_get(*name)),
            NodeKind::ClassVar(name) => Ok(self.class_var_get(*name)?),
            NodeKind::Const(name) => Ok(self.const_get(*name)?),
            NodeKind::Colon2 { scope, name } => {
                let scope = self.eval_node(scope)?;
                let module = self.expect_module(&scope)?;
                module.const_get_inherited(*name).ok_or_else(|| {
                    let qualified = self
                        .runtime
                        .qualified_name(&module, self.runtime.lookup(*name));
                    uninitialized_constant(&qualified).into()
                })
            }
            NodeKind::Colon3(name) => self
                .runtime
                .core()
                .object
                .const_get_own(*name)
                .ok_or_else(|| uninitialized_constant(self.runtime.lookup(*name)).into()),
            NodeKind::Asgn { target, value } => {
                let value = self.eval_node(value)?;
                self.assign(target, value.clone())?;
                Ok(value)
            }
            NodeKind::MultipleAsgn { targets, value } => {
                let value = self.eval_node(value)?;
                let items = self.masgn_values(&value)?;
                self.bind_targets(targets, &items)?;
                Ok(value)
            }

            // Definitions
            NodeKind::Defn { name, def } => self.eval_defn(*name, def),
            NodeKind::Defs {
                receiver,
                name,
                def,
            } => {
                let receiver = self.eval_node(receiver)?;
                self.eval_defs(&receiver, *name, def)
            }
            NodeKind::Class {
                path,
                superclass,
                body,
            } => self.eval_class(path, superclass.as_ref(), body),
            NodeKind::Module { path, body } => self.eval_module(path, body),
            NodeKind::SClass { receiver, body } => {
                let receiver = self.eval_node(receiver)?;
                let singleton = self.runtime.singleton_class_of(&receiver)?;
                self.eval_class_body(&singleton, body)
            }
            NodeKind::Alias { new_name, old_name } => self.eval_alias(*new_name, *old_name),
            NodeKind::Undef(name) => {
                let module = self.context.definee.clone();
                self.runtime.undef_method(&module, *name)?;
                Ok(Value::Nil)
            }
        }
    }

    /// `return`: targets the activation of the current frame. From a block
    /// whose method has already returned it is a `LocalJumpError`.
    fn eval_return(&mut self, value: Value) -> EvalResult {
        let frame = self.frames.current();
        let target = frame.activation();
        if frame.is_block_frame() && !self.frames.has_method_activation(target) {
            return Err(local_jump(LocalJumpReason::Return).into());
        }
        Err(ControlAction::Return { target, value })
    }

    /// `to_s` of a value as a Rust string, dispatching for non-strings.
    pub(crate) fn to_s_string(&mut self, value: &Value) -> Result<String, ControlAction> {
        if let Value::Str(s) = value {
            return Ok(s.to_string());
        }
        let to_s = self.runtime.names().to_s;
        match self.send(value, to_s, &[], &Block::none(), CallType::Functional)? {
            Value::Str(s) => Ok(s.to_string()),
            _ => Ok(crate::builtins::default_to_s(&self.runtime, value)),
        }
    }

    /// `inspect` of a value as a Rust string.
    pub(crate) fn inspect_string(&mut self, value: &Value) -> Result<String, ControlAction> {
        let inspect = self.runtime.names().inspect;
        match self.send(value, inspect, &[], &Block::none(), CallType::Functional)? {
            Value::Str(s) => Ok(s.to_string()),
            _ => Ok(crate::builtins::inspect_value(&self.runtime, value)),
        }
    }
}
