//! Variable reads and writes of every kind, and destructuring assignment.

use garnet_ir::{CallType, Name};

use super::Interpreter;
use crate::ast::{AssignTarget, CPath, CPathScope, MasgnTargets, NodeKind, NodeRef, RestTarget};
use crate::block::Block;
use crate::errors::{
    runtime_error, type_error, uninitialized_class_var, uninitialized_constant, ControlAction,
    EvalError, EvalResult,
};
use crate::module::{Attached, ModuleRef};
use crate::value::Value;

impl Interpreter {
    // Instance variables

    pub(crate) fn ivar_get(&self, target: &Value, name: Name) -> Value {
        match target {
            Value::Object(object) => object.ivar_get(name).unwrap_or_default(),
            Value::Module(module) => module.ivar_get(name).unwrap_or_default(),
            _ => Value::Nil,
        }
    }

    pub(crate) fn ivar_set(&self, target: &Value, name: Name, value: Value) -> Result<(), EvalError> {
        match target {
            Value::Object(object) => object.ivar_set(name, value),
            Value::Module(module) => module.ivar_set(name, value),
            other => {
                return Err(runtime_error(format!(
                    "can't modify instance variables of {}",
                    self.runtime.real_class_of(other).display_name()
                )))
            }
        }
        Ok(())
    }

    // Globals. `$!` is per thread; `$~` and `$_` live in the frame.

    pub(crate) fn global_get(&self, name: Name) -> Value {
        if name == self.runtime.names().current_exception {
            return self.current_exception.clone();
        }
        match self.runtime.lookup(name) {
            "$~" => self.frames.current().backref(),
            "$_" => self.frames.current().lastline(),
            _ => self.runtime.global_get(name),
        }
    }

    pub(crate) fn global_set(&mut self, name: Name, value: Value) {
        if name == self.runtime.names().current_exception {
            self.current_exception = value;
            return;
        }
        match self.runtime.lookup(name) {
            "$~" => self.frames.current_mut().set_backref(value),
            "$_" => self.frames.current_mut().set_lastline(value),
            _ => self.runtime.global_set(name, value),
        }
    }

    // Class variables

    /// Module class variables resolve against: the innermost lexical
    /// module, with singleton classes replaced by what they are attached to.
    fn class_var_base(&self) -> ModuleRef {
        let mut module = self.context.cref.module().clone();
        while let Some(attached) = module.attached() {
            let next = match attached {
                Attached::Module(weak) => weak.upgrade(),
                Attached::Object(weak) => weak.upgrade().map(|object| object.class().clone()),
            };
            match next {
                Some(next) => module = next,
                None => break,
            }
        }
        module
    }

    pub(crate) fn class_var_get(&self, name: Name) -> Result<Value, EvalError> {
        let base = self.class_var_base();
        base.class_var_owner(name)
            .and_then(|owner| owner.class_var_get_own(name))
            .ok_or_else(|| {
                uninitialized_class_var(self.runtime.lookup(name), &base.display_name())
            })
    }

    /// Quiet lookup for `@@x ||= v`.
    fn class_var_lookup(&self, name: Name) -> Option<Value> {
        let base = self.class_var_base();
        base.class_var_owner(name)
            .and_then(|owner| owner.class_var_get_own(name))
    }

    /// Assign to the module that already defines `name`, else the base.
    pub(crate) fn class_var_set(&self, name: Name, value: Value) {
        let base = self.class_var_base();
        let owner = base.class_var_owner(name).unwrap_or(base);
        owner.class_var_set(name, value);
    }

    // Constants

    /// Lexical scopes innermost first (excluding the top level), then the
    /// ancestors of the innermost module, then `Object`.
    fn const_lookup(&self, name: Name) -> Option<Value> {
        let cref = &self.context.cref;
        std::iter::successors(Some(cref), |c| c.parent())
            .filter(|c| c.parent().is_some())
            .find_map(|c| c.module().const_get_own(name))
            .or_else(|| cref.module().const_get_inherited(name))
            .or_else(|| self.runtime.core().object.const_get_own(name))
    }

    pub(crate) fn const_get(&self, name: Name) -> Result<Value, EvalError> {
        self.const_lookup(name)
            .ok_or_else(|| uninitialized_constant(self.runtime.lookup(name)))
    }

    /// Bind a constant; an anonymous module assigned to a constant takes
    /// its name.
    pub(crate) fn const_assign(&self, outer: &ModuleRef, name: Name, value: Value) {
        match &value {
            Value::Module(module) => {
                self.runtime
                    .name_constant(outer, self.runtime.lookup(name), module);
            }
            _ => outer.const_set(name, value),
        }
    }

    /// The module a class, module or constant path defines into.
    pub(crate) fn cpath_module(&mut self, path: &CPath) -> Result<ModuleRef, ControlAction> {
        match &path.scope {
            CPathScope::Lexical => Ok(self.context.cref.module().clone()),
            CPathScope::TopLevel => Ok(self.runtime.core().object.clone()),
            CPathScope::Explicit(scope) => {
                let scope = self.eval_node(scope)?;
                Ok(self.expect_module(&scope)?)
            }
        }
    }

    pub(crate) fn expect_module(&self, value: &Value) -> Result<ModuleRef, EvalError> {
        match value {
            Value::Module(module) => Ok(module.clone()),
            other => Err(type_error(format!(
                "{} is not a class/module",
                crate::builtins::inspect_value(&self.runtime, other)
            ))),
        }
    }

    /// Read side of `x ||= v` / `x &&= v`. Undefined class variables and
    /// constants read as `nil` instead of raising.
    pub(crate) fn eval_asgn_read(&mut self, read: &NodeRef) -> EvalResult {
        match &read.kind {
            NodeKind::ClassVar(name) => Ok(self.class_var_lookup(*name).unwrap_or_default()),
            NodeKind::Const(name) => Ok(self.const_lookup(*name).unwrap_or_default()),
            _ => self.eval_node(read),
        }
    }

    // Assignment

    pub(crate) fn assign(&mut self, target: &AssignTarget, value: Value) -> Result<(), ControlAction> {
        match target {
            AssignTarget::Local { index, .. } => self.scopes.current().set(*index, 0, value),
            AssignTarget::DVar { index, depth, .. } => {
                self.scopes.current().set(*index, *depth, value);
            }
            AssignTarget::InstVar(name) => {
                let receiver = self.current_self().clone();
                self.ivar_set(&receiver, *name, value)?;
            }
            AssignTarget::GlobalVar(name) => self.global_set(*name, value),
            AssignTarget::ClassVar(name) => self.class_var_set(*name, value),
            AssignTarget::Const(path) => {
                let outer = self.cpath_module(path)?;
                self.const_assign(&outer, path.name, value);
            }
            AssignTarget::Attr { receiver, site } => {
                let receiver = self.eval_node(receiver)?;
                site.call(self, &receiver, &[value], &Block::none())?;
            }
            AssignTarget::Index {
                receiver,
                args,
                site,
            } => {
                let receiver = self.eval_node(receiver)?;
                let mut args = self.eval_args(args)?;
                args.push(value);
                site.call(self, &receiver, &args, &Block::none())?;
            }
            AssignTarget::Nested(targets) => {
                let items = self.masgn_values(&value)?;
                self.bind_targets(targets, &items)?;
            }
        }
        Ok(())
    }

    /// Right-hand side of a destructuring assignment as a list: arrays
    /// expand, objects answering `to_ary` are converted, anything else is
    /// a one-element list.
    pub(crate) fn masgn_values(&mut self, value: &Value) -> Result<Vec<Value>, ControlAction> {
        match value {
            Value::Array(items) => Ok(items.to_vec()),
            Value::Object(_) if self.responds_to(value, self.runtime.names().to_ary) => {
                let to_ary = self.runtime.names().to_ary;
                match self.send(value, to_ary, &[], &Block::none(), CallType::Normal)? {
                    Value::Array(items) => Ok(items.to_vec()),
                    _ => Err(type_error(format!(
                        "can't convert {} to Array",
                        self.runtime.real_class_of(value).display_name()
                    ))
                    .into()),
                }
            }
            other => Ok(vec![other.clone()]),
        }
    }

    /// Bind `values` to `pre, *rest, post`. Missing values are `nil`;
    /// the rest target takes whatever lies between `pre` and `post`.
    pub(crate) fn bind_targets(
        &mut self,
        targets: &MasgnTargets,
        values: &[Value],
    ) -> Result<(), ControlAction> {
        let n_pre = targets.pre.len();
        let n_post = targets.post.len();
        let fixed = n_pre + n_post;
        let len = values.len();
        let value_at = |i: usize| values.get(i).cloned().unwrap_or_default();

        for (i, target) in targets.pre.iter().enumerate() {
            self.assign(target, value_at(i))?;
        }

        let post_start = if targets.rest.is_some() && len > fixed {
            len - n_post
        } else {
            n_pre
        };
        if let Some(RestTarget::Named(target)) = &targets.rest {
            let middle = if len > fixed {
                values[n_pre..len - n_post].to_vec()
            } else {
                Vec::new()
            };
            self.assign(target, Value::array(middle))?;
        }

        for (i, target) in targets.post.iter().enumerate() {
            self.assign(target, value_at(post_start + i))?;
        }
        Ok(())
    }
}
