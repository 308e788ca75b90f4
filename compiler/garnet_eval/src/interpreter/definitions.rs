//! Method, class and module definitions.

use std::sync::Arc;

use garnet_ir::{CallType, Name, Visibility};

use super::{Activation, Interpreter, Lookup};
use crate::ast::{CPath, ClassBody, MethodDef, NodeRef};
use crate::block::Block;
use crate::errors::{
    not_a_class, not_a_module, superclass_mismatch, type_error, undefined_method_for_class,
    ControlAction, EvalResult,
};
use crate::frame::Frame;
use crate::method::{DynamicMethod, InterpretedMethod};
use crate::module::{Attached, ModuleRef};
use crate::scope::DynamicScope;
use crate::value::Value;

impl Interpreter {
    /// `def name`: installs into the context's definee with the frame's
    /// default visibility. `initialize` is always private; under
    /// `module_function` a public copy goes on the module's singleton.
    pub(crate) fn eval_defn(&mut self, name: Name, def: &Arc<MethodDef>) -> EvalResult {
        let module = self.context.definee.clone();
        let default = self.frames.current().visibility();
        let visibility = if name == self.runtime.names().initialize || default.is_private() {
            Visibility::Private
        } else if default.is_protected() {
            Visibility::Protected
        } else {
            Visibility::Public
        };
        let method = DynamicMethod::interpreted(
            &module,
            visibility,
            InterpretedMethod::new(def.clone(), self.context.cref.clone()),
        );
        let installed = self.runtime.add_method(&module, name, method);
        tracing::trace!(
            method = self.runtime.lookup(name),
            module = %module.display_name(),
            %visibility,
            "defined method"
        );

        if default == Visibility::ModuleFunction {
            let singleton = self.runtime.singleton_class_of(&Value::Module(module.clone()))?;
            let copy = installed.dup_into(&singleton, Visibility::Public);
            self.runtime.add_method(&singleton, name, copy);
        }
        self.method_added(&module, name)?;
        Ok(Value::Nil)
    }

    /// `def recv.name`.
    pub(crate) fn eval_defs(&mut self, receiver: &Value, name: Name, def: &Arc<MethodDef>) -> EvalResult {
        let singleton = self.runtime.singleton_class_of(receiver)?;
        let method = DynamicMethod::interpreted(
            &singleton,
            Visibility::Public,
            InterpretedMethod::new(def.clone(), self.context.cref.clone()),
        );
        self.runtime.add_method(&singleton, name, method);
        self.method_added(&singleton, name)?;
        Ok(Value::Nil)
    }

    /// Run the definition hook: `singleton_method_added` on the attached
    /// object for singleton classes, `method_added` on the module otherwise.
    pub(crate) fn method_added(&mut self, module: &ModuleRef, name: Name) -> Result<(), ControlAction> {
        let names = *self.runtime.names();
        let (receiver, hook) = match module.attached() {
            Some(Attached::Object(object)) => match object.upgrade() {
                Some(object) => (Value::Object(object), names.singleton_method_added),
                None => return Ok(()),
            },
            Some(Attached::Module(attached)) => match attached.upgrade() {
                Some(attached) => (Value::Module(attached), names.singleton_method_added),
                None => return Ok(()),
            },
            None => (Value::Module(module.clone()), names.method_added),
        };
        let class = self.runtime.class_of(&receiver);
        if let Lookup::Found { method, .. } = self.resolve_method(&class, hook, CallType::Functional) {
            self.invoke_method(&method, &receiver, hook, &[Value::Symbol(name)], &Block::none())?;
        }
        Ok(())
    }

    /// `class Name < Super; body; end`: reopens an existing class (whose
    /// superclass must match if one is given) or creates one.
    pub(crate) fn eval_class(
        &mut self,
        path: &CPath,
        superclass: Option<&NodeRef>,
        body: &ClassBody,
    ) -> EvalResult {
        let outer = self.cpath_module(path)?;
        let superclass = match superclass {
            Some(node) => match self.eval_node(node)? {
                Value::Module(module) if module.is_class() && !module.is_singleton() => Some(module),
                _ => return Err(type_error("superclass must be a Class").into()),
            },
            None => None,
        };
        let name = self.runtime.lookup(path.name);
        let class = match outer.const_get_own(path.name) {
            Some(Value::Module(existing)) if existing.is_class() => {
                if let Some(superclass) = &superclass {
                    let matches = existing
                        .real_superclass()
                        .is_some_and(|current| current.same_origin(superclass));
                    if !matches {
                        return Err(superclass_mismatch(name).into());
                    }
                }
                existing
            }
            Some(_) => return Err(not_a_class(name).into()),
            None => {
                let superclass =
                    superclass.unwrap_or_else(|| self.runtime.core().object.clone());
                let class = self.runtime.new_class(&superclass);
                self.runtime.name_constant(&outer, name, &class);
                tracing::trace!(class = %class.display_name(), "defined class");
                class
            }
        };
        self.eval_class_body(&class, body)
    }

    pub(crate) fn eval_module(&mut self, path: &CPath, body: &ClassBody) -> EvalResult {
        let outer = self.cpath_module(path)?;
        let name = self.runtime.lookup(path.name);
        let module = match outer.const_get_own(path.name) {
            Some(Value::Module(existing)) if existing.is_module() => existing,
            Some(_) => return Err(not_a_module(name).into()),
            None => {
                let module = self.runtime.new_module();
                self.runtime.name_constant(&outer, name, &module);
                module
            }
        };
        self.eval_class_body(&module, body)
    }

    /// Run a class, module or singleton-class body with `self` set to the
    /// module, public default visibility and a fresh local scope.
    pub(crate) fn eval_class_body(&mut self, module: &ModuleRef, body: &ClassBody) -> EvalResult {
        let context = self.context.nested(module.clone());
        let mut guard = self.activate(Activation {
            frame: Some(Frame::for_body(Value::Module(module.clone()), Visibility::Public)),
            scope: Some(DynamicScope::new(body.scope.clone(), None)),
            context: Some(context),
            ..Activation::default()
        })?;
        let result = guard.eval_opt(body.body.as_ref());
        drop(guard);
        match result {
            Err(action) if !action.is_error() => Err(action.into_error().into()),
            other => other,
        }
    }

    /// `alias new old` in the current definee.
    pub(crate) fn eval_alias(&mut self, new_name: Name, old_name: Name) -> EvalResult {
        let module = self.context.definee.clone();
        self.alias_method(&module, new_name, old_name)?;
        Ok(Value::Nil)
    }

    pub(crate) fn alias_method(
        &mut self,
        module: &ModuleRef,
        new_name: Name,
        old_name: Name,
    ) -> Result<(), ControlAction> {
        let method = match module.search_method(old_name) {
            Some((method, _)) if !method.is_undefined() => method,
            _ => {
                return Err(undefined_method_for_class(
                    self.runtime.lookup(old_name),
                    &module.display_name(),
                )
                .into())
            }
        };
        let alias = method.with_visibility(method.visibility());
        self.runtime.add_method(module, new_name, alias);
        self.method_added(module, new_name)
    }
}
