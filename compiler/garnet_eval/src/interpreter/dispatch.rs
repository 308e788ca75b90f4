//! Method resolution.
//!
//! [`Interpreter::resolve_method`] walks the receiver's class chain and
//! applies visibility for the call type. A miss is reported with a
//! [`MissingReason`] so `method_missing` (or the error raised in its
//! absence) can say *why* the call failed.

use garnet_ir::{CallType, Name, Reachability};
use smallvec::SmallVec;

use super::Interpreter;
use crate::block::Block;
use crate::errors::{
    no_method, no_super_method, private_method, protected_method, undefined_local_or_method,
    EvalError, EvalResult,
};
use crate::method::MethodRef;
use crate::module::ModuleRef;
use crate::value::Value;

/// Why dispatch fell through to `method_missing`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum MissingReason {
    #[default]
    Normal,
    Private,
    Protected,
    /// A receiverless, argumentless call that could have been a variable.
    Variable,
    Super,
}

/// Outcome of method resolution.
pub enum Lookup {
    /// `cacheable` is false when visibility depended on the caller, so the
    /// result must not be stored in a call site.
    Found { method: MethodRef, cacheable: bool },
    Missing(MissingReason),
}

impl Interpreter {
    /// Find `name` on `class` as seen from a call of `call_type`.
    pub fn resolve_method(&self, class: &ModuleRef, name: Name, call_type: CallType) -> Lookup {
        let not_found = if call_type == CallType::Variable {
            MissingReason::Variable
        } else {
            MissingReason::Normal
        };
        let method = match class.search_method(name) {
            Some((method, _)) if !method.is_undefined() => method,
            _ => return Lookup::Missing(not_found),
        };
        match method.visibility().reachability(call_type) {
            Reachability::Callable => Lookup::Found {
                method,
                cacheable: true,
            },
            Reachability::Denied => Lookup::Missing(if method.visibility().is_protected() {
                MissingReason::Protected
            } else {
                MissingReason::Private
            }),
            Reachability::NeedsCaller => {
                let caller = self.runtime.class_of(self.current_self());
                let allowed = method
                    .owner()
                    .is_some_and(|owner| caller.inherits_from(owner.origin()));
                if allowed {
                    Lookup::Found {
                        method,
                        cacheable: false,
                    }
                } else {
                    Lookup::Missing(MissingReason::Protected)
                }
            }
        }
    }

    /// Resolve and invoke without a call site (natives, hooks, host calls).
    pub(crate) fn send(
        &mut self,
        receiver: &Value,
        name: Name,
        args: &[Value],
        block: &Block,
        call_type: CallType,
    ) -> EvalResult {
        let class = self.runtime.class_of(receiver);
        match self.resolve_method(&class, name, call_type) {
            Lookup::Found { method, .. } => self.invoke_method(&method, receiver, name, args, block),
            Lookup::Missing(reason) => self.call_method_missing(receiver, name, args, block, reason),
        }
    }

    /// Call `name` on `receiver` from host code. Private methods are
    /// reachable, as for a receiverless call.
    pub fn call_method(
        &mut self,
        receiver: &Value,
        name: &str,
        args: &[Value],
        block: &Block,
    ) -> Result<Value, EvalError> {
        let name = self.runtime.intern(name);
        self.send(receiver, name, args, block, CallType::Functional)
            .map_err(|action| self.finish_error(action))
    }

    /// Whether `receiver` has a public method `name`.
    pub(crate) fn responds_to(&self, receiver: &Value, name: Name) -> bool {
        let class = self.runtime.class_of(receiver);
        matches!(
            self.resolve_method(&class, name, CallType::Normal),
            Lookup::Found { .. }
        )
    }

    /// Route a failed dispatch to the receiver's `method_missing`, passing
    /// the name as a symbol followed by the original arguments.
    pub fn call_method_missing(
        &mut self,
        receiver: &Value,
        name: Name,
        args: &[Value],
        block: &Block,
        reason: MissingReason,
    ) -> EvalResult {
        self.last_missing_reason = reason;
        let method_missing = self.runtime.names().method_missing;
        let class = self.runtime.class_of(receiver);
        match class.search_method(method_missing) {
            Some((method, _)) if !method.is_undefined() => {
                let mut mm_args: SmallVec<[Value; 4]> = SmallVec::with_capacity(args.len() + 1);
                mm_args.push(Value::Symbol(name));
                mm_args.extend(args.iter().cloned());
                self.invoke_method(&method, receiver, method_missing, &mm_args, block)
            }
            _ => Err(self.missing_method_error(receiver, name, reason).into()),
        }
    }

    /// The error a failed dispatch raises.
    pub(crate) fn missing_method_error(
        &self,
        receiver: &Value,
        name: Name,
        reason: MissingReason,
    ) -> EvalError {
        let name = self.runtime.lookup(name);
        let receiver = self.describe_receiver(receiver);
        match reason {
            MissingReason::Normal => no_method(name, &receiver),
            MissingReason::Private => private_method(name, &receiver),
            MissingReason::Protected => protected_method(name, &receiver),
            MissingReason::Variable => undefined_local_or_method(name, &receiver),
            MissingReason::Super => no_super_method(name),
        }
    }

    /// Receiver text for dispatch errors: `nil:NilClass`, `main:Object`,
    /// `#<Foo>`, `1:Integer`.
    pub(crate) fn describe_receiver(&self, receiver: &Value) -> String {
        let class = self.runtime.real_class_of(receiver).display_name();
        match receiver {
            Value::Object(_) if receiver.same(self.runtime.main()) => format!("main:{class}"),
            Value::Object(_) => format!("#<{class}>"),
            Value::Module(module) => format!("{}:{class}", module.display_name()),
            other => format!("{}:{class}", crate::builtins::inspect_value(&self.runtime, other)),
        }
    }
}
