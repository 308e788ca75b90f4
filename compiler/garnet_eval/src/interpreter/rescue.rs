//! `begin/rescue/else/ensure` and `retry`.
//!
//! `$!` is saved on entry to a rescue expression and restored when it
//! completes normally or retries; an exception escaping a clause leaves
//! `$!` set to the exception being handled.

use std::sync::Arc;

use garnet_ir::CallType;

use super::Interpreter;
use crate::ast::{NodeRef, RescueClause};
use crate::block::Block;
use crate::errors::{type_error, ControlAction, EvalError, EvalResult};
use crate::value::{RObject, Value};

impl Interpreter {
    pub(crate) fn eval_rescue(
        &mut self,
        body: Option<&NodeRef>,
        clauses: &[RescueClause],
        else_body: Option<&NodeRef>,
    ) -> EvalResult {
        let saved = self.current_exception.clone();
        'retry: loop {
            let err = match self.eval_opt(body) {
                Ok(value) => {
                    return match else_body {
                        Some(else_body) => self.eval_node(else_body),
                        None => Ok(value),
                    };
                }
                Err(ControlAction::Error(err)) if err.is_rescuable() => err,
                Err(other) => return Err(other),
            };

            let exception = self.exception_value(&err);
            for clause in clauses {
                if !self.rescue_clause_matches(clause, &exception)? {
                    continue;
                }
                tracing::trace!(exception = err.exception_class(), "rescued");
                self.current_exception = exception.clone();
                if let Some(target) = &clause.target {
                    self.assign(target, exception.clone())?;
                }
                match self.eval_opt(clause.body.as_ref()) {
                    Err(ControlAction::Retry) => {
                        self.current_exception = saved.clone();
                        continue 'retry;
                    }
                    Err(action) if action.is_error() => return Err(action),
                    other => {
                        self.current_exception = saved;
                        return other;
                    }
                }
            }
            return Err(ControlAction::Error(Box::new(err.with_exception(exception))));
        }
    }

    /// Whether one of the clause's classes answers `===` for `exception`.
    /// An empty list means `StandardError`.
    fn rescue_clause_matches(
        &mut self,
        clause: &RescueClause,
        exception: &Value,
    ) -> Result<bool, ControlAction> {
        let candidates = if clause.exceptions.is_empty() {
            vec![Value::Module(self.runtime.core().standard_error.clone())]
        } else {
            self.eval_args(&clause.exceptions)?.into_vec()
        };
        let eqq = self.runtime.names().eqq;
        for candidate in candidates {
            if !matches!(candidate, Value::Module(_)) {
                return Err(type_error("class or module required for rescue clause").into());
            }
            let matched = self.send(
                &candidate,
                eqq,
                std::slice::from_ref(exception),
                &Block::none(),
                CallType::Normal,
            )?;
            if matched.is_truthy() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// The exception object for `err`, materialized on first rescue as an
    /// instance of the class its kind names, carrying `@message` and the
    /// captured backtrace.
    pub(crate) fn exception_value(&self, err: &EvalError) -> Value {
        let names = self.runtime.names();
        let exception = err.exception.clone().unwrap_or_else(|| {
            let core = self.runtime.core();
            let class = core
                .object
                .const_get_own(self.runtime.intern(err.exception_class()))
                .and_then(|value| value.as_module().cloned())
                .unwrap_or_else(|| core.standard_error.clone());
            let object = RObject::new(class);
            object.ivar_set(names.ivar_message, Value::str(&err.message));
            Value::Object(Arc::new(object))
        });
        if let (Value::Object(object), Some(backtrace)) = (&exception, &err.backtrace) {
            if object.ivar_get(names.ivar_backtrace).is_none() {
                let lines = backtrace.lines().into_iter().map(Value::str).collect();
                object.ivar_set(names.ivar_backtrace, Value::array(lines));
            }
        }
        exception
    }

    /// Evaluate `body`, then the ensure clause on every exit path. A
    /// signal from the ensure clause replaces the body's outcome.
    pub(crate) fn with_ensure(
        &mut self,
        body: impl FnOnce(&mut Self) -> EvalResult,
        ensure: Option<&NodeRef>,
    ) -> EvalResult {
        let result = body(self);
        if let Some(ensure) = ensure {
            self.eval_node(ensure)?;
        }
        result
    }
}
