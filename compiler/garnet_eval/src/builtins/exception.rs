//! `Exception` and its subclasses.
//!
//! The message lives in `@message`; the backtrace captured at the raise
//! point is attached as `@__backtrace` when the exception is first
//! rescued.

use std::sync::Arc;

use garnet_ir::{Arity, CallType};

use super::{def, def_singleton};
use crate::block::Block;
use crate::runtime::Runtime;
use crate::value::{RObject, Value};

pub(super) fn install(runtime: &Runtime) {
    let exception = &runtime.core().exception;
    let names = *runtime.names();

    def(runtime, exception, "initialize", Arity::range(0, 1), move |interp, recv, args, _| {
        let message = args.first().cloned().unwrap_or_default();
        interp.ivar_set(recv, names.ivar_message, message)?;
        Ok(Value::Nil)
    });
    def(runtime, exception, "to_s", Arity::no_arguments(), move |interp, recv, _, _| {
        match interp.ivar_get(recv, names.ivar_message) {
            Value::Nil => Ok(Value::str(interp.runtime().real_class_of(recv).display_name())),
            message => Ok(Value::str(interp.to_s_string(&message)?)),
        }
    });
    def(runtime, exception, "message", Arity::no_arguments(), move |interp, recv, _, _| {
        interp.send(recv, names.to_s, &[], &Block::none(), CallType::Functional)
    });
    def(runtime, exception, "inspect", Arity::no_arguments(), move |interp, recv, _, _| {
        let class = interp.runtime().real_class_of(recv).display_name();
        let message = interp.send(recv, names.to_s, &[], &Block::none(), CallType::Functional)?;
        let message = interp.to_s_string(&message)?;
        if message.is_empty() || message == class {
            Ok(Value::str(class))
        } else {
            Ok(Value::str(format!("#<{class}: {message}>")))
        }
    });
    def(runtime, exception, "backtrace", Arity::no_arguments(), move |interp, recv, _, _| {
        Ok(interp.ivar_get(recv, names.ivar_backtrace))
    });
    def(runtime, exception, "exception", Arity::range(0, 1), move |interp, recv, args, _| {
        match args.first() {
            None => Ok(recv.clone()),
            Some(message) if message.same(recv) => Ok(recv.clone()),
            Some(message) => {
                let class = interp.runtime().real_class_of(recv);
                let copy = Value::Object(Arc::new(RObject::new(class)));
                interp.ivar_set(&copy, names.ivar_message, message.clone())?;
                Ok(copy)
            }
        }
    });
    def_singleton(runtime, exception, "exception", Arity::optional(), move |interp, recv, args, block| {
        interp.send(recv, names.new, args, block, CallType::Functional)
    });
}
