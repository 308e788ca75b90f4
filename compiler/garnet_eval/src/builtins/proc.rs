//! `Proc`.

use std::sync::Arc;

use garnet_ir::Arity;

use super::def;
use crate::block::{Block, BlockKind};
use crate::errors::{argument_error, type_error, EvalError};
use crate::runtime::Runtime;
use crate::value::{RProc, Value};

pub(super) fn install(runtime: &Runtime) {
    let proc_class = &runtime.core().proc_class;
    for call in ["call", "[]", "yield"] {
        def(runtime, proc_class, call, Arity::optional(), |interp, recv, args, _| {
            let proc_value = proc_receiver(recv)?;
            interp.yield_block(proc_value.block(), args)
        });
    }
    def(runtime, proc_class, "arity", Arity::no_arguments(), |_, recv, _, _| {
        Ok(Value::Fixnum(i64::from(proc_receiver(recv)?.block().arity().value())))
    });
    def(runtime, proc_class, "lambda?", Arity::no_arguments(), |_, recv, _, _| {
        Ok(Value::Bool(proc_receiver(recv)?.is_lambda()))
    });
    def(runtime, proc_class, "to_proc", Arity::no_arguments(), |_, recv, _, _| Ok(recv.clone()));
}

/// Promote the block of the current call to a `Proc` value.
pub(super) fn proc_from_block(block: &Block, lambda: bool) -> Result<Value, EvalError> {
    if !block.is_given() {
        return Err(argument_error("tried to create Proc object without a block"));
    }
    let kind = if lambda { BlockKind::Lambda } else { BlockKind::Proc };
    Ok(Value::Proc(Arc::new(RProc::new(block.with_kind(kind), lambda))))
}

fn proc_receiver(recv: &Value) -> Result<&Arc<RProc>, EvalError> {
    recv.as_proc()
        .ok_or_else(|| type_error("receiver is not a Proc"))
}
