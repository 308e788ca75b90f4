//! `String` and `Symbol`.

use std::sync::Arc;

use garnet_ir::{Arity, CallType};

use super::{def, fixnum_arg, inspect_str, proc::proc_from_block};
use crate::block::Block;
use crate::errors::{argument_error, type_error, EvalError, EvalResult};
use crate::runtime::Runtime;
use crate::value::Value;
use crate::Interpreter;

pub(super) fn install(runtime: &Runtime) {
    let string = &runtime.core().string;
    def(runtime, string, "+", Arity::one_argument(), |interp, recv, args, _| {
        let lhs = str_receiver(recv)?;
        let rhs = str_arg(interp, &args[0])?;
        let mut out = String::with_capacity(lhs.len() + rhs.len());
        out.push_str(lhs);
        out.push_str(rhs);
        Ok(Value::str(out))
    });
    def(runtime, string, "*", Arity::one_argument(), |interp, recv, args, _| {
        let count = fixnum_arg(interp, &args[0])?;
        let count = usize::try_from(count).map_err(|_| argument_error("negative argument"))?;
        Ok(Value::str(str_receiver(recv)?.repeat(count)))
    });
    def(runtime, string, "==", Arity::one_argument(), |_, recv, args, _| {
        let lhs = str_receiver(recv)?;
        Ok(Value::Bool(args[0].as_str() == Some(lhs)))
    });
    for length in ["length", "size"] {
        def(runtime, string, length, Arity::no_arguments(), |_, recv, _, _| {
            let count = str_receiver(recv)?.chars().count();
            Ok(Value::Fixnum(i64::try_from(count).unwrap_or(i64::MAX)))
        });
    }
    def(runtime, string, "to_s", Arity::no_arguments(), |_, recv, _, _| Ok(recv.clone()));
    def(runtime, string, "inspect", Arity::no_arguments(), |_, recv, _, _| {
        Ok(Value::str(inspect_str(str_receiver(recv)?)))
    });
    def(runtime, string, "upcase", Arity::no_arguments(), |_, recv, _, _| {
        Ok(Value::str(str_receiver(recv)?.to_uppercase()))
    });
    def(runtime, string, "downcase", Arity::no_arguments(), |_, recv, _, _| {
        Ok(Value::str(str_receiver(recv)?.to_lowercase()))
    });
    for to_sym in ["to_sym", "intern"] {
        def(runtime, string, to_sym, Arity::no_arguments(), |interp, recv, _, _| {
            Ok(Value::Symbol(interp.runtime().intern(str_receiver(recv)?)))
        });
    }
    def(runtime, string, "empty?", Arity::no_arguments(), |_, recv, _, _| {
        Ok(Value::Bool(str_receiver(recv)?.is_empty()))
    });

    let symbol = &runtime.core().symbol;
    def(runtime, symbol, "to_s", Arity::no_arguments(), |interp, recv, _, _| {
        match recv {
            Value::Symbol(name) => Ok(Value::str(interp.runtime().lookup(*name))),
            _ => Err(type_error("receiver is not a Symbol").into()),
        }
    });
    def(runtime, symbol, "to_sym", Arity::no_arguments(), |_, recv, _, _| Ok(recv.clone()));
    def(runtime, symbol, "to_proc", Arity::no_arguments(), symbol_to_proc);
}

fn str_receiver(recv: &Value) -> Result<&str, EvalError> {
    recv.as_str()
        .ok_or_else(|| type_error("receiver is not a String"))
}

fn str_arg<'a>(interp: &Interpreter, value: &'a Value) -> Result<&'a str, EvalError> {
    value.as_str().ok_or_else(|| {
        type_error(format!(
            "no implicit conversion of {} into String",
            interp.runtime().real_class_of(value).display_name()
        ))
    })
}

/// `:name.to_proc`: a proc that sends `name` to its first argument.
fn symbol_to_proc(interp: &mut Interpreter, recv: &Value, _: &[Value], _: &Block) -> EvalResult {
    let Value::Symbol(name) = *recv else {
        return Err(type_error("receiver is not a Symbol").into());
    };
    let func = move |interp: &mut Interpreter, args: &[Value]| -> EvalResult {
        let Some((target, rest)) = args.split_first() else {
            return Err(argument_error("no receiver given").into());
        };
        interp.send(target, name, rest, &Block::none(), CallType::Normal)
    };
    let block = Block::native(
        Arc::new(func),
        Arity::required(1),
        interp.current_frame(),
        interp.scopes.current().clone(),
        interp.context.clone(),
    );
    Ok(proc_from_block(&block, false)?)
}
