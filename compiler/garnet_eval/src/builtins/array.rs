//! `Array`.

use std::sync::Arc;

use garnet_ir::{Arity, CallType};

use super::{def, fixnum_arg};
use crate::block::Block;
use crate::errors::{index_error, type_error, ControlAction, EvalError};
use crate::runtime::Runtime;
use crate::value::{RArray, Value};
use crate::Interpreter;

pub(super) fn install(runtime: &Runtime) {
    let array = &runtime.core().array;

    // Iteration
    def(runtime, array, "each", Arity::no_arguments(), |interp, recv, _, block| {
        let items = array_receiver(recv)?;
        let mut index = 0;
        while let Some(item) = items.get(index) {
            interp.yield_block(block, &[item])?;
            index += 1;
        }
        Ok(recv.clone())
    });
    def(runtime, array, "each_with_index", Arity::no_arguments(), |interp, recv, _, block| {
        let items = array_receiver(recv)?;
        let mut index = 0;
        while let Some(item) = items.get(index) {
            interp.yield_block(block, &[item, fixnum(index)])?;
            index += 1;
        }
        Ok(recv.clone())
    });
    for map in ["map", "collect"] {
        def(runtime, array, map, Arity::no_arguments(), |interp, recv, _, block| {
            let items = array_receiver(recv)?.to_vec();
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                mapped.push(interp.yield_block(block, &[item])?);
            }
            Ok(Value::array(mapped))
        });
    }
    def(runtime, array, "select", Arity::no_arguments(), |interp, recv, _, block| {
        let mut selected = Vec::new();
        for item in array_receiver(recv)?.to_vec() {
            if interp.yield_block(block, std::slice::from_ref(&item))?.is_truthy() {
                selected.push(item);
            }
        }
        Ok(Value::array(selected))
    });
    def(runtime, array, "inject", Arity::range(0, 1), |interp, recv, args, block| {
        let mut items = array_receiver(recv)?.to_vec().into_iter();
        let mut acc = match args.first() {
            Some(initial) => initial.clone(),
            None => match items.next() {
                Some(first) => first,
                None => return Ok(Value::Nil),
            },
        };
        for item in items {
            acc = interp.yield_block(block, &[acc, item])?;
        }
        Ok(acc)
    });

    // Access
    for size in ["size", "length"] {
        def(runtime, array, size, Arity::no_arguments(), |_, recv, _, _| {
            Ok(fixnum(array_receiver(recv)?.len()))
        });
    }
    def(runtime, array, "empty?", Arity::no_arguments(), |_, recv, _, _| {
        Ok(Value::Bool(array_receiver(recv)?.is_empty()))
    });
    def(runtime, array, "[]", Arity::range(1, 1), |interp, recv, args, _| {
        let items = array_receiver(recv)?;
        let Some(start) = resolve_index(fixnum_arg(interp, &args[0])?, items.len()) else {
            return Ok(Value::Nil);
        };
        match args.get(1) {
            None => Ok(items.get(start).unwrap_or_default()),
            Some(length) => {
                let length = fixnum_arg(interp, length)?;
                let Ok(length) = usize::try_from(length) else {
                    return Ok(Value::Nil);
                };
                let all = items.to_vec();
                if start > all.len() {
                    return Ok(Value::Nil);
                }
                let end = start.saturating_add(length).min(all.len());
                Ok(Value::array(all[start..end].to_vec()))
            }
        }
    });
    def(runtime, array, "[]=", Arity::fixed(2), |interp, recv, args, _| {
        let items = array_receiver(recv)?;
        let raw = fixnum_arg(interp, &args[0])?;
        let index = resolve_index(raw, items.len())
            .ok_or_else(|| index_error(format!("index {raw} too small for array")))?;
        items.set(index, args[1].clone());
        Ok(args[1].clone())
    });
    def(runtime, array, "first", Arity::no_arguments(), |_, recv, _, _| {
        Ok(array_receiver(recv)?.get(0).unwrap_or_default())
    });
    def(runtime, array, "last", Arity::no_arguments(), |_, recv, _, _| {
        let items = array_receiver(recv)?;
        Ok(items
            .len()
            .checked_sub(1)
            .and_then(|last| items.get(last))
            .unwrap_or_default())
    });
    def(runtime, array, "include?", Arity::one_argument(), |interp, recv, args, _| {
        let eq = interp.runtime().names().eq;
        for item in array_receiver(recv)?.to_vec() {
            if interp
                .send(&item, eq, args, &Block::none(), CallType::Normal)?
                .is_truthy()
            {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    });

    // Mutation
    for push in ["push", "<<"] {
        def(runtime, array, push, Arity::optional(), |_, recv, args, _| {
            let items = array_receiver(recv)?;
            for arg in args {
                items.push(arg.clone());
            }
            Ok(recv.clone())
        });
    }
    def(runtime, array, "pop", Arity::no_arguments(), |_, recv, _, _| {
        Ok(array_receiver(recv)?.pop().unwrap_or_default())
    });

    // Conversion and comparison
    def(runtime, array, "to_a", Arity::no_arguments(), |_, recv, _, _| Ok(recv.clone()));
    for inspect in ["inspect", "to_s"] {
        def(runtime, array, inspect, Arity::no_arguments(), |interp, recv, _, _| {
            let mut parts = Vec::new();
            for item in array_receiver(recv)?.to_vec() {
                parts.push(interp.inspect_string(&item)?);
            }
            Ok(Value::str(format!("[{}]", parts.join(", "))))
        });
    }
    def(runtime, array, "join", Arity::range(0, 1), |interp, recv, args, _| {
        let separator = match args.first() {
            None | Some(Value::Nil) => String::new(),
            Some(other) => interp.to_s_string(other)?,
        };
        let mut parts = Vec::new();
        join_parts(interp, array_receiver(recv)?, &mut parts)?;
        Ok(Value::str(parts.join(&separator)))
    });
    def(runtime, array, "==", Arity::one_argument(), |_, recv, args, _| {
        Ok(Value::Bool(*recv == args[0]))
    });
    def(runtime, array, "reverse", Arity::no_arguments(), |_, recv, _, _| {
        let mut items = array_receiver(recv)?.to_vec();
        items.reverse();
        Ok(Value::array(items))
    });
    def(runtime, array, "+", Arity::one_argument(), |interp, recv, args, _| {
        let Value::Array(other) = &args[0] else {
            return Err(type_error(format!(
                "no implicit conversion of {} into Array",
                interp.runtime().real_class_of(&args[0]).display_name()
            ))
            .into());
        };
        let mut items = array_receiver(recv)?.to_vec();
        items.extend(other.to_vec());
        Ok(Value::array(items))
    });
}

fn array_receiver(recv: &Value) -> Result<&Arc<RArray>, EvalError> {
    recv.as_array()
        .ok_or_else(|| type_error("receiver is not an Array"))
}

fn fixnum(n: usize) -> Value {
    Value::Fixnum(i64::try_from(n).unwrap_or(i64::MAX))
}

/// Negative indices count from the end; `None` if still negative.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    if index >= 0 {
        usize::try_from(index).ok()
    } else {
        let from_end = usize::try_from(index.unsigned_abs()).ok()?;
        len.checked_sub(from_end)
    }
}

fn join_parts(
    interp: &mut Interpreter,
    items: &RArray,
    parts: &mut Vec<String>,
) -> Result<(), ControlAction> {
    for item in items.to_vec() {
        match &item {
            Value::Array(nested) => join_parts(interp, nested, parts)?,
            other => parts.push(interp.to_s_string(other)?),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
