//! `Integer` and `Float`.
//!
//! Integers are 64-bit. Overflow raises `RangeError` instead of promoting;
//! division and modulo round toward negative infinity.

use std::cmp::Ordering;
use std::num::FpCategory;

use garnet_ir::Arity;

use super::{def, format_float};
use crate::errors::{argument_error, range_error, type_error, zero_division, EvalError, EvalResult};
use crate::runtime::Runtime;
use crate::value::Value;
use crate::Interpreter;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl ArithOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        }
    }
}

pub(super) fn install(runtime: &Runtime) {
    let core = runtime.core();
    for class in [&core.integer, &core.float] {
        for op in [ArithOp::Add, ArithOp::Sub, ArithOp::Mul, ArithOp::Div, ArithOp::Mod] {
            def(runtime, class, op.symbol(), Arity::one_argument(), move |interp, recv, args, _| {
                arith(interp, op, recv, &args[0])
            });
        }
        for (name, accept) in [
            ("<", Ordering::is_lt as fn(Ordering) -> bool),
            (">", Ordering::is_gt),
            ("<=", Ordering::is_le),
            (">=", Ordering::is_ge),
        ] {
            def(runtime, class, name, Arity::one_argument(), move |interp, recv, args, _| {
                match compare(recv, &args[0]) {
                    Some(ordering) => Ok(Value::Bool(accept(ordering))),
                    None => Err(comparison_failed(interp, recv, &args[0]).into()),
                }
            });
        }
        def(runtime, class, "==", Arity::one_argument(), |_, recv, args, _| {
            Ok(Value::Bool(compare(recv, &args[0]) == Some(Ordering::Equal)))
        });
        def(runtime, class, "<=>", Arity::one_argument(), |_, recv, args, _| {
            Ok(compare(recv, &args[0]).map_or(Value::Nil, |ordering| {
                Value::Fixnum(match ordering {
                    Ordering::Less => -1,
                    Ordering::Equal => 0,
                    Ordering::Greater => 1,
                })
            }))
        });
        def(runtime, class, "-@", Arity::no_arguments(), |_, recv, _, _| match recv {
            Value::Fixnum(n) => n
                .checked_neg()
                .map(Value::Fixnum)
                .ok_or_else(|| range_error("integer overflow").into()),
            Value::Float(x) => Ok(Value::Float(-x)),
            _ => Err(type_error("receiver is not numeric").into()),
        });
        for to_s in ["to_s", "inspect"] {
            def(runtime, class, to_s, Arity::no_arguments(), |_, recv, _, _| match recv {
                Value::Float(x) => Ok(Value::str(format_float(*x))),
                other => Ok(Value::str(other.as_fixnum().unwrap_or_default().to_string())),
            });
        }
        def(runtime, class, "to_i", Arity::no_arguments(), |_, recv, _, _| match recv {
            Value::Float(x) => Ok(Value::Fixnum(float_to_int(*x)?)),
            other => Ok(other.clone()),
        });
        def(runtime, class, "to_f", Arity::no_arguments(), |_, recv, _, _| match recv {
            Value::Fixnum(n) => Ok(Value::Float(int_to_float(*n))),
            other => Ok(other.clone()),
        });
        def(runtime, class, "zero?", Arity::no_arguments(), |_, recv, _, _| {
            Ok(Value::Bool(match recv {
                Value::Fixnum(n) => *n == 0,
                Value::Float(x) => x.classify() == FpCategory::Zero,
                _ => false,
            }))
        });
    }

    let integer = &core.integer;
    def(runtime, integer, "times", Arity::no_arguments(), |interp, recv, _, block| {
        let count = int_receiver(recv)?;
        for i in 0..count {
            interp.yield_block(block, &[Value::Fixnum(i)])?;
        }
        Ok(recv.clone())
    });
    def(runtime, integer, "succ", Arity::no_arguments(), |_, recv, _, _| {
        int_receiver(recv)?
            .checked_add(1)
            .map(Value::Fixnum)
            .ok_or_else(|| range_error("integer overflow").into())
    });
}

fn int_receiver(recv: &Value) -> Result<i64, EvalError> {
    recv.as_fixnum()
        .ok_or_else(|| type_error("receiver is not an Integer"))
}

fn arith(interp: &Interpreter, op: ArithOp, recv: &Value, arg: &Value) -> EvalResult {
    match (recv, arg) {
        (Value::Fixnum(a), Value::Fixnum(b)) => Ok(Value::Fixnum(int_arith(op, *a, *b)?)),
        (Value::Fixnum(a), Value::Float(b)) => Ok(Value::Float(float_arith(op, int_to_float(*a), *b))),
        (Value::Float(a), Value::Fixnum(b)) => Ok(Value::Float(float_arith(op, *a, int_to_float(*b)))),
        (Value::Float(a), Value::Float(b)) => Ok(Value::Float(float_arith(op, *a, *b))),
        _ => {
            let runtime = interp.runtime();
            Err(type_error(format!(
                "{} can't be coerced into {}",
                runtime.real_class_of(arg).display_name(),
                runtime.real_class_of(recv).display_name()
            ))
            .into())
        }
    }
}

fn int_arith(op: ArithOp, a: i64, b: i64) -> Result<i64, EvalError> {
    let overflow = || range_error("integer overflow");
    match op {
        ArithOp::Add => a.checked_add(b).ok_or_else(overflow),
        ArithOp::Sub => a.checked_sub(b).ok_or_else(overflow),
        ArithOp::Mul => a.checked_mul(b).ok_or_else(overflow),
        ArithOp::Div => {
            if b == 0 {
                return Err(zero_division());
            }
            let quotient = a.checked_div(b).ok_or_else(overflow)?;
            if a % b != 0 && ((a < 0) != (b < 0)) {
                Ok(quotient - 1)
            } else {
                Ok(quotient)
            }
        }
        ArithOp::Mod => {
            if b == 0 {
                return Err(zero_division());
            }
            let rem = a.checked_rem(b).ok_or_else(overflow)?;
            if rem != 0 && ((rem < 0) != (b < 0)) {
                Ok(rem + b)
            } else {
                Ok(rem)
            }
        }
    }
}

fn float_arith(op: ArithOp, a: f64, b: f64) -> f64 {
    match op {
        ArithOp::Add => a + b,
        ArithOp::Sub => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => a / b,
        ArithOp::Mod => a - b * (a / b).floor(),
    }
}

fn compare(recv: &Value, arg: &Value) -> Option<Ordering> {
    match (recv, arg) {
        (Value::Fixnum(a), Value::Fixnum(b)) => Some(a.cmp(b)),
        (Value::Fixnum(a), Value::Float(b)) => int_to_float(*a).partial_cmp(b),
        (Value::Float(a), Value::Fixnum(b)) => a.partial_cmp(&int_to_float(*b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        _ => None,
    }
}

#[cold]
fn comparison_failed(interp: &Interpreter, recv: &Value, arg: &Value) -> EvalError {
    let runtime = interp.runtime();
    argument_error(format!(
        "comparison of {} with {} failed",
        runtime.real_class_of(recv).display_name(),
        super::inspect_value(runtime, arg)
    ))
}

#[expect(
    clippy::cast_precision_loss,
    reason = "Integer#to_f rounds like the language does"
)]
fn int_to_float(n: i64) -> f64 {
    n as f64
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "range checked before the cast"
)]
fn float_to_int(x: f64) -> Result<i64, EvalError> {
    const LIMIT: f64 = 9.223_372_036_854_776e18;
    if !x.is_finite() || x.abs() >= LIMIT {
        return Err(range_error(format!("{} out of range of integer", format_float(x))));
    }
    Ok(x.trunc() as i64)
}

#[cfg(test)]
mod tests;
