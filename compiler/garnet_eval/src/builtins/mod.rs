//! The native core library: `Kernel`, `Module`, `Class` and the value classes.
//!
//! Every core method is a [`NativeMethod`](crate::method::NativeMethod)
//! registered through [`Runtime::define_native`], so core and user methods
//! share one lookup, one cache and one call protocol. Natives run without
//! a frame of their own: `block_given?`, `private` and friends read the
//! caller's frame.

mod array;
mod exception;
mod kernel;
mod module;
mod numeric;
mod proc;
mod string;

use garnet_ir::{Arity, Name, NameKind, Visibility};

use crate::block::Block;
use crate::errors::{name_error, type_error, wrong_argument_type, EvalError, EvalResult};
use crate::module::ModuleRef;
use crate::runtime::Runtime;
use crate::value::Value;
use crate::Interpreter;

/// Install every core method. Runs once, while the runtime boots.
pub(crate) fn install(runtime: &Runtime) {
    kernel::install(runtime);
    module::install(runtime);
    numeric::install(runtime);
    string::install(runtime);
    array::install(runtime);
    proc::install(runtime);
    exception::install(runtime);
    tracing::debug!("core library installed");
}

fn def<F>(runtime: &Runtime, module: &ModuleRef, name: &str, arity: Arity, func: F)
where
    F: Fn(&mut Interpreter, &Value, &[Value], &Block) -> EvalResult + Send + Sync + 'static,
{
    runtime.define_native(module, name, arity, std::sync::Arc::new(func));
}

fn def_private<F>(runtime: &Runtime, module: &ModuleRef, name: &str, arity: Arity, func: F)
where
    F: Fn(&mut Interpreter, &Value, &[Value], &Block) -> EvalResult + Send + Sync + 'static,
{
    runtime.define_native_with_visibility(
        module,
        name,
        Visibility::Private,
        arity,
        std::sync::Arc::new(func),
    );
}

fn def_singleton<F>(runtime: &Runtime, module: &ModuleRef, name: &str, arity: Arity, func: F)
where
    F: Fn(&mut Interpreter, &Value, &[Value], &Block) -> EvalResult + Send + Sync + 'static,
{
    if let Err(err) = runtime.define_singleton_native(module, name, arity, std::sync::Arc::new(func))
    {
        tracing::error!(%err, name, "failed to define core singleton method");
    }
}

/// Between `min` and `max` arguments, for natives whose bound depends on
/// the receiver.
fn check_arg_range(args: &[Value], min: usize, max: usize) -> Result<(), EvalError> {
    Arity::range(min, max.saturating_sub(min))
        .check(args.len())
        .map_err(EvalError::from)
}

fn fixnum_arg(interp: &Interpreter, value: &Value) -> Result<i64, EvalError> {
    value.as_fixnum().ok_or_else(|| {
        let class = interp.runtime().real_class_of(value).display_name();
        wrong_argument_type(&class, "Integer")
    })
}

/// A method or variable name given as a symbol or string.
fn name_arg(interp: &Interpreter, value: &Value) -> Result<Name, EvalError> {
    match value {
        Value::Symbol(name) => Ok(*name),
        Value::Str(s) => Ok(interp.runtime().intern(s)),
        other => Err(type_error(format!(
            "{} is not a symbol nor a string",
            inspect_value(interp.runtime(), other)
        ))),
    }
}

/// A name argument that must be spelled as a `kind` identifier, such as
/// the `:@x` of `instance_variable_get`.
fn variable_name_arg(interp: &Interpreter, value: &Value, kind: NameKind) -> Result<Name, EvalError> {
    let name = name_arg(interp, value)?;
    let text = interp.runtime().lookup(name);
    if NameKind::of(text) == kind {
        return Ok(name);
    }
    Err(name_error(match kind {
        NameKind::Instance => format!("`{text}' is not allowed as an instance variable name"),
        NameKind::Class => format!("`{text}' is not allowed as a class variable name"),
        _ => format!("wrong constant name {text}"),
    }))
}

fn module_arg(interp: &Interpreter, value: &Value) -> Result<ModuleRef, EvalError> {
    match value {
        Value::Module(module) => Ok(module.clone()),
        other => {
            let class = interp.runtime().real_class_of(other).display_name();
            Err(wrong_argument_type(&class, "Module"))
        }
    }
}

/// `self` of a method defined on `Module`/`Class`.
fn receiver_module(value: &Value) -> Result<&ModuleRef, EvalError> {
    value
        .as_module()
        .ok_or_else(|| type_error("receiver is not a class or module"))
}

/// `to_s` without dispatch, for values whose class has not overridden it.
pub(crate) fn default_to_s(runtime: &Runtime, value: &Value) -> String {
    match value {
        Value::Nil => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Fixnum(n) => n.to_string(),
        Value::Float(x) => format_float(*x),
        Value::Symbol(name) => runtime.lookup(*name).to_string(),
        Value::Str(s) => s.to_string(),
        Value::Array(_) => inspect_value(runtime, value),
        Value::Object(_) if value.same(runtime.main()) => "main".to_string(),
        Value::Object(object) => format!("#<{}>", object.class().display_name()),
        Value::Module(module) => module.display_name(),
        Value::Proc(p) => {
            let suffix = if p.is_lambda() { " (lambda)" } else { "" };
            format!("#<Proc:0x{:x}{suffix}>", value.object_id())
        }
    }
}

/// `inspect` without dispatch.
pub(crate) fn inspect_value(runtime: &Runtime, value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Symbol(name) => format!(":{}", runtime.lookup(*name)),
        Value::Str(s) => inspect_str(s),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .to_vec()
                .iter()
                .map(|item| inspect_value(runtime, item))
                .collect();
            format!("[{}]", parts.join(", "))
        }
        other => default_to_s(runtime, other),
    }
}

fn inspect_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Floats always show a fractional part: `1.0`, `2.5`.
fn format_float(x: f64) -> String {
    if x.is_nan() {
        "NaN".to_string()
    } else if x.is_infinite() {
        if x > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else {
        format!("{x:?}")
    }
}

#[cfg(test)]
mod tests;
