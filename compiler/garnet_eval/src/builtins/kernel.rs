//! `Kernel` (mixed into `Object`) and the `nil`/`true`/`false` classes.

use garnet_ir::{Arity, CallType, NameKind};

use super::{
    def, def_private, default_to_s, inspect_value, module_arg, name_arg,
    proc::proc_from_block, variable_name_arg,
};
use crate::block::{Block, BlockKind};
use crate::errors::{raised, runtime_error, type_error, ControlAction, EvalError, EvalResult};
use crate::runtime::Runtime;
use crate::value::Value;
use crate::Interpreter;

pub(super) fn install(runtime: &Runtime) {
    let kernel = &runtime.core().kernel;

    // Output
    def_private(runtime, kernel, "puts", Arity::optional(), puts);
    def_private(runtime, kernel, "print", Arity::optional(), |interp, _, args, _| {
        for arg in args {
            let text = interp.to_s_string(arg)?;
            interp.runtime().print_handler().print(&text);
        }
        Ok(Value::Nil)
    });
    def_private(runtime, kernel, "p", Arity::optional(), |interp, _, args, _| {
        for arg in args {
            let text = interp.inspect_string(arg)?;
            interp.runtime().print_handler().println(&text);
        }
        Ok(match args {
            [] => Value::Nil,
            [one] => one.clone(),
            many => Value::array(many.to_vec()),
        })
    });

    // Exceptions and blocks
    def_private(runtime, kernel, "raise", Arity::range(0, 2), raise);
    def_private(runtime, kernel, "loop", Arity::no_arguments(), |interp, _, _, block| loop {
        interp.poll_events()?;
        interp.yield_block(block, &[])?;
    });
    def_private(runtime, kernel, "block_given?", Arity::no_arguments(), |interp, _, _, _| {
        Ok(Value::Bool(interp.current_frame().block().is_given()))
    });
    def_private(runtime, kernel, "proc", Arity::no_arguments(), |_, _, _, block| {
        let lambda = block.kind() == Some(BlockKind::Lambda);
        Ok(proc_from_block(block, lambda)?)
    });
    def_private(runtime, kernel, "lambda", Arity::no_arguments(), |_, _, _, block| {
        Ok(proc_from_block(block, true)?)
    });

    // Dispatch
    def(runtime, kernel, "respond_to?", Arity::range(1, 1), |interp, recv, args, _| {
        let name = name_arg(interp, &args[0])?;
        let include_private = args.get(1).is_some_and(Value::is_truthy);
        let responds = if include_private {
            let class = interp.runtime().class_of(recv);
            matches!(
                interp.resolve_method(&class, name, CallType::Functional),
                crate::Lookup::Found { .. }
            )
        } else {
            interp.responds_to(recv, name)
        };
        Ok(Value::Bool(responds))
    });
    for send_name in ["send", "__send__"] {
        def(runtime, kernel, send_name, Arity::required(1), |interp, recv, args, block| {
            let name = name_arg(interp, &args[0])?;
            interp.send(recv, name, &args[1..], block, CallType::Functional)
        });
    }
    def_private(runtime, kernel, "method_missing", Arity::required(1), |interp, recv, args, _| {
        let name = name_arg(interp, &args[0])?;
        let reason = std::mem::take(&mut interp.last_missing_reason);
        Err(interp.missing_method_error(recv, name, reason).into())
    });

    // Identity and classes
    def(runtime, kernel, "class", Arity::no_arguments(), |interp, recv, _, _| {
        Ok(Value::Module(interp.runtime().real_class_of(recv)))
    });
    def(runtime, kernel, "singleton_class", Arity::no_arguments(), |interp, recv, _, _| {
        Ok(Value::Module(interp.runtime().singleton_class_of(recv)?))
    });
    for kind_of in ["is_a?", "kind_of?"] {
        def(runtime, kernel, kind_of, Arity::one_argument(), |interp, recv, args, _| {
            let module = module_arg(interp, &args[0])?;
            Ok(Value::Bool(interp.runtime().class_of(recv).inherits_from(&module)))
        });
    }
    def(runtime, kernel, "instance_of?", Arity::one_argument(), |interp, recv, args, _| {
        let module = module_arg(interp, &args[0])?;
        Ok(Value::Bool(interp.runtime().real_class_of(recv).same_origin(&module)))
    });
    def(runtime, kernel, "nil?", Arity::no_arguments(), |_, recv, _, _| {
        Ok(Value::Bool(recv.is_nil()))
    });
    for identity in ["==", "equal?"] {
        def(runtime, kernel, identity, Arity::one_argument(), |_, recv, args, _| {
            Ok(Value::Bool(recv.same(&args[0])))
        });
    }
    def(runtime, kernel, "!=", Arity::one_argument(), |interp, recv, args, _| {
        let eq = interp.runtime().names().eq;
        let equal = interp.send(recv, eq, args, &Block::none(), CallType::Functional)?;
        Ok(Value::Bool(!equal.is_truthy()))
    });
    def(runtime, kernel, "===", Arity::one_argument(), |interp, recv, args, _| {
        let eq = interp.runtime().names().eq;
        interp.send(recv, eq, args, &Block::none(), CallType::Functional)
    });
    def(runtime, kernel, "to_s", Arity::no_arguments(), |interp, recv, _, _| {
        Ok(Value::str(default_to_s(interp.runtime(), recv)))
    });
    def(runtime, kernel, "inspect", Arity::no_arguments(), |interp, recv, _, _| {
        Ok(Value::str(inspect_value(interp.runtime(), recv)))
    });
    def(runtime, kernel, "object_id", Arity::no_arguments(), |_, recv, _, _| {
        Ok(Value::Fixnum(recv.object_id()))
    });

    // Instance state and evaluation
    def(runtime, kernel, "instance_variable_get", Arity::one_argument(), |interp, recv, args, _| {
        let name = variable_name_arg(interp, &args[0], NameKind::Instance)?;
        Ok(interp.ivar_get(recv, name))
    });
    def(runtime, kernel, "instance_variable_set", Arity::fixed(2), |interp, recv, args, _| {
        let name = variable_name_arg(interp, &args[0], NameKind::Instance)?;
        interp.ivar_set(recv, name, args[1].clone())?;
        Ok(args[1].clone())
    });
    def(runtime, kernel, "instance_eval", Arity::no_arguments(), |interp, recv, _, block| {
        let Some(data) = block.data() else {
            return Err(crate::errors::argument_error("no block given").into());
        };
        let definee = match interp.runtime().singleton_class_of(recv) {
            Ok(singleton) => singleton,
            Err(_) => interp.runtime().real_class_of(recv),
        };
        let rebound = block.rebind(recv.clone(), data.context().with_definee(definee));
        interp.yield_block(&rebound, std::slice::from_ref(recv))
    });
    def(runtime, kernel, "extend", Arity::required(1), |interp, recv, args, _| {
        let singleton = interp.runtime().singleton_class_of(recv)?;
        for module in args.iter().rev() {
            let module = module_arg(interp, module)?;
            interp.runtime().include_module(&singleton, &module)?;
        }
        Ok(recv.clone())
    });
    def_private(runtime, kernel, "singleton_method_added", Arity::one_argument(), |_, _, _, _| {
        Ok(Value::Nil)
    });

    install_singletons(runtime);
}

/// `NilClass`, `TrueClass`, `FalseClass`.
fn install_singletons(runtime: &Runtime) {
    let core = runtime.core();
    def(runtime, &core.nil_class, "to_a", Arity::no_arguments(), |_, _, _, _| {
        Ok(Value::array(Vec::new()))
    });
    for class in [&core.nil_class, &core.true_class, &core.false_class] {
        def(runtime, class, "&", Arity::one_argument(), |_, recv, args, _| {
            Ok(Value::Bool(recv.is_truthy() && args[0].is_truthy()))
        });
        def(runtime, class, "|", Arity::one_argument(), |_, recv, args, _| {
            Ok(Value::Bool(recv.is_truthy() || args[0].is_truthy()))
        });
    }
}

/// `puts`: one line per argument, arrays flattened, a bare newline with
/// no arguments.
fn puts(interp: &mut Interpreter, _recv: &Value, args: &[Value], _block: &Block) -> EvalResult {
    let mut lines = Vec::new();
    for arg in args {
        puts_lines(interp, arg, &mut lines)?;
    }
    if args.is_empty() {
        lines.push(String::new());
    }
    let handler = interp.runtime().print_handler().clone();
    for line in &lines {
        handler.println(line);
    }
    Ok(Value::Nil)
}

fn puts_lines(
    interp: &mut Interpreter,
    value: &Value,
    lines: &mut Vec<String>,
) -> Result<(), ControlAction> {
    match value {
        Value::Array(items) => {
            for item in items.to_vec() {
                puts_lines(interp, &item, lines)?;
            }
        }
        other => lines.push(interp.to_s_string(other)?),
    }
    Ok(())
}

/// `raise`, `raise "msg"`, `raise Class`, `raise Class, "msg"`,
/// `raise obj`. Classes and objects are converted with `exception`.
fn raise(interp: &mut Interpreter, _recv: &Value, args: &[Value], _block: &Block) -> EvalResult {
    let exception_name = interp.runtime().names().exception;
    let exception = match args {
        [] => {
            let current = interp.current_exception().clone();
            if current.is_nil() {
                return Err(runtime_error("unhandled exception").into());
            }
            current
        }
        [Value::Str(message)] => return Err(runtime_error(message.to_string()).into()),
        [target, rest @ ..] => {
            if !interp.responds_to(target, exception_name) {
                return Err(type_error("exception class/object expected").into());
            }
            interp.send(target, exception_name, rest, &Block::none(), CallType::Normal)?
        }
    };
    Err(raise_object(interp, exception)?.into())
}

fn raise_object(interp: &mut Interpreter, exception: Value) -> Result<EvalError, ControlAction> {
    let class = interp.runtime().real_class_of(&exception);
    if !class.inherits_from(&interp.runtime().core().exception) {
        return Err(type_error("exception object expected").into());
    }
    let message_name = interp.runtime().names().message;
    let message = interp.send(&exception, message_name, &[], &Block::none(), CallType::Normal)?;
    let message = interp.to_s_string(&message)?;
    tracing::trace!(class = %class.display_name(), %message, "raise");
    Ok(raised(&class.display_name(), message, exception))
}
