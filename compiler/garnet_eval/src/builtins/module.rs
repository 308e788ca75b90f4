//! `Module` and `Class`.

use std::sync::Arc;

use garnet_ir::{Arity, Name, NameKind, Visibility};
use rustc_hash::FxHashSet;

use super::{
    check_arg_range, def, def_private, def_singleton, module_arg, name_arg, proc::proc_from_block,
    receiver_module, variable_name_arg,
};
use crate::block::{Block, BlockKind};
use crate::errors::{
    argument_error, no_method, type_error, uninitialized_class_var, uninitialized_constant,
    ControlAction, EvalResult,
};
use crate::method::{CallConfiguration, DynamicMethod};
use crate::module::ModuleRef;
use crate::runtime::Runtime;
use crate::value::{RObject, Value};
use crate::Interpreter;

pub(super) fn install(runtime: &Runtime) {
    let module = &runtime.core().module;

    // Naming and comparison
    def(runtime, module, "name", Arity::no_arguments(), |_, recv, _, _| {
        Ok(receiver_module(recv)?.name().map_or(Value::Nil, Value::Str))
    });
    for to_s in ["to_s", "inspect"] {
        def(runtime, module, to_s, Arity::no_arguments(), |_, recv, _, _| {
            Ok(Value::str(receiver_module(recv)?.display_name()))
        });
    }
    def(runtime, module, "===", Arity::one_argument(), |interp, recv, args, _| {
        let module = receiver_module(recv)?;
        Ok(Value::Bool(interp.runtime().class_of(&args[0]).inherits_from(module)))
    });
    def(runtime, module, "==", Arity::one_argument(), |_, recv, args, _| {
        Ok(Value::Bool(recv.same(&args[0])))
    });
    def(runtime, module, "ancestors", Arity::no_arguments(), |_, recv, _, _| {
        let ancestors = receiver_module(recv)?
            .ancestors()
            .into_iter()
            .filter(|m| !m.is_singleton())
            .map(Value::Module)
            .collect();
        Ok(Value::array(ancestors))
    });
    def(runtime, module, "include", Arity::required(1), |interp, recv, args, _| {
        let target = receiver_module(recv)?;
        for arg in args.iter().rev() {
            let included = module_arg(interp, arg)?;
            interp.runtime().include_module(target, &included)?;
        }
        Ok(recv.clone())
    });

    // Visibility
    for (name, visibility) in [
        ("public", Visibility::Public),
        ("private", Visibility::Private),
        ("protected", Visibility::Protected),
        ("module_function", Visibility::ModuleFunction),
    ] {
        def_private(runtime, module, name, Arity::optional(), move |interp, recv, args, _| {
            set_visibility(interp, recv, args, visibility)
        });
    }

    // Methods
    def_private(runtime, module, "define_method", Arity::range(1, 1), define_method);
    def_private(runtime, module, "alias_method", Arity::fixed(2), |interp, recv, args, _| {
        let module = receiver_module(recv)?.clone();
        let new_name = name_arg(interp, &args[0])?;
        let old_name = name_arg(interp, &args[1])?;
        interp.alias_method(&module, new_name, old_name)?;
        Ok(recv.clone())
    });
    def_private(runtime, module, "remove_method", Arity::optional(), |interp, recv, args, _| {
        let module = receiver_module(recv)?;
        for arg in args {
            let name = name_arg(interp, arg)?;
            interp.runtime().remove_method(module, name)?;
        }
        Ok(recv.clone())
    });
    def_private(runtime, module, "undef_method", Arity::optional(), |interp, recv, args, _| {
        let module = receiver_module(recv)?;
        for arg in args {
            let name = name_arg(interp, arg)?;
            interp.runtime().undef_method(module, name)?;
        }
        Ok(recv.clone())
    });
    def(runtime, module, "instance_methods", Arity::range(0, 1), |_, recv, args, _| {
        let inherited = args.first().map_or(true, Value::is_truthy);
        Ok(instance_methods(receiver_module(recv)?, inherited))
    });
    def(runtime, module, "method_defined?", Arity::one_argument(), |interp, recv, args, _| {
        let name = name_arg(interp, &args[0])?;
        let defined = receiver_module(recv)?
            .search_method(name)
            .is_some_and(|(method, _)| !method.is_undefined() && !method.visibility().is_private());
        Ok(Value::Bool(defined))
    });

    // Constants and class variables
    def(runtime, module, "const_get", Arity::one_argument(), |interp, recv, args, _| {
        let module = receiver_module(recv)?;
        let name = variable_name_arg(interp, &args[0], NameKind::Constant)?;
        module
            .const_get_inherited(name)
            .or_else(|| interp.runtime().core().object.const_get_own(name))
            .ok_or_else(|| {
                let qualified = interp
                    .runtime()
                    .qualified_name(module, interp.runtime().lookup(name));
                uninitialized_constant(&qualified).into()
            })
    });
    def(runtime, module, "const_set", Arity::fixed(2), |interp, recv, args, _| {
        let module = receiver_module(recv)?;
        let name = variable_name_arg(interp, &args[0], NameKind::Constant)?;
        interp.const_assign(module, name, args[1].clone());
        Ok(args[1].clone())
    });
    def(runtime, module, "const_defined?", Arity::one_argument(), |interp, recv, args, _| {
        let name = variable_name_arg(interp, &args[0], NameKind::Constant)?;
        Ok(Value::Bool(receiver_module(recv)?.const_get_inherited(name).is_some()))
    });
    def(runtime, module, "class_variable_get", Arity::one_argument(), |interp, recv, args, _| {
        let module = receiver_module(recv)?;
        let name = variable_name_arg(interp, &args[0], NameKind::Class)?;
        module
            .class_var_owner(name)
            .and_then(|owner| owner.class_var_get_own(name))
            .ok_or_else(|| {
                uninitialized_class_var(interp.runtime().lookup(name), &module.display_name())
                    .into()
            })
    });
    def(runtime, module, "class_variable_set", Arity::fixed(2), |interp, recv, args, _| {
        let module = receiver_module(recv)?;
        let name = variable_name_arg(interp, &args[0], NameKind::Class)?;
        let owner = module.class_var_owner(name).unwrap_or_else(|| module.clone());
        owner.class_var_set(name, args[1].clone());
        Ok(args[1].clone())
    });

    // Evaluation and hooks
    for eval_name in ["module_eval", "class_eval"] {
        def(runtime, module, eval_name, Arity::no_arguments(), |interp, recv, _, block| {
            let module = receiver_module(recv)?.clone();
            module_eval(interp, &module, block)
        });
    }
    def_private(runtime, module, "method_added", Arity::one_argument(), |_, _, _, _| {
        Ok(Value::Nil)
    });

    // Attributes
    for (name, reader, writer) in [
        ("attr_reader", true, false),
        ("attr_writer", false, true),
        ("attr_accessor", true, true),
    ] {
        def_private(runtime, module, name, Arity::optional(), move |interp, recv, args, _| {
            let module = receiver_module(recv)?.clone();
            for arg in args {
                let attr = name_arg(interp, arg)?;
                define_attribute(interp, &module, attr, reader, writer)?;
            }
            Ok(Value::Nil)
        });
    }

    def_singleton(runtime, module, "new", Arity::no_arguments(), |interp, _, _, block| {
        let module = interp.runtime().new_module();
        if block.is_given() {
            module_eval(interp, &module, block)?;
        }
        Ok(Value::Module(module))
    });

    install_class(runtime);
}

fn install_class(runtime: &Runtime) {
    let class = &runtime.core().class;
    def(runtime, class, "new", Arity::optional(), class_new);
    def(runtime, class, "allocate", Arity::no_arguments(), |interp, recv, _, _| {
        let class = receiver_module(recv)?;
        Ok(allocate(interp, class)?)
    });
    def(runtime, class, "superclass", Arity::no_arguments(), |_, recv, _, _| {
        Ok(receiver_module(recv)?
            .real_superclass()
            .map_or(Value::Nil, Value::Module))
    });
    def_singleton(runtime, class, "new", Arity::range(0, 1), |interp, _, args, block| {
        let superclass = match args.first() {
            None => interp.runtime().core().object.clone(),
            Some(Value::Module(superclass)) if superclass.is_class() && !superclass.is_singleton() => {
                superclass.clone()
            }
            Some(_) => return Err(type_error("superclass must be a Class").into()),
        };
        let class = interp.runtime().new_class(&superclass);
        if block.is_given() {
            module_eval(interp, &class, block)?;
        }
        Ok(Value::Module(class))
    });

    let object = &runtime.core().object;
    def_private(runtime, object, "initialize", Arity::optional(), |_, _, _, _| Ok(Value::Nil));
}

/// `public`/`private`/`protected`/`module_function`. Without arguments
/// they set the default for later `def`s in the calling body; with names
/// they re-wrap those methods.
fn set_visibility(
    interp: &mut Interpreter,
    recv: &Value,
    args: &[Value],
    visibility: Visibility,
) -> EvalResult {
    let module = receiver_module(recv)?.clone();
    if args.is_empty() {
        interp.frames.current_mut().set_visibility(visibility);
        return Ok(Value::Nil);
    }
    for arg in args {
        let name = name_arg(interp, arg)?;
        if visibility == Visibility::ModuleFunction {
            let method = interp
                .runtime()
                .set_method_visibility(&module, name, Visibility::Private)?;
            let singleton = interp
                .runtime()
                .singleton_class_of(&Value::Module(module.clone()))?;
            let copy = method.dup_into(&singleton, Visibility::Public);
            interp.runtime().add_method(&singleton, name, copy);
        } else {
            interp
                .runtime()
                .set_method_visibility(&module, name, visibility)?;
        }
    }
    Ok(recv.clone())
}

/// `define_method(name) { |args| ... }` or `define_method(name, proc)`.
/// The body runs as a lambda with `self` rebound to the receiver.
fn define_method(interp: &mut Interpreter, recv: &Value, args: &[Value], block: &Block) -> EvalResult {
    let module = receiver_module(recv)?.clone();
    let name = name_arg(interp, &args[0])?;
    let body = match args.get(1) {
        Some(Value::Proc(proc_value)) => proc_value.block().clone(),
        Some(other) => {
            let class = interp.runtime().real_class_of(other).display_name();
            return Err(crate::errors::wrong_argument_type(&class, "Proc").into());
        }
        None if block.is_given() => block.clone(),
        None => return Err(argument_error("tried to create Proc object without a block").into()),
    };
    let arity = body.arity();
    let func = move |interp: &mut Interpreter, recv: &Value, args: &[Value], _: &Block| -> EvalResult {
        let Some(data) = body.data() else {
            return Ok(Value::Nil);
        };
        let rebound = body
            .rebind(recv.clone(), data.context().clone())
            .with_kind(BlockKind::Lambda);
        interp.yield_block(&rebound, args)
    };
    let method = DynamicMethod::native(&module, Visibility::Public, arity, Arc::new(func))
        .with_config(CallConfiguration::BACKTRACE_ONLY);
    interp.runtime().add_method(&module, name, method);
    interp.method_added(&module, name)?;
    Ok(Value::Symbol(name))
}

fn define_attribute(
    interp: &mut Interpreter,
    module: &ModuleRef,
    attr: Name,
    reader: bool,
    writer: bool,
) -> Result<(), ControlAction> {
    let attr_name = interp.runtime().lookup(attr);
    let ivar = interp.runtime().intern(&format!("@{attr_name}"));
    if reader {
        let func = move |interp: &mut Interpreter, recv: &Value, _: &[Value], _: &Block| -> EvalResult {
            Ok(interp.ivar_get(recv, ivar))
        };
        interp
            .runtime()
            .define_native(module, attr_name, Arity::no_arguments(), Arc::new(func));
        interp.method_added(module, attr)?;
    }
    if writer {
        let setter = interp.runtime().intern(&format!("{attr_name}="));
        let func = move |interp: &mut Interpreter, recv: &Value, args: &[Value], _: &Block| -> EvalResult {
            interp.ivar_set(recv, ivar, args[0].clone())?;
            Ok(args[0].clone())
        };
        interp.runtime().define_native(
            module,
            interp.runtime().lookup(setter),
            Arity::one_argument(),
            Arc::new(func),
        );
        interp.method_added(module, setter)?;
    }
    Ok(())
}

fn module_eval(interp: &mut Interpreter, module: &ModuleRef, block: &Block) -> EvalResult {
    let Some(data) = block.data() else {
        return Err(argument_error("no block given").into());
    };
    let self_value = Value::Module(module.clone());
    let rebound = block.rebind(
        self_value.clone(),
        data.context().with_definee(module.clone()),
    );
    interp.yield_block(&rebound, std::slice::from_ref(&self_value))
}

/// Public and protected method names, own table first, then ancestors.
/// A private or undefined entry hides the name further up.
fn instance_methods(module: &ModuleRef, inherited: bool) -> Value {
    let mut seen = FxHashSet::default();
    let mut names = Vec::new();
    for entry in module.chain() {
        let mut own = entry.method_names();
        own.sort_unstable();
        for name in own {
            if !seen.insert(name) {
                continue;
            }
            if let Some(method) = entry.method_entry(name) {
                if !method.is_undefined() && !method.visibility().is_private() {
                    names.push(Value::Symbol(name));
                }
            }
        }
        if !inherited {
            break;
        }
    }
    Value::array(names)
}

/// `Class#new`: allocate, then call the private `initialize` with the
/// arguments and block. Core value classes build their values directly.
fn class_new(interp: &mut Interpreter, recv: &Value, args: &[Value], block: &Block) -> EvalResult {
    let class = receiver_module(recv)?.clone();
    let core = interp.runtime().core().clone();
    if class.inherits_from(&core.array) {
        check_arg_range(args, 0, 2)?;
        let count = match args.first() {
            Some(count) => usize::try_from(super::fixnum_arg(interp, count)?)
                .map_err(|_| argument_error("negative array size"))?,
            None => 0,
        };
        let fill = args.get(1).cloned().unwrap_or_default();
        return Ok(Value::array(vec![fill; count]));
    }
    if class.inherits_from(&core.string) {
        check_arg_range(args, 0, 1)?;
        return Ok(match args.first() {
            Some(Value::Str(s)) => Value::Str(Arc::from(&**s)),
            Some(other) => Value::str(interp.to_s_string(other)?),
            None => Value::str(""),
        });
    }
    if class.inherits_from(&core.proc_class) {
        return Ok(proc_from_block(block, false)?);
    }
    let object = allocate(interp, &class)?;
    let initialize = interp.runtime().names().initialize;
    interp.send(&object, initialize, args, block, garnet_ir::CallType::Functional)?;
    Ok(object)
}

fn allocate(interp: &Interpreter, class: &ModuleRef) -> Result<Value, crate::errors::EvalError> {
    if class.is_singleton() {
        return Err(type_error("can't create instance of singleton class"));
    }
    let core = interp.runtime().core();
    let immediate = [
        &core.integer,
        &core.float,
        &core.symbol,
        &core.nil_class,
        &core.true_class,
        &core.false_class,
    ];
    if immediate.iter().any(|c| class.inherits_from(c)) {
        return Err(no_method(
            "new",
            &format!("{}:Class", class.display_name()),
        ));
    }
    Ok(Value::Object(Arc::new(RObject::new(class.clone()))))
}
