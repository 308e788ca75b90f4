use super::*;
use pretty_assertions::assert_eq;

use crate::block::Block;
use crate::errors::EvalErrorKind;
use crate::print_handler::silent_handler;

fn interpreter() -> Interpreter {
    Interpreter::builder()
        .mode(EvalMode::TestRun)
        .print_handler(silent_handler())
        .build()
}

fn method_activation(interp: &Interpreter, name: &str) -> Activation {
    Activation {
        frame: Some(Frame::for_body(Value::Fixnum(1), Visibility::Public)),
        scope: Some(DynamicScope::new(StaticScope::local(Vec::new()), None)),
        backtrace: Some(interp.runtime().intern(name)),
        context: None,
        counts_depth: true,
    }
}

#[test]
fn guard_pops_everything_it_pushed() {
    let mut interp = interpreter();
    let frames = interp.frames.depth();
    let scopes = interp.scopes.depth();
    let activation = method_activation(&interp, "run");
    {
        let guard = interp.activate(activation);
        let Ok(guard) = guard else {
            panic!("activation failed");
        };
        assert_eq!(guard.frames.depth(), frames + 1);
        assert_eq!(guard.call_depth(), 1);
        assert_eq!(guard.current_self(), &Value::Fixnum(1));
        assert_eq!(guard.backtrace().len(), 2);
    }
    assert_eq!(interp.frames.depth(), frames);
    assert_eq!(interp.scopes.depth(), scopes);
    assert_eq!(interp.call_depth(), 0);
    assert_eq!(interp.backtrace().len(), 1);
}

#[test]
fn depth_limit_refuses_without_pushing() {
    let mut interp = Interpreter::builder()
        .max_call_depth(1)
        .print_handler(silent_handler())
        .build();
    let outer = method_activation(&interp, "outer");
    let inner = method_activation(&interp, "inner");
    let Ok(mut guard) = interp.activate(outer) else {
        panic!("first activation must fit");
    };
    let frames = guard.frames.depth();
    let err = guard.activate(inner).err().map(|e| e.kind);
    assert_eq!(err, Some(EvalErrorKind::StackTooDeep));
    assert_eq!(guard.frames.depth(), frames);
}

#[test]
fn pending_events_surface_as_errors() {
    let mut interp = interpreter();
    let handle = interp.interrupt_handle();
    assert!(interp.poll_events().is_ok());

    handle.interrupt("stop");
    let err = interp.poll_events().err().map(ControlAction::into_error);
    assert_eq!(err.map(|e| e.message).as_deref(), Some("stop"));

    handle.kill();
    let err = interp.poll_events().err().map(ControlAction::into_error);
    assert!(err.is_some_and(|e| !e.is_rescuable()));
}

#[test]
fn threads_share_the_runtime_but_not_stacks() {
    let interp = interpreter();
    let other = interp.spawn_thread();
    assert!(Arc::ptr_eq(interp.runtime(), other.runtime()));
    assert_eq!(other.mode(), EvalMode::TestRun);
    assert_eq!(other.depth.limit(), Some(EvalMode::TestRun.max_recursion_depth()));
    assert!(other.current_self().same(interp.runtime().main()));
}

fn native_block(interp: &Interpreter) -> Block {
    Block::native(
        Arc::new(|_, args| Ok(args.first().cloned().unwrap_or_default())),
        garnet_ir::Arity::optional(),
        interp.current_frame(),
        interp.scopes.current().clone(),
        interp.context.clone(),
    )
}

#[test]
fn block_call_registry_removes_the_latest_entry() {
    let mut interp = interpreter();
    let a = native_block(&interp).id();
    let b = native_block(&interp).id();
    let (Some(a), Some(b)) = (a, b) else {
        panic!("native blocks have ids");
    };
    interp.enter_block_call(a);
    interp.enter_block_call(b);
    interp.enter_block_call(a);
    interp.exit_block_call(a);
    assert_eq!(interp.active_block_calls, vec![a, b]);
    interp.exit_block_call(b);
    interp.exit_block_call(b);
    assert_eq!(interp.active_block_calls, vec![a]);
}

#[test]
fn locals_read_the_innermost_scope() {
    let interp = interpreter();
    assert_eq!(interp.local(0), Value::Nil);
    interp.set_local(0, Value::Fixnum(2));
    assert_eq!(interp.local(0), Value::Fixnum(2));
}

#[test]
fn builder_wires_the_jit_policy() {
    let interp = Interpreter::builder()
        .jit_threshold(7)
        .print_handler(silent_handler())
        .build();
    assert_eq!(interp.runtime().jit().threshold, 7);
    assert!(interp.runtime().jit().compiler.is_none());
    assert_eq!(interp.mode(), EvalMode::Interpret);
}
