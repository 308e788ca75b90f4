//! Cross-thread events, shared runtimes and hot-method promotion.

use std::sync::Arc;
use std::time::Duration;

use garnet_ir::Name;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

use super::{ints, Session};
use crate::ast::{ArgsDecl, NodeRef};
use crate::method::{CompiledBody, InterpretedMethod, MethodCompiler};
use crate::{AstBuilder, Interpreter, Value};

fn rescue_as(b: &AstBuilder, body: NodeRef, class: &str, handler: NodeRef) -> NodeRef {
    b.rescue(
        Some(body),
        vec![b.rescue_clause(vec![b.const_(class)], Some(b.t_ivar("@e")), Some(handler))],
        None,
    )
}

#[test]
fn interrupt_raises_at_the_next_call() {
    let mut s = Session::new();
    let b = s.builder();
    s.interp.interrupt_handle().interrupt("stop");
    let program = rescue_as(
        &b,
        b.call(b.int(1), "succ", vec![]),
        "Interrupt",
        b.call(b.ivar("@e"), "message", vec![]),
    );
    assert_eq!(s.run(&program), Value::str("stop"));
    assert!(!s.interp.interrupt_handle().has_pending());
}

#[test]
fn interrupt_is_not_a_standard_error() {
    let mut s = Session::new();
    let b = s.builder();
    s.interp.interrupt_handle().interrupt("stop");
    let program = b.rescue(
        Some(b.call(b.int(1), "succ", vec![])),
        vec![b.rescue_clause(vec![], None, Some(b.sym("caught")))],
        None,
    );
    let err = s.run_err(&program);
    assert_eq!(err.exception_class(), "Interrupt");
    assert_eq!(err.message, "stop");
}

#[test]
fn kill_unwinds_through_every_rescue() {
    let mut s = Session::new();
    let b = s.builder();
    s.interp.interrupt_handle().kill();
    let program = b.ensure(
        Some(rescue_as(&b, b.call(b.int(1), "succ", vec![]), "Exception", b.sym("caught"))),
        Some(b.gasgn("$cleaned", b.true_())),
    );
    let err = s.run_err(&program);
    assert!(!err.is_rescuable());
    assert_eq!(err.exception_class(), "SignalException");
    assert_eq!(err.message, "thread killed");
    assert_eq!(s.run(&b.gvar("$cleaned")), Value::Bool(true));
}

#[test]
fn loops_poll_for_events_from_another_thread() {
    let mut s = Session::new();
    let b = s.builder();
    let handle = s.interp.interrupt_handle();
    let sender = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(10));
        handle.interrupt("wake up");
    });
    let err = s.run_err(&b.while_(b.true_(), None));
    assert!(sender.join().is_ok());
    assert_eq!(err.exception_class(), "Interrupt");
    assert_eq!(err.message, "wake up");
}

#[test]
fn spawned_threads_share_classes_and_globals() {
    let mut s = Session::new();
    let b = s.builder();
    s.run(&b.block(vec![
        b.class_(
            b.cpath("Counter"),
            None,
            Some(b.defn("step", ArgsDecl::default(), Some(b.int(10)), b.local_scope(&[]))),
            b.local_scope(&[]),
        ),
        b.gasgn("$base", b.int(5)),
    ]));

    let mut worker = s.interp.spawn_thread();
    let program = b.block(vec![
        b.gasgn("$from_worker", b.true_()),
        b.call(
            b.call(b.call(b.const_("Counter"), "new", vec![]), "step", vec![]),
            "+",
            vec![b.gvar("$base")],
        ),
    ]);
    let result = std::thread::spawn(move || worker.eval(&program).map_err(|err| err.message))
        .join()
        .map_err(|_| "worker panicked");
    assert_eq!(result, Ok(Ok(Value::Fixnum(15))));
    assert_eq!(s.run(&b.gvar("$from_worker")), Value::Bool(true));
}

#[test]
fn threads_have_separate_event_queues() {
    let mut s = Session::new();
    let b = s.builder();
    let mut worker = s.interp.spawn_thread();
    worker.interrupt_handle().kill();
    assert_eq!(s.run(&b.call(b.int(1), "succ", vec![])), Value::Fixnum(2));
    assert!(worker.eval(&b.call(b.int(1), "succ", vec![])).is_err());
}

/// Multiplies the first argument by 100 so compiled calls are visible.
#[derive(Default)]
struct ScalingCompiler {
    offered: Mutex<Vec<Name>>,
}

impl MethodCompiler for ScalingCompiler {
    fn compile(&self, name: Name, _: &InterpretedMethod) -> Option<CompiledBody> {
        self.offered.lock().push(name);
        let body: CompiledBody = Arc::new(|interp, _, _| match interp.local(0) {
            Value::Fixnum(n) => Ok(Value::Fixnum(n * 100)),
            other => Ok(other),
        });
        Some(body)
    }
}

#[test]
fn hot_methods_switch_to_compiled_bodies() {
    let compiler = Arc::new(ScalingCompiler::default());
    let mut s = Session::with(
        Interpreter::builder()
            .jit_threshold(2)
            .method_compiler(compiler.clone()),
    );
    let b = s.builder();
    let program = b.block(vec![
        b.defn("m", b.required_args(&["x"]), Some(b.lvar("x", 0)), b.local_scope(&["x"])),
        b.array(vec![
            b.fcall("m", vec![b.int(1)]),
            b.fcall("m", vec![b.int(2)]),
            b.fcall("m", vec![b.int(3)]),
        ]),
    ]);
    assert_eq!(s.run(&program), ints(&[1, 200, 300]));
    assert_eq!(*compiler.offered.lock(), vec![b.name("m")]);
}

#[test]
fn variable_arity_methods_stay_interpreted() {
    let compiler = Arc::new(ScalingCompiler::default());
    let mut s = Session::with(
        Interpreter::builder()
            .jit_threshold(1)
            .method_compiler(compiler.clone()),
    );
    let b = s.builder();
    let args = ArgsDecl {
        rest: Some(b.param("rest", 0)),
        ..ArgsDecl::default()
    };
    let program = b.block(vec![
        b.defn("v", args, Some(b.lvar("rest", 0)), b.local_scope(&["rest"])),
        b.fcall("v", vec![b.int(1)]),
        b.fcall("v", vec![b.int(2)]),
    ]);
    assert_eq!(s.run(&program), ints(&[2]));
    assert!(compiler.offered.lock().is_empty());
}
