//! Blocks, procs and lambdas: closures and the jumps that leave them.

use std::sync::Arc;

use garnet_ir::StaticScope;
use pretty_assertions::assert_eq;

use super::{ints, Session};
use crate::ast::{ArgsDecl, BlockArg, NodeRef};
use crate::{AstBuilder, Value};

/// `{ |params| body }` whose parameters occupy the block scope's first
/// slots.
fn iter(b: &AstBuilder, parent: &Arc<StaticScope>, params: &[&str], body: NodeRef) -> BlockArg {
    let targets = b.targets(
        params
            .iter()
            .enumerate()
            .map(|(i, name)| b.t_dvar(name, i, 0))
            .collect(),
        None,
        vec![],
    );
    let params = (!params.is_empty()).then_some(targets);
    b.iter(params, Some(body), b.block_scope(parent, &[]))
}

fn proc_literal(b: &AstBuilder, kind: &str, parent: &Arc<StaticScope>, params: &[&str], body: NodeRef) -> NodeRef {
    b.fcall_with(kind, vec![], Some(iter(b, parent, params, body)))
}

#[test]
fn yield_passes_arguments_and_closures_write_through() {
    let mut s = Session::new();
    let b = s.builder();
    let top = b.local_scope(&["total"]);
    // def twice; yield 1; yield 2; end
    // total = 0; twice { |x| total += x }; total
    let program = b.block(vec![
        b.defn(
            "twice",
            ArgsDecl::default(),
            Some(b.block(vec![b.yield_(vec![b.int(1)]), b.yield_(vec![b.int(2)])])),
            b.local_scope(&[]),
        ),
        b.lasgn("total", 0, b.int(0)),
        b.fcall_with(
            "twice",
            vec![],
            Some(iter(
                &b,
                &top,
                &["x"],
                b.dasgn("total", 0, 1, b.call(b.dvar("total", 0, 1), "+", vec![b.dvar("x", 0, 0)])),
            )),
        ),
        b.lvar("total", 0),
    ]);
    assert_eq!(s.run(&program), Value::Fixnum(3));
}

#[test]
fn closures_see_later_writes() {
    let mut s = Session::new();
    let b = s.builder();
    let top = b.local_scope(&["x", "pr"]);
    let program = b.block(vec![
        b.lasgn("x", 0, b.int(1)),
        b.lasgn("pr", 1, proc_literal(&b, "proc", &top, &[], b.dvar("x", 0, 1))),
        b.lasgn("x", 0, b.int(2)),
        b.call(b.lvar("pr", 1), "call", vec![]),
    ]);
    assert_eq!(s.run(&program), Value::Fixnum(2));
}

#[test]
fn break_ends_the_receiving_call() {
    let mut s = Session::new();
    let b = s.builder();
    let top = b.local_scope(&[]);
    // def run; yield; :after; end; run { break 7 }
    let program = b.block(vec![
        b.defn(
            "run",
            ArgsDecl::default(),
            Some(b.block(vec![b.yield_(vec![]), b.sym("after")])),
            b.local_scope(&[]),
        ),
        b.fcall_with("run", vec![], Some(iter(&b, &top, &[], b.break_(Some(b.int(7)))))),
    ]);
    assert_eq!(s.run(&program), Value::Fixnum(7));
}

#[test]
fn inner_break_ends_only_the_inner_call() {
    let mut s = Session::new();
    let b = s.builder();
    let top = b.local_scope(&[]);
    let outer = b.block_scope(&top, &[]);
    // def run; yield; end; run { run { break 1 }; 2 }
    let inner = b.fcall_with("run", vec![], Some(iter(&b, &outer, &[], b.break_(Some(b.int(1))))));
    let program = b.block(vec![
        b.defn("run", ArgsDecl::default(), Some(b.yield_(vec![])), b.local_scope(&[])),
        b.fcall_with(
            "run",
            vec![],
            Some(b.iter(None, Some(b.block(vec![inner, b.int(2)])), outer)),
        ),
    ]);
    assert_eq!(s.run(&program), Value::Fixnum(2));
}

#[test]
fn break_runs_each_ensure_it_leaves_once() {
    let mut s = Session::new();
    let b = s.builder();
    let top = b.local_scope(&["r"]);
    let log = |tag: &str| b.call(b.gvar("$log"), "<<", vec![b.sym(tag)]);
    // def run; begin; yield; ensure; $log << :method; end; end
    // $log = []
    // r = run { begin; break 1; ensure; $log << :block; end }
    // [r, $log]
    let program = b.block(vec![
        b.defn(
            "run",
            ArgsDecl::default(),
            Some(b.ensure(Some(b.yield_(vec![])), Some(log("method")))),
            b.local_scope(&[]),
        ),
        b.gasgn("$log", b.array(vec![])),
        b.lasgn(
            "r",
            0,
            b.fcall_with(
                "run",
                vec![],
                Some(iter(&b, &top, &[], b.ensure(Some(b.break_(Some(b.int(1)))), Some(log("block"))))),
            ),
        ),
        b.array(vec![b.lvar("r", 0), b.gvar("$log")]),
    ]);
    let expected = Value::array(vec![
        Value::Fixnum(1),
        Value::array(vec![s.sym("block"), s.sym("method")]),
    ]);
    assert_eq!(s.run(&program), expected);
}

#[test]
fn loop_runs_until_break() {
    let mut s = Session::new();
    let b = s.builder();
    let top = b.local_scope(&["i"]);
    let body = b.block(vec![
        b.dasgn("i", 0, 1, b.call(b.dvar("i", 0, 1), "+", vec![b.int(1)])),
        b.if_(
            b.call(b.dvar("i", 0, 1), "==", vec![b.int(3)]),
            Some(b.break_(Some(b.dvar("i", 0, 1)))),
            None,
        ),
    ]);
    let program = b.block(vec![
        b.lasgn("i", 0, b.int(0)),
        b.fcall_with("loop", vec![], Some(iter(&b, &top, &[], body))),
    ]);
    assert_eq!(s.run(&program), Value::Fixnum(3));
}

#[test]
fn break_from_an_orphaned_proc_is_a_local_jump_error() {
    let mut s = Session::new();
    let b = s.builder();
    let top = b.local_scope(&[]);
    let program = b.call(
        proc_literal(&b, "proc", &top, &[], b.break_(Some(b.int(1)))),
        "call",
        vec![],
    );
    let err = s.run_err(&program);
    assert_eq!(err.exception_class(), "LocalJumpError");
    assert_eq!(err.message, "break from proc-closure");
}

#[test]
fn return_in_a_block_leaves_the_defining_method() {
    let mut s = Session::new();
    let b = s.builder();
    let method_scope = b.local_scope(&[]);
    // def find; [1, 2, 3].each { |x| return x * 10 if x == 2 }; :none; end
    let body = b.if_(
        b.call(b.dvar("x", 0, 0), "==", vec![b.int(2)]),
        Some(b.return_(Some(b.call(b.dvar("x", 0, 0), "*", vec![b.int(10)])))),
        None,
    );
    let program = b.block(vec![
        b.defn(
            "find",
            ArgsDecl::default(),
            Some(b.block(vec![
                b.call_with(
                    b.array(vec![b.int(1), b.int(2), b.int(3)]),
                    "each",
                    vec![],
                    Some(iter(&b, &method_scope, &["x"], body)),
                ),
                b.sym("none"),
            ])),
            method_scope.clone(),
        ),
        b.fcall("find", vec![]),
    ]);
    assert_eq!(s.run(&program), Value::Fixnum(20));
}

#[test]
fn return_from_a_proc_after_its_method_returned() {
    let mut s = Session::new();
    let b = s.builder();
    let method_scope = b.local_scope(&[]);
    let program = b.block(vec![
        b.defn(
            "make",
            ArgsDecl::default(),
            Some(proc_literal(&b, "proc", &method_scope, &[], b.return_(Some(b.int(1))))),
            method_scope.clone(),
        ),
        b.call(b.fcall("make", vec![]), "call", vec![]),
    ]);
    let err = s.run_err(&program);
    assert_eq!(err.exception_class(), "LocalJumpError");
    assert_eq!(err.message, "unexpected return");
}

#[test]
fn lambda_return_stays_in_the_lambda() {
    let mut s = Session::new();
    let b = s.builder();
    let method_scope = b.local_scope(&["l"]);
    // def m; l = lambda { return 1 }; l.call; 2; end
    let program = b.block(vec![
        b.defn(
            "m",
            ArgsDecl::default(),
            Some(b.block(vec![
                b.lasgn(
                    "l",
                    0,
                    proc_literal(&b, "lambda", &method_scope, &[], b.return_(Some(b.int(1)))),
                ),
                b.call(b.lvar("l", 0), "call", vec![]),
                b.int(2),
            ])),
            method_scope.clone(),
        ),
        b.array(vec![
            b.fcall("m", vec![]),
            b.call(
                proc_literal(&b, "lambda", &method_scope, &[], b.break_(Some(b.int(3)))),
                "call",
                vec![],
            ),
        ]),
    ]);
    assert_eq!(s.run(&program), ints(&[2, 3]));
}

#[test]
fn lambdas_check_arity_and_procs_do_not() {
    let mut s = Session::new();
    let b = s.builder();
    let top = b.local_scope(&[]);
    let pair = || b.array(vec![b.dvar("a", 0, 0), b.dvar("b", 1, 0)]);

    let strict = b.call(
        proc_literal(&b, "lambda", &top, &["a", "b"], pair()),
        "call",
        vec![b.int(1)],
    );
    let err = s.run_err(&strict);
    assert_eq!(err.message, "wrong number of arguments (1 for 2)");

    let lenient = b.call(proc_literal(&b, "proc", &top, &["a", "b"], pair()), "call", vec![b.int(1)]);
    assert_eq!(s.run(&lenient), Value::array(vec![Value::Fixnum(1), Value::Nil]));

    let splatted = b.call(
        proc_literal(&b, "proc", &top, &["a", "b"], pair()),
        "call",
        vec![b.array(vec![b.int(3), b.int(4)])],
    );
    assert_eq!(s.run(&splatted), ints(&[3, 4]));

    let arity = b.call(proc_literal(&b, "lambda", &top, &["a", "b"], pair()), "arity", vec![]);
    assert_eq!(s.run(&arity), Value::Fixnum(2));
}

#[test]
fn block_parameter_and_block_given() {
    let mut s = Session::new();
    let b = s.builder();
    let top = b.local_scope(&[]);
    let decl = ArgsDecl {
        block: Some(b.param("blk", 0)),
        ..ArgsDecl::default()
    };
    // def check(&blk); [block_given?, blk.nil?]; end
    let program = b.block(vec![
        b.defn(
            "check",
            decl,
            Some(b.array(vec![
                b.fcall("block_given?", vec![]),
                b.call(b.lvar("blk", 0), "nil?", vec![]),
            ])),
            b.local_scope(&["blk"]),
        ),
        b.array(vec![
            b.fcall_with("check", vec![], Some(iter(&b, &top, &[], b.nil()))),
            b.fcall("check", vec![]),
        ]),
    ]);
    assert_eq!(
        s.run(&program),
        Value::array(vec![
            Value::array(vec![Value::Bool(true), Value::Bool(false)]),
            Value::array(vec![Value::Bool(false), Value::Bool(true)]),
        ])
    );
}

#[test]
fn yield_without_a_block() {
    let mut s = Session::new();
    let b = s.builder();
    let program = b.block(vec![
        b.defn("run", ArgsDecl::default(), Some(b.yield_(vec![])), b.local_scope(&[])),
        b.fcall("run", vec![]),
    ]);
    let err = s.run_err(&program);
    assert_eq!(err.message, "no block given (yield)");
}

#[test]
fn symbol_block_pass() {
    let mut s = Session::new();
    let b = s.builder();
    let program = b.call_with(
        b.array(vec![b.int(1), b.int(2)]),
        "map",
        vec![],
        Some(b.block_pass(b.sym("succ"))),
    );
    assert_eq!(s.run(&program), ints(&[2, 3]));

    let bad = b.call_with(b.array(vec![]), "map", vec![], Some(b.block_pass(b.int(1))));
    assert_eq!(s.run_err(&bad).message, "wrong argument type Integer (expected Proc)");
}

#[test]
fn iteration_helpers() {
    let mut s = Session::new();
    let b = s.builder();
    let top = b.local_scope(&[]);
    let sum = |x: &str, y: &str| b.call(b.dvar(x, 0, 0), "+", vec![b.dvar(y, 1, 0)]);

    let pairs = b.call_with(
        b.array(vec![
            b.array(vec![b.int(1), b.int(2)]),
            b.array(vec![b.int(3), b.int(4)]),
        ]),
        "map",
        vec![],
        Some(iter(&b, &top, &["a", "b"], sum("a", "b"))),
    );
    assert_eq!(s.run(&pairs), ints(&[3, 7]));

    let injected = b.call_with(
        b.array(vec![b.int(1), b.int(2), b.int(3)]),
        "inject",
        vec![b.int(10)],
        Some(iter(&b, &top, &["acc", "x"], sum("acc", "x"))),
    );
    assert_eq!(s.run(&injected), Value::Fixnum(16));

    let skipped = b.call_with(
        b.array(vec![b.int(1), b.int(2), b.int(3)]),
        "map",
        vec![],
        Some(iter(
            &b,
            &top,
            &["x"],
            b.block(vec![
                b.if_(
                    b.call(b.dvar("x", 0, 0), "==", vec![b.int(2)]),
                    Some(b.next(Some(b.int(0)))),
                    None,
                ),
                b.dvar("x", 0, 0),
            ]),
        )),
    );
    assert_eq!(s.run(&skipped), ints(&[1, 0, 3]));

    let selected = b.call_with(
        b.array(vec![b.int(1), b.int(2), b.int(3), b.int(4)]),
        "select",
        vec![],
        Some(iter(&b, &top, &["x"], b.call(b.dvar("x", 0, 0), ">", vec![b.int(2)]))),
    );
    assert_eq!(s.run(&selected), ints(&[3, 4]));
}
