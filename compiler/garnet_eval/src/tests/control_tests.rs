//! Loops, conditionals, `case` and `ensure`.

use pretty_assertions::assert_eq;

use super::{ints, Session};
use crate::ast::NodeRef;
use crate::{AstBuilder, Value};

/// `name += by` on a top-level local.
fn incr(b: &AstBuilder, name: &str, index: usize, by: NodeRef) -> NodeRef {
    b.lasgn(name, index, b.call(b.lvar(name, index), "+", vec![by]))
}

#[test]
fn while_with_next_skips_to_the_test() {
    let mut s = Session::new();
    let b = s.builder();
    // i = 0; total = 0
    // while i < 5; i += 1; next if i == 2; total += i; end
    let program = b.block(vec![
        b.lasgn("i", 0, b.int(0)),
        b.lasgn("total", 1, b.int(0)),
        b.while_(
            b.call(b.lvar("i", 0), "<", vec![b.int(5)]),
            Some(b.block(vec![
                incr(&b, "i", 0, b.int(1)),
                b.if_(
                    b.call(b.lvar("i", 0), "==", vec![b.int(2)]),
                    Some(b.next(None)),
                    None,
                ),
                incr(&b, "total", 1, b.lvar("i", 0)),
            ])),
        ),
        b.lvar("total", 1),
    ]);
    assert_eq!(s.run(&program), Value::Fixnum(13));
}

#[test]
fn break_gives_the_loop_its_value() {
    let mut s = Session::new();
    let b = s.builder();
    let program = b.while_(b.true_(), Some(b.break_(Some(b.int(42)))));
    assert_eq!(s.run(&program), Value::Fixnum(42));

    let program = b.until_(b.false_(), Some(b.break_(None)));
    assert_eq!(s.run(&program), Value::Nil);
}

#[test]
fn redo_reruns_the_body_without_testing() {
    let mut s = Session::new();
    let b = s.builder();
    // i = 0; while i < 1; i += 1; redo if i == 1; end; i
    let program = b.block(vec![
        b.lasgn("i", 0, b.int(0)),
        b.while_(
            b.call(b.lvar("i", 0), "<", vec![b.int(1)]),
            Some(b.block(vec![
                incr(&b, "i", 0, b.int(1)),
                b.if_(
                    b.call(b.lvar("i", 0), "==", vec![b.int(1)]),
                    Some(b.redo()),
                    None,
                ),
            ])),
        ),
        b.lvar("i", 0),
    ]);
    assert_eq!(s.run(&program), Value::Fixnum(2));
}

#[test]
fn post_test_loop_runs_once() {
    let mut s = Session::new();
    let b = s.builder();
    let program = b.block(vec![
        b.lasgn("n", 0, b.int(0)),
        b.do_while(Some(incr(&b, "n", 0, b.int(1))), b.false_()),
        b.lvar("n", 0),
    ]);
    assert_eq!(s.run(&program), Value::Fixnum(1));
}

#[test]
fn for_binds_in_the_enclosing_scope() {
    let mut s = Session::new();
    let b = s.builder();
    let top = b.local_scope(&["sum", "x"]);
    // sum = 0; for x in [1, 2, 3]; sum += x; end; [sum, x]
    let program = b.block(vec![
        b.lasgn("sum", 0, b.int(0)),
        b.for_(
            b.t_local("x", 1),
            b.array(vec![b.int(1), b.int(2), b.int(3)]),
            Some(incr(&b, "sum", 0, b.lvar("x", 1))),
            &top,
        ),
        b.array(vec![b.lvar("sum", 0), b.lvar("x", 1)]),
    ]);
    assert_eq!(s.run(&program), ints(&[6, 3]));
}

#[test]
fn case_tests_candidates_with_triple_equals() {
    let mut s = Session::new();
    let b = s.builder();
    let case = |subject: NodeRef| {
        b.case(
            Some(subject),
            vec![
                (vec![b.int(1), b.int(2)], Some(b.str("low"))),
                (vec![b.splat(b.array(vec![b.int(7), b.int(8)]))], Some(b.str("lucky"))),
                (vec![b.const_("Integer")], Some(b.str("int"))),
            ],
            Some(b.str("other")),
        )
    };
    assert_eq!(s.run(&case(b.int(2))), Value::str("low"));
    assert_eq!(s.run(&case(b.int(8))), Value::str("lucky"));
    assert_eq!(s.run(&case(b.int(5))), Value::str("int"));
    assert_eq!(s.run(&case(b.str("x"))), Value::str("other"));
}

#[test]
fn case_without_subject_tests_truthiness() {
    let mut s = Session::new();
    let b = s.builder();
    let program = b.case(
        None,
        vec![
            (vec![b.nil()], Some(b.int(1))),
            (vec![b.call(b.int(3), ">", vec![b.int(2)])], Some(b.int(2))),
        ],
        None,
    );
    assert_eq!(s.run(&program), Value::Fixnum(2));
}

#[test]
fn ensure_runs_on_every_exit() {
    let mut s = Session::new();
    let b = s.builder();
    // log = []
    // while true; begin; break 1; ensure; log << :a; end; end
    // begin; raise "x"; ensure; log << :b; end rescue nil
    // log
    let program = b.block(vec![
        b.lasgn("log", 0, b.array(vec![])),
        b.while_(
            b.true_(),
            Some(b.ensure(
                Some(b.break_(Some(b.int(1)))),
                Some(b.call(b.lvar("log", 0), "<<", vec![b.sym("a")])),
            )),
        ),
        b.rescue(
            Some(b.ensure(
                Some(b.fcall("raise", vec![b.str("x")])),
                Some(b.call(b.lvar("log", 0), "<<", vec![b.sym("b")])),
            )),
            vec![b.rescue_clause(vec![], None, None)],
            None,
        ),
        b.lvar("log", 0),
    ]);
    assert_eq!(
        s.run(&program),
        Value::array(vec![s.sym("a"), s.sym("b")])
    );
}

#[test]
fn ensure_runs_once_as_next_passes_through() {
    let mut s = Session::new();
    let b = s.builder();
    // i = 0; log = []
    // while i < 3; i += 1; begin; next if i == 2; log << i; ensure; log << :e; end; end
    // log
    let program = b.block(vec![
        b.lasgn("i", 0, b.int(0)),
        b.lasgn("log", 1, b.array(vec![])),
        b.while_(
            b.call(b.lvar("i", 0), "<", vec![b.int(3)]),
            Some(b.block(vec![
                incr(&b, "i", 0, b.int(1)),
                b.ensure(
                    Some(b.block(vec![
                        b.if_(
                            b.call(b.lvar("i", 0), "==", vec![b.int(2)]),
                            Some(b.next(None)),
                            None,
                        ),
                        b.call(b.lvar("log", 1), "<<", vec![b.lvar("i", 0)]),
                    ])),
                    Some(b.call(b.lvar("log", 1), "<<", vec![b.sym("e")])),
                ),
            ])),
        ),
        b.lvar("log", 1),
    ]);
    let e = s.sym("e");
    let expected = Value::array(vec![Value::Fixnum(1), e.clone(), e.clone(), Value::Fixnum(3), e]);
    assert_eq!(s.run(&program), expected);
}

#[test]
fn ensure_runs_once_per_pass_when_redo_passes_through() {
    let mut s = Session::new();
    let b = s.builder();
    // i = 0; runs = 0
    // while i < 1; begin; i += 1; redo if i == 1; ensure; runs += 1; end; end
    // [i, runs]
    let program = b.block(vec![
        b.lasgn("i", 0, b.int(0)),
        b.lasgn("runs", 1, b.int(0)),
        b.while_(
            b.call(b.lvar("i", 0), "<", vec![b.int(1)]),
            Some(b.ensure(
                Some(b.block(vec![
                    incr(&b, "i", 0, b.int(1)),
                    b.if_(
                        b.call(b.lvar("i", 0), "==", vec![b.int(1)]),
                        Some(b.redo()),
                        None,
                    ),
                ])),
                Some(incr(&b, "runs", 1, b.int(1))),
            )),
        ),
        b.array(vec![b.lvar("i", 0), b.lvar("runs", 1)]),
    ]);
    assert_eq!(s.run(&program), ints(&[2, 2]));
}

#[test]
fn ensure_value_is_discarded() {
    let mut s = Session::new();
    let b = s.builder();
    let program = b.ensure(Some(b.int(1)), Some(b.int(2)));
    assert_eq!(s.run(&program), Value::Fixnum(1));
}

#[test]
fn logic_operators_short_circuit() {
    let mut s = Session::new();
    let b = s.builder();
    let program = b.array(vec![
        b.and(b.nil(), b.fcall("raise", vec![b.str("unreached")])),
        b.or(b.int(1), b.fcall("raise", vec![b.str("unreached")])),
        b.not(b.false_()),
        b.and(b.int(1), b.int(2)),
    ]);
    assert_eq!(
        s.run(&program),
        Value::array(vec![Value::Nil, Value::Fixnum(1), Value::Bool(true), Value::Fixnum(2)])
    );
}

#[test]
fn interpolation_converts_with_to_s() {
    let mut s = Session::new();
    let b = s.builder();
    let program = b.dstr(vec![
        b.str("n="),
        b.int(4),
        b.str(" f="),
        b.float(1.5),
        b.str(" nil="),
        b.nil(),
        b.str(" sym="),
        b.sym("k"),
    ]);
    assert_eq!(s.run(&program), Value::str("n=4 f=1.5 nil= sym=k"));
}

#[test]
fn top_level_return_ends_the_program() {
    let mut s = Session::new();
    let b = s.builder();
    let program = b.block(vec![
        b.return_(Some(b.int(5))),
        b.fcall("raise", vec![b.str("unreached")]),
    ]);
    assert_eq!(s.run(&program), Value::Fixnum(5));
}

#[test]
fn stray_signals_are_local_jump_errors() {
    let mut s = Session::new();
    let b = s.builder();
    for (program, message) in [
        (b.break_(None), "unexpected break"),
        (b.next(None), "unexpected next"),
        (b.retry(), "retry outside of rescue"),
    ] {
        let err = s.run_err(&program);
        assert_eq!(err.exception_class(), "LocalJumpError");
        assert_eq!(err.message, message);
    }
}

#[test]
fn puts_flattens_arrays() {
    let mut s = Session::new();
    let b = s.builder();
    let program = b.block(vec![
        b.fcall("puts", vec![b.int(1), b.array(vec![b.str("a"), b.array(vec![b.nil()])])]),
        b.fcall("puts", vec![]),
        b.fcall("print", vec![b.str("x"), b.sym("y")]),
        b.fcall("p", vec![b.str("q")]),
    ]);
    s.run(&program);
    assert_eq!(s.output(), "1\na\n\n\nxy\"q\"\n");
}
