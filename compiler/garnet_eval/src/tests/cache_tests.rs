//! Inline caches at call sites and their invalidation.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use super::{ints, Session};
use crate::ast::{ArgsDecl, NodeKind, NodeRef};
use crate::call_site::{CallSite, CallSiteStats};
use crate::{AstBuilder, Value};

fn site_of(node: &NodeRef) -> Arc<CallSite> {
    match &node.kind {
        NodeKind::Call { site, .. } | NodeKind::FCall { site, .. } => site.clone(),
        other => panic!("not a call: {other:?}"),
    }
}

/// `class <name> (< superclass); def m; <value>; end; end`
fn class_with_m(b: &AstBuilder, name: &str, superclass: Option<&str>, value: i64) -> NodeRef {
    b.class_(
        b.cpath(name),
        superclass.map(|s| b.const_(s)),
        Some(b.defn("m", ArgsDecl::default(), Some(b.int(value)), b.local_scope(&[]))),
        b.local_scope(&[]),
    )
}

#[test]
fn second_call_hits_the_cache() {
    let mut s = Session::new();
    let b = s.builder();
    let call = b.call(b.lvar("o", 0), "m", vec![]);
    let program = b.block(vec![
        class_with_m(&b, "Foo", None, 1),
        b.lasgn("o", 0, b.call(b.const_("Foo"), "new", vec![])),
        call.clone(),
        call.clone(),
    ]);
    assert_eq!(s.run(&program), Value::Fixnum(1));

    let site = site_of(&call);
    assert!(site.is_cached());
    assert_eq!(site.stats(), CallSiteStats { hits: 1, misses: 1 });
}

#[test]
fn redefinition_clears_the_site() {
    let mut s = Session::new();
    let b = s.builder();
    let call = b.call(b.lvar("o", 0), "m", vec![]);
    let program = b.block(vec![
        class_with_m(&b, "Foo", None, 1),
        b.lasgn("o", 0, b.call(b.const_("Foo"), "new", vec![])),
        b.lasgn("r", 1, b.array(vec![call.clone()])),
        class_with_m(&b, "Foo", None, 2),
        b.call(b.lvar("r", 1), "push", vec![call.clone()]),
    ]);
    assert_eq!(s.run(&program), ints(&[1, 2]));
    assert_eq!(site_of(&call).stats(), CallSiteStats { hits: 0, misses: 2 });
}

#[test]
fn subclass_definition_shadows_the_cached_method() {
    let mut s = Session::new();
    let b = s.builder();
    let call = b.call(b.lvar("o", 0), "m", vec![]);
    // The subclass exists before the first call; its own `m` comes later.
    let program = b.block(vec![
        class_with_m(&b, "Base", None, 1),
        b.class_(b.cpath("Kid"), Some(b.const_("Base")), None, b.local_scope(&[])),
        b.lasgn("o", 0, b.call(b.const_("Kid"), "new", vec![])),
        b.lasgn("r", 1, b.array(vec![call.clone()])),
        class_with_m(&b, "Kid", None, 5),
        b.call(b.lvar("r", 1), "push", vec![call.clone()]),
    ]);
    assert_eq!(s.run(&program), ints(&[1, 5]));
}

#[test]
fn include_clears_sites_of_shadowed_methods() {
    let mut s = Session::new();
    let b = s.builder();
    let call = b.call(b.lvar("o", 0), "m", vec![]);
    let program = b.block(vec![
        b.module_(
            b.cpath("Loud"),
            Some(b.defn("m", ArgsDecl::default(), Some(b.int(3)), b.local_scope(&[]))),
            b.local_scope(&[]),
        ),
        class_with_m(&b, "Base", None, 1),
        b.class_(b.cpath("Kid"), Some(b.const_("Base")), None, b.local_scope(&[])),
        b.lasgn("o", 0, b.call(b.const_("Kid"), "new", vec![])),
        b.lasgn("r", 1, b.array(vec![call.clone()])),
        b.call(b.const_("Kid"), "include", vec![b.const_("Loud")]),
        b.call(b.lvar("r", 1), "push", vec![call.clone()]),
    ]);
    let before = s.interp.runtime().method_cache().stats();
    assert_eq!(s.run(&program), ints(&[1, 3]));

    let after = s.interp.runtime().method_cache().stats();
    assert_eq!(after.module_includes - before.module_includes, 1);
    assert_eq!(after.module_triggered_removes - before.module_triggered_removes, 1);
    assert_eq!(site_of(&call).stats().misses, 2);
}

#[test]
fn different_receiver_class_replaces_the_entry() {
    let mut s = Session::new();
    let b = s.builder();
    let inner = b.call(b.lvar("o", 0), "m", vec![]);
    let call_m = |class: &str| b.fcall("call_m", vec![b.call(b.const_(class), "new", vec![])]);
    let program = b.block(vec![
        class_with_m(&b, "A", None, 1),
        class_with_m(&b, "B", None, 2),
        b.defn("call_m", b.required_args(&["o"]), Some(inner.clone()), b.local_scope(&["o"])),
        b.array(vec![call_m("A"), call_m("A"), call_m("B"), call_m("A")]),
    ]);
    assert_eq!(s.run(&program), ints(&[1, 1, 2, 1]));
    assert_eq!(site_of(&inner).stats(), CallSiteStats { hits: 1, misses: 3 });
}

#[test]
fn protected_calls_are_not_cached() {
    let mut s = Session::new();
    let b = s.builder();
    let inner = b.call(b.lvar("other", 0), "secret", vec![]);
    let program = b.block(vec![
        b.class_(
            b.cpath("Vault"),
            None,
            Some(b.block(vec![
                b.defn(
                    "peek",
                    b.required_args(&["other"]),
                    Some(inner.clone()),
                    b.local_scope(&["other"]),
                ),
                b.fcall("protected", vec![]),
                b.defn("secret", ArgsDecl::default(), Some(b.int(9)), b.local_scope(&[])),
            ])),
            b.local_scope(&[]),
        ),
        b.call(
            b.call(b.const_("Vault"), "new", vec![]),
            "peek",
            vec![b.call(b.const_("Vault"), "new", vec![])],
        ),
    ]);
    assert_eq!(s.run(&program), Value::Fixnum(9));
    assert!(!site_of(&inner).is_cached());
}

#[test]
fn method_missing_results_are_not_cached() {
    let mut s = Session::new();
    let b = s.builder();
    let call = b.call(b.nil(), "nope", vec![]);
    let program = b.rescue(
        Some(call.clone()),
        vec![b.rescue_clause(vec![b.const_("NoMethodError")], None, Some(b.sym("missed")))],
        None,
    );
    assert_eq!(s.run(&program), s.sym("missed"));
    assert!(!site_of(&call).is_cached());
}
