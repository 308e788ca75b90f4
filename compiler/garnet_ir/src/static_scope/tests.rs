use super::*;
use pretty_assertions::assert_eq;
use crate::SymbolTable;

#[test]
fn resolves_through_block_nesting() {
    let interner = SymbolTable::new();
    let (a, b, c) = (
        interner.intern("a"),
        interner.intern("b"),
        interner.intern("c"),
    );

    let method = StaticScope::local(vec![a, b]);
    let outer_block = StaticScope::block(method.clone(), vec![c]);
    let inner_block = StaticScope::block(outer_block.clone(), vec![]);

    assert_eq!(inner_block.resolve(c), Some((1, 0)));
    assert_eq!(inner_block.resolve(b), Some((2, 1)));
    assert_eq!(method.resolve(c), None);
}

#[test]
fn local_scopes_do_not_see_parents() {
    let interner = SymbolTable::new();
    let x = interner.intern("x");
    let outer = StaticScope::local(vec![x]);
    let class_body = Arc::new(StaticScope {
        kind: ScopeKind::Local,
        variables: vec![],
        parent: Some(outer),
    });
    assert_eq!(class_body.resolve(x), None);
}
