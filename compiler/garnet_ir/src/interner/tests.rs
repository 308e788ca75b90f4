use super::*;
use pretty_assertions::assert_eq;

#[test]
fn interning_is_idempotent() {
    let table = SymbolTable::new();
    let each = table.intern("each_slice");
    let map = table.intern("map!");
    assert_eq!(table.intern("each_slice"), each);
    assert_ne!(each, map);
    assert_eq!(table.lookup(map), "map!");
}

#[test]
fn empty_name_is_reserved() {
    let table = SymbolTable::new();
    assert_eq!(table.intern(""), Name::EMPTY);
    assert_eq!(table.lookup(Name::EMPTY), "");
}

#[test]
fn prelude_names_are_already_present() {
    let table = SymbolTable::new();
    let before = table.len();
    for name in PRELUDE {
        table.intern(name);
    }
    assert_eq!(table.len(), before);
    assert_eq!(before, PRELUDE.len() + 1);
    assert!(!table.is_empty());
}

#[test]
fn foreign_names_read_as_empty() {
    let table = SymbolTable::new();
    assert_eq!(table.lookup(Name::new(15, Name::MAX_LOCAL)), "");
}

#[test]
fn threads_agree_on_new_symbols() {
    let table = SharedInterner::new();
    let names: Vec<Name> = (0..4)
        .map(|_| {
            let table = table.clone();
            std::thread::spawn(move || table.intern("@shared"))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();
    assert!(names.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(table.lookup(names[0]), "@shared");
}

#[test]
fn lookup_through_the_trait() {
    fn quoted(lookup: &impl SymbolLookup, name: Name) -> String {
        format!("`{}'", lookup.lookup(name))
    }
    let table = SymbolTable::new();
    assert_eq!(quoted(&table, table.intern("puts")), "`puts'");
}
