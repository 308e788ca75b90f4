use super::*;
use garnet_ir::{Arity, CallType, SymbolTable, Visibility};
use pretty_assertions::assert_eq;

use crate::method::NativeFn;
use crate::module::{ModuleKind, RModule};
use crate::value::Value;

struct Fixture {
    interner: SymbolTable,
    class: ModuleRef,
}

impl Fixture {
    fn new() -> Self {
        Self {
            interner: SymbolTable::new(),
            class: RModule::new(ModuleKind::Class, Some("Widget"), None),
        }
    }

    fn method(&self) -> MethodRef {
        let func: NativeFn = Arc::new(|_, _, _, _| Ok(Value::Nil));
        Arc::new(DynamicMethod::native(&self.class, Visibility::Public, Arity::optional(), func))
    }

    fn site(&self, name: &str) -> Arc<CallSite> {
        CallSite::new(self.interner.intern(name), CallType::Normal)
    }

    fn cache(&self, cache: &MethodCache, method: &MethodRef, site: &Arc<CallSite>) {
        assert!(cache.register(method, site, self.class.id(), cache.generation()));
    }
}

#[test]
fn remove_clears_only_the_methods_sites() {
    let fx = Fixture::new();
    let cache = MethodCache::new();
    let (run, stop) = (fx.method(), fx.method());
    let (a, b, c) = (fx.site("run"), fx.site("run"), fx.site("stop"));
    fx.cache(&cache, &run, &a);
    fx.cache(&cache, &run, &b);
    fx.cache(&cache, &stop, &c);
    assert_eq!(cache.registered_sites(), 3);

    assert_eq!(cache.remove(&run), 2);
    assert!(!a.is_cached());
    assert!(!b.is_cached());
    assert!(c.is_cached());
    assert_eq!(cache.stats().removes, 2);
}

#[test]
fn registering_twice_keeps_one_entry() {
    let fx = Fixture::new();
    let cache = MethodCache::new();
    let run = fx.method();
    let site = fx.site("run");
    fx.cache(&cache, &run, &site);
    cache.add(&run, &site);
    assert_eq!(cache.registered_sites(), 1);
    assert_eq!(cache.stats().adds, 2);
}

#[test]
fn stale_generation_is_not_stored() {
    let fx = Fixture::new();
    let cache = MethodCache::new();
    let run = fx.method();
    let site = fx.site("run");
    let generation = cache.generation();
    cache.flush();
    assert!(!cache.register(&run, &site, fx.class.id(), generation));
    assert!(!site.is_cached());
    assert_eq!(cache.registered_sites(), 0);
}

#[test]
fn invalidate_by_name() {
    let fx = Fixture::new();
    let cache = MethodCache::new();
    let (first, second, other) = (fx.method(), fx.method(), fx.method());
    let (a, b, c) = (fx.site("to_s"), fx.site("to_s"), fx.site("size"));
    fx.cache(&cache, &first, &a);
    fx.cache(&cache, &second, &b);
    fx.cache(&cache, &other, &c);

    assert_eq!(cache.invalidate_name(fx.interner.intern("to_s")), 2);
    assert!(c.is_cached());
    assert_eq!(cache.invalidate_name(fx.interner.intern("missing")), 0);
}

#[test]
fn dropped_sites_are_skipped() {
    let fx = Fixture::new();
    let cache = MethodCache::new();
    let run = fx.method();
    let site = fx.site("run");
    fx.cache(&cache, &run, &site);
    drop(site);
    assert_eq!(cache.registered_sites(), 0);
    assert_eq!(cache.remove(&run), 0);
}

#[test]
fn include_clears_shadowed_methods() {
    let fx = Fixture::new();
    let cache = MethodCache::new();
    let name = fx.interner.intern("greet");

    let base = RModule::new(ModuleKind::Class, Some("Base"), None);
    let func: NativeFn = Arc::new(|_, _, _, _| Ok(Value::Nil));
    let inherited: MethodRef = Arc::new(DynamicMethod::native(
        &base,
        Visibility::Public,
        Arity::optional(),
        func,
    ));
    base.put_method(name, inherited.clone());
    fx.class.set_superclass(Some(base));

    let mixin = RModule::new(ModuleKind::Module, Some("Polite"), None);
    mixin.put_method(name, fx.method());

    let site = fx.site("greet");
    fx.cache(&cache, &inherited, &site);
    assert_eq!(cache.module_included(&fx.class, &mixin), 1);
    assert!(!site.is_cached());

    let stats = cache.stats();
    assert_eq!(stats.module_includes, 1);
    assert_eq!(stats.module_triggered_removes, 1);
}

#[test]
fn flush_clears_everything() {
    let fx = Fixture::new();
    let cache = MethodCache::new();
    let sites: Vec<_> = (0..4).map(|_| fx.site("run")).collect();
    for site in &sites {
        fx.cache(&cache, &fx.method(), site);
    }
    let before = cache.generation();
    assert_eq!(cache.flush(), 4);
    assert!(cache.generation() > before);
    assert!(sites.iter().all(|s| !s.is_cached()));
    assert_eq!(cache.stats().flush_triggered_removes, 4);
}

#[test]
fn lookup_racing_a_definition_is_not_cached() {
    let fx = Fixture::new();
    let cache = MethodCache::new();
    let name = fx.interner.intern("m");
    let base = RModule::new(ModuleKind::Class, Some("Base"), None);
    base.put_method(name, fx.method());
    fx.class.set_superclass(Some(base));
    let site = fx.site("m");

    // Another thread starts resolving before the subclass entry lands and
    // still sees the inherited method.
    let shadow = fx.method();
    let (generation, stale) = cache.install(name, || {
        let generation = cache.generation();
        let stale = fx.class.search_method(name).map(|(method, _)| method);
        fx.class.put_method(name, shadow.clone());
        (generation, stale)
    });
    let stale = stale.unwrap();
    assert!(!Arc::ptr_eq(&stale, &shadow));
    assert!(!cache.register(&stale, &site, fx.class.id(), generation));
    assert!(!site.is_cached());

    let generation = cache.generation();
    let (current, _) = fx.class.search_method(name).unwrap();
    assert!(Arc::ptr_eq(&current, &shadow));
    assert!(cache.register(&current, &site, fx.class.id(), generation));
}

#[test]
fn site_cached_before_a_definition_is_cleared_by_it() {
    let fx = Fixture::new();
    let cache = MethodCache::new();
    let name = fx.interner.intern("m");
    let inherited = fx.method();
    let site = fx.site("m");
    fx.cache(&cache, &inherited, &site);

    cache.install(name, || fx.class.put_method(name, fx.method()));
    assert!(!site.is_cached());
    assert_eq!(cache.registered_sites(), 0);
}
