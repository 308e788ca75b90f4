//! Registry of which call sites cached which methods.
//!
//! Invalidation is push-based: every mutation of a method table tells the
//! `MethodCache`, which clears exactly the call sites that may now resolve
//! differently. Sites are held weakly; a dropped site is skipped and pruned
//! on the next sweep over its registration.
//!
//! One coarse mutex guards the map. Method tables change first; only then
//! does the invalidator bump the generation counter and take the lock. A
//! site stores a resolution only while holding the lock and seeing the
//! generation it started resolving under, so a resolution computed against
//! a table that changed mid-lookup is never cached.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use garnet_ir::Name;
use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::call_site::CallSite;
use crate::method::{DynamicMethod, MethodId, MethodRef};
use crate::module::ModuleRef;

struct Registration {
    name: Name,
    sites: Vec<Weak<CallSite>>,
}

/// Snapshot of the cache's counters.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub adds: u64,
    pub removes: u64,
    pub module_includes: u64,
    pub module_triggered_removes: u64,
    pub flushes: u64,
    pub flush_triggered_removes: u64,
}

#[derive(Default)]
struct Counters {
    adds: AtomicU64,
    removes: AtomicU64,
    module_includes: AtomicU64,
    module_triggered_removes: AtomicU64,
    flushes: AtomicU64,
    flush_triggered_removes: AtomicU64,
}

fn bump(counter: &AtomicU64, by: usize) {
    counter.fetch_add(by as u64, Ordering::Relaxed);
}

#[derive(Default)]
pub struct MethodCache {
    mappings: Mutex<FxHashMap<MethodId, Registration>>,
    generation: AtomicU64,
    counters: Counters,
}

impl MethodCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current invalidation generation.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn begin_invalidation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Record that `site` cached `method`.
    pub fn add(&self, method: &DynamicMethod, site: &Arc<CallSite>) {
        let mut mappings = self.mappings.lock();
        Self::add_locked(&mut mappings, method.id(), site);
        bump(&self.counters.adds, 1);
    }

    fn add_locked(
        mappings: &mut FxHashMap<MethodId, Registration>,
        method: MethodId,
        site: &Arc<CallSite>,
    ) {
        let registration = mappings.entry(method).or_insert_with(|| Registration {
            name: site.name(),
            sites: Vec::new(),
        });
        registration.sites.retain(|s| s.strong_count() > 0);
        if !registration
            .sites
            .iter()
            .any(|s| std::ptr::eq(s.as_ptr(), Arc::as_ptr(site)))
        {
            registration.sites.push(Arc::downgrade(site));
        }
    }

    /// Register `site` and fill its cache slot, unless the method tables
    /// changed since `generation` was read. Returns whether it was stored.
    pub(crate) fn register(
        &self,
        method: &MethodRef,
        site: &Arc<CallSite>,
        class_id: u64,
        generation: u64,
    ) -> bool {
        let mut mappings = self.mappings.lock();
        if self.generation() != generation {
            return false;
        }
        Self::add_locked(&mut mappings, method.id(), site);
        site.store(class_id, method.clone());
        bump(&self.counters.adds, 1);
        true
    }

    /// Clear every site that cached `method` (redefinition or removal).
    pub fn remove(&self, method: &DynamicMethod) -> usize {
        self.begin_invalidation();
        let cleared = {
            let mut mappings = self.mappings.lock();
            mappings.remove(&method.id()).map_or(0, clear_sites)
        };
        bump(&self.counters.removes, cleared);
        tracing::debug!(cleared, "method cache: removed method");
        cleared
    }

    /// Run `install`, which adds a method called `name` to some table, and
    /// then clear the sites caching any method of that name.
    pub fn install<R>(&self, name: Name, install: impl FnOnce() -> R) -> R {
        let installed = install();
        self.invalidate_name(name);
        installed
    }

    /// Clear every site that cached any method called `name`. Used when a
    /// definition may shadow a method inherited from further up the chain.
    pub fn invalidate_name(&self, name: Name) -> usize {
        self.begin_invalidation();
        let cleared = {
            let mut mappings = self.mappings.lock();
            let ids: Vec<MethodId> = mappings
                .iter()
                .filter(|(_, r)| r.name == name)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| mappings.remove(&id))
                .map(clear_sites)
                .sum()
        };
        bump(&self.counters.removes, cleared);
        if cleared > 0 {
            tracing::debug!(cleared, "method cache: invalidated by name");
        }
        cleared
    }

    /// `included` was just inserted into `target`'s ancestry. For every
    /// method name `included` defines, clear the sites of same-named
    /// methods anywhere in `target`'s chain, since the insertion may now
    /// shadow them.
    pub fn module_included(&self, target: &ModuleRef, included: &ModuleRef) -> usize {
        self.begin_invalidation();
        bump(&self.counters.module_includes, 1);
        let names: FxHashSet<Name> = included.method_names().into_iter().collect();
        let cleared = {
            let mut mappings = self.mappings.lock();
            let mut cleared = 0;
            for module in target.chain() {
                if module.same_origin(included) {
                    continue;
                }
                for name in &names {
                    if let Some(method) = module.method_entry(*name) {
                        cleared += mappings.remove(&method.id()).map_or(0, clear_sites);
                    }
                }
            }
            cleared
        };
        bump(&self.counters.module_triggered_removes, cleared);
        tracing::debug!(
            cleared,
            target = %target.display_name(),
            included = %included.display_name(),
            "method cache: module included"
        );
        cleared
    }

    /// Clear every registered site.
    pub fn flush(&self) -> usize {
        self.begin_invalidation();
        bump(&self.counters.flushes, 1);
        let cleared = {
            let mut mappings = self.mappings.lock();
            mappings.drain().map(|(_, r)| clear_sites(r)).sum()
        };
        bump(&self.counters.flush_triggered_removes, cleared);
        tracing::debug!(cleared, "method cache: flushed");
        cleared
    }

    /// Live sites currently registered.
    pub fn registered_sites(&self) -> usize {
        self.mappings
            .lock()
            .values()
            .flat_map(|r| r.sites.iter())
            .filter(|s| s.strong_count() > 0)
            .count()
    }

    pub fn stats(&self) -> CacheStats {
        let c = &self.counters;
        CacheStats {
            adds: c.adds.load(Ordering::Relaxed),
            removes: c.removes.load(Ordering::Relaxed),
            module_includes: c.module_includes.load(Ordering::Relaxed),
            module_triggered_removes: c.module_triggered_removes.load(Ordering::Relaxed),
            flushes: c.flushes.load(Ordering::Relaxed),
            flush_triggered_removes: c.flush_triggered_removes.load(Ordering::Relaxed),
        }
    }
}

/// Invalidate the live sites of a registration; returns how many.
fn clear_sites(registration: Registration) -> usize {
    let mut cleared = 0;
    for site in registration.sites.iter().filter_map(Weak::upgrade) {
        site.invalidate();
        cleared += 1;
    }
    cleared
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
