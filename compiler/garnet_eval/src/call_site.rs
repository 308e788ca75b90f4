//! Per-call-expression inline caches.
//!
//! A `CallSite` is either uncached or caches one `(receiver class, method)`
//! pair. The hot path compares the receiver's class id against the cached
//! one and invokes directly; everything else goes through full resolution
//! and, when the result is cacheable, registration with the
//! [`MethodCache`](crate::MethodCache). Invalidation is pushed by the
//! method cache; a site never re-validates on its own.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use garnet_ir::{CallType, Name};
use parking_lot::RwLock;

use crate::block::Block;
use crate::errors::{local_jump, ControlAction, EvalResult, LocalJumpReason};
use crate::interpreter::Lookup;
use crate::method::MethodRef;
use crate::module::RModule;
use crate::value::Value;
use crate::Interpreter;

#[derive(Clone)]
struct CacheEntry {
    class_id: u64,
    method: MethodRef,
}

/// Hit/miss counters of one site.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CallSiteStats {
    pub hits: u64,
    pub misses: u64,
}

pub struct CallSite {
    name: Name,
    call_type: CallType,
    cache: RwLock<Option<CacheEntry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CallSite {
    pub fn new(name: Name, call_type: CallType) -> Arc<Self> {
        Arc::new(Self {
            name,
            call_type,
            cache: RwLock::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        })
    }

    pub fn name(&self) -> Name {
        self.name
    }

    pub fn call_type(&self) -> CallType {
        self.call_type
    }

    /// The cached method, if the cache holds an entry for `class`.
    pub fn cached_method(&self, class: &RModule) -> Option<MethodRef> {
        let cache = self.cache.read();
        match &*cache {
            Some(entry) if entry.class_id == class.id() => Some(entry.method.clone()),
            _ => None,
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.read().is_some()
    }

    /// Drop the cached entry.
    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }

    pub(crate) fn store(&self, class_id: u64, method: MethodRef) {
        *self.cache.write() = Some(CacheEntry { class_id, method });
    }

    pub fn stats(&self) -> CallSiteStats {
        CallSiteStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Dispatch `name` on `receiver`.
    pub fn call(
        self: &Arc<Self>,
        interp: &mut Interpreter,
        receiver: &Value,
        args: &[Value],
        block: &Block,
    ) -> EvalResult {
        let class = interp.runtime().class_of(receiver);

        if let Some(method) = self.cached_method(&class) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return self.finish(interp.invoke_method(&method, receiver, self.name, args, block));
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let generation = interp.runtime().method_cache().generation();
        match interp.resolve_method(&class, self.name, self.call_type) {
            Lookup::Found { method, cacheable } => {
                if cacheable {
                    interp
                        .runtime()
                        .method_cache()
                        .register(&method, self, class.id(), generation);
                }
                self.finish(interp.invoke_method(&method, receiver, self.name, args, block))
            }
            Lookup::Missing(reason) => self.finish(interp.call_method_missing(
                receiver, self.name, args, block, reason,
            )),
        }
    }

    /// Dispatch with a literal block: a `break` raised by that block
    /// terminates this call with the break's value.
    pub fn call_iter(
        self: &Arc<Self>,
        interp: &mut Interpreter,
        receiver: &Value,
        args: &[Value],
        block: &Block,
    ) -> EvalResult {
        let Some(id) = block.id() else {
            return self.call(interp, receiver, args, block);
        };
        interp.enter_block_call(id);
        let result = self.call(interp, receiver, args, block);
        interp.exit_block_call(id);
        match result {
            Err(ControlAction::Break {
                target: Some(target),
                value,
            }) if target == id => Ok(value),
            other => other,
        }
    }

    fn finish(&self, result: EvalResult) -> EvalResult {
        match result {
            Err(ControlAction::Retry) => Err(local_jump(LocalJumpReason::Retry).into()),
            other => other,
        }
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("name", &self.name)
            .field("call_type", &self.call_type)
            .field("cached", &self.is_cached())
            .finish()
    }
}
