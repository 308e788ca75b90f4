//! The symbol table: every identifier and symbol the evaluator sees.
//!
//! One table is shared by all evaluator threads attached to a runtime.
//! It is split into [`Name::NUM_SHARDS`] independently locked shards
//! and the common case (the name already exists) only takes a read lock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use super::Name;

/// Method and variable names dispatched on by the evaluator itself.
const PRELUDE: &[&str] = &[
    "initialize",
    "method_missing",
    "method_added",
    "singleton_method_added",
    "respond_to?",
    "each",
    "call",
    "new",
    "to_s",
    "to_a",
    "to_ary",
    "to_proc",
    "inspect",
    "message",
    "==",
    "===",
    "!=",
    "<=>",
    "+",
    "-",
    "*",
    "/",
    "<",
    ">",
    "[]",
    "[]=",
    "$!",
    "main",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbolTableError {
    #[error("symbol table shard {shard} is full ({count} symbols)")]
    ShardFull { shard: usize, count: usize },
}

#[derive(Default)]
struct Shard {
    ids: FxHashMap<&'static str, u32>,
    text: Vec<&'static str>,
}

impl Shard {
    fn get(&self, s: &str) -> Option<u32> {
        self.ids.get(s).copied()
    }

    fn push(&mut self, shard: usize, s: &str) -> Result<u32, SymbolTableError> {
        let full = || SymbolTableError::ShardFull {
            shard,
            count: self.text.len(),
        };
        let local = u32::try_from(self.text.len()).map_err(|_| full())?;
        if local > Name::MAX_LOCAL {
            return Err(full());
        }
        // Symbols are never collected.
        let text: &'static str = Box::leak(s.to_owned().into_boxed_str());
        self.text.push(text);
        self.ids.insert(text, local);
        Ok(local)
    }
}

/// Maps identifier text to [`Name`] and back.
///
/// Symbol text is leaked, so [`SymbolTable::lookup`] returns a
/// `&'static str` that outlives every lock guard.
pub struct SymbolTable {
    shards: [RwLock<Shard>; Name::NUM_SHARDS],
    count: AtomicUsize,
}

impl SymbolTable {
    pub fn new() -> Self {
        let table = Self {
            shards: std::array::from_fn(|_| RwLock::new(Shard::default())),
            count: AtomicUsize::new(0),
        };
        // `Name::EMPTY` is slot 0 of shard 0.
        table.shards[0].write().text.push("");
        table.shards[0].write().ids.insert("", 0);
        table.count.store(1, Ordering::Relaxed);
        for name in PRELUDE {
            table.intern(name);
        }
        table
    }

    /// Shard choice only looks at a short prefix; names that share one
    /// still spread across the shard's hash map.
    fn shard_of(s: &str) -> u32 {
        let hash = s
            .bytes()
            .take(8)
            .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(u32::from(b)));
        #[expect(
            clippy::cast_possible_truncation,
            reason = "NUM_SHARDS is 16, so the modulus fits in u32"
        )]
        let shards = Name::NUM_SHARDS as u32;
        hash % shards
    }

    pub fn try_intern(&self, s: &str) -> Result<Name, SymbolTableError> {
        let shard = Self::shard_of(s);
        let lock = &self.shards[shard as usize];
        if let Some(local) = lock.read().get(s) {
            return Ok(Name::new(shard, local));
        }
        let mut guard = lock.write();
        if let Some(local) = guard.get(s) {
            return Ok(Name::new(shard, local));
        }
        let local = guard.push(shard as usize, s)?;
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(Name::new(shard, local))
    }

    /// # Panics
    /// Panics when a shard runs out of its 28-bit index space.
    #[inline]
    pub fn intern(&self, s: &str) -> Name {
        self.try_intern(s).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Text of `name`; empty for names this table never produced.
    pub fn lookup(&self, name: Name) -> &'static str {
        self.shards[name.shard()]
            .read()
            .text
            .get(name.local())
            .copied()
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }

    /// True when nothing but the empty name is present.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything that can turn a [`Name`] back into text.
pub trait SymbolLookup {
    fn lookup(&self, name: Name) -> &str;
}

impl SymbolLookup for SymbolTable {
    fn lookup(&self, name: Name) -> &str {
        SymbolTable::lookup(self, name)
    }
}

/// The symbol table of one runtime, shared by its threads.
#[derive(Clone, Default)]
pub struct SharedInterner(Arc<SymbolTable>);

impl SharedInterner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::ops::Deref for SharedInterner {
    type Target = SymbolTable;

    fn deref(&self) -> &SymbolTable {
        &self.0
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
