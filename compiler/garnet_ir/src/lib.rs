//! Leaf value types shared by the Garnet evaluator.
//!
//! Everything here is free of evaluator state: interned names, source
//! positions, the static variable table of a scope, and the small pure
//! value types that describe how a method may be called (`Arity`,
//! `Visibility`, `CallType`).

mod arity;
mod call_type;
mod interner;
mod name;
mod position;
mod static_scope;
mod visibility;

pub use arity::{Arity, ArityError};
pub use call_type::CallType;
pub use interner::{SharedInterner, SymbolLookup, SymbolTable, SymbolTableError};
pub use name::{Name, NameKind};
pub use position::{PositionDisplay, SourcePosition};
pub use static_scope::{ScopeKind, StaticScope};
pub use visibility::{Reachability, Visibility};
