//! Pre-interned names for hot-path dispatch.
//!
//! Interned once when the runtime boots so that the evaluator compares
//! `Name`s (`u32 == u32`) instead of hashing strings on every hook call,
//! coercion or case comparison.

use garnet_ir::{Name, SymbolTable};

#[derive(Clone, Copy)]
pub(crate) struct KnownNames {
    pub(crate) initialize: Name,
    pub(crate) method_missing: Name,
    pub(crate) method_added: Name,
    pub(crate) singleton_method_added: Name,
    pub(crate) new: Name,
    pub(crate) to_s: Name,
    pub(crate) to_a: Name,
    pub(crate) to_ary: Name,
    pub(crate) to_proc: Name,
    pub(crate) inspect: Name,
    pub(crate) message: Name,
    pub(crate) exception: Name,
    pub(crate) eq: Name,
    pub(crate) eqq: Name,
    pub(crate) current_exception: Name,
    pub(crate) ivar_message: Name,
    pub(crate) ivar_backtrace: Name,
}

impl KnownNames {
    pub(crate) fn new(interner: &SymbolTable) -> Self {
        Self {
            initialize: interner.intern("initialize"),
            method_missing: interner.intern("method_missing"),
            method_added: interner.intern("method_added"),
            singleton_method_added: interner.intern("singleton_method_added"),
            new: interner.intern("new"),
            to_s: interner.intern("to_s"),
            to_a: interner.intern("to_a"),
            to_ary: interner.intern("to_ary"),
            to_proc: interner.intern("to_proc"),
            inspect: interner.intern("inspect"),
            message: interner.intern("message"),
            exception: interner.intern("exception"),
            eq: interner.intern("=="),
            eqq: interner.intern("==="),
            current_exception: interner.intern("$!"),
            ivar_message: interner.intern("@message"),
            ivar_backtrace: interner.intern("@__backtrace"),
        }
    }
}
