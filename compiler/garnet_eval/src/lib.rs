//! Garnet Eval - the evaluation core of the Garnet runtime.
//!
//! An AST-walking evaluator for a Ruby-like language with open classes,
//! mixins, blocks and non-local control flow.
//!
//! # Architecture
//!
//! - [`Runtime`]: state shared by every evaluator thread (interner, class
//!   hierarchy, globals, method cache, output)
//! - [`Interpreter`]: one evaluator thread; owns the frame, scope and
//!   backtrace stacks
//! - [`DynamicMethod`]: method-table entries (interpreted, native,
//!   compiled, undefined) invoked through a single call protocol
//! - [`CallSite`]: the per-call-expression inline cache, validated
//!   against the global [`MethodCache`]
//! - [`Block`]: closures over a frame copy and a shared [`DynamicScope`]
//!
//! Exceptions and the `return`/`break`/`next`/`redo`/`retry` signals all
//! travel as [`ControlAction`] through `Result`.

pub mod ast;
pub mod block;
mod builtins;
pub mod call_site;
pub mod context;
pub mod diagnostics;
pub mod errors;
pub mod eval_mode;
pub mod frame;
pub mod interpreter;
pub mod method;
pub mod method_cache;
pub mod module;
mod names;
pub mod print_handler;
pub mod runtime;
pub mod scope;
pub mod thread;
pub mod value;

use std::sync::Once;

pub use ast::AstBuilder;
pub use block::{Block, BlockKind};
pub use call_site::{CallSite, CallSiteStats};
pub use context::{Cref, EvalContext};
pub use diagnostics::{BacktraceFrame, EvalBacktrace};
pub use errors::{ControlAction, EvalError, EvalErrorKind, EvalResult, LocalJumpReason};
pub use eval_mode::EvalMode;
pub use frame::Frame;
pub use interpreter::{Interpreter, InterpreterBuilder, Lookup, MissingReason};
pub use method::{
    CallConfiguration, CompiledBody, CompiledMethod, DynamicMethod, MethodCompiler, MethodRef,
};
pub use method_cache::{CacheStats, MethodCache};
pub use module::{ModuleRef, RModule};
pub use print_handler::{
    buffer_handler, silent_handler, stdout_handler, PrintHandler, SharedPrintHandler,
};
pub use runtime::{CoreClasses, JitPolicy, Runtime};
pub use scope::DynamicScope;
pub use thread::{InterruptHandle, ThreadEvent};
pub use value::{RArray, RObject, RProc, Value};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Call this once at startup. Safe to call multiple times.
/// Enable with `RUST_LOG=garnet_eval=debug` or `RUST_LOG=garnet_eval=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

#[cfg(test)]
mod tests;
