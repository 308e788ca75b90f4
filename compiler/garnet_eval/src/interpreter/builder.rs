//! `InterpreterBuilder` for creating Interpreter instances with various configurations.

use std::sync::Arc;

use super::Interpreter;
use crate::eval_mode::EvalMode;
use crate::method::MethodCompiler;
use crate::print_handler::SharedPrintHandler;
use crate::runtime::{JitPolicy, Runtime};

/// Builder for creating Interpreter instances with various configurations.
///
/// Without an explicit runtime a fresh one is booted at `build()`; pass
/// [`InterpreterBuilder::runtime`] to start another thread of an existing
/// program. Runtime-level settings (print handler, JIT policy) are ignored
/// when a runtime is supplied.
#[derive(Default)]
pub struct InterpreterBuilder {
    mode: EvalMode,
    max_call_depth: Option<usize>,
    jit_threshold: Option<u32>,
    method_compiler: Option<Arc<dyn MethodCompiler>>,
    print_handler: Option<SharedPrintHandler>,
    runtime: Option<Arc<Runtime>>,
}

impl InterpreterBuilder {
    /// Create a new builder with default `Interpret` mode.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the evaluation mode.
    ///
    /// Controls the default recursion limit and output destination.
    #[must_use]
    pub fn mode(mut self, mode: EvalMode) -> Self {
        self.mode = mode;
        self
    }

    /// Override the mode's call depth limit.
    #[must_use]
    pub fn max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = Some(depth);
        self
    }

    /// Invocations of an interpreted method before it is offered to the
    /// method compiler.
    #[must_use]
    pub fn jit_threshold(mut self, threshold: u32) -> Self {
        self.jit_threshold = Some(threshold);
        self
    }

    #[must_use]
    pub fn method_compiler(mut self, compiler: Arc<dyn MethodCompiler>) -> Self {
        self.method_compiler = Some(compiler);
        self
    }

    /// Set the print handler for `puts`/`print`/`p`.
    ///
    /// Default is stdout for `Interpret` mode, a buffer for `TestRun`.
    #[must_use]
    pub fn print_handler(mut self, handler: SharedPrintHandler) -> Self {
        self.print_handler = Some(handler);
        self
    }

    /// Share an already booted runtime.
    #[must_use]
    pub fn runtime(mut self, runtime: Arc<Runtime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn build(self) -> Interpreter {
        let mode = self.mode;
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => {
                let handler = self
                    .print_handler
                    .unwrap_or_else(|| mode.default_print_handler());
                let jit = JitPolicy {
                    threshold: self.jit_threshold.unwrap_or(JitPolicy::DEFAULT_THRESHOLD),
                    compiler: self.method_compiler,
                };
                Runtime::new(handler, jit)
            }
        };
        let depth = self
            .max_call_depth
            .unwrap_or_else(|| mode.max_recursion_depth());
        tracing::debug!(?mode, depth, "interpreter built");
        Interpreter::with_runtime(runtime, mode, depth)
    }
}
