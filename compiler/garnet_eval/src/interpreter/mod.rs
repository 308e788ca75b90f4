//! Tree-walking evaluator.
//!
//! One `Interpreter` is one evaluator thread: it owns the frame stack,
//! scope stack, backtrace stack and depth counter, and shares everything
//! else (classes, globals, method cache) through an `Arc<Runtime>`.
//!
//! # Layout
//!
//! - `eval` - node dispatch, error annotation
//! - `invoke` - the method call protocol for every method variant
//! - `dispatch` - method resolution, visibility, `method_missing`
//! - `calls` - argument lists, block arguments, `super`
//! - `blocks` - yield, closures, break/next/return out of blocks
//! - `variables` - locals, ivars, globals, class vars, constants, masgn
//! - `definitions` - `def`, `class`, `module`, `alias`, `undef`
//! - `rescue` - `rescue`/`ensure`/`retry`
//! - `loops` - `while`/`until`/`for`/`case`
//!
//! # Activation records
//!
//! Every push onto the frame/scope/backtrace stacks goes through
//! [`Interpreter::activate`], which returns a guard that pops in reverse
//! order on drop, so every exit path, non-local jumps included, leaves
//! the stacks balanced.

mod blocks;
mod builder;
mod calls;
mod definitions;
mod dispatch;
mod eval;
mod invoke;
mod loops;
mod rescue;
mod scope_guard;
mod variables;

pub use builder::InterpreterBuilder;
pub use dispatch::{Lookup, MissingReason};
pub(crate) use scope_guard::Activation;

use std::sync::Arc;

use garnet_ir::{SourcePosition, StaticScope, Visibility};
use garnet_stack::CallDepth;

use crate::block::BlockId;
use crate::context::{Cref, EvalContext};
use crate::diagnostics::{CallStack, EvalBacktrace};
use crate::errors::{interrupted, thread_killed, ControlAction};
use crate::eval_mode::EvalMode;
use crate::frame::{Frame, FrameStack};
use crate::runtime::Runtime;
use crate::scope::{DynamicScope, ScopeStack};
use crate::thread::{InterruptHandle, ThreadEvent};
use crate::value::Value;

pub struct Interpreter {
    pub(crate) runtime: Arc<Runtime>,
    pub(crate) mode: EvalMode,
    pub(crate) frames: FrameStack,
    pub(crate) scopes: ScopeStack,
    /// Lexical context of the code being evaluated.
    pub(crate) context: EvalContext,
    pub(crate) call_stack: CallStack,
    pub(crate) depth: CallDepth,
    /// Position of the node being evaluated.
    pub(crate) position: SourcePosition,
    /// `$!`.
    pub(crate) current_exception: Value,
    /// Blocks whose receiving call is still running on this thread; a
    /// `break` from one of them unwinds to that call.
    pub(crate) active_block_calls: Vec<BlockId>,
    pub(crate) events: InterruptHandle,
    /// Why the last dispatch fell through to `method_missing`.
    pub(crate) last_missing_reason: MissingReason,
}

impl Interpreter {
    pub fn builder() -> InterpreterBuilder {
        InterpreterBuilder::new()
    }

    pub(crate) fn with_runtime(runtime: Arc<Runtime>, mode: EvalMode, max_depth: usize) -> Self {
        let root_frame = Frame::for_body(runtime.main().clone(), Visibility::Private);
        let root_scope = DynamicScope::new(StaticScope::local(Vec::new()), None);
        let context = EvalContext::new(Cref::root(runtime.core().object.clone()));
        Self {
            runtime,
            mode,
            frames: FrameStack::new(root_frame),
            scopes: ScopeStack::new(root_scope),
            context,
            call_stack: CallStack::new(),
            depth: CallDepth::new(Some(max_depth)),
            position: SourcePosition::default(),
            current_exception: Value::Nil,
            active_block_calls: Vec::new(),
            events: InterruptHandle::new(),
            last_missing_reason: MissingReason::Normal,
        }
    }

    /// A new evaluator thread sharing this one's runtime.
    #[must_use]
    pub fn spawn_thread(&self) -> Self {
        let limit = self.depth.limit().unwrap_or_else(|| self.mode.max_recursion_depth());
        Self::with_runtime(self.runtime.clone(), self.mode, limit)
    }

    pub fn runtime(&self) -> &Arc<Runtime> {
        &self.runtime
    }

    pub fn mode(&self) -> EvalMode {
        self.mode
    }

    /// Handle other threads use to interrupt or kill this one.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.events.clone()
    }

    pub fn current_frame(&self) -> &Frame {
        self.frames.current()
    }

    pub fn current_self(&self) -> &Value {
        self.frames.current().self_value()
    }

    pub fn position(&self) -> SourcePosition {
        self.position
    }

    /// `$!`.
    pub fn current_exception(&self) -> &Value {
        &self.current_exception
    }

    /// Local slot `index` of the innermost scope. Compiled bodies read
    /// their bound arguments through this.
    pub fn local(&self, index: usize) -> Value {
        self.scopes.current().get(index, 0)
    }

    pub fn set_local(&self, index: usize, value: Value) {
        self.scopes.current().set(index, 0, value);
    }

    /// Snapshot of this thread's call stack.
    pub fn backtrace(&self) -> EvalBacktrace {
        self.call_stack.capture(self.position, self.runtime.interner())
    }

    /// Number of live method activations.
    pub fn call_depth(&self) -> usize {
        self.depth.current()
    }

    /// Consume one pending thread event, turning it into the error it
    /// raises.
    pub(crate) fn poll_events(&mut self) -> Result<(), ControlAction> {
        match self.events.take() {
            None => Ok(()),
            Some(ThreadEvent::Interrupt(message)) => {
                tracing::debug!(%message, "thread interrupted");
                Err(interrupted(message).into())
            }
            Some(ThreadEvent::Kill) => {
                tracing::debug!("thread killed");
                Err(thread_killed().into())
            }
        }
    }

    pub(crate) fn enter_block_call(&mut self, id: BlockId) {
        self.active_block_calls.push(id);
    }

    pub(crate) fn exit_block_call(&mut self, id: BlockId) {
        if let Some(pos) = self.active_block_calls.iter().rposition(|b| *b == id) {
            self.active_block_calls.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests;
