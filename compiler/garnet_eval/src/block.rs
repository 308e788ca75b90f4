//! Blocks and closures.
//!
//! A block captures its body together with a duplicated copy of the
//! defining frame, a shared reference to the defining scope and the
//! defining evaluation context. The frame copy makes the block independent
//! of the frame slot it was created in; the shared scope is what gives
//! closures their "sees later writes" behavior.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use garnet_ir::{Arity, Visibility};

use crate::ast::IterNode;
use crate::context::EvalContext;
use crate::errors::EvalResult;
use crate::frame::Frame;
use crate::scope::ScopeRef;
use crate::value::Value;
use crate::Interpreter;

static NEXT_BLOCK_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a block literal evaluation; `break` signals target it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(u64);

impl BlockId {
    fn fresh() -> Self {
        BlockId(NEXT_BLOCK_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    /// A literal block passed to a call.
    Normal,
    /// Promoted with `proc`/`Proc.new`.
    Proc,
    /// Strict arity; `return` and `break` leave the lambda itself.
    Lambda,
    /// A `for` loop body: binds in the enclosing scope.
    For,
}

/// Native block body: `(thread, args) -> value`.
pub type NativeBlockFn = Arc<dyn Fn(&mut Interpreter, &[Value]) -> EvalResult + Send + Sync>;

#[derive(Clone)]
pub enum BlockBody {
    Interpreted(Arc<IterNode>),
    Native(NativeBlockFn),
}

pub struct BlockData {
    id: BlockId,
    body: BlockBody,
    arity: Arity,
    frame: Frame,
    scope: ScopeRef,
    context: EvalContext,
    kind: BlockKind,
}

impl BlockData {
    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn body(&self) -> &BlockBody {
        &self.body
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// The defining frame, duplicated at capture.
    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn scope(&self) -> &ScopeRef {
        &self.scope
    }

    pub fn context(&self) -> &EvalContext {
        &self.context
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn self_value(&self) -> &Value {
        self.frame.self_value()
    }
}

/// The block attached to a call; `Block::none()` is the "no block" value.
#[derive(Clone, Default)]
pub struct Block(Option<Arc<BlockData>>);

impl Block {
    pub fn none() -> Self {
        Block(None)
    }

    /// Capture a block literal.
    pub fn interpreted(
        iter: Arc<IterNode>,
        frame: &Frame,
        scope: ScopeRef,
        context: EvalContext,
        kind: BlockKind,
    ) -> Self {
        let arity = iter.arity();
        Block(Some(Arc::new(BlockData {
            id: BlockId::fresh(),
            body: BlockBody::Interpreted(iter),
            arity,
            frame: frame.duplicate(),
            scope,
            context,
            kind,
        })))
    }

    pub fn native(
        func: NativeBlockFn,
        arity: Arity,
        frame: &Frame,
        scope: ScopeRef,
        context: EvalContext,
    ) -> Self {
        Block(Some(Arc::new(BlockData {
            id: BlockId::fresh(),
            body: BlockBody::Native(func),
            arity,
            frame: frame.duplicate(),
            scope,
            context,
            kind: BlockKind::Normal,
        })))
    }

    pub fn is_given(&self) -> bool {
        self.0.is_some()
    }

    pub fn data(&self) -> Option<&Arc<BlockData>> {
        self.0.as_ref()
    }

    pub fn id(&self) -> Option<BlockId> {
        self.0.as_ref().map(|b| b.id)
    }

    pub fn kind(&self) -> Option<BlockKind> {
        self.0.as_ref().map(|b| b.kind)
    }

    /// Arity of the block's parameter list; "any" without a block.
    pub fn arity(&self) -> Arity {
        self.0.as_ref().map_or(Arity::optional(), |b| b.arity)
    }

    /// Same body and identity, rebound to a new `self` and `def` target
    /// (`instance_eval`, `class_eval`, `define_method`). Methods defined
    /// by the rebound body default to public.
    #[must_use]
    pub fn rebind(&self, self_value: Value, context: EvalContext) -> Self {
        self.map(|data| {
            let mut frame = data.frame.duplicate();
            frame.set_self_value(self_value);
            frame.set_visibility(Visibility::Public);
            BlockData {
                frame,
                context,
                ..data.copy()
            }
        })
    }

    /// Same body and identity, different kind (`lambda { }`).
    #[must_use]
    pub fn with_kind(&self, kind: BlockKind) -> Self {
        self.map(|data| BlockData { kind, ..data.copy() })
    }

    fn map(&self, f: impl FnOnce(&BlockData) -> BlockData) -> Self {
        Block(self.0.as_ref().map(|data| Arc::new(f(data))))
    }
}

impl BlockData {
    fn copy(&self) -> Self {
        Self {
            id: self.id,
            body: self.body.clone(),
            arity: self.arity,
            frame: self.frame.duplicate(),
            scope: self.scope.clone(),
            context: self.context.clone(),
            kind: self.kind,
        }
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => f.write_str("Block(none)"),
            Some(data) => f
                .debug_struct("Block")
                .field("id", &data.id)
                .field("kind", &data.kind)
                .field("arity", &data.arity)
                .finish(),
        }
    }
}
