//! Per-call activation records.
//!
//! A [`FrameStack`] is a per-thread pool of frame slots. `push` overwrites
//! the next slot, `pop` clears it (dropping everything the call held) and
//! hands back the caller position recorded at push time so the thread's
//! current position can be restored. A frame that must outlive its slot,
//! because a block captured it, is copied with [`Frame::duplicate`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use garnet_ir::{Name, SourcePosition, Visibility};

use crate::block::Block;
use crate::module::ModuleRef;
use crate::value::Value;

static NEXT_ACTIVATION: AtomicU64 = AtomicU64::new(1);

/// Identity of one method (or lambda, or top-level) activation. `return`
/// signals target it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ActivationId(u64);

impl ActivationId {
    pub(crate) fn fresh() -> Self {
        ActivationId(NEXT_ACTIVATION.fetch_add(1, Ordering::Relaxed))
    }
}

/// `$~` and `$_`; most frames never touch them.
#[derive(Clone, Default)]
struct BackrefSlots {
    backref: Value,
    lastline: Value,
}

#[derive(Clone, Default)]
pub struct Frame {
    klazz: Option<ModuleRef>,
    self_value: Value,
    name: Option<Name>,
    block: Block,
    visibility: Visibility,
    is_binding: bool,
    slots: Option<Box<BackrefSlots>>,
    position: SourcePosition,
    args: Option<Arc<[Value]>>,
    activation: ActivationId,
    is_block: bool,
}

impl Frame {
    /// Frame for a method activation.
    pub fn for_method(
        klazz: ModuleRef,
        self_value: Value,
        name: Name,
        block: Block,
        args: Arc<[Value]>,
    ) -> Self {
        Self {
            klazz: Some(klazz),
            self_value,
            name: Some(name),
            block,
            args: Some(args),
            activation: ActivationId::fresh(),
            ..Self::default()
        }
    }

    /// Frame for the top level or a class/module body.
    pub fn for_body(self_value: Value, visibility: Visibility) -> Self {
        Self {
            self_value,
            visibility,
            activation: ActivationId::fresh(),
            ..Self::default()
        }
    }

    /// Value copy independent of the stack slot.
    #[must_use]
    pub fn duplicate(&self) -> Self {
        self.clone()
    }

    /// The copy a yield runs in: same method identity, marked as a block
    /// frame so `return` does not treat it as the method activation.
    #[must_use]
    pub fn for_yield(&self, self_value: Value) -> Self {
        Self {
            self_value,
            is_block: true,
            ..self.clone()
        }
    }

    /// The copy a lambda call runs in: a fresh activation of its own.
    #[must_use]
    pub fn for_lambda(&self, self_value: Value) -> Self {
        Self {
            self_value,
            is_block: false,
            activation: ActivationId::fresh(),
            ..self.clone()
        }
    }

    /// Implementation class of the running method.
    pub fn klazz(&self) -> Option<&ModuleRef> {
        self.klazz.as_ref()
    }

    pub fn self_value(&self) -> &Value {
        &self.self_value
    }

    pub(crate) fn set_self_value(&mut self, self_value: Value) {
        self.self_value = self_value;
    }

    pub fn name(&self) -> Option<Name> {
        self.name
    }

    pub fn block(&self) -> &Block {
        &self.block
    }

    /// Default visibility for `def` in this frame.
    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, visibility: Visibility) {
        self.visibility = visibility;
    }

    pub fn is_binding(&self) -> bool {
        self.is_binding
    }

    pub fn set_binding(&mut self, is_binding: bool) {
        self.is_binding = is_binding;
    }

    pub fn backref(&self) -> Value {
        self.slots.as_ref().map(|s| s.backref.clone()).unwrap_or_default()
    }

    pub fn set_backref(&mut self, value: Value) {
        self.slots.get_or_insert_with(Box::default).backref = value;
    }

    pub fn lastline(&self) -> Value {
        self.slots.as_ref().map(|s| s.lastline.clone()).unwrap_or_default()
    }

    pub fn set_lastline(&mut self, value: Value) {
        self.slots.get_or_insert_with(Box::default).lastline = value;
    }

    /// Caller position recorded when the frame was pushed.
    pub fn position(&self) -> SourcePosition {
        self.position
    }

    /// Arguments the method was entered with, including evaluated
    /// optional defaults; `zsuper` re-passes these.
    pub fn args(&self) -> Option<&Arc<[Value]>> {
        self.args.as_ref()
    }

    pub(crate) fn set_args(&mut self, args: Arc<[Value]>) {
        self.args = Some(args);
    }

    pub fn activation(&self) -> ActivationId {
        self.activation
    }

    pub fn is_block_frame(&self) -> bool {
        self.is_block
    }
}

/// Per-thread stack of frame slots. Slot 0 is the thread's root frame and
/// is never popped.
pub struct FrameStack {
    frames: Vec<Frame>,
    top: usize,
}

impl FrameStack {
    pub fn new(root: Frame) -> Self {
        Self {
            frames: vec![root],
            top: 1,
        }
    }

    /// Install `frame` in the next slot, recording the caller's position.
    pub fn push(&mut self, mut frame: Frame, caller_position: SourcePosition) {
        frame.position = caller_position;
        if self.top < self.frames.len() {
            self.frames[self.top] = frame;
        } else {
            self.frames.push(frame);
        }
        self.top += 1;
    }

    /// Clear the top slot and return the caller position it recorded.
    pub fn pop(&mut self) -> SourcePosition {
        debug_assert!(self.top > 1, "FrameStack::pop() would remove the root frame");
        if self.top <= 1 {
            return self.frames[0].position;
        }
        self.top -= 1;
        let slot = std::mem::take(&mut self.frames[self.top]);
        slot.position
    }

    pub fn current(&self) -> &Frame {
        &self.frames[self.top - 1]
    }

    pub fn current_mut(&mut self) -> &mut Frame {
        &mut self.frames[self.top - 1]
    }

    pub fn depth(&self) -> usize {
        self.top
    }

    /// Live frames, innermost first.
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames[..self.top].iter().rev()
    }

    /// Whether the method activation `id` is still running on this thread.
    pub fn has_method_activation(&self, id: ActivationId) -> bool {
        self.iter().any(|f| !f.is_block && f.activation == id)
    }

    /// Number of pooled slots, live or not.
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }
}
