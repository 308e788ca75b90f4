//! Method variants.
//!
//! A [`DynamicMethod`] is one entry in a method table. The closed
//! [`MethodKind`] set (interpreted, native, compiled, undefined) is
//! dispatched in one place, `Interpreter::invoke_method`, so the call
//! protocol (arity check, frame/scope push, return handling, pop) is
//! enforced identically for every variant.
//!
//! Method objects are immutable. Changing visibility or copying a method
//! under a new name produces a new `DynamicMethod` with a fresh
//! [`MethodId`]; the method cache is keyed by that id.

use std::fmt;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use garnet_ir::{Arity, Name, StaticScope, Visibility};

use crate::ast::MethodDef;
use crate::block::Block;
use crate::context::Cref;
use crate::errors::EvalResult;
use crate::module::{ModuleRef, RModule};
use crate::value::Value;
use crate::Interpreter;

pub type MethodRef = Arc<DynamicMethod>;

/// Native call target: `(thread, self, args, block) -> value`.
pub type NativeFn =
    Arc<dyn Fn(&mut Interpreter, &Value, &[Value], &Block) -> EvalResult + Send + Sync>;

/// Natively compiled body. Runs inside the frame and scope pushed by the
/// call protocol, with arguments already bound to their scope slots.
pub type CompiledBody = Arc<dyn Fn(&mut Interpreter, &Value, &Block) -> EvalResult + Send + Sync>;

static NEXT_METHOD_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a method object; cache registrations are keyed by it.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(u64);

impl MethodId {
    fn fresh() -> Self {
        MethodId(NEXT_METHOD_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Which activation records a call pushes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Framing {
    /// A full frame plus a backtrace entry.
    Full,
    /// Only a backtrace entry; `self`/block/visibility stay the caller's.
    Backtrace,
    None,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CallConfiguration {
    pub framing: Framing,
    /// Whether a fresh dynamic scope is pushed.
    pub scoping: bool,
}

impl CallConfiguration {
    pub const FRAME_AND_SCOPE: Self = Self {
        framing: Framing::Full,
        scoping: true,
    };
    pub const FRAME_ONLY: Self = Self {
        framing: Framing::Full,
        scoping: false,
    };
    pub const BACKTRACE_ONLY: Self = Self {
        framing: Framing::Backtrace,
        scoping: false,
    };
    pub const NO_FRAME: Self = Self {
        framing: Framing::None,
        scoping: false,
    };
}

/// Produces compiled bodies for hot interpreted methods.
///
/// Consulted once per method, after the invocation threshold, and only
/// for fixed-arity methods. Returning `None` keeps the method interpreted.
pub trait MethodCompiler: Send + Sync {
    fn compile(&self, name: Name, method: &InterpretedMethod) -> Option<CompiledBody>;
}

/// An AST-backed method.
pub struct InterpretedMethod {
    def: Arc<MethodDef>,
    cref: Cref,
    /// Invocations so far; `-1` once promotion was attempted or ruled out.
    call_count: AtomicI32,
    compiled: OnceLock<CompiledBody>,
}

impl InterpretedMethod {
    pub fn new(def: Arc<MethodDef>, cref: Cref) -> Self {
        let call_count = if def.args.arity().is_fixed() { 0 } else { -1 };
        Self {
            def,
            cref,
            call_count: AtomicI32::new(call_count),
            compiled: OnceLock::new(),
        }
    }

    pub fn def(&self) -> &Arc<MethodDef> {
        &self.def
    }

    /// Lexical constant scope captured at definition time.
    pub fn cref(&self) -> &Cref {
        &self.cref
    }

    pub fn arity(&self) -> Arity {
        self.def.args.arity()
    }

    pub fn compiled(&self) -> Option<&CompiledBody> {
        self.compiled.get()
    }

    pub fn call_count(&self) -> i32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Count one invocation. Returns `true` exactly once, on the call that
    /// reaches `threshold`.
    pub(crate) fn record_call(&self, threshold: u32) -> bool {
        let Ok(threshold) = i32::try_from(threshold) else {
            return false;
        };
        let mut current = self.call_count.load(Ordering::Relaxed);
        loop {
            if current < 0 {
                return false;
            }
            let next = if current + 1 >= threshold {
                -1
            } else {
                current + 1
            };
            match self.call_count.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return next == -1,
                Err(actual) => current = actual,
            }
        }
    }

    pub(crate) fn install_compiled(&self, body: CompiledBody) {
        // A racing installer already won; both bodies are equivalent.
        let _ = self.compiled.set(body);
    }
}

pub struct NativeMethod {
    pub arity: Arity,
    pub func: NativeFn,
}

/// A method defined directly by a compiled entry point.
pub struct CompiledMethod {
    pub arity: Arity,
    pub scope: Arc<StaticScope>,
    pub entry: CompiledBody,
}

#[derive(Clone)]
pub enum MethodKind {
    Interpreted(Arc<InterpretedMethod>),
    Native(Arc<NativeMethod>),
    Compiled(Arc<CompiledMethod>),
    /// Sentinel installed by `undef`; lookup stops here and calling it
    /// always fails.
    Undefined,
}

pub struct DynamicMethod {
    id: MethodId,
    owner: Weak<RModule>,
    visibility: Visibility,
    config: CallConfiguration,
    kind: MethodKind,
}

impl DynamicMethod {
    pub fn interpreted(owner: &ModuleRef, visibility: Visibility, method: InterpretedMethod) -> Self {
        Self {
            id: MethodId::fresh(),
            owner: Arc::downgrade(owner),
            visibility,
            config: CallConfiguration::FRAME_AND_SCOPE,
            kind: MethodKind::Interpreted(Arc::new(method)),
        }
    }

    pub fn native(owner: &ModuleRef, visibility: Visibility, arity: Arity, func: NativeFn) -> Self {
        Self {
            id: MethodId::fresh(),
            owner: Arc::downgrade(owner),
            visibility,
            config: CallConfiguration::NO_FRAME,
            kind: MethodKind::Native(Arc::new(NativeMethod { arity, func })),
        }
    }

    pub fn compiled(owner: &ModuleRef, visibility: Visibility, method: CompiledMethod) -> Self {
        Self {
            id: MethodId::fresh(),
            owner: Arc::downgrade(owner),
            visibility,
            config: CallConfiguration::FRAME_AND_SCOPE,
            kind: MethodKind::Compiled(Arc::new(method)),
        }
    }

    pub fn undefined(owner: &ModuleRef) -> Self {
        Self {
            id: MethodId::fresh(),
            owner: Arc::downgrade(owner),
            visibility: Visibility::Public,
            config: CallConfiguration::NO_FRAME,
            kind: MethodKind::Undefined,
        }
    }

    /// Override the call configuration (e.g. give a native a backtrace
    /// entry).
    #[must_use]
    pub fn with_config(mut self, config: CallConfiguration) -> Self {
        self.config = config;
        self
    }

    /// Copy with a new visibility. The body is shared; the copy is a new
    /// method object.
    #[must_use]
    pub fn with_visibility(&self, visibility: Visibility) -> Self {
        Self {
            id: MethodId::fresh(),
            owner: self.owner.clone(),
            visibility,
            config: self.config,
            kind: self.kind.clone(),
        }
    }

    /// Copy installed under another owner (module function copies).
    #[must_use]
    pub fn dup_into(&self, owner: &ModuleRef, visibility: Visibility) -> Self {
        Self {
            id: MethodId::fresh(),
            owner: Arc::downgrade(owner),
            visibility,
            config: self.config,
            kind: self.kind.clone(),
        }
    }

    pub fn id(&self) -> MethodId {
        self.id
    }

    /// Implementation class; `None` if it has been dropped.
    pub fn owner(&self) -> Option<ModuleRef> {
        self.owner.upgrade()
    }

    pub fn visibility(&self) -> Visibility {
        self.visibility
    }

    pub fn config(&self) -> CallConfiguration {
        self.config
    }

    pub fn kind(&self) -> &MethodKind {
        &self.kind
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self.kind, MethodKind::Undefined)
    }

    pub fn arity(&self) -> Arity {
        match &self.kind {
            MethodKind::Interpreted(m) => m.arity(),
            MethodKind::Native(n) => n.arity,
            MethodKind::Compiled(c) => c.arity,
            MethodKind::Undefined => Arity::optional(),
        }
    }
}

impl fmt::Debug for DynamicMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            MethodKind::Interpreted(_) => "interpreted",
            MethodKind::Native(_) => "native",
            MethodKind::Compiled(_) => "compiled",
            MethodKind::Undefined => "undefined",
        };
        f.debug_struct("DynamicMethod")
            .field("id", &self.id)
            .field("kind", &kind)
            .field("visibility", &self.visibility)
            .finish()
    }
}
