//! Stack safety for the Garnet evaluator.
//!
//! Two layers keep deep evaluation from taking the process down:
//!
//! - [`ensure_sufficient_stack`] grows the native stack on demand so that
//!   nested expressions never exhaust the host stack.
//! - [`CallDepth`] counts interpreter-level activations against a
//!   configured limit so runaway recursion becomes a catchable error
//!   ("stack level too deep") at a call boundary.
//!
//! On WASM targets stack growth is a passthrough; the depth limit is
//! what bounds recursion there.

/// Ensure sufficient stack space is available before executing `f`.
///
/// On native targets, uses `stacker` to grow the stack if needed.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    /// Minimum stack space to keep available (128KB red zone).
    const RED_ZONE: usize = 128 * 1024;

    /// Stack space to allocate when growing (2MB).
    const STACK_PER_RECURSION: usize = 2 * 1024 * 1024;

    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

/// WASM version: call directly.
#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}

/// The depth limit was reached; carries the configured limit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DepthExceeded {
    pub limit: usize,
}

/// Activation depth counter with an optional upper bound.
///
/// `enter` and `exit` must be paired by the caller; the interpreter
/// pairs them inside its activation guard.
#[derive(Clone, Debug)]
pub struct CallDepth {
    current: usize,
    limit: Option<usize>,
}

impl CallDepth {
    pub fn new(limit: Option<usize>) -> Self {
        Self { current: 0, limit }
    }

    /// Record one more activation, failing without recording it when the
    /// limit would be exceeded.
    #[inline]
    pub fn enter(&mut self) -> Result<(), DepthExceeded> {
        if let Some(limit) = self.limit {
            if self.current >= limit {
                return Err(DepthExceeded { limit });
            }
        }
        self.current += 1;
        Ok(())
    }

    #[inline]
    pub fn exit(&mut self) {
        debug_assert!(self.current > 0, "CallDepth::exit() without enter()");
        self.current = self.current.saturating_sub(1);
    }

    #[inline]
    pub fn current(&self) -> usize {
        self.current
    }

    #[inline]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}
