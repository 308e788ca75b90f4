//! Evaluation modes.
//!
//! `EvalMode` selects interpreter policy through match dispatch: the call
//! depth at which `SystemStackError` is raised and where output goes by
//! default.

use crate::print_handler::{buffer_handler, stdout_handler, SharedPrintHandler};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EvalMode {
    /// Running a program: output to stdout, generous depth limit.
    #[default]
    Interpret,
    /// Running under a test harness: output captured, tighter depth limit so
    /// runaway recursion fails fast.
    TestRun,
}

impl EvalMode {
    /// Call depth at which `stack level too deep` is raised.
    ///
    /// - `Interpret`: 10 000 natively (`stacker` grows the host stack), 200 on WASM
    /// - `TestRun`: 1 000
    #[inline]
    pub fn max_recursion_depth(self) -> usize {
        match self {
            Self::Interpret => {
                #[cfg(target_arch = "wasm32")]
                {
                    200
                }
                #[cfg(not(target_arch = "wasm32"))]
                {
                    10_000
                }
            }
            Self::TestRun => 1_000,
        }
    }

    /// Whether program output should be captured rather than written out.
    #[inline]
    pub fn captures_output(self) -> bool {
        matches!(self, Self::TestRun)
    }

    pub fn default_print_handler(self) -> SharedPrintHandler {
        if self.captures_output() {
            buffer_handler()
        } else {
            stdout_handler()
        }
    }
}
