//! Source positions carried by AST nodes and frames.

use crate::{Name, SymbolLookup};
use std::fmt;

/// A file/line pair.
///
/// The file is an interned name so positions are `Copy` and can be stored
/// in every frame push without allocation.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct SourcePosition {
    pub file: Name,
    pub line: u32,
}

impl SourcePosition {
    pub const fn new(file: Name, line: u32) -> Self {
        Self { file, line }
    }

    /// Render as `file:line` using the given interner.
    pub fn display<'a>(&self, lookup: &'a impl SymbolLookup) -> PositionDisplay<'a> {
        PositionDisplay {
            file: lookup.lookup(self.file),
            line: self.line,
        }
    }
}

/// `file:line` rendering of a [`SourcePosition`].
pub struct PositionDisplay<'a> {
    file: &'a str,
    line: u32,
}

impl fmt::Display for PositionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}
