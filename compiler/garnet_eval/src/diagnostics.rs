//! Backtraces.
//!
//! The [`CallStack`] holds one entry per activation that asked for a
//! backtrace slot (see [`Framing`](crate::method::Framing)). Each entry
//! remembers where its *caller* was, so walking the stack from the top
//! pairs every method name with the line executing inside it.

use std::fmt;

use garnet_ir::{Name, SourcePosition, SymbolTable};

#[derive(Copy, Clone, Debug)]
struct Entry {
    name: Name,
    caller_position: SourcePosition,
}

/// Live backtrace slots of one evaluator thread.
#[derive(Clone, Debug, Default)]
pub struct CallStack {
    entries: Vec<Entry>,
}

impl CallStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter method `name`, called from `caller_position`.
    pub fn push(&mut self, name: Name, caller_position: SourcePosition) {
        self.entries.push(Entry {
            name,
            caller_position,
        });
    }

    pub fn pop(&mut self) {
        debug_assert!(!self.entries.is_empty(), "unbalanced CallStack::pop");
        self.entries.pop();
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name of the innermost method with a backtrace slot.
    pub fn innermost(&self) -> Option<Name> {
        self.entries.last().map(|e| e.name)
    }

    /// Snapshot, innermost first and always ending with `<main>`.
    /// `current` is the position executing right now.
    pub fn capture(&self, current: SourcePosition, symbols: &SymbolTable) -> EvalBacktrace {
        let mut at = current;
        let mut frames: Vec<BacktraceFrame> = self
            .entries
            .iter()
            .rev()
            .map(|entry| {
                let frame = BacktraceFrame {
                    name: symbols.lookup(entry.name).to_string(),
                    location: at.display(symbols).to_string(),
                };
                at = entry.caller_position;
                frame
            })
            .collect();
        frames.push(BacktraceFrame {
            name: "<main>".to_string(),
            location: at.display(symbols).to_string(),
        });
        EvalBacktrace { frames }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BacktraceFrame {
    pub name: String,
    /// `file:line`
    pub location: String,
}

impl fmt::Display for BacktraceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:in `{}'", self.location, self.name)
    }
}

/// The call stack at a raise point.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EvalBacktrace {
    frames: Vec<BacktraceFrame>,
}

impl EvalBacktrace {
    pub fn new(frames: Vec<BacktraceFrame>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[BacktraceFrame] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// The strings `Exception#backtrace` returns.
    pub fn lines(&self) -> Vec<String> {
        self.frames.iter().map(ToString::to_string).collect()
    }
}

/// The innermost frame on its own line, callers below it prefixed with
/// `from`, the way an uncaught exception is reported.
impl fmt::Display for EvalBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((first, callers)) = self.frames.split_first() else {
            return Ok(());
        };
        writeln!(f, "{first}")?;
        for frame in callers {
            writeln!(f, "\tfrom {frame}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
