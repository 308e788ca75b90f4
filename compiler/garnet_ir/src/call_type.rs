//! How a call expression was written.

/// Classification of a call by syntax, governing which visibilities are
/// reachable and how dispatch failures are reported.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum CallType {
    /// `recv.name(args)`
    Normal,
    /// `name(args)`, implicit `self`.
    Functional,
    /// `name` with no receiver and no argument list; may have been a local
    /// variable.
    Variable,
    /// `super` / `super(args)`.
    Super,
}

impl CallType {
    pub fn has_explicit_receiver(self) -> bool {
        self == CallType::Normal
    }
}
