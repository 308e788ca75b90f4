//! Method visibility.

use crate::CallType;
use std::fmt;

/// Visibility of a method, or the default visibility of a class body.
///
/// `ModuleFunction` is only ever a *default*: methods defined while it is
/// active are installed private on the module with a public copy on the
/// module's singleton class.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
    ModuleFunction,
}

impl Visibility {
    pub fn is_public(self) -> bool {
        self == Visibility::Public
    }

    pub fn is_private(self) -> bool {
        matches!(self, Visibility::Private | Visibility::ModuleFunction)
    }

    pub fn is_protected(self) -> bool {
        self == Visibility::Protected
    }

    /// Visibility rules that depend only on how the call was written.
    ///
    /// Private methods are reachable only without an explicit receiver.
    /// Protected methods called with an explicit receiver additionally
    /// need a caller-side check, reported as [`Reachability::NeedsCaller`].
    pub fn reachability(self, call_type: CallType) -> Reachability {
        match self {
            Visibility::Public => Reachability::Callable,
            Visibility::Private | Visibility::ModuleFunction => {
                if call_type.has_explicit_receiver() {
                    Reachability::Denied
                } else {
                    Reachability::Callable
                }
            }
            Visibility::Protected => {
                if call_type.has_explicit_receiver() {
                    Reachability::NeedsCaller
                } else {
                    Reachability::Callable
                }
            }
        }
    }
}

/// Outcome of [`Visibility::reachability`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reachability {
    Callable,
    Denied,
    /// Callable only if the caller's `self` is a kind of the method's owner.
    NeedsCaller,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
            Visibility::ModuleFunction => "module_function",
        })
    }
}
