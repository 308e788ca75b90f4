//! Symbols: interned identifiers.

use std::fmt;

/// An interned identifier or symbol.
///
/// Method, variable and constant names and `:symbol` literals are all
/// `Name`s, so method tables and variable lookups key on a `u32`.
/// The top 4 bits pick a [`SymbolTable`](crate::SymbolTable) shard and
/// the low 28 bits index into it.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Default)]
#[repr(transparent)]
pub struct Name(u32);

impl Name {
    /// The empty identifier, present in every table.
    pub const EMPTY: Name = Name(0);

    pub const MAX_LOCAL: u32 = (1 << 28) - 1;

    pub const NUM_SHARDS: usize = 16;

    #[inline]
    pub const fn new(shard: u32, local: u32) -> Self {
        debug_assert!(shard < 16);
        debug_assert!(local <= Self::MAX_LOCAL);
        Name((shard << 28) | local)
    }

    #[inline]
    pub const fn shard(self) -> usize {
        (self.0 >> 28) as usize
    }

    #[inline]
    pub const fn local(self) -> usize {
        (self.0 & Self::MAX_LOCAL) as usize
    }

    /// Stable per-runtime number, used for symbol object ids.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name({}:{})", self.shard(), self.local())
    }
}

/// What an identifier names, judged from its spelling alone.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NameKind {
    /// `foo`, `_bar`, `empty?`, `save!`
    Local,
    /// `Foo`
    Constant,
    /// `@foo`
    Instance,
    /// `@@foo`
    Class,
    /// `$foo`, `$!`
    Global,
    /// `foo=`
    Setter,
    /// Operators and anything else.
    Other,
}

impl NameKind {
    pub fn of(text: &str) -> Self {
        fn ident(s: &str) -> bool {
            let mut chars = s.chars();
            chars
                .next()
                .is_some_and(|c| c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        }

        if let Some(rest) = text.strip_prefix("@@") {
            return if ident(rest) { Self::Class } else { Self::Other };
        }
        if let Some(rest) = text.strip_prefix('@') {
            return if ident(rest) { Self::Instance } else { Self::Other };
        }
        if let Some(rest) = text.strip_prefix('$') {
            let special = rest.len() == 1 && !rest.starts_with(char::is_alphanumeric);
            return if ident(rest) || special { Self::Global } else { Self::Other };
        }
        if let Some(base) = text.strip_suffix('=') {
            return if ident(base) { Self::Setter } else { Self::Other };
        }
        let base = text
            .strip_suffix('?')
            .or_else(|| text.strip_suffix('!'))
            .unwrap_or(text);
        if !ident(base) {
            return Self::Other;
        }
        if base.starts_with(char::is_uppercase) && base.len() == text.len() {
            Self::Constant
        } else {
            Self::Local
        }
    }
}
