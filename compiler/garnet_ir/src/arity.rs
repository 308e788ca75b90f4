//! Expected argument counts of callables.
//!
//! An `Arity` is a lower bound plus an optional upper bound:
//!
//! | form | accepts | displayed |
//! |------|---------|-----------|
//! | fixed `n` | exactly `n` | `n` |
//! | range `m..k` | `m` through `k` | `m..k` |
//! | required `m` | `m` or more | `m+` |
//!
//! "Any number of arguments" is `required(0)`. The form is normalized on
//! construction (a range with no optional slots is fixed), so two arities
//! with the same meaning compare and hash equal.
//!
//! [`Arity::value`] is the classic signed encoding reported by
//! `Proc#arity`: `n` for fixed arities, `-(1 + m)` otherwise. It is lossy
//! for ranges, which report as their minimum.

use std::fmt;

/// Counts are clamped here so the signed encoding never overflows.
const MAX_COUNT: u32 = i32::MAX.unsigned_abs() - 1;

fn clamp(count: usize) -> u32 {
    u32::try_from(count).map_or(MAX_COUNT, |count| count.min(MAX_COUNT))
}

/// A callable's expected-argument-count contract.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Arity {
    required: u32,
    /// Inclusive upper bound; `None` when unbounded.
    max: Option<u32>,
}

/// Argument count did not satisfy an [`Arity`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("wrong number of arguments ({given} for {expected})")]
pub struct ArityError {
    pub given: usize,
    pub expected: Arity,
}

impl Arity {
    /// Exactly `count` arguments. Counts past `i32::MAX - 1` saturate.
    pub fn fixed(count: usize) -> Self {
        let count = clamp(count);
        Arity {
            required: count,
            max: Some(count),
        }
    }

    /// At least `minimum` arguments. Counts past `i32::MAX - 1` saturate.
    pub fn required(minimum: usize) -> Self {
        Arity {
            required: clamp(minimum),
            max: None,
        }
    }

    /// `required` mandatory arguments followed by up to `optional` more.
    pub fn range(required: usize, optional: usize) -> Self {
        let required = clamp(required);
        let max = clamp(optional).saturating_add(required).min(MAX_COUNT);
        Arity {
            required,
            max: Some(max),
        }
    }

    /// Any number of arguments.
    pub const fn optional() -> Self {
        Arity {
            required: 0,
            max: None,
        }
    }

    pub const fn no_arguments() -> Self {
        Arity {
            required: 0,
            max: Some(0),
        }
    }

    pub const fn one_argument() -> Self {
        Arity {
            required: 1,
            max: Some(1),
        }
    }

    /// Rebuild from the signed encoding. Negative values are unbounded.
    pub const fn from_value(value: i32) -> Self {
        if value >= 0 {
            let count = value.unsigned_abs();
            Arity {
                required: count,
                max: Some(count),
            }
        } else {
            Arity {
                required: (value + 1).unsigned_abs(),
                max: None,
            }
        }
    }

    /// The signed encoding (the value reported by `Proc#arity`).
    pub fn value(self) -> i32 {
        let required = i32::try_from(self.required).unwrap_or(i32::MAX - 1);
        if self.is_fixed() {
            required
        } else {
            -(1 + required)
        }
    }

    pub fn is_fixed(self) -> bool {
        self.max == Some(self.required)
    }

    /// Number of mandatory arguments.
    pub fn required_count(self) -> usize {
        self.required as usize
    }

    /// Most arguments accepted, `None` when unbounded.
    pub fn max_count(self) -> Option<usize> {
        self.max.map(|max| max as usize)
    }

    /// Whether `given` arguments satisfy this arity.
    #[inline]
    pub fn accepts(self, given: usize) -> bool {
        given >= self.required_count() && !self.max_count().is_some_and(|max| given > max)
    }

    /// Validate an actual argument count.
    #[inline]
    pub fn check(self, given: usize) -> Result<(), ArityError> {
        if self.accepts(given) {
            Ok(())
        } else {
            Err(ArityError {
                given,
                expected: self,
            })
        }
    }
}

impl Default for Arity {
    fn default() -> Self {
        Self::optional()
    }
}

/// Renders the expected bound: `2`, `1..3` or `1+`.
impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.required => write!(f, "{max}"),
            Some(max) => write!(f, "{}..{max}", self.required),
            None => write!(f, "{}+", self.required),
        }
    }
}

impl fmt::Debug for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.required => write!(f, "Arity::fixed({max})"),
            Some(max) => write!(f, "Arity::range({}..={max})", self.required),
            None => write!(f, "Arity::required({})", self.required),
        }
    }
}
