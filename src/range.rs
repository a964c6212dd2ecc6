//! Numeric intervals used to declare the valid values of a block parameter.
//!
//! A [`Range`] is one of `[lower, upper]`, `(lower, upper)`, `[lower, upper)`
//! or `(lower, upper]` over any partially ordered, copyable type.
//!
//! # Inverted ranges
//!
//! Construction does not require `lower <= upper`. An inverted range is a
//! valid value that contains nothing: [`Range::contains`] returns `false` for
//! every input and [`Range::is_empty`] returns `true`.

use std::fmt;

/// An interval with independently open or closed endpoints. Immutable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range<T> {
    lower: T,
    upper: T,
    lower_inclusive: bool,
    upper_inclusive: bool,
}

impl<T> Range<T> {
    pub(crate) const fn from_parts(
        lower: T,
        lower_inclusive: bool,
        upper: T,
        upper_inclusive: bool,
    ) -> Self {
        Range {
            lower,
            upper,
            lower_inclusive,
            upper_inclusive,
        }
    }
}

impl<T: PartialOrd + Copy> Range<T> {
    /// `(lower, upper)`
    pub fn open(lower: T, upper: T) -> Self {
        Self::from_parts(lower, false, upper, false)
    }

    /// `[lower, upper]`
    pub fn closed(lower: T, upper: T) -> Self {
        Self::from_parts(lower, true, upper, true)
    }

    /// `(lower, upper]`
    pub fn open_closed(lower: T, upper: T) -> Self {
        Self::from_parts(lower, false, upper, true)
    }

    /// `[lower, upper)`
    pub fn closed_open(lower: T, upper: T) -> Self {
        Self::from_parts(lower, true, upper, false)
    }

    /// Check whether `value` lies inside the interval.
    ///
    /// Both endpoint comparisons are always evaluated.
    pub fn contains(&self, value: T) -> bool {
        let above_lower = if self.lower_inclusive {
            self.lower <= value
        } else {
            self.lower < value
        };
        let below_upper = if self.upper_inclusive {
            value <= self.upper
        } else {
            value < self.upper
        };
        above_lower & below_upper
    }

    /// True when no value can satisfy [`contains`](Self::contains).
    pub fn is_empty(&self) -> bool {
        if self.lower_inclusive && self.upper_inclusive {
            !(self.lower <= self.upper)
        } else {
            !(self.lower < self.upper)
        }
    }

    pub fn lower(&self) -> T {
        self.lower
    }

    pub fn upper(&self) -> T {
        self.upper
    }

    pub fn is_lower_inclusive(&self) -> bool {
        self.lower_inclusive
    }

    pub fn is_upper_inclusive(&self) -> bool {
        self.upper_inclusive
    }
}

impl<T: fmt::Display> fmt::Display for Range<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}, {}{}",
            if self.lower_inclusive { '[' } else { '(' },
            self.lower,
            self.upper,
            if self.upper_inclusive { ']' } else { ')' }
        )
    }
}
