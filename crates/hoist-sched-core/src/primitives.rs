// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

//! # Interval Primitive
//!
//! A generic half-open interval `[start, end)` shared by the time and space
//! modules. Station occupancies, transporter traversal spans, and batch
//! time windows are all represented with it.

use std::cmp::Ordering;
use std::fmt;

/// A half-open interval `[start, end)`.
///
/// The start is inclusive and the end is exclusive, so `[start, end)`
/// contains every `x` with `start <= x < end`.
///
/// # Examples
///
/// ```
/// use hoist_sched_core::primitives::Interval;
/// let interval = Interval::new(1, 5);
/// assert_eq!(interval.start(), 1);
/// assert_eq!(interval.end(), 5);
/// assert!(interval.contains(3));
/// assert!(!interval.contains(5));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Interval<T> {
    start_inclusive: T,
    end_exclusive: T,
}

impl<T> Interval<T> {
    /// Creates a new half-open interval `[start, end)`.
    ///
    /// The bounds are normalized on construction: if `b < a` they are
    /// swapped, so the invariant `start <= end` holds for every interval
    /// ever built. All other methods rely on it.
    ///
    /// # Panics
    ///
    /// If `a` and `b` are not comparable (e.g. NaN).
    ///
    /// # Examples
    ///
    /// ```
    /// use hoist_sched_core::primitives::Interval;
    ///
    /// let interval = Interval::new(5, 3);
    /// assert_eq!(interval.start(), 3);
    /// assert_eq!(interval.end(), 5);
    /// ```
    #[inline]
    pub fn new(a: T, b: T) -> Self
    where
        T: PartialOrd + Copy,
    {
        let ord = a
            .partial_cmp(&b)
            .expect("Interval::new: non-comparable bounds (NaN?)");
        let (s, e) = match ord {
            Ordering::Greater => (b, a),
            _ => (a, b),
        };

        Self {
            start_inclusive: s,
            end_exclusive: e,
        }
    }

    /// Returns the inclusive start of the interval.
    #[inline]
    pub fn start(&self) -> T
    where
        T: Copy,
    {
        self.start_inclusive
    }

    /// Returns the exclusive end of the interval.
    #[inline]
    pub fn end(&self) -> T
    where
        T: Copy,
    {
        self.end_exclusive
    }

    /// Checks whether the interval has zero length.
    #[inline]
    pub fn is_empty(&self) -> bool
    where
        T: PartialEq,
    {
        self.start_inclusive == self.end_exclusive
    }

    /// Checks whether the interval contains the value `x`.
    ///
    /// The start is inclusive, the end is exclusive.
    ///
    /// # Examples
    ///
    /// ```
    /// use hoist_sched_core::primitives::Interval;
    ///
    /// let interval = Interval::new(1, 5);
    /// assert!(interval.contains(1));
    /// assert!(!interval.contains(5));
    /// ```
    #[inline]
    pub fn contains(&self, x: T) -> bool
    where
        T: PartialOrd,
    {
        x >= self.start_inclusive && x < self.end_exclusive
    }

    /// Checks whether this interval fully contains `other`.
    ///
    /// Empty intervals are contained wherever their position lies within
    /// the bounds.
    #[inline]
    pub fn contains_interval(&self, other: &Interval<T>) -> bool
    where
        T: PartialOrd,
    {
        other.start_inclusive >= self.start_inclusive && other.end_exclusive <= self.end_exclusive
    }

    /// Checks whether two intervals overlap in at least one point.
    ///
    /// Touching intervals (`[1, 3)` and `[3, 5)`) do not intersect.
    ///
    /// # Examples
    ///
    /// ```
    /// use hoist_sched_core::primitives::Interval;
    ///
    /// let a = Interval::new(1, 5);
    /// assert!(a.intersects(&Interval::new(4, 8)));
    /// assert!(!a.intersects(&Interval::new(5, 8)));
    /// ```
    #[inline]
    pub fn intersects(&self, other: &Interval<T>) -> bool
    where
        T: PartialOrd,
    {
        self.start_inclusive < other.end_exclusive && other.start_inclusive < self.end_exclusive
    }

    /// Returns the overlapping part of two intervals, or `None` when they
    /// do not intersect.
    #[inline]
    pub fn intersection(&self, other: &Interval<T>) -> Option<Interval<T>>
    where
        T: PartialOrd + Copy,
    {
        if !self.intersects(other) {
            return None;
        }
        let start = if self.start_inclusive >= other.start_inclusive {
            self.start_inclusive
        } else {
            other.start_inclusive
        };
        let end = if self.end_exclusive <= other.end_exclusive {
            self.end_exclusive
        } else {
            other.end_exclusive
        };
        Some(Interval::new(start, end))
    }

    /// Returns the smallest interval covering both inputs, including any
    /// gap between them.
    #[inline]
    pub fn envelope(&self, other: &Interval<T>) -> Interval<T>
    where
        T: PartialOrd + Copy,
    {
        let start = if self.start_inclusive <= other.start_inclusive {
            self.start_inclusive
        } else {
            other.start_inclusive
        };
        let end = if self.end_exclusive >= other.end_exclusive {
            self.end_exclusive
        } else {
            other.end_exclusive
        };
        Interval::new(start, end)
    }
}

impl<T> fmt::Display for Interval<T>
where
    T: fmt::Display + Copy,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start_inclusive, self.end_exclusive)
    }
}
