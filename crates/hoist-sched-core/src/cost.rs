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

//! Objective magnitudes. Deadhead and stretch sums accumulate here, so the
//! improvement search compares and adds costs without touching raw `i64`s.

use num_traits::{CheckedAdd, SaturatingAdd, Zero};
use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Sub, SubAssign},
};

/// A scalar objective contribution (seconds of deadhead, seconds of
/// stretch).
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct Cost(i64);

impl Cost {
    #[inline]
    pub const fn new(value: i64) -> Self {
        Cost(value)
    }

    #[inline]
    pub const fn zero() -> Self {
        Cost(0)
    }

    #[inline]
    pub const fn value(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn checked_add(self, other: Cost) -> Option<Self> {
        self.0.checked_add(other.0).map(Cost)
    }

    #[inline]
    pub fn saturating_add(self, other: Cost) -> Self {
        Cost(self.0.saturating_add(other.0))
    }

    #[inline]
    pub fn saturating_mul(self, factor: i64) -> Self {
        Cost(self.0.saturating_mul(factor))
    }
}

impl Display for Cost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Cost({})", self.0)
    }
}

impl From<i64> for Cost {
    #[inline]
    fn from(v: i64) -> Self {
        Cost(v)
    }
}

impl Add for Cost {
    type Output = Cost;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Cost(self.0.checked_add(rhs.0).expect("overflow in Cost + Cost"))
    }
}

impl AddAssign for Cost {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self
            .0
            .checked_add(rhs.0)
            .expect("overflow in Cost += Cost");
    }
}

impl Sub for Cost {
    type Output = Cost;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        Cost(self.0.checked_sub(rhs.0).expect("underflow in Cost - Cost"))
    }
}

impl SubAssign for Cost {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self
            .0
            .checked_sub(rhs.0)
            .expect("underflow in Cost -= Cost");
    }
}

impl Zero for Cost {
    #[inline]
    fn zero() -> Self {
        Cost(0)
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl CheckedAdd for Cost {
    #[inline]
    fn checked_add(&self, rhs: &Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Cost)
    }
}

impl SaturatingAdd for Cost {
    #[inline]
    fn saturating_add(&self, rhs: &Self) -> Self {
        Cost(self.0.saturating_add(rhs.0))
    }
}

impl Sum for Cost {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Cost::zero(), |acc, x| acc + x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cost_creation() {
        assert_eq!(Cost::new(42).value(), 42);
        assert_eq!(Cost::zero().value(), 0);
    }

    #[test]
    fn test_cost_add() {
        assert_eq!(Cost::new(10) + Cost::new(5), Cost::new(15));
    }

    #[test]
    fn test_cost_saturating_add() {
        assert_eq!(
            Cost::new(i64::MAX).saturating_add(Cost::new(1)),
            Cost::new(i64::MAX)
        );
    }

    #[test]
    fn test_cost_sum() {
        let total: Cost = [Cost::new(1), Cost::new(2), Cost::new(3)].into_iter().sum();
        assert_eq!(total, Cost::new(6));
    }

    #[test]
    fn test_cost_display() {
        assert_eq!(format!("{}", Cost::new(7)), "Cost(7)");
    }

    #[test]
    #[should_panic(expected = "overflow in Cost + Cost")]
    fn test_cost_add_panic_on_overflow() {
        let _ = Cost::new(i64::MAX) + Cost::new(1);
    }
}
