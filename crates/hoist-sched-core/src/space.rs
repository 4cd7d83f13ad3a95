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

//! # Rail Space
//!
//! Signed integer-millimetre coordinates along the transporter rail.
//! Station positions are measured from the plant datum, which may place
//! stations on either side of it, hence the signed representation.
//!
//! `SpaceInterval` spans are used for transporter operating areas and for
//! the x-extent a task traverses (the basis of cross-transporter
//! avoidance).

use crate::primitives::Interval;
use num_traits::{CheckedAdd, CheckedSub, SaturatingAdd, SaturatingSub, Zero};
use std::{
    iter::Sum,
    ops::{Add, AddAssign, Sub, SubAssign},
};

/// A position along the rail, in millimetres from the plant datum.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct SpacePosition(i64);

/// A span of rail `[start, end)`.
pub type SpaceInterval = Interval<SpacePosition>;

/// A distance along the rail, in millimetres. Never negative by
/// construction when obtained from `SpacePosition::distance_to`.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Default)]
pub struct SpaceLength(i64);

impl SpacePosition {
    #[inline]
    pub const fn new(mm: i64) -> Self {
        SpacePosition(mm)
    }

    #[inline]
    pub const fn zero() -> Self {
        SpacePosition(0)
    }

    #[inline]
    pub const fn value(self) -> i64 {
        self.0
    }

    /// Absolute distance to another rail position.
    #[inline]
    pub fn distance_to(self, other: SpacePosition) -> SpaceLength {
        SpaceLength(
            self.0
                .checked_sub(other.0)
                .expect("underflow in SpacePosition distance")
                .abs(),
        )
    }

    #[inline]
    pub fn checked_add(self, len: SpaceLength) -> Option<Self> {
        self.0.checked_add(len.0).map(SpacePosition)
    }

    #[inline]
    pub fn checked_sub(self, len: SpaceLength) -> Option<Self> {
        self.0.checked_sub(len.0).map(SpacePosition)
    }

    #[inline]
    pub fn saturating_add(self, len: SpaceLength) -> Self {
        SpacePosition(self.0.saturating_add(len.0))
    }

    #[inline]
    pub fn saturating_sub(self, len: SpaceLength) -> Self {
        SpacePosition(self.0.saturating_sub(len.0))
    }
}

impl SpaceLength {
    #[inline]
    pub const fn new(mm: i64) -> Self {
        SpaceLength(mm)
    }

    #[inline]
    pub const fn zero() -> Self {
        SpaceLength(0)
    }

    #[inline]
    pub const fn value(self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn checked_add(self, rhs: SpaceLength) -> Option<Self> {
        self.0.checked_add(rhs.0).map(SpaceLength)
    }

    #[inline]
    pub fn saturating_add(self, rhs: SpaceLength) -> Self {
        SpaceLength(self.0.saturating_add(rhs.0))
    }
}

impl std::fmt::Display for SpacePosition {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SpacePosition({})", self.0)
    }
}

impl std::fmt::Display for SpaceLength {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SpaceLength({})", self.0)
    }
}

impl From<i64> for SpacePosition {
    #[inline]
    fn from(v: i64) -> Self {
        SpacePosition(v)
    }
}

impl From<i64> for SpaceLength {
    #[inline]
    fn from(v: i64) -> Self {
        SpaceLength(v)
    }
}

impl Add<SpaceLength> for SpacePosition {
    type Output = SpacePosition;

    #[inline]
    fn add(self, rhs: SpaceLength) -> Self::Output {
        SpacePosition(
            self.0
                .checked_add(rhs.0)
                .expect("overflow in SpacePosition + SpaceLength"),
        )
    }
}

impl Sub<SpaceLength> for SpacePosition {
    type Output = SpacePosition;

    #[inline]
    fn sub(self, rhs: SpaceLength) -> Self::Output {
        SpacePosition(
            self.0
                .checked_sub(rhs.0)
                .expect("underflow in SpacePosition - SpaceLength"),
        )
    }
}

impl Add for SpaceLength {
    type Output = SpaceLength;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        SpaceLength(
            self.0
                .checked_add(rhs.0)
                .expect("overflow in SpaceLength + SpaceLength"),
        )
    }
}

impl Sub for SpaceLength {
    type Output = SpaceLength;

    #[inline]
    fn sub(self, rhs: Self) -> Self::Output {
        SpaceLength(
            self.0
                .checked_sub(rhs.0)
                .expect("underflow in SpaceLength - SpaceLength"),
        )
    }
}

impl AddAssign for SpaceLength {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self
            .0
            .checked_add(rhs.0)
            .expect("overflow in SpaceLength += SpaceLength");
    }
}

impl SubAssign for SpaceLength {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self
            .0
            .checked_sub(rhs.0)
            .expect("underflow in SpaceLength -= SpaceLength");
    }
}

impl Zero for SpaceLength {
    #[inline]
    fn zero() -> Self {
        SpaceLength(0)
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl CheckedAdd for SpaceLength {
    fn checked_add(&self, rhs: &Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(SpaceLength)
    }
}

impl CheckedSub for SpaceLength {
    fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(SpaceLength)
    }
}

impl SaturatingAdd for SpaceLength {
    fn saturating_add(&self, rhs: &Self) -> Self {
        SpaceLength(self.0.saturating_add(rhs.0))
    }
}

impl SaturatingSub for SpaceLength {
    fn saturating_sub(&self, rhs: &Self) -> Self {
        SpaceLength(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for SpaceLength {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

impl Interval<SpacePosition> {
    /// Rail length covered by the span.
    #[inline]
    pub fn length(&self) -> SpaceLength {
        SpaceLength(self.end().value() - self.start().value())
    }

    /// Shortest rail distance between two spans; zero when they intersect
    /// or touch.
    #[inline]
    pub fn distance_to(&self, other: &Interval<SpacePosition>) -> SpaceLength {
        if self.start() >= other.end() {
            SpaceLength(self.start().value() - other.end().value())
        } else if other.start() >= self.end() {
            SpaceLength(other.start().value() - self.end().value())
        } else {
            SpaceLength::zero()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_distance() {
        let a = SpacePosition::new(1000);
        let b = SpacePosition::new(3000);
        assert_eq!(a.distance_to(b), SpaceLength::new(2000));
        assert_eq!(b.distance_to(a), SpaceLength::new(2000));
    }

    #[test]
    fn test_negative_coordinates() {
        let a = SpacePosition::new(-500);
        let b = SpacePosition::new(500);
        assert_eq!(a.distance_to(b), SpaceLength::new(1000));
    }

    #[test]
    fn test_position_plus_length() {
        assert_eq!(
            SpacePosition::new(100) + SpaceLength::new(50),
            SpacePosition::new(150)
        );
    }

    #[test]
    fn test_interval_length() {
        let span = SpaceInterval::new(SpacePosition::new(1000), SpacePosition::new(3000));
        assert_eq!(span.length(), SpaceLength::new(2000));
    }

    #[test]
    fn test_interval_distance_disjoint() {
        let a = SpaceInterval::new(SpacePosition::new(0), SpacePosition::new(1000));
        let b = SpaceInterval::new(SpacePosition::new(2500), SpacePosition::new(3000));
        assert_eq!(a.distance_to(&b), SpaceLength::new(1500));
        assert_eq!(b.distance_to(&a), SpaceLength::new(1500));
    }

    #[test]
    fn test_interval_distance_intersecting_is_zero() {
        let a = SpaceInterval::new(SpacePosition::new(0), SpacePosition::new(2000));
        let b = SpaceInterval::new(SpacePosition::new(1000), SpacePosition::new(3000));
        assert_eq!(a.distance_to(&b), SpaceLength::zero());
    }

    #[test]
    fn test_length_sum() {
        let total: SpaceLength = [SpaceLength::new(10), SpaceLength::new(20)]
            .into_iter()
            .sum();
        assert_eq!(total, SpaceLength::new(30));
    }

    #[test]
    #[should_panic(expected = "overflow in SpaceLength + SpaceLength")]
    fn test_length_add_panic_on_overflow() {
        let _ = SpaceLength::new(i64::MAX) + SpaceLength::new(1);
    }
}
