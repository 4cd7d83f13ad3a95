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

//! # Schedule Time
//!
//! Integer-second time for the scheduling core. Every timeline starts at
//! `t = 0`; kinematic results are rounded up before they enter this module,
//! so fractional seconds never appear downstream.
//!
//! - `TimePoint`: an instant on the schedule timeline.
//! - `TimeDelta`: a signed duration or difference of instants.
//! - `TimeInterval`: a half-open `[start, end)` span of instants.
//!
//! `TimePoint + TimePoint` does not compile; differences of instants are
//! `TimeDelta`s. Plain operators panic on overflow, `checked_*` and
//! `saturating_*` variants are provided for callers that handle the edge.

use crate::primitives::Interval;
use num_traits::{CheckedAdd, CheckedSub, SaturatingAdd, SaturatingSub, Zero};
use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};

/// An instant on the schedule timeline, in whole seconds since line start.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TimePoint(i64);

/// A half-open span of instants `[start, end)`.
pub type TimeInterval = Interval<TimePoint>;

/// A signed duration in whole seconds.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TimeDelta(i64);

impl TimePoint {
    #[inline]
    pub const fn new(seconds: i64) -> Self {
        TimePoint(seconds)
    }

    #[inline]
    pub const fn zero() -> Self {
        TimePoint(0)
    }

    #[inline]
    pub const fn value(self) -> i64 {
        self.0
    }

    #[inline]
    pub fn checked_add(self, delta: TimeDelta) -> Option<Self> {
        self.0.checked_add(delta.0).map(TimePoint)
    }

    #[inline]
    pub fn checked_sub(self, delta: TimeDelta) -> Option<Self> {
        self.0.checked_sub(delta.0).map(TimePoint)
    }

    #[inline]
    pub fn saturating_add(self, delta: TimeDelta) -> Self {
        TimePoint(self.0.saturating_add(delta.0))
    }

    #[inline]
    pub fn saturating_sub(self, delta: TimeDelta) -> Self {
        TimePoint(self.0.saturating_sub(delta.0))
    }

    /// Builds the half-open span `[self, self + len)`.
    ///
    /// Returns `None` for a negative `len` or on overflow.
    #[inline]
    pub fn span_of(self, len: TimeDelta) -> Option<TimeInterval> {
        if len.is_negative() {
            return None;
        }
        self.checked_add(len).map(|end| Interval::new(self, end))
    }
}

impl TimeDelta {
    #[inline]
    pub const fn new(seconds: i64) -> Self {
        Self(seconds)
    }

    #[inline]
    pub const fn zero() -> Self {
        Self(0)
    }

    #[inline]
    pub const fn value(self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn abs(self) -> Self {
        Self(self.0.abs())
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn clamp(self, min: TimeDelta, max: TimeDelta) -> TimeDelta {
        assert!(min <= max, "min must be <= max");
        if self < min {
            min
        } else if self > max {
            max
        } else {
            self
        }
    }

    #[inline]
    pub fn checked_add(self, rhs: TimeDelta) -> Option<Self> {
        self.0.checked_add(rhs.0).map(TimeDelta)
    }

    #[inline]
    pub fn checked_sub(self, rhs: TimeDelta) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(TimeDelta)
    }

    #[inline]
    pub fn saturating_add(self, rhs: TimeDelta) -> Self {
        TimeDelta(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub fn saturating_sub(self, rhs: TimeDelta) -> Self {
        TimeDelta(self.0.saturating_sub(rhs.0))
    }

    #[inline]
    pub fn checked_mul(self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(TimeDelta)
    }
}

impl Display for TimePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TimePoint({})", self.0)
    }
}

impl Display for TimeDelta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TimeDelta({})", self.0)
    }
}

impl From<i64> for TimePoint {
    #[inline]
    fn from(v: i64) -> Self {
        TimePoint(v)
    }
}

impl From<i64> for TimeDelta {
    #[inline]
    fn from(v: i64) -> Self {
        TimeDelta(v)
    }
}

impl Add<TimeDelta> for TimePoint {
    type Output = TimePoint;

    #[inline]
    fn add(self, rhs: TimeDelta) -> Self::Output {
        TimePoint(
            self.0
                .checked_add(rhs.0)
                .expect("overflow in TimePoint + TimeDelta"),
        )
    }
}

impl Add<TimePoint> for TimeDelta {
    type Output = TimePoint;

    #[inline]
    fn add(self, rhs: TimePoint) -> Self::Output {
        rhs + self
    }
}

impl AddAssign<TimeDelta> for TimePoint {
    fn add_assign(&mut self, rhs: TimeDelta) {
        self.0 = self
            .0
            .checked_add(rhs.0)
            .expect("overflow in TimePoint += TimeDelta");
    }
}

impl Sub<TimeDelta> for TimePoint {
    type Output = TimePoint;

    fn sub(self, rhs: TimeDelta) -> Self::Output {
        TimePoint(
            self.0
                .checked_sub(rhs.0)
                .expect("underflow in TimePoint - TimeDelta"),
        )
    }
}

impl SubAssign<TimeDelta> for TimePoint {
    fn sub_assign(&mut self, rhs: TimeDelta) {
        self.0 = self
            .0
            .checked_sub(rhs.0)
            .expect("underflow in TimePoint -= TimeDelta");
    }
}

impl Sub<TimePoint> for TimePoint {
    type Output = TimeDelta;

    fn sub(self, rhs: TimePoint) -> Self::Output {
        TimeDelta(
            self.0
                .checked_sub(rhs.0)
                .expect("underflow in TimePoint - TimePoint"),
        )
    }
}

impl Add for TimeDelta {
    type Output = TimeDelta;

    fn add(self, rhs: Self) -> Self::Output {
        TimeDelta(
            self.0
                .checked_add(rhs.0)
                .expect("overflow in TimeDelta + TimeDelta"),
        )
    }
}

impl Sub for TimeDelta {
    type Output = TimeDelta;

    fn sub(self, rhs: Self) -> Self::Output {
        TimeDelta(
            self.0
                .checked_sub(rhs.0)
                .expect("underflow in TimeDelta - TimeDelta"),
        )
    }
}

impl AddAssign for TimeDelta {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self
            .0
            .checked_add(rhs.0)
            .expect("overflow in TimeDelta += TimeDelta");
    }
}

impl SubAssign for TimeDelta {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 = self
            .0
            .checked_sub(rhs.0)
            .expect("underflow in TimeDelta -= TimeDelta");
    }
}

impl Neg for TimeDelta {
    type Output = TimeDelta;

    fn neg(self) -> Self::Output {
        TimeDelta(self.0.checked_neg().expect("underflow in -TimeDelta"))
    }
}

impl Mul<i64> for TimeDelta {
    type Output = TimeDelta;

    fn mul(self, rhs: i64) -> Self::Output {
        TimeDelta(
            self.0
                .checked_mul(rhs)
                .expect("overflow in TimeDelta * scalar"),
        )
    }
}

impl MulAssign<i64> for TimeDelta {
    fn mul_assign(&mut self, rhs: i64) {
        self.0 = self
            .0
            .checked_mul(rhs)
            .expect("overflow in TimeDelta *= scalar");
    }
}

impl Div<i64> for TimeDelta {
    type Output = TimeDelta;

    fn div(self, rhs: i64) -> Self::Output {
        TimeDelta(
            self.0
                .checked_div(rhs)
                .expect("div-by-zero or overflow in TimeDelta / scalar"),
        )
    }
}

impl DivAssign<i64> for TimeDelta {
    fn div_assign(&mut self, rhs: i64) {
        self.0 = self
            .0
            .checked_div(rhs)
            .expect("div-by-zero or overflow in TimeDelta /= scalar");
    }
}

impl Zero for TimeDelta {
    #[inline]
    fn zero() -> Self {
        TimeDelta(0)
    }

    #[inline]
    fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl CheckedAdd for TimeDelta {
    fn checked_add(&self, rhs: &Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(TimeDelta)
    }
}

impl CheckedSub for TimeDelta {
    fn checked_sub(&self, rhs: &Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(TimeDelta)
    }
}

impl SaturatingAdd for TimeDelta {
    fn saturating_add(&self, rhs: &Self) -> Self {
        TimeDelta(self.0.saturating_add(rhs.0))
    }
}

impl SaturatingSub for TimeDelta {
    fn saturating_sub(&self, rhs: &Self) -> Self {
        TimeDelta(self.0.saturating_sub(rhs.0))
    }
}

impl Sum for TimeDelta {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + x)
    }
}

impl<'a> Sum<&'a TimeDelta> for TimeDelta {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, x| acc + *x)
    }
}

impl Interval<TimePoint> {
    #[inline]
    pub fn duration(&self) -> TimeDelta {
        self.end() - self.start()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_point_creation() {
        let tp = TimePoint::new(42);
        assert_eq!(tp.value(), 42);
    }

    #[test]
    fn test_time_point_display() {
        assert_eq!(format!("{}", TimePoint::new(42)), "TimePoint(42)");
    }

    #[test]
    fn test_time_interval_duration() {
        let interval = TimeInterval::new(TimePoint::new(10), TimePoint::new(25));
        assert_eq!(interval.duration(), TimeDelta::new(15));
    }

    #[test]
    fn test_timedelta_display() {
        assert_eq!(format!("{}", TimeDelta::new(-10)), "TimeDelta(-10)");
    }

    #[test]
    fn test_timedelta_abs() {
        assert_eq!(TimeDelta::new(-42).abs(), TimeDelta::new(42));
        assert_eq!(TimeDelta::new(42).abs(), TimeDelta::new(42));
    }

    #[test]
    fn test_timedelta_signs() {
        assert!(TimeDelta::new(-1).is_negative());
        assert!(TimeDelta::new(1).is_positive());
        assert!(!TimeDelta::new(0).is_negative());
        assert!(!TimeDelta::new(0).is_positive());
    }

    #[test]
    fn test_timedelta_clamp() {
        let lo = TimeDelta::new(10);
        let hi = TimeDelta::new(20);
        assert_eq!(TimeDelta::new(5).clamp(lo, hi), lo);
        assert_eq!(TimeDelta::new(25).clamp(lo, hi), hi);
        assert_eq!(TimeDelta::new(15).clamp(lo, hi), TimeDelta::new(15));
    }

    #[test]
    fn test_timepoint_add_timedelta() {
        assert_eq!(
            TimePoint::new(10) + TimeDelta::new(5),
            TimePoint::new(15)
        );
    }

    #[test]
    fn test_timepoint_sub_timepoint() {
        assert_eq!(
            TimePoint::new(20) - TimePoint::new(10),
            TimeDelta::new(10)
        );
    }

    #[test]
    fn test_timepoint_span_of() {
        let span = TimePoint::new(10).span_of(TimeDelta::new(5)).unwrap();
        assert_eq!(span.start(), TimePoint::new(10));
        assert_eq!(span.end(), TimePoint::new(15));
        assert!(TimePoint::new(10).span_of(TimeDelta::new(-1)).is_none());
    }

    #[test]
    fn test_timedelta_sum() {
        let total: TimeDelta = [TimeDelta::new(1), TimeDelta::new(2), TimeDelta::new(3)]
            .into_iter()
            .sum();
        assert_eq!(total, TimeDelta::new(6));
    }

    #[test]
    fn test_checked_add_overflow() {
        let tp = TimePoint::new(i64::MAX);
        assert_eq!(tp.checked_add(TimeDelta::new(1)), None);
    }

    #[test]
    fn test_saturating_sub_underflow() {
        let tp = TimePoint::new(i64::MIN + 1);
        assert_eq!(
            tp.saturating_sub(TimeDelta::new(5)),
            TimePoint::new(i64::MIN)
        );
    }

    #[test]
    #[should_panic(expected = "overflow in TimePoint + TimeDelta")]
    fn test_timepoint_add_panic_on_overflow() {
        let _ = TimePoint::new(i64::MAX) + TimeDelta::new(1);
    }

    #[test]
    #[should_panic(expected = "underflow in TimeDelta - TimeDelta")]
    fn test_timedelta_sub_panic_on_underflow() {
        let _ = TimeDelta::new(i64::MIN) - TimeDelta::new(1);
    }
}
