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

//! # Transporter Kinematics
//!
//! Deterministic travel-time computation for transporter motion.
//!
//! Horizontal travel follows a trapezoidal velocity profile — accelerate to
//! `v_max`, cruise, decelerate — degrading to a triangular profile when the
//! distance is too short to reach `v_max`. Vertical (hoist) motion uses a
//! two-speed profile: a slow zone near the liquid surface and a fast zone
//! above it; lifting additionally crawls through a slow end zone at the top
//! of the stroke.
//!
//! Every kinematic phase — ramp, cruise, each hoist leg — is rounded
//! **up** to the next whole second before the phases are summed, the same
//! convention the plant's tabulated transfer matrices use. That rounding
//! is the single source of conservatism in the scheduler and keeps all
//! downstream arithmetic in integers.

use hoist_sched_core::{space::SpaceLength, time::TimeDelta};

/// Rounds one phase's fractional second count up to a whole-second delta.
#[inline]
fn ceil_seconds(seconds: f64) -> TimeDelta {
    TimeDelta::new(seconds.ceil() as i64)
}

/// Horizontal-axis motion parameters of a transporter.
///
/// Speeds are mm/s, accelerations mm/s². All three must be positive;
/// [`crate::problem::Problem`] rejects anything else at build time, so the
/// profile evaluation itself is total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisKinematics {
    v_max: f64,
    a_accel: f64,
    a_decel: f64,
}

impl AxisKinematics {
    #[inline]
    pub const fn new(v_max: f64, a_accel: f64, a_decel: f64) -> Self {
        Self {
            v_max,
            a_accel,
            a_decel,
        }
    }

    #[inline]
    pub const fn v_max(&self) -> f64 {
        self.v_max
    }

    #[inline]
    pub const fn a_accel(&self) -> f64 {
        self.a_accel
    }

    #[inline]
    pub const fn a_decel(&self) -> f64 {
        self.a_decel
    }

    /// Point-to-point travel time over `distance`, each profile phase
    /// rounded up to whole seconds. Zero distance is zero time.
    ///
    /// With `d_a = ½·v²/a_accel` and `d_d = ½·v²/a_decel`:
    /// - trapezoidal (`d >= d_a + d_d`):
    ///   `t = ⌈v/a_accel⌉ + ⌈(d − d_a − d_d)/v⌉ + ⌈v/a_decel⌉`
    /// - triangular otherwise, with the peak speed solving
    ///   `v_p²/(2·a_accel) + v_p²/(2·a_decel) = d` and both ramps
    ///   rounded up.
    pub fn travel_time(&self, distance: SpaceLength) -> TimeDelta {
        let d = distance.value() as f64;
        if d <= 0.0 {
            return TimeDelta::zero();
        }

        let v = self.v_max;
        let d_accel = 0.5 * v * v / self.a_accel;
        let d_decel = 0.5 * v * v / self.a_decel;

        if d >= d_accel + d_decel {
            ceil_seconds(v / self.a_accel)
                + ceil_seconds((d - d_accel - d_decel) / v)
                + ceil_seconds(v / self.a_decel)
        } else {
            let v_peak =
                (2.0 * d * self.a_accel * self.a_decel / (self.a_accel + self.a_decel)).sqrt();
            ceil_seconds(v_peak / self.a_accel) + ceil_seconds(v_peak / self.a_decel)
        }
    }
}

/// Vertical (hoist) motion parameters of a transporter.
///
/// Distances are millimetres of stroke, speeds mm/s. `z_slow_lift` is the
/// slow zone traversed when pulling a rack out of the liquid (dry side),
/// `z_slow_sink` when lowering it in (wet side), and `z_slow_end` the crawl
/// zone at the top of the lifting stroke.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoistKinematics {
    z_total: SpaceLength,
    z_slow_lift: SpaceLength,
    z_slow_sink: SpaceLength,
    z_slow_end: SpaceLength,
    v_slow: f64,
    v_fast: f64,
}

impl HoistKinematics {
    #[inline]
    pub const fn new(
        z_total: SpaceLength,
        z_slow_lift: SpaceLength,
        z_slow_sink: SpaceLength,
        z_slow_end: SpaceLength,
        v_slow: f64,
        v_fast: f64,
    ) -> Self {
        Self {
            z_total,
            z_slow_lift,
            z_slow_sink,
            z_slow_end,
            v_slow,
            v_fast,
        }
    }

    #[inline]
    pub const fn z_total(&self) -> SpaceLength {
        self.z_total
    }

    #[inline]
    pub const fn v_slow(&self) -> f64 {
        self.v_slow
    }

    #[inline]
    pub const fn v_fast(&self) -> f64 {
        self.v_fast
    }

    #[inline]
    fn clamped(&self, zone: SpaceLength) -> f64 {
        (zone.value().max(0) as f64).min(self.z_total.value() as f64)
    }

    /// Time to raise a rack out of a station: slow through the dry zone,
    /// fast through the middle, slow through the end zone, each leg
    /// rounded up.
    pub fn lift_time(&self) -> TimeDelta {
        let slow_dry = self.clamped(self.z_slow_lift);
        let slow_end = self.clamped(self.z_slow_end);
        let fast = (self.z_total.value() as f64 - slow_dry - slow_end).max(0.0);
        ceil_seconds(slow_dry / self.v_slow)
            + ceil_seconds(fast / self.v_fast)
            + ceil_seconds(slow_end / self.v_slow)
    }

    /// Time to lower a rack into a station: fast down, slow through the wet
    /// zone, each leg rounded up.
    pub fn sink_time(&self) -> TimeDelta {
        let slow = self.clamped(self.z_slow_sink);
        let fast = (self.z_total.value() as f64 - slow).max(0.0);
        ceil_seconds(fast / self.v_fast) + ceil_seconds(slow / self.v_slow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis() -> AxisKinematics {
        // 300 mm/s cruise, 500 mm/s² ramps: ramp distance 90 mm each side.
        AxisKinematics::new(300.0, 500.0, 500.0)
    }

    #[test]
    fn test_travel_zero_distance() {
        assert_eq!(axis().travel_time(SpaceLength::zero()), TimeDelta::zero());
    }

    #[test]
    fn test_travel_trapezoidal() {
        // 1000 mm: ceil(0.6) + ceil(820/300) + ceil(0.6) = 1 + 3 + 1 = 5 s
        assert_eq!(
            axis().travel_time(SpaceLength::new(1000)),
            TimeDelta::new(5)
        );
        // 2000 mm: ceil(0.6) + ceil(1820/300) + ceil(0.6) = 1 + 7 + 1 = 9 s
        assert_eq!(
            axis().travel_time(SpaceLength::new(2000)),
            TimeDelta::new(9)
        );
    }

    #[test]
    fn test_travel_triangular() {
        // 100 mm < 180 mm ramp distance: v_peak = sqrt(100 * 500) ~ 223.6,
        // ramps ceil(0.447) each -> 2 s
        assert_eq!(axis().travel_time(SpaceLength::new(100)), TimeDelta::new(2));
    }

    #[test]
    fn test_travel_asymmetric_ramps() {
        // accel 500, decel 250: ramp distances 90 + 180 = 270 mm.
        let axis = AxisKinematics::new(300.0, 500.0, 250.0);
        // 1000 mm trapezoidal: ceil(0.6) + ceil(730/300) + ceil(1.2)
        //   = 1 + 3 + 2 = 6 s
        assert_eq!(axis.travel_time(SpaceLength::new(1000)), TimeDelta::new(6));
    }

    #[test]
    fn test_travel_monotone_in_distance() {
        let axis = axis();
        let mut prev = TimeDelta::zero();
        for d in (0..5000).step_by(250) {
            let t = axis.travel_time(SpaceLength::new(d));
            assert!(t >= prev, "travel time decreased at {} mm", d);
            prev = t;
        }
    }

    fn hoist() -> HoistKinematics {
        HoistKinematics::new(
            SpaceLength::new(2000),
            SpaceLength::new(200),
            SpaceLength::new(400),
            SpaceLength::new(100),
            50.0,
            250.0,
        )
    }

    #[test]
    fn test_lift_time() {
        // dry 200 mm at 50 mm/s + fast 1700 mm at 250 mm/s + end 100 mm
        // at 50 mm/s = 4 + ceil(6.8) + 2 -> 13 s
        assert_eq!(hoist().lift_time(), TimeDelta::new(13));
    }

    #[test]
    fn test_sink_time() {
        // fast 1600 mm at 250 mm/s + wet 400 mm at 50 mm/s
        //   = ceil(6.4) + 8 -> 15 s
        assert_eq!(hoist().sink_time(), TimeDelta::new(15));
    }

    #[test]
    fn test_hoist_profile_of_the_tabulated_line() {
        // The profile behind the plant's 17 s lift / 16 s sink entries:
        // 400 mm dry zone, 150 mm end crawl, 500 mm wet zone over a
        // 2000 mm stroke at 50 / 250 mm/s.
        let h = HoistKinematics::new(
            SpaceLength::new(2000),
            SpaceLength::new(400),
            SpaceLength::new(500),
            SpaceLength::new(150),
            50.0,
            250.0,
        );
        // 8 + ceil(1450/250) + 3 = 8 + 6 + 3
        assert_eq!(h.lift_time(), TimeDelta::new(17));
        // ceil(1500/250) + 10 = 6 + 10
        assert_eq!(h.sink_time(), TimeDelta::new(16));
    }

    #[test]
    fn test_slow_zones_clamped_to_stroke() {
        let h = HoistKinematics::new(
            SpaceLength::new(1000),
            SpaceLength::new(5000),
            SpaceLength::new(5000),
            SpaceLength::zero(),
            50.0,
            250.0,
        );
        // The whole stroke is slow: 1000 / 50 = 20 s either way.
        assert_eq!(h.lift_time(), TimeDelta::new(20));
        assert_eq!(h.sink_time(), TimeDelta::new(20));
    }
}
