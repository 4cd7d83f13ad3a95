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

//! # Core Primitives for the Hoist Line Scheduler
//!
//! Strongly typed foundations for the two domains the scheduler reasons
//! about: **time** (integer seconds from the line start at `t = 0`) and
//! **space** (integer millimetres along the transporter rail).
//!
//! - `TimePoint` / `TimeDelta` / `TimeInterval`: instants, durations, and
//!   half-open spans on the schedule timeline.
//! - `SpacePosition` / `SpaceLength` / `SpaceInterval`: rail coordinates,
//!   distances, and traversal spans.
//! - `Cost`: objective magnitudes (deadhead sums, stretch sums).
//!
//! The newtypes make unit mistakes unrepresentable (a `TimePoint` cannot be
//! added to a `TimePoint`, a rail coordinate cannot be mistaken for a
//! duration). Arithmetic is checked: plain operators panic on overflow,
//! `checked_*`/`saturating_*` variants are available where a caller wants
//! to handle the edge itself.

pub mod cost;
pub mod primitives;
pub mod space;
pub mod time;
