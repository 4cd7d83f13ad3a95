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

//! # Domain Model for the Hoist Line Scheduler
//!
//! Everything the two optimization phases consume and produce:
//!
//! - **Reference data**: stations along the rail, transporters with their
//!   kinematic envelopes, recipes (ordered processing stages with station
//!   sets and duration windows), and batches.
//! - **Kinematics**: the trapezoidal/triangular travel profile and the
//!   two-speed hoist lift/sink model, rounded up to whole seconds.
//! - **Preprocessing**: the transfer-time table over every reachable
//!   station pair per transporter, the derived average task time and
//!   station change time, and recipe-identity batch grouping.
//! - **Solutions**: the phase-1 station schedule, the phase-2 hoist task
//!   schedule, optimized per-stage processing times, and the conflict
//!   records a rejected schedule carries.
//!
//! Reference data is validated once, when a [`problem::Problem`] snapshot
//! is built, and is immutable afterwards. Schedules are immutable once
//! produced; each phase replaces its predecessor's output wholesale.

pub mod err;
pub mod id;
pub mod kinematics;
pub mod model;
pub mod problem;
pub mod sol;
pub mod transfer;

pub mod prelude {
    //! Convenience re-exports for downstream crates.
    pub use crate::err::{ErrorKind, ProblemBuildError};
    pub use crate::id::{BatchId, GroupId, RecipeId, StageIndex, StationId, TransporterId};
    pub use crate::kinematics::{AxisKinematics, HoistKinematics};
    pub use crate::model::{Batch, Recipe, RecipeStage, Station, StationSpan, Transporter};
    pub use crate::problem::Problem;
    pub use crate::sol::{
        ConflictKind, ConflictRecord, HoistSchedule, Phase1Schedule, PlanState, StageAssignment,
        TransporterTask,
    };
    pub use crate::transfer::{TransferTable, TransferTask};
}
