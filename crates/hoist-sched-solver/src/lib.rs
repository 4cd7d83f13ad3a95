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

//! # Two-Phase Hoist Line Scheduler
//!
//! The optimization core for plating/phosphating lines served by overhead
//! transporters. [`phase1`] fixes stations, transporters, and a batch
//! order under averaged transfer times; [`phase2`] retimes everything
//! with exact physics, transporter no-overlap, deadhead, and
//! cross-transporter avoidance; [`retime`] replays the result and rejects
//! any schedule with a residual conflict.
//!
//! [`Scheduler::run`] chains the three over immutable snapshots:
//!
//! ```no_run
//! use hoist_sched_solver::{Scheduler, SchedulerConfig, CancelToken};
//! # fn problem() -> hoist_sched_model::problem::Problem { unimplemented!() }
//! let schedule = Scheduler::run(&problem(), &SchedulerConfig::default(), CancelToken::new())?;
//! println!("makespan: {}", schedule.hoist().makespan());
//! # Ok::<(), hoist_sched_solver::SolveError>(())
//! ```

pub mod config;
pub mod control;
pub mod phase1;
pub mod phase2;
pub mod retime;

pub use config::{Phase1Config, Phase2Config, SchedulerConfig};
pub use control::{CancelToken, SolveOutcome, SolveResult, SolveStats, TerminationReason};

use hoist_sched_model::{
    err::{ErrorKind, ProblemBuildError},
    problem::Problem,
    sol::{ConflictRecord, HoistSchedule, Phase1Schedule},
};
use std::fmt::Display;
use tracing::info;

/// Non-fatal findings reported alongside an accepted schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveWarning {
    /// Phase 1 hit its time limit; its result is feasible but unproven.
    Phase1TimeLimited,
    /// Phase 2 hit its time limit; its result is feasible but unproven.
    Phase2TimeLimited,
}

impl Display for SolveWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveWarning::Phase1TimeLimited => write!(f, "phase 1 suboptimal (time limited)"),
            SolveWarning::Phase2TimeLimited => write!(f, "phase 2 suboptimal (time limited)"),
        }
    }
}

/// Pipeline failure kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveError {
    /// Missing or out-of-domain configuration; fatal, no partial output.
    Config(ProblemBuildError),
    /// No feasible schedule exists; the records name the tightest
    /// batches, stations, and transporters.
    Infeasible(Vec<ConflictRecord>),
    /// Externally cancelled.
    Cancelled,
    /// The replay validator found residual conflicts; the schedule was
    /// rejected and no artifacts survive.
    ValidationRejected(Vec<ConflictRecord>),
}

impl SolveError {
    /// Whether the failure is a configuration problem (as opposed to a
    /// property of the instance or the run).
    pub fn is_config(&self) -> bool {
        matches!(self, SolveError::Config(_))
    }

    /// The configuration error class, when applicable.
    pub fn config_kind(&self) -> Option<ErrorKind> {
        match self {
            SolveError::Config(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl Display for SolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolveError::Config(e) => write!(f, "configuration error: {}", e),
            SolveError::Infeasible(conflicts) => {
                write!(f, "infeasible ({} conflict records)", conflicts.len())
            }
            SolveError::Cancelled => write!(f, "cancelled"),
            SolveError::ValidationRejected(conflicts) => {
                write!(f, "validation rejected ({} conflicts)", conflicts.len())
            }
        }
    }
}

impl std::error::Error for SolveError {}

impl From<ProblemBuildError> for SolveError {
    fn from(value: ProblemBuildError) -> Self {
        SolveError::Config(value)
    }
}

/// An accepted, validated line schedule: the full pipeline output.
#[derive(Debug, Clone, PartialEq)]
pub struct LineSchedule {
    phase1: Phase1Schedule,
    hoist: HoistSchedule,
    warnings: Vec<SolveWarning>,
}

impl LineSchedule {
    /// The Phase-1 station schedule the hoist schedule was built on.
    #[inline]
    pub fn phase1(&self) -> &Phase1Schedule {
        &self.phase1
    }

    /// The validated hoist schedule (state `executed`).
    #[inline]
    pub fn hoist(&self) -> &HoistSchedule {
        &self.hoist
    }

    #[inline]
    pub fn warnings(&self) -> &[SolveWarning] {
        &self.warnings
    }
}

/// The pipeline facade: Phase 1 → Phase 2 → validator.
pub struct Scheduler;

impl Scheduler {
    /// Runs the full pipeline. Solver time limits surface as warnings;
    /// configuration errors, infeasibility, cancellation, and validation
    /// rejections abort.
    pub fn run(
        problem: &Problem,
        config: &SchedulerConfig,
        cancel: CancelToken,
    ) -> Result<LineSchedule, SolveError> {
        let mut warnings = Vec::new();

        let p1 = phase1::solve(
            problem,
            &config.phase1,
            cancel.clone(),
            config.log_search_progress,
        )?;
        if p1.reason() == TerminationReason::Cancelled {
            return Err(SolveError::Cancelled);
        }
        if p1.time_limited() {
            warnings.push(SolveWarning::Phase1TimeLimited);
        }
        let phase1_schedule = match p1.into_result() {
            SolveResult::Optimal(s) | SolveResult::Feasible(s) => s,
            SolveResult::Infeasible(conflicts) => return Err(SolveError::Infeasible(conflicts)),
            SolveResult::Cancelled => return Err(SolveError::Cancelled),
        };
        info!(
            makespan = phase1_schedule.makespan().value(),
            "phase 1 schedule fixed"
        );

        let p2 = phase2::solve(
            problem,
            &phase1_schedule,
            &config.phase2,
            cancel,
            config.log_search_progress,
        )?;
        if p2.reason() == TerminationReason::Cancelled {
            return Err(SolveError::Cancelled);
        }
        if p2.time_limited() {
            warnings.push(SolveWarning::Phase2TimeLimited);
        }
        let hoist = match p2.into_result() {
            SolveResult::Optimal(s) | SolveResult::Feasible(s) => s,
            SolveResult::Infeasible(conflicts) => return Err(SolveError::Infeasible(conflicts)),
            SolveResult::Cancelled => return Err(SolveError::Cancelled),
        };

        let conflicts = retime::validate(problem, &hoist, &config.phase2)?;
        if conflicts.is_empty() {
            let hoist = hoist.into_executed();
            info!(makespan = hoist.makespan().value(), "schedule validated");
            Ok(LineSchedule {
                phase1: phase1_schedule,
                hoist,
                warnings,
            })
        } else {
            let _ = hoist.into_rejected();
            Err(SolveError::ValidationRejected(conflicts))
        }
    }
}
