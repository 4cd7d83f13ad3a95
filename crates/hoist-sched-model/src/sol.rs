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

//! # Schedules, Tasks, and Conflicts
//!
//! The artifacts the phases exchange. A [`Phase1Schedule`] fixes stations,
//! transporters, and averaged times; a [`HoistSchedule`] carries the exact
//! transporter tasks and retimed stage windows; [`ConflictRecord`]s explain
//! a rejected schedule. Each type is immutable once constructed.
//!
//! Export rows (`*Row`) flatten the typed values into primitive fields for
//! serialization, keeping `serde` off the core newtypes.

use crate::id::{BatchId, RecipeId, StageIndex, StationId, TransporterId};
use hoist_sched_core::{
    cost::Cost,
    time::{TimeDelta, TimePoint},
};
use serde::Serialize;
use std::collections::BTreeMap;

/// Lifecycle of a plan artifact.
///
/// Phase-1 output is `Scheduled`, Phase-2 output `Committed`, and the
/// validator moves a committed schedule to `Executed` or `Rejected`.
/// Rejection is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlanState {
    Unplanned,
    Scheduled,
    Committed,
    Executed,
    Rejected,
}

impl PlanState {
    /// Whether the state machine permits `self -> next`.
    pub fn can_advance_to(self, next: PlanState) -> bool {
        matches!(
            (self, next),
            (PlanState::Unplanned, PlanState::Scheduled)
                | (PlanState::Scheduled, PlanState::Committed)
                | (PlanState::Committed, PlanState::Executed)
                | (PlanState::Committed, PlanState::Rejected)
        )
    }

    /// Advances the state machine.
    ///
    /// # Panics
    ///
    /// On a transition the machine does not permit; that is a programmer
    /// error, not an input condition.
    pub fn advance(self, next: PlanState) -> PlanState {
        assert!(
            self.can_advance_to(next),
            "invalid plan state transition {:?} -> {:?}",
            self,
            next
        );
        next
    }
}

impl std::fmt::Display for PlanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PlanState::Unplanned => "unplanned",
            PlanState::Scheduled => "scheduled",
            PlanState::Committed => "committed",
            PlanState::Executed => "executed",
            PlanState::Rejected => "rejected",
        };
        write!(f, "{}", name)
    }
}

/// One processing stage pinned to a station with entry/exit times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageAssignment {
    batch: BatchId,
    recipe: RecipeId,
    stage: StageIndex,
    station: StationId,
    transporter: TransporterId,
    entry: TimePoint,
    exit: TimePoint,
}

impl StageAssignment {
    #[inline]
    #[allow(clippy::too_many_arguments)]
    pub const fn new(
        batch: BatchId,
        recipe: RecipeId,
        stage: StageIndex,
        station: StationId,
        transporter: TransporterId,
        entry: TimePoint,
        exit: TimePoint,
    ) -> Self {
        Self {
            batch,
            recipe,
            stage,
            station,
            transporter,
            entry,
            exit,
        }
    }

    #[inline]
    pub const fn batch(&self) -> BatchId {
        self.batch
    }

    #[inline]
    pub const fn recipe(&self) -> RecipeId {
        self.recipe
    }

    #[inline]
    pub const fn stage(&self) -> StageIndex {
        self.stage
    }

    #[inline]
    pub const fn station(&self) -> StationId {
        self.station
    }

    /// The transporter that carries the batch *into* this stage.
    #[inline]
    pub const fn transporter(&self) -> TransporterId {
        self.transporter
    }

    #[inline]
    pub const fn entry(&self) -> TimePoint {
        self.entry
    }

    #[inline]
    pub const fn exit(&self) -> TimePoint {
        self.exit
    }

    #[inline]
    pub fn processing_time(&self) -> TimeDelta {
        self.exit - self.entry
    }
}

/// Serializable phase-1 schedule row.
#[derive(Debug, Clone, Serialize)]
pub struct Phase1Row {
    pub transporter: u32,
    pub batch: u32,
    pub recipe: u32,
    pub stage: usize,
    pub station: u32,
    pub entry_time: i64,
    pub exit_time: i64,
}

/// Phase-1 output: stations and transporters fixed, times under the
/// averaged-transfer model.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase1Schedule {
    assignments: Vec<StageAssignment>,
    index: BTreeMap<(BatchId, StageIndex), usize>,
    stage0_exit: BTreeMap<BatchId, TimePoint>,
    stage0_station: BTreeMap<BatchId, StationId>,
    batch_order: Vec<BatchId>,
    makespan: TimePoint,
    state: PlanState,
}

impl Phase1Schedule {
    /// Assembles the schedule; assignments are sorted by
    /// `(transporter, exit)` and the batch order is derived from ascending
    /// stage-0 exit times (ties by batch id).
    pub fn new(
        mut assignments: Vec<StageAssignment>,
        stage0_exit: BTreeMap<BatchId, TimePoint>,
        stage0_station: BTreeMap<BatchId, StationId>,
    ) -> Self {
        assignments.sort_by_key(|a| (a.transporter(), a.exit(), a.batch(), a.stage()));
        let index = assignments
            .iter()
            .enumerate()
            .map(|(i, a)| ((a.batch(), a.stage()), i))
            .collect();
        let mut batch_order: Vec<BatchId> = stage0_exit.keys().copied().collect();
        batch_order.sort_by_key(|b| (stage0_exit[b], *b));
        let makespan = assignments
            .iter()
            .map(StageAssignment::exit)
            .chain(stage0_exit.values().copied())
            .max()
            .unwrap_or(TimePoint::zero());
        Self {
            assignments,
            index,
            stage0_exit,
            stage0_station,
            batch_order,
            makespan,
            state: PlanState::Unplanned.advance(PlanState::Scheduled),
        }
    }

    /// Assignments sorted by `(transporter, exit)`; stage 0 excluded.
    #[inline]
    pub fn assignments(&self) -> &[StageAssignment] {
        &self.assignments
    }

    #[inline]
    pub fn assignment(&self, batch: BatchId, stage: StageIndex) -> Option<&StageAssignment> {
        self.index
            .get(&(batch, stage))
            .map(|&i| &self.assignments[i])
    }

    /// Line-entry time per batch (`exit(b, 0)`).
    #[inline]
    pub fn stage0_exit(&self, batch: BatchId) -> Option<TimePoint> {
        self.stage0_exit.get(&batch).copied()
    }

    /// Loading station per batch (the stage-0 station).
    #[inline]
    pub fn stage0_station(&self, batch: BatchId) -> Option<StationId> {
        self.stage0_station.get(&batch).copied()
    }

    /// Batches by ascending line-entry time.
    #[inline]
    pub fn batch_order(&self) -> &[BatchId] {
        &self.batch_order
    }

    #[inline]
    pub fn makespan(&self) -> TimePoint {
        self.makespan
    }

    #[inline]
    pub fn state(&self) -> PlanState {
        self.state
    }

    /// Export rows in `(transporter, exit_time)` order.
    pub fn rows(&self) -> Vec<Phase1Row> {
        self.assignments
            .iter()
            .map(|a| Phase1Row {
                transporter: a.transporter().value(),
                batch: a.batch().value(),
                recipe: a.recipe().value(),
                stage: a.stage().value(),
                station: a.station().value(),
                entry_time: a.entry().value(),
                exit_time: a.exit().value(),
            })
            .collect()
    }
}

/// One loaded move of a transporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransporterTask {
    transporter: TransporterId,
    batch: BatchId,
    stage: StageIndex,
    from: StationId,
    to: StationId,
    start: TimePoint,
    end: TimePoint,
}

impl TransporterTask {
    #[inline]
    pub const fn new(
        transporter: TransporterId,
        batch: BatchId,
        stage: StageIndex,
        from: StationId,
        to: StationId,
        start: TimePoint,
        end: TimePoint,
    ) -> Self {
        Self {
            transporter,
            batch,
            stage,
            from,
            to,
            start,
            end,
        }
    }

    #[inline]
    pub const fn transporter(&self) -> TransporterId {
        self.transporter
    }

    #[inline]
    pub const fn batch(&self) -> BatchId {
        self.batch
    }

    /// The stage this move delivers into.
    #[inline]
    pub const fn stage(&self) -> StageIndex {
        self.stage
    }

    #[inline]
    pub const fn from(&self) -> StationId {
        self.from
    }

    #[inline]
    pub const fn to(&self) -> StationId {
        self.to
    }

    #[inline]
    pub const fn start(&self) -> TimePoint {
        self.start
    }

    #[inline]
    pub const fn end(&self) -> TimePoint {
        self.end
    }

    #[inline]
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Serializable phase-2 hoist schedule row.
#[derive(Debug, Clone, Serialize)]
pub struct HoistRow {
    pub transporter: u32,
    pub batch: u32,
    pub from_station: u32,
    pub to_station: u32,
    pub task_start: i64,
    pub task_end: i64,
    pub duration: i64,
    pub entry_time_to: i64,
}

/// Phase-2 output: exact transporter tasks plus the retimed stage windows.
#[derive(Debug, Clone, PartialEq)]
pub struct HoistSchedule {
    tasks: Vec<TransporterTask>,
    stage_times: BTreeMap<(BatchId, StageIndex), (TimePoint, TimePoint)>,
    stage0_exit: BTreeMap<BatchId, TimePoint>,
    makespan: TimePoint,
    total_deadhead: Cost,
    total_stretch: Cost,
    state: PlanState,
}

impl HoistSchedule {
    pub fn new(
        mut tasks: Vec<TransporterTask>,
        stage_times: BTreeMap<(BatchId, StageIndex), (TimePoint, TimePoint)>,
        stage0_exit: BTreeMap<BatchId, TimePoint>,
        total_deadhead: Cost,
        total_stretch: Cost,
    ) -> Self {
        tasks.sort_by_key(|t| (t.transporter(), t.start(), t.batch()));
        let makespan = stage_times
            .values()
            .map(|&(_, exit)| exit)
            .max()
            .unwrap_or(TimePoint::zero());
        Self {
            tasks,
            stage_times,
            stage0_exit,
            makespan,
            total_deadhead,
            total_stretch,
            state: PlanState::Unplanned
                .advance(PlanState::Scheduled)
                .advance(PlanState::Committed),
        }
    }

    /// Tasks sorted by `(transporter, start)`.
    #[inline]
    pub fn tasks(&self) -> &[TransporterTask] {
        &self.tasks
    }

    #[inline]
    pub fn entry(&self, batch: BatchId, stage: StageIndex) -> Option<TimePoint> {
        self.stage_times.get(&(batch, stage)).map(|&(e, _)| e)
    }

    #[inline]
    pub fn exit(&self, batch: BatchId, stage: StageIndex) -> Option<TimePoint> {
        self.stage_times.get(&(batch, stage)).map(|&(_, x)| x)
    }

    /// `CalcTime(b, s) = exit - entry` for a processing stage.
    #[inline]
    pub fn calc_time(&self, batch: BatchId, stage: StageIndex) -> Option<TimeDelta> {
        self.stage_times
            .get(&(batch, stage))
            .map(|&(e, x)| x - e)
    }

    /// The optimized per-stage processing times of one batch, ascending by
    /// stage.
    pub fn optimized_recipe(&self, batch: BatchId) -> Vec<(StageIndex, TimeDelta)> {
        self.stage_times
            .range((batch, StageIndex::new(0))..=(batch, StageIndex::new(usize::MAX)))
            .map(|(&(_, stage), &(e, x))| (stage, x - e))
            .collect()
    }

    /// Optimized line-entry time per batch (`exit₂(b, 0)`).
    #[inline]
    pub fn start_times(&self) -> &BTreeMap<BatchId, TimePoint> {
        &self.stage0_exit
    }

    #[inline]
    pub fn start_of(&self, batch: BatchId) -> Option<TimePoint> {
        self.stage0_exit.get(&batch).copied()
    }

    #[inline]
    pub fn makespan(&self) -> TimePoint {
        self.makespan
    }

    #[inline]
    pub fn total_deadhead(&self) -> Cost {
        self.total_deadhead
    }

    #[inline]
    pub fn total_stretch(&self) -> Cost {
        self.total_stretch
    }

    #[inline]
    pub fn state(&self) -> PlanState {
        self.state
    }

    /// Marks the schedule as validated.
    pub fn into_executed(mut self) -> Self {
        self.state = self.state.advance(PlanState::Executed);
        self
    }

    /// Marks the schedule as rejected by the validator. Terminal.
    pub fn into_rejected(mut self) -> Self {
        self.state = self.state.advance(PlanState::Rejected);
        self
    }

    /// Export rows in `(transporter, task_start)` order.
    pub fn rows(&self) -> Vec<HoistRow> {
        self.tasks
            .iter()
            .map(|t| HoistRow {
                transporter: t.transporter().value(),
                batch: t.batch().value(),
                from_station: t.from().value(),
                to_station: t.to().value(),
                task_start: t.start().value(),
                task_end: t.end().value(),
                duration: t.duration().value(),
                entry_time_to: t.end().value(),
            })
            .collect()
    }
}

/// What a conflict record is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ConflictKind {
    StationDoubleBook,
    ChangeTimeViolation,
    TransporterOverlap,
    DeadheadShort,
    AvoidViolation,
    TimingMismatch,
}

impl std::fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConflictKind::StationDoubleBook => "station_double_book",
            ConflictKind::ChangeTimeViolation => "change_time_violation",
            ConflictKind::TransporterOverlap => "transporter_overlap",
            ConflictKind::DeadheadShort => "deadhead_short",
            ConflictKind::AvoidViolation => "avoid_violation",
            ConflictKind::TimingMismatch => "timing_mismatch",
        };
        write!(f, "{}", name)
    }
}

/// One validator finding: the offending entities plus the observed and
/// required gaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRecord {
    kind: ConflictKind,
    batches: Vec<BatchId>,
    stages: Vec<StageIndex>,
    stations: Vec<StationId>,
    transporters: Vec<TransporterId>,
    observed_gap: TimeDelta,
    required_gap: TimeDelta,
}

impl ConflictRecord {
    pub fn new(
        kind: ConflictKind,
        batches: Vec<BatchId>,
        stages: Vec<StageIndex>,
        stations: Vec<StationId>,
        transporters: Vec<TransporterId>,
        observed_gap: TimeDelta,
        required_gap: TimeDelta,
    ) -> Self {
        Self {
            kind,
            batches,
            stages,
            stations,
            transporters,
            observed_gap,
            required_gap,
        }
    }

    #[inline]
    pub fn kind(&self) -> ConflictKind {
        self.kind
    }

    #[inline]
    pub fn batches(&self) -> &[BatchId] {
        &self.batches
    }

    #[inline]
    pub fn stages(&self) -> &[StageIndex] {
        &self.stages
    }

    #[inline]
    pub fn stations(&self) -> &[StationId] {
        &self.stations
    }

    #[inline]
    pub fn transporters(&self) -> &[TransporterId] {
        &self.transporters
    }

    #[inline]
    pub fn observed_gap(&self) -> TimeDelta {
        self.observed_gap
    }

    #[inline]
    pub fn required_gap(&self) -> TimeDelta {
        self.required_gap
    }

    /// Flattens into a serializable row.
    pub fn to_row(&self) -> ConflictRow {
        ConflictRow {
            kind: self.kind.to_string(),
            batches: self.batches.iter().map(|b| b.value()).collect(),
            stages: self.stages.iter().map(|s| s.value()).collect(),
            stations: self.stations.iter().map(|s| s.value()).collect(),
            transporters: self.transporters.iter().map(|t| t.value()).collect(),
            observed_gap_s: self.observed_gap.value(),
            required_gap_s: self.required_gap.value(),
        }
    }
}

impl std::fmt::Display for ConflictRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: batches {:?}, observed gap {}s, required {}s",
            self.kind,
            self.batches.iter().map(|b| b.value()).collect::<Vec<_>>(),
            self.observed_gap.value(),
            self.required_gap.value()
        )
    }
}

/// Serializable conflict row.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictRow {
    pub kind: String,
    pub batches: Vec<u32>,
    pub stages: Vec<usize>,
    pub stations: Vec<u32>,
    pub transporters: Vec<u32>,
    pub observed_gap_s: i64,
    pub required_gap_s: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_state_happy_path() {
        let state = PlanState::Unplanned
            .advance(PlanState::Scheduled)
            .advance(PlanState::Committed)
            .advance(PlanState::Executed);
        assert_eq!(state, PlanState::Executed);
    }

    #[test]
    fn test_plan_state_rejection_terminal() {
        let state = PlanState::Unplanned
            .advance(PlanState::Scheduled)
            .advance(PlanState::Committed)
            .advance(PlanState::Rejected);
        assert!(!state.can_advance_to(PlanState::Executed));
        assert!(!state.can_advance_to(PlanState::Scheduled));
    }

    #[test]
    #[should_panic(expected = "invalid plan state transition")]
    fn test_plan_state_invalid_transition_panics() {
        let _ = PlanState::Unplanned.advance(PlanState::Committed);
    }

    fn assignment(
        batch: u32,
        stage: usize,
        transporter: u32,
        entry: i64,
        exit: i64,
    ) -> StageAssignment {
        StageAssignment::new(
            BatchId::new(batch),
            RecipeId::new(1),
            StageIndex::new(stage),
            StationId::new(300 + stage as u32),
            TransporterId::new(transporter),
            TimePoint::new(entry),
            TimePoint::new(exit),
        )
    }

    #[test]
    fn test_phase1_schedule_sorting_and_order() {
        let mut stage0 = BTreeMap::new();
        stage0.insert(BatchId::new(1), TimePoint::new(10));
        stage0.insert(BatchId::new(2), TimePoint::new(0));
        let schedule = Phase1Schedule::new(
            vec![
                assignment(1, 1, 1, 48, 648),
                assignment(2, 1, 1, 38, 638),
            ],
            stage0,
            BTreeMap::new(),
        );
        // Sorted by (transporter, exit): batch 2 first.
        assert_eq!(schedule.assignments()[0].batch(), BatchId::new(2));
        // Batch order by stage-0 exit: batch 2 entered first.
        assert_eq!(schedule.batch_order(), &[BatchId::new(2), BatchId::new(1)]);
        assert_eq!(schedule.makespan(), TimePoint::new(648));
        assert_eq!(schedule.state(), PlanState::Scheduled);
    }

    #[test]
    fn test_phase1_rows_flatten() {
        let mut stage0 = BTreeMap::new();
        stage0.insert(BatchId::new(1), TimePoint::new(0));
        let schedule =
            Phase1Schedule::new(vec![assignment(1, 1, 1, 38, 638)], stage0, BTreeMap::new());
        let rows = schedule.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].station, 301);
        assert_eq!(rows[0].entry_time, 38);
        assert_eq!(rows[0].exit_time, 638);
    }

    fn task(transporter: u32, batch: u32, stage: usize, start: i64, end: i64) -> TransporterTask {
        TransporterTask::new(
            TransporterId::new(transporter),
            BatchId::new(batch),
            StageIndex::new(stage),
            StationId::new(301),
            StationId::new(302),
            TimePoint::new(start),
            TimePoint::new(end),
        )
    }

    #[test]
    fn test_hoist_schedule_accessors() {
        let mut stage_times = BTreeMap::new();
        stage_times.insert(
            (BatchId::new(1), StageIndex::new(1)),
            (TimePoint::new(38), TimePoint::new(638)),
        );
        let mut stage0 = BTreeMap::new();
        stage0.insert(BatchId::new(1), TimePoint::new(0));
        let schedule = HoistSchedule::new(
            vec![task(1, 1, 1, 0, 38)],
            stage_times,
            stage0,
            Cost::new(9),
            Cost::zero(),
        );
        assert_eq!(
            schedule.calc_time(BatchId::new(1), StageIndex::new(1)),
            Some(TimeDelta::new(600))
        );
        assert_eq!(schedule.makespan(), TimePoint::new(638));
        assert_eq!(schedule.total_deadhead(), Cost::new(9));
        assert_eq!(schedule.state(), PlanState::Committed);
        assert_eq!(schedule.start_of(BatchId::new(1)), Some(TimePoint::new(0)));

        let rows = schedule.rows();
        assert_eq!(rows[0].duration, 38);
        assert_eq!(rows[0].entry_time_to, 38);
    }

    #[test]
    fn test_hoist_schedule_state_transitions() {
        let schedule = HoistSchedule::new(
            Vec::new(),
            BTreeMap::new(),
            BTreeMap::new(),
            Cost::zero(),
            Cost::zero(),
        );
        assert_eq!(schedule.clone().into_executed().state(), PlanState::Executed);
        assert_eq!(schedule.into_rejected().state(), PlanState::Rejected);
    }

    #[test]
    fn test_optimized_recipe_ascending() {
        let mut stage_times = BTreeMap::new();
        for (stage, entry, exit) in [(1usize, 38, 638), (2, 676, 676)] {
            stage_times.insert(
                (BatchId::new(1), StageIndex::new(stage)),
                (TimePoint::new(entry), TimePoint::new(exit)),
            );
        }
        let schedule = HoistSchedule::new(
            Vec::new(),
            stage_times,
            BTreeMap::new(),
            Cost::zero(),
            Cost::zero(),
        );
        let recipe = schedule.optimized_recipe(BatchId::new(1));
        assert_eq!(
            recipe,
            vec![
                (StageIndex::new(1), TimeDelta::new(600)),
                (StageIndex::new(2), TimeDelta::new(0)),
            ]
        );
    }

    #[test]
    fn test_conflict_record_row() {
        let record = ConflictRecord::new(
            ConflictKind::ChangeTimeViolation,
            vec![BatchId::new(1), BatchId::new(2)],
            vec![StageIndex::new(1)],
            vec![StationId::new(302)],
            vec![],
            TimeDelta::new(10),
            TimeDelta::new(56),
        );
        let row = record.to_row();
        assert_eq!(row.kind, "change_time_violation");
        assert_eq!(row.batches, vec![1, 2]);
        assert_eq!(row.observed_gap_s, 10);
        assert_eq!(row.required_gap_s, 56);
    }
}
