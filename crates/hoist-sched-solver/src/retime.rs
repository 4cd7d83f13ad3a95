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

//! # Retimer / Validator
//!
//! Replays a committed hoist schedule against exact physics and emits a
//! conflict record for every divergence: task durations that disagree
//! with the transfer table, stage entries that do not coincide with their
//! delivering task, processing times outside their windows, station
//! double-bookings or change-time shortfalls, transporter overlaps or
//! missing deadhead, and cross-transporter avoidance violations.
//!
//! An empty conflict list promotes the schedule to `executed`; anything
//! else rejects it, and no artifacts survive.

use crate::config::Phase2Config;
use hoist_sched_core::{
    space::SpaceInterval,
    time::{TimeDelta, TimePoint},
};
use hoist_sched_model::{
    err::ProblemBuildError,
    id::{BatchId, StageIndex},
    problem::Problem,
    sol::{ConflictKind, ConflictRecord, HoistSchedule, TransporterTask},
};
use std::collections::BTreeMap;

/// Replays `schedule` and returns every conflict found. An empty vector
/// means the schedule is accepted.
pub fn validate(
    problem: &Problem,
    schedule: &HoistSchedule,
    config: &Phase2Config,
) -> Result<Vec<ConflictRecord>, ProblemBuildError> {
    let mut conflicts = Vec::new();
    let tasks = schedule.tasks();

    check_transporter_sequences(problem, tasks, &mut conflicts)?;
    check_stage_replay(problem, schedule, &mut conflicts);
    check_station_exclusivity(problem, schedule, &mut conflicts);
    check_avoidance(problem, config, tasks, &mut conflicts);

    Ok(conflicts)
}

/// Per-transporter replay: exact durations, no overlap, full deadhead.
fn check_transporter_sequences(
    problem: &Problem,
    tasks: &[TransporterTask],
    conflicts: &mut Vec<ConflictRecord>,
) -> Result<(), ProblemBuildError> {
    let transfer = problem.transfer();
    for task in tasks {
        let expected = transfer
            .lookup(task.transporter(), task.from(), task.to())?
            .total();
        if task.duration() != expected {
            conflicts.push(ConflictRecord::new(
                ConflictKind::TimingMismatch,
                vec![task.batch()],
                vec![task.stage()],
                vec![task.from(), task.to()],
                vec![task.transporter()],
                task.duration(),
                expected,
            ));
        }
    }

    for pair in tasks.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if prev.transporter() != next.transporter() {
            continue;
        }
        let observed = next.start() - prev.end();
        if observed.is_negative() {
            conflicts.push(ConflictRecord::new(
                ConflictKind::TransporterOverlap,
                vec![prev.batch(), next.batch()],
                vec![prev.stage(), next.stage()],
                vec![prev.to(), next.from()],
                vec![prev.transporter()],
                observed,
                TimeDelta::zero(),
            ));
            continue;
        }
        let deadhead = transfer
            .lookup(prev.transporter(), prev.to(), next.from())?
            .transfer();
        if observed < deadhead {
            conflicts.push(ConflictRecord::new(
                ConflictKind::DeadheadShort,
                vec![prev.batch(), next.batch()],
                vec![prev.stage(), next.stage()],
                vec![prev.to(), next.from()],
                vec![prev.transporter()],
                observed,
                deadhead,
            ));
        }
    }
    Ok(())
}

/// Stage bookkeeping: every entry coincides with its delivering task,
/// every exit with the departing task, every processing time within its
/// recipe window.
fn check_stage_replay(
    problem: &Problem,
    schedule: &HoistSchedule,
    conflicts: &mut Vec<ConflictRecord>,
) {
    // (batch, delivered stage) -> task
    let mut by_stage: BTreeMap<(BatchId, StageIndex), &TransporterTask> = BTreeMap::new();
    for task in schedule.tasks() {
        by_stage.insert((task.batch(), task.stage()), task);
    }

    for (&(batch, stage), task) in &by_stage {
        let mismatch = |observed: TimeDelta, required: TimeDelta| {
            ConflictRecord::new(
                ConflictKind::TimingMismatch,
                vec![batch],
                vec![stage],
                vec![task.to()],
                vec![task.transporter()],
                observed,
                required,
            )
        };

        let Some(entry) = schedule.entry(batch, stage) else {
            conflicts.push(mismatch(TimeDelta::zero(), TimeDelta::zero()));
            continue;
        };
        if entry != task.end() {
            conflicts.push(mismatch(entry - task.end(), TimeDelta::zero()));
        }

        // The preceding stage must release exactly at this task's start.
        if let Some(prev_stage) = stage.prev() {
            let released = if prev_stage.is_entry() {
                schedule.start_of(batch)
            } else {
                schedule.exit(batch, prev_stage)
            };
            match released {
                Some(t) if t == task.start() => {}
                Some(t) => conflicts.push(mismatch(task.start() - t, TimeDelta::zero())),
                None => conflicts.push(mismatch(TimeDelta::zero(), TimeDelta::zero())),
            }
        }

        // Processing window of the delivered stage.
        let batch_ref = problem.batch(batch);
        let window = batch_ref
            .map(|b| problem.recipe_of(b))
            .and_then(|r| r.stage(stage))
            .map(|s| (s.min_time(), s.max_time()));
        if let (Some((min_time, max_time)), Some(calc)) =
            (window, schedule.calc_time(batch, stage))
        {
            if calc < min_time || calc > max_time {
                conflicts.push(ConflictRecord::new(
                    ConflictKind::TimingMismatch,
                    vec![batch],
                    vec![stage],
                    vec![task.to()],
                    vec![task.transporter()],
                    calc,
                    min_time,
                ));
            }
        }
    }
}

/// Pairwise station exclusivity with the change-time gap; the virtual
/// stage 0 is exempt.
fn check_station_exclusivity(
    problem: &Problem,
    schedule: &HoistSchedule,
    conflicts: &mut Vec<ConflictRecord>,
) {
    let change = problem.change_time();
    // station -> [(entry, exit, batch, stage)]
    let mut occupancy: BTreeMap<_, Vec<(TimePoint, TimePoint, BatchId, StageIndex)>> =
        BTreeMap::new();
    for task in schedule.tasks() {
        let batch = task.batch();
        let stage = task.stage();
        let (Some(entry), Some(exit)) =
            (schedule.entry(batch, stage), schedule.exit(batch, stage))
        else {
            continue;
        };
        occupancy
            .entry(task.to())
            .or_default()
            .push((entry, exit, batch, stage));
    }

    for (&station, slots) in &occupancy {
        for i in 0..slots.len() {
            for j in (i + 1)..slots.len() {
                let (e1, x1, b1, s1) = slots[i];
                let (e2, x2, b2, s2) = slots[j];
                if b1 == b2 {
                    continue;
                }
                // Order by exit; the later entrant owes the change gap.
                let ((xa, ba, sa), (eb, bb, sb)) = if x1 <= x2 {
                    ((x1, b1, s1), (e2, b2, s2))
                } else {
                    ((x2, b2, s2), (e1, b1, s1))
                };
                let observed = eb - xa;
                if observed.is_negative() {
                    conflicts.push(ConflictRecord::new(
                        ConflictKind::StationDoubleBook,
                        vec![ba, bb],
                        vec![sa, sb],
                        vec![station],
                        vec![],
                        observed,
                        TimeDelta::zero(),
                    ));
                } else if observed < change {
                    conflicts.push(ConflictRecord::new(
                        ConflictKind::ChangeTimeViolation,
                        vec![ba, bb],
                        vec![sa, sb],
                        vec![station],
                        vec![],
                        observed,
                        change,
                    ));
                }
            }
        }
    }
}

/// Cross-transporter spatial-temporal separation. Applicability is gated
/// by the transporters' avoid limits; the required gap is the configured
/// base margin plus the optional per-millimetre term.
fn check_avoidance(
    problem: &Problem,
    config: &Phase2Config,
    tasks: &[TransporterTask],
    conflicts: &mut Vec<ConflictRecord>,
) {
    let limit_of = |task: &TransporterTask| {
        problem
            .transporter(task.transporter())
            .and_then(|t| t.avoid_limit())
            .unwrap_or(hoist_sched_core::space::SpaceLength::zero())
    };
    let span_of = |task: &TransporterTask| {
        SpaceInterval::new(
            problem.position_of(task.from()),
            problem.position_of(task.to()),
        )
    };

    for i in 0..tasks.len() {
        for j in (i + 1)..tasks.len() {
            let (a, b) = (&tasks[i], &tasks[j]);
            if a.transporter() == b.transporter() {
                continue;
            }
            let limit = limit_of(a).max(limit_of(b));
            if limit.is_zero() {
                continue;
            }
            let (span_a, span_b) = (span_of(a), span_of(b));
            if span_a.distance_to(&span_b) >= limit {
                continue;
            }
            let overlap_mm = span_a
                .intersection(&span_b)
                .map(|s| s.length().value())
                .unwrap_or(0);
            let mut margin = config.avoid_base_margin_s.max(0);
            if config.avoid_dynamic_enabled {
                margin += (config.avoid_dynamic_per_mm_s * overlap_mm as f64).ceil() as i64;
            }
            let margin = TimeDelta::new(margin);

            let (earlier, later) = if a.end() <= b.end() { (a, b) } else { (b, a) };
            let observed = later.start() - earlier.end();
            if observed < margin {
                conflicts.push(ConflictRecord::new(
                    ConflictKind::AvoidViolation,
                    vec![a.batch(), b.batch()],
                    vec![a.stage(), b.stage()],
                    vec![a.to(), b.to()],
                    vec![a.transporter(), b.transporter()],
                    observed,
                    margin,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoist_sched_core::{
        cost::Cost,
        space::{SpaceInterval, SpaceLength, SpacePosition},
    };
    use hoist_sched_model::{
        id::{GroupId, RecipeId, StationId, TransporterId},
        kinematics::{AxisKinematics, HoistKinematics},
        model::{Batch, Recipe, RecipeStage, Station, StationSpan, Transporter},
        transfer::{TransferTable, TransferTask},
    };

    fn station(id: u32, group: u32, x: i64) -> Station {
        Station::new(StationId::new(id), GroupId::new(group), SpacePosition::new(x))
    }

    fn transporter(id: u32, x_min: i64, x_max: i64, avoid: Option<i64>) -> Transporter {
        Transporter::new(
            TransporterId::new(id),
            SpaceInterval::new(SpacePosition::new(x_min), SpacePosition::new(x_max)),
            AxisKinematics::new(300.0, 500.0, 500.0),
            HoistKinematics::new(
                SpaceLength::new(2000),
                SpaceLength::new(200),
                SpaceLength::new(400),
                SpaceLength::new(100),
                50.0,
                250.0,
            ),
            avoid.map(SpaceLength::new),
        )
    }

    fn stage(min: u32, max: u32, lo: i64, hi: i64) -> RecipeStage {
        RecipeStage::new(
            StationSpan::new(StationId::new(min), StationId::new(max)),
            TimeDelta::new(lo),
            TimeDelta::new(hi),
        )
    }

    /// One transporter, three stations, tabulated times (transfer 5/9,
    /// lift 17, sink 16; change_time 74).
    fn scenario_problem() -> Problem {
        let stations = vec![
            station(301, 1, 1000),
            station(302, 2, 2000),
            station(303, 3, 3000),
        ];
        let t = TransporterId::new(1);
        let lift = TimeDelta::new(17);
        let sink = TimeDelta::new(16);
        let ids = [301u32, 302, 303];
        let xs = [1000i64, 2000, 3000];
        let mut entries = Vec::new();
        for (i, &a) in ids.iter().enumerate() {
            for (j, &b) in ids.iter().enumerate() {
                let transfer = match (xs[i] - xs[j]).abs() {
                    0 => TimeDelta::zero(),
                    1000 => TimeDelta::new(5),
                    _ => TimeDelta::new(9),
                };
                entries.push((
                    (t, StationId::new(a), StationId::new(b)),
                    TransferTask::new(lift, transfer, sink),
                ));
            }
        }
        let recipe = Recipe::new(
            RecipeId::new(1),
            vec![
                stage(301, 301, 0, 48 * 3600),
                stage(302, 302, 600, 720),
                stage(303, 303, 0, 720),
            ],
        );
        Problem::with_transfer_table(
            stations,
            vec![transporter(1, 0, 5000, None)],
            vec![recipe],
            vec![
                Batch::new(BatchId::new(1), RecipeId::new(1), 1),
                Batch::new(BatchId::new(2), RecipeId::new(1), 2),
            ],
            Problem::DEFAULT_HORIZON,
            TransferTable::from_entries(entries),
        )
        .unwrap()
    }

    fn task(
        transporter: u32,
        batch: u32,
        stage: usize,
        from: u32,
        to: u32,
        start: i64,
        end: i64,
    ) -> TransporterTask {
        TransporterTask::new(
            TransporterId::new(transporter),
            BatchId::new(batch),
            StageIndex::new(stage),
            StationId::new(from),
            StationId::new(to),
            TimePoint::new(start),
            TimePoint::new(end),
        )
    }

    fn schedule_of(
        tasks: Vec<TransporterTask>,
        stage_times: &[(u32, usize, i64, i64)],
        stage0: &[(u32, i64)],
    ) -> HoistSchedule {
        let mut times = BTreeMap::new();
        for &(b, s, e, x) in stage_times {
            times.insert(
                (BatchId::new(b), StageIndex::new(s)),
                (TimePoint::new(e), TimePoint::new(x)),
            );
        }
        let mut starts = BTreeMap::new();
        for &(b, t) in stage0 {
            starts.insert(BatchId::new(b), TimePoint::new(t));
            times.insert(
                (BatchId::new(b), StageIndex::entry()),
                (TimePoint::new(t), TimePoint::new(t)),
            );
        }
        HoistSchedule::new(tasks, times, starts, Cost::zero(), Cost::zero())
    }

    /// The scenario-A single batch schedule: everything consistent.
    fn clean_single_batch() -> HoistSchedule {
        schedule_of(
            vec![
                task(1, 1, 1, 301, 302, 0, 38),
                task(1, 1, 2, 302, 303, 638, 676),
            ],
            &[(1, 1, 38, 638), (1, 2, 676, 676)],
            &[(1, 0)],
        )
    }

    #[test]
    fn test_clean_schedule_has_no_conflicts() {
        let problem = scenario_problem();
        let conflicts =
            validate(&problem, &clean_single_batch(), &Phase2Config::default()).unwrap();
        assert!(conflicts.is_empty(), "unexpected conflicts: {:?}", conflicts);
    }

    #[test]
    fn test_duration_mismatch_detected() {
        let problem = scenario_problem();
        // 301 -> 302 takes 38 s, not 30.
        let schedule = schedule_of(
            vec![task(1, 1, 1, 301, 302, 0, 30)],
            &[(1, 1, 30, 630)],
            &[(1, 0)],
        );
        let conflicts = validate(&problem, &schedule, &Phase2Config::default()).unwrap();
        assert!(conflicts
            .iter()
            .any(|c| c.kind() == ConflictKind::TimingMismatch));
    }

    #[test]
    fn test_deadhead_short_detected() {
        let problem = scenario_problem();
        // Batch 2 picked up at 301 immediately after batch 1's drop at
        // 303; the 9 s deadhead 303 -> 301 is missing.
        let schedule = schedule_of(
            vec![
                task(1, 1, 1, 301, 302, 0, 38),
                task(1, 1, 2, 302, 303, 638, 676),
                task(1, 2, 1, 301, 302, 680, 718),
                task(1, 2, 2, 302, 303, 1318, 1356),
            ],
            &[
                (1, 1, 38, 638),
                (1, 2, 676, 676),
                (2, 1, 718, 1318),
                (2, 2, 1356, 1356),
            ],
            &[(1, 0), (2, 680)],
        );
        let conflicts = validate(&problem, &schedule, &Phase2Config::default()).unwrap();
        assert!(conflicts
            .iter()
            .any(|c| c.kind() == ConflictKind::DeadheadShort));
    }

    #[test]
    fn test_transporter_overlap_detected() {
        let problem = scenario_problem();
        let schedule = schedule_of(
            vec![
                task(1, 1, 1, 301, 302, 0, 38),
                task(1, 2, 1, 301, 302, 20, 58),
            ],
            &[(1, 1, 38, 638), (2, 1, 58, 658)],
            &[(1, 0), (2, 20)],
        );
        let conflicts = validate(&problem, &schedule, &Phase2Config::default()).unwrap();
        assert!(conflicts
            .iter()
            .any(|c| c.kind() == ConflictKind::TransporterOverlap));
    }

    #[test]
    fn test_change_time_violation_detected() {
        let problem = scenario_problem();
        // Batch 1 leaves 302 at 638; batch 2 enters at 700 < 638 + 74.
        let schedule = schedule_of(
            vec![
                task(1, 1, 1, 301, 302, 0, 38),
                task(1, 1, 2, 302, 303, 638, 676),
                task(1, 2, 1, 301, 302, 662, 700),
                task(1, 2, 2, 302, 303, 1300, 1338),
            ],
            &[
                (1, 1, 38, 638),
                (1, 2, 676, 676),
                (2, 1, 700, 1300),
                (2, 2, 1338, 1338),
            ],
            &[(1, 0), (2, 662)],
        );
        let conflicts = validate(&problem, &schedule, &Phase2Config::default()).unwrap();
        assert!(conflicts
            .iter()
            .any(|c| c.kind() == ConflictKind::ChangeTimeViolation));
        let record = conflicts
            .iter()
            .find(|c| c.kind() == ConflictKind::ChangeTimeViolation)
            .unwrap();
        assert_eq!(record.observed_gap(), TimeDelta::new(62));
        assert_eq!(record.required_gap(), TimeDelta::new(74));
    }

    #[test]
    fn test_processing_window_violation_detected() {
        let problem = scenario_problem();
        // Stage 1 window is [600, 720]; 400 s is too short.
        let schedule = schedule_of(
            vec![
                task(1, 1, 1, 301, 302, 0, 38),
                task(1, 1, 2, 302, 303, 438, 476),
            ],
            &[(1, 1, 38, 438), (1, 2, 476, 476)],
            &[(1, 0)],
        );
        let conflicts = validate(&problem, &schedule, &Phase2Config::default()).unwrap();
        assert!(conflicts
            .iter()
            .any(|c| c.kind() == ConflictKind::TimingMismatch
                && c.observed_gap() == TimeDelta::new(400)));
    }

    fn two_transporter_problem() -> Problem {
        let stations = vec![
            station(301, 1, 1000),
            station(302, 2, 6000),
            station(303, 3, 8000),
            station(304, 4, 12_000),
        ];
        let recipe = Recipe::new(
            RecipeId::new(1),
            vec![stage(301, 301, 0, 48 * 3600), stage(302, 302, 0, 7200)],
        );
        Problem::new(
            stations,
            vec![
                transporter(1, 0, 10_000, Some(500)),
                transporter(2, 5000, 15_000, Some(500)),
            ],
            vec![recipe],
            vec![
                Batch::new(BatchId::new(1), RecipeId::new(1), 1),
                Batch::new(BatchId::new(2), RecipeId::new(1), 2),
            ],
            Problem::DEFAULT_HORIZON,
        )
        .unwrap()
    }

    #[test]
    fn test_avoid_violation_detected() {
        let problem = two_transporter_problem();
        // Both transporters traverse [6000, 8000] at the same time.
        let d1 = problem
            .transfer()
            .lookup(TransporterId::new(1), StationId::new(302), StationId::new(303))
            .unwrap()
            .total();
        let d2 = problem
            .transfer()
            .lookup(TransporterId::new(2), StationId::new(303), StationId::new(302))
            .unwrap()
            .total();
        let schedule = schedule_of(
            vec![
                TransporterTask::new(
                    TransporterId::new(1),
                    BatchId::new(1),
                    StageIndex::new(1),
                    StationId::new(302),
                    StationId::new(303),
                    TimePoint::new(100),
                    TimePoint::new(100) + d1,
                ),
                TransporterTask::new(
                    TransporterId::new(2),
                    BatchId::new(2),
                    StageIndex::new(1),
                    StationId::new(303),
                    StationId::new(302),
                    TimePoint::new(100),
                    TimePoint::new(100) + d2,
                ),
            ],
            &[
                (1, 1, 100 + d1.value(), 100 + d1.value()),
                (2, 1, 100 + d2.value(), 100 + d2.value()),
            ],
            &[(1, 100), (2, 100)],
        );
        let conflicts = validate(&problem, &schedule, &Phase2Config::default()).unwrap();
        assert!(conflicts
            .iter()
            .any(|c| c.kind() == ConflictKind::AvoidViolation));
    }

    #[test]
    fn test_avoid_zero_margin_allows_disjoint_intervals() {
        let problem = two_transporter_problem();
        let config = Phase2Config {
            avoid_base_margin_s: 0,
            ..Phase2Config::default()
        };
        let d1 = problem
            .transfer()
            .lookup(TransporterId::new(1), StationId::new(302), StationId::new(303))
            .unwrap()
            .total();
        let d2 = problem
            .transfer()
            .lookup(TransporterId::new(2), StationId::new(303), StationId::new(302))
            .unwrap()
            .total();
        let first_end = TimePoint::new(100) + d1;
        let schedule = schedule_of(
            vec![
                TransporterTask::new(
                    TransporterId::new(1),
                    BatchId::new(1),
                    StageIndex::new(1),
                    StationId::new(302),
                    StationId::new(303),
                    TimePoint::new(100),
                    first_end,
                ),
                TransporterTask::new(
                    TransporterId::new(2),
                    BatchId::new(2),
                    StageIndex::new(1),
                    StationId::new(303),
                    StationId::new(302),
                    first_end,
                    first_end + d2,
                ),
            ],
            &[
                (1, 1, first_end.value(), first_end.value()),
                (2, 1, (first_end + d2).value(), (first_end + d2).value()),
            ],
            &[(1, 100), (2, first_end.value())],
        );
        let conflicts = validate(&problem, &schedule, &config).unwrap();
        assert!(!conflicts
            .iter()
            .any(|c| c.kind() == ConflictKind::AvoidViolation));
    }
}
