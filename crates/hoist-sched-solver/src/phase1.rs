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

//! # Phase 1 — Station Optimizer
//!
//! Chooses a station per `(batch, stage)` from the allowed group-coherent
//! span, fixes the batch entry order, and computes entry/exit times under
//! the averaged-transfer model: every move takes exactly
//! `average_task_time`, every stage runs its minimum processing time, so a
//! batch's whole timeline is a rigid chain hanging off its stage-0 exit.
//!
//! The search is a branch-and-bound over interleavings of the
//! recipe-identity groups. Input order is fixed inside a group (the
//! symmetry tie-break), so only the merge order between groups is
//! explored. Each placement takes the earliest start at which every stage
//! finds a free station, honoring the `change_time` gap between different
//! batches on the same station. Exhausting the interleaving space proves
//! optimality with respect to this scheme; running out of budget returns
//! the best incumbent.

use crate::{
    config::Phase1Config,
    control::{
        CancelToken, SearchBudget, SolveOutcome, SolveResult, SolveStats, TerminationReason,
    },
};
use hoist_sched_model::{
    err::{NoCarrierError, ProblemBuildError, StageStationsError},
    id::{BatchId, RecipeId, StageIndex, StationId},
    problem::Problem,
    sol::{Phase1Schedule, StageAssignment},
};
use hoist_sched_core::time::{TimeDelta, TimePoint};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{
    Mutex,
    atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering},
};
use tracing::{debug, info};

/// Precomputed timing chain of one batch under the averaged model.
#[derive(Debug, Clone)]
struct BatchPlan {
    id: BatchId,
    recipe: RecipeId,
    stage0_station: StationId,
    stages: Vec<StagePlan>,
    /// `exit(last) - exit(0)`; start lower bounds translate directly into
    /// makespan lower bounds through it.
    chain_len: TimeDelta,
}

#[derive(Debug, Clone)]
struct StagePlan {
    stage: StageIndex,
    allowed: Vec<StationId>,
    entry_off: TimeDelta,
    exit_off: TimeDelta,
}

/// A committed placement of one batch: its start plus the chosen stations.
#[derive(Debug, Clone)]
struct Placement {
    start: TimePoint,
    stations: Vec<StationId>,
}

type Busy = HashMap<StationId, Vec<(TimePoint, TimePoint, BatchId)>>;

struct SharedSearch<'a> {
    plans: &'a [BatchPlan],
    groups: &'a [Vec<usize>],
    change_time: TimeDelta,
    group_preference: bool,
    budget: &'a SearchBudget,
    /// Best makespan seen, for pruning across workers.
    bound: AtomicI64,
    incumbent: Mutex<Option<(TimePoint, Vec<Option<Placement>>)>>,
    nodes: AtomicU64,
    stopped: AtomicBool,
    log_progress: bool,
}

impl<'a> SharedSearch<'a> {
    fn offer(&self, makespan: TimePoint, placements: &[Option<Placement>]) {
        let mut best = self.incumbent.lock().expect("phase-1 incumbent lock");
        let improved = best
            .as_ref()
            .map(|(m, _)| makespan < *m)
            .unwrap_or(true);
        if improved {
            if self.log_progress {
                info!(makespan = makespan.value(), "phase1 incumbent improved");
            }
            self.bound.store(makespan.value(), Ordering::Relaxed);
            *best = Some((makespan, placements.to_vec()));
        }
    }
}

/// Runs the phase-1 solve.
///
/// Configuration gaps (a stage whose allowed stations cannot be reached by
/// any transporter) surface as `ConfigMissing` errors before the search
/// starts; the search itself always terminates with an incumbent.
pub fn solve(
    problem: &Problem,
    config: &Phase1Config,
    cancel: CancelToken,
    log_progress: bool,
) -> Result<SolveOutcome<Phase1Schedule>, ProblemBuildError> {
    let budget = SearchBudget::new(config.time_limit_s, cancel);
    let plans = build_plans(problem)?;
    check_carriers(problem, &plans)?;

    if plans.is_empty() {
        let schedule = Phase1Schedule::new(Vec::new(), BTreeMap::new(), BTreeMap::new());
        return Ok(SolveOutcome::new(
            SolveResult::Optimal(schedule),
            TerminationReason::SearchExhausted,
            SolveStats::new(0, 0, budget.elapsed()),
        ));
    }

    let id_to_plan: HashMap<BatchId, usize> = plans
        .iter()
        .enumerate()
        .map(|(i, p)| (p.id, i))
        .collect();
    let groups: Vec<Vec<usize>> = problem
        .identity_groups()
        .iter()
        .map(|members| members.iter().map(|b| id_to_plan[b]).collect())
        .collect();

    let shared = SharedSearch {
        plans: &plans,
        groups: &groups,
        change_time: problem.change_time(),
        group_preference: config.group_constraint_enabled,
        budget: &budget,
        bound: AtomicI64::new(i64::MAX),
        incumbent: Mutex::new(None),
        nodes: AtomicU64::new(0),
        stopped: AtomicBool::new(false),
        log_progress,
    };

    // Seed an incumbent from the plain input-order interleaving so a
    // budget hit can never leave the solve empty-handed.
    seed_input_order(&shared);

    if groups.len() > 1 && config.workers != 1 {
        run_parallel(&shared, config.workers);
    } else {
        let mut state = SearchState::new(plans.len(), groups.len());
        dfs(&shared, &mut state);
    }

    let (makespan, placements) = shared
        .incumbent
        .into_inner()
        .expect("phase-1 incumbent lock")
        .expect("phase-1 search always seeds an incumbent");
    debug!(
        makespan = makespan.value(),
        nodes = shared.nodes.load(Ordering::Relaxed),
        "phase1 search finished"
    );

    let schedule = build_schedule(problem, &plans, &placements)?;
    let stats = SolveStats::new(shared.nodes.load(Ordering::Relaxed), 0, budget.elapsed());
    let outcome = if shared.stopped.load(Ordering::Relaxed) {
        match budget.stop_reason() {
            TerminationReason::Cancelled => SolveOutcome::new(
                SolveResult::Feasible(schedule),
                TerminationReason::Cancelled,
                stats,
            ),
            _ => SolveOutcome::new(
                SolveResult::Feasible(schedule),
                TerminationReason::TimeLimit,
                stats,
            ),
        }
    } else {
        SolveOutcome::new(
            SolveResult::Optimal(schedule),
            TerminationReason::SearchExhausted,
            stats,
        )
    };
    Ok(outcome)
}

fn build_plans(problem: &Problem) -> Result<Vec<BatchPlan>, ProblemBuildError> {
    let avg = problem.average_task_time();
    let mut plans = Vec::with_capacity(problem.batches().len());
    for batch in problem.batches() {
        let recipe = problem.recipe_of(batch);
        let entry_stage = recipe
            .stage(StageIndex::entry())
            .expect("recipes validated non-empty");
        let stage0_allowed = problem.allowed_stations(entry_stage);
        let stage0_station = match stage0_allowed.first() {
            Some(&s) => s,
            None => {
                return Err(ProblemBuildError::StageStations(StageStationsError::new(
                    recipe.id(),
                    StageIndex::entry(),
                    entry_stage.stations().min(),
                    entry_stage.stations().max(),
                )));
            }
        };

        let mut stages = Vec::new();
        let mut cursor = TimeDelta::zero();
        for stage_idx in recipe.processing_stages() {
            let stage = recipe.stage(stage_idx).expect("stage index in range");
            let allowed = problem.allowed_stations(stage);
            if allowed.is_empty() {
                return Err(ProblemBuildError::StageStations(StageStationsError::new(
                    recipe.id(),
                    stage_idx,
                    stage.stations().min(),
                    stage.stations().max(),
                )));
            }
            let entry_off = cursor + avg;
            let exit_off = entry_off + stage.min_time();
            cursor = exit_off;
            stages.push(StagePlan {
                stage: stage_idx,
                allowed,
                entry_off,
                exit_off,
            });
        }
        plans.push(BatchPlan {
            id: batch.id(),
            recipe: recipe.id(),
            stage0_station,
            stages,
            chain_len: cursor,
        });
    }
    Ok(plans)
}

/// Every station pair a batch might traverse must have a transporter; a
/// gap in the table is a fatal configuration error, not a search dead end.
fn check_carriers(problem: &Problem, plans: &[BatchPlan]) -> Result<(), ProblemBuildError> {
    for plan in plans {
        let mut froms = vec![plan.stage0_station];
        for stage_plan in &plan.stages {
            for &from in &froms {
                for &to in &stage_plan.allowed {
                    if problem.transfer().carrier_for(from, to).is_none() {
                        return Err(
                            NoCarrierError::new(plan.id, stage_plan.stage, from, to).into()
                        );
                    }
                }
            }
            froms = stage_plan.allowed.clone();
        }
    }
    Ok(())
}

struct SearchState {
    ptrs: Vec<usize>,
    placements: Vec<Option<Placement>>,
    busy: Busy,
    makespan: TimePoint,
    placed: usize,
}

impl SearchState {
    fn new(batch_count: usize, group_count: usize) -> Self {
        Self {
            ptrs: vec![0; group_count],
            placements: vec![None; batch_count],
            busy: Busy::new(),
            makespan: TimePoint::zero(),
            placed: 0,
        }
    }
}

fn seed_input_order(shared: &SharedSearch<'_>) {
    let mut state = SearchState::new(shared.plans.len(), shared.groups.len());
    // Plans are in input order; placing them as-is respects group order.
    for plan_idx in 0..shared.plans.len() {
        let group = shared
            .groups
            .iter()
            .position(|g| g.contains(&plan_idx))
            .expect("every batch belongs to a group");
        let lower = group_lower_bound(shared, &state, group);
        let placement = place_earliest(shared, &state.busy, plan_idx, lower);
        commit(shared, &mut state, plan_idx, group, placement);
    }
    shared.offer(state.makespan, &state.placements);
}

fn group_lower_bound(shared: &SharedSearch<'_>, state: &SearchState, group: usize) -> TimePoint {
    let ptr = state.ptrs[group];
    if ptr == 0 {
        TimePoint::zero()
    } else {
        let prev_idx = shared.groups[group][ptr - 1];
        state.placements[prev_idx]
            .as_ref()
            .map(|p| p.start)
            .unwrap_or(TimePoint::zero())
    }
}

fn commit(
    shared: &SharedSearch<'_>,
    state: &mut SearchState,
    plan_idx: usize,
    group: usize,
    placement: Placement,
) {
    let plan = &shared.plans[plan_idx];
    for (stage_plan, &station) in plan.stages.iter().zip(&placement.stations) {
        state.busy.entry(station).or_default().push((
            placement.start + stage_plan.entry_off,
            placement.start + stage_plan.exit_off,
            plan.id,
        ));
    }
    state.makespan = state.makespan.max(placement.start + plan.chain_len);
    state.ptrs[group] += 1;
    state.placed += 1;
    state.placements[plan_idx] = Some(placement);
}

fn uncommit(
    _shared: &SharedSearch<'_>,
    state: &mut SearchState,
    plan_idx: usize,
    group: usize,
    saved_makespan: TimePoint,
) {
    let placement = state.placements[plan_idx]
        .take()
        .expect("uncommit of unplaced batch");
    for &station in placement.stations.iter().rev() {
        let slots = state
            .busy
            .get_mut(&station)
            .expect("busy entry present for committed station");
        slots.pop();
    }
    state.makespan = saved_makespan;
    state.ptrs[group] -= 1;
    state.placed -= 1;
}

fn dfs(shared: &SharedSearch<'_>, state: &mut SearchState) {
    if shared.budget.should_stop() {
        shared.stopped.store(true, Ordering::Relaxed);
        return;
    }
    shared.nodes.fetch_add(1, Ordering::Relaxed);

    if state.placed == shared.plans.len() {
        shared.offer(state.makespan, &state.placements);
        return;
    }

    for group in 0..shared.groups.len() {
        if state.ptrs[group] >= shared.groups[group].len() {
            continue;
        }
        let plan_idx = shared.groups[group][state.ptrs[group]];
        let lower = group_lower_bound(shared, state, group);
        let placement = place_earliest(shared, &state.busy, plan_idx, lower);
        let reach = placement.start + shared.plans[plan_idx].chain_len;
        let lower_makespan = state.makespan.max(reach);
        if lower_makespan.value() >= shared.bound.load(Ordering::Relaxed) {
            continue;
        }
        let saved = state.makespan;
        commit(shared, state, plan_idx, group, placement);
        dfs(shared, state);
        uncommit(shared, state, plan_idx, group, saved);
        if shared.stopped.load(Ordering::Relaxed) && shared.budget.should_stop() {
            return;
        }
    }
}

fn run_parallel(shared: &SharedSearch<'_>, workers: usize) {
    let roots: Vec<usize> = (0..shared.groups.len())
        .filter(|&g| !shared.groups[g].is_empty())
        .collect();
    let run = || {
        rayon::scope(|scope| {
            for &group in &roots {
                scope.spawn(move |_| {
                    let mut state = SearchState::new(shared.plans.len(), shared.groups.len());
                    let plan_idx = shared.groups[group][0];
                    let placement =
                        place_earliest(shared, &state.busy, plan_idx, TimePoint::zero());
                    commit(shared, &mut state, plan_idx, group, placement);
                    dfs(shared, &mut state);
                });
            }
        });
    };
    if workers > 0 {
        match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
            Ok(pool) => pool.install(run),
            Err(_) => run(),
        }
    } else {
        run();
    }
}

/// Earliest start `>= lower` at which every stage of the batch finds a
/// free allowed station.
fn place_earliest(
    shared: &SharedSearch<'_>,
    busy: &Busy,
    plan_idx: usize,
    lower: TimePoint,
) -> Placement {
    let plan = &shared.plans[plan_idx];
    let change = shared.change_time;

    // Candidate starts: the lower bound itself plus every point where a
    // stage entry lands exactly one change-time after an existing exit.
    let mut candidates: BTreeSet<TimePoint> = BTreeSet::new();
    candidates.insert(lower);
    for stage_plan in &plan.stages {
        for station in &stage_plan.allowed {
            if let Some(slots) = busy.get(station) {
                for &(_, exit, other) in slots {
                    if other == plan.id {
                        continue;
                    }
                    let candidate = (exit + change).saturating_sub(stage_plan.entry_off);
                    if candidate >= lower {
                        candidates.insert(candidate);
                    }
                }
            }
        }
    }

    for &start in &candidates {
        if let Some(stations) = try_place(shared, busy, plan, start) {
            return Placement { start, stations };
        }
    }
    unreachable!("the latest candidate start clears every busy interval");
}

fn try_place(
    shared: &SharedSearch<'_>,
    busy: &Busy,
    plan: &BatchPlan,
    start: TimePoint,
) -> Option<Vec<StationId>> {
    let change = shared.change_time;
    let mut chosen = Vec::with_capacity(plan.stages.len());
    let mut previous: Option<StationId> = None;
    for stage_plan in &plan.stages {
        let entry = start + stage_plan.entry_off;
        let exit = start + stage_plan.exit_off;
        let free = |station: &StationId| -> bool {
            busy.get(station).map_or(true, |slots| {
                slots.iter().all(|&(e, x, other)| {
                    other == plan.id || entry >= x + change || e >= exit + change
                })
            })
        };
        let mut pick = None;
        if shared.group_preference {
            if let Some(prev) = previous {
                if stage_plan.allowed.contains(&prev) && free(&prev) {
                    pick = Some(prev);
                }
            }
        }
        if pick.is_none() {
            pick = stage_plan.allowed.iter().copied().find(|s| free(s));
        }
        match pick {
            Some(station) => {
                previous = Some(station);
                chosen.push(station);
            }
            None => return None,
        }
    }
    Some(chosen)
}

fn build_schedule(
    problem: &Problem,
    plans: &[BatchPlan],
    placements: &[Option<Placement>],
) -> Result<Phase1Schedule, ProblemBuildError> {
    let mut assignments = Vec::new();
    let mut stage0_exit = BTreeMap::new();
    let mut stage0_station = BTreeMap::new();
    for (plan, placement) in plans.iter().zip(placements) {
        let placement = placement
            .as_ref()
            .expect("incumbent placements are complete");
        stage0_exit.insert(plan.id, placement.start);
        stage0_station.insert(plan.id, plan.stage0_station);
        let mut from = plan.stage0_station;
        for (stage_plan, &station) in plan.stages.iter().zip(&placement.stations) {
            let carrier = problem
                .transfer()
                .carrier_for(from, station)
                .ok_or_else(|| {
                    NoCarrierError::new(plan.id, stage_plan.stage, from, station)
                })?;
            assignments.push(StageAssignment::new(
                plan.id,
                plan.recipe,
                stage_plan.stage,
                station,
                carrier,
                placement.start + stage_plan.entry_off,
                placement.start + stage_plan.exit_off,
            ));
            from = station;
        }
    }
    Ok(Phase1Schedule::new(assignments, stage0_exit, stage0_station))
}
