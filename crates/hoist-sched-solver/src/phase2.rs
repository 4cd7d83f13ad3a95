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

//! # Phase 2 — Transporter Optimizer
//!
//! Binds Phase-1's station and transporter choices and recomputes time
//! exactly: task durations from the transfer table, deadhead between
//! consecutive tasks of one transporter, the station change gap,
//! cross-transporter avoidance, and processing stretches within each
//! stage's `[min_time, max_time]` window. The terminal stage never
//! consumes more than its minimum.
//!
//! The solver is a chronological dispatcher: among all pending moves it
//! repeatedly commits the one with the earliest feasible start, resolving
//! every constraint against the already-committed frontier. Stage-1 moves
//! are gated into Phase-1 batch order (the order anchor). When a
//! `max_time` window would be violated, the offending batch's line entry
//! is delayed and the dispatch restarted. A multi-start perturbation
//! search over dispatch priorities then improves the lexicographic
//! objective (makespan, deadhead, stretch) until budget or convergence.
//!
//! Phase-1 windows widened by the configured margins prune the avoidance
//! pair checks and drive the optional decomposition into window-disjoint
//! components; they are an acceleration, never a correctness mechanism —
//! the validator replays the full schedule afterwards.

use crate::{
    config::Phase2Config,
    control::{
        CancelToken, SearchBudget, SolveOutcome, SolveResult, SolveStats, TerminationReason,
    },
};
use hoist_sched_core::{
    cost::Cost,
    space::{SpaceInterval, SpaceLength},
    time::{TimeDelta, TimePoint},
};
use hoist_sched_model::{
    err::{MissingTransferError, ProblemBuildError},
    id::{BatchId, StageIndex, StationId, TransporterId},
    problem::Problem,
    sol::{ConflictKind, ConflictRecord, HoistSchedule, Phase1Schedule, TransporterTask},
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use tracing::{debug, info};

/// Consecutive non-improving perturbations before a worker declares
/// convergence.
const STALE_LIMIT: u32 = 48;

/// One loaded move, fully resolved against Phase-1 decisions.
#[derive(Debug, Clone)]
struct MovePlan {
    stage: StageIndex,
    seq: usize,
    t_idx: usize,
    transporter: TransporterId,
    from: StationId,
    to: StationId,
    duration: TimeDelta,
    span: SpaceInterval,
    avoid_limit: SpaceLength,
    /// Processing window of the stage this move lifts *out of*.
    min_prev: TimeDelta,
    max_prev: TimeDelta,
    /// Minimum processing of the stage this move delivers *into*; the
    /// destination is closed immediately with it when the stage is
    /// terminal.
    min_here: TimeDelta,
    is_last: bool,
    /// Phase-1 move window widened by the transporter safe margin, for
    /// avoid-pair pruning.
    window: (TimePoint, TimePoint),
    /// Phase-1 destination stage window widened by the stage margin.
    stage_window: (TimePoint, TimePoint),
}

/// Per-batch dispatch context, in Phase-1 batch order.
#[derive(Debug, Clone)]
struct BatchCtx {
    id: BatchId,
    moves: Vec<MovePlan>,
    /// Batch window (mode per `anchor_stage1_enabled`) for avoid-pair
    /// pruning and decomposition.
    window: (TimePoint, TimePoint),
    /// Phase-1 line entry; component solves anchor on it so that
    /// window-disjoint components stay separated.
    phase1_start: TimePoint,
}

struct Phase2Ctx<'p> {
    problem: &'p Problem,
    config: &'p Phase2Config,
    batches: Vec<BatchCtx>,
    change: TimeDelta,
}

/// A complete dispatch result with its lexicographic cost.
#[derive(Debug, Clone)]
struct CandidateSol {
    tasks: Vec<TransporterTask>,
    stage_times: BTreeMap<(BatchId, StageIndex), (TimePoint, TimePoint)>,
    stage0_exit: BTreeMap<BatchId, TimePoint>,
    cost: LexCost,
}

/// Objective tuple compared lexicographically: makespan first, then
/// deadhead, then stretch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct LexCost {
    makespan: TimePoint,
    deadhead: Cost,
    stretch: Cost,
}

enum RunError {
    Config(MissingTransferError),
    /// `max_time` of the named batch's stage would be exceeded by
    /// `excess`; the dispatch can be repaired by delaying the batch.
    MaxTime {
        batch_idx: usize,
        stage: StageIndex,
        excess: TimeDelta,
    },
    /// Circular station wait; no pending move can be dispatched.
    Deadlock { batch_idxs: Vec<usize> },
}

/// Runs the phase-2 solve on top of a phase-1 schedule.
pub fn solve(
    problem: &Problem,
    phase1: &Phase1Schedule,
    config: &Phase2Config,
    cancel: CancelToken,
    log_progress: bool,
) -> Result<SolveOutcome<HoistSchedule>, ProblemBuildError> {
    let budget = SearchBudget::new(config.time_limit_s, cancel);
    let ctx = build_ctx(problem, phase1, config)?;

    if ctx.batches.is_empty() {
        let schedule = HoistSchedule::new(
            Vec::new(),
            BTreeMap::new(),
            BTreeMap::new(),
            Cost::zero(),
            Cost::zero(),
        );
        return Ok(SolveOutcome::new(
            SolveResult::Optimal(schedule),
            TerminationReason::SearchExhausted,
            SolveStats::new(0, 0, budget.elapsed()),
        ));
    }

    let components: Vec<Vec<usize>> = if config.decompose_enabled {
        decompose(&ctx)
    } else {
        vec![(0..ctx.batches.len()).collect()]
    };
    // Component solves anchor on the Phase-1 line entries so disjoint
    // components cannot drift into each other before the guard shift.
    let anchor_lower = components.len() > 1;
    debug!(components = components.len(), "phase2 dispatch starting");

    let mut merged: Option<CandidateSol> = None;
    let mut runs = 0u64;
    let mut improvements = 0u64;
    for component in &components {
        let outcome = match solve_component(&ctx, component, anchor_lower, &budget, log_progress)
        {
            Ok((sol, r, i)) => {
                runs += r;
                improvements += i;
                sol
            }
            Err(ComponentFailure::Config(e)) => return Err(e.into()),
            Err(ComponentFailure::Infeasible(conflicts)) => {
                return Ok(SolveOutcome::new(
                    SolveResult::Infeasible(conflicts),
                    TerminationReason::SearchExhausted,
                    SolveStats::new(runs, improvements, budget.elapsed()),
                ));
            }
        };
        merged = Some(match merged {
            None => outcome,
            Some(prev) => concatenate(prev, outcome, TimeDelta::new(config.decompose_guard_s)),
        });
    }

    let sol = merged.expect("at least one component");
    let schedule = HoistSchedule::new(
        sol.tasks,
        sol.stage_times,
        sol.stage0_exit,
        sol.cost.deadhead,
        sol.cost.stretch,
    );
    let reason = if budget.cancelled() {
        TerminationReason::Cancelled
    } else if budget.expired() {
        TerminationReason::TimeLimit
    } else {
        TerminationReason::Converged
    };
    Ok(SolveOutcome::new(
        SolveResult::Feasible(schedule),
        reason,
        SolveStats::new(runs, improvements, budget.elapsed()),
    ))
}

/// Verification mode: freeze the Phase-1 timings (`task_end = entry₁`),
/// and report every conflict exact physics finds in them. Phase-1 output
/// is never mutated.
pub fn verify(
    problem: &Problem,
    phase1: &Phase1Schedule,
    config: &Phase2Config,
) -> Result<Vec<ConflictRecord>, ProblemBuildError> {
    let ctx = build_ctx(problem, phase1, config)?;
    let mut tasks = Vec::new();
    let mut stage_times = BTreeMap::new();
    let mut stage0_exit = BTreeMap::new();
    for batch in &ctx.batches {
        for m in &batch.moves {
            let assignment = phase1
                .assignment(batch.id, m.stage)
                .expect("phase-1 covers every processing stage");
            let start = assignment.entry() - m.duration;
            tasks.push(TransporterTask::new(
                m.transporter,
                batch.id,
                m.stage,
                m.from,
                m.to,
                start,
                assignment.entry(),
            ));
            if m.seq == 0 {
                stage0_exit.insert(batch.id, start);
            }
            stage_times.insert(
                (batch.id, m.stage),
                (assignment.entry(), assignment.exit()),
            );
        }
    }
    let frozen = HoistSchedule::new(tasks, stage_times, stage0_exit, Cost::zero(), Cost::zero());
    crate::retime::validate(problem, &frozen, config)
}

// ---------------------------------------------------------------------
// Context construction
// ---------------------------------------------------------------------

fn build_ctx<'p>(
    problem: &'p Problem,
    phase1: &Phase1Schedule,
    config: &'p Phase2Config,
) -> Result<Phase2Ctx<'p>, ProblemBuildError> {
    let transfer = problem.transfer();
    let t_index: HashMap<TransporterId, usize> = problem
        .transporters()
        .iter()
        .enumerate()
        .map(|(i, t)| (t.id(), i))
        .collect();

    let safe_margin = TimeDelta::new(config.transporter_safe_margin_s.max(0));
    let stage_margin = TimeDelta::new(config.stage_margin_s.max(0));
    let window_margin = TimeDelta::new(config.window_margin_s.max(0));

    let mut batches = Vec::new();
    for &batch_id in phase1.batch_order() {
        let batch = problem
            .batch(batch_id)
            .expect("phase-1 schedules only known batches");
        let recipe = problem.recipe_of(batch);
        let mut from = phase1
            .stage0_station(batch_id)
            .expect("phase-1 records a loading station per batch");
        let mut prev_exit1 = phase1
            .stage0_exit(batch_id)
            .expect("phase-1 records a line entry per batch");

        let mut moves = Vec::new();
        let stage_count = recipe.processing_stages().count();
        for (seq, stage_idx) in recipe.processing_stages().enumerate() {
            let assignment = phase1
                .assignment(batch_id, stage_idx)
                .expect("phase-1 covers every processing stage");
            let to = assignment.station();
            let transporter_id = assignment.transporter();
            let task = transfer.lookup(transporter_id, from, to)?;
            let transporter = problem
                .transporter(transporter_id)
                .expect("phase-1 binds only known transporters");
            let stage = recipe.stage(stage_idx).expect("stage index in range");
            let prev_stage = recipe
                .stage(StageIndex::new(stage_idx.value() - 1))
                .expect("stage has a predecessor");
            let span = SpaceInterval::new(problem.position_of(from), problem.position_of(to));
            moves.push(MovePlan {
                stage: stage_idx,
                seq,
                t_idx: t_index[&transporter_id],
                transporter: transporter_id,
                from,
                to,
                duration: task.total(),
                span,
                avoid_limit: transporter.avoid_limit().unwrap_or(SpaceLength::zero()),
                min_prev: if seq == 0 {
                    TimeDelta::zero()
                } else {
                    prev_stage.min_time()
                },
                max_prev: if seq == 0 {
                    problem.horizon()
                } else {
                    prev_stage.max_time()
                },
                min_here: stage.min_time(),
                is_last: seq + 1 == stage_count,
                window: (
                    prev_exit1.saturating_sub(safe_margin),
                    assignment.entry() + safe_margin,
                ),
                stage_window: (
                    assignment.entry().saturating_sub(stage_margin),
                    assignment.exit() + stage_margin,
                ),
            });
            from = to;
            prev_exit1 = assignment.exit();
        }

        let entry1 = moves
            .first()
            .map(|m| {
                phase1
                    .assignment(batch_id, m.stage)
                    .expect("phase-1 covers every processing stage")
                    .entry()
            })
            .unwrap_or(TimePoint::zero());
        let window = if config.anchor_stage1_enabled {
            // Anchored mode: stage-1 entry plus the recipe's maximum
            // content.
            let total_max: TimeDelta = recipe
                .processing_stages()
                .map(|s| recipe.stage(s).expect("stage index in range").max_time())
                .chain(moves.iter().map(|m| m.duration))
                .sum();
            (entry1, entry1 + total_max)
        } else {
            (
                entry1.saturating_sub(window_margin),
                prev_exit1 + window_margin,
            )
        };
        batches.push(BatchCtx {
            id: batch_id,
            moves,
            window,
            phase1_start: phase1
                .stage0_exit(batch_id)
                .expect("phase-1 records a line entry per batch"),
        });
    }

    Ok(Phase2Ctx {
        problem,
        config,
        batches,
        change: problem.change_time(),
    })
}

fn windows_overlap(a: (TimePoint, TimePoint), b: (TimePoint, TimePoint)) -> bool {
    a.0 < b.1 && b.0 < a.1
}

/// Partition batch indices into components whose batch windows are
/// mutually disjoint.
fn decompose(ctx: &Phase2Ctx<'_>) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..ctx.batches.len()).collect();
    order.sort_by_key(|&i| (ctx.batches[i].window.0, ctx.batches[i].window.1, i));
    let mut components: Vec<(TimePoint, Vec<usize>)> = Vec::new();
    for i in order {
        let (lo, hi) = ctx.batches[i].window;
        match components.last_mut() {
            Some((end, members)) if lo < *end => {
                members.push(i);
                *end = (*end).max(hi);
            }
            _ => components.push((hi, vec![i])),
        }
    }
    components
        .into_iter()
        .map(|(_, mut members)| {
            // Keep Phase-1 batch order inside the component.
            members.sort();
            members
        })
        .collect()
}

// ---------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
struct Occupancy {
    batch_idx: usize,
    exit: Option<TimePoint>,
}

struct DispatchState {
    next_move: Vec<usize>,
    /// `entries[bi][k]`: entry₂ of the stage move `k` delivers into.
    entries: Vec<Vec<TimePoint>>,
    stage0_exit: Vec<Option<TimePoint>>,
    t_avail: Vec<TimePoint>,
    t_pos: Vec<Option<StationId>>,
    occupancy: HashMap<StationId, Vec<Occupancy>>,
    tasks: Vec<(usize, usize, TimePoint, TimePoint)>,
    stage_times: BTreeMap<(BatchId, StageIndex), (TimePoint, TimePoint)>,
    /// Which Phase-1 order position may dispatch its stage-1 move next.
    next_stage1: usize,
    last_stage1_entry: TimePoint,
    makespan: TimePoint,
    deadhead: Cost,
    stretch: Cost,
}

enum Earliest {
    At(TimePoint),
    /// Destination currently occupied or anchor not yet released.
    Blocked,
    MaxTime(TimeDelta),
}

fn run_dispatch(
    ctx: &Phase2Ctx<'_>,
    component: &[usize],
    priority: &[u64],
    delays: &[TimeDelta],
) -> Result<CandidateSol, RunError> {
    let t_count = ctx.problem.transporters().len();
    let mut state = DispatchState {
        next_move: vec![0; ctx.batches.len()],
        entries: ctx
            .batches
            .iter()
            .map(|b| vec![TimePoint::zero(); b.moves.len()])
            .collect(),
        stage0_exit: vec![None; ctx.batches.len()],
        t_avail: vec![TimePoint::zero(); t_count],
        t_pos: vec![None; t_count],
        occupancy: HashMap::new(),
        tasks: Vec::new(),
        stage_times: BTreeMap::new(),
        next_stage1: 0,
        last_stage1_entry: TimePoint::zero(),
        makespan: TimePoint::zero(),
        deadhead: Cost::zero(),
        stretch: Cost::zero(),
    };
    // The anchor counter walks the component in Phase-1 order.
    let stage1_order: Vec<usize> = component.to_vec();

    let total_moves: usize = component.iter().map(|&i| ctx.batches[i].moves.len()).sum();
    while state.tasks.len() < total_moves {
        let mut best: Option<(TimePoint, u64, usize)> = None;
        let mut max_time_hit: Option<(usize, StageIndex, TimeDelta)> = None;
        let mut pending = Vec::new();
        for &bi in component {
            let k = state.next_move[bi];
            if k >= ctx.batches[bi].moves.len() {
                continue;
            }
            pending.push(bi);
            match earliest_start(ctx, &state, &stage1_order, bi, k, delays[bi])? {
                Earliest::At(t) => {
                    let key = (t, priority[bi], bi);
                    if best.map(|b| key < b).unwrap_or(true) {
                        best = Some(key);
                    }
                }
                Earliest::Blocked => {}
                Earliest::MaxTime(excess) => {
                    let stage = ctx.batches[bi].moves[k].stage;
                    if max_time_hit.is_none() {
                        max_time_hit = Some((bi, stage, excess));
                    }
                }
            }
        }
        match best {
            Some((t, _, bi)) => commit_move(ctx, &mut state, bi, t),
            None => {
                if let Some((batch_idx, stage, excess)) = max_time_hit {
                    return Err(RunError::MaxTime {
                        batch_idx,
                        stage,
                        excess,
                    });
                }
                return Err(RunError::Deadlock { batch_idxs: pending });
            }
        }
    }

    // Collect the result.
    let mut tasks = Vec::with_capacity(state.tasks.len());
    for &(bi, k, start, end) in &state.tasks {
        let m = &ctx.batches[bi].moves[k];
        tasks.push(TransporterTask::new(
            m.transporter,
            ctx.batches[bi].id,
            m.stage,
            m.from,
            m.to,
            start,
            end,
        ));
    }
    let mut stage0_exit = BTreeMap::new();
    for &bi in component {
        if let Some(t) = state.stage0_exit[bi] {
            stage0_exit.insert(ctx.batches[bi].id, t);
            state
                .stage_times
                .insert((ctx.batches[bi].id, StageIndex::entry()), (t, t));
        }
    }
    Ok(CandidateSol {
        tasks,
        stage_times: state.stage_times,
        stage0_exit,
        cost: LexCost {
            makespan: state.makespan,
            deadhead: state.deadhead,
            stretch: state.stretch,
        },
    })
}

fn earliest_start(
    ctx: &Phase2Ctx<'_>,
    state: &DispatchState,
    stage1_order: &[usize],
    bi: usize,
    k: usize,
    delay: TimeDelta,
) -> Result<Earliest, RunError> {
    let batch = &ctx.batches[bi];
    let m = &batch.moves[k];
    let transfer = ctx.problem.transfer();

    let ready = if k == 0 {
        // Order anchor: stage-1 moves dispatch in Phase-1 batch order.
        if stage1_order
            .get(state.next_stage1)
            .map(|&next| next != bi)
            .unwrap_or(true)
        {
            return Ok(Earliest::Blocked);
        }
        let clamp = state.last_stage1_entry.saturating_sub(m.duration);
        (TimePoint::zero() + delay).max(clamp)
    } else {
        state.entries[bi][k - 1] + m.min_prev
    };

    // Destination admission: a sitting batch blocks outright.
    if let Some(slots) = state.occupancy.get(&m.to) {
        for occ in slots {
            if occ.batch_idx != bi && occ.exit.is_none() {
                return Ok(Earliest::Blocked);
            }
        }
    }

    let mut t = ready;
    loop {
        let mut next = t;

        // Transporter availability plus empty deadhead to the pick-up.
        let avail = state.t_avail[m.t_idx];
        let reach = match state.t_pos[m.t_idx] {
            None => avail,
            Some(pos) => {
                let dh = transfer
                    .lookup(m.transporter, pos, m.from)
                    .map_err(RunError::Config)?
                    .transfer();
                avail + dh
            }
        };
        next = next.max(reach);

        // Station change gap after every earlier visitor.
        if let Some(slots) = state.occupancy.get(&m.to) {
            for occ in slots {
                if occ.batch_idx == bi {
                    continue;
                }
                if let Some(exit) = occ.exit {
                    let bound = (exit + ctx.change).saturating_sub(m.duration);
                    next = next.max(bound);
                }
            }
        }

        // Cross-transporter avoidance against the committed frontier.
        for &(obi, ok, ostart, oend) in &state.tasks {
            let other = &ctx.batches[obi].moves[ok];
            if other.t_idx == m.t_idx {
                continue;
            }
            if !windows_overlap(batch.window, ctx.batches[obi].window)
                || !windows_overlap(m.window, other.window)
                || !windows_overlap(m.stage_window, other.stage_window)
            {
                continue;
            }
            let limit = m.avoid_limit.max(other.avoid_limit);
            if limit.is_zero() || m.span.distance_to(&other.span) >= limit {
                continue;
            }
            let margin = avoid_margin(ctx.config, &m.span, &other.span);
            let end = next + m.duration;
            if end + margin <= ostart {
                continue;
            }
            if next < oend + margin {
                next = next.max(oend + margin);
            }
        }

        if next == t {
            break;
        }
        t = next;
    }

    // Processing window of the stage being lifted out of.
    if k > 0 {
        let latest = state.entries[bi][k - 1] + m.max_prev;
        if t > latest {
            return Ok(Earliest::MaxTime(t - latest));
        }
    }
    Ok(Earliest::At(t))
}

fn avoid_margin(config: &Phase2Config, a: &SpaceInterval, b: &SpaceInterval) -> TimeDelta {
    let mut margin = config.avoid_base_margin_s.max(0);
    if config.avoid_dynamic_enabled {
        let overlap = a
            .intersection(b)
            .map(|i| i.length().value())
            .unwrap_or(0);
        margin += (config.avoid_dynamic_per_mm_s * overlap as f64).ceil() as i64;
    }
    TimeDelta::new(margin)
}

fn commit_move(ctx: &Phase2Ctx<'_>, state: &mut DispatchState, bi: usize, t: TimePoint) {
    let batch = &ctx.batches[bi];
    let k = state.next_move[bi];
    let m = &batch.moves[k];
    let end = t + m.duration;

    if k == 0 {
        state.stage0_exit[bi] = Some(t);
        state.next_stage1 += 1;
        state.last_stage1_entry = state.last_stage1_entry.max(end);
    } else {
        // Lifting out fixes the previous stage's exit and stretch.
        let prev_entry = state.entries[bi][k - 1];
        let prev_stage = batch.moves[k - 1].stage;
        state
            .stage_times
            .insert((batch.id, prev_stage), (prev_entry, t));
        state.stretch += Cost::new((t - (prev_entry + m.min_prev)).value());
        if let Some(slots) = state.occupancy.get_mut(&m.from) {
            for occ in slots.iter_mut().rev() {
                if occ.batch_idx == bi && occ.exit.is_none() {
                    occ.exit = Some(t);
                    break;
                }
            }
        }
    }

    // Deadhead bookkeeping before the transporter moves on.
    if let Some(pos) = state.t_pos[m.t_idx] {
        let dh = ctx
            .problem
            .transfer()
            .get(m.transporter, pos, m.from)
            .map(|task| task.transfer())
            .unwrap_or(TimeDelta::zero());
        state.deadhead += Cost::new(dh.value());
    }
    state.t_avail[m.t_idx] = end;
    state.t_pos[m.t_idx] = Some(m.to);

    state.entries[bi][k] = end;
    let exit = if m.is_last {
        let exit = end + m.min_here;
        state.stage_times.insert((batch.id, m.stage), (end, exit));
        state.makespan = state.makespan.max(exit);
        Some(exit)
    } else {
        None
    };
    state
        .occupancy
        .entry(m.to)
        .or_default()
        .push(Occupancy {
            batch_idx: bi,
            exit,
        });
    state.tasks.push((bi, k, t, end));
    state.next_move[bi] += 1;
}

// ---------------------------------------------------------------------
// Repair loop and improvement search
// ---------------------------------------------------------------------

enum ComponentFailure {
    Config(MissingTransferError),
    Infeasible(Vec<ConflictRecord>),
}

fn run_with_repair(
    ctx: &Phase2Ctx<'_>,
    component: &[usize],
    base_delays: &[TimeDelta],
    priority: &[u64],
) -> Result<CandidateSol, ComponentFailure> {
    let mut delays = base_delays.to_vec();
    let retry_limit = 8 * component.len() + 8;
    for _ in 0..retry_limit {
        match run_dispatch(ctx, component, priority, &delays) {
            Ok(sol) => return Ok(sol),
            Err(RunError::Config(e)) => return Err(ComponentFailure::Config(e)),
            Err(RunError::MaxTime {
                batch_idx,
                stage,
                excess,
            }) => {
                let bump = excess.max(TimeDelta::new(1));
                delays[batch_idx] += bump;
                if delays[batch_idx] > ctx.problem.horizon() {
                    return Err(ComponentFailure::Infeasible(vec![max_time_conflict(
                        ctx, batch_idx, stage, excess,
                    )]));
                }
            }
            Err(RunError::Deadlock { batch_idxs }) => {
                return Err(ComponentFailure::Infeasible(deadlock_conflicts(
                    ctx,
                    &batch_idxs,
                )));
            }
        }
    }
    // Repair did not converge: report the tightest batches.
    Err(ComponentFailure::Infeasible(deadlock_conflicts(
        ctx, component,
    )))
}

fn max_time_conflict(
    ctx: &Phase2Ctx<'_>,
    batch_idx: usize,
    stage: StageIndex,
    excess: TimeDelta,
) -> ConflictRecord {
    let batch = &ctx.batches[batch_idx];
    let stations = batch.moves.iter().map(|m| m.to).collect();
    let transporters = batch.moves.iter().map(|m| m.transporter).collect();
    ConflictRecord::new(
        ConflictKind::TimingMismatch,
        vec![batch.id],
        vec![stage],
        stations,
        transporters,
        excess,
        TimeDelta::zero(),
    )
}

fn deadlock_conflicts(ctx: &Phase2Ctx<'_>, batch_idxs: &[usize]) -> Vec<ConflictRecord> {
    batch_idxs
        .iter()
        .filter(|&&bi| !ctx.batches[bi].moves.is_empty())
        .map(|&bi| {
            let batch = &ctx.batches[bi];
            ConflictRecord::new(
                ConflictKind::StationDoubleBook,
                vec![batch.id],
                batch.moves.iter().map(|m| m.stage).collect(),
                batch.moves.iter().map(|m| m.to).collect(),
                batch.moves.iter().map(|m| m.transporter).collect(),
                TimeDelta::zero(),
                ctx.change,
            )
        })
        .collect()
}

fn solve_component(
    ctx: &Phase2Ctx<'_>,
    component: &[usize],
    anchor_lower: bool,
    budget: &SearchBudget,
    log_progress: bool,
) -> Result<(CandidateSol, u64, u64), ComponentFailure> {
    let mut base_priority: Vec<u64> = vec![0; ctx.batches.len()];
    for (pos, &bi) in component.iter().enumerate() {
        base_priority[bi] = pos as u64;
    }
    let base_delays: Vec<TimeDelta> = ctx
        .batches
        .iter()
        .map(|b| {
            if anchor_lower {
                b.phase1_start - TimePoint::zero()
            } else {
                TimeDelta::zero()
            }
        })
        .collect();
    let initial = run_with_repair(ctx, component, &base_delays, &base_priority)?;
    if log_progress {
        info!(
            makespan = initial.cost.makespan.value(),
            deadhead = initial.cost.deadhead.value(),
            stretch = initial.cost.stretch.value(),
            "phase2 initial dispatch"
        );
    }

    if component.len() < 2 || budget.should_stop() {
        return Ok((initial, 1, 0));
    }

    let incumbent = Mutex::new(initial);
    let runs = std::sync::atomic::AtomicU64::new(1);
    let improvements = std::sync::atomic::AtomicU64::new(0);

    let workers = if ctx.config.workers > 0 {
        ctx.config.workers
    } else {
        rayon::current_num_threads().clamp(1, 8)
    };
    rayon::scope(|scope| {
        for w in 0..workers {
            let incumbent = &incumbent;
            let runs = &runs;
            let improvements = &improvements;
            let base = &base_priority;
            let base_delays = &base_delays;
            scope.spawn(move |_| {
                let mut rng = ChaCha8Rng::seed_from_u64(0x0C0A_57ED ^ (w as u64));
                let mut current = base.clone();
                let mut current_cost = incumbent
                    .lock()
                    .expect("phase-2 incumbent lock")
                    .cost;
                let mut stale = 0u32;
                while stale < STALE_LIMIT && !budget.should_stop() {
                    let mut trial = current.clone();
                    let a = component[rng.gen_range(0..component.len())];
                    let b = component[rng.gen_range(0..component.len())];
                    trial.swap(a, b);
                    runs.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                    match run_with_repair(ctx, component, base_delays, &trial) {
                        Ok(sol) if sol.cost < current_cost => {
                            current = trial;
                            current_cost = sol.cost;
                            stale = 0;
                            let mut best =
                                incumbent.lock().expect("phase-2 incumbent lock");
                            if sol.cost < best.cost {
                                if log_progress {
                                    info!(
                                        worker = w,
                                        makespan = sol.cost.makespan.value(),
                                        "phase2 incumbent improved"
                                    );
                                }
                                improvements
                                    .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                                *best = sol;
                            }
                        }
                        _ => stale += 1,
                    }
                }
            });
        }
    });

    Ok((
        incumbent.into_inner().expect("phase-2 incumbent lock"),
        runs.into_inner(),
        improvements.into_inner(),
    ))
}

/// Concatenates two component solutions, shifting the later one so the
/// inter-component gap is at least `guard`.
fn concatenate(first: CandidateSol, second: CandidateSol, guard: TimeDelta) -> CandidateSol {
    let first_end = first
        .stage_times
        .values()
        .map(|&(_, exit)| exit)
        .chain(first.tasks.iter().map(|t| t.end()))
        .max()
        .unwrap_or(TimePoint::zero());
    let second_start = second
        .stage0_exit
        .values()
        .copied()
        .chain(second.tasks.iter().map(|t| t.start()))
        .min()
        .unwrap_or(TimePoint::zero());
    let shift = (first_end + guard.max(TimeDelta::zero())) - second_start;
    let shift = if shift.is_negative() {
        TimeDelta::zero()
    } else {
        shift
    };

    let mut tasks = first.tasks;
    tasks.extend(second.tasks.iter().map(|t| {
        TransporterTask::new(
            t.transporter(),
            t.batch(),
            t.stage(),
            t.from(),
            t.to(),
            t.start() + shift,
            t.end() + shift,
        )
    }));
    let mut stage_times = first.stage_times;
    for (key, (entry, exit)) in second.stage_times {
        stage_times.insert(key, (entry + shift, exit + shift));
    }
    let mut stage0_exit = first.stage0_exit;
    for (batch, t) in second.stage0_exit {
        stage0_exit.insert(batch, t + shift);
    }
    let cost = LexCost {
        makespan: first.cost.makespan.max(second.cost.makespan + shift),
        deadhead: first.cost.deadhead + second.cost.deadhead,
        stretch: first.cost.stretch + second.cost.stretch,
    };
    CandidateSol {
        tasks,
        stage_times,
        stage0_exit,
        cost,
    }
}
