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

//! # Solver Control
//!
//! Wall-clock budgets, cooperative cancellation, and the outcome
//! vocabulary shared by both phases. A search checks its
//! [`SearchBudget`] at callback boundaries — at least once per explored
//! node or incumbent — so cancellation takes effect within a second.

use hoist_sched_model::sol::ConflictRecord;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::{Duration, Instant};

/// A cloneable cancellation flag. Setting it asks every search holding a
/// clone to stop at its next check point and return its best incumbent.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Why a search stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The search space was exhausted; the incumbent is optimal with
    /// respect to the search scheme.
    SearchExhausted,
    /// The improvement search ran out of moves before the budget expired.
    Converged,
    /// The wall-clock budget expired.
    TimeLimit,
    /// External cancellation.
    Cancelled,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TerminationReason::SearchExhausted => "search exhausted",
            TerminationReason::Converged => "converged",
            TerminationReason::TimeLimit => "time limit",
            TerminationReason::Cancelled => "cancelled",
        };
        write!(f, "{}", name)
    }
}

/// What a phase produced.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveResult<S> {
    /// Solution proved best within the search scheme.
    Optimal(S),
    /// Feasible solution without an optimality proof.
    Feasible(S),
    /// No feasible solution exists; the records name the tightest
    /// constraints encountered.
    Infeasible(Vec<ConflictRecord>),
    /// Cancelled before any incumbent was found.
    Cancelled,
}

impl<S> SolveResult<S> {
    #[inline]
    pub fn solution(&self) -> Option<&S> {
        match self {
            SolveResult::Optimal(s) | SolveResult::Feasible(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn into_solution(self) -> Option<S> {
        match self {
            SolveResult::Optimal(s) | SolveResult::Feasible(s) => Some(s),
            _ => None,
        }
    }

    #[inline]
    pub fn is_infeasible(&self) -> bool {
        matches!(self, SolveResult::Infeasible(_))
    }
}

/// Search counters reported alongside a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SolveStats {
    nodes: u64,
    improvements: u64,
    elapsed: Duration,
}

impl SolveStats {
    #[inline]
    pub fn new(nodes: u64, improvements: u64, elapsed: Duration) -> Self {
        Self {
            nodes,
            improvements,
            elapsed,
        }
    }

    #[inline]
    pub fn nodes(&self) -> u64 {
        self.nodes
    }

    #[inline]
    pub fn improvements(&self) -> u64 {
        self.improvements
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Result, termination reason, and counters of one phase solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveOutcome<S> {
    result: SolveResult<S>,
    reason: TerminationReason,
    stats: SolveStats,
}

impl<S> SolveOutcome<S> {
    #[inline]
    pub fn new(result: SolveResult<S>, reason: TerminationReason, stats: SolveStats) -> Self {
        Self {
            result,
            reason,
            stats,
        }
    }

    #[inline]
    pub fn result(&self) -> &SolveResult<S> {
        &self.result
    }

    #[inline]
    pub fn into_result(self) -> SolveResult<S> {
        self.result
    }

    #[inline]
    pub fn reason(&self) -> TerminationReason {
        self.reason
    }

    #[inline]
    pub fn stats(&self) -> &SolveStats {
        &self.stats
    }

    /// The "suboptimal, time limited" warning condition: a feasible
    /// solution was returned but the budget cut the search short.
    #[inline]
    pub fn time_limited(&self) -> bool {
        matches!(self.reason, TerminationReason::TimeLimit)
            && matches!(self.result, SolveResult::Feasible(_))
    }
}

/// Wall-clock budget plus cancellation, checked from search loops.
#[derive(Debug, Clone)]
pub struct SearchBudget {
    start: Instant,
    time_limit: Option<Duration>,
    cancel: CancelToken,
}

impl SearchBudget {
    /// `time_limit_s == 0` means unlimited.
    pub fn new(time_limit_s: u64, cancel: CancelToken) -> Self {
        Self {
            start: Instant::now(),
            time_limit: (time_limit_s > 0).then(|| Duration::from_secs(time_limit_s)),
            cancel,
        }
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    #[inline]
    pub fn expired(&self) -> bool {
        self.time_limit
            .map(|limit| self.start.elapsed() >= limit)
            .unwrap_or(false)
    }

    #[inline]
    pub fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the search must stop now, for either reason.
    #[inline]
    pub fn should_stop(&self) -> bool {
        self.cancelled() || self.expired()
    }

    /// The reason a stopped search reports, cancellation taking
    /// precedence.
    #[inline]
    pub fn stop_reason(&self) -> TerminationReason {
        if self.cancelled() {
            TerminationReason::Cancelled
        } else {
            TerminationReason::TimeLimit
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_roundtrip() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_budget_unlimited_never_expires() {
        let budget = SearchBudget::new(0, CancelToken::new());
        assert!(!budget.expired());
        assert!(!budget.should_stop());
    }

    #[test]
    fn test_budget_cancellation_wins() {
        let token = CancelToken::new();
        let budget = SearchBudget::new(0, token.clone());
        token.cancel();
        assert!(budget.should_stop());
        assert_eq!(budget.stop_reason(), TerminationReason::Cancelled);
    }

    #[test]
    fn test_outcome_time_limited_flag() {
        let outcome = SolveOutcome::new(
            SolveResult::Feasible(42u32),
            TerminationReason::TimeLimit,
            SolveStats::default(),
        );
        assert!(outcome.time_limited());

        let optimal = SolveOutcome::new(
            SolveResult::Optimal(42u32),
            TerminationReason::SearchExhausted,
            SolveStats::default(),
        );
        assert!(!optimal.time_limited());
    }

    #[test]
    fn test_result_solution_access() {
        let result: SolveResult<u32> = SolveResult::Feasible(7);
        assert_eq!(result.solution(), Some(&7));
        let none: SolveResult<u32> = SolveResult::Cancelled;
        assert!(none.solution().is_none());
    }
}
