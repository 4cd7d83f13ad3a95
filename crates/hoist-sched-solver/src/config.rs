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

//! Solver configuration. Defaults mirror the production tuning of the
//! line this scheduler was built for; every knob documents its effect.

/// Phase-1 (station optimizer) knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase1Config {
    /// Wall-time cap in seconds; 0 = none. Phase 1 usually converges in
    /// seconds, so the default leaves it uncapped.
    pub time_limit_s: u64,
    /// Parallel search workers; 0 = library default.
    pub workers: usize,
    /// Prefer stations sharing a group across adjacent stages when several
    /// parallel stations are free. Reduces transporter hand-overs at a
    /// small flexibility cost.
    pub group_constraint_enabled: bool,
}

impl Default for Phase1Config {
    fn default() -> Self {
        Self {
            time_limit_s: 0,
            workers: 0,
            group_constraint_enabled: true,
        }
    }
}

/// Phase-2 (transporter optimizer) knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct Phase2Config {
    /// Wall-time cap in seconds. Phase 2 is the expensive step; 1800 s is
    /// a workable balance between quality and turnaround.
    pub time_limit_s: u64,
    /// Parallel improvement workers; 0 = library default.
    pub workers: usize,
    /// Margin in seconds added above the Phase-1 batch window
    /// `[Entry₁(b,1), Exit₁(b,last)]` when pruning the Phase-2 search.
    /// The window is not symmetric: Phase 1 is a lower bound, the margin
    /// only widens the top.
    pub window_margin_s: i64,
    /// Same, per stage: each stage may drift at most this far past its
    /// Phase-1 exit.
    pub stage_margin_s: i64,
    /// Margin on transporter move windows derived from the Phase-1
    /// skeleton.
    pub transporter_safe_margin_s: i64,
    /// Base temporal gap between spatially conflicting moves of different
    /// transporters.
    pub avoid_base_margin_s: i64,
    /// Add a proportional term to the avoid gap: seconds per millimetre of
    /// trajectory overlap.
    pub avoid_dynamic_enabled: bool,
    /// Coefficient of the dynamic term (s/mm). 0.002 means 2 s per metre
    /// of shared rail.
    pub avoid_dynamic_per_mm_s: f64,
    /// Split the instance into window-disjoint components and solve them
    /// independently. Pays off above roughly 30 batches; the validator
    /// still replays the concatenated schedule.
    pub decompose_enabled: bool,
    /// Minimum gap between concatenated components.
    pub decompose_guard_s: i64,
    /// Use the Phase-1 stage-1 entry as the window origin (anchored mode)
    /// instead of the Phase-1-with-margin window when pruning.
    pub anchor_stage1_enabled: bool,
}

impl Default for Phase2Config {
    fn default() -> Self {
        Self {
            time_limit_s: 1800,
            workers: 0,
            window_margin_s: 600,
            stage_margin_s: 300,
            transporter_safe_margin_s: 600,
            avoid_base_margin_s: 3,
            avoid_dynamic_enabled: false,
            avoid_dynamic_per_mm_s: 0.0,
            decompose_enabled: false,
            decompose_guard_s: 600,
            anchor_stage1_enabled: false,
        }
    }
}

/// Top-level configuration for a full pipeline run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchedulerConfig {
    pub phase1: Phase1Config,
    pub phase2: Phase2Config,
    /// Emit a tracing event for every incumbent improvement and search
    /// milestone. Verbose; meant for debugging long solves.
    pub log_search_progress: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_production_tuning() {
        let config = Phase2Config::default();
        assert_eq!(config.time_limit_s, 1800);
        assert_eq!(config.window_margin_s, 600);
        assert_eq!(config.stage_margin_s, 300);
        assert_eq!(config.transporter_safe_margin_s, 600);
        assert_eq!(config.avoid_base_margin_s, 3);
        assert!(!config.avoid_dynamic_enabled);
        assert!(!config.decompose_enabled);
        assert_eq!(config.decompose_guard_s, 600);
        assert!(!config.anchor_stage1_enabled);
    }

    #[test]
    fn test_phase1_defaults() {
        let config = Phase1Config::default();
        assert_eq!(config.time_limit_s, 0);
        assert_eq!(config.workers, 0);
        assert!(config.group_constraint_enabled);
    }
}
