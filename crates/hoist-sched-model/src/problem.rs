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

//! # Problem Snapshot
//!
//! The validated, immutable input both optimization phases consume:
//! reference entities, the preprocessed transfer table, and the derived
//! recipe-identity batch groups. Building a `Problem` is the single
//! validation point of the core — everything downstream may rely on the
//! invariants checked here.

use crate::{
    err::{
        GroupMismatchError, InvalidKinematicsError, ProblemBuildError, StageStationsError,
        StageWindowError,
    },
    id::{BatchId, RecipeId, StageIndex, StationId, TransporterId},
    model::{Batch, Recipe, RecipeStage, Station, Transporter},
    transfer::TransferTable,
};
use hoist_sched_core::{space::SpacePosition, time::TimeDelta};
use std::collections::HashMap;

/// Summary figures of a problem instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProblemStats {
    station_count: usize,
    transporter_count: usize,
    batch_count: usize,
    recipe_count: usize,
    /// Sum over batches of their minimum processing content; a crude lower
    /// bound on total line work.
    total_min_processing: TimeDelta,
}

impl ProblemStats {
    #[inline]
    pub fn station_count(&self) -> usize {
        self.station_count
    }

    #[inline]
    pub fn transporter_count(&self) -> usize {
        self.transporter_count
    }

    #[inline]
    pub fn batch_count(&self) -> usize {
        self.batch_count
    }

    #[inline]
    pub fn recipe_count(&self) -> usize {
        self.recipe_count
    }

    #[inline]
    pub fn total_min_processing(&self) -> TimeDelta {
        self.total_min_processing
    }
}

/// The immutable scheduling input.
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    stations: Vec<Station>,
    station_index: HashMap<StationId, usize>,
    transporters: Vec<Transporter>,
    recipes: Vec<Recipe>,
    recipe_index: HashMap<RecipeId, usize>,
    batches: Vec<Batch>,
    transfer: TransferTable,
    horizon: TimeDelta,
    identity_groups: Vec<Vec<BatchId>>,
    stats: ProblemStats,
}

impl Problem {
    /// Default scheduling horizon: 48 hours. Stage-0 windows are open up
    /// to this bound.
    pub const DEFAULT_HORIZON: TimeDelta = TimeDelta::new(48 * 3600);

    /// Validates the reference data and derives the transfer table from
    /// the transporters' kinematics.
    pub fn new(
        stations: Vec<Station>,
        transporters: Vec<Transporter>,
        recipes: Vec<Recipe>,
        batches: Vec<Batch>,
        horizon: TimeDelta,
    ) -> Result<Self, ProblemBuildError> {
        let transfer = TransferTable::build(&stations, &transporters);
        Self::with_transfer_table(stations, transporters, recipes, batches, horizon, transfer)
    }

    /// Like [`Problem::new`], but with an externally tabulated transfer
    /// table (the production preprocessor delivers one).
    pub fn with_transfer_table(
        stations: Vec<Station>,
        mut transporters: Vec<Transporter>,
        recipes: Vec<Recipe>,
        mut batches: Vec<Batch>,
        horizon: TimeDelta,
        transfer: TransferTable,
    ) -> Result<Self, ProblemBuildError> {
        let mut station_index = HashMap::with_capacity(stations.len());
        for (i, station) in stations.iter().enumerate() {
            if station_index.insert(station.id(), i).is_some() {
                return Err(ProblemBuildError::DuplicateStation(station.id()));
            }
        }

        transporters.sort_by_key(Transporter::id);
        for pair in transporters.windows(2) {
            if pair[0].id() == pair[1].id() {
                return Err(ProblemBuildError::DuplicateTransporter(pair[0].id()));
            }
        }
        for transporter in &transporters {
            validate_kinematics(transporter)?;
        }

        let mut recipe_index = HashMap::with_capacity(recipes.len());
        for (i, recipe) in recipes.iter().enumerate() {
            if recipe_index.insert(recipe.id(), i).is_some() {
                return Err(ProblemBuildError::DuplicateRecipe(recipe.id()));
            }
            validate_recipe(recipe, &stations, &station_index, horizon)?;
        }

        batches.sort_by_key(|b| (b.input_order(), b.id()));
        let mut seen = HashMap::with_capacity(batches.len());
        for batch in &batches {
            if seen.insert(batch.id(), ()).is_some() {
                return Err(ProblemBuildError::DuplicateBatch(batch.id()));
            }
            if !recipe_index.contains_key(&batch.recipe()) {
                return Err(ProblemBuildError::UnknownRecipe {
                    batch: batch.id(),
                    recipe: batch.recipe(),
                });
            }
        }

        let identity_groups = group_by_signature(&batches, &recipes, &recipe_index);
        let stats = ProblemStats {
            station_count: stations.len(),
            transporter_count: transporters.len(),
            batch_count: batches.len(),
            recipe_count: recipes.len(),
            total_min_processing: batches
                .iter()
                .map(|b| {
                    let recipe = &recipes[recipe_index[&b.recipe()]];
                    recipe.stages().iter().map(RecipeStage::min_time).sum::<TimeDelta>()
                })
                .sum(),
        };

        Ok(Self {
            stations,
            station_index,
            transporters,
            recipes,
            recipe_index,
            batches,
            transfer,
            horizon,
            identity_groups,
            stats,
        })
    }

    #[inline]
    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    #[inline]
    pub fn station(&self, id: StationId) -> Option<&Station> {
        self.station_index.get(&id).map(|&i| &self.stations[i])
    }

    /// Rail coordinate of a station known to exist.
    #[inline]
    pub fn position_of(&self, id: StationId) -> SpacePosition {
        self.station(id)
            .expect("station id validated at problem build")
            .position()
    }

    #[inline]
    pub fn transporters(&self) -> &[Transporter] {
        &self.transporters
    }

    #[inline]
    pub fn transporter(&self, id: TransporterId) -> Option<&Transporter> {
        self.transporters.iter().find(|t| t.id() == id)
    }

    #[inline]
    pub fn recipes(&self) -> &[Recipe] {
        &self.recipes
    }

    #[inline]
    pub fn recipe(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipe_index.get(&id).map(|&i| &self.recipes[i])
    }

    /// Recipe of a batch that passed validation.
    #[inline]
    pub fn recipe_of(&self, batch: &Batch) -> &Recipe {
        self.recipe(batch.recipe())
            .expect("batch recipe validated at problem build")
    }

    /// Batches in input order.
    #[inline]
    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    #[inline]
    pub fn batch(&self, id: BatchId) -> Option<&Batch> {
        self.batches.iter().find(|b| b.id() == id)
    }

    #[inline]
    pub fn transfer(&self) -> &TransferTable {
        &self.transfer
    }

    #[inline]
    pub fn horizon(&self) -> TimeDelta {
        self.horizon
    }

    #[inline]
    pub fn average_task_time(&self) -> TimeDelta {
        self.transfer.average_task_time()
    }

    #[inline]
    pub fn change_time(&self) -> TimeDelta {
        self.transfer.change_time()
    }

    /// Batches partitioned by canonical recipe signature. Within a group
    /// the operator-given input order is preserved; groups are ordered by
    /// their first batch.
    #[inline]
    pub fn identity_groups(&self) -> &[Vec<BatchId>] {
        &self.identity_groups
    }

    /// The stations a stage may use: the id span filtered to the group of
    /// its lower bound.
    pub fn allowed_stations(&self, stage: &RecipeStage) -> Vec<StationId> {
        let anchor_group = match self.station(stage.stations().min()) {
            Some(s) => s.group(),
            None => return Vec::new(),
        };
        stage
            .stations()
            .iter()
            .filter(|id| {
                self.station(*id)
                    .map(|s| s.group() == anchor_group)
                    .unwrap_or(false)
            })
            .collect()
    }

    #[inline]
    pub fn stats(&self) -> &ProblemStats {
        &self.stats
    }
}

fn validate_kinematics(transporter: &Transporter) -> Result<(), ProblemBuildError> {
    let checks = [
        ("v_max", transporter.travel().v_max()),
        ("a_accel", transporter.travel().a_accel()),
        ("a_decel", transporter.travel().a_decel()),
        ("v_slow", transporter.hoist().v_slow()),
        ("v_fast", transporter.hoist().v_fast()),
    ];
    for (parameter, value) in checks {
        if !(value > 0.0) || !value.is_finite() {
            return Err(ProblemBuildError::InvalidKinematics(
                InvalidKinematicsError::new(transporter.id(), parameter, value),
            ));
        }
    }
    Ok(())
}

fn validate_recipe(
    recipe: &Recipe,
    stations: &[Station],
    station_index: &HashMap<StationId, usize>,
    horizon: TimeDelta,
) -> Result<(), ProblemBuildError> {
    if recipe.is_empty() {
        return Err(ProblemBuildError::EmptyRecipe(recipe.id()));
    }
    for (idx, stage) in recipe.stages().iter().enumerate() {
        let stage_idx = StageIndex::new(idx);
        let span = stage.stations();
        if span.min() > span.max() {
            return Err(ProblemBuildError::StageStations(StageStationsError::new(
                recipe.id(),
                stage_idx,
                span.min(),
                span.max(),
            )));
        }
        // The entry stage is the `[0, horizon]` waiting window.
        if stage.min_time().is_negative()
            || stage.min_time() > stage.max_time()
            || (stage_idx.is_entry()
                && (stage.min_time() != TimeDelta::zero() || stage.max_time() > horizon))
        {
            return Err(ProblemBuildError::StageWindow(StageWindowError::new(
                recipe.id(),
                stage_idx,
                stage.min_time(),
                stage.max_time(),
            )));
        }
        let anchor = match station_index.get(&span.min()) {
            Some(&i) => stations[i].group(),
            None => {
                return Err(ProblemBuildError::StageStations(StageStationsError::new(
                    recipe.id(),
                    stage_idx,
                    span.min(),
                    span.max(),
                )));
            }
        };
        for id in span.iter() {
            match station_index.get(&id) {
                None => {
                    return Err(ProblemBuildError::StageStations(StageStationsError::new(
                        recipe.id(),
                        stage_idx,
                        span.min(),
                        span.max(),
                    )));
                }
                Some(&i) if stations[i].group() != anchor => {
                    return Err(ProblemBuildError::GroupMismatch(GroupMismatchError::new(
                        recipe.id(),
                        stage_idx,
                        id,
                        anchor,
                        stations[i].group(),
                    )));
                }
                Some(_) => {}
            }
        }
    }
    Ok(())
}

fn group_by_signature(
    batches: &[Batch],
    recipes: &[Recipe],
    recipe_index: &HashMap<RecipeId, usize>,
) -> Vec<Vec<BatchId>> {
    let mut groups: Vec<(Vec<(u32, u32, i64, i64)>, Vec<BatchId>)> = Vec::new();
    for batch in batches {
        let signature = recipes[recipe_index[&batch.recipe()]].signature();
        match groups.iter_mut().find(|(sig, _)| *sig == signature) {
            Some((_, members)) => members.push(batch.id()),
            None => groups.push((signature, vec![batch.id()])),
        }
    }
    groups.into_iter().map(|(_, members)| members).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        id::GroupId,
        kinematics::{AxisKinematics, HoistKinematics},
        model::StationSpan,
    };
    use hoist_sched_core::space::{SpaceInterval, SpaceLength, SpacePosition};

    fn station(id: u32, group: u32, x: i64) -> Station {
        Station::new(StationId::new(id), GroupId::new(group), SpacePosition::new(x))
    }

    fn transporter(id: u32) -> Transporter {
        Transporter::new(
            TransporterId::new(id),
            SpaceInterval::new(SpacePosition::new(0), SpacePosition::new(5000)),
            AxisKinematics::new(300.0, 500.0, 500.0),
            HoistKinematics::new(
                SpaceLength::new(2000),
                SpaceLength::new(200),
                SpaceLength::new(400),
                SpaceLength::new(100),
                50.0,
                250.0,
            ),
            None,
        )
    }

    fn stage(min: u32, max: u32, lo: i64, hi: i64) -> RecipeStage {
        RecipeStage::new(
            StationSpan::new(StationId::new(min), StationId::new(max)),
            TimeDelta::new(lo),
            TimeDelta::new(hi),
        )
    }

    fn simple_recipe(id: u32) -> Recipe {
        Recipe::new(
            RecipeId::new(id),
            vec![
                stage(301, 301, 0, 48 * 3600),
                stage(302, 302, 600, 720),
                stage(303, 303, 0, 720),
            ],
        )
    }

    fn stations() -> Vec<Station> {
        vec![
            station(301, 1, 1000),
            station(302, 2, 2000),
            station(303, 3, 3000),
        ]
    }

    fn build(
        recipes: Vec<Recipe>,
        batches: Vec<Batch>,
    ) -> Result<Problem, ProblemBuildError> {
        Problem::new(
            stations(),
            vec![transporter(1)],
            recipes,
            batches,
            Problem::DEFAULT_HORIZON,
        )
    }

    #[test]
    fn test_build_valid_problem() {
        let problem = build(
            vec![simple_recipe(1)],
            vec![Batch::new(BatchId::new(1), RecipeId::new(1), 0)],
        )
        .unwrap();
        assert_eq!(problem.stats().batch_count(), 1);
        assert_eq!(problem.stats().station_count(), 3);
        assert_eq!(problem.position_of(StationId::new(302)), SpacePosition::new(2000));
    }

    #[test]
    fn test_duplicate_station_rejected() {
        let result = Problem::new(
            vec![station(301, 1, 1000), station(301, 1, 1500)],
            vec![transporter(1)],
            vec![],
            vec![],
            Problem::DEFAULT_HORIZON,
        );
        assert_eq!(
            result.unwrap_err(),
            ProblemBuildError::DuplicateStation(StationId::new(301))
        );
    }

    #[test]
    fn test_invalid_kinematics_rejected() {
        let bad = Transporter::new(
            TransporterId::new(1),
            SpaceInterval::new(SpacePosition::new(0), SpacePosition::new(5000)),
            AxisKinematics::new(0.0, 500.0, 500.0),
            HoistKinematics::new(
                SpaceLength::new(2000),
                SpaceLength::new(200),
                SpaceLength::new(400),
                SpaceLength::new(100),
                50.0,
                250.0,
            ),
            None,
        );
        let result = Problem::new(stations(), vec![bad], vec![], vec![], Problem::DEFAULT_HORIZON);
        assert!(matches!(
            result.unwrap_err(),
            ProblemBuildError::InvalidKinematics(e) if e.parameter() == "v_max"
        ));
    }

    #[test]
    fn test_inverted_window_rejected() {
        let recipe = Recipe::new(
            RecipeId::new(1),
            vec![stage(301, 301, 0, 48 * 3600), stage(302, 302, 720, 600)],
        );
        let result = build(vec![recipe], vec![]);
        assert!(matches!(
            result.unwrap_err(),
            ProblemBuildError::StageWindow(_)
        ));
    }

    #[test]
    fn test_nonzero_entry_stage_min_rejected() {
        let recipe = Recipe::new(RecipeId::new(1), vec![stage(301, 301, 10, 48 * 3600)]);
        let result = build(vec![recipe], vec![]);
        assert!(matches!(
            result.unwrap_err(),
            ProblemBuildError::StageWindow(_)
        ));
    }

    #[test]
    fn test_entry_stage_window_beyond_horizon_rejected() {
        let recipe = Recipe::new(RecipeId::new(1), vec![stage(301, 301, 0, 49 * 3600)]);
        let result = build(vec![recipe], vec![]);
        assert!(matches!(
            result.unwrap_err(),
            ProblemBuildError::StageWindow(_)
        ));
    }

    #[test]
    fn test_unknown_station_in_span_rejected() {
        let recipe = Recipe::new(
            RecipeId::new(1),
            vec![stage(301, 301, 0, 48 * 3600), stage(309, 309, 0, 100)],
        );
        let result = build(vec![recipe], vec![]);
        assert!(matches!(
            result.unwrap_err(),
            ProblemBuildError::StageStations(_)
        ));
    }

    #[test]
    fn test_group_mismatch_rejected() {
        // 301 and 302 are in different groups; a span over both is invalid.
        let recipe = Recipe::new(
            RecipeId::new(1),
            vec![stage(301, 301, 0, 48 * 3600), stage(301, 302, 0, 100)],
        );
        let result = build(vec![recipe], vec![]);
        assert!(matches!(
            result.unwrap_err(),
            ProblemBuildError::GroupMismatch(_)
        ));
    }

    #[test]
    fn test_unknown_recipe_rejected() {
        let result = build(
            vec![simple_recipe(1)],
            vec![Batch::new(BatchId::new(1), RecipeId::new(9), 0)],
        );
        assert!(matches!(
            result.unwrap_err(),
            ProblemBuildError::UnknownRecipe { .. }
        ));
    }

    #[test]
    fn test_identity_groups_cross_recipe_ids() {
        // Recipes 1 and 2 have identical signatures; recipe 3 differs.
        let other = Recipe::new(
            RecipeId::new(3),
            vec![
                stage(301, 301, 0, 48 * 3600),
                stage(302, 302, 100, 720),
                stage(303, 303, 0, 720),
            ],
        );
        let problem = build(
            vec![simple_recipe(1), simple_recipe(2), other],
            vec![
                Batch::new(BatchId::new(1), RecipeId::new(1), 0),
                Batch::new(BatchId::new(2), RecipeId::new(2), 1),
                Batch::new(BatchId::new(3), RecipeId::new(3), 2),
                Batch::new(BatchId::new(4), RecipeId::new(1), 3),
            ],
        )
        .unwrap();
        let groups = problem.identity_groups();
        assert_eq!(groups.len(), 2);
        assert_eq!(
            groups[0],
            vec![BatchId::new(1), BatchId::new(2), BatchId::new(4)]
        );
        assert_eq!(groups[1], vec![BatchId::new(3)]);
    }

    #[test]
    fn test_allowed_stations_filters_by_group() {
        let stations = vec![
            station(301, 1, 1000),
            station(302, 1, 2000),
            station(303, 3, 3000),
        ];
        let problem = Problem::new(
            stations,
            vec![transporter(1)],
            vec![Recipe::new(
                RecipeId::new(1),
                vec![stage(301, 302, 0, 48 * 3600)],
            )],
            vec![],
            Problem::DEFAULT_HORIZON,
        )
        .unwrap();
        let stage = problem.recipes()[0].stages()[0];
        assert_eq!(
            problem.allowed_stations(&stage),
            vec![StationId::new(301), StationId::new(302)]
        );
    }

    #[test]
    fn test_batches_sorted_by_input_order() {
        let problem = build(
            vec![simple_recipe(1)],
            vec![
                Batch::new(BatchId::new(2), RecipeId::new(1), 5),
                Batch::new(BatchId::new(1), RecipeId::new(1), 3),
            ],
        )
        .unwrap();
        let ids: Vec<u32> = problem.batches().iter().map(|b| b.id().value()).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
