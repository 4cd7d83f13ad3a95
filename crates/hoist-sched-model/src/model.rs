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

//! Reference entities: stations, transporters, recipes, batches.
//!
//! All of these are immutable once handed to a
//! [`crate::problem::Problem`]; phases only ever borrow them.

use crate::{
    id::{BatchId, GroupId, RecipeId, StageIndex, StationId, TransporterId},
    kinematics::{AxisKinematics, HoistKinematics},
};
use hoist_sched_core::{
    space::{SpaceInterval, SpaceLength, SpacePosition},
    time::TimeDelta,
};

/// A physical position on the line. Capacity 1; stations sharing a group
/// are functionally interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Station {
    id: StationId,
    group: GroupId,
    position: SpacePosition,
}

impl Station {
    #[inline]
    pub const fn new(id: StationId, group: GroupId, position: SpacePosition) -> Self {
        Self {
            id,
            group,
            position,
        }
    }

    #[inline]
    pub const fn id(&self) -> StationId {
        self.id
    }

    #[inline]
    pub const fn group(&self) -> GroupId {
        self.group
    }

    #[inline]
    pub const fn position(&self) -> SpacePosition {
        self.position
    }
}

/// An overhead transporter serving a contiguous rail interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transporter {
    id: TransporterId,
    span: SpaceInterval,
    travel: AxisKinematics,
    hoist: HoistKinematics,
    avoid_limit: Option<SpaceLength>,
}

impl Transporter {
    #[inline]
    pub const fn new(
        id: TransporterId,
        span: SpaceInterval,
        travel: AxisKinematics,
        hoist: HoistKinematics,
        avoid_limit: Option<SpaceLength>,
    ) -> Self {
        Self {
            id,
            span,
            travel,
            hoist,
            avoid_limit,
        }
    }

    #[inline]
    pub const fn id(&self) -> TransporterId {
        self.id
    }

    /// Operating area `[x_min, x_max)` on the rail.
    #[inline]
    pub const fn span(&self) -> SpaceInterval {
        self.span
    }

    #[inline]
    pub const fn travel(&self) -> &AxisKinematics {
        &self.travel
    }

    #[inline]
    pub const fn hoist(&self) -> &HoistKinematics {
        &self.hoist
    }

    /// Spatial proximity below which this transporter must not operate
    /// simultaneously with another. `None` disables avoidance for pairs
    /// involving this transporter.
    #[inline]
    pub const fn avoid_limit(&self) -> Option<SpaceLength> {
        self.avoid_limit
    }

    /// Whether `position` lies inside the operating area (end-inclusive:
    /// the rightmost station of a span is servable).
    #[inline]
    pub fn covers(&self, position: SpacePosition) -> bool {
        self.span.contains(position) || position == self.span.end()
    }
}

/// Closed station-id interval `[min, max]` a recipe stage may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StationSpan {
    min: StationId,
    max: StationId,
}

impl StationSpan {
    #[inline]
    pub const fn new(min: StationId, max: StationId) -> Self {
        Self { min, max }
    }

    /// A span naming exactly one station.
    #[inline]
    pub const fn single(station: StationId) -> Self {
        Self {
            min: station,
            max: station,
        }
    }

    #[inline]
    pub const fn min(&self) -> StationId {
        self.min
    }

    #[inline]
    pub const fn max(&self) -> StationId {
        self.max
    }

    #[inline]
    pub fn contains(&self, station: StationId) -> bool {
        self.min <= station && station <= self.max
    }

    /// Iterates the station ids in the span, ascending.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = StationId> {
        (self.min.value()..=self.max.value()).map(StationId::new)
    }
}

/// One step of a recipe: a set of permissible stations and a processing
/// window `[min_time, max_time]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecipeStage {
    stations: StationSpan,
    min_time: TimeDelta,
    max_time: TimeDelta,
}

impl RecipeStage {
    #[inline]
    pub const fn new(stations: StationSpan, min_time: TimeDelta, max_time: TimeDelta) -> Self {
        Self {
            stations,
            min_time,
            max_time,
        }
    }

    #[inline]
    pub const fn stations(&self) -> StationSpan {
        self.stations
    }

    #[inline]
    pub const fn min_time(&self) -> TimeDelta {
        self.min_time
    }

    #[inline]
    pub const fn max_time(&self) -> TimeDelta {
        self.max_time
    }

    /// The signature tuple used for recipe-identity grouping.
    #[inline]
    pub(crate) fn signature(&self) -> (u32, u32, i64, i64) {
        (
            self.stations.min().value(),
            self.stations.max().value(),
            self.min_time.value(),
            self.max_time.value(),
        )
    }
}

/// An ordered stage sequence. Stage 0 is the virtual entry stage: the
/// batch waits there, without exclusivity, until the line admits it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Recipe {
    id: RecipeId,
    stages: Vec<RecipeStage>,
}

impl Recipe {
    #[inline]
    pub fn new(id: RecipeId, stages: Vec<RecipeStage>) -> Self {
        Self { id, stages }
    }

    #[inline]
    pub fn id(&self) -> RecipeId {
        self.id
    }

    #[inline]
    pub fn stages(&self) -> &[RecipeStage] {
        &self.stages
    }

    #[inline]
    pub fn stage(&self, idx: StageIndex) -> Option<&RecipeStage> {
        self.stages.get(idx.value())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The last (terminal) stage index.
    #[inline]
    pub fn last_stage(&self) -> StageIndex {
        StageIndex::new(self.stages.len().saturating_sub(1))
    }

    /// Indices of the processing stages, i.e. everything after stage 0.
    #[inline]
    pub fn processing_stages(&self) -> impl Iterator<Item = StageIndex> {
        (1..self.stages.len()).map(StageIndex::new)
    }

    /// Canonical stage-tuple signature: two recipes with equal signatures
    /// describe interchangeable batches.
    pub(crate) fn signature(&self) -> Vec<(u32, u32, i64, i64)> {
        self.stages.iter().map(RecipeStage::signature).collect()
    }
}

/// A work unit. `input_order` is the operator-given sequence position,
/// used only as a tie-break among batches with identical recipes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Batch {
    id: BatchId,
    recipe: RecipeId,
    input_order: u32,
}

impl Batch {
    #[inline]
    pub const fn new(id: BatchId, recipe: RecipeId, input_order: u32) -> Self {
        Self {
            id,
            recipe,
            input_order,
        }
    }

    #[inline]
    pub const fn id(&self) -> BatchId {
        self.id
    }

    #[inline]
    pub const fn recipe(&self) -> RecipeId {
        self.recipe
    }

    #[inline]
    pub const fn input_order(&self) -> u32 {
        self.input_order
    }
}
