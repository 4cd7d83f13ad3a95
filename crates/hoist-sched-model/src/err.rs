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

//! Structured configuration errors.
//!
//! Each rejected condition carries its offending keys so callers can point
//! at the exact input row. Everything here is fatal: a problem that fails
//! to build produces no partial output.

use crate::id::{BatchId, GroupId, RecipeId, StageIndex, StationId, TransporterId};
use hoist_sched_core::time::TimeDelta;
use std::fmt::Display;

/// Coarse classification mirroring the failure-reporting contract:
/// `ConfigMissing` for absent reference data, `ConfigInvalid` for
/// out-of-domain parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ConfigMissing,
    ConfigInvalid,
}

/// A transfer-table lookup referenced a pair the table does not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MissingTransferError {
    transporter: TransporterId,
    from: StationId,
    to: StationId,
}

impl MissingTransferError {
    #[inline]
    pub fn new(transporter: TransporterId, from: StationId, to: StationId) -> Self {
        Self {
            transporter,
            from,
            to,
        }
    }

    #[inline]
    pub fn transporter(&self) -> TransporterId {
        self.transporter
    }

    #[inline]
    pub fn from(&self) -> StationId {
        self.from
    }

    #[inline]
    pub fn to(&self) -> StationId {
        self.to
    }
}

impl Display for MissingTransferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "No transfer entry for {} moving {} -> {}",
            self.transporter, self.from, self.to
        )
    }
}

impl std::error::Error for MissingTransferError {}

/// No transporter's operating area covers both endpoints of a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NoCarrierError {
    batch: BatchId,
    stage: StageIndex,
    from: StationId,
    to: StationId,
}

impl NoCarrierError {
    #[inline]
    pub fn new(batch: BatchId, stage: StageIndex, from: StationId, to: StationId) -> Self {
        Self {
            batch,
            stage,
            from,
            to,
        }
    }

    #[inline]
    pub fn batch(&self) -> BatchId {
        self.batch
    }

    #[inline]
    pub fn stage(&self) -> StageIndex {
        self.stage
    }

    #[inline]
    pub fn from(&self) -> StationId {
        self.from
    }

    #[inline]
    pub fn to(&self) -> StationId {
        self.to
    }
}

impl Display for NoCarrierError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "No transporter can carry {} ({}) from {} to {}",
            self.batch, self.stage, self.from, self.to
        )
    }
}

impl std::error::Error for NoCarrierError {}

/// A kinematic parameter is outside its domain (non-positive speed or
/// acceleration).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidKinematicsError {
    transporter: TransporterId,
    parameter: &'static str,
    value: f64,
}

impl InvalidKinematicsError {
    #[inline]
    pub fn new(transporter: TransporterId, parameter: &'static str, value: f64) -> Self {
        Self {
            transporter,
            parameter,
            value,
        }
    }

    #[inline]
    pub fn transporter(&self) -> TransporterId {
        self.transporter
    }

    #[inline]
    pub fn parameter(&self) -> &'static str {
        self.parameter
    }

    #[inline]
    pub fn value(&self) -> f64 {
        self.value
    }
}

impl Display for InvalidKinematicsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} has out-of-domain {} = {}",
            self.transporter, self.parameter, self.value
        )
    }
}

impl std::error::Error for InvalidKinematicsError {}

/// A stage window violates `0 <= min_time <= max_time`, or stage 0 has a
/// nonzero minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageWindowError {
    recipe: RecipeId,
    stage: StageIndex,
    min_time: TimeDelta,
    max_time: TimeDelta,
}

impl StageWindowError {
    #[inline]
    pub fn new(
        recipe: RecipeId,
        stage: StageIndex,
        min_time: TimeDelta,
        max_time: TimeDelta,
    ) -> Self {
        Self {
            recipe,
            stage,
            min_time,
            max_time,
        }
    }

    #[inline]
    pub fn recipe(&self) -> RecipeId {
        self.recipe
    }

    #[inline]
    pub fn stage(&self) -> StageIndex {
        self.stage
    }

    #[inline]
    pub fn min_time(&self) -> TimeDelta {
        self.min_time
    }

    #[inline]
    pub fn max_time(&self) -> TimeDelta {
        self.max_time
    }
}

impl Display for StageWindowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} has invalid window [{}, {}]",
            self.recipe, self.stage, self.min_time, self.max_time
        )
    }
}

impl std::error::Error for StageWindowError {}

/// A stage's station span is inverted or references an unknown station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StageStationsError {
    recipe: RecipeId,
    stage: StageIndex,
    min: StationId,
    max: StationId,
}

impl StageStationsError {
    #[inline]
    pub fn new(recipe: RecipeId, stage: StageIndex, min: StationId, max: StationId) -> Self {
        Self {
            recipe,
            stage,
            min,
            max,
        }
    }

    #[inline]
    pub fn recipe(&self) -> RecipeId {
        self.recipe
    }

    #[inline]
    pub fn stage(&self) -> StageIndex {
        self.stage
    }

    #[inline]
    pub fn min(&self) -> StationId {
        self.min
    }

    #[inline]
    pub fn max(&self) -> StationId {
        self.max
    }
}

impl Display for StageStationsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} has unusable station span [{}, {}]",
            self.recipe, self.stage, self.min, self.max
        )
    }
}

impl std::error::Error for StageStationsError {}

/// A stage span mixes stations from different groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupMismatchError {
    recipe: RecipeId,
    stage: StageIndex,
    station: StationId,
    expected: GroupId,
    found: GroupId,
}

impl GroupMismatchError {
    #[inline]
    pub fn new(
        recipe: RecipeId,
        stage: StageIndex,
        station: StationId,
        expected: GroupId,
        found: GroupId,
    ) -> Self {
        Self {
            recipe,
            stage,
            station,
            expected,
            found,
        }
    }

    #[inline]
    pub fn recipe(&self) -> RecipeId {
        self.recipe
    }

    #[inline]
    pub fn stage(&self) -> StageIndex {
        self.stage
    }

    #[inline]
    pub fn station(&self) -> StationId {
        self.station
    }

    #[inline]
    pub fn expected(&self) -> GroupId {
        self.expected
    }

    #[inline]
    pub fn found(&self) -> GroupId {
        self.found
    }
}

impl Display for GroupMismatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {} spans {} of {} where {} was expected",
            self.recipe, self.stage, self.station, self.found, self.expected
        )
    }
}

impl std::error::Error for GroupMismatchError {}

/// Everything that can go wrong while assembling a problem snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum ProblemBuildError {
    DuplicateStation(StationId),
    DuplicateTransporter(TransporterId),
    DuplicateRecipe(RecipeId),
    DuplicateBatch(BatchId),
    InvalidKinematics(InvalidKinematicsError),
    EmptyRecipe(RecipeId),
    StageWindow(StageWindowError),
    StageStations(StageStationsError),
    GroupMismatch(GroupMismatchError),
    UnknownRecipe { batch: BatchId, recipe: RecipeId },
    MissingTransfer(MissingTransferError),
    NoCarrier(NoCarrierError),
}

impl ProblemBuildError {
    /// The coarse failure class this error reports as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProblemBuildError::UnknownRecipe { .. }
            | ProblemBuildError::MissingTransfer(_)
            | ProblemBuildError::NoCarrier(_) => ErrorKind::ConfigMissing,
            _ => ErrorKind::ConfigInvalid,
        }
    }
}

impl Display for ProblemBuildError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProblemBuildError::DuplicateStation(id) => write!(f, "Duplicate {}", id),
            ProblemBuildError::DuplicateTransporter(id) => write!(f, "Duplicate {}", id),
            ProblemBuildError::DuplicateRecipe(id) => write!(f, "Duplicate {}", id),
            ProblemBuildError::DuplicateBatch(id) => write!(f, "Duplicate {}", id),
            ProblemBuildError::InvalidKinematics(e) => e.fmt(f),
            ProblemBuildError::EmptyRecipe(id) => write!(f, "{} has no stages", id),
            ProblemBuildError::StageWindow(e) => e.fmt(f),
            ProblemBuildError::StageStations(e) => e.fmt(f),
            ProblemBuildError::GroupMismatch(e) => e.fmt(f),
            ProblemBuildError::UnknownRecipe { batch, recipe } => {
                write!(f, "{} references unknown {}", batch, recipe)
            }
            ProblemBuildError::MissingTransfer(e) => e.fmt(f),
            ProblemBuildError::NoCarrier(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for ProblemBuildError {}

impl From<MissingTransferError> for ProblemBuildError {
    fn from(value: MissingTransferError) -> Self {
        ProblemBuildError::MissingTransfer(value)
    }
}

impl From<NoCarrierError> for ProblemBuildError {
    fn from(value: NoCarrierError) -> Self {
        ProblemBuildError::NoCarrier(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_transfer_display() {
        let err = MissingTransferError::new(
            TransporterId::new(1),
            StationId::new(301),
            StationId::new(302),
        );
        assert_eq!(
            format!("{}", err),
            "No transfer entry for TransporterId(1) moving StationId(301) -> StationId(302)"
        );
    }

    #[test]
    fn test_kind_classification() {
        let missing: ProblemBuildError = MissingTransferError::new(
            TransporterId::new(1),
            StationId::new(301),
            StationId::new(302),
        )
        .into();
        assert_eq!(missing.kind(), ErrorKind::ConfigMissing);

        let invalid = ProblemBuildError::StageWindow(StageWindowError::new(
            RecipeId::new(1),
            StageIndex::new(1),
            TimeDelta::new(100),
            TimeDelta::new(50),
        ));
        assert_eq!(invalid.kind(), ErrorKind::ConfigInvalid);
    }
}
