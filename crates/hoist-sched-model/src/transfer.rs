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

//! # Transfer-Time Table
//!
//! The preprocessed lookup every phase consults: for each `(transporter,
//! from, to)` triple reachable by that transporter, the lift, horizontal
//! transfer, and sink times of a loaded move. Identity pairs are included
//! — a rack lifted and sunk back into the same station has zero transfer
//! but nonzero lift + sink.
//!
//! From the table two derived quantities feed the solvers:
//! `average_task_time` (mean of the total task times, nearest second) and
//! `change_time = 2 * average_task_time`, the mandatory gap between two
//! different batches occupying the same station consecutively.
//!
//! A lookup for a pair the table does not hold is a fatal configuration
//! error; the scheduler never guesses travel times.

use crate::{
    err::MissingTransferError,
    id::{StationId, TransporterId},
    model::{Station, Transporter},
};
use hoist_sched_core::time::TimeDelta;
use std::collections::BTreeMap;

/// Timing of one loaded move: lift at the source, horizontal transfer,
/// sink at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransferTask {
    lift: TimeDelta,
    transfer: TimeDelta,
    sink: TimeDelta,
}

impl TransferTask {
    #[inline]
    pub const fn new(lift: TimeDelta, transfer: TimeDelta, sink: TimeDelta) -> Self {
        Self {
            lift,
            transfer,
            sink,
        }
    }

    #[inline]
    pub const fn lift(&self) -> TimeDelta {
        self.lift
    }

    #[inline]
    pub const fn transfer(&self) -> TimeDelta {
        self.transfer
    }

    #[inline]
    pub const fn sink(&self) -> TimeDelta {
        self.sink
    }

    /// Full task duration: `lift + transfer + sink`.
    #[inline]
    pub fn total(&self) -> TimeDelta {
        self.lift + self.transfer + self.sink
    }
}

/// The full `(transporter, from, to) -> TransferTask` table plus the
/// derived averages. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferTable {
    entries: BTreeMap<(TransporterId, StationId, StationId), TransferTask>,
    average_task_time: TimeDelta,
    change_time: TimeDelta,
}

impl TransferTable {
    /// Builds the table from station coordinates and transporter
    /// kinematics. Every ordered pair of stations inside a transporter's
    /// operating area gets an entry, identity pairs included.
    pub fn build(stations: &[Station], transporters: &[Transporter]) -> Self {
        let mut entries = BTreeMap::new();
        for transporter in transporters {
            let lift = transporter.hoist().lift_time();
            let sink = transporter.hoist().sink_time();
            let servable: Vec<&Station> = stations
                .iter()
                .filter(|s| transporter.covers(s.position()))
                .collect();
            for from in &servable {
                for to in &servable {
                    let distance = from.position().distance_to(to.position());
                    let transfer = transporter.travel().travel_time(distance);
                    entries.insert(
                        (transporter.id(), from.id(), to.id()),
                        TransferTask::new(lift, transfer, sink),
                    );
                }
            }
        }
        Self::from_entries(entries)
    }

    /// Assembles a table from externally supplied entries (e.g. a
    /// pre-tabulated transfer matrix) and derives the averages.
    pub fn from_entries(
        entries: impl IntoIterator<Item = ((TransporterId, StationId, StationId), TransferTask)>,
    ) -> Self {
        let entries: BTreeMap<_, _> = entries.into_iter().collect();
        let average_task_time = Self::mean_total(&entries);
        let change_time = average_task_time * 2;
        Self {
            entries,
            average_task_time,
            change_time,
        }
    }

    fn mean_total(
        entries: &BTreeMap<(TransporterId, StationId, StationId), TransferTask>,
    ) -> TimeDelta {
        if entries.is_empty() {
            return TimeDelta::zero();
        }
        let sum: i64 = entries.values().map(|t| t.total().value()).sum();
        let mean = sum as f64 / entries.len() as f64;
        TimeDelta::new(mean.round() as i64)
    }

    /// Mean total task time over all entries, nearest second.
    #[inline]
    pub fn average_task_time(&self) -> TimeDelta {
        self.average_task_time
    }

    /// Mandatory same-station gap between different batches:
    /// `2 * average_task_time`.
    #[inline]
    pub fn change_time(&self) -> TimeDelta {
        self.change_time
    }

    #[inline]
    pub fn get(
        &self,
        transporter: TransporterId,
        from: StationId,
        to: StationId,
    ) -> Option<TransferTask> {
        self.entries.get(&(transporter, from, to)).copied()
    }

    /// Fallible lookup; a missing pair is a fatal configuration error.
    #[inline]
    pub fn lookup(
        &self,
        transporter: TransporterId,
        from: StationId,
        to: StationId,
    ) -> Result<TransferTask, MissingTransferError> {
        self.get(transporter, from, to)
            .ok_or_else(|| MissingTransferError::new(transporter, from, to))
    }

    /// The transporter bound to a move: the smallest id able to serve both
    /// endpoints.
    pub fn carrier_for(&self, from: StationId, to: StationId) -> Option<TransporterId> {
        self.entries
            .keys()
            .filter(|(_, f, t)| *f == from && *t == to)
            .map(|(carrier, _, _)| *carrier)
            .min()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&(TransporterId, StationId, StationId), &TransferTask)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        id::GroupId,
        kinematics::{AxisKinematics, HoistKinematics},
    };
    use hoist_sched_core::space::{SpaceInterval, SpaceLength, SpacePosition};

    fn station(id: u32, x: i64) -> Station {
        Station::new(StationId::new(id), GroupId::new(id), SpacePosition::new(x))
    }

    fn transporter(id: u32, x_min: i64, x_max: i64) -> Transporter {
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
            None,
        )
    }

    #[test]
    fn test_build_covers_all_reachable_pairs() {
        let stations = [station(301, 1000), station(302, 2000), station(303, 3000)];
        let table = TransferTable::build(&stations, &[transporter(1, 0, 5000)]);
        // 3 stations -> 9 ordered pairs including identities.
        assert_eq!(table.len(), 9);
    }

    #[test]
    fn test_identity_pair_has_lift_and_sink_only() {
        let stations = [station(301, 1000)];
        let table = TransferTable::build(&stations, &[transporter(1, 0, 5000)]);
        let task = table
            .get(TransporterId::new(1), StationId::new(301), StationId::new(301))
            .unwrap();
        assert_eq!(task.transfer(), TimeDelta::zero());
        assert_eq!(task.lift(), TimeDelta::new(13));
        assert_eq!(task.sink(), TimeDelta::new(15));
        assert_eq!(task.total(), TimeDelta::new(28));
    }

    #[test]
    fn test_out_of_area_station_excluded() {
        let stations = [station(301, 1000), station(302, 9000)];
        let table = TransferTable::build(&stations, &[transporter(1, 0, 5000)]);
        assert!(table
            .get(TransporterId::new(1), StationId::new(301), StationId::new(302))
            .is_none());
        assert!(table
            .get(TransporterId::new(1), StationId::new(301), StationId::new(301))
            .is_some());
    }

    #[test]
    fn test_lookup_missing_is_error() {
        let table = TransferTable::from_entries([]);
        let err = table
            .lookup(TransporterId::new(1), StationId::new(301), StationId::new(302))
            .unwrap_err();
        assert_eq!(err.from(), StationId::new(301));
        assert_eq!(err.to(), StationId::new(302));
    }

    #[test]
    fn test_average_and_change_time() {
        let zero = TimeDelta::zero();
        let entries = [
            (
                (TransporterId::new(1), StationId::new(301), StationId::new(302)),
                TransferTask::new(zero, TimeDelta::new(10), zero),
            ),
            (
                (TransporterId::new(1), StationId::new(302), StationId::new(301)),
                TransferTask::new(zero, TimeDelta::new(21), zero),
            ),
        ];
        let table = TransferTable::from_entries(entries);
        // mean(10, 21) = 15.5 -> 16 (nearest)
        assert_eq!(table.average_task_time(), TimeDelta::new(16));
        assert_eq!(table.change_time(), TimeDelta::new(32));
    }

    #[test]
    fn test_carrier_for_prefers_smallest_id() {
        let stations = [station(301, 1000), station(302, 2000)];
        let table =
            TransferTable::build(&stations, &[transporter(2, 0, 5000), transporter(1, 0, 5000)]);
        assert_eq!(
            table.carrier_for(StationId::new(301), StationId::new(302)),
            Some(TransporterId::new(1))
        );
    }

    #[test]
    fn test_carrier_for_none_when_uncovered() {
        let stations = [station(301, 1000), station(302, 9000)];
        let table = TransferTable::build(&stations, &[transporter(1, 0, 5000)]);
        assert_eq!(table.carrier_for(StationId::new(301), StationId::new(302)), None);
    }
}
