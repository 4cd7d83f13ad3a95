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

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use hoist_sched_model::{
    id::{GroupId, StationId, TransporterId},
    kinematics::{AxisKinematics, HoistKinematics},
    model::{Station, Transporter},
    transfer::TransferTable,
};
use hoist_sched_core::space::{SpaceInterval, SpaceLength, SpacePosition};
use std::hint::black_box;

fn transporter(id: u32, x_max: i64) -> Transporter {
    Transporter::new(
        TransporterId::new(id),
        SpaceInterval::new(SpacePosition::new(0), SpacePosition::new(x_max)),
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

fn bench_travel_time(c: &mut Criterion) {
    let axis = AxisKinematics::new(300.0, 500.0, 500.0);
    let mut group = c.benchmark_group("travel_time");
    for distance in [50_i64, 1000, 10_000] {
        group.bench_with_input(
            BenchmarkId::from_parameter(distance),
            &distance,
            |b, &d| b.iter(|| axis.travel_time(black_box(SpaceLength::new(d)))),
        );
    }
    group.finish();
}

fn bench_transfer_table_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer_table_build");
    for n in [8usize, 32, 128] {
        let stations: Vec<Station> = (0..n)
            .map(|i| {
                Station::new(
                    StationId::new(300 + i as u32),
                    GroupId::new(i as u32),
                    SpacePosition::new(1000 * i as i64),
                )
            })
            .collect();
        let transporters = vec![transporter(1, 1000 * n as i64)];
        group.throughput(Throughput::Elements((n * n) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| TransferTable::build(black_box(&stations), black_box(&transporters)))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_travel_time, bench_transfer_table_build);
criterion_main!(benches);
