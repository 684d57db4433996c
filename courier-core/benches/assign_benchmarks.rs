//! Criterion benchmarks for the greedy assignment heuristic.
//!
//! Measures assignment time across backlog sizes and slot counts. Inputs are
//! generated from a fixed seed so runs are comparable.
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench --package courier-core
//! ```

// Criterion macros generate code that triggers missing_docs warnings.
#![allow(missing_docs, reason = "Criterion macros generate undocumented code")]

use std::time::{Duration, SystemTime};

use courier_core::{AssignmentParams, Candidate, Order, OrderId, SlotKind, SlotLayout, assign};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use geo::Coord;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

const BENCHMARK_SEED: u64 = 0x00C0_FFEE;
const BACKLOG_SIZES: &[usize] = &[50, 200, 800];
const SLOT_COUNTS: &[usize] = &[3, 11];

/// Orders scattered within roughly 30 miles of the warehouse.
fn generate_candidates(count: usize, seed: u64) -> Vec<Candidate> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (1..=count as u64)
        .map(|id| {
            let order = Order::new(
                OrderId::new(id),
                format!("{id} Bench Ave"),
                SystemTime::UNIX_EPOCH + Duration::from_secs(id),
            );
            let coordinate = Coord {
                x: -73.9 + rng.gen_range(-0.4..0.4),
                y: 42.8 + rng.gen_range(-0.4..0.4),
            };
            let minutes = rng.gen_range(5..150);
            Candidate::resolved(order, coordinate, Duration::from_secs(minutes * 60))
        })
        .collect()
}

fn bench_assign(c: &mut Criterion) {
    let mut group = c.benchmark_group("assign");

    for &slots in SLOT_COUNTS {
        let params = AssignmentParams {
            layout: SlotLayout::new(SlotKind::Driver, slots).expect("slot count is non-zero"),
            warehouse: Coord { x: -73.9, y: 42.8 },
            max_travel: Duration::from_secs(120 * 60),
        };
        for &size in BACKLOG_SIZES {
            let candidates = generate_candidates(size, BENCHMARK_SEED);
            group.throughput(Throughput::Elements(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{slots}_slots"), size),
                &candidates,
                |b, candidates| b.iter(|| assign(candidates.clone(), &params)),
            );
        }
    }

    group.finish();
}

criterion_group!(benches, bench_assign);
criterion_main!(benches);
