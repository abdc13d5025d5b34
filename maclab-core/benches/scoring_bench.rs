//! Criterion benchmarks for transfer functions.
//!
//! Run with: `cargo bench -p maclab-core`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use maclab_core::scoring::{ConvexTransfer, LinearTransfer, PercentileTransfer};
use maclab_core::TransferFunction;

fn history(n: usize) -> Vec<f64> {
    (0..n).map(|i| ((i * 37) % 101) as f64).collect()
}

fn bench_transfers(c: &mut Criterion) {
    let mut group = c.benchmark_group("transfer");

    let linear = TransferFunction::Linear(LinearTransfer::rising(20.0, 120.0));
    group.bench_function("linear", |b| {
        b.iter(|| linear.score(black_box(75.0), &[]))
    });

    let convex = TransferFunction::Convex(ConvexTransfer::default());
    group.bench_function("convex", |b| {
        b.iter(|| convex.score(black_box(31.5), &[]))
    });

    for lookback in [60usize, 250, 1000] {
        let pct = TransferFunction::PercentileRank(PercentileTransfer::new(lookback, lookback / 4));
        let hist = history(lookback);
        group.bench_with_input(
            BenchmarkId::new("percentile_rank", lookback),
            &hist,
            |b, hist| b.iter(|| pct.score(black_box(50.0), hist)),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_transfers);
criterion_main!(benches);
