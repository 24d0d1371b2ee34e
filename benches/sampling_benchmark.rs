#![allow(clippy::expect_used, clippy::unwrap_used, missing_docs)]
//! Benchmark for the per-poll path: record gate plus running averages.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use perfwatch::prelude::*;
use perfwatch::scheduler::interval;

fn observe_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("observe");

    for polls in [100, 10_000, 1_000_000] {
        // 100 ms polls with a deterministic load pattern
        let samples: Vec<Sample> = (0..polls)
            .map(|i| {
                let t = f64::from(i) * 0.1;
                Sample::new(t, (i % 400) as f64, 512.0 + (i % 13) as f64, (i % 100) as f64, 2048.0)
            })
            .collect();

        for policy in [AggregationPolicy::Persisted, AggregationPolicy::EveryPoll] {
            group.bench_with_input(BenchmarkId::new(policy.to_string(), polls), &samples, |b, samples| {
                b.iter(|| {
                    let mut state = MonitorState::new(policy);
                    for sample in samples {
                        black_box(state.observe(*sample));
                    }
                    state.averages()
                });
            });
        }
    }

    group.finish();
}

fn interval_benchmark(c: &mut Criterion) {
    c.bench_function("interval", |b| {
        b.iter(|| {
            let mut total = 0.0;
            for i in 0..10_000u32 {
                total += interval(black_box(f64::from(i) * 0.5));
            }
            total
        });
    });
}

criterion_group!(benches, observe_benchmark, interval_benchmark);
criterion_main!(benches);
