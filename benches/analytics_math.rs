//! 分析计算的性能基准测试

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use storestats::services::{CohortEntry, CohortKind, DateRange, underperforming};
use storestats::stats::metrics::{median, store_conversion_rate};

fn cohort(size: usize) -> Vec<CohortEntry> {
    (0..size)
        .map(|i| {
            let i = i as i64;
            CohortEntry {
                id: i,
                views: 50 + (i * 37) % 1_000,
                purchases: (i * 13) % 40,
                revenue: (i * 7_919) % 500_000,
            }
        })
        .collect()
}

// ============== underperforming::analyze 基准测试 ==============

fn bench_underperforming(c: &mut Criterion) {
    let mut group = c.benchmark_group("analytics/underperforming");

    for size in [10usize, 100, 1_000, 10_000] {
        let entries = cohort(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &entries, |b, entries| {
            b.iter(|| underperforming::analyze(CohortKind::Product, black_box(entries), 10));
        });
    }

    group.finish();
}

// ============== 指标计算基准测试 ==============

fn bench_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("analytics/metrics");

    group.bench_function("store_conversion_rate", |b| {
        b.iter(|| store_conversion_rate(black_box(37), black_box(1_234)));
    });

    let views: Vec<i64> = cohort(10_000).iter().map(|e| e.views).collect();
    group.bench_function("median_10k", |b| {
        b.iter(|| median(black_box(&views)));
    });

    group.bench_function("date_range_parse", |b| {
        b.iter(|| DateRange::parse(black_box(Some("2026-01-01")), black_box(Some("2026-01-31"))));
    });

    group.finish();
}

criterion_group!(benches, bench_underperforming, bench_metrics);
criterion_main!(benches);
