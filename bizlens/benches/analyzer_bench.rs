use bizlens::analysis::{Granularity, TableAnalyzer};
use bizlens::test_fixtures::{sample_sales_analyzer, sample_sales_batch};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

const ROW_COUNTS: [usize; 3] = [1_000, 10_000, 100_000];

fn analyzers() -> Vec<(usize, TableAnalyzer)> {
    ROW_COUNTS
        .iter()
        .map(|&n| (n, sample_sales_analyzer(n, 42).unwrap()))
        .collect()
}

fn benchmark_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("load");

    for n in ROW_COUNTS {
        let batch = sample_sales_batch(n, 42).unwrap();
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &batch, |b, batch| {
            b.iter(|| TableAnalyzer::from_record_batch(black_box(batch)).unwrap());
        });
    }

    group.finish();
}

fn benchmark_summary_stats(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary_stats");

    for (n, analyzer) in analyzers() {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &analyzer, |b, analyzer| {
            b.iter(|| black_box(analyzer.summary_stats()));
        });
    }

    group.finish();
}

fn benchmark_period_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("period_aggregate");

    for (n, analyzer) in analyzers() {
        group.throughput(Throughput::Elements(n as u64));
        for granularity in [Granularity::Day, Granularity::Month] {
            group.bench_with_input(
                BenchmarkId::new(granularity.label(), n),
                &analyzer,
                |b, analyzer| {
                    b.iter(|| {
                        analyzer
                            .period_aggregate("date", "sales_amount", black_box(granularity))
                            .unwrap()
                    });
                },
            );
        }
    }

    group.finish();
}

fn benchmark_segment_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("segment_aggregate");

    for (n, analyzer) in analyzers() {
        group.throughput(Throughput::Elements(n as u64));
        // few distinct values versus many
        for segment in ["region", "customer_id"] {
            group.bench_with_input(BenchmarkId::new(segment, n), &analyzer, |b, analyzer| {
                b.iter(|| {
                    analyzer
                        .segment_aggregate(black_box(segment), "sales_amount")
                        .unwrap()
                });
            });
        }
    }

    group.finish();
}

fn benchmark_correlation_matrix(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation_matrix");

    for (n, analyzer) in analyzers() {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &analyzer, |b, analyzer| {
            b.iter(|| black_box(analyzer.correlation_matrix()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_load,
    benchmark_summary_stats,
    benchmark_period_aggregate,
    benchmark_segment_aggregate,
    benchmark_correlation_matrix
);
criterion_main!(benches);
