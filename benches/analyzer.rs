//! Benchmarks for the kline analyzer.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pa_kline::prelude::*;

/// Deterministic pseudo-random walk
fn generate_bars(n: usize) -> Vec<Bar> {
  let mut bars = Vec::with_capacity(n);
  let mut price = 1.1000;

  for i in 0..n {
    let change = (((i * 7 + 13) % 100) as f64 / 50.0 - 1.0) * 0.0010;
    let wick = (2.0 + ((i * 3) % 10) as f64 / 5.0) * 0.0003;

    let o = price;
    let c = price + change;
    let h = o.max(c) + wick * 0.5;
    let l = o.min(c) - wick * 0.5;

    bars.push(Bar::new(i + 1, (i as i64) * 60, o, h, l, c));
    price = c;
  }

  bars
}

fn bench_analyze(c: &mut Criterion) {
  let bars = generate_bars(1000);
  let analyzer = KlineAnalyzer::new(AnalysisConfig::default()).unwrap();

  c.bench_function("analyze_1000_bars", |b| {
    b.iter(|| black_box(analyzer.analyze(black_box(&bars))))
  });
}

fn bench_filters(c: &mut Criterion) {
  let bars = generate_bars(1000);
  let mut group = c.benchmark_group("filters");

  for (name, tokens) in [
    ("none", vec!["wick=0"]),
    ("wick", vec!["wick=0.33"]),
    ("both_and", vec!["wick=0.33", "atr_mult=1.0", "both=on"]),
  ] {
    let config = AnalysisConfig::from_tokens(tokens).unwrap();
    let analyzer = KlineAnalyzer::new(config).unwrap();
    group.bench_function(name, |b| b.iter(|| black_box(analyzer.analyze(black_box(&bars)))));
  }

  group.finish();
}

fn bench_scaling(c: &mut Criterion) {
  let analyzer = KlineAnalyzer::new(AnalysisConfig::default()).unwrap();
  let mut group = c.benchmark_group("scaling");

  for size in [100, 1000, 10000].iter() {
    let bars = generate_bars(*size);

    group.bench_with_input(BenchmarkId::new("analyze", size), size, |b, _| {
      b.iter(|| black_box(analyzer.analyze(black_box(&bars))))
    });
  }

  group.finish();
}

fn bench_parallel(c: &mut Criterion) {
  let series: Vec<Vec<Bar>> = (0..4).map(|_| generate_bars(1000)).collect();
  let analyzer = KlineAnalyzer::new(AnalysisConfig::default()).unwrap();

  let instruments: Vec<(&str, &[Bar])> = vec![
    ("SYM1", &series[0]),
    ("SYM2", &series[1]),
    ("SYM3", &series[2]),
    ("SYM4", &series[3]),
  ];

  c.bench_function("parallel_analyze_4_instruments", |b| {
    b.iter(|| black_box(analyze_parallel(black_box(&analyzer), black_box(instruments.clone()))))
  });
}

fn bench_sweep(c: &mut Criterion) {
  let bars = generate_bars(1000);
  let base = AnalysisConfig::default();

  c.bench_function("sweep_atr_mult_grid", |b| {
    b.iter(|| black_box(sweep_grid(black_box(&bars), &base, "atr_mult")))
  });
}

criterion_group!(benches, bench_analyze, bench_filters, bench_scaling, bench_parallel, bench_sweep);
criterion_main!(benches);
