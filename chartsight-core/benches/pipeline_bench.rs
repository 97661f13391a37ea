//! Criterion benchmarks for chartsight hot paths.
//!
//! Benchmarks:
//! 1. Candle segmentation over a rendered chart
//! 2. Extractor suite (parallel vs sequential)
//! 3. Full image → decision cycle at several candle counts

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use chartsight_core::config::SegmenterConfig;
use chartsight_core::domain::{ChartRegion, OhlcBar, RasterImage, Rgb};
use chartsight_core::extraction::segment_candles;
use chartsight_core::signals::ExtractorSuite;
use chartsight_core::{AnalysisRequest, Pipeline};
use chrono::{DateTime, Duration, Utc};

// ── Helpers ──────────────────────────────────────────────────────────

const BACKGROUND: Rgb = Rgb::new(18, 30, 52);
const WICK: Rgb = Rgb::new(160, 160, 160);
const GREEN: Rgb = Rgb::new(38, 166, 91);
const RED: Rgb = Rgb::new(214, 48, 49);

fn as_of() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
}

fn make_bars(n: usize) -> Vec<OhlcBar> {
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.05;
            let open = 100.0 + ((i as f64 - 1.0) * 0.3).sin() * 5.0 + (i as f64 - 1.0) * 0.05;
            OhlcBar {
                index: i,
                timestamp: as_of() - Duration::seconds(60 * (n - 1 - i) as i64),
                open,
                high: open.max(close) + 0.4,
                low: open.min(close) - 0.4,
                close,
                volume_proxy: 10.0 + (i % 7) as f64,
                source_position: 10 * i as u32,
            }
        })
        .collect()
}

/// Sine-wave candles, 10 px apart, on a dark background.
fn make_chart(candles: u32) -> RasterImage {
    let width = candles * 10 + 40;
    let height = 300;
    let mut image = RasterImage::filled(width, height, BACKGROUND);
    let mut prev = 150.0_f64;
    for i in 0..candles {
        let next = 150.0 + (i as f64 * 0.3).sin() * 80.0;
        let x = 20 + i * 10;
        let (top, bottom) = (prev.min(next) as u32, prev.max(next).max(prev.min(next) + 2.0) as u32);
        image.fill_rect(x, top.saturating_sub(8), x, bottom + 8, WICK);
        let color = if next < prev { GREEN } else { RED };
        image.fill_rect(x - 3, top, x + 3, bottom, color);
        prev = next;
    }
    image
}

// ── 1. Segmentation ──────────────────────────────────────────────────

fn bench_segmentation(c: &mut Criterion) {
    let image = make_chart(120);
    let region = ChartRegion::full(&image);
    let config = SegmenterConfig::default();
    c.bench_function("segment_120_candles", |b| {
        b.iter(|| segment_candles(black_box(&image), &region, &config))
    });
}

// ── 2. Extractor suite ───────────────────────────────────────────────

fn bench_extractors(c: &mut Criterion) {
    let bars = make_bars(100);
    let suite = ExtractorSuite::default();
    let mut group = c.benchmark_group("extractor_suite");
    group.bench_function("parallel", |b| b.iter(|| suite.run(black_box(&bars))));
    group.bench_function("sequential", |b| b.iter(|| suite.run_sequential(black_box(&bars))));
    group.finish();
}

// ── 3. Full cycle ────────────────────────────────────────────────────

fn bench_full_cycle(c: &mut Criterion) {
    let pipeline = Pipeline::default();
    let request = AnalysisRequest::at(as_of());
    let mut group = c.benchmark_group("analyze_image");
    for n in [30u32, 60, 120] {
        let image = make_chart(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &image, |b, image| {
            b.iter(|| pipeline.analyze_image(black_box(image), &request))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_segmentation, bench_extractors, bench_full_cycle);
criterion_main!(benches);
