//! Seeded synthetic bar series for demos and tests.
//!
//! Produces a random walk from a starting price of 100.0. The same seed
//! always yields the same series.

use chartsight_core::domain::OhlcBar;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 2024-01-01T00:00:00Z; the first synthetic bar's timestamp.
const EPOCH_SECS: i64 = 1_704_067_200;
const BAR_SECS: i64 = 60;
const START_PRICE: f64 = 100.0;
const MAX_STEP: f64 = 0.02;
const MAX_WICK: f64 = 0.008;

/// Driftless random walk of `n` bars.
pub fn synthetic_bars(seed: u64, n: usize) -> Vec<OhlcBar> {
    synthetic_bars_with_drift(seed, n, 0.0)
}

/// Random walk whose per-bar return is shifted by `drift` (e.g. `0.004`
/// for a steady uptrend).
pub fn synthetic_bars_with_drift(seed: u64, n: usize, drift: f64) -> Vec<OhlcBar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let epoch = DateTime::<Utc>::from_timestamp(EPOCH_SECS, 0).unwrap_or_default();

    let mut bars = Vec::with_capacity(n);
    let mut price = START_PRICE;
    for index in 0..n {
        let step: f64 = rng.gen_range(-MAX_STEP..MAX_STEP) + drift;
        let open = price;
        let close = (price * (1.0 + step)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..MAX_WICK));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..MAX_WICK));
        let volume_proxy = rng.gen_range(5.0..50.0);

        bars.push(OhlcBar {
            index,
            timestamp: epoch + Duration::seconds(BAR_SECS * index as i64),
            open,
            high,
            low,
            close,
            volume_proxy,
            source_position: 0,
        });
        price = close;
    }
    bars
}
