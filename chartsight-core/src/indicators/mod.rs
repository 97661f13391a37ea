//! Bar-series statistics shared by the extractors and the context gate.
//!
//! Everything here is a pure function of `&[OhlcBar]`. Empty or degenerate
//! input returns zero rather than NaN so callers can compare freely.

pub mod atr;
pub mod trend;

pub use atr::{average_true_range, true_range};
pub use trend::{assess_trend, TrendClass, TrendState};

use crate::domain::OhlcBar;

/// Arithmetic mean; zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn average_range(bars: &[OhlcBar]) -> f64 {
    mean(&bars.iter().map(OhlcBar::range).collect::<Vec<_>>())
}

pub fn average_body(bars: &[OhlcBar]) -> f64 {
    mean(&bars.iter().map(OhlcBar::body).collect::<Vec<_>>())
}

pub fn average_volume(bars: &[OhlcBar]) -> f64 {
    mean(&bars.iter().map(|b| b.volume_proxy).collect::<Vec<_>>())
}

/// The last `n` bars (or all of them when shorter).
pub fn tail(bars: &[OhlcBar], n: usize) -> &[OhlcBar] {
    &bars[bars.len().saturating_sub(n)..]
}

/// Up to `n` bars immediately before `index`.
pub fn before(bars: &[OhlcBar], index: usize, n: usize) -> &[OhlcBar] {
    let end = index.min(bars.len());
    &bars[end.saturating_sub(n)..end]
}

pub fn highest_high(bars: &[OhlcBar]) -> Option<f64> {
    bars.iter().map(|b| b.high).reduce(f64::max)
}

pub fn lowest_low(bars: &[OhlcBar]) -> Option<f64> {
    bars.iter().map(|b| b.low).reduce(f64::min)
}

/// Closing-price change over `period` bars, in units of average range.
pub fn normalized_momentum(bars: &[OhlcBar], period: usize) -> f64 {
    if period == 0 || bars.len() <= period {
        return 0.0;
    }
    let last = bars[bars.len() - 1].close;
    let base = bars[bars.len() - 1 - period].close;
    let avg_range = average_range(tail(bars, period * 2));
    if avg_range > 0.0 {
        (last - base) / avg_range
    } else {
        0.0
    }
}

/// Candle-style bars for unit tests: open at the previous close, wicks 0.5 beyond the body.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<OhlcBar> {
    let base = chrono::DateTime::<chrono::Utc>::from_timestamp(1_700_000_000, 0).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            OhlcBar {
                index: i,
                timestamp: base + chrono::Duration::seconds(60 * i as i64),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume_proxy: 10.0,
                source_position: 10 * i as u32,
            }
        })
        .collect()
}
