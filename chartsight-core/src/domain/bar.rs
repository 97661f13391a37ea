//! OHLC bar — one synthesized candlestick record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One bar of the synthesized series.
///
/// Prices live on the synthetic normalized scale produced by calibration.
/// Every bar built by the synthesizer satisfies
/// `low <= min(open, close) <= max(open, close) <= high`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcBar {
    pub index: usize,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Relative ink-mass heuristic, not traded volume.
    pub volume_proxy: f64,
    /// Horizontal pixel position of the source candle.
    pub source_position: u32,
}

impl OhlcBar {
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn body_top(&self) -> f64 {
        self.open.max(self.close)
    }

    pub fn body_bottom(&self) -> f64 {
        self.open.min(self.close)
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.body_top()
    }

    pub fn lower_wick(&self) -> f64 {
        self.body_bottom() - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Body as a fraction of range; zero for a zero-range bar.
    pub fn body_ratio(&self) -> f64 {
        let range = self.range();
        if range > 0.0 {
            self.body() / range
        } else {
            0.0
        }
    }

    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// The OHLC ordering invariant, with all prices finite.
    pub fn is_sane(&self) -> bool {
        let finite = self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite();
        finite && self.low <= self.body_bottom() && self.body_top() <= self.high
    }
}
