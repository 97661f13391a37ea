//! Candle — pixel-space geometry of one detected candlestick.

use serde::{Deserialize, Serialize};

/// Body color class resolved from a single pixel sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandleColor {
    Green,
    Red,
    Black,
    White,
}

impl CandleColor {
    /// Green bodies close at the top of the body; every other color closes at the bottom.
    pub fn closes_high(&self) -> bool {
        matches!(self, Self::Green)
    }
}

/// Candle geometry in image pixel coordinates (rows grow downward).
///
/// `x` is the horizontal center. Vertical bounds are inclusive rows with
/// `wick_top <= body_top <= body_bottom <= wick_bottom` for well-formed output
/// from the segmenter; downstream code does not rely on it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub x: u32,
    pub width: u32,
    pub body_top: u32,
    pub body_bottom: u32,
    pub wick_top: u32,
    pub wick_bottom: u32,
    pub color: CandleColor,
    /// Detection confidence in `[0, 0.95]`.
    pub confidence: f64,
}

impl Candle {
    pub fn body_height(&self) -> u32 {
        self.body_bottom.saturating_sub(self.body_top) + 1
    }

    pub fn total_height(&self) -> u32 {
        self.wick_bottom.saturating_sub(self.wick_top) + 1
    }

    /// Fraction of the total height occupied by the body.
    pub fn body_fraction(&self) -> f64 {
        self.body_height() as f64 / self.total_height().max(1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heights_are_inclusive() {
        let c = Candle {
            x: 10,
            width: 5,
            body_top: 20,
            body_bottom: 29,
            wick_top: 10,
            wick_bottom: 39,
            color: CandleColor::Green,
            confidence: 0.9,
        };
        assert_eq!(c.body_height(), 10);
        assert_eq!(c.total_height(), 30);
        assert!((c.body_fraction() - 1.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn only_green_closes_high() {
        assert!(CandleColor::Green.closes_high());
        assert!(!CandleColor::Red.closes_high());
        assert!(!CandleColor::White.closes_high());
        assert!(!CandleColor::Black.closes_high());
    }
}
