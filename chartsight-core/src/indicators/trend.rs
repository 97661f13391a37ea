//! Trend assessment over a short window of closes.
//!
//! A trend is "clear" when the net move is large relative to bar ranges,
//! the path is efficient (little back-and-forth) and most closes agree
//! with the net direction.

use serde::{Deserialize, Serialize};

use super::average_range;
use crate::domain::{Direction, OhlcBar};

const CLEAR_MOVE: f64 = 3.0;
const CLEAR_EFFICIENCY: f64 = 0.5;
const CLEAR_AGREEMENT: f64 = 0.65;
const MODERATE_MOVE: f64 = 1.5;
const MODERATE_EFFICIENCY: f64 = 0.25;
const MODERATE_AGREEMENT: f64 = 0.55;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendClass {
    Clear,
    Moderate,
    Ambiguous,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendState {
    pub class: TrendClass,
    /// Neutral whenever the class is ambiguous.
    pub direction: Direction,
    /// Net close-to-close move in average-range units.
    pub normalized_move: f64,
    /// |net move| / total path length, in `[0, 1]`.
    pub efficiency: f64,
    /// Share of close-to-close steps agreeing with the net direction.
    pub agreement: f64,
    /// Composite clarity in `[0, 1]`; zero when ambiguous.
    pub clarity: f64,
}

impl TrendState {
    pub fn ambiguous() -> Self {
        Self {
            class: TrendClass::Ambiguous,
            direction: Direction::Neutral,
            normalized_move: 0.0,
            efficiency: 0.0,
            agreement: 0.0,
            clarity: 0.0,
        }
    }

    pub fn is_ambiguous(&self) -> bool {
        self.class == TrendClass::Ambiguous
    }
}

pub fn assess_trend(bars: &[OhlcBar]) -> TrendState {
    if bars.len() < 3 {
        return TrendState::ambiguous();
    }
    let first = bars[0].close;
    let last = bars[bars.len() - 1].close;
    let net = last - first;

    let mut path = 0.0;
    let mut ups = 0usize;
    let mut downs = 0usize;
    for pair in bars.windows(2) {
        let step = pair[1].close - pair[0].close;
        path += step.abs();
        if step > 0.0 {
            ups += 1;
        } else if step < 0.0 {
            downs += 1;
        }
    }

    let avg_range = average_range(bars);
    let normalized_move = if avg_range > 0.0 { net.abs() / avg_range } else { 0.0 };
    let efficiency = if path > 0.0 { net.abs() / path } else { 0.0 };
    let steps = ups + downs;
    let up_share = if steps > 0 { ups as f64 / steps as f64 } else { 0.5 };
    let agreement = if net >= 0.0 { up_share } else { 1.0 - up_share };

    let class = if normalized_move >= CLEAR_MOVE
        && efficiency >= CLEAR_EFFICIENCY
        && agreement >= CLEAR_AGREEMENT
    {
        TrendClass::Clear
    } else if normalized_move >= MODERATE_MOVE
        && efficiency >= MODERATE_EFFICIENCY
        && agreement >= MODERATE_AGREEMENT
    {
        TrendClass::Moderate
    } else {
        TrendClass::Ambiguous
    };

    if class == TrendClass::Ambiguous {
        return TrendState {
            normalized_move,
            efficiency,
            agreement,
            ..TrendState::ambiguous()
        };
    }

    let clarity = 0.4 * (normalized_move / 4.0).min(1.0) + 0.3 * efficiency + 0.3 * agreement;
    TrendState {
        class,
        direction: Direction::from_sign(net),
        normalized_move,
        efficiency,
        agreement,
        clarity: clarity.clamp(0.0, 1.0),
    }
}
