//! Market regime classification and manipulation-risk scoring.
//!
//! All counts are deterministic functions of the bars: a fake move is a
//! breakout of the recent range that closes back against itself, a stop
//! hunt is a wick well beyond the recent extreme that closes back inside,
//! and a wick hunt is an oversized bar dominated by its wicks.

use serde::{Deserialize, Serialize};

use super::{SignalExtractor, SignalSource};
use crate::domain::{Direction, OhlcBar, Signal, SignalKind, TradeAction};
use crate::indicators::{average_range, before, highest_high, lowest_low, mean, tail};

const WINDOW: usize = 20;
const MIN_BARS: usize = 5;
const TREND_EFFICIENCY: f64 = 0.35;
const TREND_MAX_FLIP_RATE: f64 = 0.5;
const CHAOTIC_FLIP_RATE: f64 = 0.6;
const CHAOTIC_RANGE_CV: f64 = 0.6;
const MANIPULATED_RISK: f64 = 0.6;
const STOP_HUNT_OVERSHOOT: f64 = 0.3;
const WICK_HUNT_WICK_TO_BODY: f64 = 3.0;
const WICK_HUNT_RANGE: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketRegime {
    Trending,
    Ranging,
    Chaotic,
    Manipulated,
    /// Too few bars to classify.
    Undetermined,
}

impl MarketRegime {
    fn base_score(&self) -> f64 {
        match self {
            Self::Trending => 70.0,
            Self::Ranging => 50.0,
            Self::Chaotic => 25.0,
            Self::Manipulated => 15.0,
            Self::Undetermined => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManipulationCounts {
    pub fake_moves: usize,
    pub stop_hunts: usize,
    pub wick_hunts: usize,
}

impl ManipulationCounts {
    /// Weighted count mapped to `[0, 1]`.
    pub fn risk(&self) -> f64 {
        (self.fake_moves as f64 * 0.15 + self.stop_hunts as f64 * 0.2 + self.wick_hunts as f64 * 0.1).min(1.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketReport {
    pub regime: MarketRegime,
    pub direction: Direction,
    /// |net move| / Σ close-to-close moves over the window.
    pub efficiency: f64,
    /// Color changes between consecutive directional bars.
    pub reversals: usize,
    pub manipulation: ManipulationCounts,
    pub manipulation_risk: f64,
    /// 0–100; low values veto the decision.
    pub context_score: f64,
}

impl SignalSource for MarketReport {
    fn signals(&self) -> Vec<Signal> {
        let confidence = self.context_score / 100.0;
        let signal = match self.regime {
            MarketRegime::Undetermined => return vec![Signal::neutral(SignalKind::MarketRegime, "too few bars")],
            MarketRegime::Trending => Signal::new(SignalKind::MarketRegime, "trending", self.direction.to_action(), confidence),
            MarketRegime::Ranging => Signal::new(SignalKind::MarketRegime, "ranging", TradeAction::Wait, confidence * 0.5),
            MarketRegime::Chaotic => Signal::new(SignalKind::MarketRegime, "chaotic", TradeAction::Wait, confidence * 0.5),
            MarketRegime::Manipulated => {
                Signal::new(SignalKind::MarketRegime, "manipulated", TradeAction::Wait, confidence * 0.5)
            }
        };
        vec![signal
            .with_evidence(format!("efficiency {:.2}", self.efficiency))
            .with_evidence(format!("manipulation risk {:.2}", self.manipulation_risk))]
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegimeClassifier;

impl SignalExtractor for RegimeClassifier {
    type Report = MarketReport;

    fn name(&self) -> &str {
        "market_regime"
    }

    fn min_bars(&self) -> usize {
        MIN_BARS
    }

    fn extract(&self, bars: &[OhlcBar]) -> MarketReport {
        let window = tail(bars, WINDOW);
        if window.len() < MIN_BARS {
            return MarketReport {
                regime: MarketRegime::Undetermined,
                direction: Direction::Neutral,
                efficiency: 0.0,
                reversals: 0,
                manipulation: ManipulationCounts::default(),
                manipulation_risk: 0.0,
                context_score: 0.0,
            };
        }

        let net = window[window.len() - 1].close - window[0].close;
        let path: f64 = window.windows(2).map(|w| (w[1].close - w[0].close).abs()).sum();
        let efficiency = if path > 0.0 { net.abs() / path } else { 0.0 };

        let colors: Vec<bool> = window
            .iter()
            .filter(|b| b.close != b.open)
            .map(OhlcBar::is_bullish)
            .collect();
        let reversals = colors.windows(2).filter(|w| w[0] != w[1]).count();
        let flip_rate = if colors.len() > 1 {
            reversals as f64 / (colors.len() - 1) as f64
        } else {
            0.0
        };

        let manipulation = count_manipulation(window);
        let risk = manipulation.risk();

        let regime = if risk >= MANIPULATED_RISK {
            MarketRegime::Manipulated
        } else if efficiency >= TREND_EFFICIENCY && flip_rate <= TREND_MAX_FLIP_RATE {
            MarketRegime::Trending
        } else if flip_rate > CHAOTIC_FLIP_RATE && range_variation(window) > CHAOTIC_RANGE_CV {
            MarketRegime::Chaotic
        } else {
            MarketRegime::Ranging
        };

        let context_score = (regime.base_score() + 30.0 * efficiency - 30.0 * risk).clamp(0.0, 100.0);
        MarketReport {
            regime,
            direction: Direction::from_sign(net),
            efficiency,
            reversals,
            manipulation,
            manipulation_risk: risk,
            context_score,
        }
    }
}

/// Coefficient of variation of bar ranges.
fn range_variation(bars: &[OhlcBar]) -> f64 {
    let ranges: Vec<f64> = bars.iter().map(OhlcBar::range).collect();
    let m = mean(&ranges);
    if m <= 0.0 {
        return 0.0;
    }
    let var = ranges.iter().map(|r| (r - m).powi(2)).sum::<f64>() / ranges.len() as f64;
    var.sqrt() / m
}

pub fn count_manipulation(bars: &[OhlcBar]) -> ManipulationCounts {
    let mut counts = ManipulationCounts::default();
    let avg_range = average_range(bars);
    for i in 1..bars.len() {
        let bar = &bars[i];
        let prev_close = bars[i - 1].close;

        let recent = before(bars, i, 3);
        if let (Some(hi), Some(lo)) = (highest_high(recent), lowest_low(recent)) {
            let bull_trap = bar.high > hi && bar.close < prev_close;
            let bear_trap = bar.low < lo && bar.close > prev_close;
            if bull_trap || bear_trap {
                counts.fake_moves += 1;
            }
        }

        let prior = before(bars, i, 5);
        if let (Some(hi), Some(lo)) = (highest_high(prior), lowest_low(prior)) {
            let overshoot = avg_range * STOP_HUNT_OVERSHOOT;
            let inside = bar.close <= hi && bar.close >= lo;
            let wick_dominant = bar.upper_wick().max(bar.lower_wick()) >= bar.body() * 2.0;
            if inside && wick_dominant && (bar.high > hi + overshoot || bar.low < lo - overshoot) {
                counts.stop_hunts += 1;
            }
        }

        let wick = bar.upper_wick().max(bar.lower_wick());
        if avg_range > 0.0 && wick >= bar.body() * WICK_HUNT_WICK_TO_BODY && bar.range() >= avg_range * WICK_HUNT_RANGE {
            counts.wick_hunts += 1;
        }
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;
    use crate::signals::patterns::test_bars::bar;

    #[test]
    fn steady_trend_is_trending_with_high_context() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let report = RegimeClassifier.extract(&make_bars(&closes));
        assert_eq!(report.regime, MarketRegime::Trending);
        assert_eq!(report.direction, Direction::Bullish);
        assert_eq!(report.reversals, 0);
        assert!(report.context_score >= 90.0);
        assert_eq!(report.signals()[0].action, TradeAction::Buy);
    }

    #[test]
    fn alternating_bars_are_not_trending() {
        let closes: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect();
        let report = RegimeClassifier.extract(&make_bars(&closes));
        assert_ne!(report.regime, MarketRegime::Trending);
        assert!(report.context_score < 60.0);
        assert_eq!(report.signals()[0].action, TradeAction::Wait);
    }

    #[test]
    fn repeated_stop_hunts_flag_manipulation() {
        let mut bars = Vec::new();
        for i in 0..20 {
            if i % 6 == 5 {
                // Spike far below the recent range and close back inside.
                bars.push(bar(i, 100.1, 100.3, 96.0, 100.2));
            } else {
                bars.push(bar(i, 100.0, 100.5, 99.5, 100.2));
            }
        }
        let counts = count_manipulation(&bars);
        assert!(counts.stop_hunts >= 3);
        let report = RegimeClassifier.extract(&bars);
        assert!(report.manipulation_risk >= MANIPULATED_RISK);
        assert_eq!(report.regime, MarketRegime::Manipulated);
    }

    #[test]
    fn counts_are_deterministic() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + ((i * 7) % 5) as f64).collect();
        let bars = make_bars(&closes);
        assert_eq!(count_manipulation(&bars), count_manipulation(&bars));
    }

    #[test]
    fn too_few_bars_is_undetermined() {
        let report = RegimeClassifier.extract(&make_bars(&[1.0, 2.0, 3.0]));
        assert_eq!(report.regime, MarketRegime::Undetermined);
        assert_eq!(report.context_score, 0.0);
        assert_eq!(report.signals()[0].confidence, 0.0);
    }
}
