//! Temporal consistency: how persistently recent bars agree, and which
//! timing risk factors are present.

use serde::{Deserialize, Serialize};

use super::{SignalExtractor, SignalSource};
use crate::domain::{Direction, OhlcBar, Signal, SignalKind, TradeAction};
use crate::indicators::{average_range, before, tail};

const PERSISTENCE_WINDOW: usize = 10;
const PERSISTENT: f64 = 0.7;
const FLIP_WINDOW: usize = 5;
const FLIP_BURST: usize = 3;
const RANGE_SHOCK: f64 = 4.0;
const GAP: f64 = 0.5;
const STALL_BARS: usize = 3;
/// Histories shorter than this are themselves a risk factor.
const SHORT_HISTORY: usize = 20;
const FACTOR_PENALTY: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemporalRisk {
    /// Three or more color flips within the last five bars.
    FlipBurst,
    /// The last bar's range dwarfs the recent average.
    RangeShock,
    /// The last bar opened away from the previous close.
    OpeningGap,
    /// The last bars barely moved.
    Stall,
    ShortHistory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalReport {
    pub risk_factors: Vec<TemporalRisk>,
    /// Share of recent directional bars agreeing with the net direction.
    pub persistence: f64,
    pub direction: Direction,
}

impl TemporalReport {
    pub fn risk_count(&self) -> usize {
        self.risk_factors.len()
    }
}

impl SignalSource for TemporalReport {
    fn signals(&self) -> Vec<Signal> {
        let penalty = (1.0 - FACTOR_PENALTY * self.risk_count() as f64).max(0.0);
        let signal = if self.persistence >= PERSISTENT && self.direction != Direction::Neutral {
            Signal::new(
                SignalKind::Temporal,
                "persistent",
                self.direction.to_action(),
                self.persistence * penalty,
            )
        } else if self.persistence > 0.0 {
            Signal::new(SignalKind::Temporal, "inconsistent", TradeAction::Wait, 0.3 * penalty)
        } else {
            Signal::neutral(SignalKind::Temporal, "no directional bars")
        };
        let mut signal = signal.with_evidence(format!("persistence {:.2}", self.persistence));
        for factor in &self.risk_factors {
            signal = signal.with_evidence(format!("{factor:?}"));
        }
        vec![signal]
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemporalAnalyzer;

impl SignalExtractor for TemporalAnalyzer {
    type Report = TemporalReport;

    fn name(&self) -> &str {
        "temporal"
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn extract(&self, bars: &[OhlcBar]) -> TemporalReport {
        let mut risk_factors = Vec::new();
        if bars.len() < SHORT_HISTORY {
            risk_factors.push(TemporalRisk::ShortHistory);
        }

        let recent = tail(bars, PERSISTENCE_WINDOW);
        let net = match (recent.first(), recent.last()) {
            (Some(first), Some(last)) => last.close - first.open,
            _ => 0.0,
        };
        let direction = Direction::from_sign(net);
        let directional: Vec<&OhlcBar> = recent.iter().filter(|b| b.close != b.open).collect();
        let persistence = if directional.is_empty() || direction == Direction::Neutral {
            0.0
        } else {
            let agreeing = directional
                .iter()
                .filter(|b| b.is_bullish() == (direction == Direction::Bullish))
                .count();
            agreeing as f64 / directional.len() as f64
        };

        if let Some(last) = bars.last() {
            let i = bars.len() - 1;
            let avg_range = average_range(before(bars, i, SHORT_HISTORY));

            let flips = tail(bars, FLIP_WINDOW)
                .windows(2)
                .filter(|w| w[0].close != w[0].open && w[1].close != w[1].open)
                .filter(|w| w[0].is_bullish() != w[1].is_bullish())
                .count();
            if flips >= FLIP_BURST {
                risk_factors.push(TemporalRisk::FlipBurst);
            }
            if avg_range > 0.0 && last.range() > avg_range * RANGE_SHOCK {
                risk_factors.push(TemporalRisk::RangeShock);
            }
            if i > 0 && avg_range > 0.0 && (last.open - bars[i - 1].close).abs() > avg_range * GAP {
                risk_factors.push(TemporalRisk::OpeningGap);
            }
            let stall = tail(bars, STALL_BARS);
            if bars.len() > STALL_BARS && avg_range > 0.0 {
                let hi = stall.iter().map(|b| b.high).fold(f64::MIN, f64::max);
                let lo = stall.iter().map(|b| b.low).fold(f64::MAX, f64::min);
                if hi - lo < avg_range * 0.5 {
                    risk_factors.push(TemporalRisk::Stall);
                }
            }
        }

        TemporalReport {
            risk_factors,
            persistence,
            direction,
        }
    }
}
