//! Volatility tier from the ratio of short to long average true range.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{SignalExtractor, SignalSource};
use crate::domain::{OhlcBar, Signal, SignalKind, TradeAction};
use crate::indicators::average_true_range;

const SHORT_PERIOD: usize = 5;
const LONG_PERIOD: usize = 20;
const LOW_RATIO: f64 = 0.6;
const HIGH_RATIO: f64 = 1.6;
const EXTREME_RATIO: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityTier {
    Low,
    Normal,
    High,
    Extreme,
}

impl fmt::Display for VolatilityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Extreme => "extreme",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityReport {
    pub tier: VolatilityTier,
    pub atr_ratio: f64,
    pub short_atr: f64,
    pub long_atr: f64,
    /// False when there were too few bars; the tier then defaults to normal.
    pub measured: bool,
}

impl SignalSource for VolatilityReport {
    fn signals(&self) -> Vec<Signal> {
        if !self.measured {
            return vec![Signal::neutral(SignalKind::Volatility, "too few bars")];
        }
        // Volatility is non-directional; its confidence is how tradeable the tape is.
        let confidence = match self.tier {
            VolatilityTier::Normal => 0.6,
            VolatilityTier::Low => 0.4,
            VolatilityTier::High => 0.3,
            VolatilityTier::Extreme => 0.1,
        };
        vec![Signal::new(SignalKind::Volatility, self.tier.to_string(), TradeAction::Wait, confidence)
            .with_evidence(format!("atr ratio {:.2}", self.atr_ratio))]
    }
}

#[derive(Debug, Clone, Default)]
pub struct VolatilityClassifier;

impl SignalExtractor for VolatilityClassifier {
    type Report = VolatilityReport;

    fn name(&self) -> &str {
        "volatility"
    }

    fn min_bars(&self) -> usize {
        SHORT_PERIOD + 1
    }

    fn extract(&self, bars: &[OhlcBar]) -> VolatilityReport {
        let short_atr = average_true_range(bars, SHORT_PERIOD);
        let long_atr = average_true_range(bars, LONG_PERIOD);
        if bars.len() < self.min_bars() || long_atr <= 0.0 {
            return VolatilityReport {
                tier: VolatilityTier::Normal,
                atr_ratio: 1.0,
                short_atr,
                long_atr,
                measured: false,
            };
        }
        let atr_ratio = short_atr / long_atr;
        let tier = if atr_ratio < LOW_RATIO {
            VolatilityTier::Low
        } else if atr_ratio < HIGH_RATIO {
            VolatilityTier::Normal
        } else if atr_ratio < EXTREME_RATIO {
            VolatilityTier::High
        } else {
            VolatilityTier::Extreme
        };
        VolatilityReport {
            tier,
            atr_ratio,
            short_atr,
            long_atr,
            measured: true,
        }
    }
}
