//! Signals — the independent output unit of every extractor.
//!
//! Signals are immutable once emitted. They describe what an extractor saw
//! in the bar series, never what the aggregator eventually decides.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Trade action voted for by a signal, a component or the final decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeAction {
    Buy,
    Sell,
    Wait,
}

impl TradeAction {
    pub fn is_directional(&self) -> bool {
        !matches!(self, Self::Wait)
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
            Self::Wait => Self::Wait,
        }
    }
}

impl fmt::Display for TradeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::Wait => "wait",
        };
        f.write_str(s)
    }
}

/// Market direction implied by a pattern, event or trend read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    pub fn to_action(self) -> TradeAction {
        match self {
            Self::Bullish => TradeAction::Buy,
            Self::Bearish => TradeAction::Sell,
            Self::Neutral => TradeAction::Wait,
        }
    }

    /// Direction of a signed move: positive is bullish, negative bearish.
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Self::Bullish
        } else if value < 0.0 {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }
}

/// Which extractor family produced a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalKind {
    CandlestickPattern,
    PriceAction,
    SupportResistance,
    Confluence,
    MarketRegime,
    Volatility,
    Volume,
    Temporal,
    ContextGate,
}

/// One extractor observation with a directional vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
    /// Short machine name (e.g. "bullish_engulfing", "liquidity_sweep").
    pub name: String,
    pub action: TradeAction,
    /// Conviction in `[0, 1]`.
    pub confidence: f64,
    /// Relative weight inside its own component.
    pub weight: f64,
    pub evidence: Vec<String>,
}

impl Signal {
    pub fn new(kind: SignalKind, name: impl Into<String>, action: TradeAction, confidence: f64) -> Self {
        Self {
            kind,
            name: name.into(),
            action,
            confidence: clamp_unit(confidence),
            weight: 1.0,
            evidence: Vec::new(),
        }
    }

    /// A zero-confidence `wait` signal, used when an extractor has nothing to say.
    pub fn neutral(kind: SignalKind, reason: impl Into<String>) -> Self {
        Self::new(kind, "neutral", TradeAction::Wait, 0.0).with_evidence(reason)
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
        self
    }

    pub fn with_evidence(mut self, evidence: impl Into<String>) -> Self {
        self.evidence.push(evidence.into());
        self
    }
}

/// Clamp to `[0, 1]`, mapping NaN to zero.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
