//! Analysis configuration — one injectable table of weights and thresholds.
//!
//! `ComponentWeights` is the only weight table in the system. The context
//! gate uses it for the candidate-action pre-vote and the aggregator uses it
//! for the final weighted score, so the two can never drift apart.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::ComponentKind;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("weight for {component} must be finite and non-negative, got {value}")]
    InvalidWeight { component: String, value: f64 },
    #[error("component weights sum to zero")]
    ZeroWeights,
    #[error("{name}: {reason}")]
    InvalidThreshold { name: String, reason: String },
}

// ─── Weights ────────────────────────────────────────────────────────

/// Per-component weight, enumerated by `ComponentKind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComponentWeights {
    pub patterns: f64,
    pub price_action: f64,
    pub confluence: f64,
    pub market_context: f64,
    pub volatility: f64,
    pub volume: f64,
    pub temporal: f64,
    pub context_gate: f64,
}

impl Default for ComponentWeights {
    fn default() -> Self {
        Self {
            patterns: 0.20,
            price_action: 0.20,
            confluence: 0.15,
            market_context: 0.15,
            volatility: 0.05,
            volume: 0.05,
            temporal: 0.10,
            context_gate: 0.10,
        }
    }
}

impl ComponentWeights {
    pub fn get(&self, kind: ComponentKind) -> f64 {
        match kind {
            ComponentKind::Patterns => self.patterns,
            ComponentKind::PriceAction => self.price_action,
            ComponentKind::Confluence => self.confluence,
            ComponentKind::MarketContext => self.market_context,
            ComponentKind::Volatility => self.volatility,
            ComponentKind::Volume => self.volume,
            ComponentKind::Temporal => self.temporal,
            ComponentKind::ContextGate => self.context_gate,
        }
    }

    pub fn total(&self) -> f64 {
        ComponentKind::ALL.iter().map(|k| self.get(*k)).sum()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for kind in ComponentKind::ALL {
            let value = self.get(kind);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    component: kind.name().to_string(),
                    value,
                });
            }
        }
        if self.total() <= 0.0 {
            return Err(ConfigError::ZeroWeights);
        }
        Ok(())
    }
}

// ─── Extraction ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Sampling stride in pixels, both axes.
    pub stride: u32,
    /// Margin added around the ink bounding box.
    pub margin: u32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            stride: 4,
            margin: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    pub min_element_pixels: u32,
    pub min_candle_height: u32,
    pub max_candle_width: u32,
    pub max_candles: usize,
    /// Candles closer than this (in pixels) to a more confident one are dropped.
    pub dedup_distance: u32,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_element_pixels: 3,
            min_candle_height: 3,
            max_candle_width: 40,
            max_candles: 200,
            dedup_distance: 5,
        }
    }
}

pub const DEFAULT_BAR_SPACING_SECS: i64 = 60;
/// One leap year.
pub const MAX_BAR_SPACING_SECS: i64 = 366 * 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Spacing between synthetic bar timestamps.
    pub bar_spacing_secs: i64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            bar_spacing_secs: DEFAULT_BAR_SPACING_SECS,
        }
    }
}

// ─── Gate & aggregator ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Fewer bars than this yields score 0 and "skip".
    pub min_window: usize,
    /// Trailing bars considered.
    pub max_window: usize,
    pub enter_threshold: f64,
    pub wait_threshold: f64,
    /// Confluence score (0–100) required to override an ambiguity skip.
    pub override_confluence: f64,
    /// Pattern confidence (0–1) required to override an ambiguity skip.
    pub override_pattern_confidence: f64,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_window: 10,
            max_window: 30,
            enter_threshold: 65.0,
            wait_threshold: 45.0,
            override_confluence: 75.0,
            override_pattern_confidence: 0.80,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregatorConfig {
    /// Market-context score (0–100) below which the cycle is vetoed.
    pub market_context_floor: f64,
    /// Confluence score under which extreme volatility vetoes the cycle.
    pub extreme_volatility_confluence_floor: f64,
    /// Mean confidence of valid components below which the cycle is vetoed.
    pub mean_confidence_floor: f64,
    /// Minimum weighted score for buy/sell to beat `wait`.
    pub min_directional_score: f64,
    /// Multiplier applied to the winning score before capping at 1.0.
    pub amplification: f64,
    pub min_valid_components: usize,
    pub min_final_confidence: f64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            market_context_floor: 30.0,
            extreme_volatility_confluence_floor: 40.0,
            mean_confidence_floor: 0.25,
            min_directional_score: 0.15,
            amplification: 1.6,
            min_valid_components: 3,
            min_final_confidence: 0.45,
        }
    }
}

// ─── AnalysisConfig ─────────────────────────────────────────────────

/// Everything the pipeline needs besides the image itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub weights: ComponentWeights,
    pub locator: LocatorConfig,
    pub segmenter: SegmenterConfig,
    pub synthesis: SynthesisConfig,
    pub gate: GateConfig,
    pub aggregator: AggregatorConfig,
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.weights.validate()?;
        if self.locator.stride == 0 {
            return Err(threshold("locator.stride", "must be >= 1"));
        }
        if self.segmenter.max_candle_width == 0 {
            return Err(threshold("segmenter.max_candle_width", "must be >= 1"));
        }
        if !(1..=MAX_BAR_SPACING_SECS).contains(&self.synthesis.bar_spacing_secs) {
            return Err(threshold(
                "synthesis.bar_spacing_secs",
                "must be in 1..=31622400 (one year)",
            ));
        }
        if self.gate.min_window == 0 || self.gate.max_window < self.gate.min_window {
            return Err(threshold(
                "gate.max_window",
                "must be >= gate.min_window >= 1",
            ));
        }
        if self.gate.wait_threshold > self.gate.enter_threshold {
            return Err(threshold(
                "gate.wait_threshold",
                "must not exceed gate.enter_threshold",
            ));
        }
        if !(self.aggregator.amplification.is_finite() && self.aggregator.amplification >= 1.0) {
            return Err(threshold("aggregator.amplification", "must be >= 1.0"));
        }
        Ok(())
    }
}

fn threshold(name: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidThreshold {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_weights_sum_to_one() {
        assert!((ComponentWeights::default().total() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(AnalysisConfig::default().validate(), Ok(()));
    }

    #[test]
    fn negative_weight_rejected() {
        let mut w = ComponentWeights::default();
        w.volume = -0.1;
        assert!(matches!(
            w.validate(),
            Err(ConfigError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn zero_weights_rejected() {
        let w = ComponentWeights {
            patterns: 0.0,
            price_action: 0.0,
            confluence: 0.0,
            market_context: 0.0,
            volatility: 0.0,
            volume: 0.0,
            temporal: 0.0,
            context_gate: 0.0,
        };
        assert_eq!(w.validate(), Err(ConfigError::ZeroWeights));
    }

    #[test]
    fn inverted_gate_thresholds_rejected() {
        let mut cfg = AnalysisConfig::default();
        cfg.gate.wait_threshold = 80.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn bar_spacing_is_bounded() {
        let mut cfg = AnalysisConfig::default();
        cfg.synthesis.bar_spacing_secs = MAX_BAR_SPACING_SECS;
        assert_eq!(cfg.validate(), Ok(()));
        for bad in [0, -60, MAX_BAR_SPACING_SECS + 1, i64::MAX] {
            cfg.synthesis.bar_spacing_secs = bad;
            assert!(
                matches!(cfg.validate(), Err(ConfigError::InvalidThreshold { ref name, .. }) if name == "synthesis.bar_spacing_secs"),
                "spacing {bad} should be rejected"
            );
        }
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: AnalysisConfig =
            serde_json::from_str(r#"{"weights":{"patterns":0.5}}"#).unwrap();
        assert_eq!(cfg.weights.patterns, 0.5);
        assert_eq!(cfg.weights.volume, 0.05);
        assert_eq!(cfg.gate.min_window, 10);
    }
}
