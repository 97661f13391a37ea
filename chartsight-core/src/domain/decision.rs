//! Components and the final decision record.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::signal::TradeAction;

/// The fixed set of named components that vote in the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Patterns,
    PriceAction,
    Confluence,
    MarketContext,
    Volatility,
    Volume,
    Temporal,
    ContextGate,
}

impl ComponentKind {
    pub const ALL: [ComponentKind; 8] = [
        Self::Patterns,
        Self::PriceAction,
        Self::Confluence,
        Self::MarketContext,
        Self::Volatility,
        Self::Volume,
        Self::Temporal,
        Self::ContextGate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Patterns => "patterns",
            Self::PriceAction => "price_action",
            Self::Confluence => "confluence",
            Self::MarketContext => "market_context",
            Self::Volatility => "volatility",
            Self::Volume => "volume",
            Self::Temporal => "temporal",
            Self::ContextGate => "context_gate",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One extractor's output collapsed into a single weighted vote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub kind: ComponentKind,
    pub name: String,
    pub confidence: f64,
    pub weight: f64,
    pub resolved_action: TradeAction,
    pub is_valid: bool,
}

impl Component {
    pub fn new(kind: ComponentKind, confidence: f64, weight: f64, resolved_action: TradeAction) -> Self {
        let confidence = super::signal::clamp_unit(confidence);
        Self {
            kind,
            name: kind.name().to_string(),
            confidence,
            weight,
            resolved_action,
            is_valid: confidence > 0.0,
        }
    }
}

/// Coarse riskiness of an accepted decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        };
        f.write_str(s)
    }
}

/// The single explainable output of one analysis cycle.
///
/// Exactly one of `supporting_reasons` / `rejection_reasons` is populated,
/// selected by `accepted`. A rejected decision always carries `action = Wait`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub accepted: bool,
    pub action: TradeAction,
    pub confidence: f64,
    /// Composite quality in `[0, 100]`.
    pub quality_score: f64,
    pub risk_tier: RiskTier,
    pub supporting_reasons: Vec<String>,
    pub rejection_reasons: Vec<String>,
}

impl Decision {
    /// A rejection after a hard veto: zero confidence, zero quality.
    pub fn vetoed(reasons: Vec<String>) -> Self {
        Self {
            accepted: false,
            action: TradeAction::Wait,
            confidence: 0.0,
            quality_score: 0.0,
            risk_tier: RiskTier::High,
            supporting_reasons: Vec::new(),
            rejection_reasons: reasons,
        }
    }

    /// A rejection from a soft gate; keeps the computed confidence for display.
    pub fn soft_rejected(confidence: f64, quality_score: f64, reasons: Vec<String>) -> Self {
        Self {
            accepted: false,
            action: TradeAction::Wait,
            confidence,
            quality_score,
            risk_tier: RiskTier::High,
            supporting_reasons: Vec::new(),
            rejection_reasons: reasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_validity_follows_confidence() {
        let c = Component::new(ComponentKind::Volume, 0.0, 0.05, TradeAction::Wait);
        assert!(!c.is_valid);
        let c = Component::new(ComponentKind::Volume, 0.3, 0.05, TradeAction::Buy);
        assert!(c.is_valid);
        assert_eq!(c.name, "volume");
    }

    #[test]
    fn vetoed_decision_shape() {
        let d = Decision::vetoed(vec!["insufficient data".into()]);
        assert!(!d.accepted);
        assert_eq!(d.action, TradeAction::Wait);
        assert_eq!(d.confidence, 0.0);
        assert!(d.supporting_reasons.is_empty());
        assert_eq!(d.rejection_reasons.len(), 1);
    }

    #[test]
    fn component_kinds_are_unique_by_name() {
        let mut names: Vec<_> = ComponentKind::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), ComponentKind::ALL.len());
    }
}
