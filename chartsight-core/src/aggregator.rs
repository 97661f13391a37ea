//! Decision aggregator — hard vetoes, weighted scoring, soft gates.
//!
//! Only reads finished [`Component`] records and a few report values; it
//! never re-runs an extractor.

use serde::{Deserialize, Serialize};

use crate::config::AggregatorConfig;
use crate::domain::{clamp_unit, Component, Decision, RiskTier, TradeAction};
use crate::gate::{GateRecommendation, GateVerdict};
use crate::signals::VolatilityTier;

const WEAK_CONTEXT: f64 = 50.0;
const MANY_TEMPORAL_RISKS: usize = 3;
const LOW_CONFIDENCE: f64 = 0.6;

/// Report values the vetoes and risk flags depend on.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    pub gate: &'a GateVerdict,
    /// 0–100.
    pub market_context_score: f64,
    pub volatility: VolatilityTier,
    /// 0–100.
    pub confluence_score: f64,
    pub temporal_risk_factors: usize,
}

/// Σ confidence × weight per resolved action over valid components.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionScores {
    pub buy: f64,
    pub sell: f64,
    pub wait: f64,
}

pub fn weighted_scores(components: &[Component]) -> ActionScores {
    let mut scores = ActionScores::default();
    for c in components.iter().filter(|c| c.is_valid) {
        let contribution = c.confidence * c.weight;
        match c.resolved_action {
            TradeAction::Buy => scores.buy += contribution,
            TradeAction::Sell => scores.sell += contribution,
            TradeAction::Wait => scores.wait += contribution,
        }
    }
    scores
}

#[derive(Debug, Clone, Default)]
pub struct DecisionAggregator {
    pub config: AggregatorConfig,
}

impl DecisionAggregator {
    pub fn new(config: AggregatorConfig) -> Self {
        Self { config }
    }

    /// Every hard veto that applies, as human-readable reasons.
    pub fn hard_vetoes(&self, components: &[Component], ctx: &DecisionContext<'_>) -> Vec<String> {
        let cfg = &self.config;
        let mut reasons = Vec::new();

        if ctx.gate.rejects() {
            if ctx.gate.reasons.is_empty() {
                reasons.push(format!("context gate: skip (score {:.0})", ctx.gate.score));
            }
            for r in &ctx.gate.reasons {
                reasons.push(format!("context gate: {r}"));
            }
        }
        if ctx.market_context_score < cfg.market_context_floor {
            reasons.push(format!(
                "market context score {:.0} below floor {:.0}",
                ctx.market_context_score, cfg.market_context_floor
            ));
        }
        if ctx.volatility == VolatilityTier::Extreme && ctx.confluence_score < cfg.extreme_volatility_confluence_floor {
            reasons.push(format!(
                "extreme volatility with confluence {:.0} below {:.0}",
                ctx.confluence_score, cfg.extreme_volatility_confluence_floor
            ));
        }
        let valid: Vec<&Component> = components.iter().filter(|c| c.is_valid).collect();
        let mean_confidence = if valid.is_empty() {
            0.0
        } else {
            valid.iter().map(|c| c.confidence).sum::<f64>() / valid.len() as f64
        };
        if mean_confidence < cfg.mean_confidence_floor {
            reasons.push(format!(
                "mean component confidence {:.2} below floor {:.2}",
                mean_confidence, cfg.mean_confidence_floor
            ));
        }
        reasons
    }

    pub fn decide(&self, components: &[Component], ctx: &DecisionContext<'_>) -> Decision {
        let cfg = &self.config;

        let vetoes = self.hard_vetoes(components, ctx);
        if !vetoes.is_empty() {
            tracing::info!(reasons = ?vetoes, "decision vetoed");
            return Decision::vetoed(vetoes);
        }

        let scores = weighted_scores(components);
        let action = if scores.buy >= cfg.min_directional_score && scores.buy > scores.sell {
            TradeAction::Buy
        } else if scores.sell >= cfg.min_directional_score && scores.sell > scores.buy {
            TradeAction::Sell
        } else {
            TradeAction::Wait
        };

        let valid_count = components.iter().filter(|c| c.is_valid).count();
        let valid_ratio = if components.is_empty() {
            0.0
        } else {
            valid_count as f64 / components.len() as f64
        };
        let winner = match action {
            TradeAction::Buy => scores.buy,
            TradeAction::Sell => scores.sell,
            TradeAction::Wait => 0.0,
        };
        let confidence = clamp_unit(winner * cfg.amplification);
        let quality = quality_score(valid_ratio, confidence, ctx.gate.score);

        let mut soft = Vec::new();
        if action == TradeAction::Wait {
            soft.push(format!(
                "no directional score above {:.2} (buy {:.2}, sell {:.2})",
                cfg.min_directional_score, scores.buy, scores.sell
            ));
        }
        if valid_count < cfg.min_valid_components {
            soft.push(format!(
                "only {valid_count} valid components, need {}",
                cfg.min_valid_components
            ));
        }
        if action != TradeAction::Wait && confidence < cfg.min_final_confidence {
            soft.push(format!(
                "confidence {:.2} below {:.2}",
                confidence, cfg.min_final_confidence
            ));
        }
        if !soft.is_empty() {
            tracing::info!(reasons = ?soft, confidence, "decision rejected");
            return Decision::soft_rejected(confidence, quality, soft);
        }

        let risk_tier = self.risk_tier(confidence, ctx);
        let mut supporting = vec![format!(
            "{action} score {:.2} vs {:.2}, confidence {:.2}",
            winner,
            if action == TradeAction::Buy { scores.sell } else { scores.buy },
            confidence
        )];
        for c in components.iter().filter(|c| c.is_valid && c.resolved_action == action) {
            supporting.push(format!("{}: {:.2} x {:.2}", c.name, c.confidence, c.weight));
        }

        tracing::info!(%action, confidence, quality, %risk_tier, "decision accepted");
        Decision {
            accepted: true,
            action,
            confidence,
            quality_score: quality,
            risk_tier,
            supporting_reasons: supporting,
            rejection_reasons: Vec::new(),
        }
    }

    fn risk_tier(&self, confidence: f64, ctx: &DecisionContext<'_>) -> RiskTier {
        let flags = [
            ctx.volatility >= VolatilityTier::High,
            ctx.market_context_score < WEAK_CONTEXT,
            ctx.temporal_risk_factors >= MANY_TEMPORAL_RISKS,
            ctx.gate.recommendation != GateRecommendation::Enter,
            confidence < LOW_CONFIDENCE,
        ]
        .iter()
        .filter(|f| **f)
        .count();
        match flags {
            0 | 1 => RiskTier::Low,
            2 => RiskTier::Medium,
            _ => RiskTier::High,
        }
    }
}

/// 0–100 blend of validity ratio, confidence and gate score.
pub fn quality_score(valid_ratio: f64, confidence: f64, gate_score: f64) -> f64 {
    (100.0 * (0.4 * valid_ratio + 0.4 * confidence + 0.2 * gate_score / 100.0)).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ComponentKind;
    use crate::indicators::TrendClass;

    fn gate(score: f64, recommendation: GateRecommendation) -> GateVerdict {
        GateVerdict {
            score,
            recommendation,
            candidate: TradeAction::Buy,
            trend: TrendClass::Clear,
            factors: Vec::new(),
            overridden: false,
            reasons: Vec::new(),
            window_bars: 20,
        }
    }

    fn ctx(gate: &GateVerdict) -> DecisionContext<'_> {
        DecisionContext {
            gate,
            market_context_score: 80.0,
            volatility: VolatilityTier::Normal,
            confluence_score: 60.0,
            temporal_risk_factors: 0,
        }
    }

    fn bullish_components() -> Vec<Component> {
        let weights = crate::config::ComponentWeights::default();
        ComponentKind::ALL
            .iter()
            .map(|&k| Component::new(k, 0.8, weights.get(k), TradeAction::Buy))
            .collect()
    }

    #[test]
    fn strong_agreement_is_accepted() {
        let g = gate(80.0, GateRecommendation::Enter);
        let d = DecisionAggregator::default().decide(&bullish_components(), &ctx(&g));
        assert!(d.accepted);
        assert_eq!(d.action, TradeAction::Buy);
        assert_eq!(d.confidence, 1.0);
        assert_eq!(d.risk_tier, RiskTier::Low);
        assert!(d.quality_score > 90.0);
        assert!(d.rejection_reasons.is_empty());
    }

    #[test]
    fn gate_skip_vetoes() {
        let mut g = gate(20.0, GateRecommendation::Skip);
        g.reasons.push("insufficient data: 3 bars, need 10".into());
        let d = DecisionAggregator::default().decide(&bullish_components(), &ctx(&g));
        assert!(!d.accepted);
        assert_eq!(d.confidence, 0.0);
        assert_eq!(d.action, TradeAction::Wait);
        assert!(d.rejection_reasons[0].contains("insufficient data"));
    }

    #[test]
    fn overridden_skip_does_not_veto() {
        let mut g = gate(35.0, GateRecommendation::Wait);
        g.overridden = true;
        let d = DecisionAggregator::default().decide(&bullish_components(), &ctx(&g));
        assert!(d.accepted);
        assert_ne!(d.risk_tier, RiskTier::High);
    }

    #[test]
    fn weak_market_context_vetoes() {
        let g = gate(80.0, GateRecommendation::Enter);
        let mut c = ctx(&g);
        c.market_context_score = 10.0;
        let d = DecisionAggregator::default().decide(&bullish_components(), &c);
        assert!(!d.accepted);
        assert!(d.rejection_reasons.iter().any(|r| r.contains("market context")));
    }

    #[test]
    fn extreme_volatility_needs_confluence() {
        let g = gate(80.0, GateRecommendation::Enter);
        let mut c = ctx(&g);
        c.volatility = VolatilityTier::Extreme;
        c.confluence_score = 20.0;
        assert!(!DecisionAggregator::default().decide(&bullish_components(), &c).accepted);
        c.confluence_score = 50.0;
        let d = DecisionAggregator::default().decide(&bullish_components(), &c);
        assert!(d.accepted);
        assert_eq!(d.risk_tier, RiskTier::Low);
    }

    #[test]
    fn low_mean_confidence_vetoes() {
        let g = gate(80.0, GateRecommendation::Enter);
        let comps: Vec<Component> = ComponentKind::ALL
            .iter()
            .map(|&k| Component::new(k, 0.1, 0.125, TradeAction::Buy))
            .collect();
        let d = DecisionAggregator::default().decide(&comps, &ctx(&g));
        assert!(!d.accepted);
        assert_eq!(d.confidence, 0.0);
    }

    #[test]
    fn split_vote_is_soft_rejected() {
        let g = gate(80.0, GateRecommendation::Enter);
        let weights = crate::config::ComponentWeights::default();
        let comps: Vec<Component> = ComponentKind::ALL
            .iter()
            .enumerate()
            .map(|(i, &k)| {
                let action = if i % 2 == 0 { TradeAction::Buy } else { TradeAction::Sell };
                Component::new(k, 0.5, weights.get(k), action)
            })
            .collect();
        let d = DecisionAggregator::default().decide(&comps, &ctx(&g));
        assert!(!d.accepted);
        assert_eq!(d.action, TradeAction::Wait);
        assert!(!d.rejection_reasons.is_empty());
    }

    #[test]
    fn too_few_valid_components_is_soft_rejected() {
        let g = gate(80.0, GateRecommendation::Enter);
        let mut comps = bullish_components();
        for c in comps.iter_mut().skip(2) {
            *c = Component::new(c.kind, 0.0, c.weight, TradeAction::Wait);
        }
        let d = DecisionAggregator::default().decide(&comps, &ctx(&g));
        assert!(!d.accepted);
        assert!(d.rejection_reasons.iter().any(|r| r.contains("valid components")));
    }

    #[test]
    fn risk_flags_raise_tier() {
        let g = gate(50.0, GateRecommendation::Wait);
        let mut c = ctx(&g);
        c.volatility = VolatilityTier::High;
        c.temporal_risk_factors = 3;
        let d = DecisionAggregator::default().decide(&bullish_components(), &c);
        assert!(d.accepted);
        assert_eq!(d.risk_tier, RiskTier::High);
    }

    #[test]
    fn scores_ignore_invalid_components() {
        let comps = vec![
            Component::new(ComponentKind::Patterns, 0.0, 0.2, TradeAction::Buy),
            Component::new(ComponentKind::Volume, 0.5, 0.1, TradeAction::Sell),
        ];
        let s = weighted_scores(&comps);
        assert_eq!(s.buy, 0.0);
        assert!((s.sell - 0.05).abs() < 1e-12);
    }
}
