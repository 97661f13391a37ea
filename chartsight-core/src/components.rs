//! Folding extractor signals into the fixed set of weighted components.

use crate::config::ComponentWeights;
use crate::domain::{Component, ComponentKind, Signal, TradeAction};
use crate::signals::{SignalReports, SignalSource};

/// Resolve one component from its signals.
///
/// The action with the larger summed buy/sell confidence wins (ties and
/// no directional signals resolve to `wait`). Confidence is the strongest
/// supporting signal scaled by the winner's share of the directional total.
pub fn resolve_component(kind: ComponentKind, signals: &[Signal], weight: f64) -> Component {
    let sum = |action: TradeAction| -> f64 {
        signals
            .iter()
            .filter(|s| s.action == action)
            .map(|s| s.confidence * s.weight)
            .sum()
    };
    let strongest = |action: TradeAction| -> f64 {
        signals
            .iter()
            .filter(|s| s.action == action)
            .map(|s| s.confidence)
            .fold(0.0, f64::max)
    };

    let buy = sum(TradeAction::Buy);
    let sell = sum(TradeAction::Sell);
    let total = buy + sell;

    let (action, confidence) = if total > 0.0 && buy != sell {
        let (winner, share) = if buy > sell {
            (TradeAction::Buy, buy / total)
        } else {
            (TradeAction::Sell, sell / total)
        };
        (winner, strongest(winner) * share)
    } else {
        (TradeAction::Wait, strongest(TradeAction::Wait))
    };

    Component::new(kind, confidence, weight, action)
}

/// Every component except the context gate, in [`ComponentKind::ALL`] order.
pub fn build_components(reports: &SignalReports, weights: &ComponentWeights) -> Vec<Component> {
    let sources: [(ComponentKind, Vec<Signal>); 7] = [
        (ComponentKind::Patterns, reports.patterns.signals()),
        (ComponentKind::PriceAction, reports.price_action.signals()),
        (ComponentKind::Confluence, reports.confluence.signals()),
        (ComponentKind::MarketContext, reports.market.signals()),
        (ComponentKind::Volatility, reports.volatility.signals()),
        (ComponentKind::Volume, reports.volume.signals()),
        (ComponentKind::Temporal, reports.temporal.signals()),
    ];
    sources
        .into_iter()
        .map(|(kind, signals)| resolve_component(kind, &signals, weights.get(kind)))
        .collect()
}

/// Weighted vote over already-built components, used for the gate's
/// candidate action. Returns `wait` unless buy or sell strictly leads.
pub fn pre_vote(components: &[Component]) -> TradeAction {
    let score = |action: TradeAction| -> f64 {
        components
            .iter()
            .filter(|c| c.is_valid && c.resolved_action == action)
            .map(|c| c.confidence * c.weight)
            .sum()
    };
    let (buy, sell) = (score(TradeAction::Buy), score(TradeAction::Sell));
    if buy > sell {
        TradeAction::Buy
    } else if sell > buy {
        TradeAction::Sell
    } else {
        TradeAction::Wait
    }
}
