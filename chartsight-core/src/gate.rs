//! Context gate — short-window veto layer for a candidate entry.
//!
//! Scores 0–100 from additive and subtractive factors over the trailing
//! window and maps the score to enter / wait / skip. The gate sees bars,
//! the candidate action and the confluence levels; it never sees the
//! aggregator's weights or the final decision.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

use crate::config::GateConfig;
use crate::domain::{Component, ComponentKind, Direction, OhlcBar, TradeAction};
use crate::indicators::{assess_trend, average_body, average_range, average_volume, lowest_low, tail, TrendClass};
use crate::signals::{Level, LevelKind};

// ─── Factor points ──────────────────────────────────────────────────

const TREND_CLEAR: f64 = 25.0;
const TREND_MODERATE: f64 = 12.0;
const PULLBACK: f64 = 10.0;
const CONFIRMING_BAR: f64 = 20.0;
const INDECISION_EACH: f64 = -5.0;
const INDECISION_CAP: f64 = -20.0;
const LEVEL_SUPPORT: f64 = 10.0;
const VOLUME_CONFIRMATION: f64 = 10.0;
const ROOM: f64 = 15.0;
const NO_ROOM: f64 = -25.0;
const ALIGNED: f64 = 10.0;
const MISALIGNED: f64 = -40.0;

// ─── Factor thresholds ──────────────────────────────────────────────

const CONFIRM_BODY_RATIO: f64 = 0.6;
const CONFIRM_BODY_VS_AVG: f64 = 1.2;
const INDECISION_BODY_RATIO: f64 = 0.3;
const INDECISION_WINDOW: usize = 10;
const LEVEL_REACH: f64 = 1.5;
const VOLUME_VS_AVG: f64 = 1.2;
const MIN_ROOM: f64 = 1.5;
const PULLBACK_WINDOW: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateRecommendation {
    Enter,
    Wait,
    Skip,
}

impl fmt::Display for GateRecommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Enter => "enter",
            Self::Wait => "wait",
            Self::Skip => "skip",
        };
        f.write_str(s)
    }
}

/// One scored factor, kept for explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateFactor {
    pub name: String,
    pub points: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateVerdict {
    /// 0–100.
    pub score: f64,
    pub recommendation: GateRecommendation,
    /// The action the gate evaluated (after falling back to the trend).
    pub candidate: TradeAction,
    pub trend: TrendClass,
    pub factors: Vec<GateFactor>,
    /// An ambiguity skip lifted by strong confluence and pattern evidence.
    pub overridden: bool,
    pub reasons: Vec<String>,
    pub window_bars: usize,
}

impl GateVerdict {
    /// True when the gate vetoes the cycle.
    pub fn rejects(&self) -> bool {
        self.recommendation == GateRecommendation::Skip && !self.overridden
    }

    fn skipped(window_bars: usize, candidate: TradeAction, reason: String) -> Self {
        Self {
            score: 0.0,
            recommendation: GateRecommendation::Skip,
            candidate,
            trend: TrendClass::Ambiguous,
            factors: Vec::new(),
            overridden: false,
            reasons: vec![reason],
            window_bars,
        }
    }

    /// The gate's own vote: its candidate unless skipped, at `score / 100`.
    pub fn component(&self, weight: f64) -> Component {
        let action = if self.recommendation == GateRecommendation::Skip {
            TradeAction::Wait
        } else {
            self.candidate
        };
        Component::new(ComponentKind::ContextGate, self.score / 100.0, weight, action)
    }
}

/// What the gate needs from the rest of the cycle.
#[derive(Debug, Clone, Copy)]
pub struct GateInput<'a> {
    pub window: &'a [OhlcBar],
    /// Pre-vote of the other components; `wait` defers to the trend.
    pub candidate: TradeAction,
    pub levels: &'a [Level],
    /// 0–100.
    pub confluence_score: f64,
    /// 0–1, strongest directional pattern.
    pub pattern_confidence: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ContextGate {
    pub config: GateConfig,
}

impl ContextGate {
    pub fn new(config: GateConfig) -> Self {
        Self { config }
    }

    /// Trailing window for this cycle.
    ///
    /// A current series shorter than the minimum is prefixed with the
    /// carried-over prior window.
    pub fn window<'a>(&self, current: &'a [OhlcBar], prior: Option<&[OhlcBar]>) -> Cow<'a, [OhlcBar]> {
        match prior {
            Some(prior) if current.len() < self.config.min_window && !prior.is_empty() => {
                let joined: Vec<OhlcBar> = prior.iter().chain(current).cloned().collect();
                Cow::Owned(tail(&joined, self.config.max_window).to_vec())
            }
            _ => Cow::Borrowed(tail(current, self.config.max_window)),
        }
    }

    pub fn evaluate(&self, input: &GateInput<'_>) -> GateVerdict {
        let window = input.window;
        let n = window.len();
        if n < self.config.min_window {
            return GateVerdict::skipped(
                n,
                TradeAction::Wait,
                format!("insufficient data: {n} bars, need {}", self.config.min_window),
            );
        }

        let trend = assess_trend(window);
        let candidate = if input.candidate.is_directional() {
            input.candidate
        } else {
            trend.direction.to_action()
        };
        if !candidate.is_directional() {
            let mut verdict = GateVerdict::skipped(n, candidate, "no directional candidate".to_string());
            verdict.trend = trend.class;
            return verdict;
        }
        let bullish = candidate == TradeAction::Buy;

        let last = &window[n - 1];
        let history = &window[..n - 1];
        let avg_range = average_range(window);
        let mut factors = Vec::new();
        let mut add = |name: &str, points: f64| {
            if points != 0.0 {
                factors.push(GateFactor {
                    name: name.to_string(),
                    points,
                });
            }
        };

        add(
            "trend_clarity",
            match trend.class {
                TrendClass::Clear => TREND_CLEAR,
                TrendClass::Moderate => TREND_MODERATE,
                TrendClass::Ambiguous => 0.0,
            },
        );

        if valid_pullback(window, bullish) {
            add("pullback", PULLBACK);
        }

        let aligned_bar = if bullish { last.is_bullish() } else { last.is_bearish() };
        if aligned_bar
            && last.body_ratio() >= CONFIRM_BODY_RATIO
            && last.body() >= average_body(history) * CONFIRM_BODY_VS_AVG
        {
            add("confirming_bar", CONFIRMING_BAR);
        }

        let indecision = tail(window, INDECISION_WINDOW)
            .iter()
            .filter(|b| b.body_ratio() < INDECISION_BODY_RATIO)
            .count();
        add("indecision", (indecision as f64 * INDECISION_EACH).max(INDECISION_CAP));

        let (own_kind, opposing_kind) = if bullish {
            (LevelKind::Support, LevelKind::Resistance)
        } else {
            (LevelKind::Resistance, LevelKind::Support)
        };
        let reach = avg_range * LEVEL_REACH;
        let near_own_level = input
            .levels
            .iter()
            .filter(|l| l.kind == own_kind && l.is_strong())
            .any(|l| (last.close - l.price).abs() <= reach);
        if near_own_level {
            add("level_support", LEVEL_SUPPORT);
        }

        let avg_volume = average_volume(history);
        if avg_volume > 0.0 && last.volume_proxy >= avg_volume * VOLUME_VS_AVG {
            add("volume_confirmation", VOLUME_CONFIRMATION);
        }

        let opposing_distance = input
            .levels
            .iter()
            .filter(|l| l.kind == opposing_kind)
            .map(|l| if bullish { l.price - last.close } else { last.close - l.price })
            .filter(|d| *d >= 0.0)
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.min(d))));
        let has_room = match opposing_distance {
            None => true,
            Some(d) => avg_range > 0.0 && d / avg_range >= MIN_ROOM,
        };
        add("room", if has_room { ROOM } else { NO_ROOM });

        if trend.class != TrendClass::Ambiguous {
            let trend_action = trend.direction.to_action();
            add("alignment", if trend_action == candidate { ALIGNED } else { MISALIGNED });
        }

        let raw: f64 = factors.iter().map(|f| f.points).sum();
        let score = raw.clamp(0.0, 100.0);
        let mut recommendation = self.recommend(score);
        let mut reasons = Vec::new();
        let mut overridden = false;

        if recommendation == GateRecommendation::Skip {
            reasons.push(format!("gate score {score:.0} below {:.0}", self.config.wait_threshold));
            // Would the window have passed with a clear, aligned trend?
            let solely_ambiguity = trend.class == TrendClass::Ambiguous
                && (raw + TREND_CLEAR + ALIGNED).min(100.0) >= self.config.wait_threshold;
            if solely_ambiguity {
                reasons.push("trend ambiguous".to_string());
                if input.confluence_score >= self.config.override_confluence
                    && input.pattern_confidence >= self.config.override_pattern_confidence
                {
                    overridden = true;
                    recommendation = GateRecommendation::Wait;
                    reasons.push(format!(
                        "ambiguity skip overridden: confluence {:.0}, pattern {:.2}",
                        input.confluence_score, input.pattern_confidence
                    ));
                }
            }
        }
        if !has_room {
            reasons.push("no room before next opposing level".to_string());
        }
        if trend.class != TrendClass::Ambiguous && trend.direction != Direction::Neutral && trend.direction.to_action() != candidate {
            reasons.push(format!("{candidate} against the trend"));
        }

        tracing::debug!(
            score,
            %recommendation,
            %candidate,
            trend = ?trend.class,
            overridden,
            "context gate"
        );

        GateVerdict {
            score,
            recommendation,
            candidate,
            trend: trend.class,
            factors,
            overridden,
            reasons,
            window_bars: n,
        }
    }

    fn recommend(&self, score: f64) -> GateRecommendation {
        if score >= self.config.enter_threshold {
            GateRecommendation::Enter
        } else if score >= self.config.wait_threshold {
            GateRecommendation::Wait
        } else {
            GateRecommendation::Skip
        }
    }
}

/// A counter-move within the last few bars that held structure and has
/// since been reclaimed by the final bar.
fn valid_pullback(window: &[OhlcBar], bullish: bool) -> bool {
    let n = window.len();
    if n < PULLBACK_WINDOW + 2 {
        return false;
    }
    let last = &window[n - 1];
    let recent = &window[n - 1 - PULLBACK_WINDOW..n - 1];
    let counter: Vec<&OhlcBar> = recent
        .windows(2)
        .filter(|w| if bullish { w[1].close < w[0].close } else { w[1].close > w[0].close })
        .map(|w| &w[1])
        .collect();
    if counter.is_empty() {
        return false;
    }
    let base = &window[..n / 2];
    if bullish {
        let base_low = lowest_low(base).unwrap_or(f64::MIN);
        let dip_low = counter.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let dip_high = counter.iter().map(|b| b.close).fold(f64::MIN, f64::max);
        dip_low > base_low && last.close > dip_high
    } else {
        let base_high = base.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let rally_high = counter.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let rally_low = counter.iter().map(|b| b.close).fold(f64::MAX, f64::min);
        rally_high < base_high && last.close < rally_low
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    fn input<'a>(window: &'a [OhlcBar], candidate: TradeAction, levels: &'a [Level]) -> GateInput<'a> {
        GateInput {
            window,
            candidate,
            levels,
            confluence_score: 0.0,
            pattern_confidence: 0.0,
        }
    }

    fn uptrend(n: usize) -> Vec<OhlcBar> {
        let mut bars = make_bars(&(0..n).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        let last = bars.len() - 1;
        // Wide confirming final bar on rising volume.
        bars[last].close = bars[last].open + 2.5;
        bars[last].high = bars[last].close + 0.2;
        bars[last].volume_proxy = 20.0;
        bars
    }

    fn level(price: f64, kind: LevelKind) -> Level {
        Level {
            price,
            kind,
            touches: 3,
            last_touch: 10,
            strength: 0.9,
        }
    }

    #[test]
    fn short_window_skips_with_zero() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let v = ContextGate::default().evaluate(&input(&bars, TradeAction::Buy, &[]));
        assert_eq!(v.score, 0.0);
        assert_eq!(v.recommendation, GateRecommendation::Skip);
        assert!(v.rejects());
        assert!(v.reasons[0].contains("insufficient data"));
    }

    #[test]
    fn clear_aligned_uptrend_enters() {
        let bars = uptrend(20);
        let v = ContextGate::default().evaluate(&input(&bars, TradeAction::Buy, &[]));
        assert_eq!(v.trend, TrendClass::Clear);
        assert_eq!(v.recommendation, GateRecommendation::Enter);
        assert!(v.score >= 65.0);
        assert!(!v.rejects());
        assert!(v.factors.iter().any(|f| f.name == "confirming_bar"));
    }

    #[test]
    fn wait_candidate_defers_to_trend() {
        let bars = uptrend(20);
        let v = ContextGate::default().evaluate(&input(&bars, TradeAction::Wait, &[]));
        assert_eq!(v.candidate, TradeAction::Buy);
    }

    #[test]
    fn misaligned_candidate_is_punished() {
        let bars = uptrend(20);
        let v = ContextGate::default().evaluate(&input(&bars, TradeAction::Sell, &[]));
        assert!(v.factors.iter().any(|f| f.name == "alignment" && f.points == MISALIGNED));
        assert_eq!(v.recommendation, GateRecommendation::Skip);
    }

    #[test]
    fn nearby_resistance_removes_room() {
        let bars = uptrend(20);
        let close = bars[bars.len() - 1].close;
        let levels = [level(close + 0.5, LevelKind::Resistance)];
        let v = ContextGate::default().evaluate(&input(&bars, TradeAction::Buy, &levels));
        assert!(v.factors.iter().any(|f| f.name == "room" && f.points == NO_ROOM));
        assert!(v.reasons.iter().any(|r| r.contains("no room")));
    }

    #[test]
    fn strong_support_adds_points() {
        let bars = uptrend(20);
        let close = bars[bars.len() - 1].close;
        let levels = [level(close - 1.0, LevelKind::Support)];
        let v = ContextGate::default().evaluate(&input(&bars, TradeAction::Buy, &levels));
        assert!(v.factors.iter().any(|f| f.name == "level_support"));
    }

    #[test]
    fn ambiguity_skip_can_be_overridden() {
        // Choppy bars with a strong final bar: passes only if trend were clear.
        let closes: Vec<f64> = (0..19).map(|i| if i % 2 == 0 { 100.0 } else { 101.0 }).collect();
        let mut bars = make_bars(&closes);
        let mut last = bars[bars.len() - 1].clone();
        last.index += 1;
        last.open = last.close;
        last.close = last.open + 3.0;
        last.low = last.open - 0.1;
        last.high = last.close + 0.1;
        bars.push(last);

        let gate = ContextGate::default();
        let plain = gate.evaluate(&input(&bars, TradeAction::Buy, &[]));
        assert_eq!(plain.trend, TrendClass::Ambiguous);
        assert_eq!(plain.recommendation, GateRecommendation::Skip);
        assert!(plain.rejects());

        let mut strong = input(&bars, TradeAction::Buy, &[]);
        strong.confluence_score = 80.0;
        strong.pattern_confidence = 0.85;
        let lifted = gate.evaluate(&strong);
        assert!(lifted.overridden);
        assert!(!lifted.rejects());

        strong.pattern_confidence = 0.5;
        assert!(gate.evaluate(&strong).rejects());
    }

    #[test]
    fn prior_window_fills_short_series() {
        let gate = ContextGate::default();
        let prior = make_bars(&(0..15).map(|i| 100.0 + i as f64).collect::<Vec<_>>());
        let current = make_bars(&[114.0, 115.0, 116.0]);
        let window = gate.window(&current, Some(&prior));
        assert_eq!(window.len(), 18);
        assert_eq!(window[window.len() - 1].close, 116.0);

        let long = make_bars(&(0..40).map(|i| i as f64).collect::<Vec<_>>());
        assert_eq!(gate.window(&long, Some(&prior)).len(), 30);
        assert_eq!(gate.window(&current, None).len(), 3);
    }

    #[test]
    fn gate_component_votes_candidate_unless_skipped() {
        let bars = uptrend(20);
        let v = ContextGate::default().evaluate(&input(&bars, TradeAction::Buy, &[]));
        let c = v.component(0.1);
        assert_eq!(c.resolved_action, TradeAction::Buy);
        assert!((c.confidence - v.score / 100.0).abs() < 1e-12);

        let short = make_bars(&[1.0]);
        let skipped = ContextGate::default().evaluate(&input(&short, TradeAction::Buy, &[]));
        assert!(!skipped.component(0.1).is_valid);
    }
}
