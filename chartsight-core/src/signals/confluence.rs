//! Support/resistance levels, a synthetic volume profile and the 0–100
//! confluence score.
//!
//! Levels come from clustering pivot highs and lows that sit within a
//! tolerance band of each other. The profile spreads each bar's volume
//! proxy over the price bins its body and range cover.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::patterns::PatternMatcher;
use super::{SignalExtractor, SignalSource};
use crate::domain::{Direction, OhlcBar, Signal, SignalKind, TradeAction};
use crate::indicators::{assess_trend, average_range, normalized_momentum, tail, TrendState};

const PIVOT_SPAN: usize = 2;
const CLUSTER_TOLERANCE: f64 = 0.75;
const STRONG_LEVEL: f64 = 0.6;
const PROFILE_BINS: usize = 24;
const BODY_SHARE: f64 = 0.7;
const VALUE_AREA_SHARE: f64 = 0.7;
const MOMENTUM_PERIOD: usize = 5;
const TREND_WINDOW: usize = 20;
/// Levels within this many average ranges of the close produce signals.
const LEVEL_PROXIMITY: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelKind {
    Support,
    Resistance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub price: f64,
    pub kind: LevelKind,
    pub touches: usize,
    /// Bar index of the most recent pivot in the cluster.
    pub last_touch: usize,
    /// Blend of touch count and recency, in `[0, 1]`.
    pub strength: f64,
}

impl Level {
    pub fn is_strong(&self) -> bool {
        self.strength >= STRONG_LEVEL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeProfile {
    /// Price at the center of the heaviest bin.
    pub point_of_control: f64,
    pub value_area_low: f64,
    pub value_area_high: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceReport {
    /// Sorted by price ascending.
    pub levels: Vec<Level>,
    pub profile: Option<VolumeProfile>,
    pub trend: TrendState,
    /// Five-bar close change in average-range units.
    pub momentum: f64,
    pub pattern_count: usize,
    /// 0–100.
    pub score: f64,
    pub last_close: f64,
    pub avg_range: f64,
}

impl ConfluenceReport {
    pub fn strong_levels(&self) -> impl Iterator<Item = &Level> {
        self.levels.iter().filter(|l| l.is_strong())
    }

    /// Closest support at or below the last close.
    pub fn nearest_support(&self) -> Option<&Level> {
        self.levels
            .iter()
            .filter(|l| l.kind == LevelKind::Support && l.price <= self.last_close)
            .max_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal))
    }

    /// Closest resistance at or above the last close.
    pub fn nearest_resistance(&self) -> Option<&Level> {
        self.levels
            .iter()
            .filter(|l| l.kind == LevelKind::Resistance && l.price >= self.last_close)
            .min_by(|a, b| a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal))
    }
}

impl SignalSource for ConfluenceReport {
    fn signals(&self) -> Vec<Signal> {
        let mut signals = Vec::new();
        if self.score > 0.0 && !self.trend.is_ambiguous() {
            let momentum_dir = Direction::from_sign(self.momentum);
            let action = if momentum_dir == self.trend.direction || momentum_dir == Direction::Neutral {
                self.trend.direction.to_action()
            } else {
                TradeAction::Wait
            };
            signals.push(
                Signal::new(SignalKind::Confluence, "confluence", action, self.score / 100.0)
                    .with_evidence(format!("score {:.0}", self.score)),
            );
        }
        if self.avg_range > 0.0 {
            let reach = self.avg_range * LEVEL_PROXIMITY;
            if let Some(level) = self.nearest_support().filter(|l| l.is_strong()) {
                if self.last_close - level.price <= reach {
                    signals.push(
                        Signal::new(
                            SignalKind::SupportResistance,
                            "support_hold",
                            Direction::Bullish.to_action(),
                            level.strength * 0.8,
                        )
                        .with_evidence(format!("support {:.4} x{}", level.price, level.touches)),
                    );
                }
            }
            if let Some(level) = self.nearest_resistance().filter(|l| l.is_strong()) {
                if level.price - self.last_close <= reach {
                    signals.push(
                        Signal::new(
                            SignalKind::SupportResistance,
                            "resistance_cap",
                            Direction::Bearish.to_action(),
                            level.strength * 0.8,
                        )
                        .with_evidence(format!("resistance {:.4} x{}", level.price, level.touches)),
                    );
                }
            }
        }
        if signals.is_empty() {
            signals.push(Signal::neutral(SignalKind::Confluence, "no confluence"));
        }
        signals
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfluenceEngine {
    pub patterns: PatternMatcher,
}

impl SignalExtractor for ConfluenceEngine {
    type Report = ConfluenceReport;

    fn name(&self) -> &str {
        "confluence"
    }

    fn min_bars(&self) -> usize {
        2 * PIVOT_SPAN + 1
    }

    fn extract(&self, bars: &[OhlcBar]) -> ConfluenceReport {
        let avg_range = average_range(bars);
        let last_close = bars.last().map_or(0.0, |b| b.close);
        let levels = if bars.len() >= self.min_bars() {
            find_levels(bars, avg_range)
        } else {
            Vec::new()
        };
        let profile = volume_profile(bars);
        let trend = assess_trend(tail(bars, TREND_WINDOW));
        let momentum = normalized_momentum(bars, MOMENTUM_PERIOD);
        let pattern_count = self.patterns.extract(bars).matches.len();
        let strong = levels.iter().filter(|l| l.is_strong()).count();

        let score = confluence_score(pattern_count, strong, &trend, momentum);
        ConfluenceReport {
            levels,
            profile,
            trend,
            momentum,
            pattern_count,
            score,
            last_close,
            avg_range,
        }
    }
}

/// Patterns up to 24 points, strong levels up to 30, trend clarity up to 30,
/// momentum up to 16.
pub fn confluence_score(pattern_count: usize, strong_levels: usize, trend: &TrendState, momentum: f64) -> f64 {
    let patterns = pattern_count.min(3) as f64 * 8.0;
    let levels = strong_levels.min(3) as f64 * 10.0;
    let clarity = trend.clarity * 30.0;
    let momentum = (momentum.abs() / 3.0).min(1.0) * 16.0;
    (patterns + levels + clarity + momentum).clamp(0.0, 100.0)
}

fn find_levels(bars: &[OhlcBar], avg_range: f64) -> Vec<Level> {
    let n = bars.len();
    let mut pivots: Vec<(f64, usize)> = Vec::new();
    for i in PIVOT_SPAN..n.saturating_sub(PIVOT_SPAN) {
        let left = &bars[i - PIVOT_SPAN..i];
        let right = &bars[i + 1..=i + PIVOT_SPAN];
        let h = bars[i].high;
        if left.iter().all(|b| b.high <= h) && right.iter().all(|b| b.high < h) {
            pivots.push((h, i));
        }
        let l = bars[i].low;
        if left.iter().all(|b| b.low >= l) && right.iter().all(|b| b.low > l) {
            pivots.push((l, i));
        }
    }
    pivots.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

    let tolerance = (avg_range * CLUSTER_TOLERANCE).max(f64::EPSILON);
    let mut clusters: Vec<Vec<(f64, usize)>> = Vec::new();
    for pivot in pivots {
        match clusters.last_mut() {
            Some(cluster) if (pivot.0 - cluster_mean(&cluster[..])).abs() <= tolerance => cluster.push(pivot),
            _ => clusters.push(vec![pivot]),
        }
    }

    let last_close = bars[n - 1].close;
    let span = (n - 1).max(1) as f64;
    clusters
        .into_iter()
        .map(|cluster| {
            let price = cluster_mean(&cluster);
            let touches = cluster.len();
            let last_touch = cluster.iter().map(|p| p.1).max().unwrap_or(0);
            let strength = 0.7 * (touches as f64 / 3.0).min(1.0) + 0.3 * (last_touch as f64 / span);
            Level {
                price,
                kind: if price <= last_close { LevelKind::Support } else { LevelKind::Resistance },
                touches,
                last_touch,
                strength: strength.clamp(0.0, 1.0),
            }
        })
        .collect()
}

fn cluster_mean(cluster: &[(f64, usize)]) -> f64 {
    cluster.iter().map(|p| p.0).sum::<f64>() / cluster.len().max(1) as f64
}

/// Bin-weighted synthetic profile; `None` when there are no bars or volume.
pub fn volume_profile(bars: &[OhlcBar]) -> Option<VolumeProfile> {
    let lo = bars.iter().map(|b| b.low).reduce(f64::min)?;
    let hi = bars.iter().map(|b| b.high).reduce(f64::max)?;
    if hi <= lo {
        return Some(VolumeProfile {
            point_of_control: lo,
            value_area_low: lo,
            value_area_high: lo,
        });
    }
    let step = (hi - lo) / PROFILE_BINS as f64;
    let bin_of = |price: f64| (((price - lo) / step) as usize).min(PROFILE_BINS - 1);
    let mut bins = [0.0f64; PROFILE_BINS];
    let mut spread = |from: f64, to: f64, amount: f64| {
        let (a, b) = (bin_of(from), bin_of(to));
        let share = amount / (b - a + 1) as f64;
        for bin in &mut bins[a..=b] {
            *bin += share;
        }
    };
    for bar in bars {
        let volume = bar.volume_proxy.max(0.0);
        spread(bar.body_bottom(), bar.body_top(), volume * BODY_SHARE);
        spread(bar.low, bar.high, volume * (1.0 - BODY_SHARE));
    }

    let total: f64 = bins.iter().sum();
    if total <= 0.0 {
        return None;
    }
    let poc = bins
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal).then(b.0.cmp(&a.0)))
        .map_or(0, |(i, _)| i);

    // Grow the value area outward from the POC, heavier neighbor first.
    let (mut low, mut high) = (poc, poc);
    let mut covered = bins[poc];
    while covered < total * VALUE_AREA_SHARE && (low > 0 || high < PROFILE_BINS - 1) {
        let below = if low > 0 { bins[low - 1] } else { -1.0 };
        let above = if high < PROFILE_BINS - 1 { bins[high + 1] } else { -1.0 };
        if above >= below {
            high += 1;
            covered += bins[high];
        } else {
            low -= 1;
            covered += bins[low];
        }
    }

    let center = |i: usize| lo + step * (i as f64 + 0.5);
    Some(VolumeProfile {
        point_of_control: center(poc),
        value_area_low: lo + step * low as f64,
        value_area_high: lo + step * (high + 1) as f64,
    })
}
