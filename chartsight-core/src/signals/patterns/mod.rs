//! Candlestick pattern matcher.
//!
//! Scans a bounded look-back window for single, double and triple-bar
//! formations. Every match carries a direction and a confidence; matches
//! further from the newest bar are discounted. The report keeps at most one
//! match per pattern name (the strongest) and only the top few overall.

mod double;
mod single;
mod triple;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::{SignalExtractor, SignalSource};
use crate::domain::{Direction, OhlcBar, Signal, SignalKind};
use crate::indicators::{average_body, average_range, before};

/// Hard ceiling on the look-back window.
pub const MAX_LOOKBACK: usize = 15;
const DEFAULT_TOP_N: usize = 5;
/// Confidence discount per bar of age, floored at `MIN_RECENCY`.
const RECENCY_DECAY: f64 = 0.02;
const MIN_RECENCY: f64 = 0.7;
/// Bars before a candidate used for average body/range.
const CONTEXT_BARS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternName {
    Doji,
    SpinningTop,
    Hammer,
    InvertedHammer,
    HangingMan,
    ShootingStar,
    BullishMarubozu,
    BearishMarubozu,
    BullishEngulfing,
    BearishEngulfing,
    BullishHarami,
    BearishHarami,
    PiercingLine,
    DarkCloudCover,
    MorningStar,
    EveningStar,
    ThreeWhiteSoldiers,
    ThreeBlackCrows,
}

impl PatternName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Doji => "doji",
            Self::SpinningTop => "spinning_top",
            Self::Hammer => "hammer",
            Self::InvertedHammer => "inverted_hammer",
            Self::HangingMan => "hanging_man",
            Self::ShootingStar => "shooting_star",
            Self::BullishMarubozu => "bullish_marubozu",
            Self::BearishMarubozu => "bearish_marubozu",
            Self::BullishEngulfing => "bullish_engulfing",
            Self::BearishEngulfing => "bearish_engulfing",
            Self::BullishHarami => "bullish_harami",
            Self::BearishHarami => "bearish_harami",
            Self::PiercingLine => "piercing_line",
            Self::DarkCloudCover => "dark_cloud_cover",
            Self::MorningStar => "morning_star",
            Self::EveningStar => "evening_star",
            Self::ThreeWhiteSoldiers => "three_white_soldiers",
            Self::ThreeBlackCrows => "three_black_crows",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Self::Doji | Self::SpinningTop => Direction::Neutral,
            Self::Hammer
            | Self::InvertedHammer
            | Self::BullishMarubozu
            | Self::BullishEngulfing
            | Self::BullishHarami
            | Self::PiercingLine
            | Self::MorningStar
            | Self::ThreeWhiteSoldiers => Direction::Bullish,
            Self::HangingMan
            | Self::ShootingStar
            | Self::BearishMarubozu
            | Self::BearishEngulfing
            | Self::BearishHarami
            | Self::DarkCloudCover
            | Self::EveningStar
            | Self::ThreeBlackCrows => Direction::Bearish,
        }
    }

    /// Number of bars the formation spans.
    pub fn span(&self) -> usize {
        match self {
            Self::MorningStar | Self::EveningStar | Self::ThreeWhiteSoldiers | Self::ThreeBlackCrows => 3,
            Self::BullishEngulfing
            | Self::BearishEngulfing
            | Self::BullishHarami
            | Self::BearishHarami
            | Self::PiercingLine
            | Self::DarkCloudCover => 2,
            _ => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub name: PatternName,
    pub direction: Direction,
    pub confidence: f64,
    /// Index (into the analyzed slice) of the formation's last bar.
    pub bar_index: usize,
}

/// Averages around a candidate bar, used to judge "long" and "small" bodies.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PatternContext {
    pub avg_body: f64,
    pub avg_range: f64,
}

impl PatternContext {
    fn around(bars: &[OhlcBar], index: usize) -> Self {
        let prior = before(bars, index, CONTEXT_BARS);
        let window = if prior.is_empty() { &bars[index..=index] } else { prior };
        Self {
            avg_body: average_body(window),
            avg_range: average_range(window),
        }
    }
}

/// Three of the last closes before `index` descending.
pub(crate) fn prior_downtrend(bars: &[OhlcBar], index: usize) -> bool {
    let prior = before(bars, index, 4);
    prior.len() >= 3 && prior.windows(2).filter(|w| w[1].close < w[0].close).count() >= 2
        && prior[prior.len() - 1].close < prior[0].close
}

pub(crate) fn prior_uptrend(bars: &[OhlcBar], index: usize) -> bool {
    let prior = before(bars, index, 4);
    prior.len() >= 3 && prior.windows(2).filter(|w| w[1].close > w[0].close).count() >= 2
        && prior[prior.len() - 1].close > prior[0].close
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    /// Sorted by descending confidence.
    pub matches: Vec<PatternMatch>,
}

impl PatternReport {
    /// Highest confidence among directional matches.
    pub fn strongest_directional(&self) -> f64 {
        self.matches
            .iter()
            .filter(|m| m.direction != Direction::Neutral)
            .map(|m| m.confidence)
            .fold(0.0, f64::max)
    }

    pub fn contains(&self, name: PatternName) -> bool {
        self.matches.iter().any(|m| m.name == name)
    }
}

impl SignalSource for PatternReport {
    fn signals(&self) -> Vec<Signal> {
        self.matches
            .iter()
            .map(|m| {
                Signal::new(
                    SignalKind::CandlestickPattern,
                    m.name.as_str(),
                    m.direction.to_action(),
                    m.confidence,
                )
                .with_evidence(format!("bar {}", m.bar_index))
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PatternMatcher {
    pub lookback: usize,
    pub top_n: usize,
}

impl Default for PatternMatcher {
    fn default() -> Self {
        Self {
            lookback: MAX_LOOKBACK,
            top_n: DEFAULT_TOP_N,
        }
    }
}

impl PatternMatcher {
    /// All raw matches in the look-back window, before dedup and ranking.
    pub fn scan(&self, bars: &[OhlcBar]) -> Vec<PatternMatch> {
        let lookback = self.lookback.clamp(1, MAX_LOOKBACK);
        let n = bars.len();
        let start = n.saturating_sub(lookback);
        let mut found = Vec::new();
        for i in start..n {
            let ctx = PatternContext::around(bars, i);
            let recency = (1.0 - RECENCY_DECAY * (n - 1 - i) as f64).max(MIN_RECENCY);
            let candidates = single::detect(bars, i, &ctx)
                .into_iter()
                .chain(double::detect(bars, i, &ctx))
                .chain(triple::detect(bars, i, &ctx));
            for (name, confidence) in candidates {
                found.push(PatternMatch {
                    name,
                    direction: name.direction(),
                    confidence: (confidence * recency).clamp(0.0, 1.0),
                    bar_index: i,
                });
            }
        }
        found
    }
}

impl SignalExtractor for PatternMatcher {
    type Report = PatternReport;

    fn name(&self) -> &str {
        "candlestick_patterns"
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn extract(&self, bars: &[OhlcBar]) -> PatternReport {
        let mut best: HashMap<PatternName, PatternMatch> = HashMap::new();
        for m in self.scan(bars) {
            match best.get(&m.name) {
                Some(existing) if existing.confidence >= m.confidence => {}
                _ => {
                    best.insert(m.name, m);
                }
            }
        }
        let mut matches: Vec<PatternMatch> = best.into_values().collect();
        matches.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then(b.bar_index.cmp(&a.bar_index))
                .then(a.name.cmp(&b.name))
        });
        matches.truncate(self.top_n);
        PatternReport { matches }
    }
}

#[cfg(test)]
pub(crate) mod test_bars {
    use crate::domain::OhlcBar;

    /// Bar from explicit OHLC values; timestamps are irrelevant to matching.
    pub fn bar(index: usize, open: f64, high: f64, low: f64, close: f64) -> OhlcBar {
        OhlcBar {
            index,
            timestamp: chrono::DateTime::<chrono::Utc>::from_timestamp(1_700_000_000 + 60 * index as i64, 0)
                .unwrap(),
            open,
            high,
            low,
            close,
            volume_proxy: 10.0,
            source_position: index as u32 * 10,
        }
    }

    /// Four declining bars ending at `level`, bodies of 2.0.
    pub fn downtrend_into(level: f64) -> Vec<OhlcBar> {
        (0..4)
            .map(|i| {
                let open = level + 8.0 - 2.0 * i as f64;
                bar(i, open, open + 0.5, open - 2.5, open - 2.0)
            })
            .collect()
    }

    pub fn uptrend_into(level: f64) -> Vec<OhlcBar> {
        (0..4)
            .map(|i| {
                let open = level - 8.0 + 2.0 * i as f64;
                bar(i, open, open + 2.5, open - 0.5, open + 2.0)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::test_bars::*;
    use super::*;

    #[test]
    fn empty_series_has_no_matches() {
        let report = PatternMatcher::default().extract(&[]);
        assert!(report.matches.is_empty());
        assert_eq!(report.strongest_directional(), 0.0);
    }

    #[test]
    fn report_dedupes_by_name_and_caps() {
        // Alternating dojis everywhere: only one "doji" entry survives.
        let bars: Vec<OhlcBar> = (0..12).map(|i| bar(i, 100.0, 101.0, 99.0, 100.0)).collect();
        let report = PatternMatcher::default().extract(&bars);
        let dojis = report.matches.iter().filter(|m| m.name == PatternName::Doji).count();
        assert_eq!(dojis, 1);
        assert!(report.matches.len() <= DEFAULT_TOP_N);
        // Newest doji has no recency discount, so it wins the dedup.
        let doji = report.matches.iter().find(|m| m.name == PatternName::Doji).unwrap();
        assert_eq!(doji.bar_index, 11);
    }

    #[test]
    fn older_matches_are_discounted() {
        let mut bars = downtrend_into(100.0);
        bars.push(bar(4, 99.8, 100.0, 96.0, 99.9)); // hammer
        let fresh = PatternMatcher::default().scan(&bars);
        for i in 5..15 {
            bars.push(bar(i, 99.9, 100.4, 99.4, 99.9 + 0.01));
        }
        let aged = PatternMatcher::default().scan(&bars);
        let c_fresh = fresh.iter().find(|m| m.name == PatternName::Hammer).unwrap().confidence;
        let c_aged = aged.iter().find(|m| m.name == PatternName::Hammer).unwrap().confidence;
        assert!(c_aged < c_fresh);
    }

    #[test]
    fn lookback_is_bounded() {
        let mut bars = downtrend_into(100.0);
        bars.push(bar(4, 99.8, 100.0, 96.0, 99.9)); // hammer at index 4
        for i in 5..25 {
            bars.push(bar(i, 99.9, 100.4, 99.4, 99.9 + 0.01));
        }
        let report = PatternMatcher::default().extract(&bars);
        assert!(!report.contains(PatternName::Hammer));
    }

    #[test]
    fn signals_mirror_matches() {
        let mut bars = downtrend_into(100.0);
        bars.push(bar(4, 99.8, 100.0, 96.0, 99.9));
        let report = PatternMatcher::default().extract(&bars);
        let signals = report.signals();
        assert_eq!(signals.len(), report.matches.len());
        assert!(signals.iter().all(|s| s.kind == SignalKind::CandlestickPattern));
    }
}
