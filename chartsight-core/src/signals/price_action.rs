//! Price-action event detection.
//!
//! Looks at the most recent bars for five kinds of events: wick rejections
//! at local extremes, absorption bars, breakouts from a compressed box,
//! liquidity sweeps and outsized institutional-looking moves. Every event
//! is graded by a strength tier and may carry a suggested entry zone.

use serde::{Deserialize, Serialize};

use super::{SignalExtractor, SignalSource};
use crate::domain::{Direction, OhlcBar, Signal, SignalKind};
use crate::indicators::{average_body, average_range, before, highest_high, lowest_low};

const REJECTION_WICK_TO_BODY: f64 = 2.0;
const REJECTION_WICK_DOMINANCE: f64 = 1.5;
const ABSORPTION_RANGE: f64 = 1.5;
const BOX_BARS: usize = 5;
const BOX_MAX_HEIGHT: f64 = 3.0;
const BREAKOUT_BODY_RATIO: f64 = 0.6;
const SWEEP_RECOVERY: f64 = 0.6;
const INSTITUTIONAL_RANGE: f64 = 2.5;
const INSTITUTIONAL_BODY: f64 = 2.0;
const RECENCY_DECAY: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceActionKind {
    Rejection,
    Absorption,
    Breakout,
    LiquiditySweep,
    InstitutionalMove,
}

impl PriceActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rejection => "rejection",
            Self::Absorption => "absorption",
            Self::Breakout => "breakout",
            Self::LiquiditySweep => "liquidity_sweep",
            Self::InstitutionalMove => "institutional_move",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrengthTier {
    Weak,
    Moderate,
    Strong,
}

impl StrengthTier {
    fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.75 {
            Self::Strong
        } else if confidence >= 0.6 {
            Self::Moderate
        } else {
            Self::Weak
        }
    }
}

/// Price band `[low, high]` where an entry would be considered.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntryZone {
    pub low: f64,
    pub high: f64,
}

impl EntryZone {
    fn new(a: f64, b: f64) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceActionEvent {
    pub kind: PriceActionKind,
    pub direction: Direction,
    pub strength: StrengthTier,
    pub confidence: f64,
    pub bar_index: usize,
    pub entry_zone: Option<EntryZone>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceActionReport {
    /// Ordered by bar index, then kind.
    pub events: Vec<PriceActionEvent>,
}

impl PriceActionReport {
    pub fn latest(&self) -> Option<&PriceActionEvent> {
        self.events.last()
    }

    pub fn count(&self, kind: PriceActionKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

impl SignalSource for PriceActionReport {
    fn signals(&self) -> Vec<Signal> {
        self.events
            .iter()
            .map(|e| {
                let mut signal = Signal::new(
                    SignalKind::PriceAction,
                    e.kind.as_str(),
                    e.direction.to_action(),
                    e.confidence,
                )
                .with_evidence(format!("bar {} ({:?})", e.bar_index, e.strength));
                if let Some(zone) = e.entry_zone {
                    signal = signal.with_evidence(format!("entry {:.4}..{:.4}", zone.low, zone.high));
                }
                signal
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct PriceActionDetector {
    /// How many trailing bars are scanned for events.
    pub scan_bars: usize,
    /// Bars before each candidate used for average range/body.
    pub context_bars: usize,
}

impl Default for PriceActionDetector {
    fn default() -> Self {
        Self {
            scan_bars: 10,
            context_bars: 20,
        }
    }
}

impl SignalExtractor for PriceActionDetector {
    type Report = PriceActionReport;

    fn name(&self) -> &str {
        "price_action"
    }

    fn min_bars(&self) -> usize {
        4
    }

    fn extract(&self, bars: &[OhlcBar]) -> PriceActionReport {
        let n = bars.len();
        let mut events = Vec::new();
        if n < self.min_bars() {
            return PriceActionReport { events };
        }
        for i in n.saturating_sub(self.scan_bars).max(3)..n {
            let prior = before(bars, i, self.context_bars);
            let avg_range = average_range(prior);
            if avg_range <= 0.0 {
                continue;
            }
            let avg_body = average_body(prior);
            let recency = 1.0 - RECENCY_DECAY * (n - 1 - i) as f64;
            let detected = [
                rejection(bars, i),
                absorption(bars, i, avg_range),
                breakout(bars, i, avg_range),
                liquidity_sweep(bars, i),
                institutional_move(bars, i, avg_range, avg_body),
            ];
            for (kind, direction, confidence, entry_zone) in detected.into_iter().flatten() {
                let confidence = (confidence * recency).clamp(0.0, 1.0);
                events.push(PriceActionEvent {
                    kind,
                    direction,
                    strength: StrengthTier::from_confidence(confidence),
                    confidence,
                    bar_index: i,
                    entry_zone,
                });
            }
        }
        PriceActionReport { events }
    }
}

type Detected = Option<(PriceActionKind, Direction, f64, Option<EntryZone>)>;

/// Long wick at a fresh local extreme, dominating both the body and the other wick.
fn rejection(bars: &[OhlcBar], i: usize) -> Detected {
    let bar = &bars[i];
    let range = bar.range();
    if range <= 0.0 {
        return None;
    }
    let (upper, lower, body) = (bar.upper_wick(), bar.lower_wick(), bar.body());
    let prior = before(bars, i, BOX_BARS);
    let at_low = lowest_low(prior).is_some_and(|l| bar.low <= l);
    let at_high = highest_high(prior).is_some_and(|h| bar.high >= h);

    if lower > body * REJECTION_WICK_TO_BODY && lower > upper * REJECTION_WICK_DOMINANCE && at_low {
        let confidence = (0.5 + 0.4 * lower / range).min(0.9);
        return Some((
            PriceActionKind::Rejection,
            Direction::Bullish,
            confidence,
            Some(EntryZone::new(bar.low, bar.body_bottom())),
        ));
    }
    if upper > body * REJECTION_WICK_TO_BODY && upper > lower * REJECTION_WICK_DOMINANCE && at_high {
        let confidence = (0.5 + 0.4 * upper / range).min(0.9);
        return Some((
            PriceActionKind::Rejection,
            Direction::Bearish,
            confidence,
            Some(EntryZone::new(bar.body_top(), bar.high)),
        ));
    }
    None
}

/// A wide bar that spans the whole range of the previous three.
fn absorption(bars: &[OhlcBar], i: usize, avg_range: f64) -> Detected {
    let bar = &bars[i];
    let prior = before(bars, i, 3);
    let (hi, lo) = (highest_high(prior)?, lowest_low(prior)?);
    if bar.range() < avg_range * ABSORPTION_RANGE || bar.high < hi || bar.low > lo {
        return None;
    }
    let direction = Direction::from_sign(bar.close - bar.open);
    if direction == Direction::Neutral {
        return None;
    }
    let confidence = (0.5 + 0.1 * (bar.range() / avg_range - ABSORPTION_RANGE)).min(0.85);
    Some((
        PriceActionKind::Absorption,
        direction,
        confidence,
        Some(EntryZone::new(bar.body_bottom(), bar.body_top())),
    ))
}

/// Decisive close outside a tight box of the previous five bars.
fn breakout(bars: &[OhlcBar], i: usize, avg_range: f64) -> Detected {
    let prior = before(bars, i, BOX_BARS);
    if prior.len() < BOX_BARS {
        return None;
    }
    let (hi, lo) = (highest_high(prior)?, lowest_low(prior)?);
    if hi - lo > avg_range * BOX_MAX_HEIGHT {
        return None;
    }
    let bar = &bars[i];
    if bar.body_ratio() < BREAKOUT_BODY_RATIO {
        return None;
    }
    if bar.close > hi && bar.is_bullish() {
        let distance = ((bar.close - hi) / avg_range).min(3.0);
        return Some((
            PriceActionKind::Breakout,
            Direction::Bullish,
            (0.55 + 0.1 * distance).min(0.85),
            Some(EntryZone::new(hi, bar.close)),
        ));
    }
    if bar.close < lo && bar.is_bearish() {
        let distance = ((lo - bar.close) / avg_range).min(3.0);
        return Some((
            PriceActionKind::Breakout,
            Direction::Bearish,
            (0.55 + 0.1 * distance).min(0.85),
            Some(EntryZone::new(bar.close, lo)),
        ));
    }
    None
}

/// Previous bar pierced a recent extreme; the current bar recovers back through it.
fn liquidity_sweep(bars: &[OhlcBar], i: usize) -> Detected {
    if i < 2 {
        return None;
    }
    let sweep = &bars[i - 1];
    let bar = &bars[i];
    let range = sweep.range();
    if range <= 0.0 {
        return None;
    }
    let prior = before(bars, i - 1, BOX_BARS);
    let (hi, lo) = (highest_high(prior)?, lowest_low(prior)?);

    if sweep.low < lo && bar.is_bullish() && bar.close > lo {
        let recovery = (bar.close - sweep.low) / range;
        if recovery >= SWEEP_RECOVERY {
            return Some((
                PriceActionKind::LiquiditySweep,
                Direction::Bullish,
                (0.5 + 0.35 * recovery.min(1.0)).min(0.85),
                Some(EntryZone::new(sweep.low, lo)),
            ));
        }
    }
    if sweep.high > hi && bar.is_bearish() && bar.close < hi {
        let recovery = (sweep.high - bar.close) / range;
        if recovery >= SWEEP_RECOVERY {
            return Some((
                PriceActionKind::LiquiditySweep,
                Direction::Bearish,
                (0.5 + 0.35 * recovery.min(1.0)).min(0.85),
                Some(EntryZone::new(hi, sweep.high)),
            ));
        }
    }
    None
}

fn institutional_move(bars: &[OhlcBar], i: usize, avg_range: f64, avg_body: f64) -> Detected {
    let bar = &bars[i];
    if bar.range() < avg_range * INSTITUTIONAL_RANGE || bar.body() < avg_body * INSTITUTIONAL_BODY {
        return None;
    }
    let direction = Direction::from_sign(bar.close - bar.open);
    if direction == Direction::Neutral {
        return None;
    }
    let confidence = (0.6 + 0.05 * (bar.range() / avg_range - INSTITUTIONAL_RANGE)).min(0.9);
    Some((PriceActionKind::InstitutionalMove, direction, confidence, None))
}
