//! One-bar formations: doji, spinning top, hammer family, marubozu.

use super::{prior_downtrend, prior_uptrend, PatternContext, PatternName};
use crate::domain::OhlcBar;

const DOJI_BODY_RATIO: f64 = 0.1;
const SMALL_BODY_RATIO: f64 = 0.33;
const SPINNING_TOP_BODY_RATIO: f64 = 0.3;
const LONG_SHADOW_RATIO: f64 = 0.6;
const SHORT_SHADOW_RATIO: f64 = 0.15;
const MARUBOZU_BODY_RATIO: f64 = 0.9;

pub(super) fn detect(bars: &[OhlcBar], i: usize, ctx: &PatternContext) -> Vec<(PatternName, f64)> {
    let bar = &bars[i];
    let range = bar.range();
    let mut out = Vec::new();
    if range <= 0.0 {
        return out;
    }
    let ratio = bar.body_ratio();
    let upper = bar.upper_wick() / range;
    let lower = bar.lower_wick() / range;

    if ratio < DOJI_BODY_RATIO {
        out.push((PatternName::Doji, 0.4 + 0.4 * (1.0 - ratio / DOJI_BODY_RATIO)));
    } else if ratio < SPINNING_TOP_BODY_RATIO && bar.upper_wick() >= bar.body() && bar.lower_wick() >= bar.body() {
        out.push((PatternName::SpinningTop, 0.45));
    }

    if ratio < SMALL_BODY_RATIO && lower > LONG_SHADOW_RATIO && upper < SHORT_SHADOW_RATIO {
        let shape = (lower - LONG_SHADOW_RATIO) * 0.75;
        if prior_downtrend(bars, i) {
            out.push((PatternName::Hammer, (0.65 + shape).min(0.9)));
        } else if prior_uptrend(bars, i) {
            out.push((PatternName::HangingMan, (0.6 + shape).min(0.85)));
        }
    }

    if ratio < SMALL_BODY_RATIO && upper > LONG_SHADOW_RATIO && lower < SHORT_SHADOW_RATIO {
        let shape = (upper - LONG_SHADOW_RATIO) * 0.75;
        if prior_uptrend(bars, i) {
            out.push((PatternName::ShootingStar, (0.65 + shape).min(0.9)));
        } else if prior_downtrend(bars, i) {
            out.push((PatternName::InvertedHammer, (0.6 + shape).min(0.85)));
        }
    }

    if ratio >= MARUBOZU_BODY_RATIO && bar.body() >= ctx.avg_body {
        let confidence = (0.7 + (ratio - MARUBOZU_BODY_RATIO) * 2.0).min(0.9);
        if bar.is_bullish() {
            out.push((PatternName::BullishMarubozu, confidence));
        } else if bar.is_bearish() {
            out.push((PatternName::BearishMarubozu, confidence));
        }
    }

    out
}
