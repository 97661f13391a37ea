//! Two-bar formations: engulfing, harami, piercing line, dark cloud cover.

use super::{PatternContext, PatternName};
use crate::domain::OhlcBar;

const HARAMI_MAX_BODY_SHARE: f64 = 0.6;

pub(super) fn detect(bars: &[OhlcBar], i: usize, ctx: &PatternContext) -> Vec<(PatternName, f64)> {
    let mut out = Vec::new();
    if i == 0 {
        return out;
    }
    let prev = &bars[i - 1];
    let cur = &bars[i];
    let prev_body = prev.body();
    let cur_body = cur.body();

    // Engulfing: the current body swallows an opposite-colored previous body.
    if prev.is_bearish() && cur.is_bullish() && cur.open <= prev.close && cur.close >= prev.open && cur_body > prev_body {
        out.push((PatternName::BullishEngulfing, engulfing_confidence(cur_body, prev_body)));
    }
    if prev.is_bullish() && cur.is_bearish() && cur.open >= prev.close && cur.close <= prev.open && cur_body > prev_body {
        out.push((PatternName::BearishEngulfing, engulfing_confidence(cur_body, prev_body)));
    }

    let long_prev = prev_body >= ctx.avg_body && prev_body > 0.0;
    if long_prev && cur_body < prev_body * HARAMI_MAX_BODY_SHARE {
        if prev.is_bearish() && cur.is_bullish() && cur.open >= prev.close && cur.close <= prev.open {
            out.push((PatternName::BullishHarami, 0.6));
        }
        if prev.is_bullish() && cur.is_bearish() && cur.open <= prev.close && cur.close >= prev.open {
            out.push((PatternName::BearishHarami, 0.6));
        }
    }

    let prev_mid = (prev.open + prev.close) / 2.0;
    if long_prev && prev.is_bearish() && cur.is_bullish() && cur.open < prev.close && cur.close > prev_mid && cur.close < prev.open {
        out.push((PatternName::PiercingLine, 0.68));
    }
    if long_prev && prev.is_bullish() && cur.is_bearish() && cur.open > prev.close && cur.close < prev_mid && cur.close > prev.open {
        out.push((PatternName::DarkCloudCover, 0.68));
    }

    out
}

fn engulfing_confidence(cur_body: f64, prev_body: f64) -> f64 {
    if prev_body <= 0.0 {
        return 0.8;
    }
    0.7 + ((cur_body / prev_body - 1.0) * 0.1).min(0.2)
}

#[cfg(test)]
mod tests {
    use super::super::test_bars::*;
    use super::*;

    fn names(bars: &[OhlcBar]) -> Vec<PatternName> {
        let i = bars.len() - 1;
        let ctx = PatternContext::around(bars, i);
        detect(bars, i, &ctx).into_iter().map(|(n, _)| n).collect()
    }

    #[test]
    fn bullish_engulfing() {
        let bars = vec![bar(0, 101.0, 101.5, 99.5, 100.0), bar(1, 99.8, 102.5, 99.5, 102.0)];
        assert_eq!(names(&bars), vec![PatternName::BullishEngulfing]);
    }

    #[test]
    fn bearish_engulfing() {
        let bars = vec![bar(0, 100.0, 101.5, 99.5, 101.0), bar(1, 101.2, 101.5, 98.5, 99.0)];
        assert_eq!(names(&bars), vec![PatternName::BearishEngulfing]);
    }

    #[test]
    fn engulfing_needs_opposite_previous_bar() {
        let bars = vec![bar(0, 100.0, 101.5, 99.5, 100.5), bar(1, 99.8, 102.5, 99.5, 102.0)];
        assert!(!names(&bars).contains(&PatternName::BullishEngulfing));
    }

    #[test]
    fn harami_inside_long_body() {
        let bars = vec![bar(0, 104.0, 104.5, 99.5, 100.0), bar(1, 101.0, 102.5, 100.5, 102.0)];
        assert!(names(&bars).contains(&PatternName::BullishHarami));
    }

    #[test]
    fn piercing_and_dark_cloud() {
        let pierce = vec![bar(0, 104.0, 104.5, 99.5, 100.0), bar(1, 99.0, 103.0, 98.5, 102.5)];
        assert!(names(&pierce).contains(&PatternName::PiercingLine));
        let cloud = vec![bar(0, 100.0, 104.5, 99.5, 104.0), bar(1, 105.0, 105.5, 101.0, 101.5)];
        assert!(names(&cloud).contains(&PatternName::DarkCloudCover));
    }

    #[test]
    fn first_bar_has_no_pair() {
        assert!(names(&[bar(0, 100.0, 101.0, 99.0, 100.5)]).is_empty());
    }
}
