//! Three-bar formations: morning/evening star, soldiers and crows.

use super::{PatternContext, PatternName};
use crate::domain::OhlcBar;

const STAR_BODY_SHARE: f64 = 0.5;
const ADVANCE_BODY_RATIO: f64 = 0.6;

pub(super) fn detect(bars: &[OhlcBar], i: usize, ctx: &PatternContext) -> Vec<(PatternName, f64)> {
    let mut out = Vec::new();
    if i < 2 {
        return out;
    }
    let (a, b, c) = (&bars[i - 2], &bars[i - 1], &bars[i]);

    let long_first = a.body() >= ctx.avg_body && a.body() > 0.0;
    let small_middle = b.body() <= a.body() * STAR_BODY_SHARE;
    let a_mid = (a.open + a.close) / 2.0;
    if long_first && small_middle && a.is_bearish() && c.is_bullish() && c.close > a_mid && b.body_top() <= a.open {
        out.push((PatternName::MorningStar, 0.75));
    }
    if long_first && small_middle && a.is_bullish() && c.is_bearish() && c.close < a_mid && b.body_bottom() >= a.open {
        out.push((PatternName::EveningStar, 0.75));
    }

    let trio = [a, b, c];
    if trio.iter().all(|x| x.is_bullish() && x.body_ratio() >= ADVANCE_BODY_RATIO)
        && trio.windows(2).all(|w| w[1].close > w[0].close && w[1].open >= w[0].open && w[1].open <= w[0].close)
    {
        out.push((PatternName::ThreeWhiteSoldiers, advance_confidence(c, ctx)));
    }
    if trio.iter().all(|x| x.is_bearish() && x.body_ratio() >= ADVANCE_BODY_RATIO)
        && trio.windows(2).all(|w| w[1].close < w[0].close && w[1].open <= w[0].open && w[1].open >= w[0].close)
    {
        out.push((PatternName::ThreeBlackCrows, advance_confidence(c, ctx)));
    }

    out
}

fn advance_confidence(last: &OhlcBar, ctx: &PatternContext) -> f64 {
    let mut confidence = 0.75 + 0.1 * (last.body_ratio() - ADVANCE_BODY_RATIO);
    if last.body() >= ctx.avg_body {
        confidence += 0.05;
    }
    confidence.min(0.9)
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
    fn morning_star() {
        let bars = vec![
            bar(0, 105.0, 105.5, 99.5, 100.0),
            bar(1, 99.5, 100.0, 98.5, 99.2),
            bar(2, 99.5, 104.0, 99.2, 103.5),
        ];
        assert!(names(&bars).contains(&PatternName::MorningStar));
    }

    #[test]
    fn evening_star() {
        let bars = vec![
            bar(0, 100.0, 105.5, 99.5, 105.0),
            bar(1, 105.5, 106.5, 105.0, 105.8),
            bar(2, 105.5, 105.8, 101.0, 101.5),
        ];
        assert!(names(&bars).contains(&PatternName::EveningStar));
    }

    #[test]
    fn three_white_soldiers_open_within_prior_body() {
        let bars = vec![
            bar(0, 100.0, 102.2, 99.9, 102.0),
            bar(1, 101.5, 104.2, 101.4, 104.0),
            bar(2, 103.5, 106.2, 103.4, 106.0),
        ];
        let found = names(&bars);
        assert!(found.contains(&PatternName::ThreeWhiteSoldiers));
    }

    #[test]
    fn gapped_soldiers_do_not_count() {
        let bars = vec![
            bar(0, 100.0, 102.2, 99.9, 102.0),
            bar(1, 103.0, 105.2, 102.9, 105.0),
            bar(2, 106.0, 108.2, 105.9, 108.0),
        ];
        assert!(!names(&bars).contains(&PatternName::ThreeWhiteSoldiers));
    }

    #[test]
    fn three_black_crows() {
        let bars = vec![
            bar(0, 106.0, 106.1, 103.8, 104.0),
            bar(1, 104.5, 104.6, 101.8, 102.0),
            bar(2, 102.5, 102.6, 99.8, 100.0),
        ];
        assert!(names(&bars).contains(&PatternName::ThreeBlackCrows));
    }
}
