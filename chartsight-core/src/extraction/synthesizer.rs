//! OHLC synthesizer — candle geometry to bars on the calibrated scale.
//!
//! Body bounds give open/close (green closes at the top of the body, every
//! other color closes at the bottom); wick bounds give high/low. High and low
//! are widened to cover the body so the OHLC invariant holds even for
//! malformed geometry. Timestamps are synthetic: fixed spacing, the last bar
//! stamped `as_of`.

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use crate::config::{SynthesisConfig, DEFAULT_BAR_SPACING_SECS};
use crate::domain::{Candle, OhlcBar, PriceCalibration};

pub fn synthesize_bars(
    candles: &[Candle],
    calibration: &PriceCalibration,
    as_of: DateTime<Utc>,
    config: &SynthesisConfig,
) -> Vec<OhlcBar> {
    let n = candles.len();
    let spacing = series_spacing(config.bar_spacing_secs, n, as_of);

    candles
        .iter()
        .enumerate()
        .map(|(index, candle)| {
            let timestamp = steps_before(as_of, spacing, n - 1 - index).unwrap_or(as_of);
            bar_from_candle(index, candle, calibration, timestamp)
        })
        .collect()
}

/// `as_of - spacing * steps`, or `None` when it leaves chrono's range.
fn steps_before(as_of: DateTime<Utc>, spacing: Duration, steps: usize) -> Option<DateTime<Utc>> {
    let steps = i32::try_from(steps).ok()?;
    as_of.checked_sub_signed(spacing.checked_mul(steps)?)
}

/// The configured spacing if the oldest bar stays representable, else the default.
/// Chosen once per series so timestamps stay strictly increasing.
fn series_spacing(secs: i64, n: usize, as_of: DateTime<Utc>) -> Duration {
    let oldest = n.saturating_sub(1);
    if let Some(spacing) = Duration::try_seconds(secs.max(1)) {
        if steps_before(as_of, spacing, oldest).is_some() {
            return spacing;
        }
    }
    warn!(
        bar_spacing_secs = secs,
        bars = n,
        "bar spacing overflows the timestamp range; using default spacing"
    );
    Duration::seconds(DEFAULT_BAR_SPACING_SECS)
}

fn bar_from_candle(
    index: usize,
    candle: &Candle,
    calibration: &PriceCalibration,
    timestamp: DateTime<Utc>,
) -> OhlcBar {
    let body_high = calibration.price_at(candle.body_top as f64);
    let body_low = calibration.price_at(candle.body_bottom as f64);
    let (open, close) = if candle.color.closes_high() {
        (body_low, body_high)
    } else {
        (body_high, body_low)
    };

    let wick_high = calibration.price_at(candle.wick_top as f64);
    let wick_low = calibration.price_at(candle.wick_bottom as f64);
    let high = wick_high.max(open).max(close);
    let low = wick_low.min(open).min(close);

    OhlcBar {
        index,
        timestamp,
        open,
        high,
        low,
        close,
        volume_proxy: volume_proxy(candle),
        source_position: candle.x,
    }
}

/// Ink mass of the candle: taller, fuller and wider candles read as heavier.
fn volume_proxy(candle: &Candle) -> f64 {
    candle.total_height() as f64 * (0.5 + candle.body_fraction()) * candle.width.max(1) as f64 / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CandleColor;

    fn cal() -> PriceCalibration {
        PriceCalibration {
            min_price: 0.0,
            max_price: 1000.0,
            pixel_per_unit: 1.0,
            axis_x: 0,
            origin_y: 0,
        }
    }

    fn candle(color: CandleColor) -> Candle {
        Candle {
            x: 50,
            width: 6,
            body_top: 100,
            body_bottom: 200,
            wick_top: 50,
            wick_bottom: 250,
            color,
            confidence: 0.9,
        }
    }

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn green_closes_at_body_top() {
        let bars = synthesize_bars(&[candle(CandleColor::Green)], &cal(), now(), &SynthesisConfig::default());
        let b = &bars[0];
        assert_eq!(b.close, 900.0);
        assert_eq!(b.open, 800.0);
        assert_eq!(b.high, 950.0);
        assert_eq!(b.low, 750.0);
        assert!(b.is_sane());
    }

    #[test]
    fn red_closes_at_body_bottom() {
        let bars = synthesize_bars(&[candle(CandleColor::Red)], &cal(), now(), &SynthesisConfig::default());
        assert_eq!(bars[0].open, 900.0);
        assert_eq!(bars[0].close, 800.0);
    }

    #[test]
    fn malformed_wick_still_satisfies_invariant() {
        let mut c = candle(CandleColor::White);
        c.wick_top = 150;
        c.wick_bottom = 160;
        let bars = synthesize_bars(&[c], &cal(), now(), &SynthesisConfig::default());
        assert!(bars[0].is_sane());
        assert_eq!(bars[0].high, 900.0);
        assert_eq!(bars[0].low, 800.0);
    }

    #[test]
    fn prices_floor_at_zero() {
        let mut c = candle(CandleColor::Black);
        c.body_bottom = 5_000;
        c.wick_bottom = 6_000;
        let bars = synthesize_bars(&[c], &cal(), now(), &SynthesisConfig::default());
        assert_eq!(bars[0].close, 0.0);
        assert_eq!(bars[0].low, 0.0);
        assert!(bars[0].is_sane());
    }

    #[test]
    fn timestamps_ascend_to_as_of() {
        let candles = vec![candle(CandleColor::Green); 3];
        let bars = synthesize_bars(&candles, &cal(), now(), &SynthesisConfig::default());
        assert_eq!(bars[2].timestamp, now());
        assert_eq!(bars[0].timestamp, now() - Duration::seconds(120));
        assert_eq!(bars.iter().map(|b| b.index).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn oversized_spacing_falls_back_to_default() {
        let candles = vec![candle(CandleColor::Green); 3];
        // Out of TimeDelta range, overflowing the multiply, past the earliest date.
        for secs in [i64::MAX, i64::MAX / 1000 - 1, 1 << 45] {
            let cfg = SynthesisConfig { bar_spacing_secs: secs };
            let bars = synthesize_bars(&candles, &cal(), now(), &cfg);
            assert_eq!(bars[2].timestamp, now());
            assert_eq!(
                bars[0].timestamp,
                now() - Duration::seconds(2 * DEFAULT_BAR_SPACING_SECS),
                "spacing {secs}"
            );
        }
    }

    #[test]
    fn year_spacing_is_kept() {
        let candles = vec![candle(CandleColor::Red); 3];
        let cfg = SynthesisConfig {
            bar_spacing_secs: crate::config::MAX_BAR_SPACING_SECS,
        };
        let bars = synthesize_bars(&candles, &cal(), now(), &cfg);
        assert_eq!(
            bars[0].timestamp,
            now() - Duration::seconds(2 * crate::config::MAX_BAR_SPACING_SECS)
        );
        assert!(bars.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
    }

    #[test]
    fn empty_candles_empty_bars() {
        assert!(synthesize_bars(&[], &cal(), now(), &SynthesisConfig::default()).is_empty());
    }
}
