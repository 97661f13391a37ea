//! Price axis calibrator.
//!
//! Stretches the region's height over a fixed normalized price range. There
//! is no OCR of axis labels, so the output is relative geometry only.

use crate::domain::{ChartRegion, PriceCalibration};

pub const NORMALIZED_MIN_PRICE: f64 = 0.0;
pub const NORMALIZED_MAX_PRICE: f64 = 1000.0;
/// Ratio used when the region height is unusable.
pub const DEFAULT_PIXEL_PER_UNIT: f64 = 1.0;

pub fn calibrate(region: &ChartRegion) -> PriceCalibration {
    let height = region.height as f64;
    let span = NORMALIZED_MAX_PRICE - NORMALIZED_MIN_PRICE;
    let ratio = height / span;
    let pixel_per_unit = if height > 0.0 && ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        DEFAULT_PIXEL_PER_UNIT
    };
    PriceCalibration {
        min_price: NORMALIZED_MIN_PRICE,
        max_price: NORMALIZED_MAX_PRICE,
        pixel_per_unit,
        axis_x: region.right(),
        origin_y: region.y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_spans_region_height() {
        let region = ChartRegion {
            x: 10,
            y: 20,
            width: 300,
            height: 500,
        };
        let cal = calibrate(&region);
        assert_eq!(cal.pixel_per_unit, 0.5);
        assert_eq!(cal.axis_x, 310);
        assert_eq!(cal.price_at(20.0), 1000.0);
        assert!((cal.price_at(520.0)).abs() < 1e-9);
    }

    #[test]
    fn zero_height_uses_default_ratio() {
        let region = ChartRegion {
            x: 0,
            y: 0,
            width: 10,
            height: 0,
        };
        let cal = calibrate(&region);
        assert_eq!(cal.pixel_per_unit, DEFAULT_PIXEL_PER_UNIT);
        assert!(cal.price_at(3.0).is_finite());
    }
}
