//! Price calibration — a synthetic linear pixel → price mapping.
//!
//! No axis labels are read. The region's height is stretched over a fixed
//! normalized range, so the resulting "prices" express relative geometry only.

use serde::{Deserialize, Serialize};

/// Linear mapping from pixel rows to normalized prices.
///
/// Smaller `y` maps to a higher price. `origin_y` is the row that maps to
/// `max_price`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceCalibration {
    pub min_price: f64,
    pub max_price: f64,
    pub pixel_per_unit: f64,
    pub axis_x: u32,
    pub origin_y: u32,
}

impl PriceCalibration {
    /// Price at pixel row `y`, floored at zero.
    pub fn price_at(&self, y: f64) -> f64 {
        let ppu = if self.pixel_per_unit.is_finite() && self.pixel_per_unit > 0.0 {
            self.pixel_per_unit
        } else {
            1.0
        };
        let price = self.max_price - (y - self.origin_y as f64) / ppu;
        if price.is_finite() {
            price.max(0.0)
        } else {
            0.0
        }
    }

    /// Pixel row of `price` (inverse of `price_at`, without the floor).
    pub fn y_for_price(&self, price: f64) -> f64 {
        self.origin_y as f64 + (self.max_price - price) * self.pixel_per_unit
    }
}
