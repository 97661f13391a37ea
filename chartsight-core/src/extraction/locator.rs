//! Chart region locator.
//!
//! Samples the image on a fixed grid, tracks the bounding box of chart-ink
//! pixels, pads it by a margin and clamps it to the image. Returns the full
//! image whenever nothing usable is found.

use tracing::debug;

use super::pixel::is_chart_ink;
use crate::config::LocatorConfig;
use crate::domain::{ChartRegion, RasterImage};

/// Smallest accepted side, in pixels, after padding.
const MIN_REGION_SIDE: u32 = 2;

pub fn locate_chart_region(image: &RasterImage, config: &LocatorConfig) -> ChartRegion {
    let full = ChartRegion::full(image);
    if image.is_empty() {
        return full;
    }
    let stride = config.stride.max(1) as usize;

    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for y in (0..image.height).step_by(stride) {
        for x in (0..image.width).step_by(stride) {
            let Some(color) = image.pixel(x, y) else {
                continue;
            };
            if !is_chart_ink(color) {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((min_x, min_y, max_x, max_y)) => {
                    (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
                }
            });
        }
    }

    let Some((min_x, min_y, max_x, max_y)) = bounds else {
        debug!("no chart ink found, using full image");
        return full;
    };

    let x0 = min_x.saturating_sub(config.margin);
    let y0 = min_y.saturating_sub(config.margin);
    let x1 = max_x.saturating_add(config.margin).min(image.width - 1);
    let y1 = max_y.saturating_add(config.margin).min(image.height - 1);

    let region = ChartRegion {
        x: x0,
        y: y0,
        width: x1 - x0 + 1,
        height: y1 - y0 + 1,
    };
    if region.width < MIN_REGION_SIDE || region.height < MIN_REGION_SIDE {
        return full;
    }
    region
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Rgb;

    const BG: Rgb = Rgb::new(18, 30, 52);

    #[test]
    fn no_ink_returns_full_image() {
        let img = RasterImage::filled(64, 48, BG);
        let region = locate_chart_region(&img, &LocatorConfig::default());
        assert_eq!(region, ChartRegion::full(&img));
    }

    #[test]
    fn empty_image_returns_zero_region() {
        let img = RasterImage::new(0, 0, Vec::new());
        let region = locate_chart_region(&img, &LocatorConfig::default());
        assert_eq!(region.width, 0);
        assert_eq!(region.height, 0);
    }

    #[test]
    fn ink_block_is_found_with_margin() {
        let mut img = RasterImage::filled(200, 100, BG);
        img.fill_rect(80, 40, 99, 59, Rgb::new(214, 48, 49));
        let region = locate_chart_region(&img, &LocatorConfig::default());
        // Samples on the stride-4 grid: ink spans x 80..=96, y 40..=56.
        assert_eq!(region.x, 70);
        assert_eq!(region.y, 30);
        assert_eq!(region.right(), 107);
        assert_eq!(region.bottom(), 67);
        assert!(region.fits_within(200, 100));
    }

    #[test]
    fn margin_is_clamped_at_edges() {
        let mut img = RasterImage::filled(50, 50, BG);
        img.fill_rect(0, 0, 3, 3, Rgb::new(5, 5, 5));
        img.fill_rect(48, 48, 49, 49, Rgb::new(5, 5, 5));
        let region = locate_chart_region(&img, &LocatorConfig::default());
        assert_eq!(region.x, 0);
        assert_eq!(region.y, 0);
        assert!(region.fits_within(50, 50));
    }

    #[test]
    fn truncated_buffer_does_not_panic() {
        let img = RasterImage::new(100, 100, vec![250; 40]);
        let region = locate_chart_region(&img, &LocatorConfig::default());
        assert!(region.fits_within(100, 100));
    }
}
