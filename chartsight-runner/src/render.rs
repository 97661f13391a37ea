//! Chart rendering — draws a bar series as a candlestick raster.
//!
//! The palette matches what the pixel classifier treats as ink: neutral gray
//! wicks, strongly colored bodies and a dark blue background that is neither
//! gray-band, channel-dominant nor extreme. Re-extracting a rendered series
//! recovers one candle per bar, as long as each bar spans at least three rows.

use chartsight_core::domain::{OhlcBar, RasterImage, Rgb};

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Horizontal slot per candle, in pixels.
    pub candle_spacing: u32,
    pub height: u32,
    /// Blank border on every side.
    pub margin: u32,
    pub background: Rgb,
    pub wick: Rgb,
    pub bullish: Rgb,
    pub bearish: Rgb,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            candle_spacing: 10,
            height: 300,
            margin: 20,
            background: Rgb::new(18, 30, 52),
            wick: Rgb::new(160, 160, 160),
            bullish: Rgb::new(38, 166, 91),
            bearish: Rgb::new(214, 48, 49),
        }
    }
}

impl RenderOptions {
    /// Body width: 60% of the slot, forced odd so the wick sits centered.
    pub fn body_width(&self) -> u32 {
        let w = (self.candle_spacing * 3 / 5).max(1);
        if w % 2 == 0 {
            w + 1
        } else {
            w
        }
    }

    pub fn width_for(&self, bars: usize) -> u32 {
        2 * self.margin + bars as u32 * self.candle_spacing.max(1)
    }
}

/// Render `bars` left to right, oldest first, scaled to fill the plot area.
pub fn render_chart(bars: &[OhlcBar], options: &RenderOptions) -> RasterImage {
    let spacing = options.candle_spacing.max(1);
    let width = options.width_for(bars.len()).max(1);
    let height = options.height.max(2 * options.margin + 1);
    let mut image = RasterImage::filled(width, height, options.background);

    let lowest = bars.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);
    let highest = bars.iter().map(|b| b.high).fold(f64::NEG_INFINITY, f64::max);
    if !(lowest.is_finite() && highest.is_finite()) {
        return image;
    }
    let top = options.margin as f64;
    let plot_height = (height - 2 * options.margin - 1) as f64;
    let span = (highest - lowest).max(f64::EPSILON);
    let row = |price: f64| -> u32 { (top + (highest - price) / span * plot_height).round() as u32 };

    let half_body = options.body_width() / 2;
    for (i, bar) in bars.iter().enumerate() {
        let center = options.margin + i as u32 * spacing + spacing / 2;
        image.fill_rect(center, row(bar.high), center, row(bar.low), options.wick);

        let color = if bar.close >= bar.open {
            options.bullish
        } else {
            options.bearish
        };
        image.fill_rect(
            center.saturating_sub(half_body),
            row(bar.body_top()),
            center + half_body,
            row(bar.body_bottom()),
            color,
        );
    }
    image
}
