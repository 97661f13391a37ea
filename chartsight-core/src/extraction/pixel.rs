//! Pixel classification thresholds.
//!
//! These constants are empirically tuned against rendered chart screenshots.
//! Changing any of them changes which pixels count as chart ink.

use crate::domain::{CandleColor, Rgb};

/// Max spread between channels for a pixel to read as neutral gray.
pub const GRAY_CHANNEL_SPREAD: u8 = 12;
/// Luma band of grid lines and wicks.
pub const GRAY_LUMA_MIN: f64 = 60.0;
pub const GRAY_LUMA_MAX: f64 = 200.0;
/// Strongest channel must beat the runner-up by this much (candle bodies).
pub const DOMINANCE_MARGIN: u8 = 50;
/// Every channel at or below this is "near black".
pub const NEAR_BLACK_MAX: u8 = 35;
/// Every channel at or above this is "near white".
pub const NEAR_WHITE_MIN: u8 = 230;

/// Body color resolution.
pub const COLOR_CHANNEL_LEAD: i16 = 30;
/// Neutral bodies at or above this luma are white, below it black.
pub const NEUTRAL_LUMA_SPLIT: f64 = 128.0;

/// What a single pixel looks like to the vertical scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelClass {
    Background,
    Wick,
    Body,
}

pub fn is_gray_band(c: Rgb) -> bool {
    let spread = c.max_channel() - c.min_channel();
    let luma = c.luma();
    spread < GRAY_CHANNEL_SPREAD && (GRAY_LUMA_MIN..=GRAY_LUMA_MAX).contains(&luma)
}

pub fn is_channel_dominant(c: Rgb) -> bool {
    c.dominance() >= DOMINANCE_MARGIN
}

pub fn is_extreme_luma(c: Rgb) -> bool {
    c.max_channel() <= NEAR_BLACK_MAX || c.min_channel() >= NEAR_WHITE_MIN
}

/// Grid line, candle body, or near-black/near-white ink.
pub fn is_chart_ink(c: Rgb) -> bool {
    is_gray_band(c) || is_channel_dominant(c) || is_extreme_luma(c)
}

pub fn classify_vertical(c: Rgb) -> PixelClass {
    if is_channel_dominant(c) || is_extreme_luma(c) {
        PixelClass::Body
    } else if is_gray_band(c) {
        PixelClass::Wick
    } else {
        PixelClass::Background
    }
}

/// Resolve a body color from one sample by channel lead, then luma.
pub fn classify_color(c: Rgb) -> CandleColor {
    let (r, g, b) = (c.r as i16, c.g as i16, c.b as i16);
    if g - r >= COLOR_CHANNEL_LEAD && g >= b {
        return CandleColor::Green;
    }
    if r - g >= COLOR_CHANNEL_LEAD && r >= b {
        return CandleColor::Red;
    }
    if c.luma() >= NEUTRAL_LUMA_SPLIT {
        CandleColor::White
    } else {
        CandleColor::Black
    }
}
