//! Candle segmenter — column scans to candle geometry.
//!
//! Each column is reduced to its candle run, the contiguous ink stretch with
//! the most body pixels, so horizontal grid lines do not leak into wick bounds.
//! A column opens a candidate when its run contains a body-class pixel.
//! The candidate grows to the right while adjacent columns keep body pixels
//! overlapping its vertical span, up to `max_candle_width`, and the scan then
//! jumps past it so one candle is never detected twice. Geometry is merged
//! across the candidate's columns; confidence comes from the center column.

use tracing::debug;

use super::pixel::{classify_color, classify_vertical, PixelClass};
use crate::config::SegmenterConfig;
use crate::domain::{Candle, ChartRegion, RasterImage};

pub const MAX_CONFIDENCE: f64 = 0.95;
const DENSITY_WEIGHT: f64 = 0.5;
const WICK_AND_BODY_BONUS: f64 = 0.25;
const BODY_FRACTION_BONUS: f64 = 0.2;
const BODY_FRACTION_MIN: f64 = 0.05;
const BODY_FRACTION_MAX: f64 = 0.95;

/// Vertical extent of one column's (or a merged candidate's) elements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Span {
    elements: u32,
    wick: Option<(u32, u32)>,
    body: Option<(u32, u32)>,
}

fn widen(bounds: Option<(u32, u32)>, top: u32, bottom: u32) -> Option<(u32, u32)> {
    Some(match bounds {
        None => (top, bottom),
        Some((t, b)) => (t.min(top), b.max(bottom)),
    })
}

impl Span {
    fn merge(&mut self, other: &Span) {
        self.elements += other.elements;
        if let Some((t, b)) = other.wick {
            self.wick = widen(self.wick, t, b);
        }
        if let Some((t, b)) = other.body {
            self.body = widen(self.body, t, b);
        }
    }

    fn height(&self) -> u32 {
        self.wick.map_or(0, |(t, b)| b - t + 1)
    }
}

/// The column's candle run: the contiguous stretch of non-background pixels
/// holding the most body pixels. Grid lines crossing the column form their
/// own runs and are dropped unless they touch the candle.
fn scan_column(image: &RasterImage, x: u32, y_start: u32, y_end: u32) -> Span {
    let mut best = Span::default();
    let mut best_body = 0;
    let mut run = Span::default();
    let mut run_body = 0;

    for y in y_start..y_end {
        let class = image
            .pixel(x, y)
            .map_or(PixelClass::Background, classify_vertical);
        match class {
            PixelClass::Background => {
                if run_body > best_body {
                    best = run;
                    best_body = run_body;
                }
                run = Span::default();
                run_body = 0;
            }
            PixelClass::Wick => {
                run.elements += 1;
                run.wick = widen(run.wick, y, y);
            }
            PixelClass::Body => {
                run.elements += 1;
                run_body += 1;
                run.wick = widen(run.wick, y, y);
                run.body = widen(run.body, y, y);
            }
        }
    }
    if run_body > best_body {
        best = run;
    }
    best
}

fn overlaps(a: (u32, u32), b: (u32, u32)) -> bool {
    a.0 <= b.1 && b.0 <= a.1
}

/// Detect candles inside `region`, de-duplicated and ordered by x.
pub fn segment_candles(
    image: &RasterImage,
    region: &ChartRegion,
    config: &SegmenterConfig,
) -> Vec<Candle> {
    let x_end = region.right().min(image.width);
    let y_start = region.y.min(image.height);
    let y_end = region.bottom().min(image.height);
    let max_width = config.max_candle_width.max(1);

    let mut candles = Vec::new();
    let mut x = region.x;
    while x < x_end {
        let first = scan_column(image, x, y_start, y_end);
        let Some(first_body) = first.body else {
            x += 1;
            continue;
        };

        let mut merged = first;
        let mut columns = vec![first];
        let mut width = 1;
        while width < max_width && x + width < x_end {
            let next = scan_column(image, x + width, y_start, y_end);
            let keeps_structure = match (next.body, merged.wick) {
                (Some(body), Some(extent)) => overlaps(body, extent) || overlaps(body, first_body),
                _ => false,
            };
            if !keeps_structure {
                break;
            }
            merged.merge(&next);
            columns.push(next);
            width += 1;
        }

        if let Some(candle) = build_candle(image, x, width, &merged, &columns, config) {
            candles.push(candle);
        }
        x += width;
    }

    let detected = candles.len();
    let candles = dedup_and_cap(candles, config);
    debug!(detected, kept = candles.len(), "candle segmentation complete");
    candles
}

fn build_candle(
    image: &RasterImage,
    x_start: u32,
    width: u32,
    merged: &Span,
    columns: &[Span],
    config: &SegmenterConfig,
) -> Option<Candle> {
    let (wick_top, wick_bottom) = merged.wick?;
    let (body_top, body_bottom) = merged.body?;
    let height = merged.height();
    let center_offset = width / 2;
    let center = &columns[center_offset as usize];

    if center.elements.max(merged.elements / width.max(1)) < config.min_element_pixels {
        return None;
    }
    if height < config.min_candle_height {
        return None;
    }

    let x = x_start + center_offset;
    let mid_y = body_top + (body_bottom - body_top) / 2;
    let color = image.pixel(x, mid_y).map(classify_color)?;

    let density = (center.elements as f64 / height as f64).min(1.0);
    let mut confidence = DENSITY_WEIGHT * density;
    let has_wick = wick_top < body_top || wick_bottom > body_bottom;
    if has_wick {
        confidence += WICK_AND_BODY_BONUS;
    }
    let body_fraction = (body_bottom - body_top + 1) as f64 / height as f64;
    if (BODY_FRACTION_MIN..=BODY_FRACTION_MAX).contains(&body_fraction) {
        confidence += BODY_FRACTION_BONUS;
    }

    Some(Candle {
        x,
        width,
        body_top,
        body_bottom,
        wick_top,
        wick_bottom,
        color,
        confidence: confidence.min(MAX_CONFIDENCE),
    })
}

/// Drop any candle closer than `dedup_distance` to a more confident one,
/// then keep the right-most `max_candles` in ascending x order.
fn dedup_and_cap(mut candles: Vec<Candle>, config: &SegmenterConfig) -> Vec<Candle> {
    candles.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.x.cmp(&b.x))
    });

    let mut kept: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        if kept
            .iter()
            .all(|k| k.x.abs_diff(candle.x) >= config.dedup_distance)
        {
            kept.push(candle);
        }
    }

    kept.sort_by_key(|c| c.x);
    if kept.len() > config.max_candles {
        let excess = kept.len() - config.max_candles;
        kept.drain(..excess);
    }
    kept
}
