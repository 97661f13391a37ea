//! Extraction pipeline — pixels to an ordered OHLC bar series.
//!
//! Four stages run strictly in order:
//! 1. `locator` finds the chart-ink rectangle
//! 2. `calibrator` builds the synthetic price mapping
//! 3. `segmenter` scans columns for candle geometry
//! 4. `synthesizer` turns geometry into bars
//!
//! Every stage is total: degenerate input degrades to a default, never an error.

pub mod calibrator;
pub mod locator;
pub mod pixel;
pub mod segmenter;
pub mod synthesizer;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::domain::{Candle, ChartRegion, OhlcBar, PriceCalibration, RasterImage};

pub use calibrator::calibrate;
pub use locator::locate_chart_region;
pub use segmenter::segment_candles;
pub use synthesizer::synthesize_bars;

/// All intermediate products of the extraction stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extraction {
    pub region: ChartRegion,
    pub calibration: PriceCalibration,
    pub candles: Vec<Candle>,
    pub bars: Vec<OhlcBar>,
}

/// Run stages 1–4 on one image.
pub fn extract(image: &RasterImage, config: &AnalysisConfig, as_of: DateTime<Utc>) -> Extraction {
    let region = locate_chart_region(image, &config.locator);
    let calibration = calibrate(&region);
    let candles = segment_candles(image, &region, &config.segmenter);
    let bars = synthesize_bars(&candles, &calibration, as_of, &config.synthesis);
    debug!(
        x = region.x,
        y = region.y,
        width = region.width,
        height = region.height,
        candles = candles.len(),
        bars = bars.len(),
        "extraction complete"
    );
    Extraction {
        region,
        calibration,
        candles,
        bars,
    }
}
