//! ChartSight Core — chart screenshot to an explainable trade decision.
//!
//! This crate contains the whole analysis pipeline:
//! - Domain types (raster, region, calibration, candles, bars, signals, decisions)
//! - Pixel extraction: region locator, price calibrator, candle segmenter, OHLC synthesizer
//! - Independent signal extractors joined concurrently
//! - Context gate over a short trailing window
//! - Weighted decision aggregator with hard vetoes and soft gates
//!
//! Every stage is synchronous, bounded and total: any input produces a
//! structurally valid [`Decision`](domain::Decision).

pub mod aggregator;
pub mod components;
pub mod config;
pub mod domain;
pub mod extraction;
pub mod fingerprint;
pub mod gate;
pub mod indicators;
pub mod pipeline;
pub mod signals;

pub use config::{AnalysisConfig, ComponentWeights, ConfigError};
pub use pipeline::{analyze_bars, analyze_image, Analysis, AnalysisRequest, BarAnalysis, Pipeline};
