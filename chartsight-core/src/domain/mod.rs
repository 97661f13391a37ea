//! Domain types for ChartSight.

pub mod bar;
pub mod calibration;
pub mod candle;
pub mod decision;
pub mod raster;
pub mod region;
pub mod signal;

pub use bar::OhlcBar;
pub use calibration::PriceCalibration;
pub use candle::{Candle, CandleColor};
pub use decision::{Component, ComponentKind, Decision, RiskTier};
pub use raster::{RasterImage, Rgb};
pub use region::ChartRegion;
pub use signal::{clamp_unit, Direction, Signal, SignalKind, TradeAction};
