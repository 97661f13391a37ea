//! Volume trend and significance from the synthetic volume proxy.

use serde::{Deserialize, Serialize};

use super::{SignalExtractor, SignalSource};
use crate::domain::{OhlcBar, Signal, SignalKind, TradeAction};
use crate::indicators::{average_volume, tail};

const RECENT: usize = 5;
const BASELINE: usize = 15;
const RISING_RATIO: f64 = 1.15;
const FALLING_RATIO: f64 = 0.85;
const SIGNIFICANT_RATIO: f64 = 1.5;
const SHARE_WINDOW: usize = 10;
const DIRECTIONAL_SHARE: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeTrend {
    Rising,
    Flat,
    Falling,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeReport {
    pub trend: VolumeTrend,
    /// Recent mean over baseline mean.
    pub ratio: f64,
    /// Last bar's volume is well above the mean of the bars before it.
    pub significant: bool,
    /// Share of directional volume carried by bullish bars, in `[0, 1]`.
    pub up_share: f64,
}

impl SignalSource for VolumeReport {
    fn signals(&self) -> Vec<Signal> {
        let (name, action, confidence) = if self.up_share >= DIRECTIONAL_SHARE && self.trend != VolumeTrend::Falling {
            let boost = if self.trend == VolumeTrend::Rising { 1.0 } else { 0.8 };
            ("buying_pressure", TradeAction::Buy, self.up_share * boost)
        } else if self.up_share <= 1.0 - DIRECTIONAL_SHARE && self.trend != VolumeTrend::Falling {
            let boost = if self.trend == VolumeTrend::Rising { 1.0 } else { 0.8 };
            ("selling_pressure", TradeAction::Sell, (1.0 - self.up_share) * boost)
        } else {
            ("balanced", TradeAction::Wait, 0.3)
        };
        let mut signal = Signal::new(SignalKind::Volume, name, action, confidence)
            .with_evidence(format!("ratio {:.2}", self.ratio));
        if self.significant {
            signal = signal.with_evidence("significant last bar");
        }
        vec![signal]
    }
}

#[derive(Debug, Clone, Default)]
pub struct VolumeClassifier;

impl SignalExtractor for VolumeClassifier {
    type Report = VolumeReport;

    fn name(&self) -> &str {
        "volume"
    }

    fn min_bars(&self) -> usize {
        RECENT + 1
    }

    fn extract(&self, bars: &[OhlcBar]) -> VolumeReport {
        if bars.len() < self.min_bars() {
            return VolumeReport {
                trend: VolumeTrend::Flat,
                ratio: 1.0,
                significant: false,
                up_share: 0.5,
            };
        }
        let window = tail(bars, RECENT + BASELINE);
        let split = window.len() - RECENT;
        let recent = average_volume(&window[split..]);
        let baseline = average_volume(&window[..split]);
        let ratio = if baseline > 0.0 { recent / baseline } else { 1.0 };
        let trend = if ratio > RISING_RATIO {
            VolumeTrend::Rising
        } else if ratio < FALLING_RATIO {
            VolumeTrend::Falling
        } else {
            VolumeTrend::Flat
        };

        let (earlier, last) = window.split_at(window.len() - 1);
        let earlier_mean = average_volume(earlier);
        let significant = earlier_mean > 0.0 && last[0].volume_proxy >= earlier_mean * SIGNIFICANT_RATIO;

        let (mut up, mut down) = (0.0, 0.0);
        for bar in tail(bars, SHARE_WINDOW) {
            if bar.is_bullish() {
                up += bar.volume_proxy;
            } else if bar.is_bearish() {
                down += bar.volume_proxy;
            }
        }
        let up_share = if up + down > 0.0 { up / (up + down) } else { 0.5 };

        VolumeReport {
            trend,
            ratio,
            significant,
            up_share,
        }
    }
}
