//! Signal extractors — independent, pure functions of the bar series.
//!
//! Each extractor returns a typed report (levels, tiers, counts) that also
//! flattens into plain [`Signal`]s through [`SignalSource`]. Extractors never
//! see each other's output, so the suite runs them concurrently and joins the
//! reports before the context gate.

pub mod confluence;
pub mod patterns;
pub mod price_action;
pub mod regime;
pub mod temporal;
pub mod volatility;
pub mod volume;

pub use confluence::{ConfluenceEngine, ConfluenceReport, Level, LevelKind, VolumeProfile};
pub use patterns::{PatternMatch, PatternMatcher, PatternName, PatternReport};
pub use price_action::{PriceActionDetector, PriceActionEvent, PriceActionKind, PriceActionReport, StrengthTier};
pub use regime::{ManipulationCounts, MarketRegime, MarketReport, RegimeClassifier};
pub use temporal::{TemporalAnalyzer, TemporalReport, TemporalRisk};
pub use volatility::{VolatilityClassifier, VolatilityReport, VolatilityTier};
pub use volume::{VolumeClassifier, VolumeReport, VolumeTrend};

use serde::{Deserialize, Serialize};

use crate::domain::{OhlcBar, Signal};

/// Anything that can be flattened into directional votes.
pub trait SignalSource {
    fn signals(&self) -> Vec<Signal>;
}

/// Trait for signal extractors.
///
/// Implementations must be deterministic and must not retain state between
/// calls: the same bars always yield the same report.
pub trait SignalExtractor: Send + Sync {
    type Report: SignalSource + Send;

    /// Short machine name (e.g. "price_action").
    fn name(&self) -> &str;

    /// Below this many bars the report is neutral or empty.
    fn min_bars(&self) -> usize;

    fn extract(&self, bars: &[OhlcBar]) -> Self::Report;
}

/// The full set of extractors run each cycle.
#[derive(Debug, Clone, Default)]
pub struct ExtractorSuite {
    pub patterns: PatternMatcher,
    pub price_action: PriceActionDetector,
    pub confluence: ConfluenceEngine,
    pub regime: RegimeClassifier,
    pub volatility: VolatilityClassifier,
    pub volume: VolumeClassifier,
    pub temporal: TemporalAnalyzer,
}

/// Joined output of every extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalReports {
    pub patterns: PatternReport,
    pub price_action: PriceActionReport,
    pub confluence: ConfluenceReport,
    pub market: MarketReport,
    pub volatility: VolatilityReport,
    pub volume: VolumeReport,
    pub temporal: TemporalReport,
}

impl ExtractorSuite {
    /// Run all extractors concurrently on the rayon pool.
    ///
    /// Result placement is fixed by the join tree, so scheduling order never
    /// changes the output.
    pub fn run(&self, bars: &[OhlcBar]) -> SignalReports {
        let ((patterns, price_action), ((confluence, market), (volatility, (volume, temporal)))) = rayon::join(
            || {
                rayon::join(
                    || self.patterns.extract(bars),
                    || self.price_action.extract(bars),
                )
            },
            || {
                rayon::join(
                    || rayon::join(|| self.confluence.extract(bars), || self.regime.extract(bars)),
                    || {
                        rayon::join(
                            || self.volatility.extract(bars),
                            || rayon::join(|| self.volume.extract(bars), || self.temporal.extract(bars)),
                        )
                    },
                )
            },
        );
        tracing::debug!(
            bars = bars.len(),
            patterns = patterns.matches.len(),
            events = price_action.events.len(),
            confluence = confluence.score,
            regime = ?market.regime,
            volatility = %volatility.tier,
            "extractors joined"
        );
        SignalReports {
            patterns,
            price_action,
            confluence,
            market,
            volatility,
            volume,
            temporal,
        }
    }

    /// Same as [`run`](Self::run) but on the calling thread only.
    pub fn run_sequential(&self, bars: &[OhlcBar]) -> SignalReports {
        SignalReports {
            patterns: self.patterns.extract(bars),
            price_action: self.price_action.extract(bars),
            confluence: self.confluence.extract(bars),
            market: self.regime.extract(bars),
            volatility: self.volatility.extract(bars),
            volume: self.volume.extract(bars),
            temporal: self.temporal.extract(bars),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn parallel_and_sequential_agree() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + ((i * 13) % 7) as f64 - i as f64 * 0.3).collect();
        let bars = make_bars(&closes);
        let suite = ExtractorSuite::default();
        assert_eq!(suite.run(&bars), suite.run_sequential(&bars));
    }

    #[test]
    fn empty_series_yields_reports() {
        let reports = ExtractorSuite::default().run(&[]);
        assert!(reports.patterns.matches.is_empty());
        assert!(reports.price_action.events.is_empty());
        assert_eq!(reports.market.context_score, 0.0);
        assert!(!reports.volatility.measured);
    }

    #[test]
    fn extractor_names_are_distinct() {
        let suite = ExtractorSuite::default();
        let names = [
            suite.patterns.name(),
            suite.price_action.name(),
            suite.confluence.name(),
            suite.regime.name(),
            suite.volatility.name(),
            suite.volume.name(),
            suite.temporal.name(),
        ];
        let unique: std::collections::HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), names.len());
    }
}
