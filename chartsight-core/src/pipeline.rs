//! End-to-end analysis: raster → bars → reports → gate → decision.
//!
//! Stateless between calls. The only carried state is the optional prior
//! bar window the caller passes in, which feeds the context gate when the
//! current capture is too short.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregator::{DecisionAggregator, DecisionContext};
use crate::components::{build_components, pre_vote};
use crate::config::AnalysisConfig;
use crate::domain::{Component, ComponentKind, Decision, OhlcBar, RasterImage};
use crate::extraction::{extract, Extraction};
use crate::fingerprint::AnalysisFingerprint;
use crate::gate::{ContextGate, GateInput, GateVerdict};
use crate::signals::{ExtractorSuite, SignalReports};

/// Per-cycle inputs besides the image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Timestamp assigned to the newest synthesized bar.
    pub as_of: DateTime<Utc>,
    /// Trailing bars carried over from a previous cycle.
    pub prior_window: Option<Vec<OhlcBar>>,
}

impl AnalysisRequest {
    pub fn at(as_of: DateTime<Utc>) -> Self {
        Self {
            as_of,
            prior_window: None,
        }
    }

    pub fn with_prior(mut self, bars: Vec<OhlcBar>) -> Self {
        self.prior_window = Some(bars);
        self
    }
}

/// Everything computed from a bar series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarAnalysis {
    pub reports: SignalReports,
    pub gate: GateVerdict,
    /// One per [`ComponentKind`], in `ComponentKind::ALL` order.
    pub components: Vec<Component>,
    pub decision: Decision,
}

/// Full result of analyzing one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub fingerprint: AnalysisFingerprint,
    pub extraction: Extraction,
    pub result: BarAnalysis,
}

impl Analysis {
    pub fn decision(&self) -> &Decision {
        &self.result.decision
    }

    pub fn bars(&self) -> &[OhlcBar] {
        &self.extraction.bars
    }
}

/// Owns the configured stages so repeated cycles skip re-construction.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: AnalysisConfig,
    suite: ExtractorSuite,
    gate: ContextGate,
    aggregator: DecisionAggregator,
}

impl Pipeline {
    pub fn new(config: AnalysisConfig) -> Self {
        if let Err(e) = config.validate() {
            warn!(error = %e, "analysis config failed validation; continuing with it as given");
        }
        Self {
            suite: ExtractorSuite::default(),
            gate: ContextGate::new(config.gate.clone()),
            aggregator: DecisionAggregator::new(config.aggregator.clone()),
            config,
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyze_image(&self, image: &RasterImage, request: &AnalysisRequest) -> Analysis {
        let fingerprint = AnalysisFingerprint::new(image, &self.config);
        let extraction = extract(image, &self.config, request.as_of);
        let result = self.analyze_bars(&extraction.bars, request.prior_window.as_deref());
        Analysis {
            fingerprint,
            extraction,
            result,
        }
    }

    pub fn analyze_bars(&self, bars: &[OhlcBar], prior: Option<&[OhlcBar]>) -> BarAnalysis {
        let weights = &self.config.weights;
        let reports = self.suite.run(bars);
        let mut components = build_components(&reports, weights);

        let window = self.gate.window(bars, prior);
        let gate = self.gate.evaluate(&GateInput {
            window: &window,
            candidate: pre_vote(&components),
            levels: &reports.confluence.levels,
            confluence_score: reports.confluence.score,
            pattern_confidence: reports.patterns.strongest_directional(),
        });
        components.push(gate.component(weights.get(ComponentKind::ContextGate)));

        let decision = self.aggregator.decide(
            &components,
            &DecisionContext {
                gate: &gate,
                market_context_score: reports.market.context_score,
                volatility: reports.volatility.tier,
                confluence_score: reports.confluence.score,
                temporal_risk_factors: reports.temporal.risk_count(),
            },
        );
        debug!(
            bars = bars.len(),
            gate_score = gate.score,
            accepted = decision.accepted,
            action = %decision.action,
            "cycle analyzed"
        );

        BarAnalysis {
            reports,
            gate,
            components,
            decision,
        }
    }
}

/// One-shot image analysis with the given configuration.
pub fn analyze_image(image: &RasterImage, request: &AnalysisRequest, config: &AnalysisConfig) -> Analysis {
    Pipeline::new(config.clone()).analyze_image(image, request)
}

/// One-shot bar analysis with the given configuration.
pub fn analyze_bars(bars: &[OhlcBar], prior: Option<&[OhlcBar]>, config: &AnalysisConfig) -> BarAnalysis {
    Pipeline::new(config.clone()).analyze_bars(bars, prior)
}
