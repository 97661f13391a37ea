//! Remote analyzer collaborator with deterministic local fallback.
//!
//! The remote call is the only blocking, timeout-bound operation in the
//! system. It runs on a helper thread and is awaited with `recv_timeout`.
//! Timeout, error, a missing analyzer or a malformed response all fall back
//! to the local pipeline; the outcome's [`SourceTag`] records which path
//! produced the decision.
//!
//! A timed-out helper thread is detached, not cancelled. Its late result is
//! dropped with the channel.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chartsight_core::domain::{Decision, OhlcBar, RasterImage, TradeAction};
use chartsight_core::{AnalysisConfig, AnalysisRequest, Pipeline};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// ─── Collaborator contract ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    pub image: RasterImage,
    pub timeframe: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAnalysis {
    pub decision: Decision,
    #[serde(default)]
    pub bars: Vec<OhlcBar>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RemoteError {
    #[error("remote analyzer unavailable: {0}")]
    Unavailable(String),
    #[error("remote analyzer timed out after {0:?}")]
    Timeout(Duration),
    #[error("remote analyzer failed: {0}")]
    Failed(String),
}

/// An external service that can analyze a chart image.
pub trait RemoteAnalyzer: Send + Sync {
    fn name(&self) -> &str;

    /// Blocking call; may take arbitrarily long. The service enforces the
    /// deadline, not the implementation.
    fn analyze(&self, request: &RemoteRequest) -> Result<RemoteAnalysis, RemoteError>;
}

// ─── Provenance ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    RemoteUnavailable,
    RemoteTimeout,
    RemoteFailed,
}

impl From<&RemoteError> for FallbackReason {
    fn from(err: &RemoteError) -> Self {
        match err {
            RemoteError::Unavailable(_) => Self::RemoteUnavailable,
            RemoteError::Timeout(_) => Self::RemoteTimeout,
            RemoteError::Failed(_) => Self::RemoteFailed,
        }
    }
}

/// Which path produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", content = "reason", rename_all = "snake_case")]
pub enum SourceTag {
    Ai,
    Fallback(FallbackReason),
}

impl SourceTag {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

impl std::fmt::Display for SourceTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ai => write!(f, "ai"),
            Self::Fallback(FallbackReason::RemoteUnavailable) => write!(f, "fallback (remote unavailable)"),
            Self::Fallback(FallbackReason::RemoteTimeout) => write!(f, "fallback (remote timeout)"),
            Self::Fallback(FallbackReason::RemoteFailed) => write!(f, "fallback (remote failed)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub source: SourceTag,
    pub decision: Decision,
    pub bars: Vec<OhlcBar>,
    /// blake3 of the analyzed raster.
    pub image_fingerprint: String,
}

// ─── Service ────────────────────────────────────────────────────────

/// Runs the remote analyzer under a deadline, or the local pipeline.
#[derive(Clone)]
pub struct AnalysisService {
    remote: Option<Arc<dyn RemoteAnalyzer>>,
    pipeline: Pipeline,
    timeout: Duration,
}

impl std::fmt::Debug for AnalysisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisService")
            .field("remote", &self.remote.as_ref().map(|r| r.name().to_string()))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl AnalysisService {
    /// Service with no remote analyzer; every run is a local fallback.
    pub fn local(config: AnalysisConfig) -> Self {
        Self {
            remote: None,
            pipeline: Pipeline::new(config),
            timeout: Duration::ZERO,
        }
    }

    pub fn with_remote(config: AnalysisConfig, remote: Arc<dyn RemoteAnalyzer>, timeout: Duration) -> Self {
        Self {
            remote: Some(remote),
            pipeline: Pipeline::new(config),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Analyze `image`, preferring the remote analyzer.
    pub fn run(&self, image: &RasterImage, timeframe: &str, request: &AnalysisRequest) -> AnalysisOutcome {
        let Some(remote) = &self.remote else {
            return self.fallback(image, request, FallbackReason::RemoteUnavailable);
        };

        match self.call_remote(remote, image, timeframe) {
            Ok(analysis) => {
                info!(analyzer = remote.name(), action = ?analysis.decision.action, "remote analysis accepted");
                AnalysisOutcome {
                    source: SourceTag::Ai,
                    decision: analysis.decision,
                    bars: analysis.bars,
                    image_fingerprint: image.fingerprint(),
                }
            }
            Err(err) => {
                warn!(analyzer = remote.name(), error = %err, "remote analysis failed; falling back");
                self.fallback(image, request, FallbackReason::from(&err))
            }
        }
    }

    fn call_remote(
        &self,
        remote: &Arc<dyn RemoteAnalyzer>,
        image: &RasterImage,
        timeframe: &str,
    ) -> Result<RemoteAnalysis, RemoteError> {
        let (tx, rx) = mpsc::channel();
        let analyzer = Arc::clone(remote);
        let request = RemoteRequest {
            image: image.clone(),
            timeframe: timeframe.to_string(),
        };
        thread::Builder::new()
            .name("chartsight-remote".into())
            .spawn(move || {
                let _ = tx.send(analyzer.analyze(&request));
            })
            .map_err(|e| RemoteError::Unavailable(format!("spawn remote call: {e}")))?;

        let analysis = match rx.recv_timeout(self.timeout) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => return Err(RemoteError::Timeout(self.timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(RemoteError::Failed("remote call ended without a response".into()))
            }
        };
        validate_remote(&analysis.decision)?;
        Ok(analysis)
    }

    fn fallback(&self, image: &RasterImage, request: &AnalysisRequest, reason: FallbackReason) -> AnalysisOutcome {
        let analysis = self.pipeline.analyze_image(image, request);
        debug!(?reason, bars = analysis.bars().len(), "local pipeline produced fallback decision");
        AnalysisOutcome {
            source: SourceTag::Fallback(reason),
            decision: analysis.result.decision,
            bars: analysis.extraction.bars,
            image_fingerprint: analysis.fingerprint.image,
        }
    }
}

/// A remote decision must satisfy the same shape rules as a local one.
fn validate_remote(decision: &Decision) -> Result<(), RemoteError> {
    let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
    if !in_unit(decision.confidence) {
        return Err(RemoteError::Failed(format!(
            "confidence {} outside [0, 1]",
            decision.confidence
        )));
    }
    if !(decision.quality_score.is_finite() && (0.0..=100.0).contains(&decision.quality_score)) {
        return Err(RemoteError::Failed(format!(
            "quality score {} outside [0, 100]",
            decision.quality_score
        )));
    }
    if !decision.accepted && decision.action != TradeAction::Wait {
        return Err(RemoteError::Failed("rejected decision with a directional action".into()));
    }
    Ok(())
}
