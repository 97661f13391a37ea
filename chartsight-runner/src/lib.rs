//! Chartsight Runner — everything around the pure analysis core.
//!
//! This crate builds on `chartsight-core` to provide:
//! - TOML configuration loading and validation
//! - Remote-analyzer collaborator with timeout and deterministic local fallback
//! - Capture scheduling on a background thread, delivering over a channel
//! - JSONL decision persistence with content-addressed record ids
//! - PPM raster I/O, CSV bar I/O
//! - Synthetic chart rendering and seeded synthetic bar generation

pub mod bars_io;
pub mod config;
pub mod raster_io;
pub mod remote;
pub mod render;
pub mod scheduler;
pub mod store;
pub mod synthetic;

pub use bars_io::{load_bars, read_bars, save_bars, write_bars, BarFileError};
pub use config::{CaptureSettings, ConfigError, RemoteSettings, RunnerConfig, StoreSettings};
pub use raster_io::{load_ppm, read_ppm, save_ppm, write_ppm, RasterIoError};
pub use remote::{
    AnalysisOutcome, AnalysisService, FallbackReason, RemoteAnalysis, RemoteAnalyzer, RemoteError,
    RemoteRequest, SourceTag,
};
pub use render::{render_chart, RenderOptions};
pub use scheduler::{
    CaptureError, CaptureScheduler, CaptureSource, DirectoryCapture, ScheduledResult,
    SchedulerConfig, SchedulerError,
};
pub use store::{DecisionRecord, DecisionStore, JsonlDecisionStore, RecordId, StoreError, StoredDecision};
pub use synthetic::{synthetic_bars, synthetic_bars_with_drift};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<RunnerConfig>();
        assert_sync::<RunnerConfig>();
        assert_send::<SchedulerConfig>();
        assert_sync::<SchedulerConfig>();
    }

    #[test]
    fn service_is_send_sync() {
        assert_send::<AnalysisService>();
        assert_sync::<AnalysisService>();
    }

    #[test]
    fn outcome_types_are_send_sync() {
        assert_send::<AnalysisOutcome>();
        assert_sync::<AnalysisOutcome>();
        assert_send::<ScheduledResult>();
        assert_sync::<ScheduledResult>();
    }

    #[test]
    fn store_is_send_sync() {
        assert_send::<JsonlDecisionStore>();
        assert_sync::<JsonlDecisionStore>();
        assert_send::<DecisionRecord>();
        assert_sync::<DecisionRecord>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<ConfigError>();
        assert_sync::<ConfigError>();
        assert_send::<RemoteError>();
        assert_sync::<RemoteError>();
        assert_send::<StoreError>();
        assert_sync::<StoreError>();
        assert_send::<RasterIoError>();
        assert_sync::<RasterIoError>();
    }
}
