//! Capture scheduling — periodic capture → analysis on a background thread.
//!
//! The scheduler owns a named worker thread. Commands reach it over an
//! `mpsc` channel; results come back over another. Each captured image is an
//! independent analysis request; the only state carried between cycles is
//! the trailing bar window handed to the context gate.
//!
//! The capture rate is bounded: every interval, including runtime updates,
//! is clamped to `min_interval`.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chartsight_core::domain::{OhlcBar, RasterImage};
use chartsight_core::AnalysisRequest;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::raster_io::{load_ppm, RasterIoError};
use crate::remote::{AnalysisOutcome, AnalysisService};
use crate::store::{DecisionRecord, DecisionStore};

/// Absolute floor for any capture interval.
pub const MIN_CAPTURE_INTERVAL: Duration = Duration::from_millis(10);

// ─── Capture collaborator ───────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture decode: {0}")]
    Raster(#[from] RasterIoError),
    #[error("capture source failed: {0}")]
    Source(String),
}

/// Supplies chart images. `Ok(None)` means "nothing new this tick".
pub trait CaptureSource: Send {
    fn name(&self) -> &str;
    fn capture(&mut self) -> Result<Option<RasterImage>, CaptureError>;
}

/// Replays the `.ppm` files of a directory in file-name order.
#[derive(Debug, Clone)]
pub struct DirectoryCapture {
    files: Vec<PathBuf>,
    next: usize,
    looping: bool,
}

impl DirectoryCapture {
    pub fn new(dir: &Path) -> Result<Self, CaptureError> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("ppm")))
            .collect();
        files.sort();
        Ok(Self {
            files,
            next: 0,
            looping: false,
        })
    }

    /// Start over from the first file once the directory is exhausted.
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl CaptureSource for DirectoryCapture {
    fn name(&self) -> &str {
        "directory"
    }

    fn capture(&mut self) -> Result<Option<RasterImage>, CaptureError> {
        if self.next >= self.files.len() {
            if !self.looping || self.files.is_empty() {
                return Ok(None);
            }
            self.next = 0;
        }
        let path = &self.files[self.next];
        self.next += 1;
        debug!(path = %path.display(), "replaying capture");
        Ok(Some(load_ppm(path)?))
    }
}

// ─── Scheduler ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub min_interval: Duration,
    pub timeframe: String,
    /// Most trailing bars carried into the next cycle.
    pub carry_bars: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            min_interval: Duration::from_secs(5),
            timeframe: "1m".into(),
            carry_bars: 30,
        }
    }
}

impl SchedulerConfig {
    fn floor(&self) -> Duration {
        self.min_interval.max(MIN_CAPTURE_INTERVAL)
    }

    fn clamp(&self, interval: Duration) -> Duration {
        interval.max(self.floor())
    }
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("spawn scheduler thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// One scheduler tick's result.
#[derive(Debug, Clone, PartialEq)]
pub enum ScheduledResult {
    Analyzed {
        sequence: u64,
        captured_at: DateTime<Utc>,
        outcome: Box<AnalysisOutcome>,
        record_id: Option<String>,
    },
    CaptureFailed {
        sequence: u64,
        error: String,
    },
}

impl ScheduledResult {
    pub fn sequence(&self) -> u64 {
        match self {
            Self::Analyzed { sequence, .. } | Self::CaptureFailed { sequence, .. } => *sequence,
        }
    }
}

enum SchedulerCommand {
    SetInterval(Duration),
    Stop,
}

pub struct CaptureScheduler {
    commands: Sender<SchedulerCommand>,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
    config: SchedulerConfig,
}

impl CaptureScheduler {
    /// Spawn the capture loop. The first capture happens immediately.
    pub fn start<S>(
        source: S,
        service: AnalysisService,
        store: Option<Box<dyn DecisionStore>>,
        mut config: SchedulerConfig,
    ) -> Result<(Self, Receiver<ScheduledResult>), SchedulerError>
    where
        S: CaptureSource + 'static,
    {
        config.interval = config.clamp(config.interval);
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();
        let running = Arc::new(AtomicBool::new(true));

        let worker = Worker {
            source,
            service,
            store,
            config: config.clone(),
            running: Arc::clone(&running),
            commands: cmd_rx,
            results: result_tx,
        };
        let handle = thread::Builder::new()
            .name("chartsight-capture".into())
            .spawn(move || worker.run())?;

        info!(interval = ?config.interval, "capture scheduler started");
        Ok((
            Self {
                commands: cmd_tx,
                running,
                handle: Some(handle),
                config,
            },
            result_rx,
        ))
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn interval(&self) -> Duration {
        self.config.interval
    }

    /// Change the interval; returns the value actually applied.
    pub fn update_interval(&mut self, interval: Duration) -> Duration {
        let applied = self.config.clamp(interval);
        self.config.interval = applied;
        if self.commands.send(SchedulerCommand::SetInterval(applied)).is_err() {
            debug!("scheduler already stopped; interval update ignored");
        }
        applied
    }

    /// Stop the loop and join the worker. Idempotent.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        let _ = self.commands.send(SchedulerCommand::Stop);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("capture scheduler thread panicked");
            }
            info!("capture scheduler stopped");
        }
    }
}

impl Drop for CaptureScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

struct Worker<S> {
    source: S,
    service: AnalysisService,
    store: Option<Box<dyn DecisionStore>>,
    config: SchedulerConfig,
    running: Arc<AtomicBool>,
    commands: Receiver<SchedulerCommand>,
    results: Sender<ScheduledResult>,
}

impl<S: CaptureSource> Worker<S> {
    fn run(mut self) {
        let mut interval = self.config.interval;
        let mut sequence = 0u64;
        let mut carried: Option<Vec<OhlcBar>> = None;

        'outer: while self.running.load(Ordering::Relaxed) {
            let started = Instant::now();
            if let Some(result) = self.tick(sequence, &mut carried) {
                if self.results.send(result).is_err() {
                    debug!("result receiver dropped; stopping scheduler");
                    break;
                }
                sequence += 1;
            }

            loop {
                let remaining = interval.saturating_sub(started.elapsed());
                if remaining.is_zero() {
                    break;
                }
                match self.commands.recv_timeout(remaining) {
                    Ok(SchedulerCommand::SetInterval(d)) => {
                        debug!(interval = ?d, "capture interval updated");
                        interval = d;
                    }
                    Ok(SchedulerCommand::Stop) | Err(RecvTimeoutError::Disconnected) => break 'outer,
                    Err(RecvTimeoutError::Timeout) => break,
                }
            }
        }
        self.running.store(false, Ordering::Relaxed);
    }

    fn tick(&mut self, sequence: u64, carried: &mut Option<Vec<OhlcBar>>) -> Option<ScheduledResult> {
        let image = match self.source.capture() {
            Ok(Some(image)) => image,
            Ok(None) => {
                debug!(source = self.source.name(), "no capture this tick");
                return None;
            }
            Err(e) => {
                warn!(source = self.source.name(), error = %e, "capture failed");
                return Some(ScheduledResult::CaptureFailed {
                    sequence,
                    error: e.to_string(),
                });
            }
        };

        let captured_at = Utc::now();
        let mut request = AnalysisRequest::at(captured_at);
        if let Some(prior) = carried.take() {
            request = request.with_prior(prior);
        }
        let outcome = self.service.run(&image, &self.config.timeframe, &request);

        let keep = outcome.bars.len().min(self.config.carry_bars);
        if keep > 0 {
            *carried = Some(outcome.bars[outcome.bars.len() - keep..].to_vec());
        }

        let record_id = self.store.as_ref().and_then(|store| {
            store.save(&DecisionRecord::from_outcome(&outcome, &self.config.timeframe, captured_at))
        });
        info!(
            sequence,
            source = %outcome.source,
            action = ?outcome.decision.action,
            accepted = outcome.decision.accepted,
            "cycle complete"
        );
        Some(ScheduledResult::Analyzed {
            sequence,
            captured_at,
            outcome: Box::new(outcome),
            record_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chartsight_core::domain::Rgb;
    use chartsight_core::AnalysisConfig;

    // ── Helpers ──

    struct Counting {
        frames: usize,
        produced: usize,
    }

    impl CaptureSource for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn capture(&mut self) -> Result<Option<RasterImage>, CaptureError> {
            if self.produced >= self.frames {
                return Ok(None);
            }
            self.produced += 1;
            Ok(Some(RasterImage::filled(32, 32, Rgb::new(18, 30, 52))))
        }
    }

    struct Failing;

    impl CaptureSource for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn capture(&mut self) -> Result<Option<RasterImage>, CaptureError> {
            Err(CaptureError::Source("screen locked".into()))
        }
    }

    fn fast_config() -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_millis(20),
            min_interval: Duration::from_millis(20),
            ..SchedulerConfig::default()
        }
    }

    fn service() -> AnalysisService {
        AnalysisService::local(AnalysisConfig::default())
    }

    // ── Tests ──

    #[test]
    fn delivers_results_in_sequence() {
        let source = Counting { frames: 3, produced: 0 };
        let (mut scheduler, rx) = CaptureScheduler::start(source, service(), None, fast_config()).unwrap();

        let results: Vec<ScheduledResult> = (0..3)
            .map(|_| rx.recv_timeout(Duration::from_secs(5)).unwrap())
            .collect();
        scheduler.stop();

        let sequences: Vec<u64> = results.iter().map(ScheduledResult::sequence).collect();
        assert_eq!(sequences, [0, 1, 2]);
        for r in &results {
            assert!(matches!(r, ScheduledResult::Analyzed { outcome, .. } if outcome.source.is_fallback()));
        }
    }

    #[test]
    fn capture_errors_are_reported_not_fatal() {
        let (mut scheduler, rx) = CaptureScheduler::start(Failing, service(), None, fast_config()).unwrap();
        let first = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        scheduler.stop();
        assert!(matches!(first, ScheduledResult::CaptureFailed { sequence: 0, ref error } if error.contains("screen locked")));
        assert_eq!(second.sequence(), 1);
    }

    #[test]
    fn interval_is_clamped_to_floor() {
        let source = Counting { frames: 0, produced: 0 };
        let config = SchedulerConfig {
            interval: Duration::from_millis(1),
            min_interval: Duration::from_millis(50),
            ..SchedulerConfig::default()
        };
        let (mut scheduler, _rx) = CaptureScheduler::start(source, service(), None, config).unwrap();
        assert_eq!(scheduler.interval(), Duration::from_millis(50));
        assert_eq!(scheduler.update_interval(Duration::ZERO), Duration::from_millis(50));
        assert_eq!(scheduler.update_interval(Duration::from_secs(2)), Duration::from_secs(2));
        scheduler.stop();
    }

    #[test]
    fn stop_is_prompt_and_idempotent() {
        let source = Counting { frames: 1, produced: 0 };
        let config = SchedulerConfig {
            interval: Duration::from_secs(60),
            min_interval: Duration::from_secs(60),
            ..SchedulerConfig::default()
        };
        let (mut scheduler, rx) = CaptureScheduler::start(source, service(), None, config).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let started = Instant::now();
        scheduler.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(!scheduler.is_running());
        scheduler.stop();
    }

    #[test]
    fn dropping_receiver_ends_loop() {
        let source = Counting { frames: 100, produced: 0 };
        let (scheduler, rx) = CaptureScheduler::start(source, service(), None, fast_config()).unwrap();
        drop(rx);
        let deadline = Instant::now() + Duration::from_secs(5);
        while scheduler.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        assert!(!scheduler.is_running());
    }

    #[test]
    fn directory_capture_replays_sorted_ppm_files() {
        use crate::raster_io::save_ppm;
        let tmp = tempfile::TempDir::new().unwrap();
        save_ppm(&RasterImage::filled(2, 2, Rgb::new(1, 1, 1)), &tmp.path().join("b.ppm")).unwrap();
        save_ppm(&RasterImage::filled(3, 3, Rgb::new(2, 2, 2)), &tmp.path().join("a.ppm")).unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let mut capture = DirectoryCapture::new(tmp.path()).unwrap();
        assert_eq!(capture.len(), 2);
        assert_eq!(capture.capture().unwrap().unwrap().width, 3);
        assert_eq!(capture.capture().unwrap().unwrap().width, 2);
        assert!(capture.capture().unwrap().is_none());

        let mut looping = DirectoryCapture::new(tmp.path()).unwrap().looping(true);
        for _ in 0..2 {
            looping.capture().unwrap();
        }
        assert_eq!(looping.capture().unwrap().unwrap().width, 3);
    }
}
