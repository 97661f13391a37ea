//! Chartsight CLI — analyze chart screenshots, render synthetic charts.
//!
//! Commands:
//! - `analyze` — run the pipeline on a PPM screenshot or a CSV bar file
//! - `render` — draw a bar series (CSV or seeded synthetic) as a PPM chart
//! - `demo` — synthetic bars → rendered chart → full image analysis
//! - `watch` — replay a directory of PPM captures through the scheduler

use std::path::{Path, PathBuf};
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use chartsight_core::domain::{Decision, OhlcBar};
use chartsight_core::{analyze_bars, AnalysisRequest, BarAnalysis, Pipeline};
use chartsight_runner::{
    load_bars, load_ppm, render_chart, save_bars, save_ppm, synthetic_bars_with_drift,
    AnalysisService, CaptureScheduler, DecisionStore, DirectoryCapture, JsonlDecisionStore,
    RenderOptions, RunnerConfig, ScheduledResult, SchedulerConfig,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "chartsight",
    about = "Chartsight — candlestick chart screenshot to trade decision"
)]
struct Cli {
    /// Runner config (TOML). Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a chart screenshot (PPM) or a bar series (CSV).
    Analyze {
        /// Binary PPM (P6) screenshot.
        #[arg(long, conflicts_with = "bars", required_unless_present = "bars")]
        image: Option<PathBuf>,

        /// CSV bar series; skips pixel extraction.
        #[arg(long)]
        bars: Option<PathBuf>,

        /// CSV of trailing bars from a previous cycle.
        #[arg(long)]
        prior: Option<PathBuf>,

        /// Write the extracted bar series to this CSV.
        #[arg(long)]
        bars_out: Option<PathBuf>,

        /// Print the full result as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Render a bar series as a PPM chart.
    Render {
        /// Output PPM path.
        #[arg(long)]
        out: PathBuf,

        /// CSV bar series to draw. Without it, a seeded synthetic series is used.
        #[arg(long)]
        bars: Option<PathBuf>,

        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 60)]
        count: usize,

        /// Per-bar drift added to the synthetic random walk.
        #[arg(long, default_value_t = 0.0)]
        drift: f64,
    },
    /// Render a synthetic chart and analyze it end to end.
    Demo {
        #[arg(long, default_value_t = 42)]
        seed: u64,

        #[arg(long, default_value_t = 60)]
        count: usize,

        #[arg(long, default_value_t = 0.0)]
        drift: f64,

        /// Also save the rendered chart.
        #[arg(long)]
        save: Option<PathBuf>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Replay a directory of PPM captures through the capture scheduler.
    Watch {
        /// Directory of `.ppm` captures, replayed in file-name order.
        dir: PathBuf,

        /// Capture interval override, in milliseconds. Clamped to the
        /// configured `capture.min_interval_secs`.
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Restart from the first capture once the directory is exhausted.
        #[arg(long = "loop", default_value_t = false)]
        looping: bool,

        /// Stop after this many cycles.
        #[arg(long)]
        max_cycles: Option<u64>,

        /// Append decisions to the configured JSONL store.
        #[arg(long, default_value_t = false)]
        persist: bool,

        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Analyze {
            image,
            bars,
            prior,
            bars_out,
            json,
        } => run_analyze(&config, image, bars, prior, bars_out, json),
        Commands::Render {
            out,
            bars,
            seed,
            count,
            drift,
        } => run_render(&out, bars, seed, count, drift),
        Commands::Demo {
            seed,
            count,
            drift,
            save,
            json,
        } => run_demo(&config, seed, count, drift, save, json),
        Commands::Watch {
            dir,
            interval_ms,
            looping,
            max_cycles,
            persist,
            json,
        } => run_watch(&config, &dir, interval_ms, looping, max_cycles, persist, json),
    }
}

fn load_config(path: Option<&Path>) -> Result<RunnerConfig> {
    match path {
        Some(p) => {
            let config = RunnerConfig::from_file(p).with_context(|| format!("loading {}", p.display()))?;
            info!(path = %p.display(), "config loaded");
            Ok(config)
        }
        None => Ok(RunnerConfig::default()),
    }
}

fn run_analyze(
    config: &RunnerConfig,
    image: Option<PathBuf>,
    bars: Option<PathBuf>,
    prior: Option<PathBuf>,
    bars_out: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let prior = prior.as_deref().map(load_bars).transpose()?;

    let (result, series) = match (image, bars) {
        (Some(path), _) => {
            let raster = load_ppm(&path).with_context(|| format!("reading {}", path.display()))?;
            let mut request = AnalysisRequest::at(Utc::now());
            if let Some(p) = prior {
                request = request.with_prior(p);
            }
            let analysis = Pipeline::new(config.analysis.clone()).analyze_image(&raster, &request);
            println!("Image:          {} ({})", path.display(), analysis.fingerprint.short_id());
            (analysis.result, analysis.extraction.bars)
        }
        (None, Some(path)) => {
            let series = load_bars(&path).with_context(|| format!("reading {}", path.display()))?;
            let result = analyze_bars(&series, prior.as_deref(), &config.analysis);
            (result, series)
        }
        (None, None) => bail!("pass --image or --bars"),
    };

    if let Some(out) = bars_out {
        save_bars(&series, &out)?;
        println!("Bars written to: {}", out.display());
    }
    report(&result, &series, json)
}

fn run_render(out: &Path, bars: Option<PathBuf>, seed: u64, count: usize, drift: f64) -> Result<()> {
    let series = match bars {
        Some(path) => load_bars(&path)?,
        None => synthetic_bars_with_drift(seed, count, drift),
    };
    if series.is_empty() {
        bail!("nothing to render: the bar series is empty");
    }
    let image = render_chart(&series, &RenderOptions::default());
    save_ppm(&image, out)?;
    println!(
        "Rendered {} bars ({}x{}) to {}",
        series.len(),
        image.width,
        image.height,
        out.display()
    );
    Ok(())
}

fn run_demo(
    config: &RunnerConfig,
    seed: u64,
    count: usize,
    drift: f64,
    save: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let series = synthetic_bars_with_drift(seed, count, drift);
    let image = render_chart(&series, &RenderOptions::default());
    if let Some(path) = save {
        save_ppm(&image, &path)?;
        println!("Chart saved to: {}", path.display());
    }
    let analysis = Pipeline::new(config.analysis.clone()).analyze_image(&image, &AnalysisRequest::at(Utc::now()));
    println!(
        "Demo:           seed {seed}, {count} bars drawn, {} extracted",
        analysis.bars().len()
    );
    report(&analysis.result, &analysis.extraction.bars, json)
}

#[allow(clippy::too_many_arguments)]
fn run_watch(
    config: &RunnerConfig,
    dir: &Path,
    interval_ms: Option<u64>,
    looping: bool,
    max_cycles: Option<u64>,
    persist: bool,
    json: bool,
) -> Result<()> {
    let source = DirectoryCapture::new(dir)
        .with_context(|| format!("opening {}", dir.display()))?
        .looping(looping);
    if source.is_empty() {
        bail!("no .ppm captures in {}", dir.display());
    }

    let scheduler_config = SchedulerConfig {
        interval: interval_ms
            .map(Duration::from_millis)
            .unwrap_or(Duration::from_secs(config.capture.interval_secs)),
        min_interval: Duration::from_secs(config.capture.min_interval_secs),
        timeframe: config.remote.timeframe.clone(),
        ..SchedulerConfig::default()
    };
    let idle_limit = scheduler_config.interval * 3 + Duration::from_secs(1);
    let store: Option<Box<dyn DecisionStore>> = persist
        .then(|| Box::new(JsonlDecisionStore::new(config.store.path.clone())) as Box<dyn DecisionStore>);

    let service = AnalysisService::local(config.analysis.clone());
    let (mut scheduler, rx) = CaptureScheduler::start(source, service, store, scheduler_config)?;

    let mut cycles = 0u64;
    loop {
        match rx.recv_timeout(idle_limit) {
            Ok(ScheduledResult::Analyzed {
                sequence,
                outcome,
                record_id,
                ..
            }) => {
                if json {
                    println!("{}", serde_json::to_string(&outcome)?);
                } else {
                    println!(
                        "#{sequence:<4} {:<32} {}",
                        outcome.source.to_string(),
                        decision_line(&outcome.decision)
                    );
                    if let Some(id) = record_id {
                        println!("      saved {}", &id[..16.min(id.len())]);
                    }
                }
                cycles += 1;
            }
            Ok(ScheduledResult::CaptureFailed { sequence, error }) => {
                eprintln!("#{sequence:<4} capture failed: {error}");
                cycles += 1;
            }
            Err(RecvTimeoutError::Timeout) if looping => continue,
            Err(_) => break,
        }
        if max_cycles.is_some_and(|max| cycles >= max) {
            break;
        }
    }
    scheduler.stop();
    println!("Watched {cycles} cycles");
    Ok(())
}

// ─── Output ─────────────────────────────────────────────────────────

fn decision_line(d: &Decision) -> String {
    if d.accepted {
        format!(
            "{} (confidence {:.2}, quality {:.0}, risk {})",
            d.action, d.confidence, d.quality_score, d.risk_tier
        )
    } else {
        format!("rejected: {}", d.rejection_reasons.join("; "))
    }
}

fn report(result: &BarAnalysis, bars: &[OhlcBar], json: bool) -> Result<()> {
    if json {
        let payload = serde_json::json!({
            "decision": result.decision,
            "gate": result.gate,
            "components": result.components,
            "bars": bars,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let d = &result.decision;
    println!("Bars:           {}", bars.len());
    println!();
    println!("=== Context Gate ===");
    println!("Score:          {:.0}", result.gate.score);
    println!("Recommendation: {}", result.gate.recommendation);
    println!("Trend:          {:?}", result.gate.trend);
    for factor in &result.gate.factors {
        println!("  {:<28}{:+}", factor.name, factor.points);
    }
    println!();
    println!("--- Components ---");
    for c in &result.components {
        let marker = if c.is_valid { ' ' } else { '-' };
        println!(
            "{marker} {:<16}{:<6}{:.2} (w {:.2})",
            c.name,
            c.resolved_action.to_string(),
            c.confidence,
            c.weight
        );
    }
    println!();
    println!("=== Decision ===");
    println!("Accepted:       {}", d.accepted);
    println!("Action:         {}", d.action);
    println!("Confidence:     {:.2}", d.confidence);
    println!("Quality:        {:.0}", d.quality_score);
    println!("Risk:           {}", d.risk_tier);
    for r in &d.supporting_reasons {
        println!("  + {r}");
    }
    for r in &d.rejection_reasons {
        println!("  - {r}");
    }
    Ok(())
}
