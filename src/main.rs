// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use gesture_coach::export::ReportExporter;
use gesture_coach::sources::{ReplaySource, SimulatedSource};
use gesture_coach::{
    start_session, DetectionSource, EngineConfig, SessionOutcome, SessionReport,
};
use std::path::PathBuf;
use tokio::time::Instant;
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "gesture_coach")]
#[command(about = "Score hand-gesture quality from a stream of hand and face landmarks")]
struct Args {
    /// Recorded keypoint stream (JSON lines). Uses the simulator when omitted
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Engine configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for report.json and live_state.csv
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Override the calibration countdown, in time units
    #[arg(long)]
    calibration: Option<u32>,

    /// Override the recording duration, in time units
    #[arg(long)]
    duration: Option<u32>,

    /// Simulator frame rate
    #[arg(long, default_value = "30")]
    fps: u32,

    /// Skip writing files
    #[arg(long)]
    no_export: bool,

    /// Log per-frame details
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let mut config = match &args.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };
    if let Some(units) = args.calibration {
        config.session.calibration_units = units;
    }
    if let Some(units) = args.duration {
        config.session.recording_units = units;
    }
    config.validate()?;

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(ReportExporter::default_output_dir);
    let exporter = ReportExporter::new(output_dir, None);

    match &args.input {
        Some(path) => run(config, ReplaySource::from_path(path), exporter, args.no_export).await,
        None => {
            info!("No recording given, using simulated detections at {} fps", args.fps);
            run(config, SimulatedSource::new(args.fps), exporter, args.no_export).await
        }
    }
}

async fn run<S>(
    config: EngineConfig,
    source: S,
    mut exporter: ReportExporter,
    no_export: bool,
) -> Result<()>
where
    S: DetectionSource + 'static,
{
    let handle = start_session(config, source)
        .await
        .context("session failed to start")?;

    let canceller = handle.canceller();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling session");
            canceller.cancel();
        }
    });

    let mut live = handle.live();
    let started = Instant::now();
    let recorder = tokio::spawn(async move {
        let mut last_label = None;
        let mut last_countdown = None;
        while live.changed().await.is_ok() {
            let state = live.borrow_and_update().clone();
            if !state.calibrated && last_countdown != Some(state.countdown_remaining) {
                info!("Calibrating... {}", state.countdown_remaining);
                last_countdown = Some(state.countdown_remaining);
            }
            if state.calibrated && last_label != Some(state.feedback) {
                info!(
                    "Movement: {} (A {:.0} px/s, B {:.0} px/s)",
                    state.feedback, state.slots[0].speed, state.slots[1].speed
                );
                last_label = Some(state.feedback);
            }
            exporter.add_sample(&state, started.elapsed().as_millis() as u64);
        }
        exporter
    });

    let outcome = handle.wait().await?;
    let exporter = recorder.await.context("live-state recorder failed")?;

    match outcome {
        SessionOutcome::Cancelled => {
            println!("Session cancelled, no report produced.");
        }
        SessionOutcome::Completed(report) => {
            print_report(&report);
            if !no_export {
                let report_path = exporter.write_report(&report)?;
                let csv_path = exporter.export_csv()?;
                println!("\nReport: {}", report_path.display());
                println!("Live log ({} samples): {}", exporter.sample_count(), csv_path.display());
            }
        }
    }

    Ok(())
}

fn print_report(report: &SessionReport) {
    println!("\n=== Gesture Report ===");
    match report.overall_score {
        Some(score) => println!("Overall score: {:.1}/10", score),
        None => println!("Overall score: no data"),
    }

    for hand in &report.hands {
        println!(
            "{}: score {:.1} | distance {:.0} px | speed {:.0} px/s | erratic {:.2} turns/s",
            hand.label, hand.score, hand.distance, hand.speed, hand.erratic_rate
        );
    }

    println!("\nTips:");
    for tip in &report.tips {
        println!("  - {}", tip);
    }
}
