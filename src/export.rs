// src/export.rs
use crate::scoring::SessionReport;
use crate::session::{LiveState, Phase};
use anyhow::{Context, Result};
use chrono::Local;
use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize)]
struct LiveRecord {
    elapsed_ms: u64,
    frame: u64,
    phase: Phase,
    feedback: String,
    calibrated: bool,
    countdown_remaining: u32,
    face_within_guide: bool,
    scale_factor: f64,

    hand_a_visible: bool,
    hand_a_speed: f64,
    hand_a_erratic_rate: f64,

    hand_b_visible: bool,
    hand_b_speed: f64,
    hand_b_erratic_rate: f64,
}

/// Collects live-state samples during a session and writes them, together
/// with the final report, into a per-session directory.
pub struct ReportExporter {
    output_dir: PathBuf,
    session_name: String,
    samples: Vec<LiveRecord>,
}

impl ReportExporter {
    pub fn new(output_dir: impl AsRef<Path>, session_name: Option<String>) -> Self {
        let session_name = session_name.unwrap_or_else(|| {
            format!("session_{}", Local::now().format("%Y%m%d_%H%M%S"))
        });

        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            session_name,
            samples: Vec::new(),
        }
    }

    pub fn default_output_dir() -> PathBuf {
        directories::UserDirs::new()
            .and_then(|dirs| dirs.document_dir().map(|p| p.join("GestureCoach")))
            .unwrap_or_else(|| PathBuf::from("./output"))
    }

    pub fn session_dir(&self) -> PathBuf {
        self.output_dir.join(&self.session_name)
    }

    pub fn add_sample(&mut self, state: &LiveState, elapsed_ms: u64) {
        let [a, b] = state.slots;
        self.samples.push(LiveRecord {
            elapsed_ms,
            frame: state.frames_processed,
            phase: state.phase,
            feedback: state.feedback.to_string(),
            calibrated: state.calibrated,
            countdown_remaining: state.countdown_remaining,
            face_within_guide: state.face_within_guide,
            scale_factor: state.scale_factor,
            hand_a_visible: a.visible,
            hand_a_speed: a.speed,
            hand_a_erratic_rate: a.erratic_rate,
            hand_b_visible: b.visible,
            hand_b_speed: b.speed,
            hand_b_erratic_rate: b.erratic_rate,
        });
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn export_csv(&self) -> Result<PathBuf> {
        let csv_path = self.session_dir().join("live_state.csv");
        if let Some(parent) = csv_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let file = File::create(&csv_path)
            .with_context(|| format!("creating {}", csv_path.display()))?;
        let mut writer = Writer::from_writer(file);
        for record in &self.samples {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(csv_path)
    }

    pub fn write_report(&self, report: &SessionReport) -> Result<PathBuf> {
        let report_path = self.session_dir().join("report.json");
        if let Some(parent) = report_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&report_path, json)
            .with_context(|| format!("writing {}", report_path.display()))?;
        Ok(report_path)
    }
}
