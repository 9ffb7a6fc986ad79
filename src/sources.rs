// src/sources.rs
//! Detection sources: recorded keypoint streams and a synthetic simulator.

use crate::driver::DetectionSource;
use crate::error::{EngineError, Result};
use crate::keypoints::{synthetic_hand, FaceDetection, KeypointFrame};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tracing::info;

/// Parse a JSON-lines keypoint recording. Blank lines are skipped.
pub fn parse_recording(content: &str) -> Result<Vec<KeypointFrame>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str::<KeypointFrame>(line).map_err(|e| EngineError::Recording {
                line: i + 1,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Plays back recorded frames, paced by their `t_ms` stamps.
pub struct ReplaySource {
    path: Option<PathBuf>,
    frames: VecDeque<KeypointFrame>,
    started: Option<Instant>,
    last_t_ms: Option<u64>,
    paced: bool,
}

impl ReplaySource {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            frames: VecDeque::new(),
            started: None,
            last_t_ms: None,
            paced: true,
        }
    }

    pub fn from_frames(frames: Vec<KeypointFrame>) -> Self {
        Self {
            path: None,
            frames: frames.into(),
            started: None,
            last_t_ms: None,
            paced: true,
        }
    }

    /// Deliver frames as fast as they are requested.
    pub fn unpaced(mut self) -> Self {
        self.paced = false;
        self
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl DetectionSource for ReplaySource {
    async fn open(&mut self) -> Result<()> {
        if let Some(path) = &self.path {
            let content = tokio::fs::read_to_string(path).await.map_err(|e| {
                EngineError::SourceUnavailable(format!("{}: {}", path.display(), e))
            })?;
            self.frames = parse_recording(&content)?.into();
            info!("Loaded {} frames from {}", self.frames.len(), path.display());
        }
        self.started = Some(Instant::now());
        Ok(())
    }

    async fn next_frame(&mut self, want_face: bool) -> Result<Option<KeypointFrame>> {
        let Some(t_ms) = self.frames.front().map(|f| f.t_ms) else {
            return Ok(None);
        };

        if let Some(last) = self.last_t_ms.filter(|&last| t_ms < last) {
            self.frames.pop_front();
            return Err(EngineError::Detection(format!(
                "frame at {} ms arrived after {} ms",
                t_ms, last
            )));
        }

        // Pop only after the wait so a dropped call does not lose the frame
        if self.paced {
            let started = *self.started.get_or_insert_with(Instant::now);
            sleep_until(started + Duration::from_millis(t_ms)).await;
        }
        let Some(mut frame) = self.frames.pop_front() else {
            return Ok(None);
        };
        self.last_t_ms = Some(frame.t_ms);
        if !want_face {
            frame.face = None;
        }
        Ok(Some(frame))
    }
}

/// Deterministic stand-in for a live detector: two hands tracing smooth
/// loops in each half of the frame and a gently swaying face.
pub struct SimulatedSource {
    frame_interval: Duration,
    sim_time: f64,
    next_due: Option<Instant>,
}

impl SimulatedSource {
    pub fn new(fps: u32) -> Self {
        Self {
            frame_interval: Duration::from_secs_f64(1.0 / f64::from(fps.max(1))),
            sim_time: 0.0,
            next_due: None,
        }
    }

    fn generate(&self, want_face: bool) -> KeypointFrame {
        let t = self.sim_time;

        let left = synthetic_hand(100.0 + 60.0 * (t * 1.3).cos(), 190.0 + 40.0 * (t * 2.1).sin());
        let right = synthetic_hand(
            300.0 - 50.0 * (t * 0.9 + 1.0).cos(),
            190.0 + 45.0 * (t * 1.7 + 1.5).sin(),
        );

        let face = want_face.then(|| {
            let sway = 4.0 * (t * 0.5).sin();
            FaceDetection::from_eyes((180.0 + sway, 100.0), (220.0 + sway, 100.0))
        });

        KeypointFrame {
            t_ms: (t * 1000.0) as u64,
            hands: vec![left, right],
            face,
        }
    }
}

impl DetectionSource for SimulatedSource {
    async fn open(&mut self) -> Result<()> {
        self.next_due = Some(Instant::now());
        Ok(())
    }

    async fn next_frame(&mut self, want_face: bool) -> Result<Option<KeypointFrame>> {
        let due = *self.next_due.get_or_insert_with(Instant::now);
        sleep_until(due).await;
        self.next_due = Some(due + self.frame_interval);

        let frame = self.generate(want_face);
        self.sim_time += self.frame_interval.as_secs_f64();
        Ok(Some(frame))
    }
}
