// src/session.rs
//! The per-session state machine: CALIBRATING -> RECORDING -> FINISHED.
//!
//! `SessionEngine` owns every piece of mutable session state. Timers and the
//! frame loop drive it exclusively through [`SessionEngine::step`].

use crate::config::EngineConfig;
use crate::error::Result;
use crate::feedback::{FeedbackClassifier, FeedbackLabel};
use crate::keypoints::KeypointFrame;
use crate::metrics::SlotMetrics;
use crate::normalize::{CalibrationState, ScaleNormalizer};
use crate::scoring::{SessionReport, SessionScorer};
use crate::tracking::{HandSlots, IdentityTracker, SlotId};
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Calibrating,
    Recording,
    Finished,
}

/// What observers see after each processed frame or countdown tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveState {
    pub phase: Phase,
    pub slots: [SlotMetrics; 2],
    pub feedback: FeedbackLabel,
    pub calibrated: bool,
    pub countdown_remaining: u32,
    pub face_within_guide: bool,
    pub scale_factor: f64,
    pub frames_processed: u64,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Detector output captured `now_ms` after the session started
    Frame { frame: KeypointFrame, now_ms: u64 },
    CountdownTick,
    RecordingElapsed,
}

#[derive(Debug, Clone)]
pub enum Step {
    Continue(LiveState),
    Finished(SessionReport),
    /// The event does not apply in the current phase
    Ignored,
}

pub struct SessionEngine {
    config: EngineConfig,
    session_id: Uuid,
    phase: Phase,
    tracker: IdentityTracker,
    normalizer: ScaleNormalizer,
    slots: HandSlots,
    feedback: FeedbackClassifier,
    scorer: SessionScorer,
    countdown_remaining: u32,
    frames_processed: u64,
    last_frame_ms: Option<u64>,
}

impl SessionEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let mut engine = Self {
            session_id: Uuid::new_v4(),
            phase: Phase::Calibrating,
            tracker: IdentityTracker::new(config.tracker.clone()),
            normalizer: ScaleNormalizer::new(config.normalizer.clone()),
            slots: HandSlots::new(&config.metrics),
            feedback: FeedbackClassifier::new(config.feedback.clone()),
            scorer: SessionScorer::new(config.scoring.clone()),
            countdown_remaining: config.session.calibration_units,
            frames_processed: 0,
            last_frame_ms: None,
            config,
        };

        info!("Session {} created", engine.session_id);
        if engine.countdown_remaining == 0 {
            engine.finish_calibration();
        }
        Ok(engine)
    }

    pub fn step(&mut self, event: SessionEvent) -> Step {
        if self.phase == Phase::Finished {
            return Step::Ignored;
        }
        match event {
            SessionEvent::Frame { frame, now_ms } => {
                self.process_frame(&frame, now_ms);
                Step::Continue(self.live_state())
            }
            SessionEvent::CountdownTick => {
                if self.phase != Phase::Calibrating {
                    return Step::Ignored;
                }
                self.tick_countdown();
                Step::Continue(self.live_state())
            }
            SessionEvent::RecordingElapsed => match self.finish() {
                Some(report) => Step::Finished(report),
                None => Step::Ignored,
            },
        }
    }

    /// Run one frame through tracking, normalization, metrics and feedback.
    pub fn process_frame(&mut self, frame: &KeypointFrame, now_ms: u64) {
        if self.phase == Phase::Finished {
            warn!("Frame arrived after the session finished, ignored");
            return;
        }

        let elapsed_ms = self
            .last_frame_ms
            .map(|last| now_ms.saturating_sub(last) as f64)
            .unwrap_or(0.0);
        self.last_frame_ms = Some(now_ms);
        self.frames_processed += 1;

        if let Some(face) = &frame.face {
            self.normalizer.observe_face(face);
        }
        let scale = self.normalizer.scale_factor();

        let assignment = self.tracker.assign(&frame.hands, &self.slots);
        for id in SlotId::ALL {
            let slot = self.slots.get_mut(id);
            match assignment.get(id) {
                Some(point) => {
                    if let Some(step) = slot.observe(point, scale, elapsed_ms, &self.config.metrics) {
                        debug!("{} moved {:.1}px (scale {:.2})", id.label(), step, scale);
                    }
                }
                None => slot.mark_absent(),
            }
        }

        if self.phase == Phase::Recording {
            self.feedback.update(&self.slots.a().snapshot());
        }
    }

    /// Advance the calibration countdown by one time unit.
    pub fn tick_countdown(&mut self) {
        if self.phase != Phase::Calibrating {
            return;
        }
        if self.config.normalizer.require_face_in_guide && !self.normalizer.face_within_guide() {
            debug!("Face outside guide, countdown held at {}", self.countdown_remaining);
            return;
        }
        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        if self.countdown_remaining == 0 {
            self.finish_calibration();
        }
    }

    fn finish_calibration(&mut self) {
        self.normalizer.capture_baseline();
        self.slots.reset_counters();
        self.phase = Phase::Recording;
        info!("Calibration complete, recording started");
    }

    /// End the session and build the report. Returns `None` once finished.
    pub fn finish(&mut self) -> Option<SessionReport> {
        if self.phase == Phase::Finished {
            return None;
        }
        self.phase = Phase::Finished;
        let report = self.scorer.score(self.session_id, &self.slots);
        match report.overall_score {
            Some(score) => info!("Session finished, overall score {:.1}", score),
            None => info!("Session finished without any hand motion"),
        }
        Some(report)
    }

    /// Whether the detector should run face detection for the next frame.
    pub fn wants_face(&self) -> bool {
        self.frames_processed % u64::from(self.config.normalizer.face_sample_interval) == 0
    }

    pub fn live_state(&self) -> LiveState {
        LiveState {
            phase: self.phase,
            slots: [self.slots.a().snapshot(), self.slots.b().snapshot()],
            feedback: self.feedback.current(),
            calibrated: self.phase != Phase::Calibrating,
            countdown_remaining: self.countdown_remaining,
            face_within_guide: self.normalizer.face_within_guide(),
            scale_factor: self.normalizer.scale_factor(),
            frames_processed: self.frames_processed,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn slots(&self) -> &HandSlots {
        &self.slots
    }

    pub fn calibration(&self) -> CalibrationState {
        self.normalizer.state()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoints::{synthetic_hand, FaceDetection};

    fn recording_engine() -> SessionEngine {
        let mut config = EngineConfig::default();
        config.session.calibration_units = 0;
        SessionEngine::new(config).unwrap()
    }

    fn hand_frame(x: f64, y: f64) -> KeypointFrame {
        KeypointFrame { hands: vec![synthetic_hand(x, y)], ..Default::default() }
    }

    fn frame_time(i: u64) -> u64 {
        (i * 1000 + 15) / 30
    }

    #[test]
    fn constant_motion_without_face() {
        let mut engine = recording_engine();
        for i in 0..=90u64 {
            engine.process_frame(&hand_frame(20.0 + 3.0 * i as f64, 150.0), frame_time(i));
        }

        let slot = engine.slots().a();
        assert_eq!(engine.live_state().scale_factor, 1.0);
        assert_eq!(slot.erratic_turns(), 0);
        assert!((slot.visible_secs() - 3.0).abs() < 1e-9);
        assert!((slot.speed() - slot.total_distance() / 3.0).abs() < 1e-9);
        // 90 px/s is below the low-speed threshold
        assert_eq!(engine.live_state().feedback, FeedbackLabel::TooLittle);
    }

    #[test]
    fn slow_drift_is_too_little() {
        let mut engine = recording_engine();
        // 1.9 px per frame: only every second frame clears the noise floor
        for i in 0..=90u64 {
            engine.process_frame(&hand_frame(20.0 + 1.9 * i as f64, 150.0), frame_time(i));
        }

        let slot = engine.slots().a();
        assert!((slot.visible_secs() - 3.0).abs() < 1e-9);
        assert!((slot.speed() - 57.0).abs() < 1e-6);
        assert_eq!(engine.live_state().feedback, FeedbackLabel::TooLittle);
    }

    #[test]
    fn reversals_count_every_comparison_after_the_first() {
        let mut engine = recording_engine();
        let steps = 60u64;
        for i in 0..=steps {
            let x = if i % 2 == 0 { 100.0 } else { 110.0 };
            engine.process_frame(&hand_frame(x, 150.0), frame_time(i));
        }
        let slot = engine.slots().a();
        assert_eq!(u64::from(slot.erratic_turns()), steps - 1);
        assert!(slot.erratic_turns() <= slot.turn_comparisons());
    }

    #[test]
    fn closer_face_halves_distance() {
        let mut config = EngineConfig::default();
        config.session.calibration_units = 1;
        let mut engine = SessionEngine::new(config).unwrap();

        let baseline_face = FaceDetection::from_eyes((150.0, 100.0), (250.0, 100.0));
        engine.process_frame(
            &KeypointFrame { face: Some(baseline_face), ..Default::default() },
            0,
        );
        engine.tick_countdown();
        assert_eq!(engine.phase(), Phase::Recording);

        let near_face = FaceDetection::from_eyes((100.0, 100.0), (300.0, 100.0));
        let mut first = hand_frame(100.0, 150.0);
        first.face = Some(near_face);
        engine.process_frame(&first, 33);
        engine.process_frame(&hand_frame(140.0, 150.0), 66);

        assert_eq!(engine.live_state().scale_factor, 2.0);
        assert!((engine.slots().a().total_distance() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn calibration_boundary_resets_counters() {
        let mut config = EngineConfig::default();
        config.session.calibration_units = 2;
        let mut engine = SessionEngine::new(config).unwrap();

        engine.process_frame(&hand_frame(100.0, 150.0), 0);
        engine.process_frame(&hand_frame(150.0, 150.0), 33);
        assert!(engine.slots().a().total_distance() > 0.0);
        assert!(!engine.live_state().calibrated);

        engine.tick_countdown();
        assert_eq!(engine.live_state().countdown_remaining, 1);
        engine.tick_countdown();

        let state = engine.live_state();
        assert!(state.calibrated);
        assert_eq!(state.phase, Phase::Recording);
        assert_eq!(engine.slots().a().total_distance(), 0.0);
        // No face during calibration, so no baseline
        assert_eq!(engine.calibration().baseline_interocular_distance, None);
    }

    #[test]
    fn face_gate_holds_countdown() {
        let mut config = EngineConfig::default();
        config.session.calibration_units = 1;
        config.normalizer.require_face_in_guide = true;
        let mut engine = SessionEngine::new(config).unwrap();

        engine.tick_countdown();
        assert_eq!(engine.phase(), Phase::Calibrating);

        let face = FaceDetection::from_eyes((180.0, 100.0), (220.0, 100.0));
        engine.process_frame(&KeypointFrame { face: Some(face), ..Default::default() }, 0);
        engine.tick_countdown();
        assert_eq!(engine.phase(), Phase::Recording);
    }

    #[test]
    fn empty_session_reports_no_data_once() {
        let mut engine = recording_engine();
        for i in 0..30u64 {
            engine.process_frame(&KeypointFrame::default(), frame_time(i));
        }
        assert_eq!(engine.live_state().feedback, FeedbackLabel::NoHandsDetected);

        match engine.step(SessionEvent::RecordingElapsed) {
            Step::Finished(report) => assert!(!report.has_data()),
            other => panic!("expected report, got {:?}", other),
        }
        assert!(matches!(engine.step(SessionEvent::RecordingElapsed), Step::Ignored));
        assert!(matches!(
            engine.step(SessionEvent::Frame { frame: hand_frame(1.0, 1.0), now_ms: 5000 }),
            Step::Ignored
        ));
    }

    #[test]
    fn face_sampled_every_third_frame() {
        let mut engine = recording_engine();
        let mut wanted = Vec::new();
        for i in 0..6u64 {
            wanted.push(engine.wants_face());
            engine.process_frame(&KeypointFrame::default(), i * 33);
        }
        assert_eq!(wanted, vec![true, false, false, true, false, false]);
    }
}
