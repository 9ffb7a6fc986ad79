// src/config.rs
//! Engine configuration. Every section has defaults, so a config file only
//! needs to name the values it overrides.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Longest calibration plus recording a session may be configured for.
pub const MAX_SESSION_MS: u64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub tracker: TrackerConfig,
    pub normalizer: NormalizerConfig,
    pub metrics: MetricsConfig,
    pub feedback: FeedbackConfig,
    pub scoring: ScoringConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub frame_width: f64,
    pub frame_height: f64,
    /// Max pixel distance for a detection to stay on the slot it was last seen in
    pub proximity_threshold: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            frame_width: 400.0,
            frame_height: 300.0,
            proximity_threshold: 120.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub guide_center_x: f64,
    pub guide_center_y: f64,
    pub guide_radius: f64,
    /// IOD must stay below this share of the guide diameter
    pub max_iod_ratio: f64,
    /// Eye midpoint must lie within this share of the guide radius
    pub center_tolerance: f64,
    /// Request a face detection every Nth processed frame
    pub face_sample_interval: u32,
    /// Hold the calibration countdown while the face is outside the guide
    pub require_face_in_guide: bool,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            guide_center_x: 200.0,
            guide_center_y: 100.0,
            guide_radius: 60.0,
            max_iod_ratio: 0.6,
            center_tolerance: 0.5,
            face_sample_interval: 3,
            require_face_in_guide: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub trail_capacity: usize,
    /// Raw displacements below this many pixels are sensor noise
    pub min_motion_px: f64,
    /// Radians; direction changes above this count as an erratic turn
    pub turn_angle_threshold: f64,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            trail_capacity: 45,
            min_motion_px: 2.0,
            turn_angle_threshold: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedbackConfig {
    pub low_speed: f64,
    pub high_speed: f64,
    pub max_erratic_rate: f64,
    pub stability_window: u32,
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            low_speed: 100.0,
            high_speed: 300.0,
            max_erratic_rate: 7.0,
            stability_window: 5,
        }
    }
}

/// Inclusive ideal range for a measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub min: f64,
    pub max: f64,
}

impl Band {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Normalized pixels travelled over the recording
    pub distance_band: Band,
    /// Normalized pixels per visible second
    pub speed_band: Band,
    /// Turns per second at which the erraticism sub-score reaches zero
    pub max_erratic_rate: f64,
    /// Turns per second above which a hand is called erratic in tips
    pub erratic_tip_rate: f64,
    /// Turns per second below which a hand is praised for smoothness
    pub smooth_tip_rate: f64,
    pub excellent_score: f64,
    pub good_score: f64,
    pub fair_score: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            distance_band: Band::new(2000.0, 8000.0),
            speed_band: Band::new(100.0, 300.0),
            max_erratic_rate: 7.0,
            erratic_tip_rate: 3.0,
            smooth_tip_rate: 0.5,
            excellent_score: 8.5,
            good_score: 7.0,
            fair_score: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub calibration_units: u32,
    pub recording_units: u32,
    pub time_unit_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            calibration_units: 5,
            recording_units: 30,
            time_unit_ms: 1000,
        }
    }
}

impl EngineConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| -> Result<()> { Err(EngineError::Config(msg.to_string())) };

        if self.tracker.frame_width <= 0.0 || self.tracker.frame_height <= 0.0 {
            return fail("frame dimensions must be positive");
        }
        if self.tracker.proximity_threshold <= 0.0 {
            return fail("proximity_threshold must be positive");
        }
        if self.normalizer.guide_radius <= 0.0 {
            return fail("guide_radius must be positive");
        }
        if self.normalizer.face_sample_interval == 0 {
            return fail("face_sample_interval must be at least 1");
        }
        if self.metrics.trail_capacity == 0 {
            return fail("trail_capacity must be at least 1");
        }
        if self.metrics.min_motion_px < 0.0 || self.metrics.turn_angle_threshold <= 0.0 {
            return fail("motion thresholds must be positive");
        }
        if self.feedback.stability_window == 0 {
            return fail("stability_window must be at least 1");
        }
        if self.feedback.low_speed > self.feedback.high_speed {
            return fail("feedback low_speed exceeds high_speed");
        }
        for (name, band) in [
            ("distance_band", self.scoring.distance_band),
            ("speed_band", self.scoring.speed_band),
        ] {
            if band.min < 0.0 || band.min > band.max {
                return Err(EngineError::Config(format!("{name} is inverted or negative")));
            }
        }
        if self.scoring.max_erratic_rate <= 0.0 {
            return fail("max_erratic_rate must be positive");
        }
        if self.session.recording_units == 0 || self.session.time_unit_ms == 0 {
            return fail("recording duration must be positive");
        }
        let units =
            u64::from(self.session.calibration_units) + u64::from(self.session.recording_units);
        match self.session.time_unit_ms.checked_mul(units) {
            Some(total) if total <= MAX_SESSION_MS => {}
            _ => return fail("calibration plus recording must not exceed 24 hours"),
        }
        Ok(())
    }
}
