// src/normalize.rs
//! Interocular-distance scale normalization and the face-guide check.

use crate::config::NormalizerConfig;
use crate::keypoints::{FaceDetection, Point2D};
use serde::Serialize;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CalibrationState {
    pub interocular_distance: Option<f64>,
    pub baseline_interocular_distance: Option<f64>,
    pub face_within_guide: bool,
}

pub struct ScaleNormalizer {
    config: NormalizerConfig,
    state: CalibrationState,
    baseline_captured: bool,
}

impl ScaleNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self {
            config,
            state: CalibrationState::default(),
            baseline_captured: false,
        }
    }

    /// Update the current IOD from a face detection. Faces without both eyes,
    /// or with coincident eyes, leave the state untouched.
    pub fn observe_face(&mut self, face: &FaceDetection) -> bool {
        let Some((left, right)) = face.eyes() else {
            debug!("Face without both eye landmarks, skipped");
            return false;
        };
        let iod = (right - left).norm();
        if iod <= 0.0 {
            return false;
        }

        let midpoint = Point2D::from((left.coords + right.coords) / 2.0);
        self.state.interocular_distance = Some(iod);
        self.state.face_within_guide = self.within_guide(iod, midpoint);
        true
    }

    fn within_guide(&self, iod: f64, eye_midpoint: Point2D) -> bool {
        let center = Point2D::new(self.config.guide_center_x, self.config.guide_center_y);
        let radius = self.config.guide_radius;
        iod < self.config.max_iod_ratio * 2.0 * radius
            && (eye_midpoint - center).norm() <= self.config.center_tolerance * radius
    }

    /// Freeze the current IOD as the baseline. Only the first call has any
    /// effect; a session without a visible face keeps no baseline.
    pub fn capture_baseline(&mut self) {
        if self.baseline_captured {
            return;
        }
        self.baseline_captured = true;
        self.state.baseline_interocular_distance = self.state.interocular_distance;
        match self.state.baseline_interocular_distance {
            Some(iod) => info!("Baseline interocular distance {:.1}px", iod),
            None => info!("No face seen during calibration, motion stays unnormalized"),
        }
    }

    pub fn scale_factor(&self) -> f64 {
        match (
            self.state.interocular_distance,
            self.state.baseline_interocular_distance,
        ) {
            (Some(current), Some(baseline)) if baseline > 0.0 && current > 0.0 => {
                current / baseline
            }
            _ => 1.0,
        }
    }

    pub fn state(&self) -> CalibrationState {
        self.state
    }

    pub fn face_within_guide(&self) -> bool {
        self.state.face_within_guide
    }
}
