// src/keypoints.rs
//! Per-frame detector output as the engine consumes it.
//!
//! Hands follow the MediaPipe 21-landmark convention and are addressed by
//! index. Faces are addressed by landmark name; only the two eyes are read.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

pub type Point2D = Point2<f64>;

/// MediaPipe hand landmark indices used by the engine
pub mod hand {
    pub const WRIST: usize = 0;
    pub const INDEX_FINGER_MCP: usize = 5;
    pub const PINKY_MCP: usize = 17;
    pub const LANDMARK_COUNT: usize = 21;

    /// Palm landmarks averaged into the composite tracking point. The palm
    /// triangle moves with the hand but ignores finger flicks.
    pub const COMPOSITE: [usize; 3] = [WRIST, INDEX_FINGER_MCP, PINKY_MCP];
}

pub mod face {
    pub const LEFT_EYE: &str = "leftEye";
    pub const RIGHT_EYE: &str = "rightEye";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandDetection {
    pub keypoints: Vec<Keypoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceDetection {
    pub keypoints: Vec<NamedKeypoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedKeypoint {
    pub x: f64,
    pub y: f64,
    pub name: String,
}

/// Everything the detector reported for one tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeypointFrame {
    /// Capture time relative to the start of the stream
    #[serde(default)]
    pub t_ms: u64,
    #[serde(default)]
    pub hands: Vec<HandDetection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face: Option<FaceDetection>,
}

impl HandDetection {
    pub fn from_points(points: &[(f64, f64)]) -> Self {
        Self {
            keypoints: points
                .iter()
                .map(|&(x, y)| Keypoint { x, y, name: None })
                .collect(),
        }
    }

    pub fn landmark(&self, index: usize) -> Option<Point2D> {
        self.keypoints
            .get(index)
            .filter(|k| k.x.is_finite() && k.y.is_finite())
            .map(|k| Point2D::new(k.x, k.y))
    }

    /// Centroid of the composite landmarks, or `None` if any is missing.
    pub fn composite_point(&self) -> Option<Point2D> {
        let mut sum = nalgebra::Vector2::<f64>::zeros();
        for index in hand::COMPOSITE {
            sum += self.landmark(index)?.coords;
        }
        Some(Point2D::from(sum / hand::COMPOSITE.len() as f64))
    }
}

impl FaceDetection {
    pub fn from_eyes(left: (f64, f64), right: (f64, f64)) -> Self {
        Self {
            keypoints: vec![
                NamedKeypoint { x: left.0, y: left.1, name: face::LEFT_EYE.to_string() },
                NamedKeypoint { x: right.0, y: right.1, name: face::RIGHT_EYE.to_string() },
            ],
        }
    }

    pub fn landmark(&self, name: &str) -> Option<Point2D> {
        self.keypoints
            .iter()
            .find(|k| k.name == name)
            .filter(|k| k.x.is_finite() && k.y.is_finite())
            .map(|k| Point2D::new(k.x, k.y))
    }

    pub fn eyes(&self) -> Option<(Point2D, Point2D)> {
        Some((self.landmark(face::LEFT_EYE)?, self.landmark(face::RIGHT_EYE)?))
    }
}

/// Full 21-point hand whose palm centroid sits at `(cx, cy)`. Used by the
/// simulated source and by tests.
pub fn synthetic_hand(cx: f64, cy: f64) -> HandDetection {
    let mut points = vec![(cx, cy); hand::LANDMARK_COUNT];
    points[hand::WRIST] = (cx, cy + 30.0);
    points[hand::INDEX_FINGER_MCP] = (cx - 15.0, cy - 15.0);
    points[hand::PINKY_MCP] = (cx + 15.0, cy - 15.0);
    HandDetection::from_points(&points)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn composite_is_palm_centroid() {
        let hand = synthetic_hand(100.0, 80.0);
        let p = hand.composite_point().unwrap();
        assert!((p.x - 100.0).abs() < 1e-9);
        assert!((p.y - 80.0).abs() < 1e-9);
    }

    #[test]
    fn truncated_hand_has_no_composite() {
        let hand = HandDetection::from_points(&[(1.0, 1.0); 10]);
        assert!(hand.composite_point().is_none());
    }

    #[test]
    fn face_without_right_eye_is_unusable() {
        let face = FaceDetection {
            keypoints: vec![NamedKeypoint { x: 1.0, y: 2.0, name: "leftEye".into() }],
        };
        assert!(face.eyes().is_none());
    }

    #[test]
    fn frame_parses_detector_json() {
        let line = r#"{"t_ms":33,"hands":[{"keypoints":[{"x":1,"y":2}]}],
                       "face":{"keypoints":[{"x":10,"y":20,"name":"leftEye"},{"x":30,"y":20,"name":"rightEye"}]}}"#;
        let frame: KeypointFrame = serde_json::from_str(line).unwrap();
        assert_eq!(frame.t_ms, 33);
        assert_eq!(frame.hands.len(), 1);
        let (l, r) = frame.face.unwrap().eyes().unwrap();
        assert_eq!((r - l).norm(), 20.0);
    }
}
