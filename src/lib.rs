//! Hand-gesture motion analysis.
//!
//! Consumes per-frame hand and face landmarks from an external detector,
//! keeps a stable identity for up to two hands, normalizes motion against
//! the user's interocular distance, and turns the accumulated motion into
//! live coaching feedback and a scored end-of-session report.

pub mod config;
pub mod driver;
pub mod error;
pub mod export;
pub mod feedback;
pub mod keypoints;
pub mod metrics;
pub mod normalize;
pub mod scoring;
pub mod session;
pub mod sources;
pub mod tracking;

pub use config::EngineConfig;
pub use driver::{start_session, CancelHandle, DetectionSource, SessionHandle, SessionOutcome};
pub use error::{EngineError, Result};
pub use feedback::FeedbackLabel;
pub use keypoints::{FaceDetection, HandDetection, KeypointFrame, Point2D};
pub use scoring::{HandReport, SessionReport};
pub use session::{LiveState, Phase, SessionEngine, SessionEvent, Step};
pub use tracking::SlotId;
