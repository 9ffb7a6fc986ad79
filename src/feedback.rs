// src/feedback.rs
use crate::config::FeedbackConfig;
use crate::metrics::SlotMetrics;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackLabel {
    NoHandsDetected,
    TooLittle,
    JustRight,
    TooMuch,
}

impl fmt::Display for FeedbackLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FeedbackLabel::NoHandsDetected => "No hands detected",
            FeedbackLabel::TooLittle => "Too little - gesture more",
            FeedbackLabel::JustRight => "Just right",
            FeedbackLabel::TooMuch => "Too much - slow down",
        };
        f.write_str(text)
    }
}

/// Debounced coaching label for the primary hand.
pub struct FeedbackClassifier {
    config: FeedbackConfig,
    current: FeedbackLabel,
    pending: Option<FeedbackLabel>,
    stable_run: u32,
}

impl FeedbackClassifier {
    pub fn new(config: FeedbackConfig) -> Self {
        Self {
            config,
            current: FeedbackLabel::NoHandsDetected,
            pending: None,
            stable_run: 0,
        }
    }

    pub fn classify(&self, metrics: &SlotMetrics) -> FeedbackLabel {
        if !metrics.visible {
            FeedbackLabel::NoHandsDetected
        } else if metrics.speed < self.config.low_speed {
            FeedbackLabel::TooLittle
        } else if metrics.speed > self.config.high_speed
            || metrics.erratic_rate > self.config.max_erratic_rate
        {
            FeedbackLabel::TooMuch
        } else {
            FeedbackLabel::JustRight
        }
    }

    /// Classify this frame and return the published label, which only moves
    /// once a new candidate has held for the whole stability window.
    pub fn update(&mut self, metrics: &SlotMetrics) -> FeedbackLabel {
        let candidate = self.classify(metrics);

        if candidate == self.current {
            self.pending = None;
            self.stable_run = 0;
            return self.current;
        }

        if self.pending == Some(candidate) {
            self.stable_run += 1;
        } else {
            self.pending = Some(candidate);
            self.stable_run = 1;
        }

        if self.stable_run >= self.config.stability_window {
            tracing::debug!("Feedback {} -> {}", self.current, candidate);
            self.current = candidate;
            self.pending = None;
            self.stable_run = 0;
        }

        self.current
    }

    pub fn current(&self) -> FeedbackLabel {
        self.current
    }

    pub fn stable_run(&self) -> u32 {
        self.stable_run
    }
}
