// src/scoring.rs
//! End-of-session scoring and coaching tips.
//!
//! Each visible hand earns up to 10 points split evenly between travel
//! distance, average speed and smoothness. Hands that were never visible
//! are left out of the overall score rather than counted as zero.

use crate::config::{Band, ScoringConfig};
use crate::metrics::HandSlot;
use crate::tracking::{HandSlots, SlotId};
use serde::Serialize;
use uuid::Uuid;

pub const MAX_SCORE: f64 = 10.0;
const SUB_SCORE_MAX: f64 = MAX_SCORE / 3.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SubScores {
    pub distance: f64,
    pub speed: f64,
    pub erraticism: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandReport {
    pub slot: SlotId,
    pub label: &'static str,
    pub distance: f64,
    pub speed: f64,
    pub erratic_rate: f64,
    pub erratic_turns: u32,
    pub visible_secs: f64,
    pub sub_scores: SubScores,
    pub score: f64,
}

/// Final outcome of a session. Built once, when recording ends.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    /// Only hands with nonzero visible time
    pub hands: Vec<HandReport>,
    /// `None` when no hand was ever visible
    pub overall_score: Option<f64>,
    pub tips: Vec<String>,
}

impl SessionReport {
    pub fn has_data(&self) -> bool {
        self.overall_score.is_some()
    }

    pub fn hand(&self, slot: SlotId) -> Option<&HandReport> {
        self.hands.iter().find(|h| h.slot == slot)
    }
}

pub struct SessionScorer {
    config: ScoringConfig,
}

impl SessionScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn score(&self, session_id: Uuid, slots: &HandSlots) -> SessionReport {
        let hands: Vec<HandReport> = slots
            .iter()
            .filter(|slot| slot.visible_time_ms() > 0.0)
            .map(|slot| self.score_hand(slot))
            .collect();

        let overall_score = if hands.is_empty() {
            None
        } else {
            Some(hands.iter().map(|h| h.score).sum::<f64>() / hands.len() as f64)
        };

        let tips = self.tips(overall_score, &hands);

        SessionReport {
            session_id,
            hands,
            overall_score,
            tips,
        }
    }

    pub fn score_hand(&self, slot: &HandSlot) -> HandReport {
        let visible_secs = slot.visible_secs();
        let speed = slot.speed();
        let erratic_rate = slot.erratic_rate();

        let sub_scores = SubScores {
            distance: band_score(slot.total_distance(), self.config.distance_band),
            speed: band_score(speed, self.config.speed_band),
            erraticism: erratic_score(erratic_rate, self.config.max_erratic_rate),
        };
        let score = (sub_scores.distance + sub_scores.speed + sub_scores.erraticism).min(MAX_SCORE);

        HandReport {
            slot: slot.id(),
            label: slot.id().label(),
            distance: slot.total_distance(),
            speed,
            erratic_rate,
            erratic_turns: slot.erratic_turns(),
            visible_secs,
            sub_scores,
            score,
        }
    }

    fn tips(&self, overall: Option<f64>, hands: &[HandReport]) -> Vec<String> {
        let cfg = &self.config;
        let mut tips = vec![self.banner(overall).to_string()];

        for hand in hands {
            for rule in self.hand_rules(hand) {
                tips.push(format!("{}: {}", hand.label, rule));
            }
        }

        if hands.iter().any(|h| h.erratic_rate > cfg.erratic_tip_rate) {
            tips.push("Practice one gesture per idea and hold it briefly before moving on.".into());
        }
        if hands.iter().any(|h| h.speed > cfg.speed_band.max) {
            tips.push("Pause between points; slower gestures read as more confident.".into());
        }
        if hands.iter().any(|h| h.distance < cfg.distance_band.min) {
            tips.push("Use the space in front of your torso; contained gestures can look nervous.".into());
        }
        if hands.iter().any(|h| h.score < cfg.fair_score) {
            tips.push(
                "Record a practice run and watch it back without sound to spot distracting motion."
                    .into(),
            );
        }

        tips
    }

    fn banner(&self, overall: Option<f64>) -> &'static str {
        let cfg = &self.config;
        match overall {
            None => "No hand movement was detected. Make sure your hands are visible to the camera.",
            Some(s) if s >= cfg.excellent_score => {
                "Excellent gesturing! Your movements were purposeful and well paced."
            }
            Some(s) if s >= cfg.good_score => "Good gesturing overall, with a few things to polish.",
            Some(s) if s >= cfg.fair_score => "Fair gesturing. Focus on the suggestions below.",
            Some(_) => "Your gestures need work. Start with the suggestions below.",
        }
    }

    /// Rules fire in a fixed order: distance, speed, erraticism, score.
    fn hand_rules(&self, hand: &HandReport) -> Vec<&'static str> {
        let cfg = &self.config;
        let mut rules = Vec::new();

        if hand.distance < cfg.distance_band.min {
            rules.push("moved very little; open up your gestures to emphasize key points.");
        } else if hand.distance > cfg.distance_band.max {
            rules.push("covered a lot of ground; keep gestures compact and inside the frame.");
        }

        if hand.speed < cfg.speed_band.min {
            rules.push("moved slowly; add energy to the gestures that carry your main ideas.");
        } else if hand.speed > cfg.speed_band.max {
            rules.push("moved quickly; slow down and let each gesture land.");
        }

        if hand.erratic_rate > cfg.erratic_tip_rate {
            rules.push("changed direction abruptly and often; aim for smooth, deliberate arcs.");
        } else if hand.erratic_rate < cfg.smooth_tip_rate {
            rules.push("moved smoothly with very few abrupt changes.");
        }

        if hand.score >= cfg.excellent_score {
            rules.push("was consistently well controlled.");
        } else if hand.score < cfg.fair_score {
            rules.push("needs the most practice.");
        }

        rules
    }
}

/// Full marks inside the band, a linear ramp up from zero below it and a
/// linear ramp down to zero one band-width above it.
pub fn band_score(value: f64, band: Band) -> f64 {
    if value < band.min {
        if band.min <= 0.0 {
            return SUB_SCORE_MAX;
        }
        SUB_SCORE_MAX * (value.max(0.0) / band.min)
    } else if value <= band.max {
        SUB_SCORE_MAX
    } else {
        let width = band.width();
        if width <= 0.0 {
            return 0.0;
        }
        SUB_SCORE_MAX * (1.0 - (value - band.max) / width).max(0.0)
    }
}

pub fn erratic_score(rate: f64, max_rate: f64) -> f64 {
    SUB_SCORE_MAX * (1.0 - rate / max_rate).clamp(0.0, 1.0)
}
