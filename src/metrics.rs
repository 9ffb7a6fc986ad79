// src/metrics.rs
//! Per-hand motion accumulation: travel distance, visible time and erratic
//! direction reversals, plus the rolling rates derived from them.

use crate::config::MetricsConfig;
use crate::keypoints::Point2D;
use crate::tracking::SlotId;
use nalgebra::Vector2;
use serde::Serialize;
use std::collections::VecDeque;
use std::f64::consts::PI;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct HandSlot {
    id: SlotId,
    trail: VecDeque<Point2D>,
    trail_capacity: usize,
    // Most recent raw position; survives absences so identity can be kept.
    last_position: Option<Point2D>,
    // Position the next displacement is measured from. Cleared on absence.
    motion_origin: Option<Point2D>,
    last_motion: Option<Vector2<f64>>,
    // Time seen since `motion_origin` that no counted step has claimed yet.
    pending_ms: f64,
    seen: bool,
    visible_time_ms: f64,
    total_distance: f64,
    erratic_turns: u32,
    turn_comparisons: u32,
}

/// Snapshot of a slot's rolling rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SlotMetrics {
    pub visible: bool,
    pub speed: f64,
    pub erratic_rate: f64,
}

impl HandSlot {
    pub fn new(id: SlotId, trail_capacity: usize) -> Self {
        Self {
            id,
            trail: VecDeque::with_capacity(trail_capacity),
            trail_capacity,
            last_position: None,
            motion_origin: None,
            last_motion: None,
            pending_ms: 0.0,
            seen: false,
            visible_time_ms: 0.0,
            total_distance: 0.0,
            erratic_turns: 0,
            turn_comparisons: 0,
        }
    }

    /// Feed this frame's composite point. `elapsed_ms` is the time since the
    /// previous processed frame. Returns the normalized step distance when
    /// the displacement counted as motion.
    pub fn observe(
        &mut self,
        point: Point2D,
        scale_factor: f64,
        elapsed_ms: f64,
        config: &MetricsConfig,
    ) -> Option<f64> {
        self.seen = true;
        self.last_position = Some(point);

        self.trail.push_back(point);
        while self.trail.len() > self.trail_capacity {
            self.trail.pop_front();
        }

        let Some(origin) = self.motion_origin else {
            self.motion_origin = Some(point);
            self.pending_ms = 0.0;
            return None;
        };

        // Noise frames still pass time; the step that finally counts covers them
        self.pending_ms += elapsed_ms.max(0.0);
        let raw = point - origin;
        let raw_len = raw.norm();
        if raw_len < config.min_motion_px {
            return None;
        }

        let step = raw_len / scale_factor;
        self.total_distance += step;
        self.visible_time_ms += self.pending_ms;
        self.pending_ms = 0.0;

        if let Some(previous) = self.last_motion {
            self.turn_comparisons += 1;
            let turn = angle_between(&previous, &raw);
            if turn > config.turn_angle_threshold {
                self.erratic_turns += 1;
                trace!("{} erratic turn of {:.2} rad", self.id.label(), turn);
            }
        }

        self.motion_origin = Some(point);
        self.last_motion = Some(raw);
        Some(step)
    }

    /// The hand was not detected this frame: the trail and the motion
    /// baseline go, the counters stay.
    pub fn mark_absent(&mut self) {
        self.seen = false;
        self.trail.clear();
        self.motion_origin = None;
        self.last_motion = None;
        self.pending_ms = 0.0;
    }

    pub fn reset_counters(&mut self) {
        self.visible_time_ms = 0.0;
        self.total_distance = 0.0;
        self.erratic_turns = 0;
        self.turn_comparisons = 0;
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn is_seen(&self) -> bool {
        self.seen
    }

    pub fn last_position(&self) -> Option<Point2D> {
        self.last_position
    }

    pub fn trail(&self) -> impl Iterator<Item = &Point2D> + '_ {
        self.trail.iter()
    }

    pub fn trail_len(&self) -> usize {
        self.trail.len()
    }

    pub fn visible_time_ms(&self) -> f64 {
        self.visible_time_ms
    }

    pub fn visible_secs(&self) -> f64 {
        self.visible_time_ms / 1000.0
    }

    pub fn total_distance(&self) -> f64 {
        self.total_distance
    }

    pub fn erratic_turns(&self) -> u32 {
        self.erratic_turns
    }

    pub fn turn_comparisons(&self) -> u32 {
        self.turn_comparisons
    }

    pub fn speed(&self) -> f64 {
        per_second(self.total_distance, self.visible_time_ms)
    }

    pub fn erratic_rate(&self) -> f64 {
        per_second(self.erratic_turns as f64, self.visible_time_ms)
    }

    pub fn snapshot(&self) -> SlotMetrics {
        SlotMetrics {
            visible: self.seen,
            speed: self.speed(),
            erratic_rate: self.erratic_rate(),
        }
    }
}

fn per_second(amount: f64, time_ms: f64) -> f64 {
    if time_ms <= 0.0 {
        0.0
    } else {
        amount / (time_ms / 1000.0)
    }
}

/// Absolute heading difference between two displacements, in [0, π].
pub fn angle_between(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    let diff = (b.y.atan2(b.x) - a.y.atan2(a.x)).abs();
    if diff > PI {
        2.0 * PI - diff
    } else {
        diff
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot() -> HandSlot {
        HandSlot::new(SlotId::A, 45)
    }

    #[test]
    fn constant_direction_has_no_turns() {
        let config = MetricsConfig::default();
        let mut slot = slot();

        // 10 px per frame at 30 fps for three seconds
        for i in 0..=90 {
            slot.observe(Point2D::new(10.0 * i as f64, 150.0), 1.0, 1000.0 / 30.0, &config);
        }

        assert_eq!(slot.erratic_turns(), 0);
        assert!((slot.total_distance() - 900.0).abs() < 1e-6);
        assert!((slot.visible_secs() - 3.0).abs() < 1e-6);
        assert!((slot.speed() - slot.total_distance() / 3.0).abs() < 1e-6);
    }

    #[test]
    fn reversal_every_frame_counts_every_comparison() {
        let config = MetricsConfig::default();
        let mut slot = slot();

        let steps = 60;
        for i in 0..=steps {
            let x = if i % 2 == 0 { 100.0 } else { 120.0 };
            slot.observe(Point2D::new(x, 100.0), 1.0, 1000.0 / 30.0, &config);
        }

        assert_eq!(slot.erratic_turns(), steps - 1);
        assert_eq!(slot.turn_comparisons(), steps - 1);
    }

    #[test]
    fn jitter_below_epsilon_is_ignored() {
        let config = MetricsConfig::default();
        let mut slot = slot();

        slot.observe(Point2D::new(100.0, 100.0), 1.0, 33.0, &config);
        slot.observe(Point2D::new(101.0, 100.0), 1.0, 33.0, &config);
        slot.observe(Point2D::new(100.5, 100.5), 1.0, 33.0, &config);

        assert_eq!(slot.total_distance(), 0.0);
        assert_eq!(slot.visible_time_ms(), 0.0);
        assert_eq!(slot.speed(), 0.0);
        assert_eq!(slot.trail_len(), 3);
    }

    #[test]
    fn slow_drift_accumulates_against_last_motion_origin() {
        let config = MetricsConfig::default();
        let mut slot = slot();

        slot.observe(Point2D::new(0.0, 0.0), 1.0, 33.0, &config);
        slot.observe(Point2D::new(1.5, 0.0), 1.0, 33.0, &config);
        let step = slot.observe(Point2D::new(3.0, 0.0), 1.0, 33.0, &config);

        assert_eq!(step, Some(3.0));
        assert_eq!(slot.visible_time_ms(), 66.0);
    }

    #[test]
    fn slow_drift_speed_spans_the_noise_frames() {
        let config = MetricsConfig::default();
        let mut slot = slot();

        // 1.5 px per frame at 30 fps for three seconds: every other frame is noise
        for i in 0..=90 {
            slot.observe(Point2D::new(1.5 * i as f64, 150.0), 1.0, 1000.0 / 30.0, &config);
        }

        assert!((slot.total_distance() - 135.0).abs() < 1e-6);
        assert!((slot.visible_time_ms() - 3000.0).abs() < 1e-6);
        assert!((slot.speed() - 45.0).abs() < 1e-6);
    }

    #[test]
    fn absence_drops_unclaimed_noise_time() {
        let config = MetricsConfig::default();
        let mut slot = slot();

        slot.observe(Point2D::new(0.0, 0.0), 1.0, 33.0, &config);
        slot.observe(Point2D::new(1.0, 0.0), 1.0, 33.0, &config);
        slot.mark_absent();
        slot.observe(Point2D::new(50.0, 0.0), 1.0, 33.0, &config);
        slot.observe(Point2D::new(60.0, 0.0), 1.0, 33.0, &config);

        assert_eq!(slot.total_distance(), 10.0);
        assert_eq!(slot.visible_time_ms(), 33.0);
    }

    #[test]
    fn scale_factor_divides_distance() {
        let config = MetricsConfig::default();
        let mut slot = slot();

        slot.observe(Point2D::new(0.0, 0.0), 2.0, 33.0, &config);
        slot.observe(Point2D::new(40.0, 0.0), 2.0, 33.0, &config);

        assert!((slot.total_distance() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn absence_clears_trail_but_keeps_counters() {
        let config = MetricsConfig::default();
        let mut slot = slot();

        slot.observe(Point2D::new(0.0, 0.0), 1.0, 33.0, &config);
        slot.observe(Point2D::new(30.0, 0.0), 1.0, 33.0, &config);
        slot.mark_absent();

        assert_eq!(slot.trail_len(), 0);
        assert_eq!(slot.total_distance(), 30.0);
        assert_eq!(slot.last_position(), Some(Point2D::new(30.0, 0.0)));

        // Reappearing far away does not count as travel
        slot.observe(Point2D::new(300.0, 0.0), 1.0, 33.0, &config);
        assert_eq!(slot.total_distance(), 30.0);
    }

    #[test]
    fn trail_is_bounded() {
        let config = MetricsConfig::default();
        let mut slot = HandSlot::new(SlotId::B, 5);
        for i in 0..20 {
            slot.observe(Point2D::new(i as f64 * 5.0, 0.0), 1.0, 33.0, &config);
        }
        assert_eq!(slot.trail_len(), 5);
        assert_eq!(slot.trail().next().map(|p| p.x), Some(75.0));
    }

    #[test]
    fn angle_wraps_into_half_turn() {
        let right = Vector2::new(1.0, 0.0);
        let up_left = Vector2::new(-1.0, -0.01);
        let down_left = Vector2::new(-1.0, 0.01);
        assert!((angle_between(&up_left, &down_left) - 0.02).abs() < 1e-3);
        assert!((angle_between(&right, &Vector2::new(-1.0, 0.0)) - PI).abs() < 1e-9);
    }
}
