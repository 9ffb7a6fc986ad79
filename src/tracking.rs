// src/tracking.rs - Stable hand identity across frames
use crate::config::{MetricsConfig, TrackerConfig};
use crate::keypoints::{HandDetection, Point2D};
use crate::metrics::HandSlot;
use serde::Serialize;
use tracing::debug;

/// Logical hand identity. Slot A starts on the left half of the camera
/// frame, slot B on the right; neither implies an anatomical side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    pub const ALL: [SlotId; 2] = [SlotId::A, SlotId::B];

    pub fn index(self) -> usize {
        match self {
            SlotId::A => 0,
            SlotId::B => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SlotId::A => "Hand A",
            SlotId::B => "Hand B",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HandSlots {
    a: HandSlot,
    b: HandSlot,
}

impl HandSlots {
    pub fn new(config: &MetricsConfig) -> Self {
        Self {
            a: HandSlot::new(SlotId::A, config.trail_capacity),
            b: HandSlot::new(SlotId::B, config.trail_capacity),
        }
    }

    pub fn a(&self) -> &HandSlot {
        &self.a
    }

    pub fn b(&self) -> &HandSlot {
        &self.b
    }

    pub fn get(&self, id: SlotId) -> &HandSlot {
        match id {
            SlotId::A => &self.a,
            SlotId::B => &self.b,
        }
    }

    pub fn get_mut(&mut self, id: SlotId) -> &mut HandSlot {
        match id {
            SlotId::A => &mut self.a,
            SlotId::B => &mut self.b,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &HandSlot> {
        [&self.a, &self.b].into_iter()
    }

    pub fn reset_counters(&mut self) {
        self.a.reset_counters();
        self.b.reset_counters();
    }
}

/// Composite points assigned to each slot for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Assignment {
    pub a: Option<Point2D>,
    pub b: Option<Point2D>,
}

impl Assignment {
    pub fn get(&self, id: SlotId) -> Option<Point2D> {
        match id {
            SlotId::A => self.a,
            SlotId::B => self.b,
        }
    }

    fn set(&mut self, id: SlotId, point: Option<Point2D>) {
        match id {
            SlotId::A => self.a = point,
            SlotId::B => self.b = point,
        }
    }
}

pub struct IdentityTracker {
    config: TrackerConfig,
}

struct Claim {
    point: Point2D,
    slot: SlotId,
    // Distance used to settle two detections claiming the same slot
    priority: f64,
}

impl IdentityTracker {
    pub fn new(config: TrackerConfig) -> Self {
        Self { config }
    }

    /// Map this frame's detections onto the two slots. Detections without a
    /// usable composite point are dropped, and when two detections claim the
    /// same slot the nearer one keeps it while the other is dropped.
    pub fn assign(&self, detections: &[HandDetection], slots: &HandSlots) -> Assignment {
        let mut claims: Vec<Claim> = Vec::with_capacity(detections.len());

        for (i, detection) in detections.iter().enumerate() {
            let Some(point) = detection.composite_point() else {
                debug!("Hand {} missing composite landmarks, dropped", i);
                continue;
            };
            let claim = self.claim(point, slots);
            debug!(
                "Hand {} at ({:.1}, {:.1}) -> {} (d={:.1})",
                i, point.x, point.y, claim.slot.label(), claim.priority
            );
            claims.push(claim);
        }

        let mut assignment = Assignment::default();
        for id in SlotId::ALL {
            let winner = claims
                .iter()
                .filter(|c| c.slot == id)
                .min_by(|l, r| l.priority.total_cmp(&r.priority));
            assignment.set(id, winner.map(|c| c.point));
        }

        let assigned = usize::from(assignment.a.is_some()) + usize::from(assignment.b.is_some());
        if claims.len() > assigned {
            debug!("Conflicting hand claims, dropped {} detection(s)", claims.len() - assigned);
        }

        assignment
    }

    fn claim(&self, point: Point2D, slots: &HandSlots) -> Claim {
        let nearest = slots
            .iter()
            .filter_map(|slot| {
                slot.last_position()
                    .map(|last| (slot.id(), (point - last).norm()))
            })
            .min_by(|l, r| l.1.total_cmp(&r.1));

        if let Some((slot, distance)) = nearest {
            if distance < self.config.proximity_threshold {
                return Claim { point, slot, priority: distance };
            }
        }

        // Midline fallback
        let slot = self.side_of(point);
        let anchor = slots
            .get(slot)
            .last_position()
            .unwrap_or_else(|| self.half_center(slot));
        Claim { point, slot, priority: (point - anchor).norm() }
    }

    fn side_of(&self, point: Point2D) -> SlotId {
        if point.x < self.config.frame_width / 2.0 {
            SlotId::A
        } else {
            SlotId::B
        }
    }

    fn half_center(&self, slot: SlotId) -> Point2D {
        let quarter = self.config.frame_width / 4.0;
        let x = match slot {
            SlotId::A => quarter,
            SlotId::B => 3.0 * quarter,
        };
        Point2D::new(x, self.config.frame_height / 2.0)
    }
}
