//! Lane change detection from lateral drift off the road centerline

use announce::{Announcement, Category};
use host::geometry::{forward_vector, heading_delta};
use host::{HostError, RoadQuery, VehicleSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneChangeConfig {
    pub lane_width: f32,
    /// Fraction of a lane width that counts as a change
    pub change_fraction: f32,
    pub window_ms: i64,
    pub min_speed: f32,
    /// Skip samples while misaligned with the road by more than this (degrees)
    pub max_misalignment_deg: f32,
}

impl Default for LaneChangeConfig {
    fn default() -> Self {
        Self {
            lane_width: 5.0,
            change_fraction: 0.7,
            window_ms: 3_000,
            min_speed: 5.0,
            max_misalignment_deg: 30.0,
        }
    }
}

pub struct LaneChangeDetector {
    config: LaneChangeConfig,
    offsets: VecDeque<(i64, f32)>,
}

impl LaneChangeDetector {
    pub fn new(config: LaneChangeConfig) -> Self {
        Self {
            config,
            offsets: VecDeque::new(),
        }
    }

    pub fn update(
        &mut self,
        road: &dyn RoadQuery,
        vehicle: &VehicleSnapshot,
        now_ms: i64,
    ) -> Option<Announcement> {
        if vehicle.speed < self.config.min_speed {
            self.offsets.clear();
            return None;
        }

        let offset = match self.lateral_offset(road, vehicle) {
            Ok(Some(offset)) => offset,
            Ok(None) => {
                self.offsets.clear();
                return None;
            }
            Err(e) => {
                warn!("Lane offset query failed: {}", e);
                return None;
            }
        };

        while let Some(&(t, _)) = self.offsets.front() {
            if now_ms - t > self.config.window_ms {
                self.offsets.pop_front();
            } else {
                break;
            }
        }

        let threshold = self.config.lane_width * self.config.change_fraction;
        let drift = self.offsets.front().map(|&(_, first)| offset - first);
        self.offsets.push_back((now_ms, offset));

        let drift = drift?;
        if drift.abs() < threshold {
            return None;
        }

        debug!("Lateral drift {:.1} m", drift);
        self.offsets.clear();
        self.offsets.push_back((now_ms, offset));
        let side = if drift > 0.0 { "left" } else { "right" };
        Some(Announcement::low(
            format!("Changing lanes {}.", side),
            Category::Traffic,
        ))
    }

    /// Signed distance from the centerline, left positive, relative to our
    /// direction of travel
    fn lateral_offset(
        &self,
        road: &dyn RoadQuery,
        vehicle: &VehicleSnapshot,
    ) -> Result<Option<f32>, HostError> {
        let Some((node, node_heading)) = road.nearest_node_with_heading(vehicle.position)? else {
            return Ok(None);
        };

        // Nodes carry one heading per road; travelling against it flips sides
        let mut heading = node_heading;
        if heading_delta(vehicle.heading, heading).abs() > 90.0 {
            heading += 180.0;
        }
        if heading_delta(vehicle.heading, heading).abs() > self.config.max_misalignment_deg {
            return Ok(None);
        }

        let rel = vehicle.position - node;
        Ok(Some(forward_vector(heading).cross_2d(rel)))
    }

    pub fn reset(&mut self) {
        self.offsets.clear();
    }
}

impl Default for LaneChangeDetector {
    fn default() -> Self {
        Self::new(LaneChangeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::mock::MockHost;
    use host::{EntityId, RoadNode, Vec3};

    fn host_with_road(heading: f32) -> MockHost {
        let mut host = MockHost::new();
        host.add_straight_road(
            Vec3::ZERO,
            heading,
            500.0,
            10.0,
            &RoadNode::new(Vec3::ZERO, heading),
        );
        host
    }

    fn vehicle(x: f32, y: f32, heading: f32) -> VehicleSnapshot {
        let mut v = VehicleSnapshot::at_rest(EntityId(2), Vec3::new(x, y, 0.0), heading);
        v.speed = 15.0;
        v
    }

    #[test]
    fn test_drift_left_announced() {
        let host = host_with_road(0.0);
        let mut detector = LaneChangeDetector::default();

        assert!(detector.update(&host, &vehicle(0.0, 20.0, 0.0), 0).is_none());
        assert!(detector.update(&host, &vehicle(-2.0, 35.0, 0.0), 1_000).is_none());
        let a = detector
            .update(&host, &vehicle(-4.0, 50.0, 0.0), 2_000)
            .expect("lane change");
        assert_eq!(a.text, "Changing lanes left.");
    }

    #[test]
    fn test_against_node_heading_flips_side() {
        // Road nodes point north, we drive south
        let host = host_with_road(0.0);
        let mut detector = LaneChangeDetector::default();

        detector.update(&host, &vehicle(0.0, 200.0, 180.0), 0);
        let a = detector
            .update(&host, &vehicle(-4.0, 180.0, 180.0), 1_500)
            .expect("lane change");
        // Moving to -x while facing south is a move to the right
        assert_eq!(a.text, "Changing lanes right.");
    }

    #[test]
    fn test_slow_drift_outside_window() {
        let host = host_with_road(0.0);
        let mut detector = LaneChangeDetector::default();
        for i in 0..5 {
            let v = vehicle(-(i as f32), 20.0 + i as f32 * 30.0, 0.0);
            assert!(detector.update(&host, &v, i * 2_000).is_none());
        }
    }

    #[test]
    fn test_misaligned_samples_skipped() {
        let host = host_with_road(0.0);
        let mut detector = LaneChangeDetector::default();
        detector.update(&host, &vehicle(0.0, 20.0, 0.0), 0);
        // Turning across the road
        assert!(detector.update(&host, &vehicle(-4.0, 25.0, 60.0), 500).is_none());
        assert!(detector.update(&host, &vehicle(-4.0, 30.0, 0.0), 1_000).is_none());
    }
}
