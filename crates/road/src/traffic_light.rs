//! Stopped-at-traffic-light state

use announce::{Announcement, Category};
use host::{HostError, NodeFlags, RoadQuery, VehicleSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficLightConfig {
    pub check_interval_ms: i64,
    /// Below this the vehicle counts as stopped (m/s)
    pub stop_speed: f32,
    /// Above this a stopped vehicle is moving again (m/s)
    pub resume_speed: f32,
    /// Distance ahead searched for a light node (m)
    pub lookahead: f32,
    /// Max distance between a probe and the node it returns (m)
    pub node_radius: f32,
}

impl Default for TrafficLightConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 500,
            stop_speed: 0.5,
            resume_speed: 3.0,
            lookahead: 25.0,
            node_radius: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LightState {
    Idle,
    Stopped,
}

pub struct TrafficLightMonitor {
    config: TrafficLightConfig,
    state: LightState,
    last_check_ms: Option<i64>,
}

impl TrafficLightMonitor {
    pub fn new(config: TrafficLightConfig) -> Self {
        Self {
            config,
            state: LightState::Idle,
            last_check_ms: None,
        }
    }

    /// Waiting at a light; stuck detection treats this as intentional
    pub fn is_stopped(&self) -> bool {
        self.state == LightState::Stopped
    }

    pub fn update(
        &mut self,
        road: &dyn RoadQuery,
        vehicle: &VehicleSnapshot,
        now_ms: i64,
    ) -> Option<Announcement> {
        if let Some(last) = self.last_check_ms {
            if now_ms - last < self.config.check_interval_ms {
                return None;
            }
        }
        self.last_check_ms = Some(now_ms);

        match self.state {
            LightState::Idle if vehicle.speed < self.config.stop_speed => {
                match self.light_ahead(road, vehicle) {
                    Ok(true) => {
                        debug!("Stopped at traffic light");
                        self.state = LightState::Stopped;
                        Some(Announcement::low(
                            "Stopped at traffic light.",
                            Category::TrafficLight,
                        ))
                    }
                    Ok(false) => None,
                    Err(e) => {
                        warn!("Traffic light query failed: {}", e);
                        None
                    }
                }
            }
            LightState::Stopped if vehicle.speed > self.config.resume_speed => {
                self.state = LightState::Idle;
                Some(Announcement::low("Proceeding.", Category::TrafficLight))
            }
            _ => None,
        }
    }

    fn light_ahead(&self, road: &dyn RoadQuery, vehicle: &VehicleSnapshot) -> Result<bool, HostError> {
        for fraction in [0.5, 1.0] {
            let probe = vehicle
                .position
                .offset_along(vehicle.heading, self.config.lookahead * fraction);
            if let Some(node) = road.node_properties(probe)? {
                if node.flags.contains(NodeFlags::TRAFFIC_LIGHT)
                    && node.position.distance(probe) <= self.config.node_radius
                {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    pub fn reset(&mut self) {
        self.state = LightState::Idle;
        self.last_check_ms = None;
    }
}

impl Default for TrafficLightMonitor {
    fn default() -> Self {
        Self::new(TrafficLightConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::mock::MockHost;
    use host::{EntityId, RoadNode, Vec3};

    fn with_light() -> MockHost {
        let mut host = MockHost::new();
        host.road_nodes.push(
            RoadNode::new(Vec3::new(0.0, 12.0, 0.0), 0.0).with_flags(NodeFlags::TRAFFIC_LIGHT),
        );
        host
    }

    fn at_speed(speed: f32) -> VehicleSnapshot {
        let mut v = VehicleSnapshot::at_rest(EntityId(2), Vec3::ZERO, 0.0);
        v.speed = speed;
        v
    }

    #[test]
    fn test_stop_and_proceed() {
        let host = with_light();
        let mut monitor = TrafficLightMonitor::default();

        assert!(monitor.update(&host, &at_speed(10.0), 0).is_none());
        let stop = monitor.update(&host, &at_speed(0.1), 500).expect("stopped");
        assert_eq!(stop.text, "Stopped at traffic light.");
        assert!(monitor.is_stopped());

        // Creeping forward is still stopped
        assert!(monitor.update(&host, &at_speed(2.0), 1_000).is_none());
        assert!(monitor.is_stopped());

        let go = monitor.update(&host, &at_speed(5.0), 1_500).expect("proceeding");
        assert_eq!(go.text, "Proceeding.");
        assert!(!monitor.is_stopped());
    }

    #[test]
    fn test_stop_without_light_is_silent() {
        let host = MockHost::new();
        let mut monitor = TrafficLightMonitor::default();
        assert!(monitor.update(&host, &at_speed(0.0), 0).is_none());
        assert!(!monitor.is_stopped());
    }

    #[test]
    fn test_throttled() {
        let host = with_light();
        let mut monitor = TrafficLightMonitor::default();
        monitor.update(&host, &at_speed(10.0), 0);
        assert!(monitor.update(&host, &at_speed(0.0), 100).is_none());
        assert!(!monitor.is_stopped());
    }
}
