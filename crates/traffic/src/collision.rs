//! Forward collision warning
//!
//! Tracks the closest vehicle inside a forward cone and grades the threat
//! 0 to 4 from the worse of a time-to-collision ladder and a raw distance
//! ladder. Only escalations are spoken.

use announce::{Announcement, Category, Priority};
use host::geometry::{bearing, heading_delta, pan_for_relative_bearing};
use host::{EntityId, VehicleSnapshot, WorldQuery};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const MAX_LEVEL: u8 = 4;

/// Collision detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    pub check_interval_ms: i64,
    /// Minimum scan radius (m)
    pub base_radius: f32,
    /// Scan radius grows with speed times this (s)
    pub radius_speed_factor: f32,
    /// Half angle of the forward cone (degrees)
    pub cone_half_angle_deg: f32,
    /// Time-to-collision thresholds for levels 1..=4 (s)
    pub ttc_thresholds: [f32; 4],
    /// Distance thresholds for levels 1..=4 (m)
    pub distance_thresholds: [f32; 4],
    /// Distance ladder only applies while we move faster than this (m/s)
    pub min_moving_speed: f32,
    /// Minimum time between two announcements of the same level (ms)
    pub level_cooldown_ms: i64,
    /// Beacons start at this level
    pub beacon_min_level: u8,
    pub beacon_base_frequency: f32,
    pub beacon_frequency_step: f32,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 250,
            base_radius: 30.0,
            radius_speed_factor: 3.0,
            cone_half_angle_deg: 30.0,
            ttc_thresholds: [6.0, 4.0, 2.5, 1.5],
            distance_thresholds: [25.0, 15.0, 8.0, 4.0],
            min_moving_speed: 1.0,
            level_cooldown_ms: 4_000,
            beacon_min_level: 2,
            beacon_base_frequency: 440.0,
            beacon_frequency_step: 220.0,
        }
    }
}

/// Panned audio pulse request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Beacon {
    pub pan: f32,
    pub frequency: f32,
    pub gain: f32,
}

/// Closest vehicle in the forward cone
#[derive(Debug, Clone, PartialEq)]
pub struct CollisionThreat {
    pub id: EntityId,
    pub distance: f32,
    /// Positive when the gap is shrinking (m/s)
    pub closing_speed: f32,
    pub ttc: Option<f32>,
    /// Degrees from our heading, positive right
    pub relative_bearing: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollisionUpdate {
    pub level: u8,
    pub threat: Option<CollisionThreat>,
    pub announcement: Option<Announcement>,
    pub beacon: Option<Beacon>,
}

pub struct CollisionDetector {
    config: CollisionConfig,
    last_check_ms: Option<i64>,
    level: u8,
    threat: Option<CollisionThreat>,
    /// Highest level announced since the gap last cleared
    announced_level: u8,
    last_announced: [Option<i64>; MAX_LEVEL as usize + 1],
}

fn ladder_level(value: f32, thresholds: &[f32; 4]) -> u8 {
    thresholds.iter().filter(|t| value <= **t).count() as u8
}

impl CollisionDetector {
    pub fn new(config: CollisionConfig) -> Self {
        Self {
            config,
            last_check_ms: None,
            level: 0,
            threat: None,
            announced_level: 0,
            last_announced: [None; MAX_LEVEL as usize + 1],
        }
    }

    pub fn level(&self) -> u8 {
        self.level
    }

    /// Distance to the closest vehicle in the forward cone from the last scan
    pub fn closest_ahead(&self) -> Option<f32> {
        self.threat.as_ref().map(|t| t.distance)
    }

    /// Warning level from a measured gap
    pub fn grade(&self, distance: f32, ttc: Option<f32>, own_speed: f32) -> u8 {
        let by_ttc = ttc.map_or(0, |t| ladder_level(t, &self.config.ttc_thresholds));
        let by_distance = if own_speed > self.config.min_moving_speed {
            ladder_level(distance, &self.config.distance_thresholds)
        } else {
            0
        };
        by_ttc.max(by_distance)
    }

    pub fn update(
        &mut self,
        world: &dyn WorldQuery,
        vehicle: &VehicleSnapshot,
        now_ms: i64,
    ) -> CollisionUpdate {
        if let Some(last) = self.last_check_ms {
            if now_ms - last < self.config.check_interval_ms {
                return CollisionUpdate {
                    level: self.level,
                    threat: self.threat.clone(),
                    ..Default::default()
                };
            }
        }
        self.last_check_ms = Some(now_ms);

        let radius = self
            .config
            .base_radius
            .max(vehicle.speed * self.config.radius_speed_factor);
        let nearby = match world.nearby_vehicles(vehicle.position, radius) {
            Ok(nearby) => nearby,
            Err(e) => {
                warn!("Nearby vehicle scan failed: {}", e);
                return CollisionUpdate {
                    level: self.level,
                    threat: self.threat.clone(),
                    ..Default::default()
                };
            }
        };

        let mut closest: Option<CollisionThreat> = None;
        for other in nearby.iter().filter(|o| o.id != vehicle.handle) {
            let distance = other.position.distance_2d(vehicle.position);
            let relative = heading_delta(vehicle.heading, bearing(vehicle.position, other.position));
            if relative.abs() > self.config.cone_half_angle_deg {
                continue;
            }
            if closest.as_ref().map_or(false, |c| c.distance <= distance) {
                continue;
            }
            let along = heading_delta(vehicle.heading, other.heading).to_radians().cos();
            let closing_speed = vehicle.speed - other.speed * along;
            let ttc = (closing_speed > 0.1).then(|| distance / closing_speed);
            closest = Some(CollisionThreat {
                id: other.id,
                distance,
                closing_speed,
                ttc,
                relative_bearing: relative,
            });
        }

        let level = closest
            .as_ref()
            .map_or(0, |t| self.grade(t.distance, t.ttc, vehicle.speed));
        let previous = self.level;
        self.level = level;
        self.threat = closest;

        let mut update = CollisionUpdate {
            level,
            threat: self.threat.clone(),
            ..Default::default()
        };

        if level == 0 {
            self.announced_level = 0;
        }
        if level > 0 && (level > self.announced_level || level == MAX_LEVEL) {
            let slot = level as usize;
            let cooled = self.last_announced[slot]
                .map_or(true, |t| now_ms - t >= self.config.level_cooldown_ms);
            if cooled {
                self.last_announced[slot] = Some(now_ms);
                self.announced_level = level;
                update.announcement = self.threat.as_ref().map(|t| announcement(level, t));
            }
        } else if level < previous {
            debug!("Collision level eased {} -> {}", previous, level);
        }

        if level >= self.config.beacon_min_level {
            update.beacon = self.threat.as_ref().map(|t| Beacon {
                pan: pan_for_relative_bearing(t.relative_bearing),
                frequency: self.config.beacon_base_frequency
                    + self.config.beacon_frequency_step
                        * f32::from(level - self.config.beacon_min_level),
                gain: (0.4 + 0.15 * f32::from(level)).min(1.0),
            });
        }

        update
    }

    pub fn reset(&mut self) {
        self.last_check_ms = None;
        self.level = 0;
        self.threat = None;
        self.announced_level = 0;
        self.last_announced = [None; MAX_LEVEL as usize + 1];
    }
}

impl Default for CollisionDetector {
    fn default() -> Self {
        Self::new(CollisionConfig::default())
    }
}

fn announcement(level: u8, threat: &CollisionThreat) -> Announcement {
    let (text, priority) = match level {
        1 => ("Vehicle ahead.".to_string(), Priority::Low),
        2 => (
            format!("Caution, vehicle ahead, {:.0} meters.", threat.distance),
            Priority::Medium,
        ),
        3 => ("Warning, closing fast on vehicle ahead.".to_string(), Priority::High),
        _ => ("Brake! Collision imminent.".to_string(), Priority::Critical),
    };
    Announcement::new(text, priority, Category::Collision)
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::mock::{MockHost, MOCK_VEHICLE};
    use host::{NearbyVehicle, Vec3};
    use proptest::prelude::*;

    fn own(speed: f32) -> VehicleSnapshot {
        let mut v = VehicleSnapshot::at_rest(MOCK_VEHICLE, Vec3::ZERO, 0.0);
        v.speed = speed;
        v
    }

    fn car(id: u32, x: f32, y: f32, heading: f32, speed: f32) -> NearbyVehicle {
        NearbyVehicle {
            id: EntityId(id),
            position: Vec3::new(x, y, 0.0),
            heading,
            speed,
            siren_active: false,
        }
    }

    #[test]
    fn test_stopped_car_ahead_escalates() {
        let mut host = MockHost::new();
        host.nearby.push(car(10, 0.0, 40.0, 0.0, 0.0));
        let mut detector = CollisionDetector::default();

        // 40 m at 20 m/s: ttc 2.0 s -> level 3
        let update = detector.update(&host, &own(20.0), 0);
        assert_eq!(update.level, 3);
        let a = update.announcement.expect("escalation");
        assert_eq!(a.priority, Priority::High);
        assert!(update.beacon.is_some());

        // Same level again: silent
        let update = detector.update(&host, &own(20.0), 250);
        assert_eq!(update.level, 3);
        assert!(update.announcement.is_none());

        // Closer: imminent
        host.nearby[0].position = Vec3::new(0.0, 20.0, 0.0);
        let update = detector.update(&host, &own(20.0), 500);
        assert_eq!(update.level, 4);
        assert_eq!(update.announcement.expect("critical").priority, Priority::Critical);
    }

    #[test]
    fn test_deescalation_is_silent() {
        let mut host = MockHost::new();
        host.nearby.push(car(10, 0.0, 20.0, 0.0, 0.0));
        let mut detector = CollisionDetector::default();
        assert_eq!(detector.update(&host, &own(20.0), 0).level, 4);

        host.nearby.clear();
        let update = detector.update(&host, &own(20.0), 250);
        assert_eq!(update.level, 0);
        assert!(update.announcement.is_none());
        assert!(detector.closest_ahead().is_none());
    }

    /// Stopped car `distance` ahead while we roll at 3 m/s
    fn announced_at(detector: &mut CollisionDetector, distance: f32, now_ms: i64) -> (u8, bool) {
        let mut host = MockHost::new();
        host.nearby.push(car(10, 0.0, distance, 0.0, 0.0));
        let update = detector.update(&host, &own(3.0), now_ms);
        (update.level, update.announcement.is_some())
    }

    #[test]
    fn test_announces_only_above_last_announced_level() {
        let mut detector = CollisionDetector::default();
        let steps: Vec<(u8, bool)> = [20.0, 12.0, 7.0, 12.0, 20.0, 3.0]
            .iter()
            .enumerate()
            .map(|(i, d)| announced_at(&mut detector, *d, i as i64 * 10_000))
            .collect();
        assert_eq!(
            steps,
            vec![
                (1, true),
                (2, true),
                (3, true),
                (2, false),
                (1, false),
                (4, true)
            ]
        );
    }

    #[test]
    fn test_flicker_below_announced_level_is_silent() {
        let mut detector = CollisionDetector::default();
        assert_eq!(announced_at(&mut detector, 20.0, 0), (1, true));
        assert_eq!(announced_at(&mut detector, 12.0, 10_000), (2, true));
        assert_eq!(announced_at(&mut detector, 20.0, 20_000), (1, false));
        assert_eq!(announced_at(&mut detector, 12.0, 30_000), (2, false));

        // Clearing the gap re-arms the ladder
        assert_eq!(announced_at(&mut detector, 200.0, 40_000), (0, false));
        assert_eq!(announced_at(&mut detector, 12.0, 50_000), (2, true));
    }

    #[test]
    fn test_receding_vehicle_uses_distance_only() {
        let mut host = MockHost::new();
        // 20 m ahead, faster than us
        host.nearby.push(car(10, 0.0, 20.0, 0.0, 30.0));
        let mut detector = CollisionDetector::default();
        let update = detector.update(&host, &own(10.0), 0);
        assert_eq!(update.threat.as_ref().and_then(|t| t.ttc), None);
        assert_eq!(update.level, 1);
    }

    #[test]
    fn test_vehicle_outside_cone_ignored() {
        let mut host = MockHost::new();
        host.nearby.push(car(10, 20.0, 5.0, 0.0, 0.0));
        host.nearby.push(car(11, 0.0, -10.0, 0.0, 0.0));
        let mut detector = CollisionDetector::default();
        let update = detector.update(&host, &own(15.0), 0);
        assert_eq!(update.level, 0);
        assert!(update.threat.is_none());
    }

    #[test]
    fn test_max_level_repeats_after_cooldown() {
        let mut host = MockHost::new();
        host.nearby.push(car(10, 0.0, 10.0, 0.0, 0.0));
        let mut detector = CollisionDetector::default();
        assert!(detector.update(&host, &own(15.0), 0).announcement.is_some());
        assert!(detector.update(&host, &own(15.0), 1_000).announcement.is_none());
        assert!(detector.update(&host, &own(15.0), 4_000).announcement.is_some());
    }

    #[test]
    fn test_stationary_own_vehicle_ignores_distance() {
        let mut host = MockHost::new();
        host.nearby.push(car(10, 0.0, 5.0, 0.0, 0.0));
        let mut detector = CollisionDetector::default();
        assert_eq!(detector.update(&host, &own(0.0), 0).level, 0);
    }

    proptest! {
        #[test]
        fn prop_level_never_decreases_when_closer(
            d in 1.0f32..100.0,
            shrink in 0.0f32..1.0,
            speed in 0.0f32..40.0,
        ) {
            let detector = CollisionDetector::default();
            let closer = d * shrink;
            let ttc = |dist: f32| (speed > 0.1).then(|| dist / speed);
            prop_assert!(
                detector.grade(closer, ttc(closer), speed) >= detector.grade(d, ttc(d), speed)
            );
        }
    }
}
