//! Emergency vehicle yielding

use crate::collision::Beacon;
use crate::direction_word;
use announce::{Announcement, Category};
use host::geometry::{bearing, heading_delta, pan_for_relative_bearing};
use host::{VehicleSnapshot, WorldQuery};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    pub check_interval_ms: i64,
    /// Sirens within this radius are announced (m)
    pub detection_radius: f32,
    /// Sirens within this radius make us pull over (m)
    pub yield_radius: f32,
    /// Resume once no siren has been seen for this long (ms)
    pub clear_after_ms: i64,
    /// Never yield longer than this (ms)
    pub max_yield_ms: i64,
    /// After a timed-out yield, ignore the same siren for this long (ms)
    pub reyield_suppress_ms: i64,
    /// Duration of each pull-over or hold maneuver (ms)
    pub hold_ms: u32,
    pub beacon_frequency: f32,
    pub beacon_gain: f32,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 500,
            detection_radius: 100.0,
            yield_radius: 50.0,
            clear_after_ms: 3_000,
            max_yield_ms: 30_000,
            reyield_suppress_ms: 15_000,
            hold_ms: 4_000,
            beacon_frequency: 880.0,
            beacon_gain: 0.6,
        }
    }
}

/// What the orchestrator should do with the vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YieldAction {
    None,
    /// Start pulling over
    Begin,
    /// Still yielding; renew the stop maneuver
    Hold,
    /// Emergency vehicle gone; restore cruise speed
    Resume,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyUpdate {
    pub action: YieldAction,
    pub announcement: Option<Announcement>,
    pub beacon: Option<Beacon>,
}

impl EmergencyUpdate {
    fn none() -> Self {
        Self {
            action: YieldAction::None,
            announcement: None,
            beacon: None,
        }
    }
}

pub struct EmergencyVehicleHandler {
    config: EmergencyConfig,
    last_check_ms: Option<i64>,
    yielding_since: Option<i64>,
    last_hold_ms: i64,
    last_seen_ms: i64,
    suppress_until_ms: i64,
    approach_announced: bool,
}

impl EmergencyVehicleHandler {
    pub fn new(config: EmergencyConfig) -> Self {
        Self {
            config,
            last_check_ms: None,
            yielding_since: None,
            last_hold_ms: 0,
            last_seen_ms: 0,
            suppress_until_ms: i64::MIN,
            approach_announced: false,
        }
    }

    pub fn is_yielding(&self) -> bool {
        self.yielding_since.is_some()
    }

    pub fn update(
        &mut self,
        world: &dyn WorldQuery,
        vehicle: &VehicleSnapshot,
        now_ms: i64,
    ) -> EmergencyUpdate {
        if let Some(last) = self.last_check_ms {
            if now_ms - last < self.config.check_interval_ms {
                return EmergencyUpdate::none();
            }
        }
        self.last_check_ms = Some(now_ms);

        let nearby = match world.nearby_vehicles(vehicle.position, self.config.detection_radius) {
            Ok(nearby) => nearby,
            Err(e) => {
                warn!("Siren scan failed: {}", e);
                return EmergencyUpdate::none();
            }
        };

        let siren = nearby
            .iter()
            .filter(|v| v.siren_active && v.id != vehicle.handle)
            .map(|v| (v.position.distance_2d(vehicle.position), v))
            .min_by(|a, b| a.0.total_cmp(&b.0));

        let mut update = EmergencyUpdate::none();
        let Some((distance, other)) = siren else {
            self.approach_announced = false;
            if let Some(since) = self.yielding_since {
                if now_ms - self.last_seen_ms >= self.config.clear_after_ms
                    || now_ms - since >= self.config.max_yield_ms
                {
                    return self.resume(now_ms, false);
                }
                if now_ms - self.last_hold_ms >= i64::from(self.config.hold_ms) {
                    self.last_hold_ms = now_ms;
                    update.action = YieldAction::Hold;
                }
            }
            return update;
        };

        self.last_seen_ms = now_ms;
        let relative = heading_delta(vehicle.heading, bearing(vehicle.position, other.position));
        let direction = direction_word(relative);
        update.beacon = Some(Beacon {
            pan: pan_for_relative_bearing(relative),
            frequency: self.config.beacon_frequency,
            gain: self.config.beacon_gain,
        });

        match self.yielding_since {
            None if distance <= self.config.yield_radius && now_ms >= self.suppress_until_ms => {
                info!("Yielding to emergency vehicle {} at {:.0} m", other.id, distance);
                self.yielding_since = Some(now_ms);
                self.last_hold_ms = now_ms;
                self.approach_announced = true;
                update.action = YieldAction::Begin;
                update.announcement = Some(Announcement::high(
                    format!("Emergency vehicle {}. Pulling over.", direction),
                    Category::Emergency,
                ));
            }
            None => {
                if !self.approach_announced {
                    self.approach_announced = true;
                    update.announcement = Some(Announcement::medium(
                        format!("Siren {}.", direction),
                        Category::Emergency,
                    ));
                }
            }
            Some(since) => {
                if now_ms - since >= self.config.max_yield_ms {
                    return self.resume(now_ms, true);
                }
                if now_ms - self.last_hold_ms >= i64::from(self.config.hold_ms) {
                    self.last_hold_ms = now_ms;
                    update.action = YieldAction::Hold;
                }
            }
        }
        update
    }

    fn resume(&mut self, now_ms: i64, timed_out: bool) -> EmergencyUpdate {
        self.yielding_since = None;
        if timed_out {
            info!("Yield timed out with siren still near, resuming");
            self.suppress_until_ms = now_ms + self.config.reyield_suppress_ms;
            self.approach_announced = true;
        } else {
            info!("Emergency vehicle cleared, resuming");
            self.approach_announced = false;
        }
        EmergencyUpdate {
            action: YieldAction::Resume,
            // Spoken even inside the pull-over line's category cooldown
            announcement: Some(Announcement::critical(
                "Emergency vehicle passed. Resuming.",
                Category::Emergency,
            )),
            beacon: None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}

impl Default for EmergencyVehicleHandler {
    fn default() -> Self {
        Self::new(EmergencyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::mock::{MockHost, MOCK_VEHICLE};
    use host::{EntityId, NearbyVehicle, Vec3};

    fn own() -> VehicleSnapshot {
        let mut v = VehicleSnapshot::at_rest(MOCK_VEHICLE, Vec3::ZERO, 0.0);
        v.speed = 15.0;
        v
    }

    fn siren_at(x: f32, y: f32) -> NearbyVehicle {
        NearbyVehicle {
            id: EntityId(50),
            position: Vec3::new(x, y, 0.0),
            heading: 0.0,
            speed: 25.0,
            siren_active: true,
        }
    }

    #[test]
    fn test_far_siren_announced_not_yielded() {
        let mut host = MockHost::new();
        host.nearby.push(siren_at(0.0, -80.0));
        let mut handler = EmergencyVehicleHandler::default();

        let update = handler.update(&host, &own(), 0);
        assert_eq!(update.action, YieldAction::None);
        assert_eq!(update.announcement.expect("siren").text, "Siren behind.");
        assert!(update.beacon.is_some());
        assert!(handler.update(&host, &own(), 500).announcement.is_none());
    }

    #[test]
    fn test_yield_then_resume() {
        let mut host = MockHost::new();
        host.nearby.push(siren_at(0.0, -30.0));
        let mut handler = EmergencyVehicleHandler::default();

        let begin = handler.update(&host, &own(), 0);
        assert_eq!(begin.action, YieldAction::Begin);
        assert_eq!(
            begin.announcement.expect("yield").text,
            "Emergency vehicle behind. Pulling over."
        );
        assert!(handler.is_yielding());

        host.nearby.clear();
        assert_eq!(handler.update(&host, &own(), 1_000).action, YieldAction::None);
        let resume = handler.update(&host, &own(), 3_000);
        assert_eq!(resume.action, YieldAction::Resume);
        assert!(!handler.is_yielding());
    }

    #[test]
    fn test_hold_renewed_while_siren_present() {
        let mut host = MockHost::new();
        host.nearby.push(siren_at(10.0, 0.0));
        let mut handler = EmergencyVehicleHandler::default();
        assert_eq!(handler.update(&host, &own(), 0).action, YieldAction::Begin);
        assert_eq!(handler.update(&host, &own(), 2_000).action, YieldAction::None);
        assert_eq!(handler.update(&host, &own(), 4_000).action, YieldAction::Hold);
    }

    #[test]
    fn test_yield_times_out() {
        let mut host = MockHost::new();
        host.nearby.push(siren_at(0.0, 20.0));
        let mut handler = EmergencyVehicleHandler::default();
        handler.update(&host, &own(), 0);
        let update = handler.update(&host, &own(), 30_000);
        assert_eq!(update.action, YieldAction::Resume);
    }

    #[test]
    fn test_timed_out_yield_not_reentered_at_once() {
        let mut host = MockHost::new();
        host.nearby.push(siren_at(0.0, 20.0));
        let mut handler = EmergencyVehicleHandler::default();
        assert_eq!(handler.update(&host, &own(), 0).action, YieldAction::Begin);
        assert_eq!(handler.update(&host, &own(), 30_000).action, YieldAction::Resume);

        // Siren still beside us: keep driving, no new announcement
        let update = handler.update(&host, &own(), 30_500);
        assert_eq!(update.action, YieldAction::None);
        assert!(update.announcement.is_none());
        assert!(!handler.is_yielding());
        assert_eq!(handler.update(&host, &own(), 44_500).action, YieldAction::None);

        assert_eq!(handler.update(&host, &own(), 45_000).action, YieldAction::Begin);
    }

    #[test]
    fn test_resume_line_is_critical() {
        let mut host = MockHost::new();
        host.nearby.push(siren_at(0.0, -30.0));
        let mut handler = EmergencyVehicleHandler::default();
        handler.update(&host, &own(), 0);
        host.nearby.clear();
        let resume = handler.update(&host, &own(), 3_000);
        let line = resume.announcement.expect("resume line");
        assert_eq!(line.text, "Emergency vehicle passed. Resuming.");
        assert_eq!(line.priority, announce::Priority::Critical);
    }

    #[test]
    fn test_silent_vehicle_ignored() {
        let mut host = MockHost::new();
        let mut quiet = siren_at(0.0, -10.0);
        quiet.siren_active = false;
        host.nearby.push(quiet);
        let mut handler = EmergencyVehicleHandler::default();
        assert_eq!(handler.update(&host, &own(), 0), EmergencyUpdate::none());
    }
}
