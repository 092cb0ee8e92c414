//! Minimal kinematics on top of the mock host

use host::geometry::bearing;
use host::mock::{HostCall, MockHost};
use host::Vec3;

#[derive(Debug, Clone, Copy)]
enum Drive {
    Wander,
    To(Vec3),
}

/// Moves the mock vehicle the way the host AI would follow the commands
/// the core issued
pub struct SimWorld {
    pub host: MockHost,
    /// Something in front of the vehicle; it cannot move
    pub blocked: bool,
    drive: Option<Drive>,
    cruise: f32,
    hold_until_ms: i64,
    seen_calls: usize,
}

impl SimWorld {
    pub fn new(host: MockHost) -> Self {
        Self {
            host,
            blocked: false,
            drive: None,
            cruise: 0.0,
            hold_until_ms: 0,
            seen_calls: 0,
        }
    }

    fn observe(&mut self, now_ms: i64) {
        for call in &self.host.calls[self.seen_calls..] {
            match call {
                HostCall::DriveWander { speed, .. } => {
                    self.drive = Some(Drive::Wander);
                    self.cruise = *speed;
                }
                HostCall::DriveToCoord {
                    destination, speed, ..
                } => {
                    self.drive = Some(Drive::To(*destination));
                    self.cruise = *speed;
                }
                HostCall::SetCruiseSpeed(speed) => self.cruise = *speed,
                HostCall::ClearTasks => self.drive = None,
                HostCall::TempAction { duration_ms, .. } => {
                    self.hold_until_ms = now_ms + i64::from(*duration_ms);
                }
                _ => {}
            }
        }
        self.seen_calls = self.host.calls.len();
    }

    /// Apply new commands, then move the vehicle for `dt_s` seconds
    pub fn advance(&mut self, now_ms: i64, dt_s: f32) {
        self.observe(now_ms);
        let moving = !self.blocked && now_ms >= self.hold_until_ms;
        let drive = self.drive;
        let cruise = self.cruise;
        let Some(vehicle) = self.host.vehicle.as_mut() else {
            return;
        };

        let motion = match drive.filter(|_| moving) {
            Some(Drive::Wander) => Some((vehicle.heading, cruise)),
            Some(Drive::To(destination)) => {
                let remaining = vehicle.position.distance_2d(destination);
                (remaining > 1.0).then(|| {
                    (
                        bearing(vehicle.position, destination),
                        cruise.min(remaining / dt_s.max(0.001)),
                    )
                })
            }
            None => None,
        };

        match motion {
            Some((heading, speed)) => {
                vehicle.heading = heading;
                vehicle.speed = speed;
                vehicle.position = vehicle.position.offset_along(heading, speed * dt_s);
            }
            None => vehicle.speed = 0.0,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.host.vehicle.as_ref().map_or(Vec3::ZERO, |v| v.position)
    }

    pub fn heading(&self) -> f32 {
        self.host.vehicle.as_ref().map_or(0.0, |v| v.heading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::mock::{MOCK_ACTOR, MOCK_VEHICLE};
    use host::VehicleControl;

    #[test]
    fn test_wander_moves_along_heading() {
        let mut world = SimWorld::new(MockHost::new());
        world
            .host
            .issue_drive_wander(MOCK_ACTOR, MOCK_VEHICLE, 10.0, 0)
            .unwrap();
        world.advance(0, 1.0);
        assert!((world.position().y - 10.0).abs() < 1e-3);
    }

    #[test]
    fn test_blocked_vehicle_stays() {
        let mut world = SimWorld::new(MockHost::new());
        world.blocked = true;
        world
            .host
            .issue_drive_wander(MOCK_ACTOR, MOCK_VEHICLE, 10.0, 0)
            .unwrap();
        world.advance(0, 1.0);
        assert_eq!(world.position(), Vec3::ZERO);
    }

    #[test]
    fn test_drive_to_stops_at_destination() {
        let mut world = SimWorld::new(MockHost::new());
        let destination = Vec3::new(0.0, 15.0, 0.0);
        world
            .host
            .issue_drive_to_coord(MOCK_ACTOR, MOCK_VEHICLE, destination, 10.0, 0, 4.0, false)
            .unwrap();
        world.advance(0, 1.0);
        world.advance(1_000, 1.0);
        world.advance(2_000, 1.0);
        assert!(world.position().distance_2d(destination) < 1e-3);
        assert_eq!(world.host.vehicle.as_ref().map(|v| v.speed), Some(0.0));
    }
}
