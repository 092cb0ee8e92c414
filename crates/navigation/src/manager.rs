//! Navigation session and per-tick progress

use crate::eta::{EtaConfig, EtaEstimator};
use crate::milestones::{MilestoneConfig, MilestoneTracker};
use crate::safe_position::{resolve_safe_arrival, SafeArrival, SafePositionConfig};
use announce::{Announcement, Category};
use host::{RoadQuery, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Navigation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    pub safe_position: SafePositionConfig,
    pub milestones: MilestoneConfig,
    pub eta: EtaConfig,
    /// Waypoint displacement that triggers a restart (m)
    pub waypoint_moved_threshold: f32,
    /// Final approach latches inside this distance (m)
    pub final_approach_distance: f32,
    /// Cruise speed during final approach (m/s)
    pub final_approach_speed: f32,
    /// Arrival radius once in final approach (m)
    pub arrival_radius_final: f32,
    /// Arrival radius before final approach (m)
    pub arrival_radius_coarse: f32,
    /// Linear slowdown band (m)
    pub slowdown_distance: f32,
    /// Slowdown speed per meter remaining (1/s)
    pub slowdown_speed_factor: f32,
    pub slowdown_min_speed: f32,
    /// Only re-apply the slowdown speed when it moved by more than this (m/s)
    pub slowdown_hysteresis: f32,
    /// Destinations beyond this use the long-range task (m)
    pub long_range_distance: f32,
    /// Arrival radius handed to the host drive task (m)
    pub task_arrival_radius: f32,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            safe_position: SafePositionConfig::default(),
            milestones: MilestoneConfig::default(),
            eta: EtaConfig::default(),
            waypoint_moved_threshold: 10.0,
            final_approach_distance: 50.0,
            final_approach_speed: 6.0,
            arrival_radius_final: 5.0,
            arrival_radius_coarse: 15.0,
            slowdown_distance: 150.0,
            slowdown_speed_factor: 0.15,
            slowdown_min_speed: 5.0,
            slowdown_hysteresis: 1.0,
            long_range_distance: 1_000.0,
            task_arrival_radius: 4.0,
        }
    }
}

/// One drive-to-waypoint session
#[derive(Debug, Clone)]
pub struct NavigationSession {
    /// Waypoint position when the session started
    pub original_target: Vec3,
    pub arrival: SafeArrival,
    pub final_approach: bool,
    /// Currently applied arrival slowdown speed
    pub slowdown_speed: Option<f32>,
    pub started_ms: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressOutcome {
    Continue,
    /// Session over (arrived or waypoint removed)
    Stop,
    /// Waypoint moved; re-resolve and reissue next tick
    Restart,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedCommand {
    Set(f32),
    /// Drop the arrival slowdown and return to the environmental speed
    EndSlowdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub outcome: ProgressOutcome,
    pub speed: Option<SpeedCommand>,
    pub announcements: Vec<Announcement>,
}

impl ProgressUpdate {
    fn proceed() -> Self {
        Self {
            outcome: ProgressOutcome::Continue,
            speed: None,
            announcements: Vec::new(),
        }
    }
}

pub struct NavigationManager {
    config: NavigationConfig,
    session: Option<NavigationSession>,
    milestones: MilestoneTracker,
    eta: EtaEstimator,
}

impl NavigationManager {
    pub fn new(config: NavigationConfig) -> Self {
        Self {
            milestones: MilestoneTracker::new(config.milestones.clone()),
            eta: EtaEstimator::new(config.eta.clone()),
            config,
            session: None,
        }
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Resolve the arrival position and open a session
    pub fn begin(&mut self, road: &dyn RoadQuery, target: Vec3, now_ms: i64) -> &NavigationSession {
        let arrival = resolve_safe_arrival(road, target, &self.config.safe_position);
        info!(
            "Navigation to ({:.0}, {:.0}) via {:?}",
            arrival.position.x, arrival.position.y, arrival.strategy
        );
        self.milestones.reset();
        self.eta.reset();
        self.session.insert(NavigationSession {
            original_target: target,
            arrival,
            final_approach: false,
            slowdown_speed: None,
            started_ms: now_ms,
        })
    }

    pub fn end(&mut self) {
        self.session = None;
        self.milestones.reset();
        self.eta.reset();
    }

    pub fn session(&self) -> Option<&NavigationSession> {
        self.session.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// `min(distance to arrival point, distance to raw waypoint)`
    pub fn remaining_distance(&self, position: Vec3) -> Option<f32> {
        self.session.as_ref().map(|s| {
            position
                .distance_2d(s.arrival.position)
                .min(position.distance_2d(s.original_target))
        })
    }

    pub fn is_long_range(&self, from: Vec3) -> bool {
        self.remaining_distance(from)
            .map_or(false, |d| d > self.config.long_range_distance)
    }

    /// Speed the arrival logic currently imposes, if any
    pub fn slowdown_speed(&self) -> Option<f32> {
        self.session.as_ref().and_then(|s| s.slowdown_speed)
    }

    pub fn update_eta(&mut self, position: Vec3, speed: f32, now_ms: i64) -> Option<Announcement> {
        let remaining = self.remaining_distance(position)?;
        self.eta.sample(speed, now_ms);
        self.eta.periodic(remaining, now_ms)
    }

    pub fn eta_announcement(&self, position: Vec3) -> Option<Announcement> {
        self.remaining_distance(position)
            .map(|remaining| self.eta.on_demand(remaining))
    }

    pub fn update_progress(
        &mut self,
        waypoint: Option<Vec3>,
        position: Vec3,
        _now_ms: i64,
    ) -> ProgressUpdate {
        let Some(session) = self.session.as_mut() else {
            return ProgressUpdate::proceed();
        };
        let mut update = ProgressUpdate::proceed();
        let ending_speed = session.slowdown_speed.map(|_| SpeedCommand::EndSlowdown);

        let Some(waypoint) = waypoint else {
            info!("Waypoint removed");
            update.outcome = ProgressOutcome::Stop;
            update.speed = ending_speed;
            update.announcements.push(Announcement::high(
                "Waypoint removed. AutoDrive stopping.",
                Category::Navigation,
            ));
            return update;
        };

        if waypoint.distance_2d(session.original_target) > self.config.waypoint_moved_threshold {
            info!("Waypoint moved, restarting navigation");
            update.outcome = ProgressOutcome::Restart;
            update.announcements.push(Announcement::medium(
                "Waypoint moved. Recalculating.",
                Category::Navigation,
            ));
            return update;
        }

        let distance = position
            .distance_2d(session.arrival.position)
            .min(position.distance_2d(session.original_target));

        let radius = if session.final_approach {
            self.config.arrival_radius_final
        } else {
            self.config.arrival_radius_coarse
        };
        if distance < radius {
            info!("Arrived, {:.1} m from destination", distance);
            update.outcome = ProgressOutcome::Stop;
            update.speed = ending_speed;
            update.announcements.push(Announcement::high(
                "Arrived at destination.",
                Category::Navigation,
            ));
            return update;
        }

        if !session.final_approach && distance <= self.config.final_approach_distance {
            debug!("Final approach at {:.0} m", distance);
            session.final_approach = true;
            session.slowdown_speed = Some(self.config.final_approach_speed);
            update.speed = Some(SpeedCommand::Set(self.config.final_approach_speed));
            update.announcements.push(Announcement::medium(
                "Final approach.",
                Category::Navigation,
            ));
        } else if !session.final_approach && distance <= self.config.slowdown_distance {
            let target = (distance * self.config.slowdown_speed_factor)
                .max(self.config.slowdown_min_speed);
            let changed = session
                .slowdown_speed
                .map_or(true, |s| (s - target).abs() > self.config.slowdown_hysteresis);
            if changed {
                if session.slowdown_speed.is_none() {
                    update.announcements.push(Announcement::low(
                        "Approaching destination. Slowing down.",
                        Category::Navigation,
                    ));
                }
                session.slowdown_speed = Some(target);
                update.speed = Some(SpeedCommand::Set(target));
            }
        }

        if let Some(text) = self.milestones.update(distance) {
            update
                .announcements
                .push(Announcement::low(text, Category::Navigation));
        }

        update
    }
}

impl Default for NavigationManager {
    fn default() -> Self {
        Self::new(NavigationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::safe_position::ArrivalStrategy;
    use host::mock::MockHost;
    use host::RoadNode;
    use proptest::prelude::*;

    fn session_to(target: Vec3) -> NavigationManager {
        let mut host = MockHost::new();
        host.road_nodes.push(RoadNode::new(target, 0.0));
        let mut nav = NavigationManager::default();
        nav.begin(&host, target, 0);
        nav
    }

    #[test]
    fn test_begin_resolves_arrival() {
        let target = Vec3::new(0.0, 500.0, 0.0);
        let nav = session_to(target);
        let session = nav.session().expect("active");
        assert_eq!(session.arrival.strategy, ArrivalStrategy::NodeWithHeading);
        assert!(!nav.is_long_range(Vec3::ZERO));
        assert!(nav.is_long_range(Vec3::new(0.0, -1_000.0, 0.0)));
    }

    #[test]
    fn test_waypoint_removed_stops() {
        let mut nav = session_to(Vec3::new(0.0, 500.0, 0.0));
        let update = nav.update_progress(None, Vec3::ZERO, 100);
        assert_eq!(update.outcome, ProgressOutcome::Stop);
        assert!(update.announcements[0].text.contains("removed"));
    }

    #[test]
    fn test_waypoint_moved_restarts() {
        let target = Vec3::new(0.0, 500.0, 0.0);
        let mut nav = session_to(target);
        let small = nav.update_progress(Some(Vec3::new(5.0, 500.0, 0.0)), Vec3::ZERO, 100);
        assert_eq!(small.outcome, ProgressOutcome::Continue);
        let moved = nav.update_progress(Some(Vec3::new(50.0, 500.0, 0.0)), Vec3::ZERO, 200);
        assert_eq!(moved.outcome, ProgressOutcome::Restart);
    }

    #[test]
    fn test_slowdown_band_with_hysteresis() {
        let target = Vec3::new(0.0, 500.0, 0.0);
        let mut nav = session_to(target);

        let set_speed = |update: &ProgressUpdate| match update.speed {
            Some(SpeedCommand::Set(speed)) => Some(speed),
            _ => None,
        };

        let update = nav.update_progress(Some(target), Vec3::new(0.0, 380.0, 0.0), 0);
        assert!((set_speed(&update).expect("slowdown") - 18.0).abs() < 1e-3);

        // 119 m -> 17.85 m/s, within hysteresis
        let update = nav.update_progress(Some(target), Vec3::new(0.0, 381.0, 0.0), 100);
        assert_eq!(update.speed, None);

        let update = nav.update_progress(Some(target), Vec3::new(0.0, 400.0, 0.0), 200);
        assert!((set_speed(&update).expect("slowdown") - 15.0).abs() < 1e-3);
    }

    #[test]
    fn test_final_approach_latches() {
        let target = Vec3::new(0.0, 500.0, 0.0);
        let mut nav = session_to(target);

        let update = nav.update_progress(Some(target), Vec3::new(0.0, 460.0, 0.0), 0);
        assert_eq!(update.speed, Some(SpeedCommand::Set(6.0)));
        assert!(nav.session().unwrap().final_approach);

        // Backing away does not clear the latch
        let update = nav.update_progress(Some(target), Vec3::new(0.0, 300.0, 0.0), 100);
        assert_eq!(update.outcome, ProgressOutcome::Continue);
        assert!(nav.session().unwrap().final_approach);
    }

    #[test]
    fn test_precise_radius_in_final_approach() {
        let target = Vec3::new(0.0, 500.0, 0.0);
        let mut nav = session_to(target);
        nav.update_progress(Some(target), Vec3::new(0.0, 460.0, 0.0), 0);

        // 10 m out: inside the coarse radius but not the precise one
        let update = nav.update_progress(Some(target), Vec3::new(0.0, 490.0, 0.0), 100);
        assert_eq!(update.outcome, ProgressOutcome::Continue);

        let update = nav.update_progress(Some(target), Vec3::new(0.0, 496.0, 0.0), 200);
        assert_eq!(update.outcome, ProgressOutcome::Stop);
        assert_eq!(update.speed, Some(SpeedCommand::EndSlowdown));
        assert_eq!(update.announcements[0].text, "Arrived at destination.");
    }

    #[test]
    fn test_coarse_radius_before_final_approach() {
        let target = Vec3::new(0.0, 500.0, 0.0);
        let mut nav = session_to(target);
        let update = nav.update_progress(Some(target), Vec3::new(0.0, 488.0, 0.0), 0);
        assert_eq!(update.outcome, ProgressOutcome::Stop);
        assert_eq!(update.speed, None);
    }

    #[test]
    fn test_eta_requires_session() {
        let mut nav = NavigationManager::default();
        assert!(nav.update_eta(Vec3::ZERO, 10.0, 0).is_none());
        assert!(nav.eta_announcement(Vec3::ZERO).is_none());
    }

    proptest! {
        #[test]
        fn prop_slowdown_speed_bounded(d in 50.5f32..150.0) {
            let target = Vec3::new(0.0, 500.0, 0.0);
            let mut nav = session_to(target);
            let update = nav.update_progress(Some(target), Vec3::new(0.0, 500.0 - d, 0.0), 0);
            if let Some(SpeedCommand::Set(speed)) = update.speed {
                prop_assert!(speed >= 5.0);
                prop_assert!(speed <= 150.0 * 0.15 + 1e-3);
            } else {
                prop_assert!(false, "slowdown expected at {} m", d);
            }
        }
    }
}
