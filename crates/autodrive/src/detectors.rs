//! Per-session detector set

use crate::config::AutoDriveConfig;
use crate::style::StyleProfile;
use environment::{TimeOfDayMonitor, WeatherMonitor};
use recovery::VehicleStateMonitor;
use road::{CurveAnalyzer, LaneChangeDetector, RoadTypeMonitor, StructureDetector, TrafficLightMonitor};
use traffic::{
    CollisionDetector, EmergencyVehicleHandler, FollowingMonitor, OvertakeTracker,
    SmoothSpeedController,
};

/// Every stateful detector the tick drives, owned in one place so a stop
/// can reset them together
pub(crate) struct Detectors {
    pub vehicle_state: VehicleStateMonitor,
    pub traffic_light: TrafficLightMonitor,
    pub structures: StructureDetector,
    pub weather: WeatherMonitor,
    pub time_of_day: TimeOfDayMonitor,
    pub collision: CollisionDetector,
    pub following: FollowingMonitor,
    pub smoothing: SmoothSpeedController,
    pub emergency: EmergencyVehicleHandler,
    pub lanes: LaneChangeDetector,
    pub overtake: OvertakeTracker,
    pub curves: CurveAnalyzer,
    pub road_type: RoadTypeMonitor,
}

impl Detectors {
    pub fn new(config: &AutoDriveConfig, profile: &StyleProfile) -> Self {
        Self {
            vehicle_state: VehicleStateMonitor::new(config.vehicle_state.clone()),
            traffic_light: TrafficLightMonitor::new(config.traffic_light.clone()),
            structures: StructureDetector::new(config.structure.clone()),
            weather: WeatherMonitor::new(config.weather.clone()),
            time_of_day: TimeOfDayMonitor::new(config.time_of_day.clone()),
            collision: CollisionDetector::new(config.collision.clone()),
            following: FollowingMonitor::new(config.following.clone()),
            smoothing: SmoothSpeedController::new(profile.accel_rate, profile.decel_rate),
            emergency: EmergencyVehicleHandler::new(config.emergency.clone()),
            lanes: LaneChangeDetector::new(config.lane.clone()),
            overtake: OvertakeTracker::new(config.overtake.clone()),
            curves: CurveAnalyzer::new(config.curve.clone()),
            road_type: RoadTypeMonitor::new(config.road_type.clone()),
        }
    }

    pub fn reset(&mut self) {
        self.vehicle_state.reset();
        self.traffic_light.reset();
        self.structures.reset();
        self.weather.reset();
        self.time_of_day.reset();
        self.collision.reset();
        self.following.reset();
        self.smoothing.reset();
        self.emergency.reset();
        self.lanes.reset();
        self.overtake.reset();
        self.curves.reset();
        self.road_type.reset();
    }
}
