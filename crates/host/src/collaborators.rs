//! Collaborator traits implemented by the embedding game runtime

use crate::geometry::Vec3;
use crate::types::{
    EntityId, NearbyVehicle, PlayerContext, RoadNode, TempAction, VehicleSnapshot, WeatherKind,
};
use crate::HostError;

/// Road graph queries. `Ok(None)` means the query ran and found nothing.
pub trait RoadQuery {
    /// Closest road node and the road heading there
    fn nearest_node_with_heading(&self, point: Vec3) -> Result<Option<(Vec3, f32)>, HostError>;

    /// Closest road node position
    fn nearest_node(&self, point: Vec3) -> Result<Option<Vec3>, HostError>;

    /// `n`-th closest road node (1 = closest)
    fn nth_nearest_node(&self, point: Vec3, n: u32) -> Result<Option<Vec3>, HostError>;

    /// Closest road node with density, flags and lane counts
    fn node_properties(&self, point: Vec3) -> Result<Option<RoadNode>, HostError>;

    /// Pedestrian-safe ground coordinate near `point`
    fn safe_ground_position(&self, point: Vec3, flags: u32) -> Result<Option<Vec3>, HostError>;

    /// Point at the side of the road nearest `point`
    fn point_on_road_side(&self, point: Vec3, side: i32) -> Result<Option<Vec3>, HostError>;

    /// Height of the first solid surface below `point` (water counts as no ground)
    fn ground_height(&self, point: Vec3) -> Result<Option<f32>, HostError>;
}

/// Commands to the host's vehicle AI
pub trait VehicleControl {
    fn issue_drive_wander(
        &mut self,
        actor: EntityId,
        vehicle: EntityId,
        speed: f32,
        style: u32,
    ) -> Result<(), HostError>;

    fn issue_drive_to_coord(
        &mut self,
        actor: EntityId,
        vehicle: EntityId,
        destination: Vec3,
        speed: f32,
        style: u32,
        arrival_radius: f32,
        long_range: bool,
    ) -> Result<(), HostError>;

    fn set_cruise_speed(&mut self, actor: EntityId, speed: f32) -> Result<(), HostError>;

    fn clear_tasks(&mut self, actor: EntityId) -> Result<(), HostError>;

    fn set_driver_ability(&mut self, actor: EntityId, value: f32) -> Result<(), HostError>;

    fn set_driver_aggressiveness(&mut self, actor: EntityId, value: f32) -> Result<(), HostError>;

    fn temp_action(
        &mut self,
        actor: EntityId,
        vehicle: EntityId,
        action: TempAction,
        duration_ms: u32,
    ) -> Result<(), HostError>;

    fn set_handbrake(&mut self, vehicle: EntityId, engaged: bool) -> Result<(), HostError>;

    fn set_headlights(&mut self, vehicle: EntityId, on: bool) -> Result<(), HostError>;
}

/// Read-only world state
pub trait WorldQuery {
    fn player(&self) -> Result<PlayerContext, HostError>;

    fn vehicle_snapshot(&self, vehicle: EntityId) -> Result<Option<VehicleSnapshot>, HostError>;

    fn nearby_vehicles(&self, point: Vec3, radius: f32) -> Result<Vec<NearbyVehicle>, HostError>;

    fn current_weather(&self) -> Result<WeatherKind, HostError>;

    /// Game clock hour, 0..=23
    fn hour_of_day(&self) -> Result<u8, HostError>;

    fn waypoint_active(&self) -> bool;

    fn waypoint_position(&self) -> Option<Vec3>;

    fn zone_name(&self, point: Vec3) -> Result<String, HostError>;
}

/// Text-to-speech sink
pub trait Speech {
    fn speak(&mut self, text: &str, interrupt: bool);
}

/// Positional audio sink
pub trait Audio {
    /// `pan` in `[-1, 1]`, `frequency` in Hz, `gain` in `[0, 1]`
    fn play_panned_pulse(&mut self, pan: f32, frequency: f32, gain: f32);
}

/// Persistent settings store
pub trait Settings {
    fn get_bool(&self, name: &str) -> Option<bool>;

    fn get_int(&self, name: &str) -> Option<i64>;

    fn set_int(&mut self, name: &str, value: i64);
}

/// Everything the AutoDrive core needs from the game runtime
pub trait Host: RoadQuery + VehicleControl + WorldQuery + Speech + Audio + Settings {}

impl<T> Host for T where T: RoadQuery + VehicleControl + WorldQuery + Speech + Audio + Settings {}
