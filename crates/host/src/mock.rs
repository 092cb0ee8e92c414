//! In-memory scripted host
//!
//! Records every command and spoken line so scenario tests can assert on
//! exactly what the core asked the game to do.

use crate::collaborators::{Audio, RoadQuery, Settings, Speech, VehicleControl, WorldQuery};
use crate::geometry::Vec3;
use crate::types::{
    EntityId, NearbyVehicle, NodeFlags, PlayerContext, RoadNode, TempAction, VehicleSnapshot,
    WeatherKind,
};
use crate::HostError;
use std::collections::HashMap;

pub const MOCK_ACTOR: EntityId = EntityId(1);
pub const MOCK_VEHICLE: EntityId = EntityId(2);

/// A command the core issued to the host
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    DriveWander {
        speed: f32,
        style: u32,
    },
    DriveToCoord {
        destination: Vec3,
        speed: f32,
        style: u32,
        arrival_radius: f32,
        long_range: bool,
    },
    SetCruiseSpeed(f32),
    ClearTasks,
    Ability(f32),
    Aggressiveness(f32),
    TempAction {
        action: TempAction,
        duration_ms: u32,
    },
    Handbrake(bool),
    Headlights(bool),
}

impl HostCall {
    pub fn is_drive_task(&self) -> bool {
        matches!(self, HostCall::DriveWander { .. } | HostCall::DriveToCoord { .. })
    }
}

/// Ground surface override inside a circle; `None` height means water
#[derive(Debug, Clone)]
pub struct GroundRegion {
    pub center: Vec3,
    pub radius: f32,
    pub height: Option<f32>,
}

/// Scripted world state plus call recorder
#[derive(Debug, Clone)]
pub struct MockHost {
    pub player: PlayerContext,
    pub vehicle: Option<VehicleSnapshot>,
    pub road_nodes: Vec<RoadNode>,
    pub road_queries_fail: bool,
    pub safe_ground: Option<Vec3>,
    pub road_side: Option<Vec3>,
    pub ground: Option<f32>,
    pub ground_regions: Vec<GroundRegion>,
    pub nearby: Vec<NearbyVehicle>,
    pub weather: WeatherKind,
    pub hour: u8,
    pub waypoint: Option<Vec3>,
    pub zones: Vec<(Vec3, f32, String)>,
    pub default_zone: String,
    pub bool_settings: HashMap<String, bool>,
    pub int_settings: HashMap<String, i64>,
    pub calls: Vec<HostCall>,
    pub spoken: Vec<(String, bool)>,
    pub pulses: Vec<(f32, f32, f32)>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    /// Player seated as driver of `MOCK_VEHICLE`, noon, clear weather, no roads
    pub fn new() -> Self {
        Self {
            player: PlayerContext {
                actor: MOCK_ACTOR,
                vehicle: Some(MOCK_VEHICLE),
                is_driver: true,
            },
            vehicle: Some(VehicleSnapshot::at_rest(MOCK_VEHICLE, Vec3::ZERO, 0.0)),
            road_nodes: Vec::new(),
            road_queries_fail: false,
            safe_ground: None,
            road_side: None,
            ground: Some(0.0),
            ground_regions: Vec::new(),
            nearby: Vec::new(),
            weather: WeatherKind::Clear,
            hour: 12,
            waypoint: None,
            zones: Vec::new(),
            default_zone: "Downtown".to_string(),
            bool_settings: HashMap::new(),
            int_settings: HashMap::new(),
            calls: Vec::new(),
            spoken: Vec::new(),
            pulses: Vec::new(),
        }
    }

    /// Lay a straight road of evenly spaced nodes starting at `start`
    pub fn add_straight_road(
        &mut self,
        start: Vec3,
        heading: f32,
        length: f32,
        spacing: f32,
        template: &RoadNode,
    ) {
        let count = (length / spacing).floor() as usize;
        for i in 0..=count {
            let mut node = template.clone();
            node.position = start.offset_along(heading, i as f32 * spacing);
            node.heading = heading;
            self.road_nodes.push(node);
        }
    }

    pub fn spoken_texts(&self) -> Vec<&str> {
        self.spoken.iter().map(|(text, _)| text.as_str()).collect()
    }

    /// Whether any spoken line contains `fragment`
    pub fn spoke(&self, fragment: &str) -> bool {
        self.spoken.iter().any(|(text, _)| text.contains(fragment))
    }

    pub fn count_spoken(&self, fragment: &str) -> usize {
        self.spoken
            .iter()
            .filter(|(text, _)| text.contains(fragment))
            .count()
    }

    pub fn drive_tasks_issued(&self) -> usize {
        self.calls.iter().filter(|c| c.is_drive_task()).count()
    }

    pub fn clears(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, HostCall::ClearTasks))
            .count()
    }

    pub fn last_drive_task(&self) -> Option<&HostCall> {
        self.calls.iter().rev().find(|c| c.is_drive_task())
    }

    pub fn temp_actions(&self) -> Vec<TempAction> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HostCall::TempAction { action, .. } => Some(*action),
                _ => None,
            })
            .collect()
    }

    pub fn clear_records(&mut self) {
        self.calls.clear();
        self.spoken.clear();
        self.pulses.clear();
    }

    fn check_road(&self, call: &'static str) -> Result<(), HostError> {
        if self.road_queries_fail {
            Err(HostError::NativeCall(call, "scripted failure".to_string()))
        } else {
            Ok(())
        }
    }

    fn nodes_by_distance(&self, point: Vec3) -> Vec<&RoadNode> {
        let mut nodes: Vec<&RoadNode> = self
            .road_nodes
            .iter()
            .filter(|n| !n.flags.contains(NodeFlags::SWITCHED_OFF))
            .collect();
        nodes.sort_by(|a, b| {
            a.position
                .distance(point)
                .total_cmp(&b.position.distance(point))
        });
        nodes
    }
}

impl RoadQuery for MockHost {
    fn nearest_node_with_heading(&self, point: Vec3) -> Result<Option<(Vec3, f32)>, HostError> {
        self.check_road("GET_CLOSEST_VEHICLE_NODE_WITH_HEADING")?;
        Ok(self
            .nodes_by_distance(point)
            .first()
            .map(|n| (n.position, n.heading)))
    }

    fn nearest_node(&self, point: Vec3) -> Result<Option<Vec3>, HostError> {
        self.check_road("GET_CLOSEST_VEHICLE_NODE")?;
        Ok(self.nodes_by_distance(point).first().map(|n| n.position))
    }

    fn nth_nearest_node(&self, point: Vec3, n: u32) -> Result<Option<Vec3>, HostError> {
        self.check_road("GET_NTH_CLOSEST_VEHICLE_NODE")?;
        let index = n.saturating_sub(1) as usize;
        Ok(self.nodes_by_distance(point).get(index).map(|n| n.position))
    }

    fn node_properties(&self, point: Vec3) -> Result<Option<RoadNode>, HostError> {
        self.check_road("GET_VEHICLE_NODE_PROPERTIES")?;
        Ok(self.nodes_by_distance(point).first().map(|n| (*n).clone()))
    }

    fn safe_ground_position(&self, _point: Vec3, _flags: u32) -> Result<Option<Vec3>, HostError> {
        self.check_road("GET_SAFE_COORD_FOR_PED")?;
        Ok(self.safe_ground)
    }

    fn point_on_road_side(&self, _point: Vec3, _side: i32) -> Result<Option<Vec3>, HostError> {
        self.check_road("GET_POINT_ON_ROAD_SIDE")?;
        Ok(self.road_side)
    }

    fn ground_height(&self, point: Vec3) -> Result<Option<f32>, HostError> {
        self.check_road("GET_GROUND_Z_FOR_3D_COORD")?;
        for region in &self.ground_regions {
            if region.center.distance_2d(point) <= region.radius {
                return Ok(region.height);
            }
        }
        Ok(self.ground)
    }
}

impl VehicleControl for MockHost {
    fn issue_drive_wander(
        &mut self,
        _actor: EntityId,
        _vehicle: EntityId,
        speed: f32,
        style: u32,
    ) -> Result<(), HostError> {
        self.calls.push(HostCall::DriveWander { speed, style });
        Ok(())
    }

    fn issue_drive_to_coord(
        &mut self,
        _actor: EntityId,
        _vehicle: EntityId,
        destination: Vec3,
        speed: f32,
        style: u32,
        arrival_radius: f32,
        long_range: bool,
    ) -> Result<(), HostError> {
        self.calls.push(HostCall::DriveToCoord {
            destination,
            speed,
            style,
            arrival_radius,
            long_range,
        });
        Ok(())
    }

    fn set_cruise_speed(&mut self, _actor: EntityId, speed: f32) -> Result<(), HostError> {
        self.calls.push(HostCall::SetCruiseSpeed(speed));
        Ok(())
    }

    fn clear_tasks(&mut self, _actor: EntityId) -> Result<(), HostError> {
        self.calls.push(HostCall::ClearTasks);
        Ok(())
    }

    fn set_driver_ability(&mut self, _actor: EntityId, value: f32) -> Result<(), HostError> {
        self.calls.push(HostCall::Ability(value));
        Ok(())
    }

    fn set_driver_aggressiveness(&mut self, _actor: EntityId, value: f32) -> Result<(), HostError> {
        self.calls.push(HostCall::Aggressiveness(value));
        Ok(())
    }

    fn temp_action(
        &mut self,
        _actor: EntityId,
        _vehicle: EntityId,
        action: TempAction,
        duration_ms: u32,
    ) -> Result<(), HostError> {
        self.calls.push(HostCall::TempAction {
            action,
            duration_ms,
        });
        Ok(())
    }

    fn set_handbrake(&mut self, _vehicle: EntityId, engaged: bool) -> Result<(), HostError> {
        self.calls.push(HostCall::Handbrake(engaged));
        Ok(())
    }

    fn set_headlights(&mut self, _vehicle: EntityId, on: bool) -> Result<(), HostError> {
        self.calls.push(HostCall::Headlights(on));
        Ok(())
    }
}

impl WorldQuery for MockHost {
    fn player(&self) -> Result<PlayerContext, HostError> {
        Ok(self.player)
    }

    fn vehicle_snapshot(&self, vehicle: EntityId) -> Result<Option<VehicleSnapshot>, HostError> {
        Ok(self.vehicle.clone().filter(|v| v.handle == vehicle))
    }

    fn nearby_vehicles(&self, point: Vec3, radius: f32) -> Result<Vec<NearbyVehicle>, HostError> {
        Ok(self
            .nearby
            .iter()
            .filter(|v| v.position.distance(point) <= radius)
            .cloned()
            .collect())
    }

    fn current_weather(&self) -> Result<WeatherKind, HostError> {
        Ok(self.weather)
    }

    fn hour_of_day(&self) -> Result<u8, HostError> {
        Ok(self.hour)
    }

    fn waypoint_active(&self) -> bool {
        self.waypoint.is_some()
    }

    fn waypoint_position(&self) -> Option<Vec3> {
        self.waypoint
    }

    fn zone_name(&self, point: Vec3) -> Result<String, HostError> {
        Ok(self
            .zones
            .iter()
            .find(|(center, radius, _)| center.distance_2d(point) <= *radius)
            .map(|(_, _, name)| name.clone())
            .unwrap_or_else(|| self.default_zone.clone()))
    }
}

impl Speech for MockHost {
    fn speak(&mut self, text: &str, interrupt: bool) {
        self.spoken.push((text.to_string(), interrupt));
    }
}

impl Audio for MockHost {
    fn play_panned_pulse(&mut self, pan: f32, frequency: f32, gain: f32) {
        self.pulses.push((pan, frequency, gain));
    }
}

impl Settings for MockHost {
    fn get_bool(&self, name: &str) -> Option<bool> {
        self.bool_settings.get(name).copied()
    }

    fn get_int(&self, name: &str) -> Option<i64> {
        self.int_settings.get(name).copied()
    }

    fn set_int(&mut self, name: &str, value: i64) {
        self.int_settings.insert(name.to_string(), value);
    }
}
