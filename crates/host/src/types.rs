//! Data exchanged with the host each tick

use crate::geometry::Vec3;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle of a host entity (ped or vehicle)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kinematic snapshot of the player's vehicle, read once per tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VehicleSnapshot {
    pub handle: EntityId,
    pub position: Vec3,
    /// Degrees, clockwise from north
    pub heading: f32,
    /// Meters per second
    pub speed: f32,
    /// Nose up positive (degrees)
    pub pitch: f32,
    pub roll: f32,
    /// Z component of the vehicle's up vector; ~1.0 upright, negative upside down
    pub up_z: f32,
    pub in_water: bool,
    pub on_fire: bool,
    pub destroyed: bool,
    /// Engine health on the host's 0..1000 scale
    pub engine_health: f32,
}

impl VehicleSnapshot {
    /// Upright vehicle at rest, full health
    pub fn at_rest(handle: EntityId, position: Vec3, heading: f32) -> Self {
        Self {
            handle,
            position,
            heading,
            speed: 0.0,
            pitch: 0.0,
            roll: 0.0,
            up_z: 1.0,
            in_water: false,
            on_fire: false,
            destroyed: false,
            engine_health: 1000.0,
        }
    }
}

bitflags! {
    /// Road node property flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct NodeFlags: u32 {
        const HIGHWAY = 1 << 0;
        const TUNNEL = 1 << 1;
        const OFF_ROAD = 1 << 2;
        const TRAFFIC_LIGHT = 1 << 3;
        const JUNCTION = 1 << 4;
        const DEAD_END = 1 << 5;
        const WATER_ROUTE = 1 << 6;
        const SWITCHED_OFF = 1 << 7;
    }
}

/// A point on the host road graph with its classification metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadNode {
    pub position: Vec3,
    pub heading: f32,
    /// Traffic weight, 0..=15
    pub density: u8,
    pub flags: NodeFlags,
    pub lanes_forward: u8,
    pub lanes_backward: u8,
}

impl RoadNode {
    pub fn new(position: Vec3, heading: f32) -> Self {
        Self {
            position,
            heading,
            density: 5,
            flags: NodeFlags::empty(),
            lanes_forward: 1,
            lanes_backward: 1,
        }
    }

    pub fn with_flags(mut self, flags: NodeFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_density(mut self, density: u8) -> Self {
        self.density = density.min(15);
        self
    }

    pub fn with_lanes(mut self, forward: u8, backward: u8) -> Self {
        self.lanes_forward = forward;
        self.lanes_backward = backward;
        self
    }

    pub fn total_lanes(&self) -> u8 {
        self.lanes_forward.saturating_add(self.lanes_backward)
    }
}

/// Another vehicle returned by a nearby-vehicle scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyVehicle {
    pub id: EntityId,
    pub position: Vec3,
    pub heading: f32,
    /// Meters per second
    pub speed: f32,
    pub siren_active: bool,
}

/// Player state used for precondition checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerContext {
    pub actor: EntityId,
    pub vehicle: Option<EntityId>,
    pub is_driver: bool,
}

/// Host weather identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum WeatherKind {
    ExtraSunny,
    #[default]
    Clear,
    Clouds,
    Overcast,
    Smog,
    Foggy,
    Clearing,
    Rain,
    Thunder,
    SnowLight,
    Snow,
    Blizzard,
    Unknown,
}

/// Short-lived maneuvers the host vehicle AI can perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TempAction {
    Brake,
    ReverseStraight,
    ReverseLeft,
    ReverseRight,
    ForwardLeft,
    ForwardRight,
    TurnLeft,
    TurnRight,
    /// Brake while steering to the right shoulder
    PullOverRight,
}
