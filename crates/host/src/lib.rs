//! Host Collaborator Interfaces
//!
//! Everything the AutoDrive core consumes from the game runtime goes through
//! the narrow traits in this crate:
//! - Road graph queries (nearest nodes, node properties, ground probes)
//! - Vehicle control (drive tasks, cruise speed, temporary actions)
//! - World queries (nearby vehicles, weather, clock, waypoint, zones)
//! - Speech and panned audio output
//! - Settings storage

mod collaborators;
pub mod geometry;
#[cfg(feature = "mock")]
pub mod mock;
mod types;

pub use collaborators::{Audio, Host, RoadQuery, Settings, Speech, VehicleControl, WorldQuery};
pub use geometry::Vec3;
pub use types::{
    EntityId, NearbyVehicle, NodeFlags, PlayerContext, RoadNode, TempAction, VehicleSnapshot,
    WeatherKind,
};

use thiserror::Error;

/// Errors reported by host collaborator calls
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("Native call {0} failed: {1}")]
    NativeCall(&'static str, String),

    #[error("Entity {0} no longer exists")]
    EntityGone(EntityId),

    #[error("Query returned sentinel value")]
    Sentinel,

    #[error("Host is not ready")]
    NotReady,
}
