//! Waypoint Navigation
//!
//! Supervises a drive-to-destination session. The host AI does the path
//! finding; this crate decides where exactly to send it, when to slow down
//! and when the trip is over.

mod eta;
mod manager;
mod milestones;
mod safe_position;

pub use eta::{describe_eta, EtaConfig, EtaEstimator};
pub use manager::{
    NavigationConfig, NavigationManager, NavigationSession, ProgressOutcome, ProgressUpdate,
    SpeedCommand,
};
pub use milestones::{describe_miles, MilestoneConfig, MilestoneTracker};
pub use safe_position::{resolve_safe_arrival, ArrivalStrategy, SafeArrival, SafePositionConfig};

/// Meters per statute mile
pub const METERS_PER_MILE: f32 = 1609.344;
/// Feet per meter
pub const FEET_PER_METER: f32 = 3.28084;
