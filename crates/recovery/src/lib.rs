//! Stuck Vehicle Recovery
//!
//! - Stuck detection from consecutive low-movement samples
//! - Waypoint progress timeout
//! - Escalating, timer-driven recovery maneuvers
//! - Edge-triggered critical vehicle state (flipped, water, fire)

mod manager;
mod strategy;
mod stuck;
mod vehicle_state;

pub use manager::{RecoveryCommand, RecoveryConfig, RecoveryManager, RecoveryState, RecoveryUpdate};
pub use strategy::{
    default_ladder, plan_for_attempt, turn_direction, LadderEntry, ManeuverPhase, RecoveryPlan,
    StrategyKind, TurnDirection,
};
pub use stuck::{ProgressConfig, ProgressMonitor, StuckConfig, StuckDetector};
pub use vehicle_state::{CriticalCondition, VehicleStateConfig, VehicleStateMonitor};
