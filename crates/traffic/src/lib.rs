//! Surrounding Traffic
//!
//! Detectors fed by the host's nearby-vehicle scan:
//! - Forward time-to-collision warning ladder
//! - Following gap state and rate-limited speed controller
//! - Emergency vehicle yield and resume
//! - Overtake and being-overtaken tracking

pub mod collision;
pub mod emergency;
pub mod following;
pub mod overtake;

pub use collision::{Beacon, CollisionConfig, CollisionDetector, CollisionThreat, CollisionUpdate};
pub use emergency::{EmergencyConfig, EmergencyUpdate, EmergencyVehicleHandler, YieldAction};
pub use following::{
    time_gap, FollowingConfig, FollowingMonitor, FollowingState, FollowingUpdate,
    SmoothSpeedController,
};
pub use overtake::{OvertakeConfig, OvertakeTracker, RelativePosition};

use host::geometry::heading_delta;

/// Spoken direction of something at `relative` degrees from our heading
pub fn direction_word(relative: f32) -> &'static str {
    let r = heading_delta(0.0, relative);
    if r.abs() <= 45.0 {
        "ahead"
    } else if r.abs() >= 135.0 {
        "behind"
    } else if r > 0.0 {
        "on the right"
    } else {
        "on the left"
    }
}
