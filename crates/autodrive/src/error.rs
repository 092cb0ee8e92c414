//! AutoDrive Error Types

use data_validator::ValidationError;
use host::HostError;
use thiserror::Error;

/// Failures inside the orchestrator. Public operations never return these
/// to the host; they are logged and turned into a spoken sentence.
#[derive(Error, Debug)]
pub enum AutoDriveError {
    #[error("Player is not in a vehicle")]
    NotInVehicle,

    #[error("Player is not in the driver seat")]
    NotDriver,

    #[error("No waypoint set")]
    NoWaypoint,

    #[error("AutoDrive is not active")]
    NotActive,

    #[error("Host call failed: {0}")]
    Host(#[from] HostError),

    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl AutoDriveError {
    /// Sentence spoken to the player
    pub fn user_message(&self) -> &'static str {
        match self {
            AutoDriveError::NotInVehicle => "You must be in a vehicle to use AutoDrive.",
            AutoDriveError::NotDriver => "You must be in the driver seat to use AutoDrive.",
            AutoDriveError::NoWaypoint => "No waypoint set.",
            AutoDriveError::NotActive => "AutoDrive is not active.",
            AutoDriveError::Host(_)
            | AutoDriveError::Validation(_)
            | AutoDriveError::Config(_) => "Failed to start AutoDrive.",
        }
    }
}
