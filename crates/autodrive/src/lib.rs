//! AutoDrive Orchestrator
//!
//! Ties the detector crates into one per-tick pipeline for a scripting
//! host:
//! - Wander, drive-to-waypoint and road-seeking modes
//! - Driving styles persisted through host settings
//! - Speed composition (style, road, weather, time of day, slowdowns, following)
//! - Stuck recovery and emergency vehicle yielding
//! - Announcement arbitration with per-category toggles
//!
//! The host calls [`AutoDriveManager::update`] once per frame and the
//! command methods on player input. Nothing here blocks or spawns threads.

pub mod config;
mod detectors;
pub mod error;
mod manager;
mod pending;
pub mod settings;
pub mod speed;
pub mod style;

pub use config::{AutoDriveConfig, DriveConfig, SeekConfig};
pub use error::AutoDriveError;
pub use manager::{AutoDriveManager, DriveMode, StateSummary};
pub use pending::{PendingAction, StartRequest, TaskKind};
pub use settings::{SettingsCache, SettingsSnapshot, BEACONS_SETTING};
pub use speed::{SpeedConfig, SpeedModifiers};
pub use style::{DrivingStyle, StyleProfile, STYLE_SETTING};
