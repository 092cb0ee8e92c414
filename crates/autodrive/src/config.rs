//! AutoDrive configuration
//!
//! One struct aggregating every component's tuning constants. `load`
//! layers the defaults, an optional file and `AUTODRIVE__*` environment
//! variables (`AUTODRIVE__SPEED__MAX_SPEED=40`).

use crate::error::AutoDriveError;
use crate::speed::SpeedConfig;
use announce::AnnouncementConfig;
use config::{Config, Environment, File};
use data_validator::ValidationConfig;
use environment::{TimeOfDayConfig, WeatherConfig};
use navigation::NavigationConfig;
use recovery::{RecoveryConfig, VehicleStateConfig};
use road::{
    CurveConfig, LaneChangeConfig, RoadTypeConfig, SeekScanConfig, StructureConfig,
    TrafficLightConfig,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;
use traffic::{CollisionConfig, EmergencyConfig, FollowingConfig, OvertakeConfig};

/// Road seeking behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekConfig {
    pub scan: SeekScanConfig,
    pub rescan_interval_ms: i64,
    /// A new scan target closer than this to the current one is ignored (m)
    pub target_hysteresis: f32,
    /// Announce once if nothing was found within this time (ms)
    pub timeout_ms: i64,
}

impl Default for SeekConfig {
    fn default() -> Self {
        Self {
            scan: SeekScanConfig::default(),
            rescan_interval_ms: 10_000,
            target_hysteresis: 20.0,
            timeout_ms: 120_000,
        }
    }
}

/// Complete AutoDrive configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoDriveConfig {
    pub drive: DriveConfig,
    pub speed: SpeedConfig,
    pub seek: SeekConfig,
    pub announcements: AnnouncementConfig,
    pub validation: ValidationConfig,
    pub weather: WeatherConfig,
    pub time_of_day: TimeOfDayConfig,
    pub curve: CurveConfig,
    pub structure: StructureConfig,
    pub road_type: RoadTypeConfig,
    pub lane: LaneChangeConfig,
    pub traffic_light: TrafficLightConfig,
    pub collision: CollisionConfig,
    pub following: FollowingConfig,
    pub emergency: EmergencyConfig,
    pub overtake: OvertakeConfig,
    pub navigation: NavigationConfig,
    pub recovery: RecoveryConfig,
    pub vehicle_state: VehicleStateConfig,
}

/// Orchestrator timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// Minimum time between two processed ticks (ms)
    pub tick_interval_ms: i64,
    pub settings_refresh_ms: i64,
    /// Style bits added for long-range drive-to tasks
    pub long_range_style_bits: u32,
    /// A vehicle ahead closer than this means we are queued, not stuck (m)
    pub queued_gap: f32,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            settings_refresh_ms: 2_000,
            long_range_style_bits: 1 << 18,
            queued_gap: 12.0,
        }
    }
}

impl AutoDriveConfig {
    /// Defaults, then `path` if given, then `AUTODRIVE__*` environment
    pub fn load(path: Option<&Path>) -> Result<Self, AutoDriveError> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);
        if let Some(path) = path {
            info!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("AUTODRIVE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Short detector intervals for responsive scripted runs
    pub fn responsive() -> Self {
        let mut config = Self::default();
        config.drive.tick_interval_ms = 50;
        config.weather.check_interval_ms = 1_000;
        config.time_of_day.check_interval_ms = 1_000;
        config.road_type.check_interval_ms = 500;
        config.structure.check_interval_ms = 500;
        config
    }
}
