//! Input guards for the per-tick update path

use crate::error::ValidationError;
use host::{Vec3, VehicleSnapshot};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Plausibility ranges for kinematic inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Speed valid range (m/s)
    pub speed_range: (f32, f32),
    /// Absolute world coordinate limit (m)
    pub coordinate_limit: f32,
    /// Up-vector Z component range
    pub up_z_range: (f32, f32),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            speed_range: (0.0, 150.0),
            coordinate_limit: 20_000.0,
            up_z_range: (-1.01, 1.01),
        }
    }
}

/// Validator for vehicle snapshots and ticks
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f32,
        range: (f32, f32),
    ) -> Result<(), ValidationError> {
        Self::validate_finite(field, value)?;
        if value < range.0 || value > range.1 {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        } else {
            Ok(())
        }
    }

    pub fn validate_finite(field: &'static str, value: f32) -> Result<(), ValidationError> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(ValidationError::NonFinite { field, value })
        }
    }

    pub fn validate_tick(&self, now_ms: i64) -> Result<(), ValidationError> {
        if now_ms < 0 {
            Err(ValidationError::NegativeTick(now_ms))
        } else {
            Ok(())
        }
    }

    pub fn validate_position(&self, position: Vec3) -> Result<(), ValidationError> {
        let limit = self.config.coordinate_limit;
        self.validate_range("position.x", position.x, (-limit, limit))?;
        self.validate_range("position.y", position.y, (-limit, limit))?;
        self.validate_range("position.z", position.z, (-limit, limit))
    }

    /// Validate everything the tick reads from the snapshot
    pub fn validate_snapshot(
        &self,
        vehicle: &VehicleSnapshot,
        now_ms: i64,
    ) -> Result<(), ValidationError> {
        let result = self
            .validate_tick(now_ms)
            .and_then(|_| self.validate_position(vehicle.position))
            .and_then(|_| Self::validate_finite("heading", vehicle.heading))
            .and_then(|_| self.validate_range("speed", vehicle.speed, self.config.speed_range))
            .and_then(|_| Self::validate_finite("pitch", vehicle.pitch))
            .and_then(|_| Self::validate_finite("roll", vehicle.roll))
            .and_then(|_| self.validate_range("up_z", vehicle.up_z, self.config.up_z_range));

        if let Err(e) = &result {
            debug!("Snapshot rejected: {}", e);
        }
        result
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
