//! Commanded speed composition
//!
//! `base × style × road × weather × time-of-day`, then replaced by the
//! lower of any active slowdown, scaled by the following factor and
//! clamped into the allowed band.

use serde::{Deserialize, Serialize};

/// Meters per second to miles per hour
pub const MPS_TO_MPH: f32 = 2.236_94;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedConfig {
    /// Hard floor of the commanded speed (m/s)
    pub min_speed: f32,
    /// Hard ceiling of the commanded speed (m/s)
    pub max_speed: f32,
    /// Target speed a new manager starts with (m/s)
    pub default_target: f32,
    /// Step for increase/decrease (m/s)
    pub increment: f32,
    /// Lowest target the player can select (m/s)
    pub min_target: f32,
    /// Minimum change before the cruise speed is re-applied (m/s)
    pub apply_epsilon: f32,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            min_speed: 3.0,
            max_speed: 45.0,
            default_target: 20.0,
            increment: 2.5,
            min_target: 5.0,
            apply_epsilon: 0.25,
        }
    }
}

/// Environmental multipliers for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedModifiers {
    pub style: f32,
    pub road_type: f32,
    pub weather: f32,
    pub time_of_day: f32,
}

impl Default for SpeedModifiers {
    fn default() -> Self {
        Self {
            style: 1.0,
            road_type: 1.0,
            weather: 1.0,
            time_of_day: 1.0,
        }
    }
}

impl SpeedConfig {
    /// Clamp into `[min_speed, max_speed]`; non-finite input maps to the floor
    pub fn clamp(&self, speed: f32) -> f32 {
        if speed.is_finite() {
            speed.clamp(self.min_speed, self.max_speed)
        } else {
            self.min_speed
        }
    }

    /// Target after one increase or decrease step
    pub fn step_target(&self, target: f32, up: bool) -> f32 {
        let next = if up {
            target + self.increment
        } else {
            target - self.increment
        };
        if next.is_finite() {
            next.clamp(self.min_target, self.max_speed)
        } else {
            self.default_target
        }
    }

    /// Speed with every environmental multiplier applied
    pub fn environmental(&self, target: f32, m: &SpeedModifiers) -> f32 {
        self.clamp(target * m.style * m.road_type * m.weather * m.time_of_day)
    }

    /// Final commanded speed: a slowdown overrides (never raises) the
    /// environmental speed, then the following factor applies
    pub fn commanded(&self, environmental: f32, slowdown: Option<f32>, following: f32) -> f32 {
        let base = match slowdown {
            Some(s) if s.is_finite() => s.min(environmental),
            _ => environmental,
        };
        self.clamp(base * following)
    }
}

pub fn to_mph(speed: f32) -> f32 {
    speed * MPS_TO_MPH
}
