//! Stuck detection and progress timeout

use host::geometry::heading_delta;
use host::{Vec3, VehicleSnapshot};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Stuck detector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StuckConfig {
    pub check_interval_ms: i64,
    /// Below this speed the sample counts as stationary (m/s)
    pub speed_threshold: f32,
    /// Max movement between samples (m)
    pub movement_threshold: f32,
    /// Max heading change between samples (degrees)
    pub heading_threshold: f32,
    /// Consecutive stationary samples before declaring stuck
    pub confirm_samples: u32,
    /// Detection is suppressed this long after a recovery (ms)
    pub cooldown_ms: i64,
}

impl Default for StuckConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 1_000,
            speed_threshold: 1.0,
            movement_threshold: 1.5,
            heading_threshold: 5.0,
            confirm_samples: 5,
            cooldown_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Sample {
    at_ms: i64,
    position: Vec3,
    heading: f32,
}

pub struct StuckDetector {
    config: StuckConfig,
    last: Option<Sample>,
    counter: u32,
    cooldown_until_ms: i64,
}

impl StuckDetector {
    pub fn new(config: StuckConfig) -> Self {
        Self {
            config,
            last: None,
            counter: 0,
            cooldown_until_ms: i64::MIN,
        }
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn in_cooldown(&self, now_ms: i64) -> bool {
        now_ms < self.cooldown_until_ms
    }

    /// Returns true once the stationary counter reaches the threshold.
    /// `waiting` (red light, yielding, queued traffic) resets the counter.
    pub fn update(&mut self, vehicle: &VehicleSnapshot, waiting: bool, now_ms: i64) -> bool {
        if let Some(last) = self.last {
            if now_ms - last.at_ms < self.config.check_interval_ms {
                return false;
            }
        }

        let sample = Sample {
            at_ms: now_ms,
            position: vehicle.position,
            heading: vehicle.heading,
        };
        let Some(previous) = self.last.replace(sample) else {
            return false;
        };

        if waiting || self.in_cooldown(now_ms) {
            self.counter = 0;
            return false;
        }

        let moved = previous.position.distance(sample.position);
        let turned = heading_delta(previous.heading, sample.heading).abs();
        let stationary = vehicle.speed < self.config.speed_threshold
            && moved < self.config.movement_threshold
            && turned < self.config.heading_threshold;

        if !stationary {
            self.counter = 0;
            return false;
        }

        self.counter += 1;
        debug!("Stationary sample {}/{}", self.counter, self.config.confirm_samples);
        if self.counter >= self.config.confirm_samples {
            self.counter = 0;
            return true;
        }
        false
    }

    /// Start the post-recovery cooldown
    pub fn start_cooldown(&mut self, now_ms: i64) {
        self.cooldown_until_ms = now_ms + self.config.cooldown_ms;
        self.counter = 0;
        self.last = None;
    }

    pub fn reset(&mut self) {
        self.last = None;
        self.counter = 0;
        self.cooldown_until_ms = i64::MIN;
    }
}

impl Default for StuckDetector {
    fn default() -> Self {
        Self::new(StuckConfig::default())
    }
}

/// Progress timeout configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// Net progress that counts as moving toward the destination (m)
    pub min_progress: f32,
    pub timeout_ms: i64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            min_progress: 10.0,
            timeout_ms: 45_000,
        }
    }
}

/// Flags a waypoint session that stopped getting closer
pub struct ProgressMonitor {
    config: ProgressConfig,
    anchor: Option<(i64, f32)>,
}

impl ProgressMonitor {
    pub fn new(config: ProgressConfig) -> Self {
        Self {
            config,
            anchor: None,
        }
    }

    pub fn update(&mut self, remaining: f32, waiting: bool, now_ms: i64) -> bool {
        let Some((since, best)) = self.anchor else {
            self.anchor = Some((now_ms, remaining));
            return false;
        };

        if waiting || best - remaining >= self.config.min_progress {
            self.anchor = Some((now_ms, remaining.min(best)));
            return false;
        }

        if now_ms - since >= self.config.timeout_ms {
            debug!(
                "No progress for {} ms ({:.0} m remaining)",
                now_ms - since,
                remaining
            );
            self.anchor = Some((now_ms, remaining));
            return true;
        }
        false
    }

    /// Re-anchor at the current position
    pub fn restart(&mut self, remaining: Option<f32>, now_ms: i64) {
        self.anchor = remaining.map(|r| (now_ms, r));
    }

    pub fn reset(&mut self) {
        self.anchor = None;
    }
}

impl Default for ProgressMonitor {
    fn default() -> Self {
        Self::new(ProgressConfig::default())
    }
}
