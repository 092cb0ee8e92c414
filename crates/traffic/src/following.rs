//! Following distance
//!
//! The gap is approximated as `distance / own_speed`, i.e. it assumes the
//! lead vehicle travels at our speed. Speed changes go through a rate
//! limited controller so the commanded speed never snaps.

use announce::{Announcement, Category};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Gap bucket, ordered from clear to dangerous
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum FollowingState {
    #[default]
    Clear = 0,
    Comfortable = 1,
    Reduced = 2,
    Close = 3,
    Dangerous = 4,
}

impl FollowingState {
    pub fn level(self) -> u8 {
        self as u8
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowingConfig {
    /// Gap boundaries (s), descending: clear / comfortable / reduced / close
    pub gap_thresholds: [f32; 4],
    /// Below this own speed the gap is not meaningful (m/s)
    pub min_speed: f32,
    /// Target speed factor per state, indexed by level
    pub speed_factors: [f32; 5],
}

impl Default for FollowingConfig {
    fn default() -> Self {
        Self {
            gap_thresholds: [4.0, 3.0, 2.0, 1.5],
            min_speed: 1.0,
            speed_factors: [1.0, 1.0, 0.9, 0.75, 0.5],
        }
    }
}

/// Time gap to the vehicle ahead, or `None` when stopped or nothing ahead
pub fn time_gap(closest_ahead: Option<f32>, own_speed: f32, min_speed: f32) -> Option<f32> {
    let distance = closest_ahead?;
    (own_speed >= min_speed).then(|| distance / own_speed)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FollowingUpdate {
    pub state: FollowingState,
    pub gap: Option<f32>,
    /// Multiplier for the target speed
    pub speed_factor: f32,
    pub announcement: Option<Announcement>,
}

pub struct FollowingMonitor {
    config: FollowingConfig,
    state: FollowingState,
}

impl FollowingMonitor {
    pub fn new(config: FollowingConfig) -> Self {
        Self {
            config,
            state: FollowingState::Clear,
        }
    }

    pub fn state(&self) -> FollowingState {
        self.state
    }

    pub fn classify(&self, gap: Option<f32>) -> FollowingState {
        let Some(gap) = gap else {
            return FollowingState::Clear;
        };
        let t = &self.config.gap_thresholds;
        if gap >= t[0] {
            FollowingState::Clear
        } else if gap >= t[1] {
            FollowingState::Comfortable
        } else if gap >= t[2] {
            FollowingState::Reduced
        } else if gap >= t[3] {
            FollowingState::Close
        } else {
            FollowingState::Dangerous
        }
    }

    pub fn update(&mut self, closest_ahead: Option<f32>, own_speed: f32) -> FollowingUpdate {
        let gap = time_gap(closest_ahead, own_speed, self.config.min_speed);
        let state = self.classify(gap);
        let previous = std::mem::replace(&mut self.state, state);

        let announcement = (state > previous && state >= FollowingState::Close).then(|| {
            debug!("Following gap {:?} s, state {:?}", gap, state);
            let text = match state {
                FollowingState::Dangerous => "Following dangerously close. Slowing down.",
                _ => "Following too closely. Increasing gap.",
            };
            Announcement::medium(text, Category::Following)
        });

        FollowingUpdate {
            state,
            gap,
            speed_factor: self.config.speed_factors[state.level() as usize],
            announcement,
        }
    }

    pub fn reset(&mut self) {
        self.state = FollowingState::Clear;
    }
}

impl Default for FollowingMonitor {
    fn default() -> Self {
        Self::new(FollowingConfig::default())
    }
}

/// Moves the commanded speed toward a target at capped rates
#[derive(Debug, Clone)]
pub struct SmoothSpeedController {
    /// Max increase (m/s per second)
    accel_rate: f32,
    /// Max decrease (m/s per second)
    decel_rate: f32,
    current: Option<f32>,
}

impl SmoothSpeedController {
    pub fn new(accel_rate: f32, decel_rate: f32) -> Self {
        Self {
            accel_rate,
            decel_rate,
            current: None,
        }
    }

    pub fn set_rates(&mut self, accel_rate: f32, decel_rate: f32) {
        self.accel_rate = accel_rate;
        self.decel_rate = decel_rate;
    }

    pub fn current(&self) -> Option<f32> {
        self.current
    }

    /// Advance by `dt_s` seconds; the first call jumps straight to `target`
    pub fn step(&mut self, target: f32, dt_s: f32) -> f32 {
        let next = match self.current {
            None => target,
            Some(current) => {
                let dt = dt_s.max(0.0);
                let delta = (target - current).clamp(-self.decel_rate * dt, self.accel_rate * dt);
                current + delta
            }
        };
        self.current = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}
