//! Weather speed and friction modifiers

use announce::{Announcement, Category};
use host::{WeatherKind, WorldQuery};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Dry tarmac friction coefficient
pub const BASE_FRICTION: f32 = 0.8;

/// Driving modifiers for one weather kind
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeatherProfile {
    pub speed_multiplier: f32,
    /// Scales `BASE_FRICTION`
    pub friction_factor: f32,
}

impl WeatherProfile {
    pub fn friction_coefficient(&self) -> f32 {
        BASE_FRICTION * self.friction_factor
    }
}

/// Pure mapping from host weather to driving modifiers
pub struct WeatherState;

impl WeatherState {
    pub fn profile(kind: WeatherKind) -> WeatherProfile {
        let (speed_multiplier, friction_factor) = match kind {
            WeatherKind::ExtraSunny
            | WeatherKind::Clear
            | WeatherKind::Clouds
            | WeatherKind::Overcast
            | WeatherKind::Smog
            | WeatherKind::Unknown => (1.0, 1.0),
            WeatherKind::Clearing => (0.95, 0.85),
            WeatherKind::Foggy => (0.8, 1.0),
            WeatherKind::Rain => (0.85, 0.7),
            WeatherKind::Thunder => (0.75, 0.65),
            WeatherKind::SnowLight => (0.75, 0.4),
            WeatherKind::Snow => (0.65, 0.3),
            WeatherKind::Blizzard => (0.5, 0.2),
        };
        WeatherProfile {
            speed_multiplier,
            friction_factor,
        }
    }

    pub fn describe(kind: WeatherKind) -> &'static str {
        match kind {
            WeatherKind::ExtraSunny => "sunny",
            WeatherKind::Clear => "clear",
            WeatherKind::Clouds => "cloudy",
            WeatherKind::Overcast => "overcast",
            WeatherKind::Smog => "smoggy",
            WeatherKind::Foggy => "foggy",
            WeatherKind::Clearing => "clearing",
            WeatherKind::Rain => "raining",
            WeatherKind::Thunder => "thunderstorm",
            WeatherKind::SnowLight => "light snow",
            WeatherKind::Snow => "snowing",
            WeatherKind::Blizzard => "blizzard",
            WeatherKind::Unknown => "unknown",
        }
    }
}

/// Weather monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub check_interval_ms: i64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 5_000,
        }
    }
}

/// Tracks host weather and announces changes
pub struct WeatherMonitor {
    config: WeatherConfig,
    current: Option<WeatherKind>,
    last_check_ms: Option<i64>,
}

impl WeatherMonitor {
    pub fn new(config: WeatherConfig) -> Self {
        Self {
            config,
            current: None,
            last_check_ms: None,
        }
    }

    /// Poll the host on the check interval; announces changes after the
    /// first reading
    pub fn update(&mut self, world: &dyn WorldQuery, now_ms: i64) -> Option<Announcement> {
        if let Some(last) = self.last_check_ms {
            if now_ms - last < self.config.check_interval_ms {
                return None;
            }
        }
        self.last_check_ms = Some(now_ms);

        let kind = match world.current_weather() {
            Ok(kind) => kind,
            Err(e) => {
                warn!("Weather query failed, keeping previous weather: {}", e);
                return None;
            }
        };

        let previous = self.current.replace(kind);
        match previous {
            Some(prev) if prev != kind => {
                let old = WeatherState::profile(prev);
                let new = WeatherState::profile(kind);
                debug!("Weather changed {:?} -> {:?}", prev, kind);
                let suffix = if new.speed_multiplier < old.speed_multiplier {
                    " Slowing down for conditions."
                } else if new.speed_multiplier > old.speed_multiplier {
                    " Resuming normal speed."
                } else {
                    ""
                };
                Some(Announcement::low(
                    format!("Weather now {}.{}", WeatherState::describe(kind), suffix),
                    Category::Weather,
                ))
            }
            _ => None,
        }
    }

    pub fn current(&self) -> Option<WeatherKind> {
        self.current
    }

    pub fn profile(&self) -> WeatherProfile {
        WeatherState::profile(self.current.unwrap_or_default())
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.profile().speed_multiplier
    }

    pub fn friction_coefficient(&self) -> f32 {
        self.profile().friction_coefficient()
    }

    pub fn reset(&mut self) {
        self.current = None;
        self.last_check_ms = None;
    }
}

impl Default for WeatherMonitor {
    fn default() -> Self {
        Self::new(WeatherConfig::default())
    }
}
