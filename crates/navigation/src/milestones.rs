//! Distance milestone announcements
//!
//! Far out, every quarter-mile boundary crossed is spoken. Inside half a
//! mile a fixed descending list of foot thresholds takes over, each fired
//! at most once.

use crate::{FEET_PER_METER, METERS_PER_MILE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MilestoneConfig {
    /// Switch from mile to foot milestones below this (miles)
    pub fine_below_miles: f32,
    /// Coarse boundary spacing (miles)
    pub coarse_step_miles: f32,
    /// Descending foot thresholds
    pub foot_thresholds: Vec<u32>,
}

impl Default for MilestoneConfig {
    fn default() -> Self {
        Self {
            fine_below_miles: 0.5,
            coarse_step_miles: 0.25,
            foot_thresholds: vec![2000, 1500, 1000, 750, 500, 250, 100],
        }
    }
}

/// Spoken form of a mile distance on a quarter boundary
pub fn describe_miles(miles: f32) -> String {
    let quarters = (miles * 4.0).round() as u32;
    let whole = quarters / 4;
    let fraction = match quarters % 4 {
        1 => "a quarter",
        2 => "a half",
        3 => "three quarters",
        _ => "",
    };
    match (whole, fraction) {
        (0, "a half") => "Half a mile".to_string(),
        (0, f) => format!("{} of a mile", capitalize(f)),
        (1, "") => "1 mile".to_string(),
        (w, "") => format!("{} miles", w),
        (w, f) => format!("{} and {} miles", w, f),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone)]
pub struct MilestoneTracker {
    config: MilestoneConfig,
    /// Coarse boundary index at the last update
    last_step: Option<u32>,
    /// Foot thresholds at or above this index have fired
    next_foot: usize,
}

impl MilestoneTracker {
    pub fn new(config: MilestoneConfig) -> Self {
        Self {
            config,
            last_step: None,
            next_foot: 0,
        }
    }

    /// Feed the remaining distance (m); returns the text of a crossed milestone
    pub fn update(&mut self, remaining_m: f32) -> Option<String> {
        let miles = remaining_m / METERS_PER_MILE;
        let feet = remaining_m * FEET_PER_METER;
        let first = self.last_step.is_none();

        let step = (miles / self.config.coarse_step_miles).floor().max(0.0) as u32;
        let previous = self.last_step.replace(step);

        // Thresholds already behind us at session start never fire
        if first {
            self.skip_feet_above(feet);
            return None;
        }

        if miles >= self.config.fine_below_miles {
            return match previous {
                Some(prev) if step < prev => {
                    let boundary = (step + 1) as f32 * self.config.coarse_step_miles;
                    Some(format!("{} remaining.", describe_miles(boundary)))
                }
                _ => None,
            };
        }

        let before = self.next_foot;
        self.skip_feet_above(feet);
        if self.next_foot > before {
            let crossed = self.config.foot_thresholds[self.next_foot - 1];
            return Some(format!("{} feet remaining.", crossed));
        }
        None
    }

    fn skip_feet_above(&mut self, feet: f32) {
        while let Some(&threshold) = self.config.foot_thresholds.get(self.next_foot) {
            if feet <= threshold as f32 {
                self.next_foot += 1;
            } else {
                break;
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_step = None;
        self.next_foot = 0;
    }
}

impl Default for MilestoneTracker {
    fn default() -> Self {
        Self::new(MilestoneConfig::default())
    }
}
