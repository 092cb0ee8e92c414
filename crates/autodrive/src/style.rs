//! Driving style profiles

use serde::{Deserialize, Serialize};
use std::fmt;

/// Settings key the selected style is persisted under
pub const STYLE_SETTING: &str = "autodrive_driving_style";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum DrivingStyle {
    Cautious,
    #[default]
    Normal,
    Fast,
    Reckless,
}

/// Parameters handed to the host AI and the speed logic for one style
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StyleProfile {
    /// Host driving-style bitmask
    pub flags: u32,
    pub ability: f32,
    pub aggressiveness: f32,
    pub speed_multiplier: f32,
    /// Scales the safe curve speed
    pub curve_modifier: f32,
    /// Following controller rate caps (m/s per second)
    pub accel_rate: f32,
    pub decel_rate: f32,
}

impl DrivingStyle {
    pub const ALL: [DrivingStyle; 4] = [
        DrivingStyle::Cautious,
        DrivingStyle::Normal,
        DrivingStyle::Fast,
        DrivingStyle::Reckless,
    ];

    /// Next style in the fixed rotation
    pub fn next(self) -> Self {
        let i = self.index() as usize;
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn index(self) -> i64 {
        match self {
            DrivingStyle::Cautious => 0,
            DrivingStyle::Normal => 1,
            DrivingStyle::Fast => 2,
            DrivingStyle::Reckless => 3,
        }
    }

    pub fn from_index(index: i64) -> Option<Self> {
        usize::try_from(index)
            .ok()
            .and_then(|i| Self::ALL.get(i).copied())
    }

    pub fn name(self) -> &'static str {
        match self {
            DrivingStyle::Cautious => "cautious",
            DrivingStyle::Normal => "normal",
            DrivingStyle::Fast => "fast",
            DrivingStyle::Reckless => "reckless",
        }
    }

    pub fn profile(self) -> StyleProfile {
        match self {
            DrivingStyle::Cautious => StyleProfile {
                flags: 786_603,
                ability: 1.0,
                aggressiveness: 0.0,
                speed_multiplier: 0.8,
                curve_modifier: 0.85,
                accel_rate: 1.5,
                decel_rate: 3.0,
            },
            DrivingStyle::Normal => StyleProfile {
                flags: 786_468,
                ability: 1.0,
                aggressiveness: 0.5,
                speed_multiplier: 1.0,
                curve_modifier: 1.0,
                accel_rate: 2.5,
                decel_rate: 4.0,
            },
            DrivingStyle::Fast => StyleProfile {
                flags: 1_074_528_293,
                ability: 1.0,
                aggressiveness: 0.75,
                speed_multiplier: 1.2,
                curve_modifier: 1.1,
                accel_rate: 3.5,
                decel_rate: 5.0,
            },
            DrivingStyle::Reckless => StyleProfile {
                flags: 2_883_621,
                ability: 1.0,
                aggressiveness: 1.0,
                speed_multiplier: 1.4,
                curve_modifier: 1.25,
                accel_rate: 5.0,
                decel_rate: 7.0,
            },
        }
    }
}

impl fmt::Display for DrivingStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_wraps() {
        let mut style = DrivingStyle::Cautious;
        let mut seen = Vec::new();
        for _ in 0..4 {
            style = style.next();
            seen.push(style);
        }
        assert_eq!(
            seen,
            vec![
                DrivingStyle::Normal,
                DrivingStyle::Fast,
                DrivingStyle::Reckless,
                DrivingStyle::Cautious
            ]
        );
    }

    #[test]
    fn test_index_round_trip() {
        for style in DrivingStyle::ALL {
            assert_eq!(DrivingStyle::from_index(style.index()), Some(style));
        }
        assert_eq!(DrivingStyle::from_index(7), None);
        assert_eq!(DrivingStyle::from_index(-1), None);
    }

    #[test]
    fn test_profiles_ordered() {
        let multipliers: Vec<f32> = DrivingStyle::ALL
            .iter()
            .map(|s| s.profile().speed_multiplier)
            .collect();
        assert!(multipliers.windows(2).all(|w| w[0] < w[1]));
    }
}
