//! Announcement requests and their classification

use serde::{Deserialize, Serialize};
use std::fmt;

/// Announcement priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    /// Always spoken, always interrupts
    Critical,
}

/// Originating category; each one is an independent cooldown bucket and
/// can be switched off in settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Status,
    VehicleState,
    Recovery,
    Navigation,
    Eta,
    Curves,
    Intersections,
    Structures,
    Terrain,
    RoadType,
    Zones,
    Weather,
    TimeOfDay,
    Collision,
    Following,
    Emergency,
    Traffic,
    TrafficLight,
}

impl Category {
    pub const ALL: [Category; 18] = [
        Category::Status,
        Category::VehicleState,
        Category::Recovery,
        Category::Navigation,
        Category::Eta,
        Category::Curves,
        Category::Intersections,
        Category::Structures,
        Category::Terrain,
        Category::RoadType,
        Category::Zones,
        Category::Weather,
        Category::TimeOfDay,
        Category::Collision,
        Category::Following,
        Category::Emergency,
        Category::Traffic,
        Category::TrafficLight,
    ];

    /// Settings key of the on/off toggle for this category
    pub fn setting_key(self) -> &'static str {
        match self {
            Category::Status => "announce_status",
            Category::VehicleState => "announce_vehicle_state",
            Category::Recovery => "announce_recovery",
            Category::Navigation => "announce_navigation",
            Category::Eta => "announce_eta",
            Category::Curves => "announce_curves",
            Category::Intersections => "announce_intersections",
            Category::Structures => "announce_structures",
            Category::Terrain => "announce_terrain",
            Category::RoadType => "announce_road_type",
            Category::Zones => "announce_zones",
            Category::Weather => "announce_weather",
            Category::TimeOfDay => "announce_time_of_day",
            Category::Collision => "announce_collision",
            Category::Following => "announce_following",
            Category::Emergency => "announce_emergency",
            Category::Traffic => "announce_traffic",
            Category::TrafficLight => "announce_traffic_light",
        }
    }

    /// Minimum time between two announcements of this category (ms)
    pub fn default_cooldown_ms(self) -> u64 {
        match self {
            Category::Status | Category::VehicleState | Category::Recovery => 0,
            Category::Navigation => 2_000,
            Category::Eta => 60_000,
            Category::Curves => 3_000,
            Category::Intersections => 5_000,
            Category::Structures => 5_000,
            Category::Terrain => 8_000,
            Category::RoadType => 10_000,
            Category::Zones => 10_000,
            Category::Weather => 30_000,
            Category::TimeOfDay => 60_000,
            Category::Collision => 2_000,
            Category::Following => 6_000,
            Category::Emergency => 5_000,
            Category::Traffic => 4_000,
            Category::TrafficLight => 4_000,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A request to speak
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub text: String,
    pub priority: Priority,
    pub category: Category,
}

impl Announcement {
    pub fn new(text: impl Into<String>, priority: Priority, category: Category) -> Self {
        Self {
            text: text.into(),
            priority,
            category,
        }
    }

    pub fn low(text: impl Into<String>, category: Category) -> Self {
        Self::new(text, Priority::Low, category)
    }

    pub fn medium(text: impl Into<String>, category: Category) -> Self {
        Self::new(text, Priority::Medium, category)
    }

    pub fn high(text: impl Into<String>, category: Category) -> Self {
        Self::new(text, Priority::High, category)
    }

    pub fn critical(text: impl Into<String>, category: Category) -> Self {
        Self::new(text, Priority::Critical, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_priority_ordering() {
        assert!(Priority::Critical > Priority::High);
        assert!(Priority::High > Priority::Medium);
        assert!(Priority::Medium > Priority::Low);
    }

    #[test]
    fn test_setting_keys_unique() {
        let keys: HashSet<_> = Category::ALL.iter().map(|c| c.setting_key()).collect();
        assert_eq!(keys.len(), Category::ALL.len());
    }
}
