//! Time of day speed multiplier and headlights

use announce::{Announcement, Category};
use host::WorldQuery;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Part of the day, from the game clock hour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayPeriod {
    Dawn,
    Day,
    Dusk,
    Night,
}

impl DayPeriod {
    pub fn from_hour(hour: u8) -> Self {
        match hour % 24 {
            5..=6 => DayPeriod::Dawn,
            7..=18 => DayPeriod::Day,
            19..=20 => DayPeriod::Dusk,
            _ => DayPeriod::Night,
        }
    }

    pub fn headlights(self) -> bool {
        !matches!(self, DayPeriod::Day)
    }

    fn name(self) -> &'static str {
        match self {
            DayPeriod::Dawn => "Dawn",
            DayPeriod::Day => "Daytime",
            DayPeriod::Dusk => "Dusk",
            DayPeriod::Night => "Night",
        }
    }
}

/// Time of day configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeOfDayConfig {
    pub check_interval_ms: i64,
    pub night_multiplier: f32,
    pub twilight_multiplier: f32,
    /// Switch headlights with the period
    pub manage_headlights: bool,
}

impl Default for TimeOfDayConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 10_000,
            night_multiplier: 0.85,
            twilight_multiplier: 0.95,
            manage_headlights: true,
        }
    }
}

/// Outcome of one time-of-day check
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeOfDayUpdate {
    /// Headlight state to apply, if it should change
    pub headlights: Option<bool>,
    pub announcement: Option<Announcement>,
}

/// Tracks the day period
pub struct TimeOfDayMonitor {
    config: TimeOfDayConfig,
    period: Option<DayPeriod>,
    last_check_ms: Option<i64>,
}

impl TimeOfDayMonitor {
    pub fn new(config: TimeOfDayConfig) -> Self {
        Self {
            config,
            period: None,
            last_check_ms: None,
        }
    }

    pub fn update(&mut self, world: &dyn WorldQuery, now_ms: i64) -> TimeOfDayUpdate {
        if let Some(last) = self.last_check_ms {
            if now_ms - last < self.config.check_interval_ms {
                return TimeOfDayUpdate::default();
            }
        }
        self.last_check_ms = Some(now_ms);

        let hour = match world.hour_of_day() {
            Ok(hour) => hour,
            Err(e) => {
                warn!("Clock query failed: {}", e);
                return TimeOfDayUpdate::default();
            }
        };

        let period = DayPeriod::from_hour(hour);
        let previous = self.period.replace(period);
        if previous == Some(period) {
            return TimeOfDayUpdate::default();
        }

        let headlights = self
            .config
            .manage_headlights
            .then_some(period.headlights())
            .filter(|on| previous.map(|p| p.headlights()) != Some(*on));

        let announcement = previous.map(|_| {
            let lights = match headlights {
                Some(true) => " Headlights on.",
                Some(false) => " Headlights off.",
                None => "",
            };
            Announcement::low(format!("{}.{}", period.name(), lights), Category::TimeOfDay)
        });

        TimeOfDayUpdate {
            headlights,
            announcement,
        }
    }

    pub fn period(&self) -> Option<DayPeriod> {
        self.period
    }

    pub fn speed_multiplier(&self) -> f32 {
        match self.period {
            Some(DayPeriod::Night) => self.config.night_multiplier,
            Some(DayPeriod::Dawn) | Some(DayPeriod::Dusk) => self.config.twilight_multiplier,
            Some(DayPeriod::Day) | None => 1.0,
        }
    }

    pub fn reset(&mut self) {
        self.period = None;
        self.last_check_ms = None;
    }
}

impl Default for TimeOfDayMonitor {
    fn default() -> Self {
        Self::new(TimeOfDayConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::mock::MockHost;

    #[test]
    fn test_periods() {
        assert_eq!(DayPeriod::from_hour(3), DayPeriod::Night);
        assert_eq!(DayPeriod::from_hour(6), DayPeriod::Dawn);
        assert_eq!(DayPeriod::from_hour(12), DayPeriod::Day);
        assert_eq!(DayPeriod::from_hour(20), DayPeriod::Dusk);
        assert_eq!(DayPeriod::from_hour(23), DayPeriod::Night);
    }

    #[test]
    fn test_first_check_sets_headlights_silently() {
        let mut host = MockHost::new();
        host.hour = 23;
        let mut monitor = TimeOfDayMonitor::default();

        let update = monitor.update(&host, 0);
        assert_eq!(update.headlights, Some(true));
        assert!(update.announcement.is_none());
        assert!((monitor.speed_multiplier() - 0.85).abs() < 1e-5);
    }

    #[test]
    fn test_dusk_turns_headlights_on() {
        let mut host = MockHost::new();
        let mut monitor = TimeOfDayMonitor::default();
        assert_eq!(monitor.update(&host, 0).headlights, Some(false));

        host.hour = 19;
        let update = monitor.update(&host, 10_000);
        assert_eq!(update.headlights, Some(true));
        let text = update.announcement.expect("announced").text;
        assert_eq!(text, "Dusk. Headlights on.");
    }

    #[test]
    fn test_dusk_to_night_keeps_headlights() {
        let mut host = MockHost::new();
        host.hour = 20;
        let mut monitor = TimeOfDayMonitor::default();
        monitor.update(&host, 0);

        host.hour = 22;
        let update = monitor.update(&host, 10_000);
        assert_eq!(update.headlights, None);
        assert_eq!(update.announcement.expect("announced").text, "Night.");
    }
}
