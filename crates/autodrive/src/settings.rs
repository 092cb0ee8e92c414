//! Settings snapshot
//!
//! Detectors never query the string-keyed store. The snapshot is read on
//! an interval and handed down as plain data.

use announce::Category;
use host::Settings;
use std::collections::HashSet;
use tracing::debug;

/// Settings key for the audio beacon toggle
pub const BEACONS_SETTING: &str = "autodrive_audio_beacons";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsSnapshot {
    /// Announcement categories switched off
    pub disabled: HashSet<Category>,
    pub audio_beacons: bool,
}

impl Default for SettingsSnapshot {
    fn default() -> Self {
        Self {
            disabled: HashSet::new(),
            audio_beacons: true,
        }
    }
}

impl SettingsSnapshot {
    /// Read every toggle; missing keys mean enabled
    pub fn read(settings: &dyn Settings) -> Self {
        let disabled = Category::ALL
            .iter()
            .copied()
            .filter(|c| settings.get_bool(c.setting_key()) == Some(false))
            .collect();
        Self {
            disabled,
            audio_beacons: settings.get_bool(BEACONS_SETTING).unwrap_or(true),
        }
    }
}

/// Interval-refreshed snapshot holder
#[derive(Debug)]
pub struct SettingsCache {
    snapshot: SettingsSnapshot,
    refresh_interval_ms: i64,
    last_refresh_ms: Option<i64>,
}

impl SettingsCache {
    pub fn new(refresh_interval_ms: i64) -> Self {
        Self {
            snapshot: SettingsSnapshot::default(),
            refresh_interval_ms,
            last_refresh_ms: None,
        }
    }

    pub fn snapshot(&self) -> &SettingsSnapshot {
        &self.snapshot
    }

    /// Re-read if the interval elapsed; true when the snapshot changed
    pub fn refresh(&mut self, settings: &dyn Settings, now_ms: i64) -> bool {
        if let Some(last) = self.last_refresh_ms {
            if now_ms - last < self.refresh_interval_ms {
                return false;
            }
        }
        self.force_refresh(settings, now_ms)
    }

    pub fn force_refresh(&mut self, settings: &dyn Settings, now_ms: i64) -> bool {
        self.last_refresh_ms = Some(now_ms);
        let fresh = SettingsSnapshot::read(settings);
        if fresh == self.snapshot {
            return false;
        }
        debug!(
            "Settings changed: {} categories disabled, beacons {}",
            fresh.disabled.len(),
            fresh.audio_beacons
        );
        self.snapshot = fresh;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::mock::MockHost;

    #[test]
    fn test_defaults_enable_everything() {
        let host = MockHost::new();
        let snapshot = SettingsSnapshot::read(&host);
        assert!(snapshot.disabled.is_empty());
        assert!(snapshot.audio_beacons);
    }

    #[test]
    fn test_refresh_interval() {
        let mut host = MockHost::new();
        let mut cache = SettingsCache::new(2_000);
        assert!(!cache.refresh(&host, 0));

        host.bool_settings
            .insert(Category::Weather.setting_key().to_string(), false);
        host.bool_settings.insert(BEACONS_SETTING.to_string(), false);
        assert!(!cache.refresh(&host, 1_000));
        assert!(cache.refresh(&host, 2_000));
        assert!(cache.snapshot().disabled.contains(&Category::Weather));
        assert!(!cache.snapshot().audio_beacons);
    }
}
