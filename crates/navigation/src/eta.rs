//! Arrival time estimate from median-filtered speed

use announce::{Announcement, Category};
use data_validator::MedianFilter;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EtaConfig {
    pub sample_interval_ms: i64,
    /// Speed samples in the median window
    pub window: usize,
    /// Periodic announcement interval (ms)
    pub announce_interval_ms: i64,
    /// Below this median speed no estimate is given (m/s)
    pub min_speed: f32,
}

impl Default for EtaConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1_000,
            window: 15,
            announce_interval_ms: 120_000,
            min_speed: 1.0,
        }
    }
}

/// Spoken form of an arrival estimate
pub fn describe_eta(seconds: f32) -> String {
    let minutes = (seconds / 60.0).round() as u32;
    match minutes {
        0 => "Arriving in less than a minute.".to_string(),
        1 => "Arriving in about 1 minute.".to_string(),
        m => format!("Arriving in about {} minutes.", m),
    }
}

pub struct EtaEstimator {
    config: EtaConfig,
    speeds: MedianFilter,
    last_sample_ms: Option<i64>,
    last_announced_ms: Option<i64>,
}

impl EtaEstimator {
    pub fn new(config: EtaConfig) -> Self {
        Self {
            speeds: MedianFilter::new(config.window),
            config,
            last_sample_ms: None,
            last_announced_ms: None,
        }
    }

    pub fn sample(&mut self, speed: f32, now_ms: i64) {
        if let Some(last) = self.last_sample_ms {
            if now_ms - last < self.config.sample_interval_ms {
                return;
            }
        }
        self.last_sample_ms = Some(now_ms);
        self.speeds.push(speed);
    }

    pub fn eta_seconds(&self, remaining: f32) -> Option<f32> {
        let speed = self.speeds.median()?;
        (speed >= self.config.min_speed).then(|| remaining.max(0.0) / speed)
    }

    /// Periodic estimate; the first one waits a full interval
    pub fn periodic(&mut self, remaining: f32, now_ms: i64) -> Option<Announcement> {
        let last = *self.last_announced_ms.get_or_insert(now_ms);
        if now_ms - last < self.config.announce_interval_ms {
            return None;
        }
        let seconds = self.eta_seconds(remaining)?;
        self.last_announced_ms = Some(now_ms);
        Some(Announcement::low(describe_eta(seconds), Category::Eta))
    }

    /// Estimate requested by the user
    pub fn on_demand(&self, remaining: f32) -> Announcement {
        let text = match self.eta_seconds(remaining) {
            Some(seconds) => describe_eta(seconds),
            None => "Arrival time unavailable while stopped.".to_string(),
        };
        Announcement::high(text, Category::Eta)
    }

    pub fn reset(&mut self) {
        self.speeds.reset();
        self.last_sample_ms = None;
        self.last_announced_ms = None;
    }
}

impl Default for EtaEstimator {
    fn default() -> Self {
        Self::new(EtaConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe() {
        assert_eq!(describe_eta(20.0), "Arriving in less than a minute.");
        assert_eq!(describe_eta(70.0), "Arriving in about 1 minute.");
        assert_eq!(describe_eta(240.0), "Arriving in about 4 minutes.");
    }

    #[test]
    fn test_median_ignores_spike() {
        let mut eta = EtaEstimator::default();
        for (i, speed) in [20.0, 20.0, 90.0, 20.0, 20.0].iter().enumerate() {
            eta.sample(*speed, i as i64 * 1_000);
        }
        let seconds = eta.eta_seconds(2_400.0).unwrap();
        assert!((seconds - 120.0).abs() < 1e-3);
    }

    #[test]
    fn test_stopped_has_no_estimate() {
        let mut eta = EtaEstimator::default();
        eta.sample(0.0, 0);
        assert!(eta.eta_seconds(500.0).is_none());
        assert!(eta.on_demand(500.0).text.contains("unavailable"));
    }

    #[test]
    fn test_periodic_interval() {
        let mut eta = EtaEstimator::default();
        eta.sample(20.0, 0);
        assert!(eta.periodic(4_800.0, 0).is_none());
        assert!(eta.periodic(4_800.0, 60_000).is_none());
        let a = eta.periodic(4_800.0, 120_000).expect("periodic eta");
        assert_eq!(a.text, "Arriving in about 4 minutes.");
    }
}
