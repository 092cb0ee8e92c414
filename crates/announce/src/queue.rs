//! Announcement Queue Implementation
//!
//! Single-slot arbitration rather than a FIFO: a request is either spoken
//! now or dropped.

use crate::announcement::{Announcement, Category, Priority};
use host::Speech;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Announcement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnouncementConfig {
    /// Per-category cooldown overrides (ms); unset categories use their default
    pub cooldown_overrides: HashMap<Category, u64>,
    /// Estimated speaking time per character (ms)
    pub ms_per_char: u64,
    /// Lower bound of the in-flight window (ms)
    pub min_speech_ms: u64,
    /// Upper bound of the in-flight window (ms)
    pub max_speech_ms: u64,
    /// Critical announcements ignore category toggles and cooldowns
    pub critical_bypasses_toggles: bool,
}

impl Default for AnnouncementConfig {
    fn default() -> Self {
        Self {
            cooldown_overrides: HashMap::new(),
            ms_per_char: 55,
            min_speech_ms: 800,
            max_speech_ms: 4_000,
            critical_bypasses_toggles: true,
        }
    }
}

impl AnnouncementConfig {
    pub fn cooldown_ms(&self, category: Category) -> u64 {
        self.cooldown_overrides
            .get(&category)
            .copied()
            .unwrap_or_else(|| category.default_cooldown_ms())
    }

    /// Config with every cooldown zeroed, for callers that throttle themselves
    pub fn without_cooldowns() -> Self {
        Self {
            cooldown_overrides: Category::ALL.iter().map(|c| (*c, 0)).collect(),
            ..Default::default()
        }
    }
}

/// Per-category bookkeeping
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// Last time this category was spoken
    pub last_spoken_ms: i64,
    /// Number of times spoken
    pub spoken_count: usize,
}

/// Result of a `try_announce` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    Spoken { interrupted: bool },
    /// Category switched off in settings
    Disabled,
    /// Same category spoken too recently
    CoolingDown,
    /// A message of higher or equal priority is still being spoken
    Preempted,
    Empty,
}

impl AnnounceOutcome {
    pub fn was_spoken(self) -> bool {
        matches!(self, AnnounceOutcome::Spoken { .. })
    }
}

#[derive(Debug, Clone)]
struct InFlight {
    priority: Priority,
    category: Category,
    until_ms: i64,
}

/// Speech arbiter shared by every detector
pub struct AnnouncementQueue {
    config: AnnouncementConfig,
    disabled: HashSet<Category>,
    states: HashMap<Category, CategoryState>,
    in_flight: Option<InFlight>,
}

impl AnnouncementQueue {
    pub fn new(config: AnnouncementConfig) -> Self {
        debug!("Creating announcement queue with config: {:?}", config);
        Self {
            config,
            disabled: HashSet::new(),
            states: HashMap::new(),
            in_flight: None,
        }
    }

    /// Replace the set of categories switched off in settings
    pub fn set_disabled(&mut self, disabled: HashSet<Category>) {
        self.disabled = disabled;
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        !self.disabled.contains(&category)
    }

    /// Arbitrate and, if accepted, hand the text to the speech sink
    pub fn try_announce(
        &mut self,
        sink: &mut dyn Speech,
        announcement: &Announcement,
        now_ms: i64,
    ) -> AnnounceOutcome {
        if announcement.text.trim().is_empty() {
            return AnnounceOutcome::Empty;
        }

        let bypass = announcement.priority == Priority::Critical
            && self.config.critical_bypasses_toggles;

        if !bypass && !self.is_enabled(announcement.category) {
            debug!("Announcement suppressed: {} disabled", announcement.category);
            return AnnounceOutcome::Disabled;
        }

        if !bypass {
            if let Some(state) = self.states.get(&announcement.category) {
                let cooldown = self.config.cooldown_ms(announcement.category) as i64;
                if now_ms - state.last_spoken_ms < cooldown {
                    debug!(
                        "Announcement suppressed: {} cooling down",
                        announcement.category
                    );
                    return AnnounceOutcome::CoolingDown;
                }
            }
        }

        let mut interrupted = false;
        if let Some(current) = self.in_flight.as_ref().filter(|f| now_ms < f.until_ms) {
            if announcement.priority != Priority::Critical
                && current.priority >= announcement.priority
            {
                debug!(
                    "Announcement preempted by in-flight {} ({:?})",
                    current.category, current.priority
                );
                return AnnounceOutcome::Preempted;
            }
            interrupted = true;
        }

        sink.speak(&announcement.text, interrupted);
        self.record(announcement, now_ms);
        info!("Announced [{}]: {}", announcement.category, announcement.text);

        AnnounceOutcome::Spoken { interrupted }
    }

    /// Announce a batch in order; later items may be preempted by earlier ones
    pub fn announce_all(
        &mut self,
        sink: &mut dyn Speech,
        announcements: &[Announcement],
        now_ms: i64,
    ) -> usize {
        announcements
            .iter()
            .filter(|a| self.try_announce(sink, a, now_ms).was_spoken())
            .count()
    }

    fn record(&mut self, announcement: &Announcement, now_ms: i64) {
        let state = self
            .states
            .entry(announcement.category)
            .or_insert(CategoryState {
                last_spoken_ms: now_ms,
                spoken_count: 0,
            });
        state.last_spoken_ms = now_ms;
        state.spoken_count += 1;

        let duration = (announcement.text.chars().count() as u64 * self.config.ms_per_char)
            .clamp(self.config.min_speech_ms, self.config.max_speech_ms);
        self.in_flight = Some(InFlight {
            priority: announcement.priority,
            category: announcement.category,
            until_ms: now_ms + duration as i64,
        });
    }

    /// Whether a message is still considered to be playing
    pub fn is_speaking(&self, now_ms: i64) -> bool {
        self.in_flight
            .as_ref()
            .map_or(false, |f| now_ms < f.until_ms)
    }

    pub fn state(&self, category: Category) -> Option<&CategoryState> {
        self.states.get(&category)
    }

    /// Forget cooldowns and the in-flight message
    pub fn clear(&mut self) {
        self.states.clear();
        self.in_flight = None;
    }
}

impl Default for AnnouncementQueue {
    fn default() -> Self {
        Self::new(AnnouncementConfig::default())
    }
}
