//! Recovery state machine
//!
//! The manager owns stuck detection and the progress timeout, and once
//! recovery begins it walks the attempt's maneuver plan on wall-clock
//! timers. It never talks to the host directly: every tick returns the
//! commands and announcement the caller should apply.

use crate::strategy::{default_ladder, plan_for_attempt, LadderEntry, ManeuverPhase, RecoveryPlan};
use crate::stuck::{ProgressConfig, ProgressMonitor, StuckConfig, StuckDetector};
use announce::{Announcement, Category};
use host::{TempAction, VehicleSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryState {
    None,
    Reversing,
    Turning,
    ForwardManeuver,
    ThreePointTurn,
    Resuming,
    Failed,
}

impl From<ManeuverPhase> for RecoveryState {
    fn from(phase: ManeuverPhase) -> Self {
        match phase {
            ManeuverPhase::Reversing => RecoveryState::Reversing,
            ManeuverPhase::Turning => RecoveryState::Turning,
            ManeuverPhase::ForwardManeuver => RecoveryState::ForwardManeuver,
            ManeuverPhase::ThreePointTurn => RecoveryState::ThreePointTurn,
        }
    }
}

/// Recovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub stuck: StuckConfig,
    pub progress: ProgressConfig,
    pub ladder: Vec<LadderEntry>,
    /// Attempts before giving up
    pub max_attempts: u32,
    /// Settle time between the last maneuver and the task reissue (ms)
    pub resume_settle_ms: u32,
    /// Speed that confirms the vehicle is free once the cooldown ends (m/s)
    pub confirm_speed: f32,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            stuck: StuckConfig::default(),
            progress: ProgressConfig::default(),
            ladder: default_ladder(),
            max_attempts: 5,
            resume_settle_ms: 1_000,
            confirm_speed: 3.0,
        }
    }
}

/// What the caller must do on the host
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryCommand {
    Temp { action: TempAction, duration_ms: u32 },
    /// Maneuvers finished, put the driving task back
    ReissueTask,
    /// Recovery gave up, stop AutoDrive
    Stop,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecoveryUpdate {
    pub commands: Vec<RecoveryCommand>,
    pub announcement: Option<Announcement>,
}

impl RecoveryUpdate {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.announcement.is_none()
    }
}

pub struct RecoveryManager {
    config: RecoveryConfig,
    state: RecoveryState,
    attempts: u32,
    plan: Option<RecoveryPlan>,
    phase: usize,
    phase_started_ms: i64,
    stuck: StuckDetector,
    progress: ProgressMonitor,
    /// After this time a moving vehicle clears the attempt counter
    confirm_after_ms: Option<i64>,
}

impl RecoveryManager {
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            stuck: StuckDetector::new(config.stuck.clone()),
            progress: ProgressMonitor::new(config.progress.clone()),
            config,
            state: RecoveryState::None,
            attempts: 0,
            plan: None,
            phase: 0,
            phase_started_ms: 0,
            confirm_after_ms: None,
        }
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// A maneuver or the settle period is running
    pub fn is_recovering(&self) -> bool {
        !matches!(self.state, RecoveryState::None | RecoveryState::Failed)
    }

    /// Feed a stuck-detection sample; true means recovery should begin
    pub fn check_stuck(&mut self, vehicle: &VehicleSnapshot, waiting: bool, now_ms: i64) -> bool {
        if self.state != RecoveryState::None {
            return false;
        }
        self.confirm_progress(vehicle, now_ms);
        self.stuck.update(vehicle, waiting, now_ms)
    }

    /// Feed the remaining waypoint distance; true means no net progress
    /// for the whole timeout
    pub fn check_progress(&mut self, remaining: f32, waiting: bool, now_ms: i64) -> bool {
        if self.state != RecoveryState::None {
            return false;
        }
        let waiting = waiting || self.stuck.in_cooldown(now_ms);
        self.progress.update(remaining, waiting, now_ms)
    }

    fn confirm_progress(&mut self, vehicle: &VehicleSnapshot, now_ms: i64) {
        let Some(after) = self.confirm_after_ms else {
            return;
        };
        if now_ms >= after && vehicle.speed >= self.config.confirm_speed {
            debug!("Progress confirmed after recovery, attempt counter cleared");
            self.attempts = 0;
            self.confirm_after_ms = None;
        }
    }

    /// Start the next attempt, or fail once attempts are exhausted
    pub fn begin(&mut self, now_ms: i64) -> RecoveryUpdate {
        if self.attempts >= self.config.max_attempts {
            warn!("Recovery exhausted after {} attempts", self.attempts);
            return self.fail();
        }

        self.attempts += 1;
        let Some(plan) = plan_for_attempt(self.attempts, &self.config.ladder) else {
            warn!("Recovery ladder is empty");
            return self.fail();
        };
        let Some(&(phase, action, duration_ms)) = plan.phases.first() else {
            warn!("Recovery plan for attempt {} has no phases", self.attempts);
            return self.fail();
        };

        info!(
            "Recovery attempt {} ({:?}, {:?})",
            self.attempts, plan.kind, plan.direction
        );
        self.state = phase.into();
        self.phase = 0;
        self.phase_started_ms = now_ms;
        self.plan = Some(plan);

        RecoveryUpdate {
            commands: vec![RecoveryCommand::Temp {
                action,
                duration_ms,
            }],
            announcement: Some(Announcement::medium(
                format!("Vehicle stuck. Recovery attempt {}.", self.attempts),
                Category::Recovery,
            )),
        }
    }

    /// Advance the running maneuver by wall-clock time
    pub fn update(&mut self, now_ms: i64) -> RecoveryUpdate {
        let elapsed = now_ms - self.phase_started_ms;
        match self.state {
            RecoveryState::None | RecoveryState::Failed => RecoveryUpdate::default(),
            RecoveryState::Resuming => {
                if elapsed < i64::from(self.config.resume_settle_ms) {
                    return RecoveryUpdate::default();
                }
                info!("Recovery attempt {} complete, resuming", self.attempts);
                self.state = RecoveryState::None;
                self.plan = None;
                self.stuck.start_cooldown(now_ms);
                self.progress.reset();
                self.confirm_after_ms = Some(now_ms + self.config.stuck.cooldown_ms);
                RecoveryUpdate {
                    commands: vec![RecoveryCommand::ReissueTask],
                    announcement: Some(Announcement::medium(
                        "Recovery complete. Resuming.",
                        Category::Recovery,
                    )),
                }
            }
            _ => {
                let Some(plan) = self.plan.as_ref() else {
                    return self.fail();
                };
                let current_ms = plan.phases.get(self.phase).map_or(0, |(_, _, ms)| *ms);
                if elapsed < i64::from(current_ms) {
                    return RecoveryUpdate::default();
                }

                self.phase += 1;
                self.phase_started_ms = now_ms;
                let (state, action, duration_ms) = match plan.phases.get(self.phase) {
                    Some(&(phase, action, ms)) => (phase.into(), action, ms),
                    None => (
                        RecoveryState::Resuming,
                        TempAction::Brake,
                        self.config.resume_settle_ms,
                    ),
                };
                debug!("Recovery phase {:?} -> {:?}", self.state, state);
                self.state = state;
                RecoveryUpdate {
                    commands: vec![RecoveryCommand::Temp {
                        action,
                        duration_ms,
                    }],
                    announcement: None,
                }
            }
        }
    }

    /// Give up; the caller stops AutoDrive
    pub fn fail(&mut self) -> RecoveryUpdate {
        self.state = RecoveryState::Failed;
        self.plan = None;
        RecoveryUpdate {
            commands: vec![RecoveryCommand::Stop],
            announcement: Some(Announcement::critical(
                "Unable to recover after multiple attempts. AutoDrive stopping.",
                Category::Recovery,
            )),
        }
    }

    /// Restart the progress timer, e.g. after the route changed
    pub fn restart_progress(&mut self, remaining: Option<f32>, now_ms: i64) {
        self.progress.restart(remaining, now_ms);
    }

    pub fn reset(&mut self) {
        self.state = RecoveryState::None;
        self.attempts = 0;
        self.plan = None;
        self.phase = 0;
        self.phase_started_ms = 0;
        self.stuck.reset();
        self.progress.reset();
        self.confirm_after_ms = None;
    }
}

impl Default for RecoveryManager {
    fn default() -> Self {
        Self::new(RecoveryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::{EntityId, Vec3};
    use proptest::prelude::*;

    fn temp(update: &RecoveryUpdate) -> Option<TempAction> {
        update.commands.iter().find_map(|c| match c {
            RecoveryCommand::Temp { action, .. } => Some(*action),
            _ => None,
        })
    }

    /// Run one attempt to completion starting at `start`; returns the end time
    fn run_attempt(manager: &mut RecoveryManager, start: i64) -> i64 {
        manager.begin(start);
        let mut now = start;
        while manager.is_recovering() {
            now += 100;
            manager.update(now);
        }
        now
    }

    #[test]
    fn test_first_attempt_sequence() {
        let mut manager = RecoveryManager::default();
        let begin = manager.begin(0);
        assert_eq!(manager.state(), RecoveryState::Reversing);
        assert_eq!(temp(&begin), Some(TempAction::ReverseStraight));
        assert!(begin.announcement.unwrap().text.contains("attempt 1"));

        assert!(manager.update(1_000).is_empty());
        let turn = manager.update(1_500);
        assert_eq!(manager.state(), RecoveryState::Turning);
        assert_eq!(temp(&turn), Some(TempAction::TurnRight));

        let settle = manager.update(3_000);
        assert_eq!(manager.state(), RecoveryState::Resuming);
        assert_eq!(temp(&settle), Some(TempAction::Brake));

        assert!(manager.update(3_500).is_empty());
        let resume = manager.update(4_000);
        assert_eq!(manager.state(), RecoveryState::None);
        assert_eq!(resume.commands, vec![RecoveryCommand::ReissueTask]);
    }

    #[test]
    fn test_fails_after_max_attempts() {
        let mut manager = RecoveryManager::default();
        let mut now = 0;
        for _ in 0..5 {
            now = run_attempt(&mut manager, now) + 1_000;
        }
        assert_eq!(manager.attempts(), 5);

        let update = manager.begin(now);
        assert_eq!(manager.state(), RecoveryState::Failed);
        assert_eq!(update.commands, vec![RecoveryCommand::Stop]);
        let announcement = update.announcement.unwrap();
        assert_eq!(announcement.priority, announce::Priority::Critical);
        assert!(announcement.text.starts_with("Unable to recover"));
    }

    #[test]
    fn test_attempts_cleared_by_confirmed_progress() {
        let mut manager = RecoveryManager::default();
        let end = run_attempt(&mut manager, 0);
        assert_eq!(manager.attempts(), 1);

        let mut moving = VehicleSnapshot::at_rest(EntityId(2), Vec3::ZERO, 0.0);
        moving.speed = 8.0;
        // Still inside the cooldown: not confirmed yet
        manager.check_stuck(&moving, false, end + 5_000);
        assert_eq!(manager.attempts(), 1);
        manager.check_stuck(&moving, false, end + 10_000);
        assert_eq!(manager.attempts(), 0);
    }

    #[test]
    fn test_attempts_persist_when_stuck_again() {
        let mut manager = RecoveryManager::default();
        let end = run_attempt(&mut manager, 0);
        let parked = VehicleSnapshot::at_rest(EntityId(2), Vec3::ZERO, 0.0);
        let mut now = end;
        let mut detected = false;
        while !detected && now < end + 30_000 {
            now += 1_000;
            detected = manager.check_stuck(&parked, false, now);
        }
        assert!(detected);
        manager.begin(now);
        assert_eq!(manager.attempts(), 2);
    }

    #[test]
    fn test_no_detection_while_recovering() {
        let mut manager = RecoveryManager::default();
        let parked = VehicleSnapshot::at_rest(EntityId(2), Vec3::ZERO, 0.0);
        manager.begin(0);
        for i in 0..20 {
            assert!(!manager.check_stuck(&parked, false, i * 1_000));
            assert!(!manager.check_progress(100.0, false, i * 1_000));
        }
    }

    #[test]
    fn test_reset_clears_failure() {
        let mut manager = RecoveryManager::default();
        manager.fail();
        manager.reset();
        assert_eq!(manager.state(), RecoveryState::None);
        assert_eq!(manager.attempts(), 0);
    }

    proptest! {
        #[test]
        fn prop_every_attempt_resumes(attempts in 1u32..=5) {
            let mut manager = RecoveryManager::default();
            let mut now = 0;
            for _ in 0..attempts {
                let begin = manager.begin(now);
                prop_assert!(temp(&begin).is_some());
                let mut reissued = false;
                while manager.is_recovering() {
                    now += 250;
                    reissued |= manager
                        .update(now)
                        .commands
                        .contains(&RecoveryCommand::ReissueTask);
                }
                prop_assert!(reissued);
                prop_assert_eq!(manager.state(), RecoveryState::None);
            }
        }
    }
}
