//! One-tick deferred actions and drive task bookkeeping
//!
//! The host AI misbehaves when a new drive task is issued in the same tick
//! the previous one was cleared. Anything that would do so is queued here
//! and drained exactly once at the top of the next tick.

use host::Vec3;
use road::RoadType;
use std::collections::VecDeque;
use tracing::debug;

/// Mode a deferred start enters
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StartRequest {
    Wander,
    Waypoint,
    Seek(RoadType),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PendingAction {
    Start(StartRequest),
    /// Waypoint moved: re-resolve the arrival point and reissue
    RestartNavigation,
    /// Issue the task the current mode calls for
    IssueTask,
    BeginRecovery,
}

#[derive(Debug, Default)]
pub struct PendingActions {
    queue: VecDeque<PendingAction>,
}

impl PendingActions {
    /// Queue an action; duplicates collapse
    pub fn push(&mut self, action: PendingAction) {
        if !self.queue.contains(&action) {
            debug!("Deferring {:?} to next tick", action);
            self.queue.push_back(action);
        }
    }

    pub fn take(&mut self) -> Vec<PendingAction> {
        self.queue.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}

/// The standing instruction given to the host AI
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TaskKind {
    Wander,
    DriveTo { destination: Vec3, long_range: bool },
}

/// Tracks the single active drive task
#[derive(Debug, Default)]
pub struct TaskTracker {
    active: Option<TaskKind>,
    cleared_this_tick: bool,
    issued: u64,
    cleared: u64,
}

impl TaskTracker {
    pub fn active(&self) -> Option<TaskKind> {
        self.active
    }

    /// A new tick started; same-tick restrictions lift
    pub fn begin_tick(&mut self) {
        self.cleared_this_tick = false;
    }

    /// Whether issuing now is safe
    pub fn can_issue(&self) -> bool {
        self.active.is_none() && !self.cleared_this_tick
    }

    pub fn on_issued(&mut self, kind: TaskKind) {
        self.active = Some(kind);
        self.issued += 1;
    }

    pub fn on_cleared(&mut self) {
        self.active = None;
        self.cleared_this_tick = true;
        self.cleared += 1;
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }

    pub fn cleared(&self) -> u64 {
        self.cleared
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_collapse() {
        let mut pending = PendingActions::default();
        pending.push(PendingAction::IssueTask);
        pending.push(PendingAction::IssueTask);
        pending.push(PendingAction::BeginRecovery);
        assert_eq!(pending.len(), 2);
        assert_eq!(
            pending.take(),
            vec![PendingAction::IssueTask, PendingAction::BeginRecovery]
        );
        assert!(pending.is_empty());
    }

    #[test]
    fn test_clear_blocks_issue_until_next_tick() {
        let mut tracker = TaskTracker::default();
        assert!(tracker.can_issue());
        tracker.on_issued(TaskKind::Wander);
        assert!(!tracker.can_issue());
        tracker.on_cleared();
        assert!(!tracker.can_issue());
        tracker.begin_tick();
        assert!(tracker.can_issue());
        assert_eq!((tracker.issued(), tracker.cleared()), (1, 1));
    }
}
