//! Escalating recovery maneuvers
//!
//! Each attempt picks a rung of the ladder (capped at the last rung) and
//! expands it into a sequence of timed host temporary actions. Odd attempts
//! turn right, even attempts turn left, so repeated attempts try both sides.

use host::TempAction;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Back up, then turn away
    ReverseTurn,
    /// Drive forward steering against the usual bias
    ForwardTurn,
    /// Long opposite-lock reverse, then a long forward turn
    ThreePointTurn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    pub fn opposite(self) -> Self {
        match self {
            TurnDirection::Left => TurnDirection::Right,
            TurnDirection::Right => TurnDirection::Left,
        }
    }

    fn turn(self) -> TempAction {
        match self {
            TurnDirection::Left => TempAction::TurnLeft,
            TurnDirection::Right => TempAction::TurnRight,
        }
    }

    fn forward(self) -> TempAction {
        match self {
            TurnDirection::Left => TempAction::ForwardLeft,
            TurnDirection::Right => TempAction::ForwardRight,
        }
    }

    fn reverse(self) -> TempAction {
        match self {
            TurnDirection::Left => TempAction::ReverseLeft,
            TurnDirection::Right => TempAction::ReverseRight,
        }
    }
}

/// Odd attempts turn right, even attempts turn left
pub fn turn_direction(attempt: u32) -> TurnDirection {
    if attempt % 2 == 1 {
        TurnDirection::Right
    } else {
        TurnDirection::Left
    }
}

/// One rung of the ladder
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LadderEntry {
    pub kind: StrategyKind,
    /// Duration of the reversing (or first) phase (ms)
    pub first_ms: u32,
    /// Duration of the turning (or second) phase (ms); 0 skips it
    pub second_ms: u32,
}

pub fn default_ladder() -> Vec<LadderEntry> {
    vec![
        LadderEntry {
            kind: StrategyKind::ReverseTurn,
            first_ms: 1_500,
            second_ms: 1_500,
        },
        LadderEntry {
            kind: StrategyKind::ReverseTurn,
            first_ms: 2_500,
            second_ms: 1_500,
        },
        LadderEntry {
            kind: StrategyKind::ForwardTurn,
            first_ms: 2_000,
            second_ms: 0,
        },
        LadderEntry {
            kind: StrategyKind::ThreePointTurn,
            first_ms: 3_500,
            second_ms: 3_000,
        },
    ]
}

/// Which state the manager reports while a phase runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManeuverPhase {
    Reversing,
    Turning,
    ForwardManeuver,
    ThreePointTurn,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryPlan {
    pub kind: StrategyKind,
    pub direction: TurnDirection,
    pub phases: Vec<(ManeuverPhase, TempAction, u32)>,
}

impl RecoveryPlan {
    pub fn total_ms(&self) -> u32 {
        self.phases.iter().map(|(_, _, ms)| ms).sum()
    }
}

/// Expand `attempt` (1-based) into its maneuver sequence. Returns `None`
/// only for an empty ladder.
pub fn plan_for_attempt(attempt: u32, ladder: &[LadderEntry]) -> Option<RecoveryPlan> {
    let last = ladder.len().checked_sub(1)?;
    let index = (attempt.max(1) as usize - 1).min(last);
    let entry = &ladder[index];
    let direction = turn_direction(attempt);

    let mut phases = match entry.kind {
        StrategyKind::ReverseTurn => vec![
            (ManeuverPhase::Reversing, TempAction::ReverseStraight, entry.first_ms),
            (ManeuverPhase::Turning, direction.turn(), entry.second_ms),
        ],
        StrategyKind::ForwardTurn => vec![(
            ManeuverPhase::ForwardManeuver,
            direction.opposite().forward(),
            entry.first_ms,
        )],
        StrategyKind::ThreePointTurn => vec![
            (
                ManeuverPhase::ThreePointTurn,
                direction.opposite().reverse(),
                entry.first_ms,
            ),
            (ManeuverPhase::ForwardManeuver, direction.forward(), entry.second_ms),
        ],
    };
    phases.retain(|(_, _, ms)| *ms > 0);

    Some(RecoveryPlan {
        kind: entry.kind,
        direction,
        phases,
    })
}
