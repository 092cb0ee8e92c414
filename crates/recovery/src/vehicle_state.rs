//! Critical vehicle state
//!
//! Each condition is latched so it is reported once on entry and re-arms
//! only after the condition clears.

use announce::{Announcement, Category};
use host::VehicleSnapshot;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CriticalCondition {
    Destroyed,
    OnFire,
    InWater,
    Flipped,
    CriticallyDamaged,
}

impl CriticalCondition {
    const ALL: [CriticalCondition; 5] = [
        CriticalCondition::Destroyed,
        CriticalCondition::OnFire,
        CriticalCondition::InWater,
        CriticalCondition::Flipped,
        CriticalCondition::CriticallyDamaged,
    ];

    pub fn announcement(self) -> Announcement {
        let text = match self {
            CriticalCondition::Destroyed => "Vehicle destroyed. AutoDrive stopping.",
            CriticalCondition::OnFire => "Vehicle on fire. AutoDrive stopping.",
            CriticalCondition::InWater => "Vehicle in water. AutoDrive stopping.",
            CriticalCondition::Flipped => "Vehicle flipped. AutoDrive stopping.",
            CriticalCondition::CriticallyDamaged => "Vehicle critically damaged. AutoDrive stopping.",
        };
        Announcement::critical(text, Category::VehicleState)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleStateConfig {
    pub check_interval_ms: i64,
    /// Up-vector Z below this counts as flipped
    pub flip_up_z: f32,
    /// Engine health below this counts as critical damage
    pub critical_engine_health: f32,
}

impl Default for VehicleStateConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 500,
            flip_up_z: 0.3,
            critical_engine_health: 100.0,
        }
    }
}

pub struct VehicleStateMonitor {
    config: VehicleStateConfig,
    last_check_ms: Option<i64>,
    latched: [bool; 5],
}

impl VehicleStateMonitor {
    pub fn new(config: VehicleStateConfig) -> Self {
        Self {
            config,
            last_check_ms: None,
            latched: [false; 5],
        }
    }

    fn active(&self, condition: CriticalCondition, vehicle: &VehicleSnapshot) -> bool {
        match condition {
            CriticalCondition::Destroyed => vehicle.destroyed,
            CriticalCondition::OnFire => vehicle.on_fire,
            CriticalCondition::InWater => vehicle.in_water,
            CriticalCondition::Flipped => vehicle.up_z < self.config.flip_up_z,
            CriticalCondition::CriticallyDamaged => {
                vehicle.engine_health < self.config.critical_engine_health
            }
        }
    }

    /// Most severe condition that became true since the last check
    pub fn check(&mut self, vehicle: &VehicleSnapshot, now_ms: i64) -> Option<CriticalCondition> {
        if let Some(last) = self.last_check_ms {
            if now_ms - last < self.config.check_interval_ms {
                return None;
            }
        }
        self.last_check_ms = Some(now_ms);

        let mut entered = None;
        for (i, condition) in CriticalCondition::ALL.into_iter().enumerate() {
            let active = self.active(condition, vehicle);
            if active && !self.latched[i] && entered.is_none() {
                warn!("Critical vehicle state: {:?}", condition);
                entered = Some(condition);
            }
            self.latched[i] = active;
        }
        entered
    }

    pub fn reset(&mut self) {
        self.last_check_ms = None;
        self.latched = [false; 5];
    }
}

impl Default for VehicleStateMonitor {
    fn default() -> Self {
        Self::new(VehicleStateConfig::default())
    }
}
