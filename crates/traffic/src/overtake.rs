//! Overtake tracking
//!
//! Follows vehicles in adjacent lanes through Ahead / Beside / Behind. A
//! vehicle that goes from ahead to behind was passed by us; one that goes
//! from behind to ahead overtook us.

use announce::{Announcement, Category};
use host::geometry::{forward_vector, heading_delta};
use host::{EntityId, NearbyVehicle, VehicleSnapshot, WorldQuery};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelativePosition {
    Ahead,
    Beside,
    Behind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OvertakeConfig {
    pub check_interval_ms: i64,
    pub scan_radius: f32,
    /// Max tracked vehicles
    pub capacity: usize,
    /// Entries not refreshed for this long are dropped (ms)
    pub stale_after_ms: i64,
    /// Longitudinal band counted as beside us (m)
    pub beside_band: f32,
    /// Ignore vehicles further to the side than this (m)
    pub max_lateral: f32,
    /// Only same-direction traffic within this heading difference (degrees)
    pub max_heading_diff: f32,
}

impl Default for OvertakeConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 500,
            scan_radius: 40.0,
            capacity: 32,
            stale_after_ms: 3_000,
            beside_band: 5.0,
            max_lateral: 8.0,
            max_heading_diff: 45.0,
        }
    }
}

#[derive(Debug, Clone)]
struct Tracked {
    position: RelativePosition,
    /// Last Ahead/Behind before the current pass
    origin: Option<RelativePosition>,
    first_seen_ms: i64,
    last_seen_ms: i64,
    initial_distance: f32,
    /// Positive when on our left
    lateral: f32,
}

pub struct OvertakeTracker {
    config: OvertakeConfig,
    tracked: HashMap<EntityId, Tracked>,
    last_check_ms: Option<i64>,
}

impl OvertakeTracker {
    pub fn new(config: OvertakeConfig) -> Self {
        Self {
            config,
            tracked: HashMap::new(),
            last_check_ms: None,
        }
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn update(
        &mut self,
        world: &dyn WorldQuery,
        vehicle: &VehicleSnapshot,
        now_ms: i64,
    ) -> Vec<Announcement> {
        if let Some(last) = self.last_check_ms {
            if now_ms - last < self.config.check_interval_ms {
                return Vec::new();
            }
        }
        self.last_check_ms = Some(now_ms);

        match world.nearby_vehicles(vehicle.position, self.config.scan_radius) {
            Ok(nearby) => self.observe(vehicle, &nearby, now_ms),
            Err(e) => {
                warn!("Overtake scan failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Feed one scan of nearby vehicles
    pub fn observe(
        &mut self,
        vehicle: &VehicleSnapshot,
        nearby: &[NearbyVehicle],
        now_ms: i64,
    ) -> Vec<Announcement> {
        let forward = forward_vector(vehicle.heading);
        let mut announcements = Vec::new();
        let mut visible = Vec::with_capacity(nearby.len());

        for other in nearby.iter().filter(|o| o.id != vehicle.handle) {
            if heading_delta(vehicle.heading, other.heading).abs() > self.config.max_heading_diff {
                continue;
            }
            let rel = other.position - vehicle.position;
            let lateral = forward.cross_2d(rel);
            if lateral.abs() > self.config.max_lateral {
                continue;
            }
            let longitudinal = forward.dot_2d(rel);
            let position = if longitudinal > self.config.beside_band {
                RelativePosition::Ahead
            } else if longitudinal < -self.config.beside_band {
                RelativePosition::Behind
            } else {
                RelativePosition::Beside
            };
            visible.push(other.id);

            if !self.tracked.contains_key(&other.id) {
                self.make_room();
                self.tracked.insert(
                    other.id,
                    Tracked {
                        position,
                        origin: (position != RelativePosition::Beside).then_some(position),
                        first_seen_ms: now_ms,
                        last_seen_ms: now_ms,
                        initial_distance: rel.length_2d(),
                        lateral,
                    },
                );
                continue;
            }

            if let Some(entry) = self.tracked.get_mut(&other.id) {
                entry.last_seen_ms = now_ms;
                entry.lateral = lateral;
                if entry.position == position {
                    continue;
                }
                entry.position = position;
                if position == RelativePosition::Beside {
                    continue;
                }
                let side = if lateral >= 0.0 { "left" } else { "right" };
                let text = match (entry.origin, position) {
                    (Some(RelativePosition::Ahead), RelativePosition::Behind) => {
                        Some(format!("Passing vehicle on the {}.", side))
                    }
                    (Some(RelativePosition::Behind), RelativePosition::Ahead) => {
                        Some(format!("Vehicle overtaking on the {}.", side))
                    }
                    _ => None,
                };
                if let Some(text) = text {
                    debug!(
                        "Overtake with {} after {} ms, started {:.0} m away",
                        other.id,
                        now_ms - entry.first_seen_ms,
                        entry.initial_distance
                    );
                    announcements.push(Announcement::low(text, Category::Traffic));
                }
                entry.origin = Some(position);
            }
        }

        let stale_after = self.config.stale_after_ms;
        self.tracked
            .retain(|id, t| visible.contains(id) && now_ms - t.last_seen_ms <= stale_after);

        announcements
    }

    fn make_room(&mut self) {
        if self.tracked.len() < self.config.capacity {
            return;
        }
        let oldest = self
            .tracked
            .iter()
            .min_by_key(|(_, t)| t.first_seen_ms)
            .map(|(id, _)| *id);
        if let Some(id) = oldest {
            self.tracked.remove(&id);
        }
    }

    pub fn reset(&mut self) {
        self.tracked.clear();
        self.last_check_ms = None;
    }
}

impl Default for OvertakeTracker {
    fn default() -> Self {
        Self::new(OvertakeConfig::default())
    }
}
