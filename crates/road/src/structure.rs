//! Tunnels, bridges, U-turns and steep hills

use announce::{Announcement, Category};
use host::geometry::heading_delta;
use host::{NodeFlags, RoadQuery, VehicleSnapshot};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Structure {
    Tunnel,
    Bridge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gradient {
    #[default]
    Level,
    Uphill,
    Downhill,
}

/// Structure detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StructureConfig {
    pub check_interval_ms: i64,
    /// Max distance from the vehicle to the node carrying the tunnel flag (m)
    pub tunnel_node_radius: f32,
    /// Lateral distance of the bridge ground probes (m)
    pub bridge_probe_offset: f32,
    /// Ground must fall away by more than this on both sides (m)
    pub bridge_drop: f32,
    pub gradient_interval_ms: i64,
    /// Pitch that counts as steep (degrees)
    pub steep_pitch_deg: f32,
    /// Pitch below which the road is level again (degrees)
    pub level_pitch_deg: f32,
    /// Consecutive samples before a gradient change is accepted
    pub gradient_confirm_samples: u32,
    pub uturn_window_ms: i64,
    /// Accumulated heading change that counts as a U-turn (degrees)
    pub uturn_angle_deg: f32,
    pub uturn_min_speed: f32,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 1_000,
            tunnel_node_radius: 15.0,
            bridge_probe_offset: 12.0,
            bridge_drop: 6.0,
            gradient_interval_ms: 500,
            steep_pitch_deg: 8.0,
            level_pitch_deg: 4.0,
            gradient_confirm_samples: 2,
            uturn_window_ms: 10_000,
            uturn_angle_deg: 160.0,
            uturn_min_speed: 1.0,
        }
    }
}

pub struct StructureDetector {
    config: StructureConfig,
    last_structure_check_ms: Option<i64>,
    current: Option<Structure>,
    last_gradient_check_ms: Option<i64>,
    gradient: Gradient,
    candidate: Option<(Gradient, u32)>,
    headings: VecDeque<(i64, f32)>,
}

impl StructureDetector {
    pub fn new(config: StructureConfig) -> Self {
        Self {
            config,
            last_structure_check_ms: None,
            current: None,
            last_gradient_check_ms: None,
            gradient: Gradient::Level,
            candidate: None,
            headings: VecDeque::new(),
        }
    }

    pub fn current(&self) -> Option<Structure> {
        self.current
    }

    pub fn gradient(&self) -> Gradient {
        self.gradient
    }

    /// Accumulate heading changes over the sliding window
    pub fn update_uturn(&mut self, vehicle: &VehicleSnapshot, now_ms: i64) -> Option<Announcement> {
        if vehicle.speed <= self.config.uturn_min_speed {
            self.headings.clear();
            return None;
        }

        self.headings.push_back((now_ms, vehicle.heading));
        while let Some(&(t, _)) = self.headings.front() {
            if now_ms - t > self.config.uturn_window_ms {
                self.headings.pop_front();
            } else {
                break;
            }
        }

        let turned: f32 = self
            .headings
            .iter()
            .zip(self.headings.iter().skip(1))
            .map(|((_, a), (_, b))| heading_delta(*a, *b))
            .sum();

        if turned.abs() >= self.config.uturn_angle_deg {
            debug!("U-turn detected, {:.0} degrees", turned);
            self.headings.clear();
            return Some(Announcement::low("U-turn completed.", Category::Terrain));
        }
        None
    }

    /// Steep hill detection from vehicle pitch with hysteresis
    pub fn update_gradient(
        &mut self,
        vehicle: &VehicleSnapshot,
        now_ms: i64,
    ) -> Option<Announcement> {
        if let Some(last) = self.last_gradient_check_ms {
            if now_ms - last < self.config.gradient_interval_ms {
                return None;
            }
        }
        self.last_gradient_check_ms = Some(now_ms);

        let pitch = vehicle.pitch;
        let reading = if pitch >= self.config.steep_pitch_deg {
            Gradient::Uphill
        } else if pitch <= -self.config.steep_pitch_deg {
            Gradient::Downhill
        } else if pitch.abs() < self.config.level_pitch_deg {
            Gradient::Level
        } else {
            self.gradient
        };

        if reading == self.gradient {
            self.candidate = None;
            return None;
        }

        let count = match self.candidate {
            Some((g, n)) if g == reading => n + 1,
            _ => 1,
        };
        if count < self.config.gradient_confirm_samples {
            self.candidate = Some((reading, count));
            return None;
        }

        self.candidate = None;
        self.gradient = reading;
        match reading {
            Gradient::Uphill => Some(Announcement::medium("Steep uphill.", Category::Terrain)),
            Gradient::Downhill => Some(Announcement::medium("Steep downhill.", Category::Terrain)),
            Gradient::Level => None,
        }
    }

    /// Tunnel from the node under the vehicle, bridge from ground probes
    pub fn update_structures(
        &mut self,
        road: &dyn RoadQuery,
        vehicle: &VehicleSnapshot,
        now_ms: i64,
    ) -> Option<Announcement> {
        if let Some(last) = self.last_structure_check_ms {
            if now_ms - last < self.config.check_interval_ms {
                return None;
            }
        }
        self.last_structure_check_ms = Some(now_ms);

        let detected = match self.detect(road, vehicle) {
            Ok(detected) => detected,
            Err(e) => {
                warn!("Structure query failed: {}", e);
                return None;
            }
        };

        let previous = self.current;
        if previous == detected {
            return None;
        }
        self.current = detected;

        let text = match (previous, detected) {
            (_, Some(Structure::Tunnel)) => "Entering tunnel.",
            (_, Some(Structure::Bridge)) => "Crossing bridge.",
            (Some(Structure::Tunnel), None) => "Exiting tunnel.",
            (Some(Structure::Bridge), None) => "Off bridge.",
            (None, None) => return None,
        };
        let announcement = if detected.is_some() {
            Announcement::medium(text, Category::Structures)
        } else {
            Announcement::low(text, Category::Structures)
        };
        Some(announcement)
    }

    fn detect(
        &self,
        road: &dyn RoadQuery,
        vehicle: &VehicleSnapshot,
    ) -> Result<Option<Structure>, host::HostError> {
        if let Some(node) = road.node_properties(vehicle.position)? {
            if node.flags.contains(NodeFlags::TUNNEL)
                && node.position.distance(vehicle.position) <= self.config.tunnel_node_radius
            {
                return Ok(Some(Structure::Tunnel));
            }
        }

        let offset = self.config.bridge_probe_offset;
        let left = vehicle.position.offset_along(vehicle.heading - 90.0, offset);
        let right = vehicle.position.offset_along(vehicle.heading + 90.0, offset);

        let falls_away = |height: Option<f32>| match height {
            Some(h) => vehicle.position.z - h > self.config.bridge_drop,
            // No ground means water
            None => true,
        };

        if falls_away(road.ground_height(left)?) && falls_away(road.ground_height(right)?) {
            return Ok(Some(Structure::Bridge));
        }
        Ok(None)
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.config.clone());
    }
}

impl Default for StructureDetector {
    fn default() -> Self {
        Self::new(StructureConfig::default())
    }
}
