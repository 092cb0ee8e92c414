//! Road type classification
//!
//! Classifies the node under the vehicle from its flags, traffic density and
//! lane count. The monitor confirms changes over consecutive samples before
//! switching speed multiplier, and also watches for dead ends and zone
//! changes. `scan_for_road_type` probes an expanding ring grid for the
//! nearest node of a wanted type.

use announce::{Announcement, Category};
use host::{HostError, NodeFlags, RoadNode, RoadQuery, Vec3, VehicleSnapshot, WorldQuery};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RoadType {
    Highway,
    CityStreet,
    Suburban,
    Rural,
    OffRoad,
    #[default]
    Unknown,
}

impl RoadType {
    pub fn speed_multiplier(self) -> f32 {
        match self {
            RoadType::Highway => 1.3,
            RoadType::CityStreet => 0.8,
            RoadType::Suburban => 0.9,
            RoadType::Rural => 1.1,
            RoadType::OffRoad => 0.6,
            RoadType::Unknown => 1.0,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RoadType::Highway => "highway",
            RoadType::CityStreet => "city street",
            RoadType::Suburban => "suburban road",
            RoadType::Rural => "rural road",
            RoadType::OffRoad => "off road",
            RoadType::Unknown => "unknown road",
        }
    }
}

impl fmt::Display for RoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Classification thresholds and monitor timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoadTypeConfig {
    pub check_interval_ms: i64,
    /// Consecutive identical readings before switching
    pub confirm_samples: u32,
    /// Nearest node farther than this means the vehicle left the road (m)
    pub off_road_distance: f32,
    /// Lanes (both directions) at or above which a sparse road is a highway
    pub highway_min_lanes: u8,
    pub highway_max_density: u8,
    pub city_min_density: u8,
    pub city_min_lanes: u8,
    pub suburban_min_density: u8,
    /// Dead-end look-ahead (m)
    pub dead_end_lookahead: f32,
    /// A dead end closer than this to the last announced one is the same (m)
    pub dead_end_separation: f32,
    /// Zone names that trigger a restricted-area warning
    pub restricted_zones: Vec<String>,
}

impl Default for RoadTypeConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 2_000,
            confirm_samples: 2,
            off_road_distance: 25.0,
            highway_min_lanes: 4,
            highway_max_density: 6,
            city_min_density: 10,
            city_min_lanes: 3,
            suburban_min_density: 4,
            dead_end_lookahead: 60.0,
            dead_end_separation: 50.0,
            restricted_zones: vec![
                "Fort Zancudo".to_string(),
                "Los Santos International Airport".to_string(),
                "Humane Labs and Research".to_string(),
            ],
        }
    }
}

/// Pure node classifier
#[derive(Debug, Clone, Default)]
pub struct RoadTypeClassifier {
    config: RoadTypeConfig,
}

impl RoadTypeClassifier {
    pub fn new(config: RoadTypeConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, node: &RoadNode) -> RoadType {
        let c = &self.config;
        if node.flags.contains(NodeFlags::WATER_ROUTE) {
            return RoadType::Unknown;
        }
        if node.flags.contains(NodeFlags::OFF_ROAD) {
            return RoadType::OffRoad;
        }
        if node.flags.contains(NodeFlags::HIGHWAY) {
            return RoadType::Highway;
        }
        let lanes = node.total_lanes();
        if lanes >= c.highway_min_lanes && node.density <= c.highway_max_density {
            RoadType::Highway
        } else if node.density >= c.city_min_density || lanes >= c.city_min_lanes {
            RoadType::CityStreet
        } else if node.density >= c.suburban_min_density {
            RoadType::Suburban
        } else {
            RoadType::Rural
        }
    }

    /// Classify the road at `position`, or off-road when no node is close
    pub fn classify_at(&self, road: &dyn RoadQuery, position: Vec3) -> Result<RoadType, HostError> {
        Ok(match road.node_properties(position)? {
            Some(node) if node.position.distance_2d(position) <= self.config.off_road_distance => {
                self.classify(&node)
            }
            Some(_) => RoadType::OffRoad,
            None => RoadType::Unknown,
        })
    }
}

/// Area scan bounds for road seeking
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeekScanConfig {
    pub ring_step: f32,
    pub max_radius: f32,
    pub angle_step_deg: f32,
    /// Hard cap on road queries per scan
    pub max_probes: usize,
}

impl Default for SeekScanConfig {
    fn default() -> Self {
        Self {
            ring_step: 75.0,
            max_radius: 600.0,
            angle_step_deg: 45.0,
            max_probes: 64,
        }
    }
}

/// Probe rings of increasing radius around `origin`; returns the closest
/// matching node of the first ring that has any match
pub fn scan_for_road_type(
    road: &dyn RoadQuery,
    classifier: &RoadTypeClassifier,
    origin: Vec3,
    wanted: RoadType,
    scan: &SeekScanConfig,
) -> Result<Option<Vec3>, HostError> {
    let mut probes = 0usize;
    let mut radius = scan.ring_step;
    let steps = (360.0 / scan.angle_step_deg.max(1.0)).floor() as usize;

    while radius <= scan.max_radius {
        let mut best: Option<(f32, Vec3)> = None;
        for i in 0..steps {
            if probes >= scan.max_probes {
                debug!("Road scan hit probe cap at radius {:.0}", radius);
                return Ok(best.map(|(_, p)| p));
            }
            probes += 1;

            let probe = origin.offset_along(i as f32 * scan.angle_step_deg, radius);
            let Some(node) = road.node_properties(probe)? else {
                continue;
            };
            if classifier.classify(&node) != wanted {
                continue;
            }
            let d = node.position.distance_2d(origin);
            if best.map_or(true, |(bd, _)| d < bd) {
                best = Some((d, node.position));
            }
        }
        if let Some((d, position)) = best {
            debug!("Found {} at {:.0} m after {} probes", wanted, d, probes);
            return Ok(Some(position));
        }
        radius += scan.ring_step;
    }
    Ok(None)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoadTypeUpdate {
    /// Confirmed new road type
    pub changed: Option<RoadType>,
    pub announcements: Vec<Announcement>,
}

/// Tracks the confirmed road type, dead ends and zones
pub struct RoadTypeMonitor {
    config: RoadTypeConfig,
    classifier: RoadTypeClassifier,
    last_check_ms: Option<i64>,
    current: Option<RoadType>,
    candidate: Option<(RoadType, u32)>,
    last_dead_end: Option<Vec3>,
    zone: Option<String>,
}

impl RoadTypeMonitor {
    pub fn new(config: RoadTypeConfig) -> Self {
        Self {
            classifier: RoadTypeClassifier::new(config.clone()),
            config,
            last_check_ms: None,
            current: None,
            candidate: None,
            last_dead_end: None,
            zone: None,
        }
    }

    pub fn classifier(&self) -> &RoadTypeClassifier {
        &self.classifier
    }

    pub fn current(&self) -> RoadType {
        self.current.unwrap_or_default()
    }

    pub fn speed_multiplier(&self) -> f32 {
        self.current().speed_multiplier()
    }

    pub fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    pub fn update(
        &mut self,
        road: &dyn RoadQuery,
        world: &dyn WorldQuery,
        vehicle: &VehicleSnapshot,
        now_ms: i64,
    ) -> RoadTypeUpdate {
        if let Some(last) = self.last_check_ms {
            if now_ms - last < self.config.check_interval_ms {
                return RoadTypeUpdate::default();
            }
        }
        self.last_check_ms = Some(now_ms);

        let mut update = RoadTypeUpdate::default();

        match self.classifier.classify_at(road, vehicle.position) {
            Ok(reading) => self.confirm(reading, &mut update),
            Err(e) => warn!("Road type query failed: {}", e),
        }

        match self.check_dead_end(road, vehicle) {
            Ok(Some(a)) => update.announcements.push(a),
            Ok(None) => {}
            Err(e) => warn!("Dead-end query failed: {}", e),
        }

        match world.zone_name(vehicle.position) {
            Ok(zone) => {
                if let Some(a) = self.check_zone(zone) {
                    update.announcements.push(a);
                }
            }
            Err(e) => warn!("Zone query failed: {}", e),
        }

        update
    }

    fn confirm(&mut self, reading: RoadType, update: &mut RoadTypeUpdate) {
        if self.current == Some(reading) {
            self.candidate = None;
            return;
        }
        let count = match self.candidate {
            Some((t, n)) if t == reading => n + 1,
            _ => 1,
        };
        if self.current.is_some() && count < self.config.confirm_samples {
            self.candidate = Some((reading, count));
            return;
        }

        self.candidate = None;
        let previous = self.current.replace(reading);
        info!("Road type {:?} -> {:?}", previous, reading);
        update.changed = Some(reading);
        if previous.is_some() && reading != RoadType::Unknown {
            update
                .announcements
                .push(Announcement::low(format!("Now on {}.", reading), Category::RoadType));
        }
    }

    fn check_dead_end(
        &mut self,
        road: &dyn RoadQuery,
        vehicle: &VehicleSnapshot,
    ) -> Result<Option<Announcement>, HostError> {
        let ahead = vehicle
            .position
            .offset_along(vehicle.heading, self.config.dead_end_lookahead);
        let Some(node) = road.node_properties(ahead)? else {
            return Ok(None);
        };
        if !node.flags.contains(NodeFlags::DEAD_END) {
            return Ok(None);
        }
        let is_new = self.last_dead_end.map_or(true, |last| {
            last.distance_2d(node.position) > self.config.dead_end_separation
        });
        if !is_new {
            return Ok(None);
        }
        self.last_dead_end = Some(node.position);
        Ok(Some(Announcement::medium("Dead end ahead.", Category::RoadType)))
    }

    fn check_zone(&mut self, zone: String) -> Option<Announcement> {
        if zone.is_empty() || self.zone.as_deref() == Some(zone.as_str()) {
            return None;
        }
        let first = self.zone.is_none();
        let restricted = self.config.restricted_zones.iter().any(|z| *z == zone);
        let announcement = if restricted {
            Some(Announcement::high(
                format!("Entering restricted area: {}.", zone),
                Category::Zones,
            ))
        } else if !first {
            Some(Announcement::low(format!("Entering {}.", zone), Category::Zones))
        } else {
            None
        };
        self.zone = Some(zone);
        announcement
    }

    pub fn reset(&mut self) {
        self.last_check_ms = None;
        self.current = None;
        self.candidate = None;
        self.last_dead_end = None;
        self.zone = None;
    }
}

impl Default for RoadTypeMonitor {
    fn default() -> Self {
        Self::new(RoadTypeConfig::default())
    }
}
