//! Curve classification and safe cornering speed
//!
//! Samples road-node headings at several look-ahead distances and compares
//! them with the vehicle heading. The most severe sample decides the
//! curve; a moderate or worse curve triggers one latched slowdown.

use crate::GRAVITY;
use announce::{Announcement, Category, Priority};
use host::geometry::heading_delta;
use host::{NodeFlags, RoadQuery, Vec3, VehicleSnapshot};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Curve severity by heading change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CurveSeverity {
    None,
    Gentle,
    Moderate,
    Sharp,
    Hairpin,
}

impl CurveSeverity {
    fn word(self) -> &'static str {
        match self {
            CurveSeverity::None => "Straight",
            CurveSeverity::Gentle => "Gentle",
            CurveSeverity::Moderate => "Moderate",
            CurveSeverity::Sharp => "Sharp",
            CurveSeverity::Hairpin => "Hairpin",
        }
    }

    fn priority(self) -> Priority {
        match self {
            CurveSeverity::None | CurveSeverity::Gentle => Priority::Low,
            CurveSeverity::Moderate => Priority::Medium,
            CurveSeverity::Sharp | CurveSeverity::Hairpin => Priority::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveDirection {
    Left,
    Right,
}

/// Curve analyzer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveConfig {
    /// Lower bound (degrees) of each severity band
    pub gentle_deg: f32,
    pub moderate_deg: f32,
    pub sharp_deg: f32,
    pub hairpin_deg: f32,
    pub check_interval_ms: i64,
    /// Base look-ahead sample distances (m)
    pub lookahead_m: Vec<f32>,
    /// Extra look-ahead per m/s of speed (s)
    pub lookahead_speed_s: f32,
    /// Lowest speed a curve slowdown will command (m/s)
    pub walking_speed_floor: f32,
    /// Safe speed never exceeds current speed times this
    pub max_speed_ratio: f32,
    /// Time held after reaching the curve, per severity (ms)
    pub moderate_hold_ms: i64,
    pub sharp_hold_ms: i64,
    pub hairpin_hold_ms: i64,
    /// Junction look-ahead (m)
    pub intersection_lookahead_m: f32,
    /// Junctions closer than this to the last announced one are the same junction (m)
    pub intersection_separation_m: f32,
}

impl Default for CurveConfig {
    fn default() -> Self {
        Self {
            gentle_deg: 10.0,
            moderate_deg: 25.0,
            sharp_deg: 45.0,
            hairpin_deg: 90.0,
            check_interval_ms: 500,
            lookahead_m: vec![20.0, 40.0, 70.0],
            lookahead_speed_s: 1.5,
            walking_speed_floor: 3.0,
            max_speed_ratio: 1.2,
            moderate_hold_ms: 2_000,
            sharp_hold_ms: 3_000,
            hairpin_hold_ms: 4_500,
            intersection_lookahead_m: 40.0,
            intersection_separation_m: 30.0,
        }
    }
}

/// Classify an absolute heading change (degrees)
pub fn classify_severity(angle_deg: f32, config: &CurveConfig) -> CurveSeverity {
    let angle = angle_deg.abs();
    if angle >= config.hairpin_deg {
        CurveSeverity::Hairpin
    } else if angle >= config.sharp_deg {
        CurveSeverity::Sharp
    } else if angle >= config.moderate_deg {
        CurveSeverity::Moderate
    } else if angle >= config.gentle_deg {
        CurveSeverity::Gentle
    } else {
        CurveSeverity::None
    }
}

/// Chord/tangent radius approximation `distance / tan(angle / 2)`.
/// Intentionally rough: it only feeds a protective speed cap.
pub fn estimate_radius(distance: f32, angle_deg: f32) -> f32 {
    let half = (angle_deg.abs().min(179.0) / 2.0).to_radians();
    let tan = half.tan();
    if tan < 1e-3 {
        f32::INFINITY
    } else {
        distance / tan
    }
}

/// `sqrt(mu * g * r)` scaled by the driving style, clamped to
/// `[floor, current_speed * max_ratio]`
pub fn safe_curve_speed(
    radius: f32,
    friction: f32,
    style_modifier: f32,
    current_speed: f32,
    config: &CurveConfig,
) -> f32 {
    let floor = config.walking_speed_floor;
    let ceiling = (current_speed * config.max_speed_ratio).max(floor);
    let raw = (friction.max(0.0) * GRAVITY * radius.max(0.0)).sqrt() * style_modifier;
    if raw.is_finite() {
        raw.clamp(floor, ceiling)
    } else {
        ceiling
    }
}

/// Environment inputs for the safe-speed formula
#[derive(Debug, Clone, Copy)]
pub struct CurveContext {
    /// Weather-derived tyre friction coefficient
    pub friction: f32,
    /// Driving-style cornering modifier (cautious < 1 < reckless)
    pub style_modifier: f32,
    /// Speed currently commanded before any curve override (m/s)
    pub cruise_speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CurveAction {
    None,
    BeginSlowdown { speed: f32 },
    /// Latched slowdown expired; restore the environmental speed
    EndSlowdown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurveUpdate {
    pub action: CurveAction,
    pub announcements: Vec<Announcement>,
}

impl CurveUpdate {
    fn none() -> Self {
        Self {
            action: CurveAction::None,
            announcements: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CurveSample {
    severity: CurveSeverity,
    direction: CurveDirection,
    angle: f32,
    distance: f32,
}

/// Look-ahead curve and intersection detector
pub struct CurveAnalyzer {
    config: CurveConfig,
    last_check_ms: Option<i64>,
    /// Slowdown latch expiry
    active_until_ms: Option<i64>,
    /// Suppress re-announcing the same curve until this tick
    announced_until_ms: i64,
    last_junction: Option<Vec3>,
}

impl CurveAnalyzer {
    pub fn new(config: CurveConfig) -> Self {
        Self {
            config,
            last_check_ms: None,
            active_until_ms: None,
            announced_until_ms: 0,
            last_junction: None,
        }
    }

    pub fn config(&self) -> &CurveConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.active_until_ms.is_some()
    }

    pub fn update(
        &mut self,
        road: &dyn RoadQuery,
        vehicle: &VehicleSnapshot,
        ctx: &CurveContext,
        now_ms: i64,
    ) -> CurveUpdate {
        if let Some(until) = self.active_until_ms {
            if now_ms >= until {
                debug!("Curve slowdown expired");
                self.active_until_ms = None;
                return CurveUpdate {
                    action: CurveAction::EndSlowdown,
                    announcements: Vec::new(),
                };
            }
        }

        if let Some(last) = self.last_check_ms {
            if now_ms - last < self.config.check_interval_ms {
                return CurveUpdate::none();
            }
        }
        self.last_check_ms = Some(now_ms);

        let mut update = CurveUpdate::none();
        let mut worst: Option<CurveSample> = None;
        let extra = vehicle.speed.max(0.0) * self.config.lookahead_speed_s;

        let lookahead = self.config.lookahead_m.clone();
        for base in &lookahead {
            let distance = base + extra;
            let point = vehicle.position.offset_along(vehicle.heading, distance);
            let node = match road.node_properties(point) {
                Ok(Some(node)) => node,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Curve look-ahead query failed: {}", e);
                    return CurveUpdate::none();
                }
            };

            if node.flags.contains(NodeFlags::JUNCTION)
                && distance <= self.config.intersection_lookahead_m + extra
            {
                if let Some(a) = self.junction_announcement(node.position) {
                    update.announcements.push(a);
                }
            }

            let angle = heading_delta(vehicle.heading, node.heading);
            let severity = classify_severity(angle, &self.config);
            if worst.map_or(true, |w| angle.abs() > w.angle.abs()) {
                worst = Some(CurveSample {
                    severity,
                    direction: if angle > 0.0 {
                        CurveDirection::Right
                    } else {
                        CurveDirection::Left
                    },
                    angle,
                    distance,
                });
            }
        }

        let Some(curve) = worst.filter(|w| w.severity > CurveSeverity::None) else {
            return update;
        };

        if now_ms < self.announced_until_ms || self.active_until_ms.is_some() {
            return update;
        }

        let direction = match curve.direction {
            CurveDirection::Left => "left",
            CurveDirection::Right => "right",
        };
        let time_to_curve_ms = (curve.distance / vehicle.speed.max(3.0) * 1000.0) as i64;

        if curve.severity >= CurveSeverity::Moderate {
            let radius = estimate_radius(curve.distance, curve.angle);
            let safe = safe_curve_speed(
                radius,
                ctx.friction,
                ctx.style_modifier,
                vehicle.speed,
                &self.config,
            );
            let hold = match curve.severity {
                CurveSeverity::Moderate => self.config.moderate_hold_ms,
                CurveSeverity::Sharp => self.config.sharp_hold_ms,
                _ => self.config.hairpin_hold_ms,
            };
            let until = now_ms + time_to_curve_ms + hold;
            self.announced_until_ms = until;

            if safe < ctx.cruise_speed {
                debug!(
                    "{:?} curve at {:.0} m, radius {:.1} m, safe speed {:.1} m/s",
                    curve.severity, curve.distance, radius, safe
                );
                self.active_until_ms = Some(until);
                update.action = CurveAction::BeginSlowdown { speed: safe };
                update.announcements.push(Announcement::new(
                    format!("{} {} curve ahead. Slowing down.", curve.severity.word(), direction),
                    curve.severity.priority(),
                    Category::Curves,
                ));
            } else {
                update.announcements.push(Announcement::new(
                    format!("{} {} curve ahead.", curve.severity.word(), direction),
                    curve.severity.priority(),
                    Category::Curves,
                ));
            }
        } else {
            self.announced_until_ms = now_ms + time_to_curve_ms;
            update.announcements.push(Announcement::new(
                format!("{} {} curve ahead.", curve.severity.word(), direction),
                curve.severity.priority(),
                Category::Curves,
            ));
        }

        update
    }

    fn junction_announcement(&mut self, junction: Vec3) -> Option<Announcement> {
        let is_new = self.last_junction.map_or(true, |last| {
            last.distance_2d(junction) > self.config.intersection_separation_m
        });
        if !is_new {
            return None;
        }
        self.last_junction = Some(junction);
        Some(Announcement::medium("Intersection ahead.", Category::Intersections))
    }

    pub fn reset(&mut self) {
        self.last_check_ms = None;
        self.active_until_ms = None;
        self.announced_until_ms = 0;
        self.last_junction = None;
    }
}

impl Default for CurveAnalyzer {
    fn default() -> Self {
        Self::new(CurveConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::mock::MockHost;
    use host::{EntityId, RoadNode};
    use proptest::prelude::*;

    fn ctx() -> CurveContext {
        CurveContext {
            friction: 0.8,
            style_modifier: 1.0,
            cruise_speed: 25.0,
        }
    }

    fn moving(speed: f32) -> VehicleSnapshot {
        let mut v = VehicleSnapshot::at_rest(EntityId(2), Vec3::ZERO, 0.0);
        v.speed = speed;
        v
    }

    #[test]
    fn test_severity_bands() {
        let config = CurveConfig::default();
        assert_eq!(classify_severity(5.0, &config), CurveSeverity::None);
        assert_eq!(classify_severity(15.0, &config), CurveSeverity::Gentle);
        assert_eq!(classify_severity(30.0, &config), CurveSeverity::Moderate);
        assert_eq!(classify_severity(60.0, &config), CurveSeverity::Sharp);
        assert_eq!(classify_severity(120.0, &config), CurveSeverity::Hairpin);
    }

    #[test]
    fn test_severity_cutoffs() {
        let config = CurveConfig::default();
        assert_eq!(classify_severity(9.99, &config), CurveSeverity::None);
        assert_eq!(classify_severity(10.0, &config), CurveSeverity::Gentle);
        assert_eq!(classify_severity(25.0, &config), CurveSeverity::Moderate);
        assert_eq!(classify_severity(45.0, &config), CurveSeverity::Sharp);
        assert_eq!(classify_severity(90.0, &config), CurveSeverity::Hairpin);
        assert_eq!(classify_severity(-60.0, &config), CurveSeverity::Sharp);
    }

    #[test]
    fn test_radius_approximation() {
        // 90 degrees over 40 m: 40 / tan(45) = 40
        assert!((estimate_radius(40.0, 90.0) - 40.0).abs() < 1e-3);
        assert!(estimate_radius(40.0, 0.0).is_infinite());
    }

    #[test]
    fn test_safe_speed_physics_and_clamp() {
        let config = CurveConfig::default();
        // sqrt(0.8 * 9.81 * 40) = 17.72
        let dry = safe_curve_speed(40.0, 0.8, 1.0, 30.0, &config);
        assert!((dry - 17.72).abs() < 0.05);

        let snow = safe_curve_speed(40.0, 0.24, 1.0, 30.0, &config);
        assert!(snow < dry);

        // Never above 1.2x current speed
        let slow = safe_curve_speed(1000.0, 0.8, 1.0, 10.0, &config);
        assert!((slow - 12.0).abs() < 1e-3);

        // Never below the walking floor
        let tight = safe_curve_speed(0.1, 0.16, 0.8, 30.0, &config);
        assert!((tight - config.walking_speed_floor).abs() < 1e-3);
    }

    #[test]
    fn test_sharp_curve_triggers_single_slowdown() {
        let mut host = MockHost::new();
        // Road ahead turns 60 degrees right
        host.road_nodes.push(RoadNode::new(Vec3::new(0.0, 50.0, 0.0), 60.0));
        let mut analyzer = CurveAnalyzer::default();
        let vehicle = moving(20.0);

        let update = analyzer.update(&host, &vehicle, &ctx(), 0);
        assert!(matches!(update.action, CurveAction::BeginSlowdown { .. }));
        assert_eq!(update.announcements.len(), 1);
        assert!(update.announcements[0].text.starts_with("Sharp right curve"));
        assert!(analyzer.is_active());

        // Same curve, later check: latched, no second slowdown
        let again = analyzer.update(&host, &vehicle, &ctx(), 600);
        assert_eq!(again.action, CurveAction::None);
        assert!(again.announcements.is_empty());
    }

    #[test]
    fn test_slowdown_expires() {
        let mut host = MockHost::new();
        host.road_nodes.push(RoadNode::new(Vec3::new(0.0, 50.0, 0.0), 300.0));
        let mut analyzer = CurveAnalyzer::default();
        let vehicle = moving(20.0);

        let update = analyzer.update(&host, &vehicle, &ctx(), 0);
        assert!(update.announcements[0].text.contains("left"));

        let expired = analyzer.update(&host, &vehicle, &ctx(), 60_000);
        assert_eq!(expired.action, CurveAction::EndSlowdown);
        assert!(!analyzer.is_active());
    }

    #[test]
    fn test_gentle_curve_announces_without_slowdown() {
        let mut host = MockHost::new();
        host.road_nodes.push(RoadNode::new(Vec3::new(0.0, 50.0, 0.0), 15.0));
        let mut analyzer = CurveAnalyzer::default();

        let update = analyzer.update(&host, &moving(15.0), &ctx(), 0);
        assert_eq!(update.action, CurveAction::None);
        assert_eq!(update.announcements[0].priority, Priority::Low);
    }

    #[test]
    fn test_intersection_announced_once() {
        let mut host = MockHost::new();
        host.road_nodes.push(
            RoadNode::new(Vec3::new(0.0, 20.0, 0.0), 0.0).with_flags(NodeFlags::JUNCTION),
        );
        let mut analyzer = CurveAnalyzer::default();
        let vehicle = moving(0.0);

        let first = analyzer.update(&host, &vehicle, &ctx(), 0);
        assert_eq!(first.announcements.len(), 1);
        assert_eq!(first.announcements[0].category, Category::Intersections);

        let second = analyzer.update(&host, &vehicle, &ctx(), 1_000);
        assert!(second.announcements.is_empty());
    }

    #[test]
    fn test_query_failure_degrades() {
        let mut host = MockHost::new();
        host.road_queries_fail = true;
        let mut analyzer = CurveAnalyzer::default();
        assert_eq!(analyzer.update(&host, &moving(20.0), &ctx(), 0), CurveUpdate::none());
    }

    proptest! {
        #[test]
        fn prop_severity_monotonic(a in 0.0f32..180.0, b in 0.0f32..180.0) {
            let config = CurveConfig::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(classify_severity(lo, &config) <= classify_severity(hi, &config));
        }

        #[test]
        fn prop_safe_speed_bounded(
            radius in 0.0f32..5000.0,
            friction in 0.0f32..1.0,
            speed in 0.0f32..60.0,
        ) {
            let config = CurveConfig::default();
            let safe = safe_curve_speed(radius, friction, 1.0, speed, &config);
            prop_assert!(safe.is_finite());
            prop_assert!(safe >= config.walking_speed_floor);
            prop_assert!(safe <= (speed * config.max_speed_ratio).max(config.walking_speed_floor) + 1e-3);
        }
    }
}
