//! Road Geometry Analysis
//!
//! Detectors fed by road-graph and ground-probe queries around the vehicle:
//! - Curve severity and physically grounded safe speed
//! - Intersection, dead-end and restricted-zone look-ahead
//! - Tunnels, bridges, hill gradients and U-turns
//! - Road type classification and area scans for road seeking
//! - Lane changes and traffic-light stops

pub mod curve;
pub mod lane;
pub mod road_type;
pub mod structure;
pub mod traffic_light;

pub use curve::{
    classify_severity, estimate_radius, safe_curve_speed, CurveAction, CurveAnalyzer, CurveConfig,
    CurveContext, CurveDirection, CurveSeverity, CurveUpdate,
};
pub use lane::{LaneChangeConfig, LaneChangeDetector};
pub use road_type::{
    scan_for_road_type, RoadType, RoadTypeClassifier, RoadTypeConfig, RoadTypeMonitor,
    RoadTypeUpdate, SeekScanConfig,
};
pub use structure::{Gradient, Structure, StructureConfig, StructureDetector};
pub use traffic_light::{TrafficLightConfig, TrafficLightMonitor};

/// Standard gravity (m/s²)
pub const GRAVITY: f32 = 9.81;
