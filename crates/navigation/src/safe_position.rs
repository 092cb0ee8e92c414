//! Safe arrival position
//!
//! Waypoints are often placed off the road (in buildings, on grass). The
//! cascade below snaps the target onto something drivable, accepting each
//! strategy only when its result stays within that strategy's own bound.

use host::{RoadQuery, Vec3};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Strategy that produced the arrival position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrivalStrategy {
    NodeWithHeading,
    NearestNode,
    /// 2nd or 3rd nearest node
    NthNode(u32),
    SafeGround,
    RoadSide,
    RawTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafePositionConfig {
    /// Max distance from the raw target per strategy (m)
    pub node_with_heading_max: f32,
    pub nearest_node_max: f32,
    pub nth_node_max: f32,
    pub safe_ground_max: f32,
    pub road_side_max: f32,
    /// Flags passed to the safe-ground query (pavement only)
    pub safe_ground_flags: u32,
}

impl Default for SafePositionConfig {
    fn default() -> Self {
        Self {
            node_with_heading_max: 60.0,
            nearest_node_max: 60.0,
            nth_node_max: 40.0,
            safe_ground_max: 100.0,
            road_side_max: 80.0,
            safe_ground_flags: 16,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeArrival {
    pub position: Vec3,
    pub strategy: ArrivalStrategy,
}

/// Resolve a drivable arrival point near `target`. Never fails: falls back
/// to the raw target.
pub fn resolve_safe_arrival(
    road: &dyn RoadQuery,
    target: Vec3,
    config: &SafePositionConfig,
) -> SafeArrival {
    let accept = |found: Option<Vec3>, max: f32, strategy: ArrivalStrategy| {
        found
            .filter(|p| p.is_finite() && p.distance(target) <= max)
            .map(|position| SafeArrival { position, strategy })
    };

    let resolved = accept(
        logged(road.nearest_node_with_heading(target), "node with heading")
            .flatten()
            .map(|(p, _)| p),
        config.node_with_heading_max,
        ArrivalStrategy::NodeWithHeading,
    )
    .or_else(|| {
        accept(
            logged(road.nearest_node(target), "nearest node").flatten(),
            config.nearest_node_max,
            ArrivalStrategy::NearestNode,
        )
    })
    .or_else(|| {
        (2..=3).find_map(|n| {
            accept(
                logged(road.nth_nearest_node(target, n), "nth nearest node").flatten(),
                config.nth_node_max,
                ArrivalStrategy::NthNode(n),
            )
        })
    })
    .or_else(|| {
        accept(
            logged(
                road.safe_ground_position(target, config.safe_ground_flags),
                "safe ground",
            )
            .flatten(),
            config.safe_ground_max,
            ArrivalStrategy::SafeGround,
        )
    })
    .or_else(|| {
        accept(
            logged(road.point_on_road_side(target, 1), "road side").flatten(),
            config.road_side_max,
            ArrivalStrategy::RoadSide,
        )
    });

    match resolved {
        Some(arrival) => {
            debug!(
                "Arrival resolved by {:?} ({:.1} m from target)",
                arrival.strategy,
                arrival.position.distance(target)
            );
            arrival
        }
        None => {
            debug!("No drivable position near target, using raw target");
            SafeArrival {
                position: target,
                strategy: ArrivalStrategy::RawTarget,
            }
        }
    }
}

fn logged<T>(result: Result<T, host::HostError>, context: &str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Safe arrival query ({}) failed: {}", context, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::mock::MockHost;
    use host::RoadNode;

    #[test]
    fn test_nearest_node_within_bound() {
        let mut host = MockHost::new();
        host.road_nodes.push(RoadNode::new(Vec3::new(30.0, 0.0, 0.0), 90.0));
        let arrival = resolve_safe_arrival(&host, Vec3::ZERO, &SafePositionConfig::default());
        assert_eq!(arrival.strategy, ArrivalStrategy::NodeWithHeading);
        assert_eq!(arrival.position, Vec3::new(30.0, 0.0, 0.0));
    }

    #[test]
    fn test_far_nodes_fall_through_to_safe_ground() {
        let mut host = MockHost::new();
        host.road_nodes.push(RoadNode::new(Vec3::new(90.0, 0.0, 0.0), 0.0));
        host.safe_ground = Some(Vec3::new(0.0, 95.0, 0.0));
        let arrival = resolve_safe_arrival(&host, Vec3::ZERO, &SafePositionConfig::default());
        assert_eq!(arrival.strategy, ArrivalStrategy::SafeGround);
    }

    #[test]
    fn test_road_side_used_last() {
        let mut host = MockHost::new();
        host.safe_ground = Some(Vec3::new(0.0, 150.0, 0.0));
        host.road_side = Some(Vec3::new(50.0, 0.0, 0.0));
        let arrival = resolve_safe_arrival(&host, Vec3::ZERO, &SafePositionConfig::default());
        assert_eq!(arrival.strategy, ArrivalStrategy::RoadSide);
    }

    #[test]
    fn test_falls_back_to_raw_target() {
        let host = MockHost::new();
        let target = Vec3::new(5.0, 5.0, 0.0);
        let arrival = resolve_safe_arrival(&host, target, &SafePositionConfig::default());
        assert_eq!(arrival.strategy, ArrivalStrategy::RawTarget);
        assert_eq!(arrival.position, target);
    }

    #[test]
    fn test_query_failures_fall_back_to_raw_target() {
        let mut host = MockHost::new();
        host.road_nodes.push(RoadNode::new(Vec3::new(1.0, 0.0, 0.0), 0.0));
        host.road_queries_fail = true;
        let arrival = resolve_safe_arrival(&host, Vec3::ZERO, &SafePositionConfig::default());
        assert_eq!(arrival.strategy, ArrivalStrategy::RawTarget);
    }
}
