//! Scripted scenarios

use crate::world::SimWorld;
use autodrive::{AutoDriveConfig, AutoDriveManager};
use clap::ValueEnum;
use host::mock::MockHost;
use host::{EntityId, NearbyVehicle, RoadNode, TempAction, Vec3, WeatherKind};
use road::RoadType;
use serde::Serialize;
use std::fmt::Write;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Wander a highway, adjust speed and style
    Wander,
    /// Drive to a waypoint 1.5 km up the road
    Waypoint,
    /// Blocked vehicle that needs a recovery maneuver
    Stuck,
    /// Siren approaching from behind
    Emergency,
    /// Leave a city street for a nearby highway
    Seek,
    /// Rain, nightfall and clearing skies
    Weather,
}

impl Scenario {
    pub const ALL: [Scenario; 6] = [
        Scenario::Wander,
        Scenario::Waypoint,
        Scenario::Stuck,
        Scenario::Emergency,
        Scenario::Seek,
        Scenario::Weather,
    ];

    pub fn default_duration_ms(self) -> i64 {
        match self {
            Scenario::Waypoint => 150_000,
            Scenario::Seek => 90_000,
            _ => 45_000,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpokenLine {
    pub at_ms: i64,
    pub text: String,
    pub interrupted: bool,
}

/// Everything a scenario run produced
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    pub scenario: Scenario,
    pub duration_ms: i64,
    pub spoken: Vec<SpokenLine>,
    pub drive_tasks: usize,
    pub clears: usize,
    pub temp_actions: Vec<String>,
    pub active_at_end: bool,
    pub final_status: String,
}

impl Transcript {
    pub fn spoke(&self, fragment: &str) -> bool {
        self.spoken.iter().any(|line| line.text.contains(fragment))
    }

    /// Human-readable listing
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "== {:?} ({:.0} s) ==",
            self.scenario,
            self.duration_ms as f32 / 1000.0
        );
        for line in &self.spoken {
            let _ = writeln!(
                out,
                "[{:>6.1}s]{} {}",
                line.at_ms as f32 / 1000.0,
                if line.interrupted { " !" } else { "  " },
                line.text
            );
        }
        let _ = writeln!(
            out,
            "-- {} drive tasks, {} clears, maneuvers {:?}",
            self.drive_tasks, self.clears, self.temp_actions
        );
        let _ = writeln!(out, "-- {}", self.final_status);
        out
    }
}

const SIREN_ID: EntityId = EntityId(90);

fn highway_node() -> RoadNode {
    RoadNode::new(Vec3::ZERO, 0.0)
        .with_lanes(3, 3)
        .with_density(3)
}

fn setup(scenario: Scenario) -> SimWorld {
    let mut host = MockHost::new();
    match scenario {
        Scenario::Seek => {
            let city = RoadNode::new(Vec3::ZERO, 0.0)
                .with_lanes(1, 1)
                .with_density(12);
            host.add_straight_road(Vec3::new(0.0, -200.0, 0.0), 0.0, 2_000.0, 20.0, &city);
            host.add_straight_road(
                Vec3::new(300.0, -200.0, 0.0),
                0.0,
                3_000.0,
                20.0,
                &highway_node(),
            );
        }
        _ => {
            host.add_straight_road(
                Vec3::new(0.0, -200.0, 0.0),
                0.0,
                4_000.0,
                20.0,
                &highway_node(),
            );
        }
    }
    if scenario == Scenario::Waypoint {
        host.waypoint = Some(Vec3::new(0.0, 1_500.0, 0.0));
    }
    let mut world = SimWorld::new(host);
    world.blocked = scenario == Scenario::Stuck;
    world
}

/// Whether `now` is the first tick at or after `at`
fn at(now: i64, step: i64, at: i64) -> bool {
    now >= at && now - step < at
}

fn script(
    scenario: Scenario,
    world: &mut SimWorld,
    manager: &mut AutoDriveManager,
    now: i64,
    step: i64,
) {
    if now == 0 {
        match scenario {
            Scenario::Waypoint => manager.start_waypoint(&mut world.host, now),
            Scenario::Seek => manager.start_seeking(&mut world.host, RoadType::Highway, now),
            _ => manager.start_wander(&mut world.host, now),
        }
        return;
    }

    match scenario {
        Scenario::Wander => {
            if at(now, step, 15_000) {
                manager.increase_speed(&mut world.host, now);
            }
            if at(now, step, 25_000) {
                manager.cycle_driving_style(&mut world.host, now);
            }
            if at(now, step, 35_000) {
                manager.announce_status(&mut world.host, now);
            }
        }
        Scenario::Waypoint => {
            if at(now, step, 30_000) {
                manager.announce_eta(&mut world.host, now);
            }
        }
        Scenario::Stuck => {
            if world.blocked && world.host.temp_actions().contains(&TempAction::Brake) {
                info!("Obstacle cleared at {} ms", now);
                world.blocked = false;
            }
        }
        Scenario::Emergency => {
            world.host.nearby.retain(|v| v.id != SIREN_ID);
            if (8_000..14_000).contains(&now) {
                let speed = world.host.vehicle.as_ref().map_or(0.0, |v| v.speed);
                world.host.nearby.push(NearbyVehicle {
                    id: SIREN_ID,
                    position: world.position().offset_along(world.heading() + 180.0, 40.0),
                    heading: world.heading(),
                    speed,
                    siren_active: true,
                });
            }
        }
        Scenario::Seek => {}
        Scenario::Weather => {
            if at(now, step, 10_000) {
                world.host.weather = WeatherKind::Rain;
            }
            if at(now, step, 20_000) {
                world.host.hour = 22;
            }
            if at(now, step, 30_000) {
                world.host.weather = WeatherKind::Clear;
            }
        }
    }
}

/// Run `scenario` for `duration_ms` (or its default) and collect the output
pub fn run(scenario: Scenario, config: AutoDriveConfig, duration_ms: Option<i64>) -> Transcript {
    let duration_ms = duration_ms.unwrap_or_else(|| scenario.default_duration_ms());
    let step = config.drive.tick_interval_ms.max(1);
    let dt_s = step as f32 / 1000.0;
    info!("Running {:?} for {} ms", scenario, duration_ms);

    let mut world = setup(scenario);
    let mut manager = AutoDriveManager::new(config, &world.host);
    let mut spoken = Vec::new();

    let mut now = 0;
    while now <= duration_ms {
        script(scenario, &mut world, &mut manager, now, step);
        manager.update(&mut world.host, now);
        world.advance(now, dt_s);

        spoken.extend(world.host.spoken.drain(..).map(|(text, interrupted)| SpokenLine {
            at_ms: now,
            text,
            interrupted,
        }));
        now += step;
    }

    Transcript {
        scenario,
        duration_ms,
        spoken,
        drive_tasks: world.host.drive_tasks_issued(),
        clears: world.host.clears(),
        temp_actions: world
            .host
            .temp_actions()
            .iter()
            .map(|a| format!("{:?}", a))
            .collect(),
        active_at_end: manager.is_active(),
        final_status: manager.status_text(),
    }
}
