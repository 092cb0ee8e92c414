//! AutoDrive manager
//!
//! Owns the session and every component, and runs the per-tick pipeline:
//!
//! 1. drain one-tick deferred actions
//! 2. read and validate the vehicle snapshot
//! 3. critical vehicle state, then recovery
//! 4. detectors, navigation progress and road seeking
//! 5. speed composition and announcement arbitration
//!
//! Every host command goes through here, so the single-task rule is
//! enforced in one place: no drive task is issued while one is active, and
//! none in the tick that cleared the previous one.

use crate::config::AutoDriveConfig;
use crate::detectors::Detectors;
use crate::error::AutoDriveError;
use crate::pending::{PendingAction, PendingActions, StartRequest, TaskKind, TaskTracker};
use crate::settings::SettingsCache;
use crate::speed::{to_mph, SpeedModifiers};
use crate::style::{DrivingStyle, STYLE_SETTING};
use announce::{Announcement, AnnouncementQueue, Category};
use data_validator::Validator;
use host::{EntityId, Host, HostError, Settings, TempAction, Vec3, VehicleSnapshot, WorldQuery};
use navigation::{describe_miles, NavigationManager, ProgressOutcome, SpeedCommand};
use recovery::{RecoveryCommand, RecoveryManager, RecoveryState, RecoveryUpdate};
use road::{scan_for_road_type, CurveAction, CurveContext, RoadType};
use std::cmp::Reverse;
use tracing::{debug, error, info, warn};
use traffic::YieldAction;

const METERS_PER_MILE: f32 = 1_609.34;
const FEET_PER_METER: f32 = 3.280_84;

/// What the session is driving towards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DriveMode {
    #[default]
    Inactive,
    Wander,
    Waypoint,
    Seeking,
}

#[derive(Debug, Clone, Copy)]
struct Session {
    actor: EntityId,
    vehicle: EntityId,
    mode: DriveMode,
    started_ms: i64,
}

#[derive(Debug, Clone, Copy)]
struct SeekState {
    wanted: RoadType,
    /// Closest matching node found by the last scan
    target: Option<Vec3>,
    started_ms: i64,
    last_scan_ms: i64,
    timeout_announced: bool,
}

/// Observable manager state
#[derive(Debug, Clone, PartialEq)]
pub struct StateSummary {
    pub mode: DriveMode,
    pub paused: bool,
    pub style: DrivingStyle,
    /// Player-selected base speed (m/s)
    pub target_speed: f32,
    pub active_task: Option<TaskKind>,
    pub pending_actions: usize,
    pub recovery: RecoveryState,
    pub recovery_attempts: u32,
    pub yielding: bool,
    pub curve_slowdown: Option<f32>,
    pub navigating: bool,
    pub seeking: Option<RoadType>,
}

pub struct AutoDriveManager {
    config: AutoDriveConfig,
    validator: Validator,
    announcer: AnnouncementQueue,
    settings: SettingsCache,
    style: DrivingStyle,
    target_speed: f32,
    session: Option<Session>,
    paused: bool,
    seek: Option<SeekState>,
    curve_speed: Option<f32>,
    following_factor: f32,
    applied_speed: Option<f32>,
    last_tick_ms: Option<i64>,
    task: TaskTracker,
    pending: PendingActions,
    detectors: Detectors,
    navigation: NavigationManager,
    recovery: RecoveryManager,
}

impl AutoDriveManager {
    /// Create an inactive manager; the persisted driving style is restored
    pub fn new(config: AutoDriveConfig, settings: &dyn Settings) -> Self {
        let style = settings
            .get_int(STYLE_SETTING)
            .and_then(DrivingStyle::from_index)
            .unwrap_or_default();
        info!("Creating AutoDrive manager, style {}", style);

        let profile = style.profile();
        Self {
            validator: Validator::new(config.validation.clone()),
            announcer: AnnouncementQueue::new(config.announcements.clone()),
            settings: SettingsCache::new(config.drive.settings_refresh_ms),
            style,
            target_speed: config.speed.default_target,
            session: None,
            paused: false,
            seek: None,
            curve_speed: None,
            following_factor: 1.0,
            applied_speed: None,
            last_tick_ms: None,
            task: TaskTracker::default(),
            pending: PendingActions::default(),
            detectors: Detectors::new(&config, &profile),
            navigation: NavigationManager::new(config.navigation.clone()),
            recovery: RecoveryManager::new(config.recovery.clone()),
            config,
        }
    }

    pub fn config(&self) -> &AutoDriveConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn mode(&self) -> DriveMode {
        self.session.map_or(DriveMode::Inactive, |s| s.mode)
    }

    pub fn style(&self) -> DrivingStyle {
        self.style
    }

    pub fn target_speed(&self) -> f32 {
        self.target_speed
    }

    pub fn recovery_state(&self) -> RecoveryState {
        self.recovery.state()
    }

    pub fn recovery_attempts(&self) -> u32 {
        self.recovery.attempts()
    }

    pub fn road_type(&self) -> RoadType {
        self.detectors.road_type.current()
    }

    pub fn summary(&self) -> StateSummary {
        StateSummary {
            mode: self.mode(),
            paused: self.paused,
            style: self.style,
            target_speed: self.target_speed,
            active_task: self.task.active(),
            pending_actions: self.pending.len(),
            recovery: self.recovery.state(),
            recovery_attempts: self.recovery.attempts(),
            yielding: self.detectors.emergency.is_yielding(),
            curve_slowdown: self.curve_speed,
            navigating: self.navigation.is_active(),
            seeking: self.seek.map(|s| s.wanted),
        }
    }

    // Starting and stopping

    pub fn start_wander<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        self.request_start(host, StartRequest::Wander, now_ms);
    }

    pub fn start_waypoint<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        self.request_start(host, StartRequest::Waypoint, now_ms);
    }

    /// Wander until a road of type `wanted` is found, then drive onto it
    pub fn start_seeking<H: Host>(&mut self, host: &mut H, wanted: RoadType, now_ms: i64) {
        self.request_start(host, StartRequest::Seek(wanted), now_ms);
    }

    fn request_start<H: Host>(&mut self, host: &mut H, request: StartRequest, now_ms: i64) {
        if let Err(e) = Self::check_start(host, request) {
            self.report_start_failure(host, &e, now_ms);
            return;
        }

        if self.session.is_some() {
            // Switching modes: the old task is cleared now, the new one
            // goes out next tick
            info!("Switching AutoDrive mode to {:?}", request);
            self.stop_internal(host, now_ms);
            self.pending.push(PendingAction::Start(request));
            return;
        }

        if let Err(e) = self.start(host, request, now_ms) {
            self.abandon();
            self.report_start_failure(host, &e, now_ms);
        }
    }

    fn check_start<H: Host>(host: &H, request: StartRequest) -> Result<(), AutoDriveError> {
        Self::check_player(host)?;
        if request == StartRequest::Waypoint && host.waypoint_position().is_none() {
            return Err(AutoDriveError::NoWaypoint);
        }
        Ok(())
    }

    fn check_player(world: &dyn WorldQuery) -> Result<(EntityId, EntityId), AutoDriveError> {
        let player = world.player()?;
        let vehicle = player.vehicle.ok_or(AutoDriveError::NotInVehicle)?;
        if !player.is_driver {
            return Err(AutoDriveError::NotDriver);
        }
        Ok((player.actor, vehicle))
    }

    fn start<H: Host>(
        &mut self,
        host: &mut H,
        request: StartRequest,
        now_ms: i64,
    ) -> Result<(), AutoDriveError> {
        let (actor, vehicle) = Self::check_player(host)?;
        let snapshot = host
            .vehicle_snapshot(vehicle)?
            .ok_or(HostError::EntityGone(vehicle))?;
        self.validator.validate_snapshot(&snapshot, now_ms)?;

        if self.settings.force_refresh(host, now_ms) {
            self.announcer
                .set_disabled(self.settings.snapshot().disabled.clone());
        }
        self.reset_session_state();

        let profile = self.style.profile();
        host.set_driver_ability(actor, profile.ability)?;
        host.set_driver_aggressiveness(actor, profile.aggressiveness)?;
        self.detectors
            .smoothing
            .set_rates(profile.accel_rate, profile.decel_rate);

        let (mode, text) = match request {
            StartRequest::Wander => (
                DriveMode::Wander,
                format!(
                    "AutoDrive wandering at {:.0} miles per hour, {} style.",
                    to_mph(self.target_speed),
                    self.style
                ),
            ),
            StartRequest::Waypoint => {
                let target = host.waypoint_position().ok_or(AutoDriveError::NoWaypoint)?;
                self.navigation.begin(&*host, target, now_ms);
                let remaining = self
                    .navigation
                    .remaining_distance(snapshot.position)
                    .unwrap_or_default();
                self.recovery.restart_progress(Some(remaining), now_ms);
                (
                    DriveMode::Waypoint,
                    format!(
                        "AutoDrive navigating to waypoint, {} away.",
                        describe_distance(remaining)
                    ),
                )
            }
            StartRequest::Seek(wanted) => (
                DriveMode::Seeking,
                self.begin_seek(host, &snapshot, wanted, now_ms),
            ),
        };

        self.session = Some(Session {
            actor,
            vehicle,
            mode,
            started_ms: now_ms,
        });
        self.issue_current_task(host, Some(snapshot.position), now_ms)?;

        info!("AutoDrive started: {:?}, style {}", mode, self.style);
        self.reply(host, text, now_ms);
        Ok(())
    }

    fn begin_seek<H: Host>(
        &mut self,
        host: &H,
        vehicle: &VehicleSnapshot,
        wanted: RoadType,
        now_ms: i64,
    ) -> String {
        let classifier = self.detectors.road_type.classifier();
        let current = classifier
            .classify_at(host, vehicle.position)
            .unwrap_or_else(|e| {
                warn!("Road classification failed: {}", e);
                RoadType::Unknown
            });

        let mut seek = SeekState {
            wanted,
            target: None,
            started_ms: now_ms,
            last_scan_ms: now_ms,
            timeout_announced: false,
        };

        let text = if current == wanted {
            format!("Already on {}. Wandering.", wanted)
        } else {
            match scan_for_road_type(host, classifier, vehicle.position, wanted, &self.config.seek.scan)
            {
                Ok(Some(found)) => {
                    seek.target = Some(found);
                    format!(
                        "Seeking {}, {} away.",
                        wanted,
                        describe_distance(vehicle.position.distance_2d(found))
                    )
                }
                Ok(None) => format!("No {} nearby. Wandering while searching.", wanted),
                Err(e) => {
                    warn!("Road scan failed: {}", e);
                    format!("No {} nearby. Wandering while searching.", wanted)
                }
            }
        };

        self.seek = Some(seek);
        text
    }

    /// Stop AutoDrive; a no-op when inactive
    pub fn stop<H: Host>(&mut self, host: &mut H, announce: bool, now_ms: i64) {
        let was_active = self.session.is_some();
        self.stop_internal(host, now_ms);
        if announce && was_active {
            self.reply(host, "AutoDrive stopped.", now_ms);
        }
    }

    fn stop_internal<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        if let Some(session) = self.session.take() {
            if let Err(e) = host.clear_tasks(session.actor) {
                warn!("Failed to clear tasks on stop: {}", e);
            }
            self.task.on_cleared();
            if self.paused {
                if let Err(e) = host.set_handbrake(session.vehicle, false) {
                    warn!("Failed to release handbrake: {}", e);
                }
            }
            info!(
                "AutoDrive stopped after {:.1} s",
                (now_ms - session.started_ms) as f32 / 1000.0
            );
        }
        self.reset_session_state();
    }

    /// Drop a half-started session without touching the host
    fn abandon(&mut self) {
        self.session = None;
        self.reset_session_state();
    }

    fn reset_session_state(&mut self) {
        self.paused = false;
        self.seek = None;
        self.curve_speed = None;
        self.following_factor = 1.0;
        self.applied_speed = None;
        self.pending.clear();
        self.detectors.reset();
        self.navigation.end();
        self.recovery.reset();
    }

    fn report_start_failure<H: Host>(&mut self, host: &mut H, e: &AutoDriveError, now_ms: i64) {
        warn!("AutoDrive start refused: {}", e);
        self.reply(host, e.user_message(), now_ms);
    }

    // Player adjustments

    pub fn increase_speed<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        self.change_speed(host, true, now_ms);
    }

    pub fn decrease_speed<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        self.change_speed(host, false, now_ms);
    }

    fn change_speed<H: Host>(&mut self, host: &mut H, up: bool, now_ms: i64) {
        let previous = self.target_speed;
        self.target_speed = self.config.speed.step_target(previous, up);
        if self.target_speed == previous {
            let text = if up { "Maximum speed." } else { "Minimum speed." };
            self.reply(host, text, now_ms);
            return;
        }

        // Cruise speed only; the drive task stays
        if self.can_adjust_speed() {
            let speed = self.commanded_target();
            self.detectors.smoothing.reset();
            self.detectors.smoothing.step(speed, 0.0);
            if let Err(e) = self.apply_speed(host, speed) {
                warn!("Failed to apply cruise speed: {}", e);
            }
        }

        let text = format!(
            "Target speed {:.0} miles per hour.",
            to_mph(self.target_speed)
        );
        self.reply(host, text, now_ms);
    }

    /// Rotate to the next style, persist it and re-task if driving
    pub fn cycle_driving_style<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        self.style = self.style.next();
        host.set_int(STYLE_SETTING, self.style.index());
        let profile = self.style.profile();
        self.detectors
            .smoothing
            .set_rates(profile.accel_rate, profile.decel_rate);
        info!("Driving style {}", self.style);

        if let Some(session) = self.session {
            let result = host
                .set_driver_ability(session.actor, profile.ability)
                .and_then(|_| host.set_driver_aggressiveness(session.actor, profile.aggressiveness));
            if let Err(e) = result {
                warn!("Failed to apply driver parameters: {}", e);
            }
            if !self.paused && self.task.active().is_some() {
                if let Err(e) = self.clear_task(host) {
                    warn!("Failed to clear task for style change: {}", e);
                }
                self.pending.push(PendingAction::IssueTask);
            }
        }

        let text = format!("Driving style {}.", self.style);
        self.reply(host, text, now_ms);
    }

    /// Hold the vehicle in place without ending the session
    pub fn pause<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        let Some(session) = self.session else {
            self.reply(host, AutoDriveError::NotActive.user_message(), now_ms);
            return;
        };
        if self.paused {
            return;
        }

        if let Err(e) = self.clear_task(host) {
            warn!("Failed to clear task on pause: {}", e);
        }
        if let Err(e) = host.set_handbrake(session.vehicle, true) {
            warn!("Failed to engage handbrake: {}", e);
        }
        self.paused = true;
        self.curve_speed = None;
        self.recovery.reset();
        info!("AutoDrive paused");
        self.reply(host, "AutoDrive paused.", now_ms);
    }

    pub fn resume<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        let Some(session) = self.session else {
            self.reply(host, AutoDriveError::NotActive.user_message(), now_ms);
            return;
        };
        if !self.paused {
            return;
        }

        if let Err(e) = host.set_handbrake(session.vehicle, false) {
            warn!("Failed to release handbrake: {}", e);
        }
        self.paused = false;

        if session.mode == DriveMode::Waypoint {
            match host.waypoint_position() {
                Some(target) => {
                    self.navigation.begin(&*host, target, now_ms);
                }
                None => {
                    self.stop_internal(host, now_ms);
                    self.reply(host, "Waypoint removed. AutoDrive stopping.", now_ms);
                    return;
                }
            }
        }

        let position = self.vehicle_position(host);
        if let Err(e) = self.issue_current_task(host, position, now_ms) {
            warn!("Failed to resume: {}", e);
        }
        info!("AutoDrive resumed");
        self.reply(host, "AutoDrive resumed.", now_ms);
    }

    pub fn toggle_pause<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        if self.paused {
            self.resume(host, now_ms);
        } else {
            self.pause(host, now_ms);
        }
    }

    // Spoken queries

    pub fn status_text(&self) -> String {
        let Some(session) = self.session else {
            return format!(
                "AutoDrive off. {} style, target speed {:.0} miles per hour.",
                capitalize(self.style.name()),
                to_mph(self.target_speed)
            );
        };

        let mode = match (session.mode, self.seek) {
            (DriveMode::Waypoint, _) => "navigating to waypoint".to_string(),
            (DriveMode::Seeking, Some(seek)) => format!("seeking {}", seek.wanted),
            _ => "wandering".to_string(),
        };
        let mut parts = vec![format!("AutoDrive {}", mode)];
        if self.paused {
            parts.push("paused".to_string());
        }
        if self.recovery.is_recovering() {
            parts.push(format!("recovery attempt {}", self.recovery.attempts()));
        }
        if self.detectors.emergency.is_yielding() {
            parts.push("yielding to emergency vehicle".to_string());
        }
        parts.push(format!(
            "target speed {:.0} miles per hour",
            to_mph(self.target_speed)
        ));
        parts.push(format!("{} style", self.style));
        let road = self.detectors.road_type.current();
        if road != RoadType::Unknown {
            parts.push(format!("on {}", road));
        }
        format!("{}.", parts.join(", "))
    }

    pub fn announce_status<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        let text = self.status_text();
        self.reply(host, text, now_ms);
    }

    pub fn announce_eta<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        let text = match self.session {
            Some(session) if session.mode == DriveMode::Waypoint => self
                .vehicle_position(host)
                .and_then(|position| self.navigation.eta_announcement(position))
                .map(|a| a.text),
            _ => None,
        };
        let text = text.unwrap_or_else(|| "No active destination.".to_string());
        self.reply(host, text, now_ms);
    }

    // Tick

    /// Advance one frame; throttled to the configured tick interval
    pub fn update<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        if let Err(e) = self.validator.validate_tick(now_ms) {
            debug!("Tick rejected: {}", e);
            return;
        }
        if let Some(last) = self.last_tick_ms {
            if now_ms < last || now_ms - last < self.config.drive.tick_interval_ms {
                return;
            }
        }
        let dt_s = self
            .last_tick_ms
            .map_or(0.0, |last| (now_ms - last) as f32 / 1000.0);
        self.last_tick_ms = Some(now_ms);
        self.task.begin_tick();

        if self.settings.refresh(host, now_ms) {
            self.announcer
                .set_disabled(self.settings.snapshot().disabled.clone());
        }

        self.run_pending(host, now_ms);

        let Some(session) = self.session else {
            return;
        };

        let vehicle = match host.vehicle_snapshot(session.vehicle) {
            Ok(Some(vehicle)) => vehicle,
            Ok(None) => {
                warn!("Vehicle {} no longer exists", session.vehicle);
                self.stop_internal(host, now_ms);
                self.reply(host, "Vehicle unavailable. AutoDrive stopping.", now_ms);
                return;
            }
            Err(e) => {
                warn!("Vehicle snapshot failed: {}", e);
                return;
            }
        };
        if let Err(e) = self.validator.validate_snapshot(&vehicle, now_ms) {
            debug!("Tick skipped: {}", e);
            return;
        }

        if let Some(condition) = self.detectors.vehicle_state.check(&vehicle, now_ms) {
            error!("Critical vehicle condition {:?}, stopping", condition);
            self.stop_internal(host, now_ms);
            self.announcer
                .try_announce(host, &condition.announcement(), now_ms);
            return;
        }
        if self.paused {
            return;
        }

        if self.recovery.is_recovering() {
            let update = self.recovery.update(now_ms);
            self.apply_recovery(host, update, now_ms);
            return;
        }

        self.check_stuck(&vehicle, session.mode, now_ms);

        let mut announcements = Vec::new();
        let action = self.run_detectors(host, session, &vehicle, now_ms, &mut announcements);
        self.handle_yield(host, action, &vehicle, now_ms);

        let continuing = match session.mode {
            DriveMode::Waypoint => self.update_navigation(host, &vehicle, now_ms, &mut announcements),
            DriveMode::Seeking => {
                self.update_road_seeking(host, &vehicle, now_ms, &mut announcements);
                true
            }
            _ => true,
        };
        if continuing {
            self.update_speed(host, dt_s);
        }

        self.flush(host, announcements, now_ms);
    }

    fn run_pending<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        for action in self.pending.take() {
            debug!("Running deferred {:?}", action);
            match action {
                PendingAction::Start(request) => {
                    if self.session.is_some() {
                        continue;
                    }
                    if let Err(e) = self.start(host, request, now_ms) {
                        self.abandon();
                        self.report_start_failure(host, &e, now_ms);
                    }
                }
                PendingAction::RestartNavigation => self.restart_navigation(host, now_ms),
                PendingAction::IssueTask => {
                    // Recovery and yielding re-task when they finish
                    if self.session.is_none()
                        || self.recovery.is_recovering()
                        || self.detectors.emergency.is_yielding()
                    {
                        continue;
                    }
                    let position = self.vehicle_position(host);
                    if let Err(e) = self.issue_current_task(host, position, now_ms) {
                        warn!("Deferred task issue failed: {}", e);
                    }
                }
                PendingAction::BeginRecovery => self.begin_recovery(host, now_ms),
            }
        }
    }

    fn check_stuck(&mut self, vehicle: &VehicleSnapshot, mode: DriveMode, now_ms: i64) {
        let queued = self
            .detectors
            .collision
            .closest_ahead()
            .map_or(false, |gap| gap <= self.config.drive.queued_gap);
        let waiting = queued
            || self.detectors.traffic_light.is_stopped()
            || self.detectors.emergency.is_yielding();

        let stuck = self.recovery.check_stuck(vehicle, waiting, now_ms);
        let stalled = mode == DriveMode::Waypoint
            && self
                .navigation
                .remaining_distance(vehicle.position)
                .map_or(false, |remaining| {
                    self.recovery.check_progress(remaining, waiting, now_ms)
                });

        if stuck || stalled {
            info!(
                "Vehicle {} at {:.1} m/s",
                if stuck { "stuck" } else { "making no progress" },
                vehicle.speed
            );
            self.pending.push(PendingAction::BeginRecovery);
        }
    }

    fn run_detectors<H: Host>(
        &mut self,
        host: &mut H,
        session: Session,
        vehicle: &VehicleSnapshot,
        now_ms: i64,
        out: &mut Vec<Announcement>,
    ) -> YieldAction {
        let beacons = self.settings.snapshot().audio_beacons;
        let profile = self.style.profile();
        let cruise_speed = self.environmental_speed();
        let d = &mut self.detectors;

        out.extend(d.traffic_light.update(&*host, vehicle, now_ms));
        out.extend(d.structures.update_uturn(vehicle, now_ms));
        out.extend(d.structures.update_gradient(vehicle, now_ms));
        out.extend(d.weather.update(&*host, now_ms));

        let time_of_day = d.time_of_day.update(&*host, now_ms);
        if let Some(on) = time_of_day.headlights {
            if let Err(e) = host.set_headlights(session.vehicle, on) {
                warn!("Failed to set headlights: {}", e);
            }
        }
        out.extend(time_of_day.announcement);

        let collision = d.collision.update(&*host, vehicle, now_ms);
        if let Some(beacon) = collision.beacon.filter(|_| beacons) {
            host.play_panned_pulse(beacon.pan, beacon.frequency, beacon.gain);
        }
        out.extend(collision.announcement);

        let following = d.following.update(d.collision.closest_ahead(), vehicle.speed);
        self.following_factor = following.speed_factor;
        out.extend(following.announcement);

        let emergency = d.emergency.update(&*host, vehicle, now_ms);
        if let Some(beacon) = emergency.beacon.filter(|_| beacons) {
            host.play_panned_pulse(beacon.pan, beacon.frequency, beacon.gain);
        }
        out.extend(emergency.announcement);

        out.extend(d.structures.update_structures(&*host, vehicle, now_ms));
        if session.mode == DriveMode::Waypoint {
            out.extend(
                self.navigation
                    .update_eta(vehicle.position, vehicle.speed, now_ms),
            );
        }
        out.extend(d.lanes.update(&*host, vehicle, now_ms));
        out.extend(d.overtake.update(&*host, vehicle, now_ms));

        let ctx = CurveContext {
            friction: d.weather.friction_coefficient(),
            style_modifier: profile.curve_modifier,
            cruise_speed,
        };
        let curve = d.curves.update(&*host, vehicle, &ctx, now_ms);
        match curve.action {
            CurveAction::BeginSlowdown { speed } => self.curve_speed = Some(speed),
            CurveAction::EndSlowdown => self.curve_speed = None,
            CurveAction::None => {}
        }
        out.extend(curve.announcements);

        let road_type = d.road_type.update(&*host, &*host, vehicle, now_ms);
        if let Some(changed) = road_type.changed {
            debug!("Road type now {}", changed);
        }
        out.extend(road_type.announcements);

        emergency.action
    }

    fn handle_yield<H: Host>(
        &mut self,
        host: &mut H,
        action: YieldAction,
        vehicle: &VehicleSnapshot,
        now_ms: i64,
    ) {
        let Some(session) = self.session else {
            return;
        };
        let hold_ms = self.config.emergency.hold_ms;
        match action {
            YieldAction::Begin => {
                self.curve_speed = None;
                if self.task.active().is_some() {
                    if let Err(e) = self.clear_task(host) {
                        warn!("Failed to clear task for yield: {}", e);
                    }
                }
                temp_action(host, session, TempAction::PullOverRight, hold_ms);
            }
            YieldAction::Hold => temp_action(host, session, TempAction::Brake, hold_ms),
            YieldAction::Resume => {
                if let Err(e) = self.issue_current_task(host, Some(vehicle.position), now_ms) {
                    warn!("Failed to resume after yield: {}", e);
                }
            }
            YieldAction::None => {}
        }
    }

    /// Returns false once the session ended or was handed to a restart
    fn update_navigation<H: Host>(
        &mut self,
        host: &mut H,
        vehicle: &VehicleSnapshot,
        now_ms: i64,
        out: &mut Vec<Announcement>,
    ) -> bool {
        let waypoint = host.waypoint_position();
        let progress = self
            .navigation
            .update_progress(waypoint, vehicle.position, now_ms);
        out.extend(progress.announcements);
        match progress.speed {
            Some(SpeedCommand::Set(speed)) => debug!("Arrival slowdown {:.1} m/s", speed),
            Some(SpeedCommand::EndSlowdown) => debug!("Arrival slowdown ended"),
            None => {}
        }

        match progress.outcome {
            ProgressOutcome::Continue => true,
            ProgressOutcome::Stop => {
                self.stop_internal(host, now_ms);
                false
            }
            ProgressOutcome::Restart => {
                if self.task.active().is_some() {
                    if let Err(e) = self.clear_task(host) {
                        warn!("Failed to clear task for restart: {}", e);
                    }
                }
                self.pending.push(PendingAction::RestartNavigation);
                false
            }
        }
    }

    fn restart_navigation<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        if self.session.is_none() {
            return;
        }
        let Some(target) = host.waypoint_position() else {
            self.stop_internal(host, now_ms);
            self.reply(host, "Waypoint removed. AutoDrive stopping.", now_ms);
            return;
        };

        self.navigation.begin(&*host, target, now_ms);
        let position = self.vehicle_position(host);
        let remaining = position.and_then(|p| self.navigation.remaining_distance(p));
        self.recovery.restart_progress(remaining, now_ms);
        // Recovery and yielding drive to the new arrival point when they finish
        if self.recovery.is_recovering() || self.detectors.emergency.is_yielding() {
            debug!("Waypoint re-resolved; task reissue left to the active maneuver");
            return;
        }
        if let Err(e) = self.issue_current_task(host, position, now_ms) {
            warn!("Failed to reissue after waypoint change: {}", e);
        }
    }

    /// Periodic rescan while seeking; re-tasks when the target moves
    fn update_road_seeking<H: Host>(
        &mut self,
        host: &mut H,
        vehicle: &VehicleSnapshot,
        now_ms: i64,
        out: &mut Vec<Announcement>,
    ) {
        let Some(mut seek) = self.seek else {
            return;
        };
        if now_ms - seek.last_scan_ms < self.config.seek.rescan_interval_ms {
            return;
        }
        seek.last_scan_ms = now_ms;

        let mut retask = false;
        if self.detectors.road_type.current() == seek.wanted {
            if seek.target.take().is_some() {
                info!("Reached {}", seek.wanted);
                out.push(Announcement::medium(
                    format!("Reached {}.", seek.wanted),
                    Category::RoadType,
                ));
                retask = true;
            }
        } else {
            match scan_for_road_type(
                &*host,
                self.detectors.road_type.classifier(),
                vehicle.position,
                seek.wanted,
                &self.config.seek.scan,
            ) {
                Ok(Some(found)) => {
                    let moved = seek.target.map_or(true, |t| {
                        t.distance_2d(found) > self.config.seek.target_hysteresis
                    });
                    if moved {
                        debug!("Seek target now {:?}", found);
                        seek.target = Some(found);
                        retask = true;
                    }
                }
                Ok(None) => {
                    if seek.target.is_none()
                        && !seek.timeout_announced
                        && now_ms - seek.started_ms >= self.config.seek.timeout_ms
                    {
                        seek.timeout_announced = true;
                        out.push(Announcement::low(
                            format!("No {} found yet. Still searching.", seek.wanted),
                            Category::RoadType,
                        ));
                    }
                }
                Err(e) => warn!("Road scan failed: {}", e),
            }
        }
        self.seek = Some(seek);

        if retask && self.task.active().is_some() {
            if let Err(e) = self.clear_task(host) {
                warn!("Failed to clear task for new seek target: {}", e);
            }
            self.pending.push(PendingAction::IssueTask);
        }
    }

    // Recovery

    fn begin_recovery<H: Host>(&mut self, host: &mut H, now_ms: i64) {
        if self.session.is_none() || self.recovery.is_recovering() {
            return;
        }
        if self.task.active().is_some() {
            if let Err(e) = self.clear_task(host) {
                warn!("Failed to clear task for recovery: {}", e);
            }
        }
        self.curve_speed = None;
        let update = self.recovery.begin(now_ms);
        self.apply_recovery(host, update, now_ms);
    }

    fn apply_recovery<H: Host>(&mut self, host: &mut H, update: RecoveryUpdate, now_ms: i64) {
        let RecoveryUpdate {
            commands,
            announcement,
        } = update;
        for command in commands {
            let Some(session) = self.session else {
                break;
            };
            match command {
                RecoveryCommand::Temp {
                    action,
                    duration_ms,
                } => {
                    if let Err(e) =
                        host.temp_action(session.actor, session.vehicle, action, duration_ms)
                    {
                        error!("Recovery maneuver {:?} failed: {}", action, e);
                        let failed = self.recovery.fail();
                        self.apply_recovery(host, failed, now_ms);
                        return;
                    }
                }
                RecoveryCommand::ReissueTask => {
                    let position = self.vehicle_position(host);
                    if let Err(e) = self.issue_current_task(host, position, now_ms) {
                        warn!("Failed to reissue after recovery: {}", e);
                    }
                }
                RecoveryCommand::Stop => self.stop_internal(host, now_ms),
            }
        }
        if let Some(announcement) = announcement {
            self.announcer.try_announce(host, &announcement, now_ms);
        }
    }

    // Tasks and speed

    fn current_task(&self, position: Option<Vec3>) -> TaskKind {
        let mode = self.mode();
        let destination = match mode {
            DriveMode::Waypoint => self.navigation.session().map(|s| s.arrival.position),
            DriveMode::Seeking => self.seek.and_then(|s| s.target),
            _ => None,
        };
        match destination {
            Some(destination) => TaskKind::DriveTo {
                destination,
                long_range: mode == DriveMode::Waypoint
                    && position.map_or(false, |p| self.navigation.is_long_range(p)),
            },
            None => TaskKind::Wander,
        }
    }

    /// Issue the task the mode calls for, or defer it when the host is not
    /// ready for a new one this tick
    fn issue_current_task<H: Host>(
        &mut self,
        host: &mut H,
        position: Option<Vec3>,
        now_ms: i64,
    ) -> Result<(), AutoDriveError> {
        let Some(session) = self.session else {
            return Err(AutoDriveError::NotActive);
        };
        if self.paused {
            return Ok(());
        }
        if !self.task.can_issue() {
            if self.task.active().is_some() {
                self.clear_task(host)?;
            }
            self.pending.push(PendingAction::IssueTask);
            return Ok(());
        }

        let kind = self.current_task(position);
        let speed = self.environmental_speed();
        let flags = self.style.profile().flags;
        match kind {
            TaskKind::Wander => {
                host.issue_drive_wander(session.actor, session.vehicle, speed, flags)?;
            }
            TaskKind::DriveTo {
                destination,
                long_range,
            } => {
                let flags = if long_range {
                    flags | self.config.drive.long_range_style_bits
                } else {
                    flags
                };
                host.issue_drive_to_coord(
                    session.actor,
                    session.vehicle,
                    destination,
                    speed,
                    flags,
                    self.navigation.config().task_arrival_radius,
                    long_range,
                )?;
            }
        }
        self.task.on_issued(kind);
        self.applied_speed = Some(speed);
        self.detectors.smoothing.reset();
        self.detectors.smoothing.step(speed, 0.0);
        info!("Issued {:?} at {:.1} m/s (t={})", kind, speed, now_ms);
        Ok(())
    }

    fn clear_task<H: Host>(&mut self, host: &mut H) -> Result<(), AutoDriveError> {
        let Some(session) = self.session else {
            return Ok(());
        };
        host.clear_tasks(session.actor)?;
        self.task.on_cleared();
        Ok(())
    }

    fn environmental_speed(&self) -> f32 {
        let modifiers = SpeedModifiers {
            style: self.style.profile().speed_multiplier,
            road_type: self.detectors.road_type.speed_multiplier(),
            weather: self.detectors.weather.speed_multiplier(),
            time_of_day: self.detectors.time_of_day.speed_multiplier(),
        };
        self.config.speed.environmental(self.target_speed, &modifiers)
    }

    /// Environmental speed with slowdowns and the following factor applied
    fn commanded_target(&self) -> f32 {
        let slowdown = [self.curve_speed, self.navigation.slowdown_speed()]
            .into_iter()
            .flatten()
            .reduce(f32::min);
        self.config
            .speed
            .commanded(self.environmental_speed(), slowdown, self.following_factor)
    }

    fn can_adjust_speed(&self) -> bool {
        self.session.is_some()
            && !self.paused
            && self.task.active().is_some()
            && !self.recovery.is_recovering()
            && !self.detectors.emergency.is_yielding()
    }

    fn update_speed<H: Host>(&mut self, host: &mut H, dt_s: f32) {
        if !self.can_adjust_speed() {
            return;
        }
        let target = self.commanded_target();
        let smoothed = self.config.speed.clamp(self.detectors.smoothing.step(target, dt_s));
        if let Err(e) = self.apply_speed(host, smoothed) {
            warn!("Failed to apply cruise speed: {}", e);
        }
    }

    fn apply_speed<H: Host>(&mut self, host: &mut H, speed: f32) -> Result<(), AutoDriveError> {
        let Some(session) = self.session else {
            return Ok(());
        };
        let unchanged = self
            .applied_speed
            .map_or(false, |applied| (applied - speed).abs() <= self.config.speed.apply_epsilon);
        if unchanged {
            return Ok(());
        }
        host.set_cruise_speed(session.actor, speed)?;
        debug!("Cruise speed {:.1} m/s", speed);
        self.applied_speed = Some(speed);
        Ok(())
    }

    fn vehicle_position(&self, world: &dyn WorldQuery) -> Option<Vec3> {
        let session = self.session?;
        match world.vehicle_snapshot(session.vehicle) {
            Ok(vehicle) => vehicle.map(|v| v.position),
            Err(e) => {
                warn!("Vehicle snapshot failed: {}", e);
                None
            }
        }
    }

    // Speech

    /// Reply to a player command; never dropped by arbitration
    fn reply<H: Host>(&mut self, host: &mut H, text: impl Into<String>, now_ms: i64) {
        let announcement = Announcement::critical(text, Category::Status);
        self.announcer.try_announce(host, &announcement, now_ms);
    }

    /// Speak a tick's announcements, most important first
    fn flush<H: Host>(&mut self, host: &mut H, mut announcements: Vec<Announcement>, now_ms: i64) {
        if announcements.is_empty() {
            return;
        }
        announcements.sort_by_key(|a| Reverse(a.priority));
        self.announcer.announce_all(host, &announcements, now_ms);
    }
}

fn temp_action<H: Host>(host: &mut H, session: Session, action: TempAction, duration_ms: u32) {
    if let Err(e) = host.temp_action(session.actor, session.vehicle, action, duration_ms) {
        warn!("Temporary action {:?} failed: {}", action, e);
    }
}

/// Spoken distance: quarter miles when far, feet when close
fn describe_distance(meters: f32) -> String {
    let miles = meters / METERS_PER_MILE;
    if miles >= 0.25 {
        describe_miles(miles).to_lowercase()
    } else {
        let feet = ((meters * FEET_PER_METER) / 50.0).round().max(1.0) * 50.0;
        format!("{:.0} feet", feet)
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use host::mock::{HostCall, MockHost};
    use host::NearbyVehicle;
    use proptest::prelude::*;

    fn manager(host: &MockHost) -> AutoDriveManager {
        AutoDriveManager::new(AutoDriveConfig::default(), host)
    }

    /// Tick every `step` ms from `from` up to and including `to`
    fn run(manager: &mut AutoDriveManager, host: &mut MockHost, from: i64, to: i64, step: i64) {
        let mut now = from;
        while now <= to {
            manager.update(host, now);
            now += step;
        }
    }

    /// No drive task is ever issued while another is still standing
    fn single_task_holds(calls: &[HostCall]) -> bool {
        let mut standing = false;
        for call in calls {
            match call {
                c if c.is_drive_task() => {
                    if standing {
                        return false;
                    }
                    standing = true;
                }
                HostCall::ClearTasks => standing = false,
                _ => {}
            }
        }
        true
    }

    #[test]
    fn test_start_wander_issues_one_task() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);

        manager.start_wander(&mut host, 0);

        assert!(manager.is_active());
        assert_eq!(manager.mode(), DriveMode::Wander);
        assert_eq!(host.drive_tasks_issued(), 1);
        assert!(matches!(
            host.last_drive_task(),
            Some(HostCall::DriveWander { style: 786_468, .. })
        ));
        assert!(host.spoke("AutoDrive wandering at 45 miles per hour"));
    }

    #[test]
    fn test_start_preconditions() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);

        host.player.vehicle = None;
        manager.start_wander(&mut host, 0);
        assert!(host.spoke("You must be in a vehicle"));

        host.player.vehicle = Some(host::mock::MOCK_VEHICLE);
        host.player.is_driver = false;
        manager.start_wander(&mut host, 5_000);
        assert!(host.spoke("driver seat"));

        host.player.is_driver = true;
        manager.start_waypoint(&mut host, 10_000);
        assert!(host.spoke("No waypoint set."));

        assert!(!manager.is_active());
        assert_eq!(host.drive_tasks_issued(), 0);
    }

    #[test]
    fn test_failed_start_keeps_running_session() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);
        manager.start_wander(&mut host, 0);

        manager.start_waypoint(&mut host, 100);

        assert_eq!(manager.mode(), DriveMode::Wander);
        assert_eq!(host.clears(), 0);
    }

    #[test]
    fn test_mode_switch_defers_new_task() {
        let mut host = MockHost::new();
        host.waypoint = Some(Vec3::new(0.0, 500.0, 0.0));
        let mut manager = manager(&host);
        manager.start_wander(&mut host, 0);

        manager.start_waypoint(&mut host, 100);
        assert!(!manager.is_active());
        assert_eq!(host.clears(), 1);
        assert_eq!(host.drive_tasks_issued(), 1);

        manager.update(&mut host, 200);
        assert_eq!(manager.mode(), DriveMode::Waypoint);
        assert_eq!(host.drive_tasks_issued(), 2);
        assert!(matches!(
            host.last_drive_task(),
            Some(HostCall::DriveToCoord { long_range: false, .. })
        ));
        assert!(single_task_holds(&host.calls));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);
        manager.start_wander(&mut host, 0);

        manager.stop(&mut host, true, 5_000);
        let summary = manager.summary();
        let calls = host.calls.len();
        let spoken = host.spoken.len();

        manager.stop(&mut host, true, 10_000);
        assert_eq!(manager.summary(), summary);
        assert_eq!(host.calls.len(), calls);
        assert_eq!(host.spoken.len(), spoken);
        assert_eq!(host.count_spoken("AutoDrive stopped."), 1);
    }

    #[test]
    fn test_speed_change_keeps_task() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);
        manager.start_wander(&mut host, 0);

        manager.increase_speed(&mut host, 100);

        assert_eq!(manager.target_speed(), 22.5);
        assert_eq!(host.drive_tasks_issued(), 1);
        assert!(host
            .calls
            .iter()
            .any(|c| matches!(c, HostCall::SetCruiseSpeed(s) if (*s - 22.5).abs() < 1e-3)));
        assert!(host.spoke("Target speed 50 miles per hour."));
    }

    #[test]
    fn test_speed_floor_announced() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);
        for i in 0..8 {
            manager.decrease_speed(&mut host, i * 5_000);
        }
        assert_eq!(manager.target_speed(), 5.0);
        assert!(host.spoke("Minimum speed."));
    }

    #[test]
    fn test_style_cycle_persists_and_retasks() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);
        manager.start_wander(&mut host, 0);

        manager.cycle_driving_style(&mut host, 100);
        assert_eq!(manager.style(), DrivingStyle::Fast);
        assert_eq!(host.int_settings.get(STYLE_SETTING), Some(&2));
        assert_eq!(host.clears(), 1);

        manager.update(&mut host, 200);
        assert_eq!(host.drive_tasks_issued(), 2);
        assert!(matches!(
            host.last_drive_task(),
            Some(HostCall::DriveWander { style: 1_074_528_293, .. })
        ));

        let restored = AutoDriveManager::new(AutoDriveConfig::default(), &host);
        assert_eq!(restored.style(), DrivingStyle::Fast);
    }

    #[test]
    fn test_pause_and_resume() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);
        manager.start_wander(&mut host, 0);

        manager.toggle_pause(&mut host, 1_000);
        assert!(manager.is_paused());
        assert!(host.calls.contains(&HostCall::Handbrake(true)));
        assert_eq!(manager.mode(), DriveMode::Wander);

        manager.update(&mut host, 1_100);
        manager.toggle_pause(&mut host, 2_000);
        assert!(!manager.is_paused());
        assert!(host.calls.contains(&HostCall::Handbrake(false)));
        assert_eq!(host.drive_tasks_issued(), 2);
        assert!(single_task_holds(&host.calls));
    }

    #[test]
    fn test_arrival_stops_session() {
        let mut host = MockHost::new();
        host.waypoint = Some(Vec3::new(0.0, 100.0, 0.0));
        let mut manager = manager(&host);
        manager.start_waypoint(&mut host, 0);
        manager.update(&mut host, 0);
        assert!(manager.summary().navigating);

        if let Some(vehicle) = host.vehicle.as_mut() {
            vehicle.position = Vec3::new(0.0, 97.0, 0.0);
        }
        manager.update(&mut host, 4_500);

        assert!(!manager.is_active());
        assert!(!manager.summary().navigating);
        assert_eq!(host.clears(), 1);
        assert!(host.spoke("Arrived at destination."));
    }

    #[test]
    fn test_waypoint_removed_stops() {
        let mut host = MockHost::new();
        host.waypoint = Some(Vec3::new(0.0, 400.0, 0.0));
        let mut manager = manager(&host);
        manager.start_waypoint(&mut host, 0);
        manager.update(&mut host, 0);

        host.waypoint = None;
        manager.update(&mut host, 4_500);

        assert!(!manager.is_active());
        assert!(host.spoke("Waypoint removed."));
        assert_eq!(host.drive_tasks_issued(), 1);
    }

    #[test]
    fn test_waypoint_moved_restarts_next_tick() {
        let mut host = MockHost::new();
        host.waypoint = Some(Vec3::new(0.0, 400.0, 0.0));
        let mut manager = manager(&host);
        manager.start_waypoint(&mut host, 0);
        manager.update(&mut host, 0);

        host.waypoint = Some(Vec3::new(300.0, 400.0, 0.0));
        manager.update(&mut host, 500);
        assert_eq!(host.clears(), 1);
        assert_eq!(host.drive_tasks_issued(), 1);

        manager.update(&mut host, 600);
        assert_eq!(host.drive_tasks_issued(), 2);
        match host.last_drive_task() {
            Some(HostCall::DriveToCoord { destination, .. }) => {
                assert!((destination.x - 300.0).abs() < 1.0);
            }
            other => panic!("expected drive-to task, got {:?}", other),
        }
        assert!(manager.is_active());
    }

    #[test]
    fn test_stuck_vehicle_recovers() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);
        manager.start_wander(&mut host, 0);

        // At rest from the start: stuck after five one-second samples
        run(&mut manager, &mut host, 0, 5_000, 500);
        assert_eq!(manager.recovery_state(), RecoveryState::None);

        manager.update(&mut host, 5_500);
        assert_eq!(manager.recovery_state(), RecoveryState::Reversing);
        assert_eq!(manager.recovery_attempts(), 1);
        assert_eq!(host.clears(), 1);
        assert!(host.spoke("Vehicle stuck. Recovery attempt 1."));

        run(&mut manager, &mut host, 6_000, 9_500, 500);
        assert_eq!(manager.recovery_state(), RecoveryState::None);
        assert_eq!(
            host.temp_actions(),
            vec![
                TempAction::ReverseStraight,
                TempAction::TurnRight,
                TempAction::Brake
            ]
        );
        assert_eq!(host.drive_tasks_issued(), 2);
        assert!(host.spoke("Recovery complete. Resuming."));
        assert_eq!(manager.recovery_attempts(), 1);
        assert!(single_task_holds(&host.calls));
    }

    #[test]
    fn test_emergency_yield_and_resume() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);
        manager.start_wander(&mut host, 0);
        manager.update(&mut host, 0);

        host.nearby.push(NearbyVehicle {
            id: EntityId(40),
            position: Vec3::new(0.0, -30.0, 0.0),
            heading: 0.0,
            speed: 20.0,
            siren_active: true,
        });
        manager.update(&mut host, 4_000);
        assert!(manager.summary().yielding);
        assert_eq!(host.clears(), 1);
        assert!(host.temp_actions().contains(&TempAction::PullOverRight));
        assert!(host.spoke("Emergency vehicle behind. Pulling over."));

        // Resume once no siren was seen for the clear-after period
        host.nearby.clear();
        run(&mut manager, &mut host, 5_000, 6_500, 500);
        assert!(manager.summary().yielding);

        manager.update(&mut host, 7_000);
        assert!(!manager.summary().yielding);
        assert_eq!(host.drive_tasks_issued(), 2);
        assert!(host.spoke("Emergency vehicle passed. Resuming."));
        assert!(single_task_holds(&host.calls));
    }

    #[test]
    fn test_waypoint_moved_while_yielding_waits_for_resume() {
        let mut host = MockHost::new();
        host.waypoint = Some(Vec3::new(0.0, 400.0, 0.0));
        let mut manager = manager(&host);
        manager.start_waypoint(&mut host, 0);
        manager.update(&mut host, 0);

        host.nearby.push(NearbyVehicle {
            id: EntityId(40),
            position: Vec3::new(0.0, -30.0, 0.0),
            heading: 0.0,
            speed: 20.0,
            siren_active: true,
        });
        manager.update(&mut host, 4_000);
        assert!(manager.summary().yielding);

        host.waypoint = Some(Vec3::new(300.0, 400.0, 0.0));
        manager.update(&mut host, 4_500);
        manager.update(&mut host, 5_000);
        assert!(manager.summary().yielding);
        assert_eq!(host.drive_tasks_issued(), 1);

        host.nearby.clear();
        run(&mut manager, &mut host, 5_500, 8_000, 500);
        assert!(!manager.summary().yielding);
        assert_eq!(host.drive_tasks_issued(), 2);
        match host.last_drive_task() {
            Some(HostCall::DriveToCoord { destination, .. }) => {
                assert!((destination.x - 300.0).abs() < 1.0);
            }
            other => panic!("expected drive-to task, got {:?}", other),
        }
        assert!(single_task_holds(&host.calls));
    }

    #[test]
    fn test_flipped_vehicle_stops() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);
        manager.start_wander(&mut host, 0);
        manager.update(&mut host, 0);

        if let Some(vehicle) = host.vehicle.as_mut() {
            vehicle.up_z = -0.5;
        }
        manager.update(&mut host, 1_000);

        assert!(!manager.is_active());
        assert!(host.spoke("Vehicle flipped. AutoDrive stopping."));
    }

    #[test]
    fn test_fire_while_paused_stops() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);
        manager.start_wander(&mut host, 0);
        manager.update(&mut host, 0);
        manager.pause(&mut host, 500);
        assert!(manager.is_paused());

        if let Some(vehicle) = host.vehicle.as_mut() {
            vehicle.on_fire = true;
        }
        manager.update(&mut host, 1_000);

        assert!(!manager.is_active());
        assert!(host.spoke("Vehicle on fire. AutoDrive stopping."));
        assert_eq!(host.calls.last(), Some(&HostCall::Handbrake(false)));
    }

    #[test]
    fn test_missing_vehicle_stops() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);
        manager.start_wander(&mut host, 0);

        host.vehicle = None;
        manager.update(&mut host, 1_000);

        assert!(!manager.is_active());
        assert!(host.spoke("Vehicle unavailable."));
    }

    #[test]
    fn test_status_and_eta_queries() {
        let mut host = MockHost::new();
        let mut manager = manager(&host);
        assert!(manager.status_text().starts_with("AutoDrive off."));

        manager.announce_eta(&mut host, 0);
        assert!(host.spoke("No active destination."));

        manager.start_wander(&mut host, 5_000);
        let status = manager.status_text();
        assert!(status.contains("wandering"));
        assert!(status.contains("normal style"));
    }

    #[test]
    fn test_disabled_category_is_silent() {
        let mut host = MockHost::new();
        host.bool_settings
            .insert(Category::Emergency.setting_key().to_string(), false);
        let mut manager = manager(&host);
        manager.start_wander(&mut host, 0);
        manager.update(&mut host, 0);

        host.nearby.push(NearbyVehicle {
            id: EntityId(40),
            position: Vec3::new(0.0, -30.0, 0.0),
            heading: 0.0,
            speed: 20.0,
            siren_active: true,
        });
        manager.update(&mut host, 5_000);

        assert!(manager.summary().yielding);
        assert!(!host.spoke("Pulling over."));
    }

    #[test]
    fn test_describe_distance() {
        assert_eq!(describe_distance(30.0), "100 feet");
        assert_eq!(describe_distance(805.0), "half a mile");
        assert_eq!(describe_distance(3_219.0), "2 miles");
    }

    #[derive(Debug, Clone)]
    enum Op {
        Wander,
        Waypoint,
        Stop,
        Style,
        Pause,
        Faster,
        Tick(i64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Wander),
            Just(Op::Waypoint),
            Just(Op::Stop),
            Just(Op::Style),
            Just(Op::Pause),
            Just(Op::Faster),
            (50i64..3_000).prop_map(Op::Tick),
        ]
    }

    proptest! {
        #[test]
        fn prop_at_most_one_task(ops in proptest::collection::vec(op(), 1..60)) {
            let mut host = MockHost::new();
            host.waypoint = Some(Vec3::new(0.0, 800.0, 0.0));
            let mut manager = manager(&host);
            let mut now = 0i64;
            for op in ops {
                match op {
                    Op::Wander => manager.start_wander(&mut host, now),
                    Op::Waypoint => manager.start_waypoint(&mut host, now),
                    Op::Stop => manager.stop(&mut host, true, now),
                    Op::Style => manager.cycle_driving_style(&mut host, now),
                    Op::Pause => manager.toggle_pause(&mut host, now),
                    Op::Faster => manager.increase_speed(&mut host, now),
                    Op::Tick(dt) => {
                        now += dt;
                        manager.update(&mut host, now);
                    }
                }
            }
            prop_assert!(single_task_holds(&host.calls));
        }

        #[test]
        fn prop_stop_twice_equals_stop_once(ops in proptest::collection::vec(op(), 0..30)) {
            let mut host = MockHost::new();
            host.waypoint = Some(Vec3::new(0.0, 800.0, 0.0));
            let mut manager = manager(&host);
            let mut now = 0i64;
            for op in ops {
                match op {
                    Op::Wander => manager.start_wander(&mut host, now),
                    Op::Waypoint => manager.start_waypoint(&mut host, now),
                    Op::Stop => manager.stop(&mut host, false, now),
                    Op::Style => manager.cycle_driving_style(&mut host, now),
                    Op::Pause => manager.toggle_pause(&mut host, now),
                    Op::Faster => manager.increase_speed(&mut host, now),
                    Op::Tick(dt) => {
                        now += dt;
                        manager.update(&mut host, now);
                    }
                }
            }
            manager.stop(&mut host, false, now);
            let once = manager.summary();
            let calls = host.calls.len();
            manager.stop(&mut host, false, now);
            prop_assert_eq!(manager.summary(), once);
            prop_assert_eq!(host.calls.len(), calls);
            prop_assert!(!manager.is_active());
        }
    }
}
