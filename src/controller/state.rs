//! Session state and its read model

use serde::Serialize;
use tokio::time::Instant;

use super::events::{CooldownGate, EdgeTracker};
use crate::catalog::Station;
use crate::geo::{Bounds, Location, LocationId};
use crate::telemetry::{Position, TelemetrySnapshot, Wear};
use crate::travel_log::JobStart;

/// Last known truck position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Unix seconds of the reading.
    pub timestamp: f64,
}

impl Coordinates {
    pub fn from_snapshot(snapshot: &TelemetrySnapshot) -> Self {
        let Position { x, y, z } = snapshot.position;
        Self { x, y, z, timestamp: snapshot.timestamp }
    }

    /// Whether the horizontal position is usable for lookups.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.z.is_finite()
    }
}

/// Location the truck is currently covered by, as of the last announcement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CurrentLocation {
    pub id: LocationId,
    pub name: String,
    pub internal_name: String,
    pub country: String,
    pub signal_strength: f64,
    pub coordinates: Position,
    pub range: f64,
    pub bounds: Bounds,
}

impl CurrentLocation {
    pub(crate) fn new(location: &Location, signal_strength: f64) -> Self {
        Self {
            id: location.id,
            name: location.name.clone(),
            internal_name: location.internal_name.clone(),
            country: location.country.clone(),
            signal_strength,
            coordinates: Position { x: location.x, y: location.y, z: location.z },
            range: location.range,
            bounds: location.bounds(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TruckState {
    /// km/h
    pub speed: f32,
    pub engine_rpm: f32,
    pub gear: i32,
    pub gear_dashboard: i32,
    pub fuel: f32,
    pub fuel_capacity: f32,
    pub fuel_warning: bool,
    pub cruise_control_speed: f32,
    pub speed_limit: f32,
    pub odometer: f32,
    pub brand: String,
    pub name: String,
    pub park_brake: bool,
    pub electric_enabled: bool,
    pub engine_enabled: bool,
    pub paused: bool,
}

impl From<&TelemetrySnapshot> for TruckState {
    fn from(s: &TelemetrySnapshot) -> Self {
        Self {
            speed: s.drivetrain.speed,
            engine_rpm: s.drivetrain.engine_rpm,
            gear: s.drivetrain.gear,
            gear_dashboard: s.drivetrain.gear_dashboard,
            fuel: s.fuel.level,
            fuel_capacity: s.fuel.capacity,
            fuel_warning: s.fuel.warning,
            cruise_control_speed: s.drivetrain.cruise_control_speed,
            speed_limit: s.drivetrain.speed_limit,
            odometer: s.odometer,
            brand: s.brand.clone(),
            name: s.name.clone(),
            park_brake: s.switches.park_brake,
            electric_enabled: s.switches.electric_enabled,
            engine_enabled: s.switches.engine_enabled,
            paused: s.paused,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobState {
    pub active: bool,
    pub finished: bool,
    pub delivered: bool,
    pub cargo: String,
    pub city_src: String,
    pub city_dst: String,
    pub comp_src: String,
    pub comp_dst: String,
    pub income: u64,
    pub planned_distance_km: u32,
    pub route_distance: f32,
    pub route_time: f32,
}

impl From<&TelemetrySnapshot> for JobState {
    fn from(s: &TelemetrySnapshot) -> Self {
        let job = &s.job;
        Self {
            active: job.on_job,
            finished: job.finished,
            delivered: job.delivered,
            cargo: job.cargo.clone(),
            city_src: job.city_src.clone(),
            city_dst: job.city_dst.clone(),
            comp_src: job.comp_src.clone(),
            comp_dst: job.comp_dst.clone(),
            income: job.income,
            planned_distance_km: job.planned_distance_km,
            route_distance: job.route_distance,
            route_time: job.route_time,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Speed,
    Fuel,
    Rest,
    Fine,
}

/// User-facing alert waiting to be consumed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub message: String,
    /// Unix seconds when the alert was raised.
    pub timestamp: f64,
}

/// Station and location counts for the current country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountrySummary {
    pub country: String,
    pub stations: usize,
    pub locations: usize,
}

/// Mutable session state, owned by the controller behind one lock.
#[derive(Debug)]
pub(crate) struct SessionState {
    pub country: Option<String>,
    pub country_summary: Option<CountrySummary>,
    pub location: Option<CurrentLocation>,
    pub coordinates: Option<Coordinates>,
    pub signal_strength: f64,
    pub suggested_station: Option<Station>,
    pub playing_station: Option<Station>,
    pub truck: TruckState,
    pub job: JobState,
    pub damage: Wear,
    pub alerts: Vec<Alert>,
    pub active_job: Option<JobStart>,
    pub tracking_connected: bool,

    pub last_location: Option<LocationId>,
    pub last_country: Option<String>,
    pub last_announcement: Option<Instant>,
    pub edges: EdgeTracker,
    pub cooldowns: CooldownGate,
}

impl SessionState {
    pub fn new(cooldowns: CooldownGate) -> Self {
        Self {
            country: None,
            country_summary: None,
            location: None,
            coordinates: None,
            signal_strength: 0.0,
            suggested_station: None,
            playing_station: None,
            truck: TruckState::default(),
            job: JobState::default(),
            damage: Wear::default(),
            alerts: Vec::new(),
            active_job: None,
            tracking_connected: false,
            last_location: None,
            last_country: None,
            last_announcement: None,
            edges: EdgeTracker::default(),
            cooldowns,
        }
    }

    /// Copy the display fields of one telemetry cycle.
    pub fn apply_snapshot(&mut self, snapshot: &TelemetrySnapshot) {
        let coordinates = Coordinates::from_snapshot(snapshot);
        if coordinates.is_finite() {
            self.coordinates = Some(coordinates);
        }
        self.truck = TruckState::from(snapshot);
        self.job = JobState::from(snapshot);
        self.damage = snapshot.wear;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingMode {
    /// Positions come from the telemetry plugin.
    Plugin,
    /// No telemetry; positions are only set through `update_position`.
    Manual,
}

/// Consistent read model of the session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status {
    pub country: Option<String>,
    pub country_summary: Option<CountrySummary>,
    pub location: Option<CurrentLocation>,
    pub coordinates: Option<Coordinates>,
    pub signal_strength: f64,
    pub stations: Vec<Station>,
    pub all_countries: Vec<String>,
    pub plugin_connected: bool,
    pub tracking_mode: TrackingMode,
    pub total_stations: usize,
    pub total_countries: usize,
    pub cities_available: usize,
    pub suggested_station: Option<Station>,
    pub playing_station: Option<Station>,
    pub truck: TruckState,
    pub job: JobState,
    pub active_job: Option<JobStart>,
    pub damage: Wear,
    /// Alerts raised but not consumed yet.
    pub alerts: Vec<Alert>,
}

impl Status {
    /// Copy the session part of the read model. Catalog fields are left empty.
    pub(crate) fn from_session(state: &SessionState) -> Self {
        Self {
            country: state.country.clone(),
            country_summary: state.country_summary.clone(),
            location: state.location.clone(),
            coordinates: state.coordinates,
            signal_strength: state.signal_strength,
            stations: Vec::new(),
            all_countries: Vec::new(),
            plugin_connected: state.tracking_connected,
            tracking_mode: if state.tracking_connected { TrackingMode::Plugin } else { TrackingMode::Manual },
            total_stations: 0,
            total_countries: 0,
            cities_available: 0,
            suggested_station: state.suggested_station.clone(),
            playing_station: state.playing_station.clone(),
            truck: state.truck.clone(),
            job: state.job.clone(),
            active_job: state.active_job.clone(),
            damage: state.damage,
            alerts: state.alerts.clone(),
        }
    }
}
