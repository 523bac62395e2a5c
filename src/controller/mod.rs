//! Position and event controller.
//!
//! [`RadioController`] owns the session state. Each telemetry cycle goes
//! through [`RadioController::ingest`], which updates the truck and job
//! fields, detects job and fine transitions, raises cooldown-gated alerts
//! and resolves the nearest transmitter, all inside one critical section.
//! Readers get a consistent copy through [`RadioController::status`].
//!
//! Travel-log calls are collected while the lock is held and sent after it is
//! released; a failing log never affects the session.

mod events;
mod state;

pub use events::{AlertThresholds, EdgeTracker, Edges, LogEvent, alert_conditions};
pub use state::{
    Alert, AlertKind, Coordinates, CountrySummary, CurrentLocation, JobState, Status, TrackingMode,
    TruckState,
};

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{RngCore, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::catalog::{Station, StationCatalog};
use crate::config::Config;
use crate::geo::{GeoIndex, Location};
use crate::telemetry::{TelemetrySnapshot, unix_now};
use crate::travel_log::{JobStart, TravelLog};
use events::CooldownGate;
use state::SessionState;

/// Controller tuning taken from [`Config`].
#[derive(Debug, Clone, Copy)]
struct Tuning {
    announcement_interval: Duration,
    suggestion_threshold: f64,
    thresholds: AlertThresholds,
}

struct Inner {
    state: SessionState,
    rng: Box<dyn RngCore + Send>,
}

/// Where a position falls, resolved outside the session lock.
enum Fix<'a> {
    /// Non-finite coordinates, e.g. from a torn read.
    Invalid,
    Outside,
    Inside { location: &'a Location, distance: f64, signal: f64, stations: Vec<Station> },
}

/// Stations of one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSummary {
    pub country: String,
    pub stations: Vec<Station>,
    pub count: usize,
}

/// Locations of one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSummary {
    pub country: String,
    pub locations: Vec<Location>,
    pub count: usize,
}

/// Stateful consumer of telemetry snapshots.
pub struct RadioController {
    index: Arc<GeoIndex>,
    catalog: Arc<dyn StationCatalog>,
    travel_log: Option<Arc<dyn TravelLog>>,
    tuning: Tuning,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for RadioController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioController")
            .field("locations", &self.index.location_count())
            .field("stations", &self.catalog.station_count())
            .field("travel_log", &self.travel_log.is_some())
            .finish_non_exhaustive()
    }
}

impl RadioController {
    pub fn new(
        index: Arc<GeoIndex>,
        catalog: Arc<dyn StationCatalog>,
        travel_log: Option<Arc<dyn TravelLog>>,
        config: &Config,
    ) -> Self {
        let tuning = Tuning {
            announcement_interval: config.announcement_interval,
            suggestion_threshold: config.suggestion_threshold,
            thresholds: AlertThresholds {
                speeding_margin_kmh: config.speeding_margin_kmh,
                low_fuel_ratio: config.low_fuel_threshold,
            },
        };
        let state = SessionState::new(CooldownGate::new(config.alert_cooldown));
        Self {
            index,
            catalog,
            travel_log,
            tuning,
            inner: Mutex::new(Inner { state, rng: Box::new(StdRng::from_os_rng()) }),
        }
    }

    /// Replace the randomness used for station picks.
    pub fn with_rng<R: RngCore + Send + 'static>(self, rng: R) -> Self {
        self.inner.lock().rng = Box::new(rng);
        self
    }

    pub fn index(&self) -> &GeoIndex {
        &self.index
    }

    /// Apply one full telemetry cycle.
    pub fn ingest(&self, snapshot: &TelemetrySnapshot) {
        let fix = self.resolve(Coordinates::from_snapshot(snapshot));
        let now = Instant::now();
        let mut log_events = Vec::new();
        {
            let mut inner = self.inner.lock();
            let state = &mut inner.state;
            state.apply_snapshot(snapshot);
            self.detect_events(state, snapshot, &mut log_events);
            self.check_alerts(state, snapshot, now);
            self.locate(&mut inner, fix, now, &mut log_events);
        }
        self.dispatch(log_events);
    }

    /// Update the position alone, without truck or job data.
    pub fn update_position(&self, coordinates: Coordinates) {
        let fix = self.resolve(coordinates);
        let now = Instant::now();
        let mut log_events = Vec::new();
        {
            let mut inner = self.inner.lock();
            if coordinates.is_finite() {
                inner.state.coordinates = Some(coordinates);
            }
            self.locate(&mut inner, fix, now, &mut log_events);
        }
        self.dispatch(log_events);
    }

    /// Take every pending alert.
    pub fn consume_alerts(&self) -> Vec<Alert> {
        std::mem::take(&mut self.inner.lock().state.alerts)
    }

    pub fn status(&self) -> Status {
        let mut status = Status::from_session(&self.inner.lock().state);
        status.stations = status.country.as_deref().map(|c| self.catalog.stations_for(c)).unwrap_or_default();
        status.all_countries = self.catalog.countries();
        status.total_stations = self.catalog.station_count();
        status.total_countries = self.catalog.country_count();
        status.cities_available = self.index.location_count();
        status
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.inner.lock().state.coordinates
    }

    pub fn playing_station(&self) -> Option<Station> {
        self.inner.lock().state.playing_station.clone()
    }

    pub fn suggested_station(&self) -> Option<Station> {
        self.inner.lock().state.suggested_station.clone()
    }

    pub fn set_playing_station(&self, station: Station) {
        info!(station = %station.name, country = %station.country, "Now playing");
        self.inner.lock().state.playing_station = Some(station);
    }

    /// Clear the playing station, returning the one that was playing.
    pub fn stop_playing(&self) -> Option<Station> {
        let stopped = self.inner.lock().state.playing_station.take();
        if let Some(station) = &stopped {
            info!(station = %station.name, "Stopped playing");
        }
        stopped
    }

    /// Whether positions come from live telemetry.
    pub fn set_tracking_connected(&self, connected: bool) {
        self.inner.lock().state.tracking_connected = connected;
    }

    pub fn stations_for_country(&self, country: &str) -> StationSummary {
        let stations = self.catalog.stations_for(country);
        StationSummary { country: country.to_string(), count: stations.len(), stations }
    }

    pub fn locations_for_country(&self, country: &str) -> LocationSummary {
        let locations: Vec<Location> = self.index.locations_for_country(country).into_iter().cloned().collect();
        LocationSummary { country: country.to_string(), count: locations.len(), locations }
    }

    /// Random station of the current country.
    pub fn random_station(&self) -> Option<Station> {
        let country = self.inner.lock().state.country.clone()?;
        let stations = self.catalog.stations_for(&country);
        stations.choose(&mut self.inner.lock().rng).cloned()
    }

    fn detect_events(&self, state: &mut SessionState, s: &TelemetrySnapshot, log_events: &mut Vec<LogEvent>) {
        let edges = state.edges.observe(s.job.on_job, s.job.delivered, s.fine.fined);

        if edges.job_started {
            let job = JobStart {
                cargo: s.job.cargo.clone(),
                source_city: s.job.city_src.clone(),
                source_company: s.job.comp_src.clone(),
                destination_city: s.job.city_dst.clone(),
                destination_company: s.job.comp_dst.clone(),
                distance_km: s.job.planned_distance_km,
                income: s.job.income,
            };
            info!(cargo = %job.cargo, from = %job.source_city, to = %job.destination_city, "Job started");
            state.active_job = Some(job.clone());
            log_events.push(LogEvent::JobStart(job));
        }

        if edges.job_delivered {
            info!(cargo_damage = s.wear.cargo, "Job delivered");
            state.active_job = None;
            log_events.push(LogEvent::JobComplete { cargo_damage: s.wear.cargo });
        }

        if edges.fined {
            let amount = s.fine.amount;
            let city = state.location.as_ref().map_or("Unknown", |l| l.name.as_str()).to_string();
            let country = state.country.as_deref().unwrap_or("Unknown").to_string();
            info!(amount, city = %city, country = %country, "Fined");
            state.alerts.push(Alert {
                kind: AlertKind::Fine,
                message: format!("Fined {amount} in {city}"),
                timestamp: unix_now(),
            });
            log_events.push(LogEvent::Fine { amount, city, country });
        }
    }

    fn check_alerts(&self, state: &mut SessionState, s: &TelemetrySnapshot, now: Instant) {
        for (kind, message) in alert_conditions(s, self.tuning.thresholds) {
            if state.cooldowns.try_fire(kind, now) {
                debug!(?kind, message = %message, "Alert raised");
                state.alerts.push(Alert { kind, message, timestamp: unix_now() });
            }
        }
    }

    /// Resolve a position against the index and fetch the stations of the
    /// covering country. Runs before the session lock is taken.
    fn resolve(&self, coords: Coordinates) -> Fix<'_> {
        if !coords.is_finite() {
            return Fix::Invalid;
        }
        let Some(hit) = self.index.nearest(coords.x, coords.z) else {
            return Fix::Outside;
        };
        Fix::Inside {
            location: hit.location,
            distance: hit.distance,
            signal: self.index.signal_strength(coords.x, coords.z, hit.location),
            stations: self.catalog.stations_for(&hit.location.country),
        }
    }

    fn locate(&self, inner: &mut Inner, fix: Fix<'_>, now: Instant, log_events: &mut Vec<LogEvent>) {
        let (location, distance, signal, stations) = match fix {
            Fix::Invalid => {
                debug!("Ignoring non-finite coordinates");
                return;
            }
            Fix::Outside => {
                let state = &mut inner.state;
                if state.last_location.take().is_some() {
                    info!("Left all transmission ranges");
                    state.location = None;
                    state.signal_strength = 0.0;
                }
                return;
            }
            Fix::Inside { location, distance, signal, stations } => (location, distance, signal, stations),
        };
        inner.state.signal_strength = signal;

        if inner.state.last_location != Some(location.id) {
            info!(
                location = %location.name,
                country = %location.country,
                signal,
                distance,
                "Entered location"
            );
            inner.state.location = Some(CurrentLocation::new(location, signal));
            log_events.push(LogEvent::Visit {
                city: location.name.clone(),
                country: location.country.clone(),
                x: location.x,
                z: location.z,
                signal,
            });
            self.suggest_station(inner, location, signal, &stations);
            inner.state.last_location = Some(location.id);
            inner.state.last_announcement = Some(now);
        } else if inner
            .state
            .last_announcement
            .is_none_or(|at| now.saturating_duration_since(at) > self.tuning.announcement_interval)
        {
            debug!(location = %location.name, signal, distance, "Refreshed location");
            inner.state.location = Some(CurrentLocation::new(location, signal));
            inner.state.last_announcement = Some(now);
        }

        let state = &mut inner.state;
        if state.last_country.as_deref() != Some(location.country.as_str()) {
            let summary = CountrySummary {
                country: location.country.clone(),
                stations: stations.len(),
                locations: self.index.location_count_for_country(&location.country),
            };
            info!(
                country = %summary.country,
                stations = summary.stations,
                locations = summary.locations,
                "Entered country"
            );
            state.country = Some(location.country.clone());
            state.last_country = Some(location.country.clone());
            state.country_summary = Some(summary);
        }
    }

    fn suggest_station(&self, inner: &mut Inner, location: &Location, signal: f64, stations: &[Station]) {
        if signal <= self.tuning.suggestion_threshold {
            return;
        }
        let warranted = match &inner.state.playing_station {
            None => true,
            Some(playing) => playing.country.to_lowercase() != location.country,
        };
        if !warranted {
            return;
        }
        if let Some(station) = stations.choose(&mut inner.rng) {
            info!(station = %station.name, signal, "Suggested station");
            inner.state.suggested_station = Some(station.clone());
        }
    }

    fn dispatch(&self, log_events: Vec<LogEvent>) {
        let Some(log) = &self.travel_log else {
            return;
        };
        for event in log_events {
            if let Err(e) = event.dispatch(log.as_ref()) {
                warn!(event = event.name(), error = %e, "Travel log write failed");
            }
        }
    }
}
