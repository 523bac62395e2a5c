//! Location-aware radio companion for SCS truck simulators.
//!
//! Roadcast samples the truck's live state from the SCS telemetry plugin's
//! shared memory, resolves the nearest city transmitter and its signal
//! strength, suggests a station for the country being driven through and
//! raises alerts for speeding, low fuel, rest stops and fines.
//!
//! # Architecture
//!
//! - [`telemetry`]: read-only mapping and fixed-layout decoding of the
//!   shared memory region into [`TelemetrySnapshot`]s
//! - [`geo`]: transmitter locations, ranges and signal strength
//! - [`controller`]: session state, transitions and the [`Status`] read model
//! - [`sampler`]: background task feeding snapshots to the controller
//! - [`catalog`], [`travel_log`], [`settings`]: collaborators
//!
//! # Example
//!
//! ```rust,no_run
//! use roadcast::{Config, Roadcast};
//!
//! #[tokio::main]
//! async fn main() -> roadcast::Result<()> {
//!     let mut app = Roadcast::new(Config::default());
//!     app.initialize()?;
//!
//!     let status = app.controller().status();
//!     println!("{:?} at {:.0}% signal", status.location.map(|l| l.name), status.signal_strength * 100.0);
//!
//!     app.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod controller;
mod error;
pub mod geo;
pub mod sampler;
pub mod settings;
mod source;
pub mod telemetry;
pub mod travel_log;

pub use catalog::{CityFile, LocationSource, Station, StationCatalog, StationTable};
pub use config::Config;
pub use controller::{Alert, AlertKind, RadioController, Status, TrackingMode};
pub use error::*;
pub use geo::GeoIndex;
pub use sampler::{Sampler, StartOutcome};
pub use settings::{Settings, SettingsStore};
pub use source::SnapshotSource;
pub use telemetry::{TelemetryDecoder, TelemetrySnapshot};
pub use travel_log::{MemoryTravelLog, TravelLog, TravelStats};

use futures::Stream;
use std::sync::Arc;
use tracing::{debug, info, warn};

use catalog::NoLocations;

/// Application wiring: decoder, index, catalogs, controller and sampler.
pub struct Roadcast {
    config: Config,
    controller: Arc<RadioController>,
    stations: Arc<StationTable>,
    travel_log: Arc<MemoryTravelLog>,
    settings: SettingsStore,
    sampler: Sampler<TelemetryDecoder>,
    shut_down: bool,
}

impl Roadcast {
    /// Load catalogs and settings and build the pipeline. Nothing is
    /// connected or spawned until [`Roadcast::initialize`].
    pub fn new(config: Config) -> Self {
        let index = match &config.cities_file {
            Some(path) => GeoIndex::from_source(&CityFile::new(path), config.ranges.clone()),
            None => GeoIndex::from_source(&NoLocations, config.ranges.clone()),
        };
        let stations = Arc::new(StationTable::load_or_fallback(config.stations_file.as_deref()));
        let travel_log = Arc::new(MemoryTravelLog::new());
        let settings = match &config.settings_file {
            Some(path) => SettingsStore::open(path),
            None => SettingsStore::in_memory(),
        };

        let controller = Arc::new(RadioController::new(
            Arc::new(index),
            stations.clone(),
            Some(travel_log.clone() as Arc<dyn TravelLog>),
            &config,
        ));
        let sampler = Sampler::new(TelemetryDecoder::new(&config.telemetry_path), controller.clone(), &config);

        Self { config, controller, stations, travel_log, settings, sampler, shut_down: false }
    }

    /// Connect to telemetry and start sampling.
    ///
    /// When the telemetry source is unavailable the application keeps running
    /// without tracking and [`TrackingMode::Manual`] is returned; positions
    /// can still be fed through [`RadioController::update_position`].
    pub fn initialize(&mut self) -> Result<TrackingMode> {
        if self.sampler.is_running() {
            debug!("Telemetry tracking already running");
            return Ok(TrackingMode::Plugin);
        }

        let connected = self.sampler.source().lock().connect();
        if let Err(e) = connected {
            warn!(
                error = %e,
                suggestions = ?e.recovery_suggestions(),
                "Running without telemetry tracking"
            );
            self.controller.set_tracking_connected(false);
            return Ok(TrackingMode::Manual);
        }

        self.sampler.start()?;
        self.shut_down = false;
        self.controller.set_tracking_connected(true);
        if let Err(e) = self.travel_log.start_session() {
            warn!(error = %e, "Could not start travel log session");
        }
        info!(path = %self.config.telemetry_path.display(), "Telemetry tracking ready");
        Ok(TrackingMode::Plugin)
    }

    /// Stop sampling, close the travel log session and release the mapping.
    /// Calling it again does nothing.
    pub async fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.sampler.stop().await;

        match self.travel_log.stats() {
            Ok(stats) => {
                info!(
                    cities = stats.cities_visited,
                    countries = stats.countries_visited,
                    jobs = stats.jobs_completed,
                    fines = stats.total_fines,
                    "Session summary"
                );
                if let Err(e) = self.travel_log.end_session(&stats) {
                    warn!(error = %e, "Could not close travel log session");
                }
            }
            Err(e) => warn!(error = %e, "Could not compute travel statistics"),
        }

        self.sampler.source().lock().disconnect();
        self.controller.set_tracking_connected(false);
        info!("Shut down");
    }

    /// Reload the station catalog from the configured station file.
    pub fn reload_stations(&self) -> anyhow::Result<usize> {
        let Some(path) = &self.config.stations_file else {
            anyhow::bail!("no station file configured");
        };
        let countries = self.stations.reload_from(path)?;
        info!(countries, "Reloaded station catalog");
        Ok(countries)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn controller(&self) -> &Arc<RadioController> {
        &self.controller
    }

    pub fn stations(&self) -> &Arc<StationTable> {
        &self.stations
    }

    pub fn travel_log(&self) -> &Arc<MemoryTravelLog> {
        &self.travel_log
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn is_sampling(&self) -> bool {
        self.sampler.is_running()
    }

    /// Stream of decoded telemetry snapshots.
    pub fn snapshots(&self) -> impl Stream<Item = Arc<TelemetrySnapshot>> + Send + 'static {
        self.sampler.snapshots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_telemetry_runs_in_manual_mode() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config { telemetry_path: dir.path().join("absent"), ..Config::default() };
        let mut app = Roadcast::new(config);

        assert_eq!(app.initialize().unwrap(), TrackingMode::Manual);
        assert!(!app.is_sampling());
        assert_eq!(app.controller().status().tracking_mode, TrackingMode::Manual);
        assert_eq!(app.controller().status().cities_available, 3);
        assert!(app.travel_log().sessions().is_empty());

        app.shutdown().await;
        app.shutdown().await;
    }

    #[tokio::test]
    async fn initialize_twice_opens_one_session() {
        let mut region = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(region.as_file_mut(), &TelemetrySnapshot::default().encode()).unwrap();
        let config = Config { telemetry_path: region.path().to_path_buf(), ..Config::default() };
        let mut app = Roadcast::new(config);

        assert_eq!(app.initialize().unwrap(), TrackingMode::Plugin);
        assert_eq!(app.initialize().unwrap(), TrackingMode::Plugin);
        assert_eq!(app.travel_log().sessions().len(), 1);
        assert!(app.is_sampling());

        app.shutdown().await;
        assert!(!app.is_sampling());
        let sessions = app.travel_log().sessions();
        assert_eq!(sessions.len(), 1);
        assert!(sessions[0].stats.is_some());
    }

    #[tokio::test]
    async fn reload_without_station_file_fails_and_keeps_catalog() {
        let app = Roadcast::new(Config::default());
        assert!(app.reload_stations().is_err());
        assert_eq!(app.stations().country_count(), 4);
    }
}
