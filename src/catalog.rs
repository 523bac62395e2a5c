//! Station and location catalogs.
//!
//! The controller only sees these through the [`StationCatalog`] and
//! [`LocationSource`] traits. [`StationTable`] and [`CityFile`] are the
//! file-backed implementations used by the application; both fall back to a
//! small built-in data set so the system stays usable without data files.

use anyhow::Context;
use parking_lot::RwLock;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::geo::LocationRecord;

/// A radio station.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    pub name: String,
    pub stream_url: String,
    /// Display country, compared case-insensitively with location countries.
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub logo: String,
    #[serde(default)]
    pub city: String,
}

impl Station {
    pub fn new(name: &str, stream_url: &str, country: &str, city: &str) -> Self {
        Self {
            name: name.to_string(),
            stream_url: stream_url.to_string(),
            country: country.to_string(),
            logo: String::new(),
            city: city.to_string(),
        }
    }
}

/// Read access to radio stations grouped by country.
///
/// Unknown countries yield empty results, never errors. The controller
/// calls it outside its session lock.
pub trait StationCatalog: Send + Sync {
    /// Stations for a country key, case-insensitive.
    fn stations_for(&self, country: &str) -> Vec<Station>;

    /// Country keys with at least one station, sorted.
    fn countries(&self) -> Vec<String>;

    /// Total number of stations across all countries.
    fn station_count(&self) -> usize;

    fn country_count(&self) -> usize {
        self.countries().len()
    }

    /// A uniformly random station for a country.
    fn random_station_for(&self, country: &str) -> Option<Station> {
        self.stations_for(country).choose(&mut rand::rng()).cloned()
    }
}

/// Supplies the raw location list once at index construction.
pub trait LocationSource {
    fn load_locations(&self) -> anyhow::Result<Vec<LocationRecord>>;
}

/// In-memory station table, optionally loaded from a JSON file mapping
/// country keys to station lists.
#[derive(Debug, Default)]
pub struct StationTable {
    stations: RwLock<BTreeMap<String, Vec<Station>>>,
}

impl StationTable {
    pub fn new(stations: HashMap<String, Vec<Station>>) -> Self {
        Self { stations: RwLock::new(normalize(stations)) }
    }

    /// Load a JSON station file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        Ok(Self { stations: RwLock::new(read_station_file(path.as_ref())?) })
    }

    /// Load `path` when given and readable, otherwise use the built-in stations.
    pub fn load_or_fallback(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("No station file configured, using built-in stations");
            return Self::fallback();
        };
        match Self::load(path) {
            Ok(table) => {
                info!(
                    path = %path.display(),
                    stations = table.station_count(),
                    countries = table.country_count(),
                    "Loaded station catalog"
                );
                table
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Station file unavailable, using built-in stations");
                Self::fallback()
            }
        }
    }

    /// Replace the table with the contents of `path`.
    ///
    /// The current stations are kept when the file cannot be read.
    pub fn reload_from<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<usize> {
        let stations = read_station_file(path.as_ref())?;
        let countries = stations.len();
        *self.stations.write() = stations;
        Ok(countries)
    }

    /// Built-in stations for a handful of countries.
    pub fn fallback() -> Self {
        let stations = HashMap::from([
            (
                "poland".to_string(),
                vec![
                    Station::new("RMF FM", "https://rs9-krk2-cyfronet.rmfstream.pl/RMFFM48", "Poland", "Warsaw"),
                    Station::new("Radio Zet", "https://radiostream.pl/tuba9-1.mp3", "Poland", "Warsaw"),
                    Station::new("Eska Rock", "https://waw02-03.ic.smcdn.pl/t032-1.mp3", "Poland", "Warsaw"),
                ],
            ),
            (
                "germany".to_string(),
                vec![
                    Station::new("Antenne Bayern", "https://stream.antenne.de/antenne", "Germany", "Munich"),
                    Station::new("Radio Hamburg", "https://stream.radiohamburg.de/rhh-live/mp3-128", "Germany", "Hamburg"),
                    Station::new("SWR3", "https://liveradio.swr.de/sw282p3/swr3/", "Germany", "Stuttgart"),
                ],
            ),
            (
                "france".to_string(),
                vec![
                    Station::new("RTL", "https://streaming.radio.rtl.fr/rtl-1-48-192", "France", "Paris"),
                    Station::new("France Inter", "https://icecast.radiofrance.fr/franceinter-midfi.mp3", "France", "Paris"),
                ],
            ),
            (
                "uk".to_string(),
                vec![
                    Station::new("BBC Radio 1", "https://stream.live.vc.bbcmedia.co.uk/bbc_radio_one", "United Kingdom", "London"),
                    Station::new("BBC Radio 2", "https://stream.live.vc.bbcmedia.co.uk/bbc_radio_two", "United Kingdom", "London"),
                ],
            ),
        ]);
        Self::new(stations)
    }
}

impl StationCatalog for StationTable {
    fn stations_for(&self, country: &str) -> Vec<Station> {
        self.stations.read().get(&country.to_lowercase()).cloned().unwrap_or_default()
    }

    fn countries(&self) -> Vec<String> {
        self.stations.read().keys().cloned().collect()
    }

    fn station_count(&self) -> usize {
        self.stations.read().values().map(Vec::len).sum()
    }

    fn country_count(&self) -> usize {
        self.stations.read().len()
    }
}

fn normalize(stations: HashMap<String, Vec<Station>>) -> BTreeMap<String, Vec<Station>> {
    stations
        .into_iter()
        .filter(|(_, list)| !list.is_empty())
        .map(|(country, list)| (country.to_lowercase(), list))
        .collect()
}

fn read_station_file(path: &Path) -> anyhow::Result<BTreeMap<String, Vec<Station>>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading station file {}", path.display()))?;
    let raw: HashMap<String, Vec<Station>> = serde_json::from_str(&text)
        .with_context(|| format!("parsing station file {}", path.display()))?;
    Ok(normalize(raw))
}

/// City catalog in the `{"citiesList": [...]}` JSON format.
#[derive(Debug, Clone)]
pub struct CityFile {
    path: PathBuf,
}

#[derive(Deserialize)]
struct CityList {
    #[serde(rename = "citiesList")]
    cities: Vec<LocationRecord>,
}

impl CityFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl LocationSource for CityFile {
    fn load_locations(&self) -> anyhow::Result<Vec<LocationRecord>> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading city file {}", self.path.display()))?;
        let list: CityList = serde_json::from_str(&text)
            .with_context(|| format!("parsing city file {}", self.path.display()))?;
        Ok(list.cities)
    }
}

/// Location source that always fails, so the index uses its built-in set.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocations;

impl LocationSource for NoLocations {
    fn load_locations(&self) -> anyhow::Result<Vec<LocationRecord>> {
        anyhow::bail!("no city file configured")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RangeConfig;
    use crate::geo::GeoIndex;

    #[test]
    fn lookups_are_case_insensitive_and_tolerate_unknown_countries() {
        let table = StationTable::fallback();
        assert_eq!(table.stations_for("Germany").len(), 3);
        assert!(table.stations_for("atlantis").is_empty());
        assert!(table.random_station_for("atlantis").is_none());
        assert_eq!(table.countries(), vec!["france", "germany", "poland", "uk"]);
        assert_eq!(table.station_count(), 10);
        assert_eq!(table.country_count(), 4);
    }

    #[test]
    fn random_station_comes_from_requested_country() {
        let table = StationTable::fallback();
        for _ in 0..20 {
            let station = table.random_station_for("france").unwrap();
            assert_eq!(station.country, "France");
        }
    }

    #[test]
    fn station_file_loads_and_reload_keeps_old_data_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stations.json");
        std::fs::write(
            &path,
            r#"{"Norway": [{"name": "NRK P1", "stream_url": "https://example.invalid/p1"}], "Empty": []}"#,
        )
        .unwrap();

        let table = StationTable::load(&path).unwrap();
        assert_eq!(table.countries(), vec!["norway"]);
        assert_eq!(table.stations_for("norway")[0].name, "NRK P1");

        assert!(table.reload_from(dir.path().join("missing.json")).is_err());
        assert_eq!(table.station_count(), 1);

        let fallback = StationTable::load_or_fallback(Some(&dir.path().join("missing.json")));
        assert_eq!(fallback.country_count(), 4);
    }

    #[test]
    fn city_file_feeds_the_index_and_missing_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cities.json");
        std::fs::write(
            &path,
            r#"{"citiesList": [
                {"gameName": "oslo", "realName": "Oslo", "country": "norway", "x": "1.0", "y": "0", "z": "2.0"}
            ]}"#,
        )
        .unwrap();

        let index = GeoIndex::from_source(&CityFile::new(&path), RangeConfig::default());
        assert_eq!(index.location_count(), 1);
        assert_eq!(index.countries(), vec!["norway"]);

        let missing = GeoIndex::from_source(&CityFile::new(dir.path().join("none.json")), RangeConfig::default());
        assert_eq!(missing.location_count(), 3);

        let none = GeoIndex::from_source(&NoLocations, RangeConfig::default());
        assert_eq!(none.location_count(), 3);
    }
}
