//! Runtime configuration.
//!
//! Configuration is read from a YAML document. Every field is optional and
//! falls back to the defaults below, so an empty file is a valid config.
//!
//! ```rust
//! use roadcast::Config;
//!
//! let config = Config::from_yaml_str("update_interval: 0.5\nalert_cooldown: 30").unwrap();
//! assert_eq!(config.update_interval.as_millis(), 500);
//! assert_eq!(config.ranges.base, 25_000.0);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::{Result, TelemetryError};

/// Default location of the SCS telemetry plugin's shared memory file.
pub const DEFAULT_TELEMETRY_PATH: &str = "/dev/shm/SCS/SCSTelemetry";

/// Environment variable overriding [`Config::telemetry_path`].
pub const TELEMETRY_PATH_ENV: &str = "ROADCAST_TELEMETRY_PATH";

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shared memory file written by the telemetry plugin.
    pub telemetry_path: PathBuf,
    /// Delay between two sampler cycles.
    #[serde(with = "seconds")]
    pub update_interval: Duration,
    /// Delay after a failed sampler cycle.
    #[serde(with = "seconds")]
    pub error_backoff: Duration,
    /// How long `stop` waits for the sampler task to finish.
    #[serde(with = "seconds")]
    pub stop_timeout: Duration,
    /// Minimum time between two announcements of the same location.
    #[serde(with = "seconds")]
    pub announcement_interval: Duration,
    /// Minimum time between two alerts of the same kind.
    #[serde(with = "seconds")]
    pub alert_cooldown: Duration,
    /// Fuel ratio below which the low fuel alert fires.
    pub low_fuel_threshold: f32,
    /// Tolerance above the speed limit before the speeding alert fires, in km/h.
    pub speeding_margin_kmh: f32,
    /// Signal strength a new location needs before a station is suggested.
    pub suggestion_threshold: f64,
    /// Transmission range tiers.
    pub ranges: RangeConfig,
    /// City catalog (`{"citiesList": [...]}`), built-in cities when absent.
    pub cities_file: Option<PathBuf>,
    /// Station catalog (country to station list), built-in stations when absent.
    pub stations_file: Option<PathBuf>,
    /// Persisted user settings.
    pub settings_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            telemetry_path: PathBuf::from(DEFAULT_TELEMETRY_PATH),
            update_interval: Duration::from_secs(1),
            error_backoff: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(2),
            announcement_interval: Duration::from_secs(30),
            alert_cooldown: Duration::from_secs(60),
            low_fuel_threshold: 0.15,
            speeding_margin_kmh: 5.0,
            suggestion_threshold: 0.6,
            ranges: RangeConfig::default(),
            cities_file: None,
            stations_file: None,
            settings_file: None,
        }
    }
}

impl Config {
    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(yaml).map_err(|e| TelemetryError::parse_error("config", e))
    }

    /// Load a configuration file and apply environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TelemetryError::file_error(path.to_path_buf(), e))?;
        let mut config = Self::from_yaml_str(&text)?;
        config.apply_env();
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply `ROADCAST_*` environment overrides.
    pub fn apply_env(&mut self) {
        if let Some(path) = std::env::var_os(TELEMETRY_PATH_ENV) {
            self.telemetry_path = PathBuf::from(path);
        }
    }
}

/// Transmission range tiers keyed on location names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeConfig {
    /// Base range in meters.
    pub base: f64,
    pub major_multiplier: f64,
    pub large_multiplier: f64,
    pub default_multiplier: f64,
    /// Lowercase name fragments of major cities.
    pub major: Vec<String>,
    /// Lowercase name fragments of large cities.
    pub large: Vec<String>,
}

const MAJOR_CITIES: &[&str] = &["london", "paris", "berlin", "madrid", "rome", "warsaw", "prague"];

const LARGE_CITIES: &[&str] = &[
    "oslo", "stockholm", "copenhagen", "helsinki", "vienna", "brussels", "amsterdam", "zurich",
    "munich", "hamburg", "frankfurt", "cologne", "lyon", "marseille", "barcelona", "lisbon",
    "milan", "naples", "budapest", "bucharest", "sofia", "athens", "istanbul", "dublin",
    "edinburgh", "manchester", "birmingham", "glasgow", "liverpool", "rotterdam", "antwerp",
    "gothenburg", "malmo", "bergen", "krakow", "gdansk", "wroclaw", "poznan", "bratislava",
    "vilnius", "riga", "tallinn", "minsk", "kyiv", "zagreb", "belgrade", "stuttgart", "dortmund",
    "dusseldorf", "hannover", "nuremberg", "leipzig", "dresden", "bremen", "duisburg", "essen",
    "genoa", "turin", "seville", "valencia", "porto", "thessaloniki",
];

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            base: 25_000.0,
            major_multiplier: 2.5,
            large_multiplier: 1.8,
            default_multiplier: 1.2,
            major: MAJOR_CITIES.iter().map(|s| s.to_string()).collect(),
            large: LARGE_CITIES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Durations as floating point seconds.
mod seconds {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(D::Error::custom)
    }
}
