//! User settings persisted as a flat JSON object.
//!
//! Settings only toggle presentation behavior; nothing in the telemetry
//! pipeline reads them. Read and write failures are logged and the in-memory
//! values stay authoritative.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Known settings with their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub audio_alerts_enabled: bool,
    pub static_interference_enabled: bool,
    pub auto_switch_enabled: bool,
    pub gamepad_enabled: bool,
    pub dashboard_visible: bool,
    pub alert_cooldown_seconds: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            audio_alerts_enabled: false,
            static_interference_enabled: true,
            auto_switch_enabled: true,
            gamepad_enabled: true,
            dashboard_visible: true,
            alert_cooldown_seconds: 60,
        }
    }
}

impl Settings {
    /// Overlay the known keys of `patch`. Unknown keys are ignored; a patch
    /// whose values have the wrong type is rejected as a whole.
    pub fn merged(&self, patch: &Map<String, Value>) -> serde_json::Result<Self> {
        let mut current = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for (key, value) in patch {
            if current.contains_key(key) {
                current.insert(key.clone(), value.clone());
            } else {
                debug!(key = %key, "Ignoring unknown setting");
            }
        }
        serde_json::from_value(Value::Object(current))
    }
}

/// Thread-safe settings holder with optional file persistence.
#[derive(Debug, Default)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    settings: Mutex<Settings>,
}

impl SettingsStore {
    /// Settings that are never written to disk.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load settings from `path`, keeping defaults for anything missing or
    /// unreadable. Updates are saved back to the same file.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut settings = Settings::default();

        if path.exists() {
            match std::fs::read_to_string(&path)
                .map_err(anyhow::Error::from)
                .and_then(|text| Ok(serde_json::from_str::<Map<String, Value>>(&text)?))
                .and_then(|patch| Ok(settings.merged(&patch)?))
            {
                Ok(loaded) => settings = loaded,
                Err(e) => warn!(path = %path.display(), error = %e, "Could not load settings"),
            }
        }

        Self { path: Some(path), settings: Mutex::new(settings) }
    }

    pub fn get(&self) -> Settings {
        self.settings.lock().clone()
    }

    /// Merge `patch` into the current settings and persist them.
    ///
    /// Returns the settings now in effect.
    pub fn update(&self, patch: &Map<String, Value>) -> Settings {
        let mut settings = self.settings.lock();
        match settings.merged(patch) {
            Ok(merged) => *settings = merged,
            Err(e) => {
                warn!(error = %e, "Rejected settings update");
                return settings.clone();
            }
        }
        self.save(&settings);
        settings.clone()
    }

    fn save(&self, settings: &Settings) {
        let Some(path) = &self.path else {
            return;
        };
        let result = serde_json::to_string_pretty(settings)
            .map_err(anyhow::Error::from)
            .and_then(|text| Ok(std::fs::write(path, text)?));
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "Could not save settings");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn patch(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn update_ignores_unknown_keys_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::open(&path);
        assert_eq!(store.get(), Settings::default());

        let updated = store.update(&patch(json!({"gamepad_enabled": false, "volume": 11})));
        assert!(!updated.gamepad_enabled);

        let reopened = SettingsStore::open(&path);
        assert!(!reopened.get().gamepad_enabled);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("volume"));
    }

    #[test]
    fn wrong_types_are_rejected_without_losing_state() {
        let store = SettingsStore::in_memory();
        store.update(&patch(json!({"alert_cooldown_seconds": 30})));
        let after = store.update(&patch(json!({"alert_cooldown_seconds": "soon"})));
        assert_eq!(after.alert_cooldown_seconds, 30);
    }

    #[test]
    fn unreadable_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(SettingsStore::open(&path).get(), Settings::default());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"audio_alerts_enabled": true}"#).unwrap();
        let settings = SettingsStore::open(&path).get();
        assert!(settings.audio_alerts_enabled);
        assert!(settings.dashboard_visible);
    }
}
