//! Location types

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::RangeConfig;

/// Stable position of a location within its index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationId(pub usize);

/// One entry of a raw city catalog.
///
/// Coordinates may be given as numbers or as numeric strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    #[serde(rename = "gameName")]
    pub game_name: String,
    #[serde(rename = "realName")]
    pub real_name: String,
    pub country: String,
    #[serde(deserialize_with = "coerce_f64")]
    pub x: f64,
    #[serde(deserialize_with = "coerce_f64")]
    pub y: f64,
    #[serde(deserialize_with = "coerce_f64")]
    pub z: f64,
}

impl LocationRecord {
    pub fn new(real_name: &str, country: &str, x: f64, y: f64, z: f64) -> Self {
        Self {
            game_name: real_name.to_lowercase(),
            real_name: real_name.to_string(),
            country: country.to_string(),
            x,
            y,
            z,
        }
    }
}

fn coerce_f64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// A transmitter site with its precomputed range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Location {
    pub id: LocationId,
    /// Display name.
    pub name: String,
    /// Name used inside the game files.
    pub internal_name: String,
    /// Lowercase country key.
    pub country: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Transmission range in meters.
    pub range: f64,
}

/// Square around a location's transmitter covering its whole range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_z: f64,
    pub max_z: f64,
}

impl Location {
    pub fn bounds(&self) -> Bounds {
        Bounds {
            min_x: self.x - self.range,
            max_x: self.x + self.range,
            min_z: self.z - self.range,
            max_z: self.z + self.range,
        }
    }
}

/// Transmission range for a location name.
///
/// Case-insensitive substring match: a name containing any major token gets
/// the major multiplier, otherwise any large token gets the large
/// multiplier, otherwise the default multiplier applies. Major is checked
/// first, so "Parisville" is ranked as Paris.
pub fn range_for(ranges: &RangeConfig, name: &str) -> f64 {
    let name = name.to_lowercase();
    let contains_any =
        |tokens: &[String]| tokens.iter().any(|token| name.contains(&token.to_lowercase()));

    let multiplier = if contains_any(&ranges.major) {
        ranges.major_multiplier
    } else if contains_any(&ranges.large) {
        ranges.large_multiplier
    } else {
        ranges.default_multiplier
    };
    ranges.base * multiplier
}
