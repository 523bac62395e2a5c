//! Geospatial index of transmitter locations

use std::collections::HashMap;
use tracing::{info, warn};

use super::location::{Location, LocationId, LocationRecord, range_for};
use super::signal::{distance_2d, signal_strength};
use crate::catalog::LocationSource;
use crate::config::RangeConfig;

/// Nearest in-range location for a position.
#[derive(Debug, Clone, Copy)]
pub struct Nearest<'a> {
    pub location: &'a Location,
    /// Horizontal distance in meters.
    pub distance: f64,
}

/// Static table of locations with per-country grouping.
#[derive(Debug, Clone)]
pub struct GeoIndex {
    ranges: RangeConfig,
    locations: Vec<Location>,
    by_country: HashMap<String, Vec<LocationId>>,
}

impl GeoIndex {
    /// Build an index from raw records. Ranges are computed once here.
    pub fn new(records: Vec<LocationRecord>, ranges: RangeConfig) -> Self {
        let mut index = Self { ranges, locations: Vec::new(), by_country: HashMap::new() };
        index.reload(records);
        index
    }

    /// Build an index from a catalog, falling back to the built-in cities
    /// when the catalog cannot be read.
    pub fn from_source(source: &dyn LocationSource, ranges: RangeConfig) -> Self {
        match source.load_locations() {
            Ok(records) if !records.is_empty() => {
                let index = Self::new(records, ranges);
                info!(
                    locations = index.location_count(),
                    countries = index.country_count(),
                    "Loaded location catalog"
                );
                index
            }
            Ok(_) => {
                warn!("Location catalog is empty, using built-in locations");
                Self::fallback(ranges)
            }
            Err(e) => {
                warn!(error = %e, "Location catalog unavailable, using built-in locations");
                Self::fallback(ranges)
            }
        }
    }

    /// Index over the built-in locations.
    pub fn fallback(ranges: RangeConfig) -> Self {
        Self::new(fallback_records(), ranges)
    }

    /// Replace every location and rebuild the country grouping.
    pub fn reload(&mut self, records: Vec<LocationRecord>) {
        self.locations = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| Location {
                id: LocationId(i),
                range: range_for(&self.ranges, &record.real_name),
                name: record.real_name,
                internal_name: record.game_name,
                country: record.country.to_lowercase(),
                x: record.x,
                y: record.y,
                z: record.z,
            })
            .collect();

        self.by_country.clear();
        for location in &self.locations {
            self.by_country.entry(location.country.clone()).or_default().push(location.id);
        }
    }

    /// Transmission range a location with this name would get.
    pub fn range_for(&self, name: &str) -> f64 {
        range_for(&self.ranges, name)
    }

    /// Closest location whose range covers `(x, z)`.
    ///
    /// Ties go to the location listed first in the catalog.
    pub fn nearest(&self, x: f64, z: f64) -> Option<Nearest<'_>> {
        let mut best: Option<Nearest<'_>> = None;
        for location in &self.locations {
            let distance = distance_2d(x, z, location.x, location.z);
            if distance.is_nan() || distance > location.range {
                continue;
            }
            if best.is_none_or(|b| distance < b.distance) {
                best = Some(Nearest { location, distance });
            }
        }
        best
    }

    /// Signal strength of `location` as received at `(x, z)`.
    pub fn signal_strength(&self, x: f64, z: f64, location: &Location) -> f64 {
        signal_strength(distance_2d(x, z, location.x, location.z), location.range)
    }

    pub fn get(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(id.0)
    }

    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    /// Locations in a country, case-insensitive. Empty for unknown countries.
    pub fn locations_for_country(&self, country: &str) -> Vec<&Location> {
        self.by_country
            .get(&country.to_lowercase())
            .map(|ids| ids.iter().filter_map(|id| self.get(*id)).collect())
            .unwrap_or_default()
    }

    pub fn location_count_for_country(&self, country: &str) -> usize {
        self.by_country.get(&country.to_lowercase()).map_or(0, Vec::len)
    }

    /// Country keys, sorted.
    pub fn countries(&self) -> Vec<&str> {
        let mut countries: Vec<&str> = self.by_country.keys().map(String::as_str).collect();
        countries.sort_unstable();
        countries
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn country_count(&self) -> usize {
        self.by_country.len()
    }
}

fn fallback_records() -> Vec<LocationRecord> {
    vec![
        LocationRecord::new("Berlin", "germany", 18_600.0, 46.0, -27_500.0),
        LocationRecord::new("Paris", "france", 8_500.0, 45.0, -25_200.0),
        LocationRecord::new("London", "uk", 5_200.0, 44.0, -29_800.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn index(records: Vec<LocationRecord>) -> GeoIndex {
        GeoIndex::new(records, RangeConfig::default())
    }

    #[test]
    fn fallback_has_three_countries() {
        let index = GeoIndex::fallback(RangeConfig::default());
        assert_eq!(index.location_count(), 3);
        assert_eq!(index.countries(), vec!["france", "germany", "uk"]);
        assert_eq!(index.locations_for_country("GERMANY")[0].name, "Berlin");
        assert!(index.locations_for_country("narnia").is_empty());
        assert_eq!(index.location_count_for_country("narnia"), 0);
    }

    #[test]
    fn nearest_respects_each_location_range() {
        // Kiel: 30 km default range. Hamburg: 45 km large range.
        let index = index(vec![
            LocationRecord::new("Kiel", "germany", 0.0, 0.0, 0.0),
            LocationRecord::new("Hamburg", "germany", 100_000.0, 0.0, 0.0),
        ]);

        let hit = index.nearest(20_000.0, 0.0).unwrap();
        assert_eq!(hit.location.name, "Kiel");
        assert_eq!(hit.distance, 20_000.0);

        // 35 km from Kiel (out of its range), 65 km from Hamburg (out of its range).
        assert!(index.nearest(35_000.0, 0.0).is_none());

        // 40 km from Hamburg is inside its larger range.
        assert_eq!(index.nearest(60_000.0, 0.0).unwrap().location.name, "Hamburg");
    }

    #[test]
    fn non_finite_positions_match_nothing() {
        let index = GeoIndex::fallback(RangeConfig::default());
        assert!(index.nearest(f64::NAN, 0.0).is_none());
        assert!(index.nearest(0.0, f64::NAN).is_none());
        assert!(index.nearest(f64::INFINITY, f64::NEG_INFINITY).is_none());

        let berlin = index.locations_for_country("germany")[0];
        assert_eq!(index.signal_strength(f64::NAN, berlin.z, berlin), 0.0);
    }

    #[test]
    fn altitude_is_ignored() {
        let index = index(vec![LocationRecord::new("Kiel", "germany", 0.0, 5_000.0, 0.0)]);
        let hit = index.nearest(3.0, 4.0).unwrap();
        assert_eq!(hit.distance, 5.0);
    }

    #[test]
    fn ties_go_to_first_in_catalog_order() {
        let index = index(vec![
            LocationRecord::new("Kiel", "germany", -1_000.0, 0.0, 0.0),
            LocationRecord::new("Lubeck", "germany", 1_000.0, 0.0, 0.0),
        ]);
        assert_eq!(index.nearest(0.0, 0.0).unwrap().location.name, "Kiel");

        let reversed = index_reversed();
        assert_eq!(reversed.nearest(0.0, 0.0).unwrap().location.name, "Lubeck");
    }

    fn index_reversed() -> GeoIndex {
        index(vec![
            LocationRecord::new("Lubeck", "germany", 1_000.0, 0.0, 0.0),
            LocationRecord::new("Kiel", "germany", -1_000.0, 0.0, 0.0),
        ])
    }

    #[test]
    fn reload_rebuilds_grouping() {
        let mut index = GeoIndex::fallback(RangeConfig::default());
        index.reload(vec![LocationRecord::new("Oslo", "Norway", 0.0, 0.0, 0.0)]);
        assert_eq!(index.country_count(), 1);
        assert_eq!(index.location_count_for_country("norway"), 1);
        assert_eq!(index.get(LocationId(0)).unwrap().range, 45_000.0);
        assert!(index.get(LocationId(1)).is_none());
    }

    #[test]
    fn signal_strength_uses_location_range() {
        let index = index(vec![LocationRecord::new("Kiel", "germany", 0.0, 0.0, 0.0)]);
        let kiel = index.get(LocationId(0)).unwrap();
        assert_eq!(index.signal_strength(1_000.0, 0.0, kiel), 1.0);
        assert_eq!(index.signal_strength(30_000.0, 0.0, kiel), 0.0);
    }

    proptest! {
        #[test]
        fn nearest_is_in_range_and_minimal(
            sites in prop::collection::vec((-200_000.0f64..200_000.0, -200_000.0f64..200_000.0), 1..12),
            x in -200_000.0f64..200_000.0,
            z in -200_000.0f64..200_000.0,
        ) {
            let records = sites
                .iter()
                .enumerate()
                .map(|(i, (sx, sz))| LocationRecord::new(&format!("Site {i}"), "testland", *sx, 0.0, *sz))
                .collect();
            let index = index(records);

            match index.nearest(x, z) {
                Some(hit) => {
                    prop_assert!(hit.distance <= hit.location.range);
                    for other in index.locations() {
                        let d = distance_2d(x, z, other.x, other.z);
                        if d <= other.range {
                            prop_assert!(hit.distance <= d);
                        }
                    }
                }
                None => {
                    for other in index.locations() {
                        prop_assert!(distance_2d(x, z, other.x, other.z) > other.range);
                    }
                }
            }
        }
    }
}
