//! Byte layout of the SCS telemetry shared memory region.
//!
//! The plugin writes fields grouped by type into fixed zones. Every multi-byte
//! value is little-endian. Offsets are relative to the start of the mapping.
//!
//! Only the truck placement block at 2200 is confirmed against the plugin.
//! The other offsets follow the plugin's zone order but are provisional:
//! on a real game they may read the wrong field, e.g. a non-zero speed
//! while parked.

// TODO: check each non-coordinate offset against the plugin's
// `scs-telemetry-common.hpp`; the f32 zone at 700 is believed to open with
// `scale`, not speed.

/// Length of every bounded string field, including the NUL terminator.
pub const STRING_LEN: usize = 64;

// Zone 1: game state
pub const SDK_ACTIVE: usize = 0; // bool
pub const PAUSED: usize = 4; // bool
pub const GAME_TIME: usize = 8; // u64 µs

// Zone 2: u32
pub const PLUGIN_REVISION: usize = 40;
pub const PLANNED_DISTANCE_KM: usize = 60;

// Zone 3: i32
pub const REST_STOP: usize = 500; // minutes until a rest is due
pub const GEAR: usize = 504;
pub const GEAR_DASHBOARD: usize = 508;

// Zone 4: f32
pub const SPEED: usize = 700; // m/s, negative when reversing
pub const ENGINE_RPM: usize = 704;
pub const CRUISE_CONTROL_SPEED: usize = 708; // m/s
pub const SPEED_LIMIT: usize = 712; // m/s
pub const FUEL: usize = 716;
pub const FUEL_CAPACITY: usize = 720;
pub const ROUTE_DISTANCE: usize = 724; // m
pub const ROUTE_TIME: usize = 728; // s
pub const WEAR_ENGINE: usize = 732;
pub const WEAR_TRANSMISSION: usize = 736;
pub const WEAR_CABIN: usize = 740;
pub const WEAR_CHASSIS: usize = 744;
pub const WEAR_WHEELS: usize = 748;
pub const CARGO_DAMAGE: usize = 752;
pub const ODOMETER: usize = 756; // km

// Zone 5: bool
pub const PARK_BRAKE: usize = 1500;
pub const ELECTRIC_ENABLED: usize = 1501;
pub const ENGINE_ENABLED: usize = 1502;
pub const FUEL_WARNING: usize = 1503;
pub const ON_JOB: usize = 1504;
pub const JOB_FINISHED: usize = 1505;
pub const JOB_DELIVERED: usize = 1506;
pub const FINED: usize = 1507;

// Zone 6: f64, truck placement (confirmed)
pub const COORDINATE_X: usize = 2200;
pub const COORDINATE_Y: usize = 2208;
pub const COORDINATE_Z: usize = 2216;
pub const ROTATION_HEADING: usize = 2224;
pub const ROTATION_PITCH: usize = 2232;
pub const ROTATION_ROLL: usize = 2240;

// Zone 7: strings
pub const TRUCK_BRAND: usize = 2400;
pub const TRUCK_NAME: usize = TRUCK_BRAND + STRING_LEN;
pub const CARGO: usize = TRUCK_NAME + STRING_LEN;
pub const CITY_SRC: usize = CARGO + STRING_LEN;
pub const CITY_DST: usize = CITY_SRC + STRING_LEN;
pub const COMP_SRC: usize = CITY_DST + STRING_LEN;
pub const COMP_DST: usize = COMP_SRC + STRING_LEN;

// Zone 8: u64 / i64
pub const JOB_INCOME: usize = 3000; // u64
pub const FINE_AMOUNT: usize = 3008; // i64

/// Smallest region that holds every field above.
pub const MIN_SIZE: usize = FINE_AMOUNT + 8;

/// Meters per second to kilometers per hour.
pub const MS_TO_KMH: f32 = 3.6;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_zone_fits_before_integer_zone() {
        assert!(COMP_DST + STRING_LEN <= JOB_INCOME);
        assert!(ROTATION_ROLL + 8 <= TRUCK_BRAND);
        assert_eq!(MIN_SIZE, 3016);
    }
}
