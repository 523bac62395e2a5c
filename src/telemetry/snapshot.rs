//! Typed telemetry snapshot decoded from the shared memory region

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use super::field::{Field, read_speed_kmh, read_str};
use super::layout as off;
use crate::Result;

/// One decoded telemetry reading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    /// Wall clock time the snapshot was captured, in seconds since the Unix epoch.
    pub timestamp: f64,
    /// Game clock in microseconds.
    pub game_time: u64,
    pub sdk_active: bool,
    pub paused: bool,
    pub plugin_revision: u32,
    pub position: Position,
    pub rotation: Rotation,
    pub drivetrain: Drivetrain,
    pub fuel: Fuel,
    pub wear: Wear,
    /// Odometer in kilometers.
    pub odometer: f32,
    pub brand: String,
    pub name: String,
    pub switches: Switches,
    pub job: JobFields,
    pub fine: FineFields,
}

/// World position in meters. `y` is altitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub heading: f64,
    pub pitch: f64,
    pub roll: f64,
}

/// Speeds are km/h magnitudes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Drivetrain {
    pub speed: f32,
    pub engine_rpm: f32,
    pub gear: i32,
    pub gear_dashboard: i32,
    pub cruise_control_speed: f32,
    pub speed_limit: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Fuel {
    pub level: f32,
    pub capacity: f32,
    pub warning: bool,
}

impl Fuel {
    /// Remaining fuel as a fraction of capacity, `None` when capacity is unknown.
    pub fn ratio(&self) -> Option<f32> {
        (self.capacity > 0.0).then(|| self.level / self.capacity)
    }
}

/// Wear per subsystem, 0.0 (new) to 1.0 (destroyed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wear {
    pub engine: f32,
    pub transmission: f32,
    pub cabin: f32,
    pub chassis: f32,
    pub wheels: f32,
    pub cargo: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Switches {
    pub park_brake: bool,
    pub electric_enabled: bool,
    pub engine_enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobFields {
    pub planned_distance_km: u32,
    /// Remaining route distance in meters.
    pub route_distance: f32,
    /// Remaining route time in seconds.
    pub route_time: f32,
    /// Minutes until a rest is needed; positive means a rest stop is due.
    pub rest_stop: i32,
    pub cargo: String,
    pub city_src: String,
    pub city_dst: String,
    pub comp_src: String,
    pub comp_dst: String,
    pub income: u64,
    pub on_job: bool,
    pub finished: bool,
    pub delivered: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FineFields {
    pub amount: i64,
    pub fined: bool,
}

impl TelemetrySnapshot {
    /// Decode every field from a raw telemetry region in one pass.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let text = |offset| read_str(data, offset, off::STRING_LEN);

        Ok(Self {
            timestamp: unix_now(),
            game_time: u64::read(data, off::GAME_TIME)?,
            sdk_active: bool::read(data, off::SDK_ACTIVE)?,
            paused: bool::read(data, off::PAUSED)?,
            plugin_revision: u32::read(data, off::PLUGIN_REVISION)?,
            position: Position {
                x: f64::read(data, off::COORDINATE_X)?,
                y: f64::read(data, off::COORDINATE_Y)?,
                z: f64::read(data, off::COORDINATE_Z)?,
            },
            rotation: Rotation {
                heading: f64::read(data, off::ROTATION_HEADING)?,
                pitch: f64::read(data, off::ROTATION_PITCH)?,
                roll: f64::read(data, off::ROTATION_ROLL)?,
            },
            drivetrain: Drivetrain {
                speed: read_speed_kmh(data, off::SPEED)?,
                engine_rpm: f32::read(data, off::ENGINE_RPM)?,
                gear: i32::read(data, off::GEAR)?,
                gear_dashboard: i32::read(data, off::GEAR_DASHBOARD)?,
                cruise_control_speed: read_speed_kmh(data, off::CRUISE_CONTROL_SPEED)?,
                speed_limit: read_speed_kmh(data, off::SPEED_LIMIT)?,
            },
            fuel: Fuel {
                level: f32::read(data, off::FUEL)?,
                capacity: f32::read(data, off::FUEL_CAPACITY)?,
                warning: bool::read(data, off::FUEL_WARNING)?,
            },
            wear: Wear {
                engine: f32::read(data, off::WEAR_ENGINE)?,
                transmission: f32::read(data, off::WEAR_TRANSMISSION)?,
                cabin: f32::read(data, off::WEAR_CABIN)?,
                chassis: f32::read(data, off::WEAR_CHASSIS)?,
                wheels: f32::read(data, off::WEAR_WHEELS)?,
                cargo: f32::read(data, off::CARGO_DAMAGE)?,
            },
            odometer: f32::read(data, off::ODOMETER)?,
            brand: text(off::TRUCK_BRAND)?,
            name: text(off::TRUCK_NAME)?,
            switches: Switches {
                park_brake: bool::read(data, off::PARK_BRAKE)?,
                electric_enabled: bool::read(data, off::ELECTRIC_ENABLED)?,
                engine_enabled: bool::read(data, off::ENGINE_ENABLED)?,
            },
            job: JobFields {
                planned_distance_km: u32::read(data, off::PLANNED_DISTANCE_KM)?,
                route_distance: f32::read(data, off::ROUTE_DISTANCE)?,
                route_time: f32::read(data, off::ROUTE_TIME)?,
                rest_stop: i32::read(data, off::REST_STOP)?,
                cargo: text(off::CARGO)?,
                city_src: text(off::CITY_SRC)?,
                city_dst: text(off::CITY_DST)?,
                comp_src: text(off::COMP_SRC)?,
                comp_dst: text(off::COMP_DST)?,
                income: u64::read(data, off::JOB_INCOME)?,
                on_job: bool::read(data, off::ON_JOB)?,
                finished: bool::read(data, off::JOB_FINISHED)?,
                delivered: bool::read(data, off::JOB_DELIVERED)?,
            },
            fine: FineFields {
                amount: i64::read(data, off::FINE_AMOUNT)?,
                fined: bool::read(data, off::FINED)?,
            },
        })
    }

    /// Write this snapshot into a fresh region in the plugin's layout.
    ///
    /// Speeds are stored back as m/s. Strings longer than the field are
    /// truncated to leave room for the NUL terminator. Used to record
    /// snapshots and to build fixtures.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; off::MIN_SIZE];
        let mut put = |offset: usize, bytes: &[u8]| {
            buf[offset..offset + bytes.len()].copy_from_slice(bytes);
        };
        let kmh = |v: f32| (v / off::MS_TO_KMH).to_le_bytes();

        put(off::SDK_ACTIVE, &[self.sdk_active as u8]);
        put(off::PAUSED, &[self.paused as u8]);
        put(off::GAME_TIME, &self.game_time.to_le_bytes());
        put(off::PLUGIN_REVISION, &self.plugin_revision.to_le_bytes());
        put(off::PLANNED_DISTANCE_KM, &self.job.planned_distance_km.to_le_bytes());
        put(off::REST_STOP, &self.job.rest_stop.to_le_bytes());
        put(off::GEAR, &self.drivetrain.gear.to_le_bytes());
        put(off::GEAR_DASHBOARD, &self.drivetrain.gear_dashboard.to_le_bytes());
        put(off::SPEED, &kmh(self.drivetrain.speed));
        put(off::ENGINE_RPM, &self.drivetrain.engine_rpm.to_le_bytes());
        put(off::CRUISE_CONTROL_SPEED, &kmh(self.drivetrain.cruise_control_speed));
        put(off::SPEED_LIMIT, &kmh(self.drivetrain.speed_limit));
        put(off::FUEL, &self.fuel.level.to_le_bytes());
        put(off::FUEL_CAPACITY, &self.fuel.capacity.to_le_bytes());
        put(off::ROUTE_DISTANCE, &self.job.route_distance.to_le_bytes());
        put(off::ROUTE_TIME, &self.job.route_time.to_le_bytes());
        put(off::WEAR_ENGINE, &self.wear.engine.to_le_bytes());
        put(off::WEAR_TRANSMISSION, &self.wear.transmission.to_le_bytes());
        put(off::WEAR_CABIN, &self.wear.cabin.to_le_bytes());
        put(off::WEAR_CHASSIS, &self.wear.chassis.to_le_bytes());
        put(off::WEAR_WHEELS, &self.wear.wheels.to_le_bytes());
        put(off::CARGO_DAMAGE, &self.wear.cargo.to_le_bytes());
        put(off::ODOMETER, &self.odometer.to_le_bytes());
        put(off::PARK_BRAKE, &[self.switches.park_brake as u8]);
        put(off::ELECTRIC_ENABLED, &[self.switches.electric_enabled as u8]);
        put(off::ENGINE_ENABLED, &[self.switches.engine_enabled as u8]);
        put(off::FUEL_WARNING, &[self.fuel.warning as u8]);
        put(off::ON_JOB, &[self.job.on_job as u8]);
        put(off::JOB_FINISHED, &[self.job.finished as u8]);
        put(off::JOB_DELIVERED, &[self.job.delivered as u8]);
        put(off::FINED, &[self.fine.fined as u8]);
        put(off::COORDINATE_X, &self.position.x.to_le_bytes());
        put(off::COORDINATE_Y, &self.position.y.to_le_bytes());
        put(off::COORDINATE_Z, &self.position.z.to_le_bytes());
        put(off::ROTATION_HEADING, &self.rotation.heading.to_le_bytes());
        put(off::ROTATION_PITCH, &self.rotation.pitch.to_le_bytes());
        put(off::ROTATION_ROLL, &self.rotation.roll.to_le_bytes());
        put(off::JOB_INCOME, &self.job.income.to_le_bytes());
        put(off::FINE_AMOUNT, &self.fine.amount.to_le_bytes());

        for (offset, value) in [
            (off::TRUCK_BRAND, &self.brand),
            (off::TRUCK_NAME, &self.name),
            (off::CARGO, &self.job.cargo),
            (off::CITY_SRC, &self.job.city_src),
            (off::CITY_DST, &self.job.city_dst),
            (off::COMP_SRC, &self.job.comp_src),
            (off::COMP_DST, &self.job.comp_dst),
        ] {
            let bytes = value.as_bytes();
            put(offset, &bytes[..bytes.len().min(off::STRING_LEN - 1)]);
        }

        buf
    }
}

pub(crate) fn unix_now() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs_f64()).unwrap_or_default()
}
