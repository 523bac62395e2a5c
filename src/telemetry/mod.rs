//! Telemetry decoding.
//!
//! The SCS telemetry plugin exposes the simulation state as a fixed binary
//! layout in a shared memory file. This module maps that file and turns it
//! into typed [`TelemetrySnapshot`] values:
//!
//! - [`layout`] lists the byte offset of every field
//! - [`field`] reads little-endian scalars and bounded strings
//! - [`TelemetrySnapshot`] is the decoded, immutable value type
//! - [`TelemetryDecoder`] owns the read-only mapping
//!
//! ## Example
//!
//! ```rust,no_run
//! use roadcast::telemetry::TelemetryDecoder;
//!
//! let mut decoder = TelemetryDecoder::new("/dev/shm/SCS/SCSTelemetry");
//! decoder.connect()?;
//! if let Some(snapshot) = decoder.decode() {
//!     println!("{:.0} km/h at ({:.0}, {:.0})",
//!         snapshot.drivetrain.speed, snapshot.position.x, snapshot.position.z);
//! }
//! # Ok::<(), roadcast::TelemetryError>(())
//! ```

mod decoder;
pub mod field;
pub mod layout;
mod snapshot;

pub use decoder::TelemetryDecoder;
pub use snapshot::{
    Drivetrain, FineFields, Fuel, JobFields, Position, Rotation, Switches, TelemetrySnapshot, Wear,
};

pub(crate) use snapshot::unix_now;
