//! Geospatial index of transmitter locations.
//!
//! Every location carries a transmission range computed once from its name.
//! [`GeoIndex::nearest`] finds the closest location whose range covers a
//! position, and [`signal_strength`] maps the distance to a reception quality
//! in `[0, 1]`. Only the horizontal `(x, z)` plane is used; `y` is altitude.

mod index;
mod location;
mod signal;

pub use index::{GeoIndex, Nearest};
pub use location::{Bounds, Location, LocationId, LocationRecord, range_for};
pub use signal::{distance_2d, signal_strength};
