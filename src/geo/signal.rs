//! Distance and signal strength math

/// Euclidean distance on the horizontal (x, z) plane.
pub fn distance_2d(x1: f64, z1: f64, x2: f64, z2: f64) -> f64 {
    ((x1 - x2).powi(2) + (z1 - z2).powi(2)).sqrt()
}

/// Signal strength in `[0, 1]` at `distance` from a transmitter of `range`.
///
/// Piecewise-linear falloff over the normalized distance `d = distance / range`:
///
/// | d | strength |
/// |---|---|
/// | `< 0.2` | `1.0` |
/// | `< 0.5` | `0.9 - (d - 0.2) * 0.3` |
/// | `< 0.8` | `0.6 - (d - 0.5) * 0.5` |
/// | `< 1.0` | `max(0, 0.3 - (d - 0.8) * 1.5)` |
/// | `>= 1.0` | `0.0` |
pub fn signal_strength(distance: f64, range: f64) -> f64 {
    if distance.is_nan() || distance >= range {
        return 0.0;
    }

    let d = distance / range;
    if d < 0.2 {
        1.0
    } else if d < 0.5 {
        0.9 - (d - 0.2) * 0.3
    } else if d < 0.8 {
        0.6 - (d - 0.5) * 0.5
    } else {
        (0.3 - (d - 0.8) * 1.5).max(0.0)
    }
}
