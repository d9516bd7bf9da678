//! Numeric Derivations
//!
//! Wind vector decomposition, saturation vapour pressure and rain bucketing.

/// Re-base a compass bearing (0 = North, clockwise) so that 0 = East and
/// angles grow counter-clockwise. Result is in `[0, 360)`.
pub fn rotate_to_x_axis(angle_deg: f64) -> f64 {
    (90.0 + 360.0 - angle_deg).rem_euclid(360.0)
}

/// East-west component of a wind vector.
///
/// The rotated angle is passed to `cos` as-is, without a degree to radian
/// conversion. The reference statistics were fitted with this convention.
pub fn x_component(direction_deg: f64, magnitude: f64) -> f64 {
    magnitude * rotate_to_x_axis(direction_deg).cos()
}

/// North-south component of a wind vector (same angle convention as
/// [`x_component`]).
pub fn y_component(direction_deg: f64, magnitude: f64) -> f64 {
    magnitude * rotate_to_x_axis(direction_deg).sin()
}

/// Unit direction components `(north_south, east_west)` of a bearing in degrees
pub fn directional_components(direction_deg: f64) -> (f64, f64) {
    let radians = direction_deg.to_radians();
    (radians.sin(), radians.cos())
}

/// Saturation water vapour pressure (Magnus form) for a temperature in °C
pub fn water_vapour_pressure(temp_c: Option<f64>) -> Option<f64> {
    temp_c.map(|t| 610.17 * ((17.2694 * t) / (t + 238.3)).exp())
}

/// 1.0 when the value is strictly positive
pub fn indicator(value: f64) -> f64 {
    if value > 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Split a non-negative quantity into `(small, big)` indicators around a
/// threshold: small for `0 < v <= threshold`, big for `v > threshold`.
pub fn bucket(value: f64, threshold: f64) -> (f64, f64) {
    let small = if value > 0.0 && value <= threshold { 1.0 } else { 0.0 };
    let big = if value > threshold { 1.0 } else { 0.0 };
    (small, big)
}
