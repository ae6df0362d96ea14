/// Bound the magnitude of `value` to `[min, max]`, keeping its sign
///
/// Zero is treated as positive, so `clamp_magnitude(0.0, 5.0, 10.0)` is `5.0`.
/// This keeps a turn loop output above the motors' stall threshold.
pub fn clamp_magnitude(value: f64, min: f64, max: f64) -> f64 {
    let sign = if value < 0.0 { -1.0 } else { 1.0 };

    if value.abs() < min {
        min * sign
    } else if value.abs() > max {
        max * sign
    } else {
        value
    }
}
