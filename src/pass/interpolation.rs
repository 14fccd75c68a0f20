use std::f64::consts::{PI, TAU};

use super::error::ValidationError;
use super::types::{SatellitePass, TrajectoryPoint};

/// Expands the three pass waypoints into a dense trajectory sampled every
/// `step_seconds`, from the pass start up to and including the pass end.
///
/// Azimuth is interpolated on the unwrapped circle, so a pass crossing
/// north moves through 0° instead of swinging back through 180°.
/// Elevation is interpolated as-is. Both are piecewise linear between the
/// bracketing waypoints and rounded to `rounding_digits` decimals.
pub fn interpolate(
    pass: &SatellitePass,
    step_seconds: i64,
    rounding_digits: u32,
) -> Result<Vec<TrajectoryPoint>, ValidationError> {
    if step_seconds <= 0 {
        return Err(ValidationError::InvalidStep(step_seconds));
    }
    pass.validate()?;

    let key_times = [
        pass.start_time as f64,
        pass.max_time as f64,
        pass.end_time as f64,
    ];
    let key_azimuths = unwrap_radians(&[
        pass.start_az.to_radians(),
        pass.max_az.to_radians(),
        pass.end_az.to_radians(),
    ]);
    let key_elevations = [pass.start_el, pass.max_el, pass.end_el];

    let times = sample_times(pass.start_time, pass.end_time, step_seconds);
    let mut points = Vec::with_capacity(times.len());
    let mut previous = pass.start_time;

    for time in times {
        let t = time as f64;
        let azimuth = piecewise_linear(t, &key_times, &key_azimuths);
        let elevation = piecewise_linear(t, &key_times, &key_elevations);

        let azimuth_deg = normalize_degrees(round_to(
            normalize_degrees(azimuth.to_degrees()),
            rounding_digits,
        ));

        points.push(TrajectoryPoint {
            azimuth_deg,
            elevation_deg: round_to(elevation, rounding_digits) + 0.0,
            delta_millis: ((time - previous) * 1000) as u64,
        });
        previous = time;
    }

    log::debug!(
        "Interpolated pass {}..{} into {} points (step {}s)",
        pass.start_time,
        pass.end_time,
        points.len(),
        step_seconds
    );

    Ok(points)
}

/// Removes 2π jumps between consecutive angles: whenever two neighbours
/// differ by π or more, every following value is shifted by the multiple
/// of 2π that brings the step back into [-π, π].
pub fn unwrap_radians(angles: &[f64]) -> Vec<f64> {
    let mut unwrapped = Vec::with_capacity(angles.len());
    let Some(&first) = angles.first() else {
        return unwrapped;
    };
    unwrapped.push(first);

    let mut correction = 0.0;
    for pair in angles.windows(2) {
        let step = pair[1] - pair[0];
        if step.abs() >= PI {
            let mut wrapped = (step + PI).rem_euclid(TAU) - PI;
            if wrapped == -PI && step > 0.0 {
                wrapped = PI;
            }
            correction += wrapped - step;
        }
        unwrapped.push(pair[1] + correction);
    }

    unwrapped
}

/// `start, start + step, ...` while before `end`, then `end` itself.
fn sample_times(start: i64, end: i64, step: i64) -> Vec<i64> {
    let mut cursor = start;
    let mut times = Vec::new();

    while cursor < end {
        times.push(cursor);
        match cursor.checked_add(step) {
            Some(next) => cursor = next,
            None => break,
        }
    }
    times.push(end);

    times
}

fn piecewise_linear(t: f64, keys: &[f64; 3], values: &[f64]) -> f64 {
    if t <= keys[0] {
        return values[0];
    }
    if t >= keys[2] {
        return values[2];
    }

    let (i, j) = if t <= keys[1] { (0, 1) } else { (1, 2) };
    let fraction = (t - keys[i]) / (keys[j] - keys[i]);
    values[i] + (values[j] - values[i]) * fraction
}

fn normalize_degrees(value: f64) -> f64 {
    value.rem_euclid(360.0) + 0.0
}

// Ties go to the even neighbour. Past f64 precision there is nothing left
// to round, so huge digit counts leave the value alone.
fn round_to(value: f64, digits: u32) -> f64 {
    let factor = 10f64.powi(digits.min(i32::MAX as u32) as i32);
    let scaled = value * factor;
    if !factor.is_finite() || !scaled.is_finite() {
        return value;
    }
    scaled.round_ties_even() / factor
}
