use serde::{Deserialize, Serialize};

use super::error::ValidationError;

/// One of the three pass waypoints: where the satellite is and when.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Waypoint {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub time: i64,
}

/// Start, peak and end of a single satellite pass, as handed over by an
/// ephemeris provider. Times are integer epoch seconds.
///
/// Field names follow the snake_case convention of our YAML files, but the
/// camelCase spelling used by pass-prediction services (`startAz`,
/// `startUTC`, ...) is accepted as well.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct SatellitePass {
    #[serde(alias = "startAz")]
    pub start_az: f64,
    #[serde(alias = "startEl")]
    pub start_el: f64,
    #[serde(alias = "startUTC")]
    pub start_time: i64,
    #[serde(alias = "maxAz")]
    pub max_az: f64,
    #[serde(alias = "maxEl")]
    pub max_el: f64,
    #[serde(alias = "maxUTC")]
    pub max_time: i64,
    #[serde(alias = "endAz")]
    pub end_az: f64,
    #[serde(alias = "endEl")]
    pub end_el: f64,
    #[serde(alias = "endUTC")]
    pub end_time: i64,
}

impl SatellitePass {
    pub fn new(start: Waypoint, max: Waypoint, end: Waypoint) -> Result<Self, ValidationError> {
        let pass = Self {
            start_az: start.azimuth_deg,
            start_el: start.elevation_deg,
            start_time: start.time,
            max_az: max.azimuth_deg,
            max_el: max.elevation_deg,
            max_time: max.time,
            end_az: end.azimuth_deg,
            end_el: end.elevation_deg,
            end_time: end.time,
        };
        pass.validate()?;
        Ok(pass)
    }

    /// Checks time ordering and angle sanity. Deserialized passes bypass
    /// [`SatellitePass::new`], so the interpolator calls this again.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let angles = [
            ("start azimuth", self.start_az),
            ("start elevation", self.start_el),
            ("peak azimuth", self.max_az),
            ("peak elevation", self.max_el),
            ("end azimuth", self.end_az),
            ("end elevation", self.end_el),
        ];
        for (field, value) in angles {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite { field });
            }
        }

        for (field, value) in [
            ("start", self.start_el),
            ("peak", self.max_el),
            ("end", self.end_el),
        ] {
            if !(-90.0..=90.0).contains(&value) {
                return Err(ValidationError::ElevationOutOfRange { field, value });
            }
        }

        if self.start_time > self.max_time {
            return Err(ValidationError::StartAfterMax {
                start: self.start_time,
                max: self.max_time,
            });
        }
        if self.max_time > self.end_time {
            return Err(ValidationError::MaxAfterEnd {
                max: self.max_time,
                end: self.end_time,
            });
        }
        // Trajectory deltas are carried in milliseconds.
        let span_millis = self
            .end_time
            .checked_sub(self.start_time)
            .and_then(|seconds| seconds.checked_mul(1000));
        if span_millis.is_none() {
            return Err(ValidationError::SpanTooLong {
                start: self.start_time,
                end: self.end_time,
            });
        }
        Ok(())
    }

    pub fn start(&self) -> Waypoint {
        Waypoint {
            azimuth_deg: self.start_az,
            elevation_deg: self.start_el,
            time: self.start_time,
        }
    }

    pub fn max(&self) -> Waypoint {
        Waypoint {
            azimuth_deg: self.max_az,
            elevation_deg: self.max_el,
            time: self.max_time,
        }
    }

    pub fn end(&self) -> Waypoint {
        Waypoint {
            azimuth_deg: self.end_az,
            elevation_deg: self.end_el,
            time: self.end_time,
        }
    }

    pub fn waypoints(&self) -> [Waypoint; 3] {
        [self.start(), self.max(), self.end()]
    }

    pub fn duration_seconds(&self) -> i64 {
        self.end_time.saturating_sub(self.start_time)
    }
}

/// A sampled pointing command. `delta_millis` is the time since the
/// previous point of the same trajectory (0 for the first point), so
/// absolute times are only recoverable by summing from the pass start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajectoryPoint {
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
    pub delta_millis: u64,
}
