use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pass::{SatellitePass, ValidationError, Waypoint};

#[derive(Debug, Clone, Serialize)]
pub struct SatelliteInfo {
    pub name: String,
    pub norad_id: u32,
    pub tle_source: String,
}

/// Where a satellite is seen from the station at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PassPoint {
    pub time: DateTime<Utc>,
    pub azimuth_deg: f64,
    pub elevation_deg: f64,
}

impl PassPoint {
    fn waypoint(&self) -> Waypoint {
        Waypoint {
            azimuth_deg: round2(self.azimuth_deg),
            elevation_deg: round2(self.elevation_deg),
            time: self.time.timestamp(),
        }
    }
}

/// A predicted pass: acquisition, closest approach and loss of signal.
#[derive(Debug, Clone, Serialize)]
pub struct PredictedPass {
    pub satellite: String,
    pub norad_id: u32,
    pub aos: PassPoint,
    pub tca: PassPoint,
    pub los: PassPoint,
    pub duration_seconds: i64,
}

impl PredictedPass {
    pub fn max_elevation_deg(&self) -> f64 {
        self.tca.elevation_deg
    }

    pub fn to_satellite_pass(&self) -> Result<SatellitePass, ValidationError> {
        SatellitePass::new(self.aos.waypoint(), self.tca.waypoint(), self.los.waypoint())
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
