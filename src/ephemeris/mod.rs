//! Local pass prediction from TLE files.
//!
//! Produces the start/peak/end waypoints a rotator needs, without asking a
//! remote service.

mod error;
mod ground_station;
mod pass_finder;
mod propagation;
mod tle_loader;
mod types;

pub use error::EphemerisError;
pub use ground_station::GroundStation;
pub use pass_finder::find_passes;
pub use propagation::{look_angles, LookAngles};
pub use tle_loader::{TleEntry, TleLoader};
pub use types::{PassPoint, PredictedPass, SatelliteInfo};
