mod error;
mod interpolation;
mod types;

pub use error::ValidationError;
pub use interpolation::{interpolate, unwrap_radians};
pub use types::{SatellitePass, TrajectoryPoint, Waypoint};
