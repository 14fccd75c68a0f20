// WGS-84
const EQUATORIAL_RADIUS_KM: f64 = 6378.137;
const ECCENTRICITY_SQUARED: f64 = 0.00669437999014;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GroundStation {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

impl GroundStation {
    /// Parses `"<lat>, <lon>"` in degrees.
    pub fn from_coordinates(coordinates: &str, altitude_m: Option<f64>) -> Option<Self> {
        let parts: Vec<_> = coordinates.split(',').map(|s| s.trim()).collect();
        if parts.len() != 2 {
            return None;
        }
        let latitude_deg: f64 = parts[0].parse().ok()?;
        let longitude_deg: f64 = parts[1].parse().ok()?;
        if !(-90.0..=90.0).contains(&latitude_deg) || !(-180.0..=360.0).contains(&longitude_deg) {
            return None;
        }
        Some(Self {
            latitude_deg,
            longitude_deg,
            altitude_m: altitude_m.unwrap_or(0.0),
        })
    }

    pub fn lat_rad(&self) -> f64 {
        self.latitude_deg.to_radians()
    }

    pub fn lon_rad(&self) -> f64 {
        self.longitude_deg.to_radians()
    }

    pub fn position_ecef_km(&self) -> [f64; 3] {
        let (sin_lat, cos_lat) = self.lat_rad().sin_cos();
        let (sin_lon, cos_lon) = self.lon_rad().sin_cos();
        let n = EQUATORIAL_RADIUS_KM / (1.0 - ECCENTRICITY_SQUARED * sin_lat * sin_lat).sqrt();
        let alt_km = self.altitude_m / 1000.0;
        [
            (n + alt_km) * cos_lat * cos_lon,
            (n + alt_km) * cos_lat * sin_lon,
            (n * (1.0 - ECCENTRICITY_SQUARED) + alt_km) * sin_lat,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_coordinates() {
        let station = GroundStation::from_coordinates(" 52.21, 4.42 ", Some(12.0)).unwrap();
        assert_eq!(station.latitude_deg, 52.21);
        assert_eq!(station.longitude_deg, 4.42);
        assert_eq!(station.altitude_m, 12.0);

        assert!(GroundStation::from_coordinates("52.21", None).is_none());
        assert!(GroundStation::from_coordinates("north, east", None).is_none());
        assert!(GroundStation::from_coordinates("95, 0", None).is_none());
    }

    #[test]
    fn test_ecef_on_equator_and_pole() {
        let equator = GroundStation::default().position_ecef_km();
        assert_relative_eq!(equator[0], EQUATORIAL_RADIUS_KM, epsilon = 1e-9);
        assert_relative_eq!(equator[1], 0.0, epsilon = 1e-9);
        assert_relative_eq!(equator[2], 0.0, epsilon = 1e-9);

        let pole = GroundStation {
            latitude_deg: 90.0,
            ..GroundStation::default()
        }
        .position_ecef_km();
        // Polar radius of the WGS-84 ellipsoid.
        assert_relative_eq!(pole[2], 6356.752, epsilon = 1e-3);
    }
}
