use chrono::{DateTime, Duration, Utc};

use super::error::EphemerisError;
use super::ground_station::GroundStation;
use super::propagation::look_angles;
use super::tle_loader::TleEntry;
use super::types::{PassPoint, PredictedPass};

const COARSE_STEP_SECONDS: i64 = 60;
const FINE_STEP_SECONDS: i64 = 1;
const HORIZON_ELEVATION: f64 = 0.0;

/// Finds every pass of `satellite` over `station` between `start` and `end`
/// whose peak reaches `min_elevation`.
///
/// The window is scanned once a minute; horizon crossings are then bisected
/// and the peak searched second by second around the best coarse sample. A
/// pass still in progress at either edge of the window is cut at that edge.
pub fn find_passes(
    station: &GroundStation,
    satellite: &TleEntry,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    min_elevation: f64,
) -> Result<Vec<PredictedPass>, EphemerisError> {
    let coarse = Duration::seconds(COARSE_STEP_SECONDS);
    let sample = |time| sample_at(station, satellite, time);

    let mut passes = Vec::new();
    let mut rising: Option<(PassPoint, PassPoint)> = None;
    let mut cursor = start;

    while cursor <= end {
        let point = sample(cursor)?;
        let visible = point.elevation_deg >= HORIZON_ELEVATION;

        rising = match (rising, visible) {
            (None, true) => {
                let aos = if cursor == start {
                    point
                } else {
                    refine_crossing(&sample, cursor - coarse, cursor, true)?
                };
                Some((aos, point))
            }
            (Some((aos, peak)), true) => {
                let peak = if point.elevation_deg > peak.elevation_deg {
                    point
                } else {
                    peak
                };
                Some((aos, peak))
            }
            (Some((aos, peak)), false) => {
                let los = refine_crossing(&sample, cursor - coarse, cursor, false)?;
                passes.extend(complete_pass(&sample, satellite, aos, peak, los, min_elevation)?);
                None
            }
            (None, false) => None,
        };

        cursor += coarse;
    }

    if let Some((aos, peak)) = rising {
        let los = sample(end)?;
        passes.extend(complete_pass(&sample, satellite, aos, peak, los, min_elevation)?);
    }

    log::debug!(
        "{}: {} passes above {}° between {} and {}",
        satellite.info.name,
        passes.len(),
        min_elevation,
        start,
        end
    );
    Ok(passes)
}

fn sample_at(
    station: &GroundStation,
    satellite: &TleEntry,
    time: DateTime<Utc>,
) -> Result<PassPoint, EphemerisError> {
    let angles = look_angles(station, &satellite.elements, &satellite.constants, time)?;
    Ok(PassPoint {
        time,
        azimuth_deg: angles.azimuth_deg,
        elevation_deg: angles.elevation_deg,
    })
}

fn complete_pass<F>(
    sample: &F,
    satellite: &TleEntry,
    aos: PassPoint,
    coarse_peak: PassPoint,
    los: PassPoint,
    min_elevation: f64,
) -> Result<Option<PredictedPass>, EphemerisError>
where
    F: Fn(DateTime<Utc>) -> Result<PassPoint, EphemerisError>,
{
    let coarse = Duration::seconds(COARSE_STEP_SECONDS);
    let from = (coarse_peak.time - coarse).max(aos.time);
    let to = (coarse_peak.time + coarse).min(los.time);
    let seed = [aos, los]
        .into_iter()
        .fold(coarse_peak, |best, p| if p.elevation_deg > best.elevation_deg { p } else { best });
    let tca = refine_peak(sample, from, to, seed)?;

    if tca.elevation_deg < min_elevation {
        return Ok(None);
    }

    Ok(Some(PredictedPass {
        satellite: satellite.info.name.clone(),
        norad_id: satellite.info.norad_id,
        aos,
        tca,
        los,
        duration_seconds: (los.time - aos.time).num_seconds(),
    }))
}

/// Bisects a horizon crossing between a sample on each side. The returned
/// point is always the one above the horizon.
fn refine_crossing<F>(
    sample: &F,
    before: DateTime<Utc>,
    after: DateTime<Utc>,
    rising: bool,
) -> Result<PassPoint, EphemerisError>
where
    F: Fn(DateTime<Utc>) -> Result<PassPoint, EphemerisError>,
{
    let (mut below, mut above) = if rising {
        (before, after)
    } else {
        (after, before)
    };

    while (below - above).num_seconds().abs() > FINE_STEP_SECONDS {
        let mid = above + (below - above) / 2;
        if sample(mid)?.elevation_deg >= HORIZON_ELEVATION {
            above = mid;
        } else {
            below = mid;
        }
    }

    sample(above)
}

fn refine_peak<F>(
    sample: &F,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    mut best: PassPoint,
) -> Result<PassPoint, EphemerisError>
where
    F: Fn(DateTime<Utc>) -> Result<PassPoint, EphemerisError>,
{
    let fine = Duration::seconds(FINE_STEP_SECONDS);
    let mut cursor = from;
    while cursor <= to {
        let point = sample(cursor)?;
        if point.elevation_deg > best.elevation_deg {
            best = point;
        }
        cursor += fine;
    }
    Ok(best)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::tle_loader::tests::iss_entry;
    use chrono::TimeZone;

    fn madrid() -> GroundStation {
        GroundStation {
            latitude_deg: 40.42,
            longitude_deg: -3.70,
            altitude_m: 650.0,
        }
    }

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 7, 12, 21, 0, 0).unwrap()
    }

    #[test]
    fn test_finds_ordered_passes() {
        let iss = iss_entry();
        let start = epoch();
        let end = start + Duration::hours(24);

        let passes = find_passes(&madrid(), &iss, start, end, 0.0).unwrap();
        assert!(!passes.is_empty());

        for pass in &passes {
            assert_eq!(pass.norad_id, 25544);
            assert!(pass.aos.time <= pass.tca.time);
            assert!(pass.tca.time <= pass.los.time);
            assert!(pass.aos.time >= start && pass.los.time <= end);
            assert!(pass.tca.elevation_deg >= pass.aos.elevation_deg);
            assert!(pass.tca.elevation_deg >= pass.los.elevation_deg);
            assert!(pass.max_elevation_deg() <= 90.0);
            // Low-orbit passes never last longer than a quarter hour.
            assert!(pass.duration_seconds > 0 && pass.duration_seconds < 1200);

            let rotator_pass = pass.to_satellite_pass().unwrap();
            assert_eq!(rotator_pass.start_time, pass.aos.time.timestamp());
            assert_eq!(rotator_pass.end_time, pass.los.time.timestamp());
        }

        for pair in passes.windows(2) {
            assert!(pair[0].los.time < pair[1].aos.time);
        }
    }

    #[test]
    fn test_min_elevation_filters_low_passes() {
        let iss = iss_entry();
        let start = epoch();
        let end = start + Duration::hours(24);

        let all = find_passes(&madrid(), &iss, start, end, 0.0).unwrap();
        let high = find_passes(&madrid(), &iss, start, end, 30.0).unwrap();

        assert!(high.len() <= all.len());
        assert!(high.iter().all(|p| p.max_elevation_deg() >= 30.0));
    }

    #[test]
    fn test_empty_window() {
        let iss = iss_entry();
        let start = epoch();
        let passes = find_passes(&madrid(), &iss, start, start - Duration::minutes(1), 0.0).unwrap();
        assert!(passes.is_empty());
    }
}
