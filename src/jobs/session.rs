//! One rotator session per call: open the link, handshake, do the work,
//! close. These block the calling thread for the whole session.

use std::fmt;
use std::time::Duration;

use super::types::TrackOutcome;
use crate::executor::{
    ExecutionReport, ExecutorError, ExecutorSettings, PassControl, PassExecutor, SegmentProgress,
};
use crate::link::{Connector, LinkSettings, MotorLink};
use crate::pass::TrajectoryPoint;

/// Single-command sessions that leave the antenna where it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkCommand {
    Stow,
    Unstow,
    Calibrate(i32),
}

impl fmt::Display for ParkCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParkCommand::Stow => write!(f, "stow"),
            ParkCommand::Unstow => write!(f, "unstow"),
            ParkCommand::Calibrate(angle) => write!(f, "compass calibration to {}°", angle),
        }
    }
}

/// Options around the pass itself, sent in this order: `SAZ`, `UNSTOW`,
/// the trajectory, `STOW`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackOptions {
    pub compass_calibration: Option<i32>,
    pub unstow_first: bool,
    pub stow_after: bool,
}

pub fn run_track<C: Connector>(
    connector: C,
    link_settings: LinkSettings,
    executor_settings: ExecutorSettings,
    points: &[TrajectoryPoint],
    options: TrackOptions,
    control: PassControl,
    observer: impl FnMut(SegmentProgress),
) -> TrackOutcome {
    with_session(connector, link_settings, &control, |link| {
        if let Some(angle) = options.compass_calibration {
            link.send_compass_calibration(angle)?;
        }
        if options.unstow_first {
            link.send_unstow()?;
        }

        let report = PassExecutor::new(link, executor_settings, control.clone())
            .run_observed(points, observer)?;

        if options.stow_after {
            link.send_stow()?;
        }
        Ok(report)
    })
}

/// Points the antenna at one position, reaching it over `duration`.
pub fn seek<C: Connector>(
    connector: C,
    link_settings: LinkSettings,
    executor_settings: ExecutorSettings,
    azimuth_deg: f64,
    elevation_deg: f64,
    duration: Duration,
    control: PassControl,
) -> TrackOutcome {
    // A two-point trajectory is exactly one ready-gated GOT.
    let target = |delta_millis| TrajectoryPoint {
        azimuth_deg,
        elevation_deg,
        delta_millis,
    };
    let points = [target(0), target(duration.as_millis() as u64)];

    with_session(connector, link_settings, &control, |link| {
        PassExecutor::new(link, executor_settings, control.clone()).run(&points)
    })
}

pub fn park<C: Connector>(
    connector: C,
    link_settings: LinkSettings,
    command: ParkCommand,
) -> TrackOutcome {
    log::info!("Sending {}", command);
    with_session(connector, link_settings, &PassControl::new(), |link| {
        match command {
            ParkCommand::Stow => link.send_stow()?,
            ParkCommand::Unstow => link.send_unstow()?,
            ParkCommand::Calibrate(angle) => link.send_compass_calibration(angle)?,
        }
        Ok(ExecutionReport::default())
    })
}

fn with_session<C: Connector>(
    connector: C,
    link_settings: LinkSettings,
    control: &PassControl,
    work: impl FnOnce(&mut MotorLink<C>) -> Result<ExecutionReport, ExecutorError>,
) -> TrackOutcome {
    if control.is_cancelled() {
        return TrackOutcome::Cancelled;
    }

    let mut link = MotorLink::new(connector, link_settings);
    let result = link
        .connect()
        .and_then(|_| link.ping())
        .map_err(ExecutorError::from)
        .and_then(|_| work(&mut link));
    link.close();

    match result {
        Ok(report) => TrackOutcome::Completed(report),
        Err(err) => {
            log::warn!("Rotator session ended early: {}", err);
            TrackOutcome::from(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{Command, SimulatedRotator};

    fn settings() -> ExecutorSettings {
        ExecutorSettings {
            motion_margin: Duration::from_secs(2),
            ready_timeout: Duration::from_millis(200),
            time_scale: 1000.0,
        }
    }

    fn point(azimuth_deg: f64, elevation_deg: f64, delta_millis: u64) -> TrajectoryPoint {
        TrajectoryPoint {
            azimuth_deg,
            elevation_deg,
            delta_millis,
        }
    }

    #[test]
    fn test_track_wraps_pass_in_options() {
        let rotator = SimulatedRotator::new();
        let points = [point(307.0, 13.0, 0), point(300.0, 20.0, 5_000)];
        let options = TrackOptions {
            compass_calibration: Some(90),
            unstow_first: true,
            stow_after: true,
        };

        let outcome = run_track(
            rotator.clone(),
            LinkSettings::new("sim"),
            settings(),
            &points,
            options,
            PassControl::with_time_scale(1000.0),
            |_| {},
        );

        assert!(outcome.is_completed(), "{outcome:?}");
        assert_eq!(
            rotator.received(),
            vec!["PING", "SAZ 90", "UNSTOW", "GOT 13 307 5000", "STOW"]
        );
    }

    #[test]
    fn test_cancelled_before_connect() {
        let rotator = SimulatedRotator::new();
        let control = PassControl::new();
        control.cancel();

        let outcome = run_track(
            rotator.clone(),
            LinkSettings::new("sim"),
            settings(),
            &[],
            TrackOptions::default(),
            control,
            |_| {},
        );
        assert_eq!(outcome, TrackOutcome::Cancelled);
        assert!(rotator.received().is_empty());
    }

    #[test]
    fn test_handshake_outcomes() {
        let refused = park(
            SimulatedRotator::new().refusing_connections(),
            LinkSettings::new("sim"),
            ParkCommand::Stow,
        );
        assert!(matches!(refused, TrackOutcome::NoHardware { .. }));

        let silent = SimulatedRotator::new().with_ping_reply(None);
        let outcome = park(silent.clone(), LinkSettings::new("sim"), ParkCommand::Stow);
        assert!(matches!(outcome, TrackOutcome::NoHardware { .. }));
        assert_eq!(silent.received(), vec!["PING"]);

        let confused = SimulatedRotator::new().with_ping_reply(Some("HELLO"));
        let outcome = park(confused, LinkSettings::new("sim"), ParkCommand::Unstow);
        assert!(matches!(outcome, TrackOutcome::ProtocolFailure { .. }));
    }

    #[test]
    fn test_park_commands() {
        let rotator = SimulatedRotator::new();
        for command in [
            ParkCommand::Unstow,
            ParkCommand::Calibrate(-15),
            ParkCommand::Stow,
        ] {
            let outcome = park(rotator.clone(), LinkSettings::new("sim"), command);
            assert_eq!(outcome, TrackOutcome::Completed(ExecutionReport::default()));
        }
        assert_eq!(
            rotator.received(),
            vec!["PING", "UNSTOW", "PING", "SAZ -15", "PING", "STOW"]
        );
    }

    #[test]
    fn test_seek_points_antenna() {
        let rotator = SimulatedRotator::new();
        let outcome = seek(
            rotator.clone(),
            LinkSettings::new("sim"),
            settings(),
            370.4,
            45.0,
            Duration::from_secs(4),
            PassControl::with_time_scale(1000.0),
        );

        assert!(outcome.is_completed(), "{outcome:?}");
        assert_eq!(
            rotator.moves(),
            vec![Command::Move {
                altitude: 45,
                azimuth: 10,
                duration_millis: 4_000
            }]
        );
        assert_eq!(rotator.pointing(), Some((45, 10)));
    }

    #[test]
    fn test_lost_device_mid_pass() {
        // PING and the first GOT go through, the second GOT does not.
        let rotator = SimulatedRotator::new().failing_after(2);
        let points = [point(0.0, 0.0, 0), point(1.0, 1.0, 100), point(2.0, 2.0, 100)];

        let outcome = run_track(
            rotator.clone(),
            LinkSettings::new("sim"),
            settings(),
            &points,
            TrackOptions::default(),
            PassControl::with_time_scale(1000.0),
            |_| {},
        );
        assert!(matches!(outcome, TrackOutcome::ProtocolFailure { .. }));
        assert_eq!(rotator.moves().len(), 1);
    }
}
