use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::control::PassControl;
use super::error::ExecutorError;
use crate::config::deserialize_duration;
use crate::link::{Connector, MotorLink, READY};
use crate::pass::TrajectoryPoint;

const DEFAULT_MOTION_MARGIN: Duration = Duration::from_secs(2);
const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ExecutorSettings {
    /// Time left to the controller at the end of each segment to finish
    /// its own motion before the next `ready` is expected.
    #[serde(
        default = "default_motion_margin",
        deserialize_with = "deserialize_duration"
    )]
    pub motion_margin: Duration,
    /// Longest wait for `ready` before the pass is abandoned.
    #[serde(
        default = "default_ready_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub ready_timeout: Duration,
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            motion_margin: DEFAULT_MOTION_MARGIN,
            ready_timeout: DEFAULT_READY_TIMEOUT,
            time_scale: default_time_scale(),
        }
    }
}

fn default_motion_margin() -> Duration {
    DEFAULT_MOTION_MARGIN
}

fn default_ready_timeout() -> Duration {
    DEFAULT_READY_TIMEOUT
}

fn default_time_scale() -> f64 {
    1.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SegmentPhase {
    AwaitingReady,
    Sending,
    Sleeping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentProgress {
    /// Zero-based index of the segment being played.
    pub segment: usize,
    pub total: usize,
    pub phase: SegmentPhase,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionReport {
    pub segments_sent: usize,
    /// Pass time spent pacing between segments, before time scaling.
    pub pacing_millis: u64,
}

/// Plays a trajectory through a link, one `GOT` per pair of consecutive
/// points, each gated by the controller's `ready` and followed by a sleep
/// that lets the segment play out.
///
/// Borrowing the link mutably keeps a single executor per controller.
pub struct PassExecutor<'a, C: Connector> {
    link: &'a mut MotorLink<C>,
    settings: ExecutorSettings,
    control: PassControl,
}

impl<'a, C: Connector> PassExecutor<'a, C> {
    pub fn new(link: &'a mut MotorLink<C>, settings: ExecutorSettings, control: PassControl) -> Self {
        Self {
            link,
            settings,
            control,
        }
    }

    pub fn run(&mut self, points: &[TrajectoryPoint]) -> Result<ExecutionReport, ExecutorError> {
        self.run_observed(points, |_| {})
    }

    /// Like [`PassExecutor::run`], reporting every phase change to `observer`.
    pub fn run_observed(
        &mut self,
        points: &[TrajectoryPoint],
        mut observer: impl FnMut(SegmentProgress),
    ) -> Result<ExecutionReport, ExecutorError> {
        let total = points.len().saturating_sub(1);
        let mut report = ExecutionReport::default();

        if total == 0 {
            log::info!("Trajectory has {} point(s), nothing to send", points.len());
            return Ok(report);
        }
        if !self.link.is_open() {
            return Err(ExecutorError::LinkClosed);
        }

        for (segment, pair) in points.windows(2).enumerate() {
            let (current, next) = (&pair[0], &pair[1]);
            let progress = |phase| SegmentProgress {
                segment,
                total,
                phase,
            };

            observer(progress(SegmentPhase::AwaitingReady));
            self.await_ready()?;

            observer(progress(SegmentPhase::Sending));
            let altitude = altitude_arg(current.elevation_deg);
            let azimuth = azimuth_arg(current.azimuth_deg);
            self.link.send_move(altitude, azimuth, next.delta_millis)?;
            report.segments_sent += 1;
            log::info!(
                "Segment {}/{}: el {} az {} over {} ms",
                segment + 1,
                total,
                altitude,
                azimuth,
                next.delta_millis
            );

            observer(progress(SegmentPhase::Sleeping));
            let interval = Duration::from_millis(next.delta_millis);
            let pause = interval.saturating_sub(self.settings.motion_margin);
            self.control.sleep(pause)?;
            report.pacing_millis += pause.as_millis() as u64;
        }

        Ok(report)
    }

    /// Polls the link until the controller reports `ready`. Only time spent
    /// reading counts against the watchdog, not time spent paused.
    fn await_ready(&mut self) -> Result<(), ExecutorError> {
        let mut waited = Duration::ZERO;

        loop {
            self.control.checkpoint()?;

            let started = Instant::now();
            let line = self.link.receive_line()?;
            waited += started.elapsed();

            match line.as_deref() {
                Some(READY) => return Ok(()),
                Some(other) => log::debug!("Waiting for ready, ignoring {:?}", other),
                None => {}
            }

            if waited >= self.settings.ready_timeout {
                log::warn!(
                    "Controller silent for {}, abandoning pass",
                    humantime::format_duration(self.settings.ready_timeout)
                );
                return Err(ExecutorError::ReadyTimeout(self.settings.ready_timeout));
            }
        }
    }
}

fn altitude_arg(elevation_deg: f64) -> i32 {
    elevation_deg.round() as i32
}

fn azimuth_arg(azimuth_deg: f64) -> i32 {
    (azimuth_deg.round() as i32).rem_euclid(360)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{Command, LinkError, LinkSettings, SimulatedRotator};
    use std::thread;

    fn point(azimuth_deg: f64, elevation_deg: f64, delta_millis: u64) -> TrajectoryPoint {
        TrajectoryPoint {
            azimuth_deg,
            elevation_deg,
            delta_millis,
        }
    }

    fn ready_link(rotator: &SimulatedRotator) -> MotorLink<SimulatedRotator> {
        let mut link = MotorLink::new(rotator.clone(), LinkSettings::new("sim"));
        link.connect().unwrap();
        link.ping().unwrap();
        link
    }

    fn settings() -> ExecutorSettings {
        ExecutorSettings {
            ready_timeout: Duration::from_millis(200),
            ..ExecutorSettings::default()
        }
    }

    #[test]
    fn test_single_segment_pacing() {
        let rotator = SimulatedRotator::new();
        let mut link = ready_link(&rotator);
        let points = [point(307.0, 13.0, 0), point(300.0, 20.0, 20_000)];

        let started = Instant::now();
        let report = PassExecutor::new(&mut link, settings(), PassControl::with_time_scale(100.0))
            .run(&points)
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(
            rotator.moves(),
            vec![Command::Move {
                altitude: 13,
                azimuth: 307,
                duration_millis: 20_000
            }]
        );
        assert_eq!(report.segments_sent, 1);
        assert_eq!(report.pacing_millis, 18_000);
        assert!(elapsed >= Duration::from_millis(150), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(5), "{elapsed:?}");
    }

    #[test]
    fn test_real_time_pacing() {
        let rotator = SimulatedRotator::new();
        let mut link = ready_link(&rotator);
        let points = [point(0.0, 0.0, 0), point(1.0, 1.0, 3_000)];

        let started = Instant::now();
        PassExecutor::new(&mut link, settings(), PassControl::new())
            .run(&points)
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(950));
    }

    #[test]
    fn test_each_segment_sends_its_first_point() {
        let rotator = SimulatedRotator::new();
        let mut link = ready_link(&rotator);
        let points = [
            point(359.6, 10.4, 0),
            point(5.0, 20.0, 1_000),
            point(10.0, 30.0, 500),
        ];

        let report = PassExecutor::new(&mut link, settings(), PassControl::new())
            .run(&points)
            .unwrap();

        assert_eq!(report.segments_sent, 2);
        // Segments shorter than the margin do not sleep at all.
        assert_eq!(report.pacing_millis, 0);
        assert_eq!(
            rotator.received(),
            vec!["PING", "GOT 10 0 1000", "GOT 20 5 500"]
        );
    }

    #[test]
    fn test_short_trajectories_send_nothing() {
        let rotator = SimulatedRotator::new();
        let mut link = ready_link(&rotator);

        for points in [vec![], vec![point(10.0, 10.0, 0)]] {
            let report = PassExecutor::new(&mut link, settings(), PassControl::new())
                .run(&points)
                .unwrap();
            assert_eq!(report, ExecutionReport::default());
        }
        assert_eq!(rotator.received(), vec!["PING"]);
    }

    #[test]
    fn test_silent_controller_trips_watchdog() {
        let rotator = SimulatedRotator::new().without_ready();
        let mut link = ready_link(&rotator);
        let points = [point(0.0, 0.0, 0), point(1.0, 1.0, 1_000)];

        let err = PassExecutor::new(&mut link, settings(), PassControl::new())
            .run(&points)
            .unwrap_err();
        assert!(matches!(err, ExecutorError::ReadyTimeout(_)));
        assert!(rotator.moves().is_empty());
    }

    #[test]
    fn test_cancel_during_sleep_aborts_pass() {
        let rotator = SimulatedRotator::new();
        let mut link = ready_link(&rotator);
        let points = [
            point(0.0, 0.0, 0),
            point(1.0, 1.0, 60_000),
            point(2.0, 2.0, 60_000),
        ];
        let control = PassControl::new();
        let remote = control.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });

        let started = Instant::now();
        let err = PassExecutor::new(&mut link, settings(), control)
            .run(&points)
            .unwrap_err();
        canceller.join().unwrap();

        assert!(matches!(err, ExecutorError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(rotator.moves().len(), 1);
    }

    #[test]
    fn test_cancelled_before_start_sends_nothing() {
        let rotator = SimulatedRotator::new();
        let mut link = ready_link(&rotator);
        let control = PassControl::new();
        control.cancel();

        let err = PassExecutor::new(&mut link, settings(), control)
            .run(&[point(0.0, 0.0, 0), point(1.0, 1.0, 1_000)])
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Cancelled));
        assert!(rotator.moves().is_empty());
    }

    #[test]
    fn test_write_failure_aborts_remaining_segments() {
        let rotator = SimulatedRotator::new().failing_after(1);
        let mut link = ready_link(&rotator);
        let points = [point(0.0, 0.0, 0), point(1.0, 1.0, 1_000), point(2.0, 2.0, 1_000)];

        let err = PassExecutor::new(&mut link, settings(), PassControl::new())
            .run(&points)
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Link(LinkError::Transport(_))));
        assert_eq!(rotator.received(), vec!["PING"]);
    }

    #[test]
    fn test_closed_link_is_rejected() {
        let rotator = SimulatedRotator::new();
        let mut link = MotorLink::new(rotator, LinkSettings::new("sim"));

        let err = PassExecutor::new(&mut link, settings(), PassControl::new())
            .run(&[point(0.0, 0.0, 0), point(1.0, 1.0, 1_000)])
            .unwrap_err();
        assert!(matches!(err, ExecutorError::LinkClosed));
    }

    #[test]
    fn test_observer_sees_every_phase() {
        let rotator = SimulatedRotator::new();
        let mut link = ready_link(&rotator);
        let points = [point(0.0, 0.0, 0), point(1.0, 1.0, 500), point(2.0, 2.0, 500)];
        let mut seen = Vec::new();

        PassExecutor::new(&mut link, settings(), PassControl::new())
            .run_observed(&points, |progress| seen.push((progress.segment, progress.phase)))
            .unwrap();

        assert_eq!(
            seen,
            vec![
                (0, SegmentPhase::AwaitingReady),
                (0, SegmentPhase::Sending),
                (0, SegmentPhase::Sleeping),
                (1, SegmentPhase::AwaitingReady),
                (1, SegmentPhase::Sending),
                (1, SegmentPhase::Sleeping),
            ]
        );
    }

    #[test]
    fn test_pause_delays_next_segment() {
        let rotator = SimulatedRotator::new();
        let mut link = ready_link(&rotator);
        let control = PassControl::new();
        control.pause();
        let remote = control.clone();
        let resumer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(150));
            remote.resume();
        });

        let started = Instant::now();
        PassExecutor::new(&mut link, settings(), control)
            .run(&[point(0.0, 0.0, 0), point(1.0, 1.0, 500)])
            .unwrap();
        resumer.join().unwrap();

        assert!(started.elapsed() >= Duration::from_millis(140));
        assert_eq!(rotator.moves().len(), 1);
    }
}
