use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("pass cancelled")]
pub struct Cancelled;

/// Shared handle for steering a running pass from another thread.
///
/// The executor sleeps through [`PassControl::sleep`] and polls
/// [`PassControl::checkpoint`], so a cancel takes effect immediately, a
/// pause freezes the remaining sleep, and the time scale shortens
/// (or stretches) host-side pacing.
#[derive(Debug, Clone)]
pub struct PassControl {
    inner: Arc<(Mutex<ControlState>, Condvar)>,
}

#[derive(Debug)]
struct ControlState {
    cancelled: bool,
    paused: bool,
    time_scale: f64,
}

impl Default for PassControl {
    fn default() -> Self {
        Self::new()
    }
}

impl PassControl {
    pub fn new() -> Self {
        Self::with_time_scale(1.0)
    }

    /// A scale of 10 plays a pass ten times faster than real time.
    pub fn with_time_scale(time_scale: f64) -> Self {
        Self {
            inner: Arc::new((
                Mutex::new(ControlState {
                    cancelled: false,
                    paused: false,
                    time_scale: sanitize_scale(time_scale),
                }),
                Condvar::new(),
            )),
        }
    }

    pub fn cancel(&self) {
        self.update(|state| state.cancelled = true);
    }

    pub fn pause(&self) {
        self.update(|state| state.paused = true);
    }

    pub fn resume(&self) {
        self.update(|state| state.paused = false);
    }

    pub fn set_time_scale(&self, time_scale: f64) {
        self.update(|state| state.time_scale = sanitize_scale(time_scale));
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.0.lock().unwrap().cancelled
    }

    pub fn is_paused(&self) -> bool {
        self.inner.0.lock().unwrap().paused
    }

    pub fn time_scale(&self) -> f64 {
        self.inner.0.lock().unwrap().time_scale
    }

    /// Blocks while paused. Fails once the pass has been cancelled.
    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        let (lock, condvar) = &*self.inner;
        let mut state = lock.lock().unwrap();
        loop {
            if state.cancelled {
                return Err(Cancelled);
            }
            if !state.paused {
                return Ok(());
            }
            state = condvar.wait(state).unwrap();
        }
    }

    /// Sleeps for `duration` of pass time. Time spent paused does not count.
    pub fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        let (lock, condvar) = &*self.inner;
        let mut remaining = duration;
        let mut state = lock.lock().unwrap();

        loop {
            if state.cancelled {
                return Err(Cancelled);
            }
            if state.paused {
                state = condvar.wait(state).unwrap();
                continue;
            }
            if remaining.is_zero() {
                return Ok(());
            }

            let scale = state.time_scale;
            let started = Instant::now();
            let (guard, _) = condvar
                .wait_timeout(state, remaining.div_f64(scale))
                .unwrap();
            state = guard;
            remaining = remaining.saturating_sub(started.elapsed().mul_f64(scale));
        }
    }

    fn update(&self, change: impl FnOnce(&mut ControlState)) {
        let (lock, condvar) = &*self.inner;
        change(&mut lock.lock().unwrap());
        condvar.notify_all();
    }
}

fn sanitize_scale(time_scale: f64) -> f64 {
    if time_scale.is_finite() && time_scale > 0.0 {
        time_scale
    } else {
        log::warn!("Ignoring invalid time scale {}, using 1.0", time_scale);
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_zero_sleep_returns_immediately() {
        let control = PassControl::new();
        let started = Instant::now();
        control.sleep(Duration::ZERO).unwrap();
        assert!(started.elapsed() < Duration::from_millis(50));
    }

    #[test]
    fn test_sleep_honours_time_scale() {
        let control = PassControl::with_time_scale(20.0);
        let started = Instant::now();
        control.sleep(Duration::from_secs(2)).unwrap();
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(90), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(1), "{elapsed:?}");
    }

    #[test]
    fn test_cancel_wakes_sleeper() {
        let control = PassControl::new();
        let remote = control.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            remote.cancel();
        });

        let started = Instant::now();
        assert_eq!(control.sleep(Duration::from_secs(30)), Err(Cancelled));
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(control.checkpoint(), Err(Cancelled));
        canceller.join().unwrap();
    }

    #[test]
    fn test_pause_holds_checkpoint_until_resume() {
        let control = PassControl::new();
        control.pause();
        assert!(control.is_paused());

        let remote = control.clone();
        let resumer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            remote.resume();
        });

        let started = Instant::now();
        control.checkpoint().unwrap();
        assert!(started.elapsed() >= Duration::from_millis(90));
        resumer.join().unwrap();
    }

    #[test]
    fn test_invalid_time_scale_falls_back_to_real_time() {
        let control = PassControl::with_time_scale(0.0);
        assert_eq!(control.time_scale(), 1.0);
        control.set_time_scale(f64::NAN);
        assert_eq!(control.time_scale(), 1.0);
        control.set_time_scale(4.0);
        assert_eq!(control.time_scale(), 4.0);
    }
}
