use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::error::JobError;
use super::session::{run_track, TrackOptions};
use super::types::{JobId, JobState, JobStatus, TrackOutcome, TrackRequest};
use crate::executor::{ExecutorSettings, PassControl};
use crate::link::{Connector, LinkSettings};
use crate::pass::interpolate;

const WAIT_POLL: Duration = Duration::from_millis(20);

/// Finished jobs kept for `status` and `jobs` before the oldest are dropped.
pub const DEFAULT_JOB_HISTORY: usize = 64;

#[derive(Debug)]
struct JobRecord {
    status: JobStatus,
    control: PassControl,
    join: Option<JoinHandle<()>>,
}

#[derive(Debug)]
struct Shared {
    jobs: HashMap<JobId, JobRecord>,
    active: Option<JobId>,
    history: usize,
}

impl Shared {
    // Drops the earliest finished jobs past the history limit.
    fn evict_finished(&mut self) {
        let mut finished: Vec<_> = self
            .jobs
            .values()
            .filter(|record| record.status.state.is_finished())
            .map(|record| {
                (
                    record.status.finished_at,
                    record.status.submitted_at,
                    record.status.id,
                )
            })
            .collect();
        if finished.len() <= self.history {
            return;
        }

        finished.sort();
        let excess = finished.len() - self.history;
        for (_, _, id) in finished.into_iter().take(excess) {
            self.jobs.remove(&id);
            log::debug!("Job {} dropped from history", id);
        }
    }
}

/// Runs track jobs against one rotator, one at a time.
///
/// Each job gets its own link session on a blocking worker thread; the
/// registry keeps the record and a [`PassControl`] to steer it.
pub struct JobRegistry<C> {
    connector: C,
    link: LinkSettings,
    executor: ExecutorSettings,
    shared: Arc<StdMutex<Shared>>,
}

impl<C: Connector + Clone + 'static> JobRegistry<C> {
    pub fn new(connector: C, link: LinkSettings, executor: ExecutorSettings) -> Self {
        Self {
            connector,
            link,
            executor,
            shared: Arc::new(StdMutex::new(Shared {
                jobs: HashMap::new(),
                active: None,
                history: DEFAULT_JOB_HISTORY,
            })),
        }
    }

    /// Keeps at most `limit` finished jobs. The running job is always kept.
    pub fn with_history(self, limit: usize) -> Self {
        {
            let mut locked = self.shared.lock().unwrap();
            locked.history = limit;
            locked.evict_finished();
        }
        self
    }

    /// Interpolates the pass and starts tracking it. Must be called from
    /// within a Tokio runtime.
    pub fn submit(&self, request: TrackRequest) -> Result<JobId, JobError> {
        let points = interpolate(&request.pass, request.step_seconds, request.rounding_digits)?;

        let mut locked = self.shared.lock().unwrap();
        if let Some(active) = locked.active {
            return Err(JobError::AlreadyRunning(active));
        }

        let id = Uuid::new_v4();
        let point_count = points.len();
        let control = PassControl::with_time_scale(self.executor.time_scale);
        let options = TrackOptions {
            compass_calibration: request.compass_calibration,
            unstow_first: request.unstow_first,
            stow_after: request.stow_after,
        };

        let shared = self.shared.clone();
        let connector = self.connector.clone();
        let link = self.link.clone();
        let executor = self.executor.clone();
        let worker_control = control.clone();

        let join = tokio::task::spawn_blocking(move || {
            set_state(&shared, id, |status| {
                status.state = JobState::Running {
                    segment: 0,
                    total: point_count.saturating_sub(1),
                };
                status.started_at = Some(Utc::now());
            });
            log::info!("Job {} running, {} points", id, point_count);

            let outcome = run_track(
                connector,
                link,
                executor,
                &points,
                options,
                worker_control,
                |progress| {
                    set_state(&shared, id, |status| {
                        status.state = JobState::Running {
                            segment: progress.segment,
                            total: progress.total,
                        };
                    })
                },
            );

            finish(&shared, id, outcome);
        });

        locked.active = Some(id);
        locked.jobs.insert(
            id,
            JobRecord {
                status: JobStatus {
                    id,
                    state: JobState::Pending,
                    points: point_count,
                    paused: false,
                    submitted_at: Utc::now(),
                    started_at: None,
                    finished_at: None,
                },
                control,
                join: Some(join),
            },
        );
        log::info!("Job {} submitted", id);

        Ok(id)
    }

    pub fn status(&self, id: JobId) -> Option<JobStatus> {
        let locked = self.shared.lock().unwrap();
        locked.jobs.get(&id).map(|record| record.status.clone())
    }

    /// All jobs, oldest first.
    pub fn jobs(&self) -> Vec<JobStatus> {
        let locked = self.shared.lock().unwrap();
        let mut jobs: Vec<_> = locked.jobs.values().map(|r| r.status.clone()).collect();
        jobs.sort_by_key(|status| status.submitted_at);
        jobs
    }

    pub fn active(&self) -> Option<JobId> {
        self.shared.lock().unwrap().active
    }

    pub fn cancel(&self, id: JobId) -> Result<(), JobError> {
        self.steer(id, |record| {
            record.control.cancel();
            log::info!("Job {} cancel requested", id);
        })
    }

    pub fn pause(&self, id: JobId) -> Result<(), JobError> {
        self.steer(id, |record| {
            record.control.pause();
            record.status.paused = true;
            log::info!("Job {} paused", id);
        })
    }

    pub fn resume(&self, id: JobId) -> Result<(), JobError> {
        self.steer(id, |record| {
            record.control.resume();
            record.status.paused = false;
            log::info!("Job {} resumed", id);
        })
    }

    /// Waits for the job to finish and returns its final status.
    pub async fn wait(&self, id: JobId) -> Result<JobStatus, JobError> {
        let join = {
            let mut locked = self.shared.lock().unwrap();
            let record = locked.jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
            record.join.take()
        };

        if let Some(join) = join {
            if let Err(e) = join.await {
                log::error!("Job {} worker died: {}", id, e);
                finish(
                    &self.shared,
                    id,
                    TrackOutcome::ProtocolFailure {
                        reason: format!("worker died: {}", e),
                    },
                );
            }
        }

        // Another caller may hold the handle; fall back to polling.
        loop {
            let status = self.status(id).ok_or(JobError::NotFound(id))?;
            if status.state.is_finished() {
                return Ok(status);
            }
            tokio::time::sleep(WAIT_POLL).await;
        }
    }

    fn steer(&self, id: JobId, action: impl FnOnce(&mut JobRecord)) -> Result<(), JobError> {
        let mut locked = self.shared.lock().unwrap();
        let record = locked.jobs.get_mut(&id).ok_or(JobError::NotFound(id))?;
        if record.status.state.is_finished() {
            log::debug!("Job {} already finished, ignoring", id);
            return Ok(());
        }
        action(record);
        Ok(())
    }
}

fn set_state(shared: &StdMutex<Shared>, id: JobId, update: impl FnOnce(&mut JobStatus)) {
    let mut locked = shared.lock().unwrap();
    if let Some(record) = locked.jobs.get_mut(&id) {
        update(&mut record.status);
    }
}

fn finish(shared: &StdMutex<Shared>, id: JobId, outcome: TrackOutcome) {
    let mut locked = shared.lock().unwrap();
    if locked.active == Some(id) {
        locked.active = None;
    }
    if let Some(record) = locked.jobs.get_mut(&id) {
        log::info!("Job {} finished: {:?}", id, outcome);
        record.status.state = JobState::finished(outcome);
        record.status.paused = false;
        record.status.finished_at = Some(Utc::now());
    }
    locked.evict_finished();
}
