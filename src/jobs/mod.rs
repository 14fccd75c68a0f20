mod error;
mod registry;
mod session;
mod types;

pub use error::JobError;
pub use registry::{JobRegistry, DEFAULT_JOB_HISTORY};
pub use session::{park, run_track, seek, ParkCommand, TrackOptions};
pub use types::{JobId, JobState, JobStatus, TrackOutcome, TrackRequest};
