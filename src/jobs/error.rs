use thiserror::Error;

use super::types::JobId;
use crate::pass::ValidationError;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {0} is already driving the rotator")]
    AlreadyRunning(JobId),
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("invalid pass: {0}")]
    Validation(#[from] ValidationError),
}
