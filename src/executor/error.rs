use std::time::Duration;

use thiserror::Error;

use super::control::Cancelled;
use crate::link::LinkError;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Link(#[from] LinkError),
    #[error("link is not open")]
    LinkClosed,
    #[error("controller not ready after {}", humantime::format_duration(*.0))]
    ReadyTimeout(Duration),
    #[error("pass cancelled")]
    Cancelled,
}

impl From<Cancelled> for ExecutorError {
    fn from(_: Cancelled) -> Self {
        ExecutorError::Cancelled
    }
}
