use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("step must be a positive number of seconds, got {0}")]
    InvalidStep(i64),
    #[error("pass starts after its peak ({start} > {max})")]
    StartAfterMax { start: i64, max: i64 },
    #[error("pass peaks after it ends ({max} > {end})")]
    MaxAfterEnd { max: i64, end: i64 },
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },
    #[error("pass from {start} to {end} is too long to time in milliseconds")]
    SpanTooLong { start: i64, end: i64 },
    #[error("{field} elevation {value} is outside [-90, 90]")]
    ElevationOutOfRange { field: &'static str, value: f64 },
}
