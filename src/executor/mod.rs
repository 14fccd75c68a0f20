mod control;
mod error;
mod pass_executor;

pub use control::{Cancelled, PassControl};
pub use error::ExecutorError;
pub use pass_executor::{
    ExecutionReport, ExecutorSettings, PassExecutor, SegmentPhase, SegmentProgress,
};
