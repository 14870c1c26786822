//! Structured error types for tickprof
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Nothing here is ever produced on the sampling path: capture failures are
//! counted, not returned.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("Profiler is already running for {0} seconds")]
    AlreadyRunning(u64),

    #[error("Sampling interval must be positive, got {0} ns")]
    InvalidInterval(i64),

    #[error("Profiler is not active")]
    NotActive,

    #[error("Profiler is running; stop it before reporting")]
    StillRunning,

    #[error("Could not open {}: {source}", path.display())]
    OutputOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to arm interrupt source: {0}")]
    InterruptSource(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
