//! Backend abstraction for starting, polling and killing jobs.

use std::path::Path;

use crate::error::DriverError;

/// What the driver needs to start one job.
#[derive(Debug, Clone, Copy)]
pub struct JobSpec<'a> {
    /// Job name, for logs and backend bookkeeping.
    pub name: &'a str,
    /// Program to run.
    pub executable: &'a Path,
    /// Working directory of the job; also holds the OK and EXIT files.
    pub run_path: &'a Path,
    /// Command-line arguments.
    pub args: &'a [String],
}

/// Backend view of a submitted job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverStatus {
    /// Accepted but not started.
    Pending,
    /// Running.
    Running,
    /// The process ended normally.
    Done,
    /// The process ended with an error.
    Exit,
}

/// A job-execution backend.
///
/// Each submitted job is represented by a `Handle` owned by the queue until
/// the job reaches a terminal state.
pub trait QueueDriver: Send + Sync {
    /// Backend data for one submitted job.
    type Handle: Send;

    /// Starts a job.
    fn submit(&self, job: &JobSpec<'_>) -> Result<Self::Handle, DriverError>;

    /// Polls a job.
    fn status(&self, handle: &mut Self::Handle) -> DriverStatus;

    /// Requests that a job be stopped.
    fn kill(&self, handle: &mut Self::Handle);

    /// Maximum number of concurrently active jobs; 0 means unlimited.
    fn max_running(&self) -> usize {
        0
    }

    /// Short backend name for logs.
    fn name(&self) -> &str;
}
