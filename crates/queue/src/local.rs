//! Driver that runs jobs as child processes of this process.

use std::process::{Child, Command, Stdio};

use tracing::{debug, warn};

use crate::driver::{DriverStatus, JobSpec, QueueDriver};
use crate::error::DriverError;

/// Runs each job as `executable args…` with the run path as working directory.
#[derive(Debug, Clone, Default)]
pub struct LocalDriver {
    max_running: usize,
}

impl LocalDriver {
    /// Creates a driver without a concurrency limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits the number of concurrently running processes (0 = unlimited).
    pub fn with_max_running(mut self, max_running: usize) -> Self {
        self.max_running = max_running;
        self
    }
}

/// A spawned child process.
#[derive(Debug)]
pub struct LocalJob {
    child: Child,
}

impl LocalJob {
    /// Operating-system process id.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }
}

impl QueueDriver for LocalDriver {
    type Handle = LocalJob;

    fn submit(&self, job: &JobSpec<'_>) -> Result<LocalJob, DriverError> {
        let child = Command::new(job.executable)
            .args(job.args)
            .current_dir(job.run_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| DriverError::Submit {
                job: job.name.to_string(),
                reason: e.to_string(),
            })?;
        debug!(job = job.name, pid = child.id(), "spawned local job");
        Ok(LocalJob { child })
    }

    fn status(&self, handle: &mut LocalJob) -> DriverStatus {
        match handle.child.try_wait() {
            Ok(None) => DriverStatus::Running,
            Ok(Some(status)) if status.success() => DriverStatus::Done,
            Ok(Some(_)) => DriverStatus::Exit,
            Err(e) => {
                warn!(pid = handle.pid(), error = %e, "failed to poll local job");
                DriverStatus::Exit
            }
        }
    }

    fn kill(&self, handle: &mut LocalJob) {
        if let Err(e) = handle.child.kill() {
            debug!(pid = handle.pid(), error = %e, "kill on finished job");
        }
        // Reap the child.
        let _ = handle.child.wait();
    }

    fn max_running(&self) -> usize {
        self.max_running
    }

    fn name(&self) -> &str {
        "LOCAL"
    }
}
