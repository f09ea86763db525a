//! Per-job bookkeeping owned by the queue.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use crate::driver::JobSpec;
use crate::status::JobStatus;

/// One job in the queue, together with the driver handle of its current
/// attempt.
#[derive(Debug)]
pub(crate) struct JobNode<H> {
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) executable: PathBuf,
    pub(crate) run_path: PathBuf,
    pub(crate) args: Vec<String>,
    pub(crate) status: JobStatus,
    pub(crate) submit_attempts: usize,
    pub(crate) submit_time: Option<SystemTime>,
    pub(crate) sim_start: Option<SystemTime>,
    pub(crate) sim_end: Option<SystemTime>,
    pub(crate) error_reason: Option<String>,
    pub(crate) handle: Option<H>,
    started: Option<Instant>,
    run_time: Option<Duration>,
    done_since: Option<Instant>,
}

impl<H> JobNode<H> {
    pub(crate) fn new(
        index: usize,
        name: String,
        executable: PathBuf,
        run_path: PathBuf,
        args: Vec<String>,
    ) -> Self {
        Self {
            index,
            name,
            executable,
            run_path,
            args,
            status: JobStatus::NotActive,
            submit_attempts: 0,
            submit_time: None,
            sim_start: None,
            sim_end: None,
            error_reason: None,
            handle: None,
            started: None,
            run_time: None,
            done_since: None,
        }
    }

    pub(crate) fn spec(&self) -> JobSpec<'_> {
        JobSpec {
            name: &self.name,
            executable: &self.executable,
            run_path: &self.run_path,
            args: &self.args,
        }
    }

    pub(crate) fn run_path(&self) -> &Path {
        &self.run_path
    }

    pub(crate) fn mark_submitted(&mut self, handle: H) {
        self.handle = Some(handle);
        self.status = JobStatus::Submitted;
        self.submit_attempts += 1;
        self.submit_time = Some(SystemTime::now());
        self.sim_start = None;
        self.sim_end = None;
        self.started = None;
        self.done_since = None;
    }

    pub(crate) fn mark_running(&mut self) {
        if self.started.is_none() {
            self.started = Some(Instant::now());
            self.sim_start = Some(SystemTime::now());
        }
        self.status = JobStatus::Running;
    }

    /// Time since the job was seen running.
    pub(crate) fn elapsed(&self, now: Instant) -> Option<Duration> {
        self.started.map(|t| now.saturating_duration_since(t))
    }

    /// Time spent in `Done` waiting for the OK file; starts the clock on
    /// first call.
    pub(crate) fn waiting_for_ok(&mut self, now: Instant) -> Duration {
        let since = *self.done_since.get_or_insert(now);
        now.saturating_duration_since(since)
    }

    /// Moves to a terminal state and drops the driver handle.
    pub(crate) fn finish(&mut self, status: JobStatus) {
        let now = Instant::now();
        if status == JobStatus::Success {
            self.run_time = self.elapsed(now);
        }
        if self.started.is_some() || self.submit_time.is_some() {
            self.sim_end = Some(SystemTime::now());
        }
        self.status = status;
        self.handle = None;
    }

    /// Run time of a successful job.
    pub(crate) fn run_time(&self) -> Option<Duration> {
        match self.status {
            JobStatus::Success => self.run_time,
            _ => None,
        }
    }

    /// Puts the job back in the waiting state, keeping the attempt count.
    pub(crate) fn requeue(&mut self) {
        self.status = JobStatus::NotActive;
        self.handle = None;
        self.started = None;
        self.done_since = None;
    }

    /// Puts a finished job back in the waiting state with a fresh attempt count.
    pub(crate) fn restart(&mut self) {
        self.requeue();
        self.submit_attempts = 0;
        self.run_time = None;
        self.error_reason = None;
        self.sim_end = None;
    }
}
