//! The job queue and its manager loop.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::QueueConfig;
use crate::driver::{DriverStatus, QueueDriver};
use crate::error::QueueError;
use crate::node::JobNode;
use crate::status::{JobStatus, StatusSummary};

/// Run-time limits that controller threads may change while the queue runs.
#[derive(Debug, Clone, Copy, Default)]
struct Policy {
    max_duration: Option<Duration>,
    stop_time: Option<SystemTime>,
}

/// Drives a set of external jobs to completion through a [`QueueDriver`].
///
/// One thread calls [`run_jobs`](Self::run_jobs), which polls the driver
/// until every job is finished; other threads may add jobs, change the
/// stop-time and duration policies and read the counters concurrently.
///
/// ```text
/// Open ── add_job / submit_complete ──▶ run_jobs ──▶ Closed ── reset ──▶ Open
/// ```
pub struct JobQueue<D: QueueDriver> {
    driver: D,
    config: QueueConfig,
    jobs: Mutex<Vec<JobNode<D::Handle>>>,
    policy: RwLock<Policy>,
    run_lock: Mutex<()>,
    open: AtomicBool,
    running: AtomicBool,
    submit_complete: AtomicBool,
    pause: AtomicBool,
    user_exit: AtomicBool,
}

/// Clears the running flag and closes the queue when `run_jobs` returns.
struct RunGuard<'a> {
    running: &'a AtomicBool,
    open: &'a AtomicBool,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        self.open.store(false, Ordering::SeqCst);
    }
}

impl<D: QueueDriver> JobQueue<D> {
    /// Creates an open, empty queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::InvalidConfig`] if `config` does not validate.
    pub fn new(driver: D, config: QueueConfig) -> Result<Self, QueueError> {
        config.validate()?;
        Ok(Self {
            driver,
            config,
            jobs: Mutex::new(Vec::new()),
            policy: RwLock::new(Policy::default()),
            run_lock: Mutex::new(()),
            open: AtomicBool::new(true),
            running: AtomicBool::new(false),
            submit_complete: AtomicBool::new(false),
            pause: AtomicBool::new(false),
            user_exit: AtomicBool::new(false),
        })
    }

    /// The driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Adds a job in the waiting state and returns its index.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::QueueClosed`] after `run_jobs` has returned or
    /// once `user_exit` was requested.
    pub fn add_job(
        &self,
        name: impl Into<String>,
        executable: impl Into<PathBuf>,
        run_path: impl Into<PathBuf>,
        args: Vec<String>,
    ) -> Result<usize, QueueError> {
        if !self.is_open() || self.user_exit.load(Ordering::SeqCst) {
            return Err(QueueError::QueueClosed);
        }
        let mut jobs = self.jobs.lock();
        let index = jobs.len();
        let node = JobNode::new(index, name.into(), executable.into(), run_path.into(), args);
        debug!(index, job = %node.name, "job added");
        jobs.push(node);
        Ok(index)
    }

    /// Signals that no more jobs will be added; needed by `run_jobs(0)`.
    pub fn submit_complete(&self) {
        self.submit_complete.store(true, Ordering::SeqCst);
    }

    /// Number of jobs added.
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }

    /// Returns true if no job was added.
    pub fn is_empty(&self) -> bool {
        self.jobs.lock().is_empty()
    }

    /// Returns true while `run_jobs` is executing.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns true if the queue accepts jobs and a `run_jobs` call.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Stops or resumes submitting new jobs. Running jobs are unaffected.
    pub fn set_pause(&self, pause: bool) {
        self.pause.store(pause, Ordering::SeqCst);
    }

    /// Returns true if submission is paused.
    pub fn is_paused(&self) -> bool {
        self.pause.load(Ordering::SeqCst)
    }

    /// Kills every job and makes `run_jobs` return after one more poll.
    pub fn user_exit(&self) {
        info!("user exit requested");
        self.user_exit.store(true, Ordering::SeqCst);
    }

    /// Kills running jobs that have been running longer than `max`.
    /// `None` removes the limit.
    pub fn set_max_job_duration(&self, max: Option<Duration>) {
        self.policy.write().max_duration = max;
    }

    /// Current duration limit.
    pub fn max_job_duration(&self) -> Option<Duration> {
        self.policy.read().max_duration
    }

    /// Kills jobs still running at `stop_time`. `None` removes the limit.
    pub fn set_job_stop_time(&self, stop_time: Option<SystemTime>) {
        self.policy.write().stop_time = stop_time;
    }

    /// Current stop time.
    pub fn job_stop_time(&self) -> Option<SystemTime> {
        self.policy.read().stop_time
    }

    /// Sets the stop time to `now + auto_stop_factor × mean run time` of the
    /// successful jobs and returns it. Does nothing if no job has succeeded.
    pub fn set_auto_job_stop_time(&self) -> Option<SystemTime> {
        let mut run_times: Vec<f64> = self
            .jobs
            .lock()
            .iter()
            .filter_map(|job| job.run_time())
            .map(|d| d.as_secs_f64())
            .collect();
        if run_times.is_empty() {
            return None;
        }
        run_times.sort_by(f64::total_cmp);
        let mean = ert_stats::mean(&run_times);
        let allowance = Duration::from_secs_f64(mean * self.config.auto_stop_factor());
        let stop_time = SystemTime::now() + allowance;
        info!(
            successful = run_times.len(),
            mean_secs = mean,
            median_secs = ert_stats::median(&run_times),
            allowance_secs = allowance.as_secs_f64(),
            "auto stop time set"
        );
        self.set_job_stop_time(Some(stop_time));
        Some(stop_time)
    }

    /// Counts of jobs per state.
    pub fn status_summary(&self) -> StatusSummary {
        StatusSummary::from_statuses(self.jobs.lock().iter().map(|job| job.status))
    }

    /// Jobs that finished successfully.
    pub fn num_complete(&self) -> usize {
        self.count(JobStatus::Success)
    }

    /// Jobs that failed after their last attempt.
    pub fn num_failed(&self) -> usize {
        self.count(JobStatus::Failed)
    }

    /// Jobs killed by a policy or the user.
    pub fn num_killed(&self) -> usize {
        self.count(JobStatus::Killed)
    }

    /// Jobs the driver reports as running.
    pub fn num_running(&self) -> usize {
        self.count(JobStatus::Running)
    }

    /// Jobs handed to the driver but not yet running.
    pub fn num_pending(&self) -> usize {
        self.count(JobStatus::Submitted)
    }

    /// Jobs waiting to be submitted.
    pub fn num_waiting(&self) -> usize {
        self.count(JobStatus::NotActive)
    }

    fn count(&self, status: JobStatus) -> usize {
        self.jobs.lock().iter().filter(|job| job.status == status).count()
    }

    fn with_job<T>(
        &self,
        index: usize,
        f: impl FnOnce(&JobNode<D::Handle>) -> T,
    ) -> Result<T, QueueError> {
        let jobs = self.jobs.lock();
        jobs.get(index).map(f).ok_or(QueueError::UnknownJob {
            index,
            len: jobs.len(),
        })
    }

    fn with_job_mut<T>(
        &self,
        index: usize,
        f: impl FnOnce(&mut JobNode<D::Handle>) -> Result<T, QueueError>,
    ) -> Result<T, QueueError> {
        let mut jobs = self.jobs.lock();
        let len = jobs.len();
        match jobs.get_mut(index) {
            Some(job) => f(job),
            None => Err(QueueError::UnknownJob { index, len }),
        }
    }

    /// Status of job `index`.
    pub fn job_status(&self, index: usize) -> Result<JobStatus, QueueError> {
        self.with_job(index, |job| job.status)
    }

    /// Name of job `index`.
    pub fn job_name(&self, index: usize) -> Result<String, QueueError> {
        self.with_job(index, |job| job.name.clone())
    }

    /// Number of submit attempts of job `index`.
    pub fn submit_attempts(&self, index: usize) -> Result<usize, QueueError> {
        self.with_job(index, |job| job.submit_attempts)
    }

    /// Time of the latest submission.
    pub fn submit_time(&self, index: usize) -> Result<Option<SystemTime>, QueueError> {
        self.with_job(index, |job| job.submit_time)
    }

    /// Time the latest attempt was seen running.
    pub fn sim_start(&self, index: usize) -> Result<Option<SystemTime>, QueueError> {
        self.with_job(index, |job| job.sim_start)
    }

    /// Time the job reached a terminal state.
    pub fn sim_end(&self, index: usize) -> Result<Option<SystemTime>, QueueError> {
        self.with_job(index, |job| job.sim_end)
    }

    /// Working directory of job `index`.
    pub fn run_path(&self, index: usize) -> Result<PathBuf, QueueError> {
        self.with_job(index, |job| job.run_path().to_path_buf())
    }

    /// Why the latest attempt failed, if known.
    pub fn error_reason(&self, index: usize) -> Result<Option<String>, QueueError> {
        self.with_job(index, |job| job.error_reason.clone())
    }

    /// Kills job `index` immediately.
    ///
    /// Returns `false` if the job had already finished.
    pub fn kill_job(&self, index: usize) -> Result<bool, QueueError> {
        self.with_job_mut(index, |job| {
            if job.status.is_terminal() {
                return Ok(false);
            }
            if let Some(handle) = job.handle.as_mut() {
                self.driver.kill(handle);
            }
            job.finish(JobStatus::Killed);
            warn!(index, job = %job.name, "job killed");
            Ok(true)
        })
    }

    /// Puts a successful or failed job back in the waiting state with a
    /// fresh attempt budget.
    pub fn external_restart(&self, index: usize) -> Result<(), QueueError> {
        self.with_job_mut(index, |job| match job.status {
            JobStatus::Success | JobStatus::Failed => {
                job.restart();
                info!(index, job = %job.name, "job restarted");
                Ok(())
            }
            other => Err(QueueError::InvalidTransition {
                index,
                status: other.name(),
                action: "restart",
            }),
        })
    }

    /// Marks a successful job as failed after the fact; it is then handled
    /// like any failed attempt (resubmitted while attempts remain).
    pub fn external_fail(&self, index: usize) -> Result<(), QueueError> {
        self.with_job_mut(index, |job| match job.status {
            JobStatus::Success => {
                job.status = JobStatus::Exit;
                job.error_reason = Some("failed by external request".to_string());
                info!(index, job = %job.name, "job marked failed");
                Ok(())
            }
            other => Err(QueueError::InvalidTransition {
                index,
                status: other.name(),
                action: "fail",
            }),
        })
    }

    /// Clears all jobs, flags and policies and reopens the queue.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Running`] while `run_jobs` executes.
    pub fn reset(&self) -> Result<(), QueueError> {
        let _run = self.run_lock.try_lock().ok_or(QueueError::Running)?;
        self.jobs.lock().clear();
        *self.policy.write() = Policy::default();
        self.submit_complete.store(false, Ordering::SeqCst);
        self.pause.store(false, Ordering::SeqCst);
        self.user_exit.store(false, Ordering::SeqCst);
        self.open.store(true, Ordering::SeqCst);
        debug!("queue reset");
        Ok(())
    }

    /// Runs the manager loop until the jobs are finished.
    ///
    /// With `num_total > 0` the loop ends once that many jobs are finished and
    /// no added job is still unfinished; with `num_total == 0` it ends when every
    /// added job is finished and [`submit_complete`](Self::submit_complete)
    /// was called. The queue is closed on return.
    ///
    /// # Errors
    ///
    /// | Variant | Trigger |
    /// |---------|---------|
    /// | [`QueueError::AlreadyRunning`] | another thread is inside `run_jobs` |
    /// | [`QueueError::QueueClosed`] | the queue was not reset after a previous run |
    /// | [`QueueError::Driver`] | the driver failed to submit a job |
    pub fn run_jobs(&self, num_total: usize) -> Result<(), QueueError> {
        let _run = self.run_lock.try_lock().ok_or(QueueError::AlreadyRunning)?;
        if !self.is_open() {
            return Err(QueueError::QueueClosed);
        }
        self.running.store(true, Ordering::SeqCst);
        let _guard = RunGuard {
            running: &self.running,
            open: &self.open,
        };
        info!(
            driver = self.driver.name(),
            num_total,
            jobs = self.len(),
            "queue manager started"
        );

        loop {
            let user_exit = self.user_exit.load(Ordering::SeqCst);
            let finished = self.poll(num_total, user_exit)?;
            if finished || user_exit {
                break;
            }
            thread::sleep(self.config.poll_interval());
        }

        let summary = self.status_summary();
        info!(%summary, "queue manager finished");
        Ok(())
    }

    /// One pass of the manager loop. Returns true when the run is complete.
    fn poll(&self, num_total: usize, user_exit: bool) -> Result<bool, QueueError> {
        let policy = *self.policy.read();
        let now = Instant::now();
        let wall_now = SystemTime::now();
        let stop_passed = policy.stop_time.is_some_and(|t| wall_now >= t);
        let mut jobs = self.jobs.lock();

        if user_exit {
            for job in jobs.iter_mut() {
                // A finished job keeps its result if the OK file is already there.
                if job.status == JobStatus::Done {
                    self.resolve_done(job, now);
                }
                if !job.status.is_terminal() {
                    job.status = JobStatus::UserExit;
                }
            }
        }

        for job in jobs.iter_mut() {
            match job.status {
                JobStatus::Running => {
                    let overtime = match (policy.max_duration, job.elapsed(now)) {
                        (Some(max), Some(elapsed)) => elapsed > max,
                        _ => false,
                    };
                    if overtime || stop_passed {
                        debug!(index = job.index, overtime, stop_passed, "job expired");
                        job.status = JobStatus::UserExit;
                    }
                }
                JobStatus::NotActive if stop_passed => job.status = JobStatus::UserExit,
                _ => {}
            }
        }

        for job in jobs.iter_mut().filter(|j| j.status.is_active()) {
            let Some(handle) = job.handle.as_mut() else {
                continue;
            };
            match self.driver.status(handle) {
                DriverStatus::Pending => {}
                DriverStatus::Running => job.mark_running(),
                DriverStatus::Done => {
                    job.mark_running();
                    job.status = JobStatus::Done;
                }
                DriverStatus::Exit => {
                    job.mark_running();
                    job.status = JobStatus::Exit;
                }
            }
        }

        for job in jobs.iter_mut() {
            if job.status == JobStatus::Done {
                self.resolve_done(job, now);
            }
            match job.status {
                JobStatus::Exit => self.resolve_exit(job),
                JobStatus::UserExit => self.resolve_user_exit(job),
                _ => {}
            }
        }

        let summary = StatusSummary::from_statuses(jobs.iter().map(|j| j.status));
        let finished = summary.finished();
        let all_finished = finished == jobs.len();
        let complete = if num_total > 0 {
            finished >= num_total && all_finished
        } else {
            all_finished && self.submit_complete.load(Ordering::SeqCst)
        };
        if complete || user_exit {
            return Ok(complete);
        }

        if !stop_passed && !self.is_paused() {
            self.submit_waiting(&mut jobs, summary.active())?;
        }
        Ok(false)
    }

    fn submit_waiting(
        &self,
        jobs: &mut [JobNode<D::Handle>],
        active: usize,
    ) -> Result<(), QueueError> {
        let max_running = self.driver.max_running();
        let capacity = if max_running == 0 {
            usize::MAX
        } else {
            max_running.saturating_sub(active)
        };
        let budget = capacity.min(self.config.max_submit_per_poll());

        for job in jobs
            .iter_mut()
            .filter(|j| j.status == JobStatus::NotActive)
            .take(budget)
        {
            let handle = self.driver.submit(&job.spec())?;
            job.mark_submitted(handle);
            debug!(
                index = job.index,
                job = %job.name,
                attempt = job.submit_attempts,
                "job submitted"
            );
        }
        Ok(())
    }

    fn resolve_done(&self, job: &mut JobNode<D::Handle>, now: Instant) {
        let exit_file = sentinel(job.run_path(), self.config.exit_file());
        if exit_file.exists() {
            let reason = fs::read_to_string(&exit_file)
                .ok()
                .and_then(|text| text.lines().next().map(|l| l.trim().to_string()))
                .filter(|l| !l.is_empty())
                .unwrap_or_else(|| format!("{} file found", self.config.exit_file()));
            job.error_reason = Some(reason);
            job.status = JobStatus::Exit;
            return;
        }
        if sentinel(job.run_path(), self.config.ok_file()).exists() {
            job.finish(JobStatus::Success);
            debug!(index = job.index, job = %job.name, "job succeeded");
            return;
        }
        let waited = job.waiting_for_ok(now);
        if waited >= self.config.max_ok_wait() {
            job.error_reason = Some(format!(
                "no {} file after {:.1}s",
                self.config.ok_file(),
                waited.as_secs_f64()
            ));
            job.status = JobStatus::Exit;
        }
    }

    fn resolve_exit(&self, job: &mut JobNode<D::Handle>) {
        if job.submit_attempts < self.config.max_submit() {
            warn!(
                index = job.index,
                job = %job.name,
                attempt = job.submit_attempts,
                reason = job.error_reason.as_deref().unwrap_or("exit"),
                "job failed, resubmitting"
            );
            job.requeue();
        } else {
            warn!(
                index = job.index,
                job = %job.name,
                attempts = job.submit_attempts,
                "job failed"
            );
            job.finish(JobStatus::Failed);
        }
    }

    fn resolve_user_exit(&self, job: &mut JobNode<D::Handle>) {
        if let Some(handle) = job.handle.as_mut() {
            self.driver.kill(handle);
        }
        warn!(index = job.index, job = %job.name, "job killed");
        job.finish(JobStatus::Killed);
    }
}

fn sentinel(run_path: &Path, name: &str) -> PathBuf {
    run_path.join(name)
}
