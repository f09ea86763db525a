//! Background thread that runs a [`JobQueue`].

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::driver::QueueDriver;
use crate::error::QueueError;
use crate::queue::JobQueue;
use crate::status::JobStatus;

const WAIT_SLICE: Duration = Duration::from_millis(10);

/// Owns a shared [`JobQueue`] and the thread running its manager loop.
///
/// ```no_run
/// use ert_queue::{JobQueue, LocalDriver, QueueConfig, QueueManager};
/// use std::sync::Arc;
///
/// let queue = Arc::new(JobQueue::new(LocalDriver::new(), QueueConfig::new())?);
/// queue.add_job("real-0", "/bin/true", "/tmp", vec![])?;
///
/// let mut manager = QueueManager::new(Arc::clone(&queue));
/// manager.start(1)?;
/// manager.wait()?;
/// assert!(manager.job_success(0)?);
/// # Ok::<(), ert_queue::QueueError>(())
/// ```
pub struct QueueManager<D: QueueDriver + 'static> {
    queue: Arc<JobQueue<D>>,
    thread: Option<JoinHandle<Result<(), QueueError>>>,
}

impl<D: QueueDriver + 'static> QueueManager<D> {
    /// Wraps `queue`; nothing runs until [`start`](Self::start).
    pub fn new(queue: Arc<JobQueue<D>>) -> Self {
        Self {
            queue,
            thread: None,
        }
    }

    /// The managed queue.
    pub fn queue(&self) -> &Arc<JobQueue<D>> {
        &self.queue
    }

    /// Spawns the manager thread running `run_jobs(num_total)`.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::AlreadyRunning`] if this manager already has a
    /// live thread and [`QueueError::QueueClosed`] if the queue is closed.
    pub fn start(&mut self, num_total: usize) -> Result<(), QueueError> {
        if self.thread.as_ref().is_some_and(|t| !t.is_finished()) {
            return Err(QueueError::AlreadyRunning);
        }
        if !self.queue.is_open() {
            return Err(QueueError::QueueClosed);
        }
        let queue = Arc::clone(&self.queue);
        let handle = thread::Builder::new()
            .name("job-queue-manager".to_string())
            .spawn(move || queue.run_jobs(num_total))
            .map_err(|e| QueueError::ManagerSpawn(e.to_string()))?;
        debug!(num_total, "queue manager thread started");
        self.thread = Some(handle);
        Ok(())
    }

    /// Returns true while the manager thread is alive.
    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Waits up to `timeout` for the manager thread.
    ///
    /// Returns `Ok(true)` once the thread has ended (joining it) and
    /// `Ok(false)` on timeout.
    pub fn try_wait(&mut self, timeout: Duration) -> Result<bool, QueueError> {
        let deadline = Instant::now() + timeout;
        while self.is_running() {
            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            thread::sleep(WAIT_SLICE.min(deadline - now));
        }
        self.join()?;
        Ok(true)
    }

    /// Blocks until the manager thread ends and returns its result.
    pub fn wait(&mut self) -> Result<(), QueueError> {
        self.join()
    }

    fn join(&mut self) -> Result<(), QueueError> {
        match self.thread.take() {
            Some(handle) => handle.join().map_err(|_| QueueError::ManagerPanicked)?,
            None => Ok(()),
        }
    }

    /// Returns true if job `index` is finished.
    pub fn job_complete(&self, index: usize) -> Result<bool, QueueError> {
        Ok(self.queue.job_status(index)?.is_terminal())
    }

    /// Returns true if job `index` succeeded.
    pub fn job_success(&self, index: usize) -> Result<bool, QueueError> {
        Ok(self.queue.job_status(index)? == JobStatus::Success)
    }

    /// Returns true if job `index` failed or was killed.
    pub fn job_failed(&self, index: usize) -> Result<bool, QueueError> {
        Ok(matches!(
            self.queue.job_status(index)?,
            JobStatus::Failed | JobStatus::Killed
        ))
    }

    /// See [`JobQueue::num_complete`].
    pub fn num_complete(&self) -> usize {
        self.queue.num_complete()
    }

    /// See [`JobQueue::num_failed`].
    pub fn num_failed(&self) -> usize {
        self.queue.num_failed()
    }

    /// See [`JobQueue::num_killed`].
    pub fn num_killed(&self) -> usize {
        self.queue.num_killed()
    }

    /// See [`JobQueue::num_running`].
    pub fn num_running(&self) -> usize {
        self.queue.num_running()
    }

    /// See [`JobQueue::num_pending`].
    pub fn num_pending(&self) -> usize {
        self.queue.num_pending()
    }

    /// See [`JobQueue::num_waiting`].
    pub fn num_waiting(&self) -> usize {
        self.queue.num_waiting()
    }
}

impl<D: QueueDriver + 'static> Drop for QueueManager<D> {
    fn drop(&mut self) {
        if self.is_running() {
            self.queue.user_exit();
        }
        let _ = self.join();
    }
}
