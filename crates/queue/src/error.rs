//! Error types for the ert-queue crate.

/// Failure reported by a [`QueueDriver`](crate::QueueDriver).
#[derive(Debug, Clone, thiserror::Error)]
pub enum DriverError {
    /// Returned when the backend refuses or cannot start a job.
    #[error("failed to submit job '{job}': {reason}")]
    Submit {
        /// Job name.
        job: String,
        /// Backend message.
        reason: String,
    },

    /// Returned when the backend is not reachable at all.
    #[error("driver unavailable: {0}")]
    Unavailable(String),
}

/// Error type for all fallible operations in the ert-queue crate.
#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    /// Driver failure; aborts `run_jobs`.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// Returned when the queue no longer accepts work until it is reset.
    #[error("queue is closed; call reset() before reuse")]
    QueueClosed,

    /// Returned when a second thread calls `run_jobs` concurrently.
    #[error("another thread is already running the queue")]
    AlreadyRunning,

    /// Returned by operations that need an idle queue.
    #[error("operation not allowed while the queue is running")]
    Running,

    /// Returned for an index that does not name a job.
    #[error("no job with index {index} (queue has {len} jobs)")]
    UnknownJob {
        /// Requested index.
        index: usize,
        /// Number of jobs in the queue.
        len: usize,
    },

    /// Returned when a job is not in a state that allows the request.
    #[error("job {index} is {status}; cannot {action}")]
    InvalidTransition {
        /// Job index.
        index: usize,
        /// Current status name.
        status: &'static str,
        /// Attempted action.
        action: &'static str,
    },

    /// Returned when the queue configuration is out of range.
    #[error("invalid queue configuration: {0}")]
    InvalidConfig(String),

    /// Returned when the manager thread could not be started.
    #[error("failed to start queue manager thread: {0}")]
    ManagerSpawn(String),

    /// Returned when the manager thread panicked.
    #[error("queue manager thread panicked")]
    ManagerPanicked,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_driver_transparent() {
        let err = QueueError::from(DriverError::Submit {
            job: "real-3".into(),
            reason: "no such file".into(),
        });
        assert_eq!(
            err.to_string(),
            "failed to submit job 'real-3': no such file"
        );
    }

    #[test]
    fn error_unavailable() {
        let err = DriverError::Unavailable("cluster down".into());
        assert_eq!(err.to_string(), "driver unavailable: cluster down");
    }

    #[test]
    fn error_closed_and_running() {
        assert_eq!(
            QueueError::QueueClosed.to_string(),
            "queue is closed; call reset() before reuse"
        );
        assert_eq!(
            QueueError::AlreadyRunning.to_string(),
            "another thread is already running the queue"
        );
    }

    #[test]
    fn error_unknown_job() {
        let err = QueueError::UnknownJob { index: 12, len: 10 };
        assert_eq!(err.to_string(), "no job with index 12 (queue has 10 jobs)");
    }

    #[test]
    fn error_invalid_transition() {
        let err = QueueError::InvalidTransition {
            index: 2,
            status: "RUNNING",
            action: "restart",
        };
        assert_eq!(err.to_string(), "job 2 is RUNNING; cannot restart");
    }

    #[test]
    fn error_is_std_error() {
        fn assert_impl<T: std::error::Error>() {}
        assert_impl::<QueueError>();
        assert_impl::<DriverError>();
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_impl<T: Send + Sync>() {}
        assert_impl::<QueueError>();
        assert_impl::<DriverError>();
    }
}
