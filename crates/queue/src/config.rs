//! Configuration for the job queue.

use std::time::Duration;

use crate::error::QueueError;

/// Queue tuning parameters.
///
/// # Example
///
/// ```
/// use ert_queue::QueueConfig;
/// use std::time::Duration;
///
/// let config = QueueConfig::new()
///     .with_max_submit(3)
///     .with_poll_interval(Duration::from_millis(100));
/// assert!(config.validate().is_ok());
/// assert_eq!(config.ok_file(), "OK.status");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    max_submit: usize,
    ok_file: String,
    exit_file: String,
    poll_interval: Duration,
    max_ok_wait: Duration,
    max_submit_per_poll: usize,
    auto_stop_factor: f64,
}

impl QueueConfig {
    /// Creates a configuration with defaults.
    ///
    /// Defaults: `max_submit = 2`, `ok_file = "OK.status"`,
    /// `exit_file = "ERROR"`, `poll_interval = 250 ms`, `max_ok_wait = 60 s`,
    /// `max_submit_per_poll = 5`, `auto_stop_factor = 0.25`.
    pub fn new() -> Self {
        Self {
            max_submit: 2,
            ok_file: "OK.status".to_string(),
            exit_file: "ERROR".to_string(),
            poll_interval: Duration::from_millis(250),
            max_ok_wait: Duration::from_secs(60),
            max_submit_per_poll: 5,
            auto_stop_factor: 0.25,
        }
    }

    /// Sets the number of submit attempts per job.
    pub fn with_max_submit(mut self, max_submit: usize) -> Self {
        self.max_submit = max_submit;
        self
    }

    /// Sets the success sentinel file name, relative to the run path.
    pub fn with_ok_file(mut self, ok_file: impl Into<String>) -> Self {
        self.ok_file = ok_file.into();
        self
    }

    /// Sets the failure sentinel file name, relative to the run path.
    pub fn with_exit_file(mut self, exit_file: impl Into<String>) -> Self {
        self.exit_file = exit_file.into();
        self
    }

    /// Sets the delay between polls of the manager loop.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Sets how long a finished job may wait for its OK file.
    pub fn with_max_ok_wait(mut self, max_ok_wait: Duration) -> Self {
        self.max_ok_wait = max_ok_wait;
        self
    }

    /// Sets the maximum number of submissions per poll.
    pub fn with_max_submit_per_poll(mut self, n: usize) -> Self {
        self.max_submit_per_poll = n;
        self
    }

    /// Sets the fraction of the mean successful run time used by
    /// `set_auto_job_stop_time`.
    pub fn with_auto_stop_factor(mut self, factor: f64) -> Self {
        self.auto_stop_factor = factor;
        self
    }

    /// Returns the number of submit attempts per job.
    pub fn max_submit(&self) -> usize {
        self.max_submit
    }

    /// Returns the success sentinel file name.
    pub fn ok_file(&self) -> &str {
        &self.ok_file
    }

    /// Returns the failure sentinel file name.
    pub fn exit_file(&self) -> &str {
        &self.exit_file
    }

    /// Returns the poll interval.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the OK-file wait limit.
    pub fn max_ok_wait(&self) -> Duration {
        self.max_ok_wait
    }

    /// Returns the per-poll submission limit.
    pub fn max_submit_per_poll(&self) -> usize {
        self.max_submit_per_poll
    }

    /// Returns the auto-stop factor.
    pub fn auto_stop_factor(&self) -> f64 {
        self.auto_stop_factor
    }

    /// Validates this configuration.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.max_submit == 0 {
            return Err(QueueError::InvalidConfig(
                "max_submit must be >= 1".to_string(),
            ));
        }
        if self.ok_file.is_empty() || self.exit_file.is_empty() {
            return Err(QueueError::InvalidConfig(
                "sentinel file names must not be empty".to_string(),
            ));
        }
        if self.poll_interval.is_zero() {
            return Err(QueueError::InvalidConfig(
                "poll_interval must be positive".to_string(),
            ));
        }
        if self.max_submit_per_poll == 0 {
            return Err(QueueError::InvalidConfig(
                "max_submit_per_poll must be >= 1".to_string(),
            ));
        }
        if !self.auto_stop_factor.is_finite() || self.auto_stop_factor <= 0.0 {
            return Err(QueueError::InvalidConfig(format!(
                "auto_stop_factor must be positive, got {}",
                self.auto_stop_factor
            )));
        }
        Ok(())
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = QueueConfig::default();
        assert_eq!(cfg.max_submit(), 2);
        assert_eq!(cfg.ok_file(), "OK.status");
        assert_eq!(cfg.exit_file(), "ERROR");
        assert_eq!(cfg.poll_interval(), Duration::from_millis(250));
        assert_eq!(cfg.max_ok_wait(), Duration::from_secs(60));
        assert_eq!(cfg.max_submit_per_poll(), 5);
        assert!((cfg.auto_stop_factor() - 0.25).abs() < f64::EPSILON);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn builder_chain() {
        let cfg = QueueConfig::new()
            .with_ok_file("DONE")
            .with_exit_file("FAIL")
            .with_max_ok_wait(Duration::from_secs(1))
            .with_max_submit_per_poll(10)
            .with_auto_stop_factor(0.5);
        assert_eq!(cfg.ok_file(), "DONE");
        assert_eq!(cfg.exit_file(), "FAIL");
        assert_eq!(cfg.max_ok_wait(), Duration::from_secs(1));
        assert_eq!(cfg.max_submit_per_poll(), 10);
        assert!((cfg.auto_stop_factor() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(QueueConfig::new().with_max_submit(0).validate().is_err());
        assert!(QueueConfig::new().with_ok_file("").validate().is_err());
        assert!(
            QueueConfig::new()
                .with_poll_interval(Duration::ZERO)
                .validate()
                .is_err()
        );
        assert!(
            QueueConfig::new()
                .with_max_submit_per_poll(0)
                .validate()
                .is_err()
        );
        assert!(
            QueueConfig::new()
                .with_auto_stop_factor(f64::NAN)
                .validate()
                .is_err()
        );
    }
}
