//! Job states and per-state counts.

use std::fmt;

/// Lifecycle state of a queued job.
///
/// ```text
/// NotActive → Submitted → Running → Done ─┬→ Success
///                                         └→ Exit ─┬→ NotActive (resubmit)
///                                                  └→ Failed
/// any active state → UserExit → Killed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    /// Added and waiting to be submitted.
    NotActive,
    /// Handed to the driver, not yet running.
    Submitted,
    /// Running according to the driver.
    Running,
    /// The process finished; success still has to be confirmed.
    Done,
    /// The attempt failed; will be resubmitted or marked failed.
    Exit,
    /// Scheduled for killing by a policy or the user.
    UserExit,
    /// Finished and confirmed by the OK file.
    Success,
    /// Gave up after the last submit attempt.
    Failed,
    /// Killed by the queue.
    Killed,
}

impl JobStatus {
    /// All states, in display order.
    pub const ALL: [JobStatus; 9] = [
        JobStatus::NotActive,
        JobStatus::Submitted,
        JobStatus::Running,
        JobStatus::Done,
        JobStatus::Exit,
        JobStatus::UserExit,
        JobStatus::Success,
        JobStatus::Failed,
        JobStatus::Killed,
    ];

    /// Upper-case name used in logs and summaries.
    pub fn name(self) -> &'static str {
        match self {
            JobStatus::NotActive => "WAITING",
            JobStatus::Submitted => "PENDING",
            JobStatus::Running => "RUNNING",
            JobStatus::Done => "DONE",
            JobStatus::Exit => "EXIT",
            JobStatus::UserExit => "USER_EXIT",
            JobStatus::Success => "SUCCESS",
            JobStatus::Failed => "FAILED",
            JobStatus::Killed => "KILLED",
        }
    }

    /// Success, Failed or Killed.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed | JobStatus::Killed)
    }

    /// Holding a driver slot (Submitted or Running).
    pub fn is_active(self) -> bool {
        matches!(self, JobStatus::Submitted | JobStatus::Running)
    }

    fn slot(self) -> usize {
        match self {
            JobStatus::NotActive => 0,
            JobStatus::Submitted => 1,
            JobStatus::Running => 2,
            JobStatus::Done => 3,
            JobStatus::Exit => 4,
            JobStatus::UserExit => 5,
            JobStatus::Success => 6,
            JobStatus::Failed => 7,
            JobStatus::Killed => 8,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Number of jobs in each state at one instant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSummary {
    counts: [usize; 9],
}

impl StatusSummary {
    /// Counts the given states.
    pub fn from_statuses(statuses: impl IntoIterator<Item = JobStatus>) -> Self {
        let mut summary = Self::default();
        for status in statuses {
            summary.counts[status.slot()] += 1;
        }
        summary
    }

    /// Number of jobs in `status`.
    pub fn count(&self, status: JobStatus) -> usize {
        self.counts[status.slot()]
    }

    /// Total number of jobs.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Jobs in a terminal state.
    pub fn finished(&self) -> usize {
        self.count(JobStatus::Success) + self.count(JobStatus::Failed) + self.count(JobStatus::Killed)
    }

    /// Jobs holding a driver slot.
    pub fn active(&self) -> usize {
        self.count(JobStatus::Submitted) + self.count(JobStatus::Running)
    }
}

impl fmt::Display for StatusSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = JobStatus::ALL
            .iter()
            .filter(|s| self.count(**s) > 0)
            .map(|s| format!("{}={}", s.name(), self.count(*s)))
            .collect();
        if parts.is_empty() {
            f.write_str("empty")
        } else {
            f.write_str(&parts.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_and_active() {
        assert!(JobStatus::Success.is_terminal());
        assert!(JobStatus::Killed.is_terminal());
        assert!(!JobStatus::Done.is_terminal());
        assert!(JobStatus::Running.is_active());
        assert!(!JobStatus::NotActive.is_active());
    }

    #[test]
    fn summary_counts() {
        let summary = StatusSummary::from_statuses([
            JobStatus::Success,
            JobStatus::Success,
            JobStatus::Running,
            JobStatus::Killed,
            JobStatus::NotActive,
        ]);
        assert_eq!(summary.count(JobStatus::Success), 2);
        assert_eq!(summary.total(), 5);
        assert_eq!(summary.finished(), 3);
        assert_eq!(summary.active(), 1);
        assert_eq!(summary.to_string(), "WAITING=1 RUNNING=1 SUCCESS=2 KILLED=1");
    }

    #[test]
    fn empty_summary() {
        assert_eq!(StatusSummary::default().to_string(), "empty");
    }
}
