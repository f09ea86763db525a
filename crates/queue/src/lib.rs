//! Job queue that drives external simulation runs to completion.
//!
//! A [`JobQueue`] holds one job entry per realization and a
//! [`QueueDriver`] that starts, polls and kills the processes. The manager
//! loop ([`JobQueue::run_jobs`]) repeats until every job is finished:
//!
//! 1. kill jobs past the duration limit or the stop time,
//! 2. poll the driver for state changes,
//! 3. confirm finished jobs through the OK / EXIT files in their run path,
//! 4. resubmit failed attempts while `max_submit` allows,
//! 5. submit waiting jobs up to the driver's `max_running`.
//!
//! | Type | Role |
//! |------|------|
//! | [`JobQueue`] | shared state and the manager loop |
//! | [`QueueManager`] | runs the loop on a background thread |
//! | [`LocalDriver`] | child processes on this host |
//! | [`QueueConfig`] | attempts, sentinel files, poll interval |
//!
//! # Quick start
//!
//! ```no_run
//! use ert_queue::{JobQueue, LocalDriver, QueueConfig};
//!
//! let queue = JobQueue::new(LocalDriver::new().with_max_running(4), QueueConfig::new())?;
//! for i in 0..10 {
//!     queue.add_job(format!("real-{i}"), "./forward_model", format!("runs/real-{i}"), vec![])?;
//! }
//! queue.run_jobs(10)?;
//! println!("{}", queue.status_summary());
//! # Ok::<(), ert_queue::QueueError>(())
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod local;
pub mod manager;
mod node;
pub mod queue;
pub mod status;

pub use config::QueueConfig;
pub use driver::{DriverStatus, JobSpec, QueueDriver};
pub use error::{DriverError, QueueError};
pub use local::{LocalDriver, LocalJob};
pub use manager::QueueManager;
pub use queue::JobQueue;
pub use status::{JobStatus, StatusSummary};
