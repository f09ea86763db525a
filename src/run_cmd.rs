//! Run command: drive the project's forward-model jobs to completion.

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{info, info_span, warn};

use ert_queue::{JobQueue, QueueManager};

use crate::cli::RunArgs;
use crate::config::QueueToml;
use crate::convert;

/// Run all configured jobs.
pub fn run(args: RunArgs) -> Result<()> {
    let _cmd = info_span!("run").entered();

    let cfg = crate::load_config(&args.config)?;
    if cfg.jobs.is_empty() {
        bail!("no [[jobs]] in {}", args.config.display());
    }
    if cfg.queue.min_realizations > cfg.jobs.len() {
        bail!(
            "min_realizations = {} exceeds the number of jobs ({})",
            cfg.queue.min_realizations,
            cfg.jobs.len()
        );
    }

    let queue_cfg = convert::build_queue_config(&cfg.queue)?;
    let poll = queue_cfg.poll_interval();
    let queue = Arc::new(JobQueue::new(convert::build_driver(&cfg.queue), queue_cfg)?);
    for job in &cfg.jobs {
        fs::create_dir_all(&job.run_path)
            .with_context(|| format!("failed to create run path: {}", job.run_path.display()))?;
        queue.add_job(&job.name, &job.executable, &job.run_path, job.args.clone())?;
    }
    queue.submit_complete();
    info!(jobs = cfg.jobs.len(), "jobs queued");

    let mut manager = QueueManager::new(Arc::clone(&queue));
    manager.start(cfg.jobs.len())?;

    let mut quorum = Quorum::new(&cfg.queue);
    let mut last_summary = String::new();
    while !manager.try_wait(poll)? {
        quorum.check(&queue);
        let summary = queue.status_summary().to_string();
        if summary != last_summary {
            info!(%summary, "queue status");
            last_summary = summary;
        }
    }

    let complete = queue.num_complete();
    info!(
        complete,
        failed = queue.num_failed(),
        killed = queue.num_killed(),
        "run finished"
    );
    if complete < cfg.queue.min_realizations {
        bail!(
            "only {complete} of {} required realizations succeeded",
            cfg.queue.min_realizations
        );
    }
    Ok(())
}

/// Straggler policy applied once enough realizations have succeeded.
struct Quorum<'a> {
    queue: &'a QueueToml,
    applied: bool,
}

impl<'a> Quorum<'a> {
    fn new(queue: &'a QueueToml) -> Self {
        Self {
            queue,
            applied: false,
        }
    }

    fn check<D: ert_queue::QueueDriver>(&mut self, queue: &JobQueue<D>) {
        if self.applied || queue.num_complete() < self.queue.min_realizations {
            return;
        }
        if let Some(max) = convert::max_duration(self.queue) {
            queue.set_max_job_duration(Some(max));
        }
        if self.queue.auto_stop && queue.set_auto_job_stop_time().is_none() {
            // No successful run yet to base the stop time on.
            return;
        }
        if self.queue.min_realizations > 0 {
            warn!(
                min_realizations = self.queue.min_realizations,
                "quorum reached, stragglers will be stopped"
            );
        }
        self.applied = true;
    }
}
