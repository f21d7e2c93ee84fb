//! Bounded, fail-fast execution of a job list
//!
//! At most `slots` jobs run at once. The first failing job cancels the batch:
//! no further job is dispatched, jobs already running finish, and the first
//! error is returned once every dispatched job has drained.

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::TransferJob;
use crate::error::{Error, Result};

/// State shared by the workers of one batch
#[derive(Default)]
struct Outcome {
    first_error: Mutex<Option<Error>>,
    discarded: AtomicUsize,
    completed: AtomicUsize,
}

impl Outcome {
    fn record_failure(&self, error: Error) {
        let mut first = self
            .first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if first.is_none() {
            *first = Some(error);
        } else {
            debug!(error = %error, "discarding batch error");
            self.discarded.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn take_error(&self) -> Option<Error> {
        self.first_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}

/// One bulk operation's set of jobs
pub(crate) struct TransferBatch {
    label: &'static str,
    slots: Arc<Semaphore>,
    cancel: CancellationToken,
    outcome: Arc<Outcome>,
    workers: JoinSet<()>,
}

impl TransferBatch {
    /// Batch running at most `slots` jobs concurrently (at least one)
    pub(crate) fn new(label: &'static str, slots: usize) -> Self {
        Self {
            label,
            slots: Arc::new(Semaphore::new(slots.max(1))),
            cancel: CancellationToken::new(),
            outcome: Arc::new(Outcome::default()),
            workers: JoinSet::new(),
        }
    }

    /// Run every job through `work`; returns the number of completed jobs
    pub(crate) async fn run<F, Fut>(mut self, jobs: Vec<TransferJob>, work: F) -> Result<usize>
    where
        F: Fn(TransferJob) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let total = jobs.len();
        let mut dispatched = 0usize;

        for job in jobs {
            let permit = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                permit = Arc::clone(&self.slots).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => break,
                },
            };

            let cancel = self.cancel.clone();
            let outcome = Arc::clone(&self.outcome);
            debug!(batch = self.label, job = %job, "dispatching");
            let task = work(job);
            dispatched += 1;

            self.workers.spawn(async move {
                let _permit = permit;
                if cancel.is_cancelled() {
                    return;
                }
                match task.await {
                    Ok(()) => {
                        outcome.completed.fetch_add(1, Ordering::SeqCst);
                    }
                    Err(error) => {
                        outcome.record_failure(error);
                        cancel.cancel();
                    }
                }
            });
        }

        while let Some(joined) = self.workers.join_next().await {
            if let Err(e) = joined {
                self.outcome
                    .record_failure(Error::General(format!("Transfer worker failed: {e}")));
                self.cancel.cancel();
            }
        }

        let completed = self.outcome.completed.load(Ordering::SeqCst);
        let discarded = self.outcome.discarded.load(Ordering::SeqCst);
        if discarded > 0 {
            warn!(
                batch = self.label,
                discarded, "further job errors occurred after the first one"
            );
        }

        match self.outcome.take_error() {
            Some(error) => {
                info!(
                    batch = self.label,
                    total, dispatched, completed, "batch aborted"
                );
                Err(error)
            }
            None => {
                info!(batch = self.label, completed, "batch finished");
                Ok(completed)
            }
        }
    }
}
