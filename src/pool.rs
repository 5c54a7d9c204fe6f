//! Bounded worker pool for extraction.
//!
//! Each unit of work reads one document, fingerprints the bytes it read,
//! decodes them, and runs the [`Extractor`]. Units are independent: they run
//! on tokio's blocking pool with at most `workers` in flight, and results are
//! handed back by value in completion order. Workers never see the cache.
//!
//! A failing unit (unreadable file, bad UTF-8, extractor error or panic)
//! produces a failed [`WorkOutcome`] for that document only; siblings keep
//! running.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::error::DocumentError;
use crate::extract::Extractor;
use crate::fingerprint::fingerprint_file;
use crate::models::{DocumentId, Fingerprint, Fragments};

/// Successful extraction of one document.
#[derive(Debug, Clone)]
pub struct Extracted {
    /// Fingerprint of the exact bytes that were classified.
    pub fingerprint: Fingerprint,
    pub fragments: Fragments,
}

#[derive(Debug)]
pub struct WorkOutcome {
    pub id: DocumentId,
    pub result: Result<Extracted, DocumentError>,
}

/// What happened during one [`WorkerPool::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolRun {
    pub workers: usize,
    pub submitted: usize,
    /// Outcomes delivered to the callback, successful or not.
    pub completed: usize,
    /// Tasks that died without producing an outcome.
    pub lost: usize,
    /// Jobs never started because cancellation was requested.
    pub skipped: usize,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WorkerPool {
    workers: Option<usize>,
}

impl WorkerPool {
    /// `None` sizes the pool to the available hardware concurrency.
    pub fn new(workers: Option<usize>) -> Self {
        Self { workers }
    }

    /// Pool size for `pending` jobs: configured or hardware concurrency,
    /// capped at the number of jobs, never below one.
    pub fn effective_workers(&self, pending: usize) -> usize {
        let configured = self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        });
        configured.min(pending).max(1)
    }

    /// Runs every job, calling `on_outcome` as each one completes. Returns
    /// without spawning anything when `jobs` is empty.
    ///
    /// Once `cancel` fires, no further jobs are started; jobs already running
    /// are allowed to finish and their outcomes are still delivered.
    pub async fn run<F>(
        &self,
        jobs: Vec<DocumentId>,
        extractor: Arc<dyn Extractor>,
        cancel: &CancellationToken,
        mut on_outcome: F,
    ) -> PoolRun
    where
        F: FnMut(WorkOutcome),
    {
        let mut run = PoolRun {
            submitted: jobs.len(),
            ..PoolRun::default()
        };
        if jobs.is_empty() {
            return run;
        }
        run.workers = self.effective_workers(jobs.len());
        debug!(workers = run.workers, jobs = run.submitted, "starting worker pool");

        let mut queue = jobs.into_iter();
        let mut in_flight = JoinSet::new();

        loop {
            while in_flight.len() < run.workers && !run.cancelled {
                if cancel.is_cancelled() {
                    run.cancelled = true;
                    break;
                }
                let Some(id) = queue.next() else { break };
                let extractor = Arc::clone(&extractor);
                in_flight.spawn_blocking(move || process(id, extractor.as_ref()));
            }

            match in_flight.join_next().await {
                Some(Ok(outcome)) => {
                    run.completed += 1;
                    on_outcome(outcome);
                }
                Some(Err(e)) => {
                    run.lost += 1;
                    error!(error = %e, "extraction task failed");
                }
                None => break,
            }
        }

        run.skipped = queue.len();
        run
    }
}

fn process(id: DocumentId, extractor: &dyn Extractor) -> WorkOutcome {
    let result = extract_document(&id, extractor);
    WorkOutcome { id, result }
}

fn extract_document(
    id: &DocumentId,
    extractor: &dyn Extractor,
) -> Result<Extracted, DocumentError> {
    let path = id.path();
    let (fingerprint, bytes) = fingerprint_file(path)?;
    let content =
        String::from_utf8(bytes).map_err(|_| DocumentError::Decode(path.to_path_buf()))?;
    let kind = id.kind();

    let fragments = panic::catch_unwind(AssertUnwindSafe(|| extractor.classify(&content, &kind)))
        .map_err(|payload| DocumentError::Panicked(panic_message(payload.as_ref())))??;

    Ok(Extracted {
        fingerprint,
        fragments,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
