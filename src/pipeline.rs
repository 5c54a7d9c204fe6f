//! Scan pipeline orchestration.
//!
//! Coordinates a full scan: discovery → cache classification → parallel
//! extraction → cache persistence → report. Unchanged documents are served
//! from the cache without touching a worker; when nothing changed, no worker
//! is started at all.
//!
//! ```text
//! Idle → Discovering → Classifying ─┬─────────────────────┬→ Persisting → Reporting → Done
//!                                   └→ Extracting (pool) ─┘
//! ```
//!
//! Only a missing or non-directory root is fatal. Unreadable documents,
//! extractor failures, a corrupt cache and a failed cache save all degrade
//! the run instead of aborting it.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::aggregate::Aggregate;
use crate::cache::CacheStore;
use crate::config::Config;
use crate::discover::{discover, DiscoveryOptions};
use crate::error::ScanError;
use crate::extract::Extractor;
use crate::fingerprint::fingerprint_file;
use crate::models::{DocumentId, DocumentSummary};
use crate::pool::{Extracted, WorkerPool};
use crate::progress::{ScanProgressEvent, ScanProgressReporter};

/// How often (in documents) classification progress is reported.
const CLASSIFY_REPORT_EVERY: u64 = 500;

/// Controller states, in the order a scan passes through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Idle,
    Discovering,
    Classifying,
    Extracting,
    Persisting,
    Reporting,
    Done,
}

impl ScanPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanPhase::Idle => "idle",
            ScanPhase::Discovering => "discovering",
            ScanPhase::Classifying => "classifying",
            ScanPhase::Extracting => "extracting",
            ScanPhase::Persisting => "persisting",
            ScanPhase::Reporting => "reporting",
            ScanPhase::Done => "done",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub discovery: DiscoveryOptions,
    /// `None` uses the available hardware concurrency.
    pub workers: Option<usize>,
    /// Bypass cache lookup and re-extract every document.
    pub force: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub discovered: u64,
    pub cache_hits: u64,
    /// Documents classified as new or changed and queued for extraction.
    pub changed: u64,
    /// Documents successfully extracted by workers this run.
    pub extracted: u64,
    /// Documents skipped because they could not be read or classified.
    pub failed: u64,
    /// Workers used for extraction; zero when nothing needed extracting.
    pub workers: u64,
}

#[derive(Debug, Clone)]
pub struct ScanReport {
    pub aggregate: Aggregate,
    pub stats: ScanStats,
    /// Per-document fragment totals, sorted by identity.
    pub documents: Vec<DocumentSummary>,
    /// The cache file was rewritten by this run.
    pub persisted: bool,
    pub persist_error: Option<String>,
    pub cancelled: bool,
    pub elapsed: Duration,
}

impl ScanReport {
    /// Documents with the most fragments first, ignoring those below
    /// `min_fragments`. Ties are broken by identity.
    pub fn hotspots(&self, top: usize, min_fragments: usize) -> Vec<&DocumentSummary> {
        let mut docs: Vec<&DocumentSummary> = self
            .documents
            .iter()
            .filter(|d| d.fragments >= min_fragments)
            .collect();
        docs.sort_by(|a, b| b.fragments.cmp(&a.fragments).then_with(|| a.id.cmp(&b.id)));
        docs.truncate(top);
        docs
    }
}

pub struct Pipeline {
    options: ScanOptions,
    extractor: Arc<dyn Extractor>,
    phase: ScanPhase,
}

impl Pipeline {
    pub fn new(options: ScanOptions, extractor: Arc<dyn Extractor>) -> Self {
        Self {
            options,
            extractor,
            phase: ScanPhase::Idle,
        }
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    fn enter(&mut self, phase: ScanPhase, progress: &dyn ScanProgressReporter) {
        debug!(from = self.phase.as_str(), to = phase.as_str(), "scan phase");
        self.phase = phase;
        progress.report(ScanProgressEvent::Phase(phase));
    }

    /// Runs one scan against `cache`.
    ///
    /// The exclusive borrow of the store means one scan at a time per store;
    /// the store is only mutated here, after worker results are collected.
    pub async fn run(
        &mut self,
        cache: &mut CacheStore,
        progress: &dyn ScanProgressReporter,
        cancel: &CancellationToken,
    ) -> Result<ScanReport, ScanError> {
        let started = Instant::now();

        // Root errors surface before any phase change.
        let discovery = discover(&self.options.discovery)?;

        self.enter(ScanPhase::Discovering, progress);
        let ids: Vec<DocumentId> = discovery.collect();

        let mut stats = ScanStats {
            discovered: ids.len() as u64,
            ..ScanStats::default()
        };
        let mut aggregate = Aggregate::new();
        let mut documents = Vec::with_capacity(ids.len());
        let mut cancelled = false;

        self.enter(ScanPhase::Classifying, progress);
        let jobs = if self.options.force {
            info!(documents = ids.len(), "forced full rescan, cache lookup bypassed");
            ids
        } else {
            let total = ids.len() as u64;
            let mut jobs = Vec::new();
            for (i, id) in ids.into_iter().enumerate() {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break;
                }
                match fingerprint_file(id.path()) {
                    Err(e) => {
                        warn!(document = %id, error = %e, "skipping unreadable document");
                        stats.failed += 1;
                    }
                    Ok((fingerprint, _)) => match cache.lookup(&id) {
                        Some(entry) if entry.fingerprint == fingerprint => {
                            aggregate.merge(&entry.results);
                            documents.push(DocumentSummary {
                                fragments: entry.results.fragment_count(),
                                id,
                                cached: true,
                            });
                            stats.cache_hits += 1;
                        }
                        _ => jobs.push(id),
                    },
                }
                let n = i as u64 + 1;
                if n % CLASSIFY_REPORT_EVERY == 0 || n == total {
                    progress.report(ScanProgressEvent::Classifying {
                        n,
                        total,
                        hits: stats.cache_hits,
                    });
                }
            }
            jobs
        };

        stats.changed = jobs.len() as u64;

        let mut fresh: Vec<(DocumentId, Extracted)> = Vec::new();
        if !jobs.is_empty() && !cancelled {
            self.enter(ScanPhase::Extracting, progress);
            let total = jobs.len() as u64;
            let mut done = 0u64;
            let pool = WorkerPool::new(self.options.workers);

            let run = pool
                .run(jobs, Arc::clone(&self.extractor), cancel, |outcome| {
                    done += 1;
                    match outcome.result {
                        Ok(extracted) => {
                            aggregate.merge(&extracted.fragments);
                            documents.push(DocumentSummary {
                                id: outcome.id.clone(),
                                fragments: extracted.fragments.fragment_count(),
                                cached: false,
                            });
                            fresh.push((outcome.id, extracted));
                        }
                        Err(e) => {
                            warn!(document = %outcome.id, error = %e, "skipping document");
                            stats.failed += 1;
                        }
                    }
                    progress.report(ScanProgressEvent::Extracting { n: done, total });
                })
                .await;

            stats.extracted = fresh.len() as u64;
            stats.failed += run.lost as u64;
            stats.workers = run.workers as u64;
            cancelled |= run.cancelled;
        }

        let mut persisted = false;
        let mut persist_error = None;
        if cancelled {
            warn!("scan cancelled; cache left unchanged");
        } else {
            for (id, extracted) in fresh {
                cache.upsert(id, extracted.fingerprint, extracted.fragments);
            }
            if cache.is_dirty() {
                self.enter(ScanPhase::Persisting, progress);
                match cache.save() {
                    Ok(()) => persisted = true,
                    Err(e) => {
                        error!(error = %e, "failed to persist cache; next run will rescan");
                        persist_error = Some(e.to_string());
                    }
                }
            }
        }

        self.enter(ScanPhase::Reporting, progress);
        documents.sort_by(|a, b| a.id.cmp(&b.id));
        let report = ScanReport {
            aggregate,
            stats,
            documents,
            persisted,
            persist_error,
            cancelled,
            elapsed: started.elapsed(),
        };
        info!(
            discovered = stats.discovered,
            hits = stats.cache_hits,
            extracted = stats.extracted,
            failed = stats.failed,
            fragments = report.aggregate.total_fragments(),
            "scan complete"
        );

        self.enter(ScanPhase::Done, progress);
        Ok(report)
    }
}

/// Overrides applied on top of [`Config`] for one scan.
#[derive(Debug, Clone, Default)]
pub struct ScanOverrides {
    pub force: bool,
    pub workers: Option<usize>,
}

/// Runs a scan of `root` using the rules and cache location from `config`.
pub async fn run_scan(
    config: &Config,
    root: &Path,
    overrides: &ScanOverrides,
    progress: &dyn ScanProgressReporter,
    cancel: &CancellationToken,
) -> Result<ScanReport> {
    let rules = config.rule_set()?;
    let options = ScanOptions {
        discovery: config.discovery(root),
        workers: overrides.workers.or(config.scan.workers),
        force: overrides.force || config.scan.force,
    };

    let mut cache = CacheStore::open(&config.cache.dir);
    let mut pipeline = Pipeline::new(options, Arc::new(rules));
    let report = pipeline.run(&mut cache, progress, cancel).await?;
    Ok(report)
}
