use crate::compare::disappeared_files;
use crate::digest::DigestAlgorithm;
use crate::output::{Finding, OutputSink};
use crate::queue::WorkQueue;
use crate::reference::ReferenceMap;
use crate::registry::VisitedRegistry;
use crate::stats::{RunStats, StatsReport};
use crate::worker;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use tracing::{error, info};

#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    #[error("Cannot access root path {path}: {source}")]
    Root {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),
    #[error("Failed to start any worker thread: {0}")]
    NoWorkers(std::io::Error),
    #[error("{0} worker thread(s) panicked; results are incomplete")]
    WorkerPanicked(usize),
}

pub struct AuditOptions {
    /// Root of the tree, used verbatim as the prefix of every reported path.
    pub root: PathBuf,
    pub workers: NonZeroUsize,
    pub algorithm: DigestAlgorithm,
    /// When present, digests are compared instead of printed.
    pub reference: Option<ReferenceMap>,
    pub collect_stats: bool,
}

#[derive(Debug)]
pub struct AuditSummary {
    pub files_hashed: usize,
    pub skipped: u64,
    pub mismatched: u64,
    pub extra: u64,
    pub disappeared: u64,
    pub stats: Option<StatsReport>,
}

impl AuditSummary {
    pub fn has_divergence(&self) -> bool {
        self.mismatched + self.extra + self.disappeared > 0
    }
}

/// Counters for outcomes that do not need the reference or stats enabled.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    skipped: AtomicU64,
    mismatched: AtomicU64,
    extra: AtomicU64,
}

impl Tally {
    pub(crate) fn record_skip(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record(&self, finding: &Finding) {
        let counter = match finding {
            Finding::Mismatch { .. } => &self.mismatched,
            Finding::Extra { .. } => &self.extra,
            Finding::NewHash { .. } | Finding::Disappeared { .. } => return,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// State shared by all workers of one audit run.
pub(crate) struct AuditContext<'a> {
    pub(crate) queue: WorkQueue<PathBuf>,
    pub(crate) visited: VisitedRegistry,
    pub(crate) stats: Option<RunStats>,
    pub(crate) tally: Tally,
    pub(crate) algorithm: DigestAlgorithm,
    pub(crate) reference: Option<&'a ReferenceMap>,
    pub(crate) sink: &'a OutputSink,
}

/// Hashes every regular file under `options.root` with a fixed pool of
/// worker threads, writing findings to `sink`.
///
/// # Behavior
/// - The root is pushed before any worker starts; workers then expand
///   directories and hash files until the queue reports quiescence
/// - Without a reference every file produces a new-hash line; with one, only
///   mismatching and extra files are reported while workers run, and files
///   that disappeared are reported once all workers have exited
/// - Unreadable entries are logged and skipped, never fatal
///
/// # Errors
/// - `AuditError::Root` / `AuditError::PermissionDenied`: the root cannot be
///   stat'ed; nothing is traversed
/// - `AuditError::NoWorkers`: not a single worker thread could be started
/// - `AuditError::WorkerPanicked`: the traversal finished but some entries may
///   have been lost with the panicking worker
pub fn run_audit(options: AuditOptions, sink: &OutputSink) -> Result<AuditSummary, AuditError> {
    std::fs::symlink_metadata(&options.root).map_err(|e| {
        if e.kind() == std::io::ErrorKind::PermissionDenied {
            AuditError::PermissionDenied(options.root.clone())
        } else {
            AuditError::Root {
                path: options.root.clone(),
                source: e,
            }
        }
    })?;

    let workers = options.workers.get();
    let ctx = AuditContext {
        queue: WorkQueue::new(options.workers),
        visited: VisitedRegistry::new(),
        stats: options.collect_stats.then(RunStats::start),
        tally: Tally::default(),
        algorithm: options.algorithm,
        reference: options.reference.as_ref(),
        sink,
    };

    info!(
        "Auditing {} with {} worker(s) using {}",
        options.root.display(),
        workers,
        options.algorithm
    );
    ctx.queue.push(options.root.clone());

    let (started, panicked, spawn_error) = thread::scope(|s| {
        let mut handles = Vec::with_capacity(workers);
        let mut spawn_error = None;

        for id in 0..workers {
            let ctx = &ctx;
            let spawned = thread::Builder::new()
                .name(format!("phantom-worker-{id}"))
                .spawn_scoped(s, move || worker::run_worker(id, ctx));
            match spawned {
                Ok(handle) => handles.push((id, handle)),
                Err(e) => {
                    error!("Failed to start worker {}: {}", id, e);
                    ctx.queue.retire_worker();
                    spawn_error.get_or_insert(e);
                }
            }
        }

        let started = handles.len();
        let mut panicked = 0;
        for (id, handle) in handles {
            if handle.join().is_err() {
                error!("Worker {} panicked", id);
                panicked += 1;
            }
        }
        (started, panicked, spawn_error)
    });

    if started == 0
        && let Some(e) = spawn_error
    {
        return Err(AuditError::NoWorkers(e));
    }
    if panicked > 0 {
        return Err(AuditError::WorkerPanicked(panicked));
    }
    debug_assert!(ctx.queue.is_done());

    let AuditContext {
        visited,
        stats,
        tally,
        ..
    } = ctx;
    let files_hashed = visited.len();

    let mut disappeared = 0;
    if let Some(reference) = &options.reference {
        let visited = visited.into_paths();
        for finding in disappeared_files(reference, &visited) {
            sink.emit(&finding);
            disappeared += 1;
        }
    }

    Ok(AuditSummary {
        files_hashed,
        skipped: tally.skipped.into_inner(),
        mismatched: tally.mismatched.into_inner(),
        extra: tally.extra.into_inner(),
        disappeared,
        stats: stats.map(|stats| stats.report()),
    })
}
