//! The worker loop: pop a path, classify it, then hash it or expand it.
//!
//! Every per-entry failure is logged and the entry dropped; nothing escapes
//! the loop, so one unreadable entry never stops the traversal.

use crate::audit::AuditContext;
use crate::compare::compare_digest;
use crate::digest::digest_file;
use crate::output::Finding;
use crate::queue::WorkQueue;
use crate::util::paths::join_path;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use tracing::{debug, trace, warn};

/// Retires the worker's queue slot if its thread unwinds, so a panic in one
/// worker cannot leave the others blocked forever.
struct WorkerSlot<'a> {
    queue: &'a WorkQueue<PathBuf>,
}

impl Drop for WorkerSlot<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.queue.retire_worker();
        }
    }
}

pub(crate) fn run_worker(id: usize, ctx: &AuditContext<'_>) {
    let _slot = WorkerSlot { queue: &ctx.queue };
    debug!(worker = id, "Worker starting");

    let mut tasks = 0u64;
    while let Some(path) = ctx.queue.pop_blocking() {
        process_entry(ctx, &path);
        tasks += 1;
    }

    debug!(worker = id, tasks, "Worker finished");
}

fn process_entry(ctx: &AuditContext<'_>, path: &Path) {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) => {
            warn!("Failed to stat {}: {}", path.display(), e);
            ctx.tally.record_skip();
            return;
        }
    };

    let file_type = metadata.file_type();
    if file_type.is_dir() {
        expand_directory(ctx, path);
    } else if file_type.is_file() {
        hash_file(ctx, path, metadata.len());
    } else {
        debug!("Skipping {}: not a regular file or directory", path.display());
    }
}

/// Pushes every regular file and directory directly inside `path`.
fn expand_directory(ctx: &AuditContext<'_>, path: &Path) {
    let entries = match fs::read_dir(path) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to open directory {}: {}", path.display(), e);
            ctx.tally.record_skip();
            return;
        }
    };

    let mut pushed = 0usize;
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry in {}: {}", path.display(), e);
                ctx.tally.record_skip();
                continue;
            }
        };

        let name = entry.file_name();
        if name == "." || name == ".." {
            continue;
        }
        let child = join_path(path, &name);

        // DirEntry::file_type does not follow symlinks.
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                warn!("Failed to stat {}: {}", child.display(), e);
                ctx.tally.record_skip();
                continue;
            }
        };

        if file_type.is_dir() || file_type.is_file() {
            ctx.queue.push(child);
            pushed += 1;
        } else {
            trace!("Ignoring {}: not a regular file or directory", child.display());
        }
    }

    debug!("Queued {} entries from {}", pushed, path.display());
}

fn hash_file(ctx: &AuditContext<'_>, path: &Path, size: u64) {
    let digest = match digest_file(ctx.algorithm, path) {
        Ok(digest) => digest,
        Err(e) => {
            warn!("Failed to hash {}: {}", path.display(), e);
            ctx.tally.record_skip();
            return;
        }
    };

    ctx.visited.record(path);

    if let Some(stats) = &ctx.stats {
        stats.add(size);
    }

    match ctx.reference {
        Some(reference) => {
            if let Some(finding) = compare_digest(path, &digest, reference) {
                ctx.tally.record(&finding);
                ctx.sink.emit(&finding);
            }
        }
        None => ctx.sink.emit(&Finding::NewHash {
            algorithm: ctx.algorithm,
            path: path.to_path_buf(),
            digest,
        }),
    }
}
