//! Per-entry recovery and the worker pool that drives it over a cache directory.

use crate::allocate::{allocate, OutputDecision};
use crate::classify::{classify, Classification, ScanStrategy};
use crate::error::{EntryError, RecoverError};
use crate::sink::{AtomicFileSink, ByteSink, WriteOutcome};
use crate::source::{list_entries, read_entry};
use crate::types::{DirEntryInfo, EntryOutcome, RecoverOptions, RecoverStats};
use crate::ProgressCallback;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::fs;
use std::path::PathBuf;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Times a freshly allocated name may be lost to another writer before the entry fails.
pub const MAX_PERSIST_RETRIES: usize = 8;

/// Recovers individual cache entries into an output tree.
#[derive(Debug, Clone)]
pub struct Recoverer<S = AtomicFileSink> {
    output_root: PathBuf,
    strategy: ScanStrategy,
    sink: S,
}

impl Recoverer<AtomicFileSink> {
    /// Creates a recoverer writing real files under `output_root`.
    pub fn new(output_root: impl Into<PathBuf>, strategy: ScanStrategy) -> Self {
        Self::with_sink(output_root, strategy, AtomicFileSink)
    }
}

impl<S: ByteSink> Recoverer<S> {
    /// Creates a recoverer that hands recovered bytes to `sink`.
    pub fn with_sink(output_root: impl Into<PathBuf>, strategy: ScanStrategy, sink: S) -> Self {
        Self {
            output_root: output_root.into(),
            strategy,
            sink,
        }
    }

    /// Classifies one entry and, if it holds new content, writes it out.
    ///
    /// Bookkeeping, unrecognised and duplicate entries are normal outcomes,
    /// not errors. Nothing is written unless a fresh path was claimed.
    pub fn process_entry(&self, name: &str, bytes: &[u8]) -> Result<EntryOutcome, EntryError> {
        let (kind, offset) = match classify(name, bytes, self.strategy) {
            Classification::Skip => {
                debug!(entry = name, "skipping cache bookkeeping file");
                return Ok(EntryOutcome::Skipped);
            }
            Classification::Unknown => {
                debug!(entry = name, "no known signature");
                return Ok(EntryOutcome::Unknown);
            }
            Classification::Recognized { kind, offset } => (kind, offset),
        };
        validate_base_name(name)?;

        let content = &bytes[offset..];
        let mut last_path = None;

        for _ in 0..MAX_PERSIST_RETRIES {
            let decision = allocate(
                content,
                &self.output_root,
                kind.extension,
                name,
                kind.extension,
            )?;
            let path = match decision {
                OutputDecision::Duplicate(path) => {
                    debug!(entry = name, path = %path.display(), "already recovered");
                    return Ok(EntryOutcome::Duplicate { path });
                }
                OutputDecision::WritePath(path) => path,
            };

            match self.sink.write_new(&path, content)? {
                WriteOutcome::Created => {
                    debug!(
                        entry = name,
                        path = %path.display(),
                        offset,
                        mime = kind.mime,
                        "recovered file"
                    );
                    return Ok(EntryOutcome::Written {
                        path,
                        kind,
                        bytes: content.len() as u64,
                    });
                }
                WriteOutcome::Occupied => {
                    debug!(
                        entry = name,
                        path = %path.display(),
                        "name claimed concurrently, reallocating"
                    );
                    last_path = Some(path);
                }
            }
        }

        Err(EntryError::PersistContention {
            path: last_path.unwrap_or_else(|| self.output_root.join(kind.extension)),
        })
    }
}

// Cache entry names become output file names, so they must be a single plain component.
fn validate_base_name(name: &str) -> Result<(), EntryError> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\'])
        || name.contains('\0');
    if invalid {
        Err(EntryError::InvalidName(name.to_string()))
    } else {
        Ok(())
    }
}

/// Lists the cache directory and recovers every entry in it.
///
/// # Errors
///
/// Only setup failures are returned; individual entries that fail are logged,
/// counted in [`RecoverStats::failed`] and reported through `progress_cb`.
pub fn recover_cache(
    options: &RecoverOptions,
    progress_cb: &ProgressCallback<'_>,
) -> Result<RecoverStats, RecoverError> {
    info!(cache_dir = %options.cache_dir.display(), "reading cache folder");
    let entries = list_entries(&options.cache_dir)?;
    recover_entries(entries, options, progress_cb)
}

/// Recovers an already listed set of entries on a pool of worker threads.
pub fn recover_entries(
    entries: Vec<DirEntryInfo>,
    options: &RecoverOptions,
    progress_cb: &ProgressCallback<'_>,
) -> Result<RecoverStats, RecoverError> {
    let start_time = Instant::now();
    fs::create_dir_all(&options.output_root).map_err(RecoverError::OutputRootUnavailable)?;

    let recoverer = Recoverer::new(options.output_root.clone(), options.strategy);
    let num_workers = options.workers.max(1).min(entries.len().max(1));
    info!(
        entries = entries.len(),
        workers = num_workers,
        output = %options.output_root.display(),
        "recovering found files"
    );

    let (job_tx, job_rx): (Sender<DirEntryInfo>, Receiver<DirEntryInfo>) = unbounded();
    for entry in entries {
        // The receiver is alive until the scope below ends.
        let _ = job_tx.send(entry);
    }
    drop(job_tx);

    let (result_tx, result_rx) = unbounded();
    let mut stats = RecoverStats::default();

    let panicked = thread::scope(|scope| {
        let handles: Vec<_> = (0..num_workers)
            .map(|_| {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let recoverer = &recoverer;
                scope.spawn(move || {
                    for info in job_rx.iter() {
                        let result = if info.is_directory {
                            Ok(EntryOutcome::Directory)
                        } else {
                            read_entry(&info)
                                .and_then(|entry| recoverer.process_entry(&entry.name, &entry.bytes))
                        };
                        if result_tx.send((info.name, result)).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(result_tx);

        for (name, result) in result_rx.iter() {
            if let Err(e) = &result {
                warn!(entry = %name, error = %e, "could not recover entry");
            }
            stats.record(&result);
            progress_cb(&name, &result);
        }

        let mut panicked = false;
        for handle in handles {
            panicked |= handle.join().is_err();
        }
        panicked
    });

    if panicked {
        return Err(RecoverError::WorkerPanicked);
    }

    stats.duration = start_time.elapsed();
    info!(
        written = stats.files_written,
        duplicates = stats.duplicates,
        failed = stats.failed,
        "recovery finished"
    );
    Ok(stats)
}
