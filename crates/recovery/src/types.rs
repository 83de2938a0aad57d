//! Type definitions for cache recovery.

use crate::classify::ScanStrategy;
use crate::error::EntryError;
use crate::signature::FileKind;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

/// One item of a cache directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    /// File name within the cache directory
    pub name: String,

    /// Full path of the entry
    pub path: PathBuf,

    /// Whether this entry is a directory
    pub is_directory: bool,

    /// Size in bytes as reported by the listing
    pub size: u64,
}

/// A cache entry read into memory.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Options for a recovery run.
#[derive(Debug, Clone)]
pub struct RecoverOptions {
    /// Directory holding the cache entry files
    pub cache_dir: PathBuf,

    /// Root under which one subdirectory per extension is created
    pub output_root: PathBuf,

    /// How content is located inside entries
    pub strategy: ScanStrategy,

    /// Number of worker threads (at least one is always used)
    pub workers: usize,
}

impl RecoverOptions {
    /// Options for the host platform's cache layout using every available CPU.
    pub fn new(cache_dir: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            output_root: output_root.into(),
            strategy: ScanStrategy::for_host(),
            workers: num_cpus::get(),
        }
    }
}

/// What happened to a single directory entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOutcome {
    /// A subdirectory of the cache folder; not processed
    Directory,

    /// A cache bookkeeping file
    Skipped,

    /// No known signature within the scan bound
    Unknown,

    /// Identical content already recovered at `path`
    Duplicate { path: PathBuf },

    /// Content written to a new file
    Written {
        path: PathBuf,
        kind: FileKind,
        bytes: u64,
    },
}

/// Statistics about a completed recovery run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoverStats {
    /// Number of directory entries considered
    pub entries_seen: u64,

    /// Number of new files written
    pub files_written: u64,

    /// Total bytes written to disk
    pub bytes_written: u64,

    /// Entries whose content had already been recovered
    pub duplicates: u64,

    /// Bookkeeping files and subdirectories
    pub skipped: u64,

    /// Entries with no recognisable content
    pub unknown: u64,

    /// Entries that failed with an error
    pub failed: u64,

    /// Wall-clock duration of the run (in seconds)
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl RecoverStats {
    /// Folds one entry result into the totals.
    pub fn record(&mut self, result: &Result<EntryOutcome, EntryError>) {
        self.entries_seen += 1;
        match result {
            Ok(EntryOutcome::Directory | EntryOutcome::Skipped) => self.skipped += 1,
            Ok(EntryOutcome::Unknown) => self.unknown += 1,
            Ok(EntryOutcome::Duplicate { .. }) => self.duplicates += 1,
            Ok(EntryOutcome::Written { bytes, .. }) => {
                self.files_written += 1;
                self.bytes_written += bytes;
            }
            Err(_) => self.failed += 1,
        }
    }
}

// Helper module for Duration serialization
mod duration_serde {
    use serde::{Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs_f64().serialize(serializer)
    }
}
