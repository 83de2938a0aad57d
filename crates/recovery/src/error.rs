//! Error types for cache recovery operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a whole recovery run.
#[derive(Debug, Error)]
pub enum RecoverError {
    /// The host operating system has no known cache location.
    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// The home or configuration directory could not be determined.
    #[error("Could not determine the home or config directory")]
    HomeDirUnavailable,

    /// The cache directory is missing or cannot be listed.
    #[error("Cache directory unreadable: {path}: {source}")]
    CacheDirUnreadable {
        /// Directory that was being listed
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: io::Error,
    },

    /// The output root could not be located or created.
    #[error("Output directory unavailable: {0}")]
    OutputRootUnavailable(#[source] io::Error),

    /// A worker thread panicked while processing entries.
    #[error("A recovery worker panicked")]
    WorkerPanicked,
}

/// Errors confined to a single cache entry. These are reported and the run continues.
#[derive(Debug, Error)]
pub enum EntryError {
    /// The entry name cannot be used as an output file name.
    #[error("Invalid entry name: {0:?}")]
    InvalidName(String),

    /// The cache entry could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The per-extension output directory could not be created.
    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The recovered bytes could not be written.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Every numbered candidate name was taken by different content.
    #[error("No free output name for {base} after {attempts} attempts")]
    AllocationExhausted { base: String, attempts: u32 },

    /// Other writers kept claiming the chosen name before this entry could persist.
    #[error("Gave up writing {path}: name repeatedly claimed by another writer")]
    PersistContention { path: PathBuf },
}
