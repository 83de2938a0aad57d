//! # Recovery
//!
//! Recovers media files that a chat client's embedded browser left,
//! unencrypted, in its HTTP disk cache.
//!
//! Every cache entry is handled on its own: bookkeeping files are skipped,
//! the content type is sniffed from magic bytes (searching past the binary
//! header some cache layouts prepend), and the content is written to
//! `<output>/<extension>/<entry name>.<extension>` unless identical bytes
//! are already there.
//!
//! ## Supported Formats
//!
//! - Images: JPEG, PNG, GIF, WebP, BMP, TIFF, ICO, PSD, AVIF, HEIC
//! - Audio: MP3, OGG, FLAC, WAV, M4A, AAC, MIDI, AMR
//! - Video: WebM, MKV, MP4, MOV, AVI, FLV, MPEG
//! - Documents and containers: PDF, RTF, ZIP, GZIP, 7-Zip, RAR, WASM, WOFF
//!
//! ## Example
//!
//! ```rust,no_run
//! use recovery::{recover, resolve_cache_directory, EntryError, EntryOutcome, RecoverOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cache_dir = resolve_cache_directory()?;
//! let options = RecoverOptions::new(cache_dir, "recovered");
//! let progress_cb = |entry: &str, _result: &Result<EntryOutcome, EntryError>| {
//!     println!("Processed: {}", entry);
//! };
//!
//! let stats = recover(&options, &progress_cb)?;
//! println!("Recovered {} files ({} bytes)", stats.files_written, stats.bytes_written);
//! # Ok(())
//! # }
//! ```

pub mod allocate;
pub mod classify;
pub mod error;
pub mod recover;
pub mod signature;
pub mod sink;
pub mod source;
pub mod types;

// Re-export main types
pub use allocate::OutputDecision;
pub use classify::{Classification, ScanStrategy, DEFAULT_SCAN_BOUND};
pub use error::{EntryError, RecoverError};
pub use recover::{recover_entries, Recoverer};
pub use signature::{match_signature, FileKind};
pub use sink::{AtomicFileSink, ByteSink, WriteOutcome};
pub use source::{list_entries, output_root_beside_executable, resolve_cache_directory};
pub use types::{CacheEntry, DirEntryInfo, EntryOutcome, RecoverOptions, RecoverStats};

use std::path::Path;

/// Type alias for progress callback functions.
///
/// The callback receives the entry name and its outcome once the entry has
/// been fully processed. It is always invoked from the calling thread.
pub type ProgressCallback<'a> = dyn Fn(&str, &Result<EntryOutcome, EntryError>) + Send + Sync + 'a;

/// Classify a raw cache entry without writing anything.
pub fn classify(name: &str, buffer: &[u8], strategy: ScanStrategy) -> Classification {
    classify::classify(name, buffer, strategy)
}

/// Decide where `content` would be written under `root`.
///
/// # Errors
///
/// Returns an error if the extension subdirectory cannot be created or no
/// free name is left.
pub fn allocate(
    content: &[u8],
    root: &Path,
    subdir: &str,
    base_name: &str,
    extension: &str,
) -> Result<OutputDecision, EntryError> {
    allocate::allocate(content, root, subdir, base_name, extension)
}

/// Recover every entry of a cache directory.
///
/// # Arguments
///
/// * `options` - Cache directory, output root, scan strategy and worker count
/// * `progress_cb` - Called once per processed entry
///
/// # Returns
///
/// Returns `RecoverStats` with totals for the run. Per-entry failures are
/// counted there and never abort the run.
///
/// # Errors
///
/// Returns an error if:
/// - The cache directory cannot be read
/// - The output root cannot be created
/// - A worker thread panicked
pub fn recover(
    options: &RecoverOptions,
    progress_cb: &ProgressCallback<'_>,
) -> Result<RecoverStats, RecoverError> {
    recover::recover_cache(options, progress_cb)
}
