//! Destinations for recovered bytes.

use crate::error::EntryError;
use std::io::{self, Write};
use std::path::Path;

/// Outcome of a create-if-absent write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file now exists at the requested path with exactly the given bytes.
    Created,

    /// Something else already occupied the path; nothing was written there.
    Occupied,
}

/// A place recovered content is written to.
///
/// Implementations must never replace an existing file: concurrent workers
/// rely on [`WriteOutcome::Occupied`] to detect a lost race for a name.
pub trait ByteSink: Send + Sync {
    /// Writes `bytes` to `path` if and only if `path` does not exist yet.
    fn write_new(&self, path: &Path, bytes: &[u8]) -> Result<WriteOutcome, EntryError>;
}

/// Writes through a temporary file in the target directory and publishes it
/// with a no-clobber link, so a file is never visible half-written.
#[derive(Debug, Default, Clone, Copy)]
pub struct AtomicFileSink;

const TEMP_PREFIX: &str = ".recover-";

impl ByteSink for AtomicFileSink {
    fn write_new(&self, path: &Path, bytes: &[u8]) -> Result<WriteOutcome, EntryError> {
        let write_err = |source: io::Error| EntryError::Write {
            path: path.to_path_buf(),
            source,
        };

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(dir)
            .map_err(write_err)?;
        temp.write_all(bytes).map_err(write_err)?;
        temp.flush().map_err(write_err)?;

        match temp.persist_noclobber(path) {
            Ok(_) => Ok(WriteOutcome::Created),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(WriteOutcome::Occupied),
            Err(e) => Err(write_err(e.error)),
        }
    }
}
