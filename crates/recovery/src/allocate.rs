//! Output path allocation with duplicate detection and collision renaming.

use crate::error::EntryError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Highest numeric suffix tried before giving up on a base name.
pub const MAX_SUFFIX: u32 = 10_000;

/// Where (and whether) recovered content should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputDecision {
    /// Identical bytes already exist at this path.
    Duplicate(PathBuf),

    /// Nothing exists at this path yet.
    WritePath(PathBuf),
}

/// What occupies a candidate path, as far as `content` is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occupant {
    Vacant,
    Same,
    Different,
}

/// Decides the output path for `content`.
///
/// Candidates are `base_name.extension`, then `base_name_1.extension`,
/// `base_name_2.extension`, and so on; the first vacant candidate is returned
/// unless an earlier one already holds identical bytes.
///
/// # Errors
///
/// Returns [`EntryError::CreateDir`] if `root/subdir` cannot be created and
/// [`EntryError::AllocationExhausted`] if every suffix up to [`MAX_SUFFIX`]
/// holds different content.
pub fn allocate(
    content: &[u8],
    root: &Path,
    subdir: &str,
    base_name: &str,
    extension: &str,
) -> Result<OutputDecision, EntryError> {
    let dir = root.join(subdir);
    fs::create_dir_all(&dir).map_err(|source| EntryError::CreateDir {
        path: dir.clone(),
        source,
    })?;

    for suffix in 0..=MAX_SUFFIX {
        let candidate = candidate_path(&dir, base_name, suffix, extension);
        match inspect(&candidate, content) {
            Occupant::Vacant => return Ok(OutputDecision::WritePath(candidate)),
            Occupant::Same => return Ok(OutputDecision::Duplicate(candidate)),
            Occupant::Different => {}
        }
    }

    Err(EntryError::AllocationExhausted {
        base: base_name.to_string(),
        attempts: MAX_SUFFIX + 1,
    })
}

/// Builds `dir/base.ext` for suffix 0 and `dir/base_N.ext` otherwise.
pub fn candidate_path(dir: &Path, base_name: &str, suffix: u32, extension: &str) -> PathBuf {
    if suffix == 0 {
        dir.join(format!("{}.{}", base_name, extension))
    } else {
        dir.join(format!("{}_{}.{}", base_name, suffix, extension))
    }
}

// Unreadable occupants count as `Same`: skipping an entry is safer than clobbering.
fn inspect(path: &Path, content: &[u8]) -> Occupant {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Occupant::Vacant,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "cannot inspect existing file, assuming duplicate"
            );
            return Occupant::Same;
        }
    };

    if !metadata.is_file() || metadata.len() != content.len() as u64 {
        return Occupant::Different;
    }

    match fs::read(path) {
        Ok(existing) if existing == content => Occupant::Same,
        Ok(_) => Occupant::Different,
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "cannot read existing file for comparison, assuming duplicate"
            );
            Occupant::Same
        }
    }
}
