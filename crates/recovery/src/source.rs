//! Locating and listing the cache, and reading its entries.

use crate::error::{EntryError, RecoverError};
use crate::types::{CacheEntry, DirEntryInfo};
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// Cache location relative to the config directory on Windows.
const WINDOWS_CACHE: &str = "discord/Cache/Cache_Data";
/// Cache location relative to the home directory on macOS.
const MACOS_CACHE: &str = "Library/Application Support/discord/Cache/Cache_Data";
/// Cache location relative to the home directory on Linux.
const LINUX_CACHE: &str = ".config/discord/Cache/Cache_Data";

/// Name of the directory created next to the executable for recovered files.
pub const OUTPUT_DIR_NAME: &str = "recovered";

/// Resolves the chat client's cache directory for the host platform.
///
/// # Errors
///
/// Returns [`RecoverError::UnsupportedPlatform`] on an unknown OS and
/// [`RecoverError::HomeDirUnavailable`] if the base directory cannot be found.
pub fn resolve_cache_directory() -> Result<PathBuf, RecoverError> {
    cache_dir_for(env::consts::OS, dirs::home_dir(), dirs::config_dir())
}

fn cache_dir_for(
    os: &str,
    home: Option<PathBuf>,
    config: Option<PathBuf>,
) -> Result<PathBuf, RecoverError> {
    let (base, relative) = match os {
        "windows" => (config, WINDOWS_CACHE),
        "macos" => (home, MACOS_CACHE),
        "linux" => (home, LINUX_CACHE),
        other => return Err(RecoverError::UnsupportedPlatform(other.to_string())),
    };
    base.map(|base| base.join(relative))
        .ok_or(RecoverError::HomeDirUnavailable)
}

/// Default output root: a fixed directory beside the running executable.
pub fn output_root_beside_executable() -> Result<PathBuf, RecoverError> {
    let exe = env::current_exe().map_err(RecoverError::OutputRootUnavailable)?;
    let dir = exe.parent().ok_or_else(|| {
        RecoverError::OutputRootUnavailable(io::Error::new(
            io::ErrorKind::NotFound,
            "executable has no parent directory",
        ))
    })?;
    Ok(dir.join(OUTPUT_DIR_NAME))
}

/// Lists the immediate children of the cache directory, in no particular order.
///
/// Items whose metadata cannot be read are logged and left out.
///
/// # Errors
///
/// Returns [`RecoverError::CacheDirUnreadable`] if `dir` itself cannot be read.
pub fn list_entries(dir: &Path) -> Result<Vec<DirEntryInfo>, RecoverError> {
    let mut entries = Vec::new();

    for item in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = match item {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(RecoverError::CacheDirUnreadable {
                    path: dir.to_path_buf(),
                    source: e.into(),
                });
            }
            Err(e) => {
                warn!(error = %e, "skipping unlistable cache entry");
                continue;
            }
        };

        let size = match entry.metadata() {
            Ok(metadata) => metadata.len(),
            Err(e) => {
                warn!(
                    path = %entry.path().display(),
                    error = %e,
                    "skipping cache entry without metadata"
                );
                continue;
            }
        };

        entries.push(DirEntryInfo {
            name: entry.file_name().to_string_lossy().into_owned(),
            path: entry.path().to_path_buf(),
            is_directory: entry.file_type().is_dir(),
            size,
        });
    }

    Ok(entries)
}

/// Reads a listed entry's bytes.
pub fn read_entry(info: &DirEntryInfo) -> Result<CacheEntry, EntryError> {
    let bytes = fs::read(&info.path).map_err(|source| EntryError::Read {
        path: info.path.clone(),
        source,
    })?;
    Ok(CacheEntry {
        name: info.name.clone(),
        bytes,
    })
}
