//! Cache entry classification.
//!
//! Decides whether an entry is cache-engine bookkeeping, and otherwise where
//! the real content begins and what type it is.

use crate::signature::{match_signature, FileKind};
use serde::Serialize;

/// Names of the cache engine's own index and block files.
pub const BOOKKEEPING_NAMES: [&str; 5] = ["index", "data_0", "data_1", "data_2", "data_3"];

/// Default number of leading offsets searched for content behind a Simple Cache header.
///
/// The header is 24 fixed bytes followed by the request URL, which for CDN
/// attachment links runs to a few hundred bytes.
pub const DEFAULT_SCAN_BOUND: usize = 512;

/// How content is located inside an entry buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStrategy {
    /// Content starts at offset 0 (block-file cache).
    FixedOffset,

    /// Content follows a variable-length header; offsets `0..bound` are searched.
    HeaderScan { bound: usize },
}

impl ScanStrategy {
    /// The layout used by the cache on the host platform.
    pub fn for_host() -> Self {
        if cfg!(windows) {
            ScanStrategy::FixedOffset
        } else {
            ScanStrategy::HeaderScan {
                bound: DEFAULT_SCAN_BOUND,
            }
        }
    }

    /// Builds a strategy from an explicit bound, where `0` means fixed offset.
    pub fn from_bound(bound: usize) -> Self {
        if bound == 0 {
            ScanStrategy::FixedOffset
        } else {
            ScanStrategy::HeaderScan { bound }
        }
    }

    /// Exclusive upper limit of searched offsets.
    pub fn bound(&self) -> usize {
        match self {
            ScanStrategy::FixedOffset => 0,
            ScanStrategy::HeaderScan { bound } => *bound,
        }
    }
}

impl Default for ScanStrategy {
    fn default() -> Self {
        Self::for_host()
    }
}

/// Result of classifying one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Bookkeeping file; never content.
    Skip,

    /// No signature found within the scan bound.
    Unknown,

    /// Content of type `kind` starts at `offset` in the entry buffer.
    Recognized { kind: FileKind, offset: usize },
}

/// Returns `true` for the cache engine's own metadata files.
pub fn is_bookkeeping(name: &str) -> bool {
    BOOKKEEPING_NAMES.contains(&name)
}

/// Classifies a raw cache entry.
///
/// With [`ScanStrategy::HeaderScan`] the first offset below the bound at which
/// a signature matches is returned, so the reported offset is always the
/// earliest match.
pub fn classify(name: &str, buffer: &[u8], strategy: ScanStrategy) -> Classification {
    if is_bookkeeping(name) {
        return Classification::Skip;
    }

    let found = match strategy {
        ScanStrategy::FixedOffset => match_signature(buffer).map(|kind| (kind, 0)),
        ScanStrategy::HeaderScan { bound } => (0..bound.min(buffer.len()))
            .find_map(|offset| match_signature(&buffer[offset..]).map(|kind| (kind, offset))),
    };

    match found {
        Some((kind, offset)) => Classification::Recognized { kind, offset },
        None => Classification::Unknown,
    }
}
