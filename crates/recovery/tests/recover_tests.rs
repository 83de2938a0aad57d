//! Integration tests for recovering entries from a cache directory.

use recovery::{
    allocate, recover, EntryError, EntryOutcome, OutputDecision, RecoverError, RecoverOptions,
    RecoverStats, Recoverer, ScanStrategy,
};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use tempfile::TempDir;

const JPEG_MAGIC: [u8; 4] = [0xFF, 0xD8, 0xFF, 0xE0];
const PNG_MAGIC: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Helper to build a JPEG-looking payload with a distinguishing tail
fn jpeg(tail: &[u8]) -> Vec<u8> {
    let mut bytes = JPEG_MAGIC.to_vec();
    bytes.extend_from_slice(tail);
    bytes
}

/// Helper to build a Simple Cache style entry: header bytes, then content
fn with_cache_header(header_len: usize, content: &[u8]) -> Vec<u8> {
    let mut bytes: Vec<u8> = (0..header_len).map(|i| (i as u8) & 0x11).collect();
    bytes.extend_from_slice(content);
    bytes
}

/// Helper to create a cache directory and an output directory
fn setup() -> (TempDir, PathBuf, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let cache = temp_dir.path().join("Cache_Data");
    let out = temp_dir.path().join("recovered");
    fs::create_dir(&cache).expect("Failed to create cache directory");
    (temp_dir, cache, out)
}

fn options(cache: &Path, out: &Path, bound: usize) -> RecoverOptions {
    RecoverOptions {
        cache_dir: cache.to_path_buf(),
        output_root: out.to_path_buf(),
        strategy: ScanStrategy::from_bound(bound),
        workers: 4,
    }
}

fn run(options: &RecoverOptions) -> RecoverStats {
    recover(options, &|_: &str, _: &Result<EntryOutcome, EntryError>| {}).expect("run failed")
}

/// All files below `root`, relative to it
fn output_files(root: &Path) -> HashSet<PathBuf> {
    let mut files = HashSet::new();
    for dir in fs::read_dir(root).unwrap() {
        let dir = dir.unwrap().path();
        for file in fs::read_dir(&dir).unwrap() {
            let file = file.unwrap().path();
            files.insert(file.strip_prefix(root).unwrap().to_path_buf());
        }
    }
    files
}

#[test]
fn test_fixed_offset_jpeg_is_written() {
    let (_temp, cache, out) = setup();
    let content = jpeg(b"scenario one");
    fs::write(cache.join("f1"), &content).unwrap();

    let stats = run(&options(&cache, &out, 0));

    assert_eq!(stats.files_written, 1);
    assert_eq!(stats.bytes_written, content.len() as u64);
    assert_eq!(fs::read(out.join("jpg").join("f1.jpg")).unwrap(), content);
}

#[test]
fn test_header_is_trimmed_before_writing() {
    let (_temp, cache, out) = setup();
    let mut png = PNG_MAGIC.to_vec();
    png.extend_from_slice(b"IHDR rest of image");
    fs::write(cache.join("f2"), with_cache_header(37, &png)).unwrap();

    let stats = run(&options(&cache, &out, 400));

    assert_eq!(stats.files_written, 1);
    assert_eq!(fs::read(out.join("png").join("f2.png")).unwrap(), png);
}

#[test]
fn test_rerun_over_unchanged_cache_writes_nothing() {
    let (_temp, cache, out) = setup();
    fs::write(cache.join("f1"), jpeg(b"a")).unwrap();
    fs::write(cache.join("f2"), with_cache_header(20, &PNG_MAGIC)).unwrap();
    fs::write(cache.join("notes"), b"plain text, no signature").unwrap();

    let first = run(&options(&cache, &out, 400));
    let files_after_first = output_files(&out);

    let second = run(&options(&cache, &out, 400));

    assert_eq!(first.files_written, 2);
    assert_eq!(second.files_written, 0);
    assert_eq!(second.duplicates, 2);
    assert_eq!(second.unknown, 1);
    assert_eq!(second.failed, 0);
    assert_eq!(output_files(&out), files_after_first);
}

#[test]
fn test_changed_content_gets_numbered_name() {
    let (_temp, cache, out) = setup();
    let original = jpeg(b"first version");
    fs::write(cache.join("f1"), &original).unwrap();
    run(&options(&cache, &out, 0));

    let changed = jpeg(b"second version");
    fs::write(cache.join("f1"), &changed).unwrap();
    let stats = run(&options(&cache, &out, 0));

    assert_eq!(stats.files_written, 1);
    assert_eq!(fs::read(out.join("jpg").join("f1.jpg")).unwrap(), original);
    assert_eq!(fs::read(out.join("jpg").join("f1_1.jpg")).unwrap(), changed);
}

#[test]
fn test_allocate_predicts_and_then_recognises_recovered_file() {
    let (_temp, cache, out) = setup();
    let content = jpeg(b"planned");
    fs::write(cache.join("f7"), &content).unwrap();
    let expected = out.join("jpg").join("f7.jpg");

    assert_eq!(
        allocate(&content, &out, "jpg", "f7", "jpg").unwrap(),
        OutputDecision::WritePath(expected.clone())
    );
    // Allocation alone writes nothing
    assert!(!expected.exists());

    run(&options(&cache, &out, 0));

    assert_eq!(
        allocate(&content, &out, "jpg", "f7", "jpg").unwrap(),
        OutputDecision::Duplicate(expected)
    );
    assert_eq!(
        allocate(&jpeg(b"other"), &out, "jpg", "f7", "jpg").unwrap(),
        OutputDecision::WritePath(out.join("jpg").join("f7_1.jpg"))
    );
}

#[test]
fn test_bookkeeping_files_are_never_written() {
    let (_temp, cache, out) = setup();
    for name in ["index", "data_0", "data_1", "data_2", "data_3"] {
        fs::write(cache.join(name), jpeg(name.as_bytes())).unwrap();
    }
    fs::create_dir(cache.join("index-dir")).unwrap();

    let stats = run(&options(&cache, &out, 400));

    assert_eq!(stats.entries_seen, 6);
    assert_eq!(stats.skipped, 6);
    assert_eq!(stats.files_written, 0);
    assert!(!out.join("jpg").exists());
}

#[test]
fn test_missing_cache_directory_is_fatal() {
    let (temp, _cache, out) = setup();
    let missing = temp.path().join("does-not-exist");

    let result = recover(
        &options(&missing, &out, 0),
        &|_: &str, _: &Result<EntryOutcome, EntryError>| {},
    );

    assert!(matches!(result, Err(RecoverError::CacheDirUnreadable { .. })));
}

#[test]
fn test_failed_entry_does_not_stop_the_run() {
    let (_temp, cache, out) = setup();
    fs::write(cache.join("good"), jpeg(b"ok")).unwrap();
    fs::write(cache.join("blocked"), with_cache_header(5, &PNG_MAGIC)).unwrap();
    // A plain file where the png subdirectory should go
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("png"), b"in the way").unwrap();

    let failures = Mutex::new(Vec::new());
    let progress_cb = |name: &str, result: &Result<EntryOutcome, EntryError>| {
        if let Err(e) = result {
            failures.lock().unwrap().push((name.to_string(), e.to_string()));
        }
    };
    let stats = recover(&options(&cache, &out, 400), &progress_cb).unwrap();

    assert_eq!(stats.files_written, 1);
    assert_eq!(stats.failed, 1);
    let failures = failures.into_inner().unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "blocked");
    assert!(out.join("jpg").join("good.jpg").exists());
}

#[test]
fn test_progress_reports_every_entry() {
    let (_temp, cache, out) = setup();
    for i in 0..20 {
        fs::write(cache.join(format!("f_{i:06}")), jpeg(&[i as u8])).unwrap();
    }

    let seen = Mutex::new(HashSet::new());
    let progress_cb = |name: &str, _: &Result<EntryOutcome, EntryError>| {
        seen.lock().unwrap().insert(name.to_string());
    };
    let stats = recover(&options(&cache, &out, 0), &progress_cb).unwrap();

    assert_eq!(stats.entries_seen, 20);
    assert_eq!(stats.files_written, 20);
    assert_eq!(seen.into_inner().unwrap().len(), 20);
}

#[test]
fn test_concurrent_writers_never_share_a_path() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().to_path_buf();
    let recoverer = Arc::new(Recoverer::new(&out, ScanStrategy::FixedOffset));
    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|i| {
            let recoverer = Arc::clone(&recoverer);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let content = jpeg(format!("worker {i}").as_bytes());
                barrier.wait();
                let outcome = recoverer.process_entry("same", &content).unwrap();
                (content, outcome)
            })
        })
        .collect();

    let mut paths = HashSet::new();
    for handle in handles {
        let (content, outcome) = handle.join().unwrap();
        let EntryOutcome::Written { path, .. } = outcome else {
            panic!("distinct content must be written, got {outcome:?}");
        };
        assert_eq!(fs::read(&path).unwrap(), content);
        assert!(paths.insert(path));
    }
    assert_eq!(paths.len(), workers);
    assert_eq!(fs::read_dir(out.join("jpg")).unwrap().count(), workers);
}

#[test]
fn test_concurrent_identical_content_written_once() {
    let temp = TempDir::new().unwrap();
    let out = temp.path().to_path_buf();
    let recoverer = Arc::new(Recoverer::new(&out, ScanStrategy::FixedOffset));
    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let recoverer = Arc::clone(&recoverer);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                recoverer.process_entry("same", &jpeg(b"shared")).unwrap()
            })
        })
        .collect();

    let outcomes: Vec<EntryOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let written = outcomes
        .iter()
        .filter(|o| matches!(o, EntryOutcome::Written { .. }))
        .count();

    assert_eq!(written, 1);
    assert_eq!(fs::read_dir(out.join("jpg")).unwrap().count(), 1);
    assert_eq!(fs::read(out.join("jpg").join("same.jpg")).unwrap(), jpeg(b"shared"));
}
