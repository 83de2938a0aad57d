//! Command-line interface for cache media recovery.
//!
//! Running the tool with no arguments locates the chat client's cache for
//! this platform and recovers every recognisable file into a `recovered/`
//! directory next to the executable.

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use recovery::{
    list_entries, output_root_beside_executable, resolve_cache_directory, EntryError,
    EntryOutcome, RecoverError, RecoverOptions, RecoverStats, ScanStrategy,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Parser)]
#[command(name = "recover")]
#[command(version, about = "Recover media files from a chat client's browser cache", long_about = None)]
struct Cli {
    /// Cache directory to read instead of the platform default
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Output directory (default: "recovered" next to the executable)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Search this many leading bytes for content (0 = content at offset 0)
    #[arg(long)]
    scan_bound: Option<usize>,

    /// Number of worker threads
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Print the run summary as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Summary<'a> {
    cache_dir: &'a Path,
    output_root: &'a Path,
    strategy: ScanStrategy,
    #[serde(flatten)]
    stats: &'a RecoverStats,
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing; logs go to stderr so `--json` output stays parseable
    let default_filter = if cli.json { "warn" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), RecoverError> {
    let say = |message: &str| {
        if !cli.json {
            println!("{}", message);
        }
    };

    say("Locating cache folder");
    let cache_dir = match cli.cache_dir {
        Some(dir) => dir,
        None => resolve_cache_directory()?,
    };
    let output_root = match cli.out {
        Some(dir) => dir,
        None => output_root_beside_executable()?,
    };

    let mut options = RecoverOptions::new(cache_dir, output_root);
    if let Some(bound) = cli.scan_bound {
        options.strategy = ScanStrategy::from_bound(bound);
    }
    if let Some(jobs) = cli.jobs {
        options.workers = jobs;
    }

    tracing::debug!(?options, "resolved options");

    say("Reading cache folder for all saved files.");
    let entries = list_entries(&options.cache_dir)?;

    say("Recovering found files.");
    let pb = if cli.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(entries.len() as u64)
    };
    pb.set_style(
        ProgressStyle::with_template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let progress_cb = |_name: &str, result: &Result<EntryOutcome, EntryError>| {
        if let Ok(EntryOutcome::Written { path, .. }) = result {
            pb.set_message(path.display().to_string());
        }
        pb.inc(1);
    };
    let stats = recovery::recover_entries(entries, &options, &progress_cb)?;
    pb.finish_and_clear();

    if cli.json {
        let summary = Summary {
            cache_dir: &options.cache_dir,
            output_root: &options.output_root,
            strategy: options.strategy,
            stats: &stats,
        };
        match serde_json::to_string_pretty(&summary) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error: could not serialize summary: {}", e),
        }
    } else {
        print_summary(&options, &stats);
        say("Done!");
    }

    Ok(())
}

fn print_summary(options: &RecoverOptions, stats: &RecoverStats) {
    println!(
        "Recovered {} new files ({} bytes) into {}",
        stats.files_written,
        stats.bytes_written,
        options.output_root.display()
    );
    println!(
        "{} already recovered, {} unrecognised, {} skipped, {} failed ({:.1}s)",
        stats.duplicates,
        stats.unknown,
        stats.skipped,
        stats.failed,
        stats.duration.as_secs_f64()
    );
}
