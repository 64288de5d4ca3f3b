use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sng_dedup::checker::DuplicateChecker;
use sng_dedup::config::{load_or_default, DedupConfig};
use sng_dedup::events::TracingSink;
use sng_dedup::pipeline::{run_dedup, DedupOptions, DedupReport};
use sng_dedup::placement::{move_survivors, remove_if_empty, MoveReport};
use sng_dedup::progress::{format_duration, set_log_only};
use sng_dedup::safety::{validate_batch_dir, validate_destination};

#[derive(Parser)]
#[command(name = "sng-dedup")]
#[command(about = "Remove downloaded chart packages that already exist in a song library")]
struct Cli {
    /// JSON config file (default: ./sng_dedup_config.json if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Library root to search; repeat for several. Replaces configured song_directories
    #[arg(long = "root", global = true)]
    roots: Vec<PathBuf>,

    /// Chart file extension
    #[arg(long, global = true)]
    extension: Option<String>,

    /// Worker threads for duplicate checking (0 = sequential)
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Hide progress bars and print periodic progress lines instead
    #[arg(long, global = true)]
    log_only: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Deduplicate a batch directory against the library and within itself
    Dedup(DedupArgs),

    /// Report whether one file already exists in the library (read-only)
    Check(CheckArgs),
}

#[derive(Args)]
struct DedupArgs {
    /// Batch directory
    batch_dir: Option<PathBuf>,

    /// Batch folder name under the configured base_download_path
    #[arg(long)]
    batch_folder: Option<String>,

    /// Move survivors into this directory afterwards
    #[arg(long, conflicts_with = "place")]
    move_to: Option<PathBuf>,

    /// Move survivors into the configured destination library folder
    #[arg(long)]
    place: bool,
}

#[derive(Args)]
struct CheckArgs {
    file: PathBuf,
}

struct Settings {
    config: DedupConfig,
    extension: String,
    workers: usize,
}

impl Settings {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = load_or_default(cli.config.as_deref())?;
        if !cli.roots.is_empty() {
            config.song_directories = cli.roots.clone();
        }
        let extension = cli.extension.clone().unwrap_or_else(|| config.extension.clone());
        let workers = cli.workers.unwrap_or(config.workers);
        Ok(Self {
            config,
            extension,
            workers,
        })
    }

    fn roots(&self) -> &[PathBuf] {
        &self.config.song_directories
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    set_log_only(cli.log_only);

    let settings = Settings::from_cli(&cli)?;
    if settings.roots().is_empty() {
        warn!("No library roots configured; only in-batch duplicates will be removed");
    }

    if settings.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(settings.workers)
            .build_global()
            .context("Failed to set thread pool size")?;
    }

    match &cli.cmd {
        Command::Dedup(args) => dedup(&settings, args),
        Command::Check(args) => check(&settings, args),
    }
}

fn dedup(settings: &Settings, args: &DedupArgs) -> Result<()> {
    let batch_dir = match (&args.batch_dir, &args.batch_folder) {
        (Some(dir), _) => dir.clone(),
        (None, Some(folder)) => settings
            .config
            .batch_dir(folder)
            .context("--batch-folder needs base_download_path in the config")?,
        (None, None) => bail!("Give a batch directory or --batch-folder"),
    };

    validate_batch_dir(&batch_dir, settings.roots())?;

    info!("Batch directory: {}", batch_dir.display());
    for root in settings.roots() {
        info!("Library root: {}", root.display());
    }

    let options = DedupOptions {
        extension: settings.extension.clone(),
        parallel: settings.workers > 0,
    };
    let sink = TracingSink;
    let report = run_dedup(
        &batch_dir,
        settings.roots(),
        &settings.config.charter_verification,
        &options,
        &sink,
    )
    .with_context(|| format!("Failed to deduplicate {}", batch_dir.display()))?;

    let destination = match (&args.move_to, args.place) {
        (Some(dir), _) => Some(dir.clone()),
        (None, true) => Some(
            settings
                .config
                .destination(args.batch_folder.as_deref())
                .context("--place needs song_directories and dest_song_directory_idx in the config")?,
        ),
        (None, false) => None,
    };

    let moves = match destination {
        Some(dest) => Some(place(&batch_dir, &dest, &settings.extension)?),
        None => None,
    };

    print_summary(&report, moves.as_ref());

    let failures = report.errors.len() + moves.as_ref().map_or(0, |m| m.errors.len());
    if failures > 0 {
        bail!("{} file operations failed", failures);
    }
    Ok(())
}

fn place(batch_dir: &Path, dest: &Path, extension: &str) -> Result<MoveReport> {
    validate_destination(dest, batch_dir)?;
    info!("Destination: {}", dest.display());

    let moves = move_survivors(batch_dir, dest, extension, &TracingSink)
        .with_context(|| format!("Failed to move files into {}", dest.display()))?;
    remove_if_empty(batch_dir)?;
    Ok(moves)
}

fn check(settings: &Settings, args: &CheckArgs) -> Result<()> {
    if !args.file.is_file() {
        bail!("{} is not a file", args.file.display());
    }

    let sink = TracingSink;
    let checker = DuplicateChecker::new(
        settings.roots(),
        &settings.config.charter_verification,
        &sink,
    );
    let verdict = checker.check(&args.file);

    println!("{}: {}", args.file.display(), verdict);
    if let Some(existing) = verdict.matched_path() {
        println!("  already in library at {}", existing.display());
    }
    Ok(())
}

fn print_summary(report: &DedupReport, moves: Option<&MoveReport>) {
    println!("\n{:=<60}", "");
    println!("Deduplication complete!");
    println!("  Scanned: {}", report.scanned);
    println!("  Already in library (removed): {}", report.library_duplicates.len());
    println!("  Batch copies removed: {}", report.losers.len());
    println!("  Kept: {}", report.winners.len());
    if !report.unparseable.is_empty() {
        println!("  Unparseable (kept): {}", report.unparseable.len());
        for path in &report.unparseable {
            println!("    {}", path.display());
        }
    }
    if let Some(moves) = moves {
        println!("  Moved: {}", moves.moved.len());
        println!("  Move aborted (already present): {}", moves.aborted.len());
    }
    if !report.errors.is_empty() || moves.is_some_and(|m| !m.errors.is_empty()) {
        println!("  Errors:");
        let move_errors = moves.map(|m| m.errors.as_slice()).unwrap_or_default();
        for err in report.errors.iter().chain(move_errors) {
            println!("    {}", err);
        }
    }
    println!("  Elapsed: {}", format_duration(report.elapsed));
    println!("{:=<60}", "");
}
