//! Command-line frontend for the mod localizer.

#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mod_localizer_core::backup::BackupManager;
use mod_localizer_core::config::AppConfig;
use mod_localizer_core::pipeline::{
    BackupPolicy, NoProgress, Pipeline, ProgressObserver, RunOptions, RunSummary,
};

#[derive(Parser, Debug)]
#[command(name = "mod-localizer", version, about = "Batch-translates game mod archives in place", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Scan a mod directory and patch every container that needs the target
    /// locale
    Translate {
        /// Directory containing the mod containers
        #[arg(long)]
        dir: PathBuf,

        /// Target locale code (e.g. zh_tw)
        #[arg(long)]
        target: String,

        /// Maximum simultaneous container classifications
        #[arg(long)]
        concurrency: Option<usize>,

        /// What to do with per-container backups after the run
        #[arg(long, value_enum, default_value_t = BackupArg::Keep)]
        backup: BackupArg,

        /// JSON config file with overrides (denylist, terminology, ...)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Emit the run summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Put every backed-up container in a directory back in place
    Restore {
        #[arg(long)]
        dir: PathBuf,
    },

    /// List the built-in target locales
    Locales,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackupArg {
    Keep,
    DeleteOnSuccess,
    DeleteAll,
}

impl From<BackupArg> for BackupPolicy {
    fn from(arg: BackupArg) -> Self {
        match arg {
            BackupArg::Keep => BackupPolicy::Keep,
            BackupArg::DeleteOnSuccess => BackupPolicy::DeleteOnSuccess,
            BackupArg::DeleteAll => BackupPolicy::DeleteAll,
        }
    }
}

/// Progress rendering for interactive runs.
struct CliProgress {
    scan: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let scan = ProgressBar::new(0);
        scan.set_style(
            ProgressStyle::with_template("scanning {pos}/{len} {bar:30.cyan/blue}")
                .expect("static template"),
        );
        Self { scan }
    }
}

impl ProgressObserver for CliProgress {
    fn scan_progress(&self, done: u64, total: u64) {
        self.scan.set_length(total);
        self.scan.set_position(done);
    }

    fn container_started(&self, container: &Path, index: usize, total: usize) {
        self.scan.finish_and_clear();
        let name = container
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        println!("[{index}/{total}] translating {name}");
    }

    fn container_finished(&self, container: &Path, success: bool) {
        if !success {
            let name = container
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            eprintln!("  {name} failed, original restored");
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mod_localizer=info,mod_localizer_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match args.command {
        Commands::Translate {
            dir,
            target,
            concurrency,
            backup,
            config,
            json,
        } => translate(dir, target, concurrency, backup.into(), config, json).await,
        Commands::Restore { dir } => restore(&dir),
        Commands::Locales => {
            locales();
            Ok(())
        }
    }
}

async fn translate(
    dir: PathBuf,
    target: String,
    concurrency: Option<usize>,
    backup_policy: BackupPolicy,
    config_path: Option<PathBuf>,
    json: bool,
) -> anyhow::Result<()> {
    let mut config = match config_path {
        Some(path) => AppConfig::from_json_file(&path).map_err(anyhow::Error::msg)?,
        None => AppConfig::default(),
    };
    if let Some(concurrency) = concurrency {
        config.scan_concurrency = concurrency;
    }

    // Silent observer for `--json` runs so stdout stays machine-readable.
    let observer: Arc<dyn ProgressObserver> = if json {
        Arc::new(NoProgress)
    } else {
        Arc::new(CliProgress::new())
    };

    let mut pipeline = Pipeline::new(Arc::new(config))?;
    let summary = pipeline
        .run(
            &RunOptions {
                directory: dir,
                target_locale: target,
                backup_policy,
            },
            observer,
        )
        .await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    if !summary.failed.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!();
    println!(
        "done: {} translated, {} failed, {} skipped (target {})",
        summary.succeeded.len(),
        summary.failed.len(),
        summary.skipped.len(),
        summary.target_locale
    );

    for result in &summary.succeeded {
        println!("  ok    {}", result.container.display());
    }
    for result in &summary.failed {
        println!("  FAIL  {}: {}", result.container.display(), result.detail);
    }

    let histogram = summary.skip_histogram();
    if !histogram.is_empty() {
        println!("skipped:");
        for (reason, count) in histogram {
            println!("  {count:>4}  {reason}");
        }
    }
}

fn restore(dir: &Path) -> anyhow::Result<()> {
    let config = AppConfig::default();
    let backups = BackupManager::new(&config.container_extension);
    let restored = backups.restore_all(dir)?;
    println!("restored {restored} container(s) in {}", dir.display());
    Ok(())
}

fn locales() {
    let registry = AppConfig::default().locales;
    for code in registry.codes() {
        if let Some(info) = registry.get(code) {
            println!("{code:<8} {} ({})", info.name, info.region);
        }
    }
}
