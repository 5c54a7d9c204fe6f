//! # harvest CLI
//!
//! Scans a source tree for user-facing strings, reusing cached results for
//! documents whose content has not changed since the last run.
//!
//! ## Usage
//!
//! ```bash
//! harvest [--config harvest.toml] [-v] <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `harvest scan <root>` | Extract strings from a tree and write the aggregate |
//! | `harvest stats` | Show what the extraction cache currently holds |
//! | `harvest completions <shell>` | Print shell completions |
//!
//! ## Examples
//!
//! ```bash
//! # Incremental scan; only changed files are re-extracted
//! harvest scan ./src
//!
//! # Everything again, eight workers, CSV for translators
//! harvest scan ./src --force --workers 8 --format csv -o strings.csv
//!
//! # JSON on stdout, progress as JSON lines on stderr
//! harvest scan ./src --format json -o - --progress json
//! ```

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use i18n_harvest::config::{self, Config};
use i18n_harvest::export::{self, OutputFormat};
use i18n_harvest::pipeline::{run_scan, ScanOverrides};
use i18n_harvest::progress::ProgressMode;
use i18n_harvest::stats::{self, HotspotOptions};

/// harvest: incremental extraction of translatable strings.
///
/// Configuration is optional; without `--config` the built-in extensions,
/// exclusions and rules are used.
#[derive(Parser)]
#[command(
    name = "harvest",
    about = "Incremental, content-fingerprinted extraction of user-facing strings",
    version
)]
struct Cli {
    /// Path to a configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug). `RUST_LOG` wins.
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a source tree and write the extracted strings.
    ///
    /// Documents whose content fingerprint matches the cache are not
    /// re-extracted. The cache is updated after a successful run.
    Scan {
        /// Root directory to scan.
        root: PathBuf,

        /// Ignore cached results and re-extract every document.
        #[arg(long)]
        force: bool,

        /// Number of extraction workers (default: available CPUs).
        #[arg(long, value_parser = parse_workers)]
        workers: Option<usize>,

        /// Directory holding the extraction cache.
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Output format.
        #[arg(long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file, or `-` for stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// File extensions to scan, comma-separated (replaces the configured list).
        #[arg(long, value_delimiter = ',')]
        extensions: Vec<String>,

        /// Additional directory names to skip, comma-separated.
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,

        /// Progress on stderr (default: human when stderr is a terminal).
        #[arg(long, value_enum)]
        progress: Option<ProgressMode>,

        /// Number of documents listed in the hotspot report.
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Leave documents with fewer fragments out of the hotspot report.
        #[arg(long, default_value_t = 1)]
        min_fragments: usize,
    },

    /// Show cache statistics.
    Stats {
        /// Directory holding the extraction cache.
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Print shell completions to stdout.
    Completions {
        shell: clap_complete::Shell,
    },
}

fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("invalid worker count '{}'", s))?;
    if n == 0 {
        return Err("worker count must be at least 1".to_string());
    }
    Ok(n)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr).with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Commands that don't require config
    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "harvest", &mut io::stdout());
        return Ok(());
    }

    let mut cfg = match &cli.config {
        Some(path) => config::load_config(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Scan {
            root,
            force,
            workers,
            cache_dir,
            format,
            output,
            extensions,
            exclude,
            progress,
            top,
            min_fragments,
        } => {
            if let Some(dir) = cache_dir {
                cfg.cache.dir = dir;
            }
            if let Some(format) = format {
                cfg.output.format = format;
            }
            if let Some(path) = output {
                cfg.output.path = path;
            }
            if !extensions.is_empty() {
                cfg.scan.extensions = extensions;
            }
            cfg.scan.exclude_dirs.extend(exclude);
            cfg.validate()?;

            let cancel = CancellationToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupted; letting in-flight documents finish");
                    interrupt.cancel();
                }
            });

            let reporter = progress
                .unwrap_or_else(ProgressMode::default_for_tty)
                .reporter();
            let overrides = ScanOverrides { force, workers };
            let report = run_scan(&cfg, &root, &overrides, reporter.as_ref(), &cancel).await?;

            let to_stdout = cfg.output.path == Path::new("-");
            let exported = if report.cancelled {
                warn!("scan cancelled; output not written");
                None
            } else {
                Some(export::write_output(
                    &report.aggregate,
                    cfg.output.format,
                    &cfg.output.path,
                ))
            };

            // The summary is printed even when writing the output failed.
            let hotspots = HotspotOptions { top, min_fragments };
            if to_stdout {
                stats::write_summary(&report, hotspots, &mut io::stderr().lock())?;
            } else {
                let mut stdout = io::stdout().lock();
                stats::write_summary(&report, hotspots, &mut stdout)?;
                if let Some(Ok(())) = &exported {
                    writeln!(
                        stdout,
                        "Wrote {} strings to {}",
                        report.aggregate.total_fragments(),
                        cfg.output.path.display()
                    )?;
                }
            }

            exported.transpose()?;
            if report.cancelled {
                anyhow::bail!("scan interrupted");
            }
        }
        Commands::Stats { cache_dir } => {
            let dir = cache_dir.unwrap_or(cfg.cache.dir);
            stats::run_stats(&dir, &mut io::stdout().lock())?;
        }
        Commands::Completions { .. } => {
            // Handled above (before config loading)
            unreachable!()
        }
    }

    Ok(())
}
