//! # distsync
//!
//! Upload a local build directory to a remote directory, sending only the
//! files that changed since the last run.
//!
//! ## Example
//!
//! ```bash
//! # Use ./distsync.toml (or the nearest one above)
//! distsync
//!
//! # Show what would happen
//! distsync --dry-run
//!
//! # No configuration file, explicit remote and source
//! distsync --config "" --remote https://user@dav.example.com/site/ public
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use sync_client::run;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod config;

use config::Overrides;

/// Synchronize local directories to a remote directory.
#[derive(Parser, Debug)]
#[command(name = "distsync")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file ("" to use none)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Remote directory, as a URL or a local path
    #[arg(long, value_name = "URL")]
    remote: Option<String>,

    /// Show the plan without changing the remote
    #[arg(long, short = 'n')]
    dry_run: bool,

    /// Do not print progress
    #[arg(long, short)]
    quiet: bool,

    /// Enable debug logging
    #[arg(long, short)]
    debug: bool,

    /// Source directories (replace the configured sources)
    #[arg(value_name = "SOURCE")]
    sources: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let cwd = std::env::current_dir().context("Cannot determine current directory")?;
    let loaded = config::load(cli.config.as_deref(), &cwd).await?;
    if let Some(path) = &loaded.path {
        debug!(path = %path.display(), "using configuration file");
    }

    let overrides = Overrides {
        remote: cli.remote,
        dry_run: cli.dry_run,
        quiet: cli.quiet,
        sources: cli.sources,
    };
    let settings = config::resolve(loaded, overrides, &cwd).await?;

    let mut sync = settings.sync;
    if !settings.quiet {
        sync = sync.with_progress(|line| println!("{line}"));
    }
    debug!(config = ?sync, "starting run");

    let report = run(&sync).await.context("Synchronization failed")?;
    debug!(
        uploaded = report.uploaded.len(),
        removed = report.removed.len(),
        kept = report.kept,
        "run finished"
    );
    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over `--debug`.
fn init_logging(debug: bool) {
    let default = if debug { "warn,distsync=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
