//! placerank CLI
//!
//! Records visits into a persisted history and queries the ranked top sites.
//! Every command opens the history snapshot, applies one operation, and
//! saves before exiting.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use placerank_core::config::{Config, Directories};
use placerank_core::{HistoryService, VisitInput};
use placerank_types::{EventKind, Link, LinkEvent, TransitionKind};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{debug, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Frecency-ranked link history
#[derive(Parser, Debug)]
#[command(name = "placerank")]
#[command(version, about, long_about = None)]
#[command(after_help = "\
Examples:
  placerank visit https://example.com/             Record a followed link
  placerank visit https://example.com/ -t typed    Record a typed visit
  placerank top --limit 10                         Show the ten best sites
  placerank --events remove https://example.com/   Remove and print the deleteURI event
  placerank decay                                  Run the daily maintenance pass
  placerank check 'javascript:alert(1)'            Test url eligibility
")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// History snapshot (overrides `storePath` from the config)
    #[arg(long, value_name = "PATH", global = true)]
    store: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, value_name = "PATH", global = true)]
    log_file: Option<PathBuf>,

    /// Print every delivered event as a JSON line
    #[arg(long, global = true)]
    events: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Record a visit
    Visit {
        url: String,

        /// How the visit happened (link, typed, bookmark, ...)
        #[arg(short, long)]
        transition: Option<TransitionKind>,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        referrer: Option<String>,

        /// Visit time in microseconds since the Unix epoch
        #[arg(long)]
        time: Option<i64>,
    },

    /// Show the top frecent sites
    Top {
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove a url and all its visits
    Remove { url: String },

    /// Remove all history
    Clear,

    /// Re-score every url against the current time
    Decay,

    /// Check whether a url may be stored (exit status 1 when rejected)
    Check { url: String },

    /// Print the total number of recorded visits
    Count,
}

/// Log to stderr, and to `log_file` when given. `RUST_LOG` overrides the
/// default `placerank=info` filter.
fn setup_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("placerank=info"));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let Some(path) = log_file else {
        tracing_subscriber::registry()
            .with(stderr_layer)
            .with(filter)
            .init();
        return Ok(None);
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .with(filter)
        .init();

    Ok(Some(guard))
}

fn load_config(cli: &Cli) -> Result<Config> {
    let dirs = Directories::new();

    let config_path = match (&cli.config, &dirs) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(dirs)) => Some(dirs.config_file.clone()),
        (None, None) => None,
    };
    let mut config = match &config_path {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    if let Some(store) = &cli.store {
        config.store_path = Some(store.clone());
    } else if config.store_path.is_none()
        && let Some(dirs) = &dirs
    {
        dirs.ensure_exists()
            .context("Failed to create placerank directories")?;
        config.store_path = Some(dirs.history_file.clone());
    }

    debug!(
        "Using history snapshot {:?}",
        config.store_path.as_ref().map(|p| p.display().to_string())
    );
    Ok(config)
}

fn print_event(event: &LinkEvent) {
    match serde_json::to_string(event) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!("Failed to serialize {} event: {}", event.kind(), e),
    }
}

fn print_links(links: &[Link]) {
    if links.is_empty() {
        println!("No history.");
        return;
    }
    for (rank, link) in links.iter().enumerate() {
        println!("{:>3}. {:>6}  {}", rank + 1, link.frecency, link.url);
        if !link.title.is_empty() {
            println!("             {}", link.title);
        }
    }
}

async fn run_command(service: &HistoryService, command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Visit {
            url,
            transition,
            title,
            referrer,
            time,
        } => {
            let input = VisitInput {
                url,
                transition,
                title,
                visit_time: time,
                referrer,
            };
            let added = service
                .add_visit(input)
                .await
                .context("Failed to record visit")?;
            println!("{added}");
        }
        Commands::Top { limit, json } => {
            let links = service.get_top_frecent_sites(limit).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&links)?);
            } else {
                print_links(&links);
            }
        }
        Commands::Remove { url } => {
            let removed = service
                .remove(&url)
                .await
                .with_context(|| format!("Failed to remove {url}"))?;
            println!("{}", if removed { "removed" } else { "not found" });
        }
        Commands::Clear => {
            service.clear().await.context("Failed to clear history")?;
            println!("History cleared.");
        }
        Commands::Decay => {
            let changed = service.decay_all().await.context("Decay pass failed")?;
            println!("Rescored {changed} url(s).");
        }
        Commands::Check { url } => {
            if let Err(e) = service.link_checker().check(&url) {
                println!("rejected: {e}");
                return Ok(ExitCode::FAILURE);
            }
            println!("eligible");
        }
        Commands::Count => {
            println!("{}", service.count().await);
        }
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let _log_guard = setup_logging(cli.log_file.as_deref())?;

    let config = load_config(&cli)?;
    let service = HistoryService::new(config).context("Failed to open history")?;

    if cli.events {
        service.init();
        for kind in EventKind::ALL {
            service.on(kind, Arc::new(print_event))?;
        }
    }

    let outcome = run_command(&service, cli.command).await;

    service.settled().await;
    service.uninit();
    outcome
}
