//! filedeck - background file operations from the command line.
//!
//! Usage:
//!   filedeck ls [PATH]                      List a directory
//!   filedeck copy SOURCES... --to DIR       Copy into a directory
//!   filedeck move SOURCES... --to DIR       Move into a directory
//!   filedeck delete PATHS...                Delete files and folders
//!   filedeck compress SOURCES... --to DIR   Create a ZIP archive
//!   filedeck extract ARCHIVE [--to DIR]     Extract a ZIP archive
//!   filedeck rename PATH NEW_NAME           Rename in place
//!   filedeck mkdir PARENT NAME              Create a folder

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use clap::{ArgAction, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use filedeck_core::{EngineConfig, FileNode};
use filedeck_ops::{OperationExecutor, OperationRequest, ShutdownMode, list_directory};

#[derive(Parser)]
#[command(
    name = "filedeck",
    version,
    about = "Copy, move, delete, compress and extract files",
    long_about = "filedeck runs file operations on a single background worker, \
                  with rollback of partial results and protection against \
                  archive path traversal."
)]
struct Cli {
    /// Engine configuration file (JSON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List a directory, folders first
    Ls {
        /// Directory to list
        #[arg(default_value = ".")]
        path: PathBuf,
    },

    /// Copy files and folders into a directory
    Copy {
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory
        #[arg(short = 't', long = "to")]
        destination: PathBuf,
    },

    /// Move files and folders into a directory
    Move {
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Destination directory
        #[arg(short = 't', long = "to")]
        destination: PathBuf,
    },

    /// Delete files and folders recursively
    Delete {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },

    /// Compress files and folders into a new ZIP archive
    Compress {
        #[arg(required = true)]
        sources: Vec<PathBuf>,

        /// Directory to create the archive in
        #[arg(short = 't', long = "to")]
        destination: PathBuf,
    },

    /// Extract a ZIP archive into a new folder
    Extract {
        archive: PathBuf,

        /// Directory to extract into (defaults to the archive's directory)
        #[arg(short = 't', long = "to")]
        destination: Option<PathBuf>,
    },

    /// Rename a file or folder
    Rename { path: PathBuf, new_name: String },

    /// Create a folder
    Mkdir { parent: PathBuf, name: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = load_config(cli.config.as_deref())?;

    let request = match cli.command {
        Command::Ls { path } => return run_ls(&path, cli.json),
        Command::Copy {
            sources,
            destination,
        } => OperationRequest::copy(sources, destination),
        Command::Move {
            sources,
            destination,
        } => OperationRequest::move_to(sources, destination),
        Command::Delete { paths } => OperationRequest::delete(paths),
        Command::Compress {
            sources,
            destination,
        } => OperationRequest::compress(sources, destination),
        Command::Extract {
            archive,
            destination,
        } => OperationRequest::extract(archive, destination),
        Command::Rename { path, new_name } => OperationRequest::rename(path, new_name),
        Command::Mkdir { parent, name } => OperationRequest::create_folder(parent, name),
    };

    run_operation(config, request, cli.json).await
}

/// Log to stderr; `RUST_LOG` overrides the verbosity flag.
fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };

    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("Cannot read config {}", path.display()))?;
    let config: EngineConfig = serde_json::from_str(&text)
        .wrap_err_with(|| format!("Invalid config {}", path.display()))?;

    if config.buffer_size == 0 || config.queue_capacity == 0 || config.event_channel_size == 0 {
        bail!("Config sizes must be greater than zero");
    }
    Ok(config)
}

/// Submit one request and report its outcome.
async fn run_operation(config: EngineConfig, request: OperationRequest, json: bool) -> Result<()> {
    let executor = OperationExecutor::new(config)
        .with_directory_listener(|dir| debug!(dir = %dir.display(), "Directory changed"));

    let handle = executor.submit(request).await?;
    let outcome = handle
        .wait(|progress| {
            if !json {
                eprintln!(
                    "[{}/{}] {} {}",
                    progress.index + 1,
                    progress.total,
                    progress.kind,
                    progress.current_item
                );
            }
        })
        .await;
    executor.shutdown(ShutdownMode::Drain).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        println!("{}", outcome.summary());
        for error in outcome.errors.iter().skip(1) {
            eprintln!("  {error}");
        }
    }

    if !outcome.is_success() {
        let total = outcome.failure_count + outcome.success_count;
        bail!("{} of {} item(s) failed", outcome.failure_count, total);
    }
    Ok(())
}

fn run_ls(path: &Path, json: bool) -> Result<()> {
    let nodes = list_directory(path).wrap_err_with(|| format!("Cannot list {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&nodes)?);
        return Ok(());
    }

    for node in &nodes {
        print_node(node);
    }
    eprintln!("{} item(s)", nodes.len());
    Ok(())
}

fn print_node(node: &FileNode) {
    let size = if node.is_dir() {
        "-".to_string()
    } else {
        format_size(node.size)
    };
    let marker = match (node.is_dir(), node.kind.is_symlink()) {
        (true, _) => "/",
        (false, true) => "@",
        _ => "",
    };

    println!(
        "{:>10}  {:<16}  {}{}",
        size,
        format_modified(node),
        node.name,
        marker
    );
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

fn format_modified(node: &FileNode) -> String {
    node.modified
        .map(|time| {
            DateTime::<Local>::from(time)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "-".to_string())
}
