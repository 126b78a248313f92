use std::path::Path;

use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;
use wintergarden_core::storage::LoggingConfig;
use wintergarden_core::Config;

mod commands;

#[derive(Parser)]
#[command(name = "wintergarden-cli", version, about = "Winter Garden CLI")]
struct Cli {
    /// Log filter (overrides logging.level; RUST_LOG overrides both)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record stitches for a gardener
    Add(commands::add::AddArgs),
    /// Show one gardener
    User {
        /// Chat user id
        #[arg(allow_hyphen_values = true)]
        user_id: i64,
    },
    /// Leaderboard
    Top {
        /// Number of gardeners (defaults to garden.leaderboard_limit)
        #[arg(long)]
        limit: Option<usize>,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Numbered CSV export of every gardener
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<std::path::PathBuf>,
    },
    /// Raw CSV dump of the users table
    Backup {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<std::path::PathBuf>,
    },
    /// Delete all progress
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
    /// Process chat messages as JSON lines and print replies
    Chat {
        /// Read messages from a file instead of stdin
        #[arg(long, short)]
        input: Option<std::path::PathBuf>,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

const LOG_FILE_PREFIX: &str = "wintergarden";

fn file_appender(dir: &Path, max_files: usize) -> Result<RollingFileAppender, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    Ok(RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(max_files)
        .build(dir)?)
}

/// Stderr always; rotated files too when `logging.directory` is set.
/// The returned guard flushes the file writer when dropped.
fn init_tracing(level: &str, logging: Option<&LoggingConfig>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let mut file_error = None;
    let mut guard = None;
    let file_layer = logging.and_then(|logging| {
        let dir = logging.directory.as_deref()?;
        match file_appender(dir, logging.max_files) {
            Ok(appender) => {
                let (writer, worker) = tracing_appender::non_blocking(appender);
                guard = Some(worker);
                Some(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(writer))
            }
            Err(e) => {
                file_error = Some(format!("log directory {} unusable: {e}", dir.display()));
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init();

    if let Some(error) = file_error {
        tracing::warn!("{error}");
    }
    guard
}

fn main() {
    let cli = Cli::parse();

    // Config commands must work even when the stored config is broken.
    let config = match cli.command {
        Commands::Config { .. } => Ok(Config::default()),
        _ => Config::load(),
    };
    let level = cli
        .log_level
        .clone()
        .or_else(|| config.as_ref().ok().map(|c| c.logging.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let log_guard = init_tracing(&level, config.as_ref().ok().map(|c| &c.logging));

    let result = match (cli.command, config) {
        (Commands::Config { action }, _) => commands::config::run(action),
        (_, Err(e)) => Err(e.into()),
        (Commands::Add(args), Ok(config)) => commands::add::run(&config, args),
        (Commands::User { user_id }, Ok(config)) => commands::user::run(&config, user_id),
        (Commands::Top { limit, json }, Ok(config)) => commands::top::run(&config, limit, json),
        (Commands::Export { output }, Ok(config)) => commands::export::run_export(&config, output),
        (Commands::Backup { output }, Ok(config)) => commands::export::run_backup(&config, output),
        (Commands::Reset { yes }, Ok(config)) => commands::reset::run(&config, yes),
        (Commands::Chat { input }, Ok(config)) => commands::chat::run(&config, input),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        eprintln!("error: {e}");
        drop(log_guard);
        std::process::exit(1);
    }
}
