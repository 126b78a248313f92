mod config;
pub mod database;
pub mod store;

pub use config::{BotConfig, Config, GardenConfig, LoggingConfig, StorageConfig};
pub use database::Database;
pub use store::{ExportTable, LeaderboardRow, RecordStore, ResetSummary, UserId, UserRecord};

use std::path::PathBuf;

/// Returns the data directory, creating it if needed.
///
/// Resolution order:
/// - `WINTERGARDEN_DATA_DIR` if set
/// - `~/.config/wintergarden-dev/` when `WINTERGARDEN_ENV=dev`
/// - `~/.config/wintergarden/` otherwise
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    if let Ok(dir) = std::env::var("WINTERGARDEN_DATA_DIR") {
        let dir = PathBuf::from(dir);
        std::fs::create_dir_all(&dir)?;
        return Ok(dir);
    }

    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("WINTERGARDEN_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("wintergarden-dev")
    } else {
        base_dir.join("wintergarden")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
