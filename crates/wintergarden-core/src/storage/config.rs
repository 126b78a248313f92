//! TOML-based application configuration.
//!
//! Stores:
//! - Chat bot identity and access control (token, allowed chat, admin)
//! - Garden tuning (flower threshold, leaderboard size)
//! - Database location
//! - Log level
//!
//! Configuration is stored at `<data_dir>/config.toml`. A handful of
//! `WINTERGARDEN_*` environment variables override the file at load time.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::ConfigError;
use crate::reward::DEFAULT_FLOWER_THRESHOLD;

/// Chat bot settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BotConfig {
    /// Bot API token.
    #[serde(default)]
    pub token: Option<String>,
    /// The only chat where `/add` and `/backup` are accepted.
    #[serde(default)]
    pub allowed_chat_id: Option<i64>,
    /// The only user allowed to `/reset`.
    #[serde(default)]
    pub admin_id: Option<i64>,
    /// Accept `/cmd@username` addressed to this bot.
    #[serde(default)]
    pub bot_username: Option<String>,
}

/// Reward tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GardenConfig {
    #[serde(default = "default_flower_threshold")]
    pub flower_threshold: u64,
    #[serde(default = "default_leaderboard_limit")]
    pub leaderboard_limit: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Defaults to `<data_dir>/garden.db`.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Also write daily-rotated log files here when set.
    #[serde(default)]
    pub directory: Option<PathBuf>,
    /// Rotated files kept in `directory`.
    #[serde(default = "default_log_max_files")]
    pub max_files: usize,
}

/// Application configuration.
///
/// Serialized to/from TOML at `<data_dir>/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bot: BotConfig,
    #[serde(default)]
    pub garden: GardenConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_flower_threshold() -> u64 {
    DEFAULT_FLOWER_THRESHOLD
}
fn default_leaderboard_limit() -> usize {
    10
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_max_files() -> usize {
    5
}

impl Default for GardenConfig {
    fn default() -> Self {
        Self {
            flower_threshold: default_flower_threshold(),
            leaderboard_limit: default_leaderboard_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
            max_files: default_log_max_files(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                current = current.get_mut(part).ok_or_else(unknown)?;
                continue;
            }

            let obj = current.as_object_mut().ok_or_else(unknown)?;
            let existing = obj.get(part).ok_or_else(unknown)?;

            // Optional fields serialize as null; "none" clears them.
            let new_value = match existing {
                _ if value.eq_ignore_ascii_case("none") => serde_json::Value::Null,
                serde_json::Value::Bool(_) => serde_json::Value::Bool(
                    value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                ),
                serde_json::Value::Number(_) => value
                    .parse::<i64>()
                    .map(|n| serde_json::Value::Number(n.into()))
                    .map_err(|_| invalid(format!("cannot parse '{value}' as number")))?,
                serde_json::Value::Null => match value.parse::<i64>() {
                    Ok(n) => serde_json::Value::Number(n.into()),
                    Err(_) => serde_json::Value::String(value.into()),
                },
                _ => serde_json::Value::String(value.into()),
            };

            obj.insert(part.to_string(), new_value);
            return Ok(());
        }

        Err(unknown())
    }

    /// Location of the config file.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be created.
    pub fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from the default location, writing defaults if the file is missing,
    /// then apply environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        let mut cfg = if path.exists() {
            Self::load_from(&path)?
        } else {
            let cfg = Self::default();
            cfg.save_to(&path)?;
            cfg
        };
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a config file without touching the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Overlay `WINTERGARDEN_TOKEN`, `WINTERGARDEN_ALLOWED_CHAT_ID`,
    /// `WINTERGARDEN_ADMIN_ID` and `WINTERGARDEN_FLOWER_THRESHOLD`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        fn parse<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, ConfigError> {
            raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: name.to_string(),
                message: format!("cannot parse '{raw}'"),
            })
        }

        if let Some(token) = lookup("WINTERGARDEN_TOKEN") {
            self.bot.token = Some(token);
        }
        if let Some(raw) = lookup("WINTERGARDEN_ALLOWED_CHAT_ID") {
            self.bot.allowed_chat_id = Some(parse("WINTERGARDEN_ALLOWED_CHAT_ID", &raw)?);
        }
        if let Some(raw) = lookup("WINTERGARDEN_ADMIN_ID") {
            self.bot.admin_id = Some(parse("WINTERGARDEN_ADMIN_ID", &raw)?);
        }
        if let Some(raw) = lookup("WINTERGARDEN_FLOWER_THRESHOLD") {
            self.garden.flower_threshold = parse("WINTERGARDEN_FLOWER_THRESHOLD", &raw)?;
        }
        Ok(())
    }

    /// Reject values the garden cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.garden.flower_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                key: "garden.flower_threshold".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.garden.leaderboard_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "garden.leaderboard_limit".into(),
                message: "must be greater than zero".into(),
            });
        }
        if self.logging.max_files == 0 {
            return Err(ConfigError::InvalidValue {
                key: "logging.max_files".into(),
                message: "must be greater than zero".into(),
            });
        }
        Ok(())
    }

    /// Configured database path, or `<data_dir>/garden.db`.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.storage.database_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::path()?.with_file_name("garden.db")),
        }
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// or fails validation.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json =
            serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}
